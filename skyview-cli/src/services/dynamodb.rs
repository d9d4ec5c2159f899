//! DynamoDB: tables, and an item browser driven by scan and query forms.
//!
//! The item table is configured with a table name; `s` and `q` open forms
//! whose rows are validated by the expression builders before anything is
//! sent. Key attributes from the table schema always lead the columns.

use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::Rect;
use tracing::{debug, info};

use skyview_core::drill::{DrillKey, PageKind, PaneKind, Selection};
use skyview_core::error::{GatewayResult, UiError};
use skyview_core::filter::{
    AttributeType, Condition, FilterInput, KeyConditionInput, QueryForm, QueryRequest, ScanForm,
    ScanRequest,
};
use skyview_core::keymap::{Action, KeyBinding};
use skyview_core::resource::{Item, KeySchema, TableSummary};

use crate::loader::{LoadOutcome, UiDataLoader};
use crate::services::{ListWithDetails, nothing, paged_source};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::form::{Form, FormEvent};
use crate::ui::page::PageBody;
use crate::ui::paged::PagedTable;

pub fn pages(cx: &EventCx) -> Vec<Box<dyn PageBody>> {
    vec![Box::new(TablesPage::new(cx)), Box::new(ItemsPage::new(cx))]
}

struct TablesPage {
    view: ListWithDetails<(), TableSummary>,
}

impl TablesPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(cx, "tables", (), |bundle, (), limit, cursor| async move {
            bundle.tables.list_tables(limit, cursor).await
        });
        Self {
            view: ListWithDetails::new(
                PagedTable::new("Tables", source, cx),
                PaneKind::Tables,
                PaneKind::TableDetails,
            )
            .drill_with(|t| Selection::Table(t.clone())),
        }
    }
}

impl PageBody for TablesPage {
    fn kind(&self) -> PageKind {
        PageKind::Tables
    }

    fn panes(&self) -> Vec<PaneKind> {
        self.view.panes()
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        self.view.handle_key(pane, key, cx)
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.view.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        self.view.render(frame, area, focus, split);
    }

    fn configure(&mut self, _: PaneKind, _: &DrillKey, _: &EventCx) -> bool {
        false
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        if pane == PaneKind::Tables {
            self.view.list.refresh(reset, cx);
        }
    }

    fn activate(&mut self, cx: &EventCx) {
        self.view.list.refresh(true, cx);
    }

    fn status(&self, _: PaneKind) -> String {
        self.view.status()
    }

    fn is_capturing(&self) -> bool {
        self.view.list.is_filtering()
    }
}

// ============================================================================
// Items
// ============================================================================

#[derive(Clone, Debug)]
enum ItemsRequest {
    Scan(ScanRequest),
    Query(QueryRequest),
}

#[derive(Clone, Debug)]
struct ItemsParams {
    table: String,
    request: ItemsRequest,
}

impl ItemsParams {
    fn scan_all(table: &str) -> Self {
        Self {
            table: table.to_string(),
            request: ItemsRequest::Scan(ScanRequest::default()),
        }
    }

    fn describe(&self) -> String {
        match &self.request {
            ItemsRequest::Scan(scan) => match &scan.filter_expression {
                Some(filter) => format!("scan where {filter}"),
                None => "scan".to_string(),
            },
            ItemsRequest::Query(query) => match &query.index {
                Some(index) => format!("query {index}: {}", query.key_condition_expression),
                None => format!("query {}", query.key_condition_expression),
            },
        }
    }
}

fn type_labels() -> Vec<&'static str> {
    AttributeType::ALL.iter().map(|t| t.label()).collect()
}

fn condition_labels() -> Vec<&'static str> {
    Condition::ALL.iter().map(|c| c.label()).collect()
}

/// Adds the single filter row shared by both forms.
fn with_filter_row(form: Form) -> Form {
    form.text("Attribute", "")
        .choice("Type", &type_labels(), 0)
        .choice("Condition", &condition_labels(), 0)
        .text("Value 1", "")
        .text("Value 2", "")
        .text("Projection", "")
}

fn filter_row(form: &Form) -> FilterInput {
    FilterInput::new(form.value("Attribute"), form.value("Type"), form.value("Condition"))
        .with_values(form.value("Value 1"), form.value("Value 2"))
}

fn scan_form() -> Form {
    with_filter_row(Form::new("Scan"))
}

fn query_form(schema: Option<&KeySchema>) -> Form {
    let partition = schema.map(|s| s.partition_key.as_str()).unwrap_or_default();
    let sort = schema
        .and_then(|s| s.sort_key.as_deref())
        .unwrap_or_default();
    let form = Form::new("Query")
        .text("Partition key", partition)
        .choice("Partition type", &type_labels(), 0)
        .text("Partition value", "")
        .text("Sort key", sort)
        .choice("Sort type", &type_labels(), 0)
        .choice("Sort condition", &condition_labels(), 0)
        .text("Sort value 1", "")
        .text("Sort value 2", "");
    with_filter_row(form).text("Index", "")
}

fn build_scan(form: &Form) -> Result<ScanRequest, UiError> {
    ScanForm {
        filters: vec![filter_row(form)],
        projection: form.value("Projection").to_string(),
        require_filter: false,
    }
    .build()
}

fn build_query(form: &Form) -> Result<QueryRequest, UiError> {
    let partition = FilterInput::new(
        form.value("Partition key"),
        form.value("Partition type"),
        Condition::Eq.label(),
    )
    .with_values(form.value("Partition value"), "");
    // A sort key name alone is not a condition.
    let sort = if form.value("Sort value 1").trim().is_empty()
        && form.value("Sort value 2").trim().is_empty()
    {
        FilterInput::default()
    } else {
        FilterInput::new(
            form.value("Sort key"),
            form.value("Sort type"),
            form.value("Sort condition"),
        )
        .with_values(form.value("Sort value 1"), form.value("Sort value 2"))
    };
    QueryForm {
        key: KeyConditionInput { partition, sort },
        filters: vec![filter_row(form)],
        projection: form.value("Projection").to_string(),
        index: form.value("Index").to_string(),
    }
    .build()
}

enum OpenForm {
    Scan(Form),
    Query(Form),
}

impl OpenForm {
    fn form_mut(&mut self) -> &mut Form {
        match self {
            Self::Scan(form) | Self::Query(form) => form,
        }
    }

    fn form(&self) -> &Form {
        match self {
            Self::Scan(form) | Self::Query(form) => form,
        }
    }

    fn build(&self) -> Result<ItemsRequest, UiError> {
        match self {
            Self::Scan(form) => build_scan(form).map(ItemsRequest::Scan),
            Self::Query(form) => build_query(form).map(ItemsRequest::Query),
        }
    }
}

struct ItemsPage {
    view: ListWithDetails<ItemsParams, Item>,
    schema: Option<KeySchema>,
    schema_loader: UiDataLoader<GatewayResult<TableSummary>>,
    /// A refresh requested while the schema was still loading.
    pending_refresh: Option<bool>,
    form: Option<OpenForm>,
}

impl ItemsPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(
            cx,
            "items",
            ItemsParams::scan_all(""),
            |bundle, params: ItemsParams, limit, cursor| async move {
                if params.table.is_empty() {
                    return nothing();
                }
                match &params.request {
                    ItemsRequest::Scan(scan) => {
                        bundle.tables.scan(&params.table, scan, limit, cursor).await
                    }
                    ItemsRequest::Query(query) => {
                        bundle.tables.query(&params.table, query, limit, cursor).await
                    }
                }
            },
        );
        Self {
            view: ListWithDetails::new(
                PagedTable::new("Items", source, cx),
                PaneKind::Items,
                PaneKind::ItemDetails,
            ),
            schema: None,
            schema_loader: UiDataLoader::new("table schema", &cx.ctx.config.loader),
            pending_refresh: None,
            form: None,
        }
    }

    fn table(&self) -> String {
        self.view.list.params().table
    }

    fn open_form(&mut self, query: bool, cx: &mut EventCx) {
        if self.table().is_empty() {
            cx.error(UiError::missing("Table not selected").to_string());
            return;
        }
        self.form = Some(if query {
            OpenForm::Query(query_form(self.schema.as_ref()))
        } else {
            OpenForm::Scan(scan_form())
        });
    }

    fn submit(&mut self, cx: &mut EventCx) {
        let Some(form) = &self.form else {
            return;
        };
        match form.build() {
            Ok(request) => {
                let params = ItemsParams {
                    table: self.table(),
                    request,
                };
                info!(table = %params.table, request = %params.describe(), "loading items");
                self.form = None;
                self.view.list.set_key(params);
                self.view.list.refresh(true, cx);
            }
            Err(e) => cx.error(e.to_string()),
        }
    }

    fn handle_form_key(&mut self, key: &KeyBinding, cx: &mut EventCx) {
        let Some(open) = self.form.as_mut() else {
            return;
        };
        match open.form_mut().handle_key(key, cx.keymap()) {
            FormEvent::Submitted => self.submit(cx),
            FormEvent::Cancelled => self.form = None,
            FormEvent::Consumed => {}
        }
    }

    fn apply_schema(&mut self, schema: KeySchema) {
        let mut lead = vec![schema.partition_key.clone()];
        lead.extend(schema.sort_key.clone());
        self.view.list.set_lead_headings(lead);
        self.schema = Some(schema);
    }
}

impl PageBody for ItemsPage {
    fn kind(&self) -> PageKind {
        PageKind::Items
    }

    fn panes(&self) -> Vec<PaneKind> {
        self.view.panes()
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if self.form.is_some() {
            self.handle_form_key(key, cx);
            return KeyOutcome::Consumed;
        }
        if pane == PaneKind::Items && !self.view.list.is_filtering() {
            if cx.is(Action::Scan, key) {
                self.open_form(false, cx);
                return KeyOutcome::Consumed;
            }
            if cx.is(Action::Query, key) {
                self.open_form(true, cx);
                return KeyOutcome::Consumed;
            }
        }
        self.view.handle_key(pane, key, cx)
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        match self.schema_loader.poll() {
            Some(LoadOutcome::Done(Ok(table))) => {
                debug!(table = %table.name, "table schema loaded");
                self.apply_schema(table.key_schema);
            }
            Some(LoadOutcome::Done(Err(e))) => cx.error(e.to_string()),
            Some(LoadOutcome::Failed(reason)) => cx.error(reason),
            Some(LoadOutcome::TimedOut | LoadOutcome::Cancelled) | None => {}
        }
        if !self.schema_loader.is_loading() {
            if let Some(reset) = self.pending_refresh.take() {
                self.view.list.refresh(reset, cx);
            }
        }
        self.view.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        self.view.render(frame, area, focus, split);
        if let Some(open) = &self.form {
            open.form().render(frame, area);
        }
    }

    fn configure(&mut self, pane: PaneKind, key: &DrillKey, cx: &EventCx) -> bool {
        let (PaneKind::Items, DrillKey::Table { name }) = (pane, key) else {
            return false;
        };
        self.view.list.set_title(&format!("Items: {name}"));
        self.view.list.set_lead_headings(Vec::new());
        self.view.list.set_key(ItemsParams::scan_all(name));
        self.schema = None;
        self.form = None;
        let gateway = cx.ctx.bundle().tables.clone();
        let name = name.clone();
        self.schema_loader.load_async(
            async move { gateway.describe_table(&name).await },
            cx.ctx.cancellation(),
            cx.ctx.redraw.clone(),
        );
        true
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        if pane != PaneKind::Items {
            return;
        }
        if self.schema_loader.is_loading() {
            self.pending_refresh = Some(reset);
        } else {
            self.view.list.refresh(reset, cx);
        }
    }

    fn status(&self, _: PaneKind) -> String {
        let params = self.view.list.params();
        if params.table.is_empty() {
            return "no table selected · s scans, q queries".to_string();
        }
        format!(
            "{} · {} · {}",
            params.table,
            params.describe(),
            self.view.status()
        )
    }

    fn is_capturing(&self) -> bool {
        self.form.is_some() || self.view.list.is_filtering()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{cx, settle};
    use crate::ui::component::Effect;
    use skyview_core::keymap::KeyName;

    async fn open_orders(cx: &mut EventCx) -> ItemsPage {
        let mut page = ItemsPage::new(cx);
        let key = DrillKey::Table {
            name: "orders".into(),
        };
        assert!(page.configure(PaneKind::Items, &key, cx));
        page.refresh(PaneKind::Items, true, cx);
        settle(&mut page, cx, |p| p.view.list.table().model().len() == 60).await;
        page
    }

    fn enter() -> KeyBinding {
        KeyBinding::plain(KeyName::Enter)
    }

    #[tokio::test]
    async fn test_table_drill() {
        let mut cx = cx();
        let mut page = TablesPage::new(&cx);
        page.activate(&cx);
        settle(&mut page, &mut cx, |p| p.view.list.selected().is_some()).await;
        page.handle_key(PaneKind::Tables, &enter(), &mut cx);
        assert!(matches!(
            cx.take_effects().as_slice(),
            [Effect::Drill(Selection::Table(t))] if t.name == "users"
        ));
    }

    #[tokio::test]
    async fn test_key_attributes_lead() {
        let mut cx = cx();
        let page = open_orders(&mut cx).await;
        assert_eq!(
            &page.view.list.table().model().headings()[..2],
            &["customer_id", "order_date"]
        );
        assert_eq!(page.status(PaneKind::Items), "orders · scan · 60 loaded, 1 page(s)");
    }

    #[tokio::test]
    async fn test_scan_form_filters_and_projects() {
        let mut cx = cx();
        let mut page = open_orders(&mut cx).await;
        page.handle_key(PaneKind::Items, &KeyBinding::ch('s'), &mut cx);
        assert!(page.is_capturing());
        {
            let form = page.form.as_mut().unwrap().form_mut();
            form.set_value("Attribute", "status");
            form.set_value("Value 1", "SHIPPED");
            form.set_value("Projection", "customer_id, status");
        }
        page.handle_key(PaneKind::Items, &enter(), &mut cx);
        assert!(page.form.is_none());
        settle(&mut page, &mut cx, |p| p.view.list.table().model().len() == 20).await;

        let item = page.view.list.selected().cloned().unwrap();
        assert_eq!(item.attributes.len(), 2);
        assert!(page.status(PaneKind::Items).contains("scan where"));
    }

    #[tokio::test]
    async fn test_query_form_validation() {
        let mut cx = cx();
        let mut page = open_orders(&mut cx).await;
        page.handle_key(PaneKind::Items, &KeyBinding::ch('q'), &mut cx);
        assert_eq!(
            page.form.as_ref().unwrap().form().value("Sort key"),
            "order_date"
        );

        page.handle_key(PaneKind::Items, &enter(), &mut cx);
        assert_eq!(
            cx.take_messages()[0].1,
            "MISSING_REQUIRED_INPUT: First attribute value not set"
        );
        assert!(page.form.is_some());

        page.form
            .as_mut()
            .unwrap()
            .form_mut()
            .set_value("Partition value", "c#001");
        page.handle_key(PaneKind::Items, &enter(), &mut cx);
        settle(&mut page, &mut cx, |p| p.view.list.table().model().len() == 6).await;
        assert!(
            page.view
                .list
                .table()
                .model()
                .payloads()
                .iter()
                .all(|i| i.get("customer_id").map(|v| v.render()).as_deref() == Some("c#001"))
        );
    }

    #[tokio::test]
    async fn test_forms_need_a_table() {
        let mut cx = cx();
        let mut page = ItemsPage::new(&cx);
        page.handle_key(PaneKind::Items, &KeyBinding::ch('s'), &mut cx);
        assert!(page.form.is_none());
        assert_eq!(
            cx.take_messages()[0].1,
            "MISSING_REQUIRED_INPUT: Table not selected"
        );
    }
}
