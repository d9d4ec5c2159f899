//! How each entity becomes a table row.

use skyview_core::resource::{
    Alarm, Bucket, EventBus, EventRule, Execution, FunctionSummary, InsightsRow, Item, LogEvent,
    LogGroup, LogStream, MetricSummary, ObjectSummary, Parameter, Resource, Stack, StackEvent,
    StackResource, StateMachine, Subnet, TableSummary, Vpc,
};

pub trait TableRow: Clone + Send + Sync + 'static {
    /// Headings for a buffer of rows.
    fn headings(rows: &[Self]) -> Vec<String>;

    fn cells(&self, headings: &[String]) -> Vec<String>;

    fn payload_column() -> usize {
        0
    }

    /// Text the local fuzzy filter matches against.
    fn search_key(&self) -> String;

    /// What `y` copies and what detail panes show.
    fn payload_text(&self) -> String;
}

macro_rules! resource_rows {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TableRow for $ty {
                fn headings(_: &[Self]) -> Vec<String> {
                    <$ty as Resource>::headings().iter().map(|h| h.to_string()).collect()
                }

                fn cells(&self, _: &[String]) -> Vec<String> {
                    self.row()
                }

                fn payload_column() -> usize {
                    <$ty as Resource>::payload_column()
                }

                fn search_key(&self) -> String {
                    match self.secondary_key() {
                        Some(secondary) if secondary != self.display_key() => {
                            format!("{} {}", self.display_key(), secondary)
                        }
                        _ => self.display_key().to_string(),
                    }
                }

                fn payload_text(&self) -> String {
                    self.to_json()
                }
            }
        )*
    };
}

resource_rows!(
    FunctionSummary,
    LogGroup,
    LogStream,
    LogEvent,
    Alarm,
    MetricSummary,
    Stack,
    StackEvent,
    StackResource,
    TableSummary,
    Bucket,
    ObjectSummary,
    StateMachine,
    Execution,
    Parameter,
    Vpc,
    Subnet,
    EventBus,
    EventRule,
);

impl TableRow for Item {
    fn headings(rows: &[Self]) -> Vec<String> {
        Item::headings_for(rows, None)
    }

    fn cells(&self, headings: &[String]) -> Vec<String> {
        self.row_for(headings)
    }

    fn search_key(&self) -> String {
        self.attributes
            .values()
            .map(|v| v.render())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn payload_text(&self) -> String {
        serde_json::to_string(&self.attributes).unwrap_or_default()
    }
}

impl TableRow for InsightsRow {
    /// Field names in order of first appearance, `@ptr` excluded.
    fn headings(rows: &[Self]) -> Vec<String> {
        let mut headings: Vec<String> = Vec::new();
        for row in rows {
            for field in row.visible_fields() {
                if !headings.contains(&field.field) {
                    headings.push(field.field.clone());
                }
            }
        }
        headings
    }

    fn cells(&self, headings: &[String]) -> Vec<String> {
        headings
            .iter()
            .map(|h| self.get(h).unwrap_or_default().to_string())
            .collect()
    }

    fn search_key(&self) -> String {
        self.visible_fields()
            .map(|f| f.value.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `@message` when present, else the row as a JSON object.
    fn payload_text(&self) -> String {
        if let Some(message) = self.get("@message") {
            return message.to_string();
        }
        let map: serde_json::Map<String, serde_json::Value> = self
            .visible_fields()
            .map(|f| (f.field.clone(), serde_json::Value::String(f.value.clone())))
            .collect();
        serde_json::Value::Object(map).to_string()
    }
}

/// Merge `lead` headings in front of `rest`, dropping duplicates.
pub fn lead_headings(lead: &[String], rest: Vec<String>) -> Vec<String> {
    let mut out = lead.to_vec();
    out.extend(rest.into_iter().filter(|h| !lead.contains(h)));
    out
}
