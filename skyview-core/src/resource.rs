//! Resource entities shown by the dashboard.
//!
//! Entities are immutable snapshots returned by gateways; a refresh replaces
//! them. The core only interprets the display key, the optional secondary
//! key and the projected columns.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::format::format_time;

pub trait Resource: Clone + Serialize + Send + Sync + 'static {
    /// Column headings for the resource table.
    fn headings() -> &'static [&'static str];

    /// Display cells, one per heading.
    fn row(&self) -> Vec<String>;

    /// Human name.
    fn display_key(&self) -> &str;

    /// ARN or id, when the resource has one.
    fn secondary_key(&self) -> Option<&str> {
        None
    }

    /// Column that carries the row payload.
    fn payload_column() -> usize {
        0
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn opt_time(t: &Option<DateTime<Utc>>) -> String {
    t.as_ref().map(format_time).unwrap_or_default()
}

// ============================================================================
// Lambda
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub name: String,
    pub arn: String,
    pub runtime: String,
    pub handler: String,
    pub memory_mb: u32,
    pub timeout_secs: u32,
    pub last_modified: Option<DateTime<Utc>>,
    /// Custom log group; `/aws/lambda/<name>` when unset.
    pub log_group: Option<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl FunctionSummary {
    pub fn resolved_log_group(&self) -> String {
        self.log_group
            .clone()
            .unwrap_or_else(|| format!("/aws/lambda/{}", self.name))
    }
}

impl Resource for FunctionSummary {
    fn headings() -> &'static [&'static str] {
        &["Name", "Runtime", "Memory", "Timeout", "Last Modified"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.runtime.clone(),
            format!("{} MB", self.memory_mb),
            format!("{}s", self.timeout_secs),
            opt_time(&self.last_modified),
        ]
    }

    fn display_key(&self) -> &str {
        &self.name
    }

    fn secondary_key(&self) -> Option<&str> {
        Some(&self.arn)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvokeOutput {
    pub status_code: i32,
    pub payload: String,
    pub function_error: Option<String>,
    pub log_tail: Option<String>,
}

// ============================================================================
// CloudWatch Logs
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogGroup {
    pub name: String,
    pub arn: String,
    pub stored_bytes: u64,
    pub retention_days: Option<u32>,
    pub created: Option<DateTime<Utc>>,
}

impl Resource for LogGroup {
    fn headings() -> &'static [&'static str] {
        &["Name", "Stored", "Retention", "Created"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            crate::format::format_bytes(self.stored_bytes),
            self.retention_days
                .map(|d| format!("{d}d"))
                .unwrap_or_else(|| "never".into()),
            opt_time(&self.created),
        ]
    }

    fn display_key(&self) -> &str {
        &self.name
    }

    fn secondary_key(&self) -> Option<&str> {
        Some(&self.arn)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogStream {
    pub group: String,
    pub name: String,
    pub first_event: Option<DateTime<Utc>>,
    pub last_event: Option<DateTime<Utc>>,
}

impl Resource for LogStream {
    fn headings() -> &'static [&'static str] {
        &["Stream", "First Event", "Last Event"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            opt_time(&self.first_event),
            opt_time(&self.last_event),
        ]
    }

    fn display_key(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub stream: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl Resource for LogEvent {
    fn headings() -> &'static [&'static str] {
        &["Timestamp", "Message"]
    }

    fn row(&self) -> Vec<String> {
        vec![format_time(&self.timestamp), self.message.trim_end().to_string()]
    }

    fn display_key(&self) -> &str {
        &self.message
    }

    fn payload_column() -> usize {
        1
    }

    /// Events carry their raw message; JSON messages get pretty-printed by
    /// the detail view.
    fn to_json(&self) -> String {
        self.message.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightsField {
    pub field: String,
    pub value: String,
}

/// One Insights result row: an ordered list of `(field, value)` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightsRow {
    pub fields: Vec<InsightsField>,
}

impl InsightsRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| InsightsField {
                    field: k.into(),
                    value: v.into(),
                })
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.value.as_str())
    }

    /// Visible columns: every field except the `@ptr` bookkeeping field.
    pub fn visible_fields(&self) -> impl Iterator<Item = &InsightsField> {
        self.fields.iter().filter(|f| f.field != "@ptr")
    }
}

// ============================================================================
// CloudWatch
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub name: String,
    pub arn: String,
    pub state: String,
    pub metric: String,
    pub namespace: String,
    pub threshold: f64,
    pub updated: Option<DateTime<Utc>>,
    pub reason: String,
}

impl Resource for Alarm {
    fn headings() -> &'static [&'static str] {
        &["Name", "State", "Metric", "Threshold", "Updated"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.state.clone(),
            format!("{}/{}", self.namespace, self.metric),
            self.threshold.to_string(),
            opt_time(&self.updated),
        ]
    }

    fn display_key(&self) -> &str {
        &self.name
    }

    fn secondary_key(&self) -> Option<&str> {
        Some(&self.arn)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
}

impl Resource for MetricSummary {
    fn headings() -> &'static [&'static str] {
        &["Namespace", "Metric", "Dimensions"]
    }

    fn row(&self) -> Vec<String> {
        let dims = self
            .dimensions
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        vec![self.namespace.clone(), self.name.clone(), dims]
    }

    fn display_key(&self) -> &str {
        &self.name
    }

    fn payload_column() -> usize {
        1
    }
}

// ============================================================================
// CloudFormation
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    pub id: String,
    pub status: String,
    pub description: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl Stack {
    /// Label/value pairs for the stack details grid.
    pub fn detail_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("Name".to_string(), self.name.clone()),
            ("Id".to_string(), self.id.clone()),
            ("Status".to_string(), self.status.clone()),
            (
                "Description".to_string(),
                self.description.clone().unwrap_or_default(),
            ),
            ("Created".to_string(), opt_time(&self.created)),
            ("Updated".to_string(), opt_time(&self.updated)),
        ];
        pairs.extend(
            self.parameters
                .iter()
                .map(|(k, v)| (format!("Parameter {k}"), v.clone())),
        );
        pairs.extend(
            self.outputs
                .iter()
                .map(|(k, v)| (format!("Output {k}"), v.clone())),
        );
        pairs
    }
}

impl Resource for Stack {
    fn headings() -> &'static [&'static str] {
        &["Name", "Status", "Created", "Updated"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.status.clone(),
            opt_time(&self.created),
            opt_time(&self.updated),
        ]
    }

    fn display_key(&self) -> &str {
        &self.name
    }

    fn secondary_key(&self) -> Option<&str> {
        Some(&self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackEvent {
    pub stack: String,
    pub timestamp: DateTime<Utc>,
    pub logical_id: String,
    pub resource_type: String,
    pub status: String,
    pub reason: Option<String>,
}

impl Resource for StackEvent {
    fn headings() -> &'static [&'static str] {
        &["Timestamp", "Logical Id", "Type", "Status", "Reason"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            format_time(&self.timestamp),
            self.logical_id.clone(),
            self.resource_type.clone(),
            self.status.clone(),
            self.reason.clone().unwrap_or_default(),
        ]
    }

    fn display_key(&self) -> &str {
        &self.logical_id
    }

    fn payload_column() -> usize {
        1
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackResource {
    pub logical_id: String,
    pub physical_id: String,
    pub resource_type: String,
    pub status: String,
}

impl Resource for StackResource {
    fn headings() -> &'static [&'static str] {
        &["Logical Id", "Physical Id", "Type", "Status"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.logical_id.clone(),
            self.physical_id.clone(),
            self.resource_type.clone(),
            self.status.clone(),
        ]
    }

    fn display_key(&self) -> &str {
        &self.logical_id
    }
}

// ============================================================================
// DynamoDB
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttributeValue {
    S(String),
    N(String),
    B(String),
    Bool(bool),
    Null(bool),
    L(Vec<AttributeValue>),
    M(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Compact single-line rendering for table cells.
    pub fn render(&self) -> String {
        match self {
            Self::S(s) | Self::N(s) | Self::B(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Null(_) => "null".into(),
            Self::L(items) => format!(
                "[{}]",
                items.iter().map(|i| i.render()).collect::<Vec<_>>().join(", ")
            ),
            Self::M(map) => format!(
                "{{{}}}",
                map.iter()
                    .map(|(k, v)| format!("{k}: {}", v.render()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub arn: String,
    pub status: String,
    pub item_count: u64,
    pub size_bytes: u64,
    pub key_schema: KeySchema,
}

impl Resource for TableSummary {
    fn headings() -> &'static [&'static str] {
        &["Name", "Status", "Items", "Size", "Keys"]
    }

    fn row(&self) -> Vec<String> {
        let keys = match &self.key_schema.sort_key {
            Some(sk) => format!("{} / {}", self.key_schema.partition_key, sk),
            None => self.key_schema.partition_key.clone(),
        };
        vec![
            self.name.clone(),
            self.status.clone(),
            self.item_count.to_string(),
            crate::format::format_bytes(self.size_bytes),
            keys,
        ]
    }

    fn display_key(&self) -> &str {
        &self.name
    }

    fn secondary_key(&self) -> Option<&str> {
        Some(&self.arn)
    }
}

/// A table item. Columns are derived from the loaded items, not static.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Item {
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Headings for a set of items: key attributes first, then every other
    /// attribute name in sorted order.
    pub fn headings_for(items: &[Item], schema: Option<&KeySchema>) -> Vec<String> {
        let mut headings = Vec::new();
        if let Some(schema) = schema {
            headings.push(schema.partition_key.clone());
            if let Some(sk) = &schema.sort_key {
                headings.push(sk.clone());
            }
        }
        let mut rest: std::collections::BTreeSet<&String> = std::collections::BTreeSet::new();
        for item in items {
            rest.extend(item.attributes.keys());
        }
        for name in rest {
            if !headings.contains(name) {
                headings.push(name.clone());
            }
        }
        headings
    }

    pub fn row_for(&self, headings: &[String]) -> Vec<String> {
        headings
            .iter()
            .map(|h| self.get(h).map(AttributeValue::render).unwrap_or_default())
            .collect()
    }
}

// ============================================================================
// S3
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub region: String,
    pub created: Option<DateTime<Utc>>,
}

impl Resource for Bucket {
    fn headings() -> &'static [&'static str] {
        &["Name", "Region", "Created"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone(), self.region.clone(), opt_time(&self.created)]
    }

    fn display_key(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub storage_class: String,
    pub last_modified: Option<DateTime<Utc>>,
    /// Common prefixes are listed as folder rows.
    pub is_prefix: bool,
}

impl Resource for ObjectSummary {
    fn headings() -> &'static [&'static str] {
        &["Key", "Size", "Class", "Last Modified"]
    }

    fn row(&self) -> Vec<String> {
        if self.is_prefix {
            return vec![self.key.clone(), "-".into(), "PREFIX".into(), String::new()];
        }
        vec![
            self.key.clone(),
            crate::format::format_bytes(self.size),
            self.storage_class.clone(),
            opt_time(&self.last_modified),
        ]
    }

    fn display_key(&self) -> &str {
        &self.key
    }
}

// ============================================================================
// Step Functions
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateMachine {
    pub name: String,
    pub arn: String,
    pub kind: String,
    pub created: Option<DateTime<Utc>>,
}

impl Resource for StateMachine {
    fn headings() -> &'static [&'static str] {
        &["Name", "Type", "Created"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone(), self.kind.clone(), opt_time(&self.created)]
    }

    fn display_key(&self) -> &str {
        &self.name
    }

    fn secondary_key(&self) -> Option<&str> {
        Some(&self.arn)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub name: String,
    pub arn: String,
    pub state_machine_arn: String,
    pub status: String,
    pub started: Option<DateTime<Utc>>,
    pub stopped: Option<DateTime<Utc>>,
}

impl Resource for Execution {
    fn headings() -> &'static [&'static str] {
        &["Name", "Status", "Started", "Stopped"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.status.clone(),
            opt_time(&self.started),
            opt_time(&self.stopped),
        ]
    }

    fn display_key(&self) -> &str {
        &self.name
    }

    fn secondary_key(&self) -> Option<&str> {
        Some(&self.arn)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDetail {
    pub execution: Execution,
    pub input: String,
    pub output: Option<String>,
    pub error: Option<String>,
    pub cause: Option<String>,
}

impl ExecutionDetail {
    pub fn summary_pairs(&self) -> Vec<(String, String)> {
        let e = &self.execution;
        let mut pairs = vec![
            ("Name".to_string(), e.name.clone()),
            ("Arn".to_string(), e.arn.clone()),
            ("Status".to_string(), e.status.clone()),
            ("Started".to_string(), opt_time(&e.started)),
            ("Stopped".to_string(), opt_time(&e.stopped)),
        ];
        if let Some(err) = &self.error {
            pairs.push(("Error".to_string(), err.clone()));
        }
        if let Some(cause) = &self.cause {
            pairs.push(("Cause".to_string(), cause.clone()));
        }
        pairs
    }
}

// ============================================================================
// Systems Manager, VPC, EventBridge
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: String,
    pub version: i64,
    pub last_modified: Option<DateTime<Utc>>,
    /// Only populated by a detail call.
    pub value: Option<String>,
}

impl Resource for Parameter {
    fn headings() -> &'static [&'static str] {
        &["Name", "Type", "Version", "Last Modified"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.kind.clone(),
            self.version.to_string(),
            opt_time(&self.last_modified),
        ]
    }

    fn display_key(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vpc {
    pub id: String,
    pub name: Option<String>,
    pub cidr: String,
    pub state: String,
    pub is_default: bool,
}

impl Resource for Vpc {
    fn headings() -> &'static [&'static str] {
        &["Id", "Name", "CIDR", "State", "Default"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone().unwrap_or_default(),
            self.cidr.clone(),
            self.state.clone(),
            if self.is_default { "yes" } else { "no" }.into(),
        ]
    }

    fn display_key(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    fn secondary_key(&self) -> Option<&str> {
        Some(&self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub vpc_id: String,
    pub cidr: String,
    pub availability_zone: String,
    pub available_ips: u32,
}

impl Resource for Subnet {
    fn headings() -> &'static [&'static str] {
        &["Id", "CIDR", "Zone", "Free IPs"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.cidr.clone(),
            self.availability_zone.clone(),
            self.available_ips.to_string(),
        ]
    }

    fn display_key(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventBus {
    pub name: String,
    pub arn: String,
    pub policy: Option<String>,
}

impl Resource for EventBus {
    fn headings() -> &'static [&'static str] {
        &["Name", "Arn"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone(), self.arn.clone()]
    }

    fn display_key(&self) -> &str {
        &self.name
    }

    fn secondary_key(&self) -> Option<&str> {
        Some(&self.arn)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRule {
    pub name: String,
    pub bus: String,
    pub state: String,
    pub schedule: Option<String>,
    pub pattern: Option<String>,
}

impl Resource for EventRule {
    fn headings() -> &'static [&'static str] {
        &["Name", "State", "Schedule"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.state.clone(),
            self.schedule.clone().unwrap_or_default(),
        ]
    }

    fn display_key(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_match_headings() {
        let f = FunctionSummary {
            name: "orders".into(),
            arn: "arn:aws:lambda:us-east-1:1:function:orders".into(),
            runtime: "python3.12".into(),
            handler: "app.handler".into(),
            memory_mb: 128,
            timeout_secs: 3,
            last_modified: None,
            log_group: None,
            environment: BTreeMap::new(),
        };
        assert_eq!(f.row().len(), FunctionSummary::headings().len());
        assert_eq!(f.resolved_log_group(), "/aws/lambda/orders");
    }

    #[test]
    fn test_item_headings_key_first() {
        let mut a = Item::default();
        a.attributes.insert("zeta".into(), AttributeValue::N("1".into()));
        a.attributes.insert("pk".into(), AttributeValue::S("user#1".into()));
        let mut b = Item::default();
        b.attributes.insert("alpha".into(), AttributeValue::Bool(true));
        b.attributes.insert("pk".into(), AttributeValue::S("user#2".into()));

        let schema = KeySchema {
            partition_key: "pk".into(),
            sort_key: None,
        };
        let headings = Item::headings_for(&[a.clone(), b], Some(&schema));
        assert_eq!(headings, vec!["pk", "alpha", "zeta"]);
        assert_eq!(a.row_for(&headings), vec!["user#1", "", "1"]);
    }

    #[test]
    fn test_insights_row_lookup() {
        let row = InsightsRow::from_pairs([
            ("@timestamp", "2024-01-01 00:00:00"),
            ("@ptr", "abc"),
            ("@message", "hello"),
        ]);
        assert_eq!(row.get("@message"), Some("hello"));
        assert_eq!(row.visible_fields().count(), 2);
    }
}
