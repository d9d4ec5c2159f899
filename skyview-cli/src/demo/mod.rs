//! In-process gateway bundle serving the deterministic demo data set.
//!
//! Every call waits for the configured latency, pages with numeric offset
//! cursors and answers unknown identifiers with `NotFound`. Insights
//! queries move through `Scheduled`, `Running` and `Complete` on successive
//! polls.

mod data;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use skyview_core::error::{GatewayError, GatewayResult};
use skyview_core::filter::{QueryRequest, ScanRequest, project};
use skyview_core::gateway::{
    BucketsGateway, CloudWatchGateway, Cursor, EventsGateway, FunctionsGateway, GatewayBundle,
    GatewayFactory, InsightsGateway, LogEventsFilter, LogsGateway, Page, ParametersGateway,
    StacksGateway, StateMachinesGateway, TablesGateway, VpcGateway,
};
use skyview_core::query::{QueryParams, QueryResults, QueryStatus};
use skyview_core::resource::{
    Alarm, Bucket, EventBus, EventRule, Execution, ExecutionDetail, FunctionSummary, InsightsRow,
    InvokeOutput, Item, LogEvent, LogGroup, LogStream, MetricSummary, ObjectSummary, Parameter,
    Stack, StackEvent, StackResource, StateMachine, Subnet, TableSummary, Vpc,
};

use self::data::DemoData;

const DEFAULT_LATENCY: Duration = Duration::from_millis(150);

/// Profiles whose name starts with this fail to build, so the failed
/// switch path can be seen without real credentials.
pub const BROKEN_PROFILE_PREFIX: &str = "invalid";

pub struct DemoFactory {
    latency: Duration,
}

impl DemoFactory {
    pub fn new() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
        }
    }

    #[cfg(test)]
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for DemoFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayFactory for DemoFactory {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn build(&self, profile: Option<&str>, region: &str) -> GatewayResult<GatewayBundle> {
        if let Some(name) = profile.filter(|p| p.starts_with(BROKEN_PROFILE_PREFIX)) {
            return Err(GatewayError::service(
                "sts",
                "InvalidClientTokenId",
                &format!("The security token included in the request for {name} is invalid"),
            ));
        }
        let gateway = Arc::new(DemoGateway::new(profile, region, self.latency));
        Ok(GatewayBundle {
            profile: profile.map(str::to_string),
            region: region.to_string(),
            functions: gateway.clone(),
            logs: gateway.clone(),
            insights: gateway.clone(),
            cloudwatch: gateway.clone(),
            stacks: gateway.clone(),
            tables: gateway.clone(),
            buckets: gateway.clone(),
            state_machines: gateway.clone(),
            parameters: gateway.clone(),
            vpcs: gateway.clone(),
            events: gateway,
        })
    }
}

#[derive(Debug)]
struct DemoQuery {
    polls: u32,
    rows: Vec<InsightsRow>,
    cancelled: bool,
}

pub struct DemoGateway {
    data: DemoData,
    latency: Duration,
    queries: Mutex<HashMap<String, DemoQuery>>,
}

fn not_found(kind: &str, id: &str) -> GatewayError {
    GatewayError::NotFound(format!("{kind} {id}"))
}

/// Extract `X` from a `filter @message like /X/` clause.
fn message_filter(query: &str) -> Option<String> {
    let start = query.find("@message like /")? + "@message like /".len();
    let rest = &query[start..];
    let end = rest.find('/')?;
    Some(rest[..end].to_lowercase())
}

impl DemoGateway {
    pub fn new(profile: Option<&str>, region: &str, latency: Duration) -> Self {
        Self {
            data: DemoData::generate(profile, region, Utc::now()),
            latency,
            queries: Mutex::new(HashMap::new()),
        }
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn queries(&self) -> MutexGuard<'_, HashMap<String, DemoQuery>> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stream_events(&self, group: &str, stream: Option<&str>) -> GatewayResult<Vec<LogEvent>> {
        let streams = self
            .data
            .log_streams
            .get(group)
            .ok_or_else(|| not_found("log group", group))?;
        let mut events = Vec::new();
        for s in streams.iter().filter(|s| stream.is_none_or(|name| s.name == name)) {
            if let Some(found) = self.data.log_events.get(&(group.to_string(), s.name.clone())) {
                events.extend(found.iter().cloned());
            }
        }
        if let Some(name) = stream {
            if events.is_empty() && !streams.iter().any(|s| s.name == name) {
                return Err(not_found("log stream", name));
            }
        }
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    fn insights_rows(&self, params: &QueryParams, groups: &[String]) -> GatewayResult<Vec<InsightsRow>> {
        let needle = message_filter(&params.query);
        let mut hits = Vec::new();
        for group in groups {
            for event in self.stream_events(group, None)? {
                let in_window = event.timestamp >= params.start && event.timestamp <= params.end;
                let matches = needle
                    .as_deref()
                    .is_none_or(|n| event.message.to_lowercase().contains(n));
                if in_window && matches {
                    hits.push((group.clone(), event));
                }
            }
        }
        hits.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
        hits.truncate(params.limit.max(1));
        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(i, (group, event))| {
                InsightsRow::from_pairs([
                    (
                        "@timestamp",
                        event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                    ),
                    ("@message", event.message),
                    ("@logStream", event.stream),
                    ("@log", format!("{}:{group}", self.data.account)),
                    ("@ptr", format!("ptr-{i}")),
                ])
            })
            .collect())
    }

    fn find_execution(&self, arn: &str) -> Option<&ExecutionDetail> {
        self.data
            .executions
            .values()
            .flatten()
            .find(|e| e.execution.arn == arn)
    }

    fn table_items(&self, table: &str) -> GatewayResult<&[Item]> {
        self.data
            .items
            .get(table)
            .map(Vec::as_slice)
            .ok_or_else(|| not_found("table", table))
    }
}

#[async_trait]
impl FunctionsGateway for DemoGateway {
    async fn list_functions(
        &self,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<FunctionSummary>> {
        self.pause().await;
        Ok(Page::from_slice(&self.data.functions, limit, cursor.as_deref()))
    }

    async fn get_function(&self, name: &str) -> GatewayResult<FunctionSummary> {
        self.pause().await;
        self.data
            .functions
            .iter()
            .find(|f| f.name == name)
            .cloned()
            .ok_or_else(|| not_found("function", name))
    }

    async fn invoke(&self, name: &str, payload: &str) -> GatewayResult<InvokeOutput> {
        let function = self.get_function(name).await?;
        let log_tail = Some(format!(
            "START RequestId: demo Version: $LATEST\nEND RequestId: demo\nREPORT Duration: 12.3 ms Memory Size: {} MB",
            function.memory_mb
        ));
        let input = if payload.trim().is_empty() { "{}" } else { payload };
        Ok(match serde_json::from_str::<serde_json::Value>(input) {
            Ok(event) => InvokeOutput {
                status_code: 200,
                payload: json!({ "statusCode": 200, "function": name, "echo": event }).to_string(),
                function_error: None,
                log_tail,
            },
            Err(e) => InvokeOutput {
                status_code: 200,
                payload: json!({
                    "errorType": "SyntaxError",
                    "errorMessage": format!("Unexpected payload: {e}"),
                })
                .to_string(),
                function_error: Some("Unhandled".to_string()),
                log_tail,
            },
        })
    }
}

#[async_trait]
impl LogsGateway for DemoGateway {
    async fn list_log_groups(
        &self,
        prefix: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<LogGroup>> {
        self.pause().await;
        let groups: Vec<LogGroup> = self
            .data
            .log_groups
            .iter()
            .filter(|g| g.name.starts_with(prefix))
            .cloned()
            .collect();
        Ok(Page::from_slice(&groups, limit, cursor.as_deref()))
    }

    async fn list_log_streams(
        &self,
        group: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<LogStream>> {
        self.pause().await;
        let streams = self
            .data
            .log_streams
            .get(group)
            .ok_or_else(|| not_found("log group", group))?;
        Ok(Page::from_slice(streams, limit, cursor.as_deref()))
    }

    async fn filter_log_events(
        &self,
        filter: &LogEventsFilter,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<LogEvent>> {
        self.pause().await;
        let needle = filter.pattern.trim().to_lowercase();
        let events: Vec<LogEvent> = self
            .stream_events(&filter.group, filter.stream.as_deref())?
            .into_iter()
            .filter(|e| needle.is_empty() || e.message.to_lowercase().contains(&needle))
            .collect();
        Ok(Page::from_slice(&events, limit, cursor.as_deref()))
    }
}

#[async_trait]
impl InsightsGateway for DemoGateway {
    async fn start_query(&self, params: &QueryParams, groups: &[String]) -> GatewayResult<String> {
        self.pause().await;
        let rows = self.insights_rows(params, groups)?;
        let id = Uuid::new_v4().to_string();
        debug!(query_id = %id, rows = rows.len(), "demo query scheduled");
        self.queries().insert(
            id.clone(),
            DemoQuery {
                polls: 0,
                rows,
                cancelled: false,
            },
        );
        Ok(id)
    }

    async fn get_query_results(&self, query_id: &str) -> GatewayResult<QueryResults> {
        self.pause().await;
        let mut queries = self.queries();
        let query = queries
            .get_mut(query_id)
            .ok_or_else(|| not_found("query", query_id))?;
        if query.cancelled {
            return Ok(QueryResults {
                status: QueryStatus::Cancelled,
                rows: Vec::new(),
            });
        }
        query.polls += 1;
        Ok(match query.polls {
            1 => QueryResults {
                status: QueryStatus::Scheduled,
                rows: Vec::new(),
            },
            2 => QueryResults {
                status: QueryStatus::Running,
                rows: query.rows.iter().take(query.rows.len() / 2).cloned().collect(),
            },
            _ => QueryResults {
                status: QueryStatus::Complete,
                rows: query.rows.clone(),
            },
        })
    }

    async fn stop_query(&self, query_id: &str) -> GatewayResult<()> {
        let mut queries = self.queries();
        let query = queries
            .get_mut(query_id)
            .ok_or_else(|| not_found("query", query_id))?;
        query.cancelled = true;
        Ok(())
    }
}

#[async_trait]
impl CloudWatchGateway for DemoGateway {
    async fn list_alarms(&self, limit: usize, cursor: Option<Cursor>) -> GatewayResult<Page<Alarm>> {
        self.pause().await;
        Ok(Page::from_slice(&self.data.alarms, limit, cursor.as_deref()))
    }

    async fn list_metrics(
        &self,
        namespace: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<MetricSummary>> {
        self.pause().await;
        let metrics: Vec<MetricSummary> = self
            .data
            .metrics
            .iter()
            .filter(|m| namespace.is_empty() || m.namespace == namespace)
            .cloned()
            .collect();
        Ok(Page::from_slice(&metrics, limit, cursor.as_deref()))
    }
}

#[async_trait]
impl StacksGateway for DemoGateway {
    async fn list_stacks(&self, limit: usize, cursor: Option<Cursor>) -> GatewayResult<Page<Stack>> {
        self.pause().await;
        Ok(Page::from_slice(&self.data.stacks, limit, cursor.as_deref()))
    }

    async fn describe_stack(&self, name: &str) -> GatewayResult<Stack> {
        self.pause().await;
        self.data
            .stacks
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| not_found("stack", name))
    }

    async fn list_stack_events(
        &self,
        name: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<StackEvent>> {
        self.pause().await;
        let events = self
            .data
            .stack_events
            .get(name)
            .ok_or_else(|| not_found("stack", name))?;
        Ok(Page::from_slice(events, limit, cursor.as_deref()))
    }

    async fn list_stack_resources(&self, name: &str) -> GatewayResult<Vec<StackResource>> {
        self.pause().await;
        self.data
            .stack_resources
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("stack", name))
    }
}

#[async_trait]
impl TablesGateway for DemoGateway {
    async fn list_tables(
        &self,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<TableSummary>> {
        self.pause().await;
        Ok(Page::from_slice(&self.data.tables, limit, cursor.as_deref()))
    }

    async fn describe_table(&self, name: &str) -> GatewayResult<TableSummary> {
        self.pause().await;
        self.data
            .tables
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| not_found("table", name))
    }

    async fn scan(
        &self,
        table: &str,
        request: &ScanRequest,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<Item>> {
        self.pause().await;
        let items: Vec<Item> = self
            .table_items(table)?
            .iter()
            .filter(|item| request.matches(item))
            .map(|item| project(item, &request.projection))
            .collect();
        Ok(Page::from_slice(&items, limit, cursor.as_deref()))
    }

    async fn query(
        &self,
        table: &str,
        request: &QueryRequest,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<Item>> {
        self.pause().await;
        if let Some(index) = &request.index {
            return Err(not_found("index", index));
        }
        let items: Vec<Item> = self
            .table_items(table)?
            .iter()
            .filter(|item| request.matches(item))
            .map(|item| project(item, &request.projection))
            .collect();
        Ok(Page::from_slice(&items, limit, cursor.as_deref()))
    }
}

#[async_trait]
impl BucketsGateway for DemoGateway {
    async fn list_buckets(&self, limit: usize, cursor: Option<Cursor>) -> GatewayResult<Page<Bucket>> {
        self.pause().await;
        Ok(Page::from_slice(&self.data.buckets, limit, cursor.as_deref()))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<ObjectSummary>> {
        self.pause().await;
        let keys = self
            .data
            .objects
            .get(bucket)
            .ok_or_else(|| not_found("bucket", bucket))?;
        let mut prefixes = BTreeSet::new();
        let mut objects = Vec::new();
        for (key, size) in keys.iter().filter(|(k, _)| k.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            match rest.find('/') {
                Some(slash) => {
                    prefixes.insert(format!("{prefix}{}", &rest[..=slash]));
                }
                None => objects.push(ObjectSummary {
                    bucket: bucket.to_string(),
                    key: key.clone(),
                    size: *size,
                    storage_class: "STANDARD".to_string(),
                    last_modified: self.data.buckets.first().and_then(|b| b.created),
                    is_prefix: false,
                }),
            }
        }
        let listing: Vec<ObjectSummary> = prefixes
            .into_iter()
            .map(|key| ObjectSummary {
                bucket: bucket.to_string(),
                key,
                size: 0,
                storage_class: String::new(),
                last_modified: None,
                is_prefix: true,
            })
            .chain(objects)
            .collect();
        Ok(Page::from_slice(&listing, limit, cursor.as_deref()))
    }

    async fn download_object(&self, bucket: &str, key: &str) -> GatewayResult<Vec<u8>> {
        self.pause().await;
        let keys = self
            .data
            .objects
            .get(bucket)
            .ok_or_else(|| not_found("bucket", bucket))?;
        let (key, size) = keys
            .iter()
            .find(|(k, _)| k == key)
            .ok_or_else(|| not_found("object", key))?;
        let line = format!("demo object s3://{bucket}/{key}\n");
        Ok(line.bytes().cycle().take((*size as usize).max(line.len())).collect())
    }
}

#[async_trait]
impl StateMachinesGateway for DemoGateway {
    async fn list_state_machines(
        &self,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<StateMachine>> {
        self.pause().await;
        Ok(Page::from_slice(&self.data.state_machines, limit, cursor.as_deref()))
    }

    async fn list_executions(
        &self,
        machine_arn: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<Execution>> {
        self.pause().await;
        let executions: Vec<Execution> = self
            .data
            .executions
            .get(machine_arn)
            .ok_or_else(|| not_found("state machine", machine_arn))?
            .iter()
            .map(|detail| detail.execution.clone())
            .collect();
        Ok(Page::from_slice(&executions, limit, cursor.as_deref()))
    }

    async fn describe_execution(&self, arn: &str) -> GatewayResult<ExecutionDetail> {
        self.pause().await;
        self.find_execution(arn)
            .cloned()
            .ok_or_else(|| not_found("execution", arn))
    }
}

#[async_trait]
impl ParametersGateway for DemoGateway {
    async fn list_parameters(
        &self,
        prefix: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<Parameter>> {
        self.pause().await;
        let parameters: Vec<Parameter> = self
            .data
            .parameters
            .iter()
            .filter(|p| p.name.starts_with(prefix))
            .map(|p| Parameter {
                value: None,
                ..p.clone()
            })
            .collect();
        Ok(Page::from_slice(&parameters, limit, cursor.as_deref()))
    }

    async fn get_parameter(&self, name: &str) -> GatewayResult<Parameter> {
        self.pause().await;
        self.data
            .parameters
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| not_found("parameter", name))
    }
}

#[async_trait]
impl VpcGateway for DemoGateway {
    async fn list_vpcs(&self, limit: usize, cursor: Option<Cursor>) -> GatewayResult<Page<Vpc>> {
        self.pause().await;
        Ok(Page::from_slice(&self.data.vpcs, limit, cursor.as_deref()))
    }

    async fn list_subnets(
        &self,
        vpc_id: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<Subnet>> {
        self.pause().await;
        let subnets = self
            .data
            .subnets
            .get(vpc_id)
            .ok_or_else(|| not_found("vpc", vpc_id))?;
        Ok(Page::from_slice(subnets, limit, cursor.as_deref()))
    }
}

#[async_trait]
impl EventsGateway for DemoGateway {
    async fn list_event_buses(
        &self,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<EventBus>> {
        self.pause().await;
        Ok(Page::from_slice(&self.data.event_buses, limit, cursor.as_deref()))
    }

    async fn list_rules(
        &self,
        bus: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<EventRule>> {
        self.pause().await;
        let rules = self
            .data
            .rules
            .get(bus)
            .ok_or_else(|| not_found("event bus", bus))?;
        Ok(Page::from_slice(rules, limit, cursor.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyview_core::filter::{FilterInput, ScanForm};
    use skyview_core::query::{PollPolicy, QueryRunner};

    fn bundle() -> GatewayBundle {
        DemoFactory::with_latency(Duration::ZERO)
            .build(None, "us-east-1")
            .unwrap()
    }

    #[tokio::test]
    async fn test_paging_and_not_found() {
        let bundle = bundle();
        let first = bundle.functions.list_functions(4, None).await.unwrap();
        assert_eq!(first.items.len(), 4);
        let second = bundle
            .functions
            .list_functions(4, first.next_cursor.clone())
            .await
            .unwrap();
        assert_ne!(first.items[0].name, second.items[0].name);

        let err = bundle.stacks.describe_stack("nope").await.unwrap_err();
        assert_eq!(err, GatewayError::NotFound("stack nope".into()));
    }

    #[test]
    fn test_broken_profile_fails_to_build() {
        let err = DemoFactory::with_latency(Duration::ZERO)
            .build(Some("invalid-creds"), "us-east-1")
            .unwrap_err();
        assert!(err.to_string().starts_with("sts: InvalidClientTokenId"));
    }

    #[tokio::test]
    async fn test_objects_are_listed_by_prefix() {
        let bundle = bundle();
        let bucket = bundle.buckets.list_buckets(10, None).await.unwrap().items[0]
            .name
            .clone();
        let root = bundle.buckets.list_objects(&bucket, "", 100, None).await.unwrap();
        let keys: Vec<&str> = root.items.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["2024/", "images/", "README.md"]);
        assert!(root.items[0].is_prefix);

        let images = bundle
            .buckets
            .list_objects(&bucket, "images/", 100, None)
            .await
            .unwrap();
        let keys: Vec<&str> = images.items.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["images/icons/", "images/logo.png"]);

        let bytes = bundle
            .buckets
            .download_object(&bucket, "images/icons/close.svg")
            .await
            .unwrap();
        assert_eq!(bytes.len(), 512);
    }

    #[tokio::test]
    async fn test_scan_filters_and_projects() {
        let bundle = bundle();
        let request = ScanForm {
            filters: vec![FilterInput::new("status", "String", "=").with_values("SHIPPED", "")],
            projection: "customer_id, status".into(),
            require_filter: false,
        }
        .build()
        .unwrap();
        let page = bundle.tables.scan("orders", &request, 100, None).await.unwrap();
        assert_eq!(page.items.len(), 20);
        for item in &page.items {
            assert_eq!(item.attributes.len(), 2);
            assert_eq!(item.get("status").map(|v| v.render()), Some("SHIPPED".into()));
        }
    }

    #[tokio::test]
    async fn test_log_event_pattern_is_case_insensitive() {
        let bundle = bundle();
        let filter = LogEventsFilter {
            group: "/custom/audit".into(),
            stream: None,
            pattern: "error".into(),
        };
        let page = bundle.logs.filter_log_events(&filter, 1000, None).await.unwrap();
        assert!(!page.items.is_empty());
        assert!(page.items.iter().all(|e| e.message.contains("ERROR")));
        assert!(page.items.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_insights_query_progresses_to_complete() {
        let bundle = bundle();
        let runner = QueryRunner::new(
            bundle.insights.clone(),
            PollPolicy {
                max_polls: 5,
                interval: Duration::from_millis(1),
            },
        );
        let params = QueryParams::last(
            "fields @timestamp, @message | filter @message like /ERROR/",
            chrono::Duration::hours(6),
            25,
        );
        let rows = runner
            .execute(params, vec!["/ecs/web".into()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 25);
        assert!(rows.iter().all(|r| r.get("@message").is_some_and(|m| m.contains("ERROR"))));
        assert_eq!(rows[0].get("@log").map(|l| l.ends_with(":/ecs/web")), Some(true));
        assert_eq!(runner.status(), QueryStatus::Complete);
    }

    #[tokio::test]
    async fn test_stopped_query_reports_cancelled() {
        let bundle = bundle();
        let params = QueryParams::last("fields @message", chrono::Duration::hours(1), 10);
        let id = bundle
            .insights
            .start_query(&params, &["/ecs/web".to_string()])
            .await
            .unwrap();
        bundle.insights.stop_query(&id).await.unwrap();
        let results = bundle.insights.get_query_results(&id).await.unwrap();
        assert_eq!(results.status, QueryStatus::Cancelled);
    }
}
