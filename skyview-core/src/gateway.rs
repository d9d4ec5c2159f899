//! Remote resource contracts.
//!
//! Every gateway call returns a `GatewayResult`; nothing panics into the UI.
//! The cursor is opaque to callers and a `None` next cursor is the only
//! end-of-list signal.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::filter::{QueryRequest, ScanRequest};
use crate::query::{QueryParams, QueryResults};
use crate::resource::{
    Alarm, Bucket, EventBus, EventRule, Execution, ExecutionDetail, FunctionSummary,
    InvokeOutput, Item, LogEvent, LogGroup, LogStream, MetricSummary, ObjectSummary, Parameter,
    Stack, StackEvent, StackResource, StateMachine, Subnet, TableSummary, Vpc,
};

/// Opaque continuation token.
pub type Cursor = String;

#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    /// Slice a fully materialised list into a page using a numeric offset
    /// cursor. Used by in-memory gateways.
    pub fn from_slice(all: &[T], limit: usize, cursor: Option<&str>) -> Self
    where
        T: Clone,
    {
        let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let start = start.min(all.len());
        let end = (start + limit.max(1)).min(all.len());
        Self {
            items: all[start..end].to_vec(),
            next_cursor: (end < all.len()).then(|| end.to_string()),
        }
    }
}

/// Parameters of a log events listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogEventsFilter {
    pub group: String,
    pub stream: Option<String>,
    /// Remote filter pattern; empty means everything.
    pub pattern: String,
}

#[async_trait]
pub trait FunctionsGateway: Send + Sync {
    async fn list_functions(
        &self,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<FunctionSummary>>;

    async fn get_function(&self, name: &str) -> GatewayResult<FunctionSummary>;

    async fn invoke(&self, name: &str, payload: &str) -> GatewayResult<InvokeOutput>;
}

#[async_trait]
pub trait LogsGateway: Send + Sync {
    async fn list_log_groups(
        &self,
        prefix: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<LogGroup>>;

    async fn list_log_streams(
        &self,
        group: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<LogStream>>;

    async fn filter_log_events(
        &self,
        filter: &LogEventsFilter,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<LogEvent>>;
}

#[async_trait]
pub trait InsightsGateway: Send + Sync {
    /// Returns the query id.
    async fn start_query(&self, params: &QueryParams, groups: &[String]) -> GatewayResult<String>;

    async fn get_query_results(&self, query_id: &str) -> GatewayResult<QueryResults>;

    async fn stop_query(&self, query_id: &str) -> GatewayResult<()>;
}

#[async_trait]
pub trait CloudWatchGateway: Send + Sync {
    async fn list_alarms(&self, limit: usize, cursor: Option<Cursor>)
    -> GatewayResult<Page<Alarm>>;

    async fn list_metrics(
        &self,
        namespace: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<MetricSummary>>;
}

#[async_trait]
pub trait StacksGateway: Send + Sync {
    async fn list_stacks(&self, limit: usize, cursor: Option<Cursor>)
    -> GatewayResult<Page<Stack>>;

    async fn describe_stack(&self, name: &str) -> GatewayResult<Stack>;

    async fn list_stack_events(
        &self,
        name: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<StackEvent>>;

    async fn list_stack_resources(&self, name: &str) -> GatewayResult<Vec<StackResource>>;
}

#[async_trait]
pub trait TablesGateway: Send + Sync {
    async fn list_tables(
        &self,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<TableSummary>>;

    async fn describe_table(&self, name: &str) -> GatewayResult<TableSummary>;

    async fn scan(
        &self,
        table: &str,
        request: &ScanRequest,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<Item>>;

    async fn query(
        &self,
        table: &str,
        request: &QueryRequest,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<Item>>;
}

#[async_trait]
pub trait BucketsGateway: Send + Sync {
    async fn list_buckets(&self, limit: usize, cursor: Option<Cursor>)
    -> GatewayResult<Page<Bucket>>;

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<ObjectSummary>>;

    async fn download_object(&self, bucket: &str, key: &str) -> GatewayResult<Vec<u8>>;
}

#[async_trait]
pub trait StateMachinesGateway: Send + Sync {
    async fn list_state_machines(
        &self,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<StateMachine>>;

    async fn list_executions(
        &self,
        machine_arn: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<Execution>>;

    async fn describe_execution(&self, arn: &str) -> GatewayResult<ExecutionDetail>;
}

#[async_trait]
pub trait ParametersGateway: Send + Sync {
    async fn list_parameters(
        &self,
        prefix: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<Parameter>>;

    async fn get_parameter(&self, name: &str) -> GatewayResult<Parameter>;
}

#[async_trait]
pub trait VpcGateway: Send + Sync {
    async fn list_vpcs(&self, limit: usize, cursor: Option<Cursor>) -> GatewayResult<Page<Vpc>>;

    async fn list_subnets(
        &self,
        vpc_id: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<Subnet>>;
}

#[async_trait]
pub trait EventsGateway: Send + Sync {
    async fn list_event_buses(
        &self,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<EventBus>>;

    async fn list_rules(
        &self,
        bus: &str,
        limit: usize,
        cursor: Option<Cursor>,
    ) -> GatewayResult<Page<EventRule>>;
}

/// One client per service, bound to a profile and region.
#[derive(Clone)]
pub struct GatewayBundle {
    pub profile: Option<String>,
    pub region: String,
    pub functions: Arc<dyn FunctionsGateway>,
    pub logs: Arc<dyn LogsGateway>,
    pub insights: Arc<dyn InsightsGateway>,
    pub cloudwatch: Arc<dyn CloudWatchGateway>,
    pub stacks: Arc<dyn StacksGateway>,
    pub tables: Arc<dyn TablesGateway>,
    pub buckets: Arc<dyn BucketsGateway>,
    pub state_machines: Arc<dyn StateMachinesGateway>,
    pub parameters: Arc<dyn ParametersGateway>,
    pub vpcs: Arc<dyn VpcGateway>,
    pub events: Arc<dyn EventsGateway>,
}

impl fmt::Debug for GatewayBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayBundle")
            .field("profile", &self.profile)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Builds a bundle for a profile; used at startup and on profile switch.
pub trait GatewayFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn build(&self, profile: Option<&str>, region: &str) -> GatewayResult<GatewayBundle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_from_slice() {
        let all: Vec<u32> = (0..5).collect();
        let first = Page::from_slice(&all, 2, None);
        assert_eq!(first.items, vec![0, 1]);
        assert_eq!(first.next_cursor.as_deref(), Some("2"));

        let last = Page::from_slice(&all, 2, Some("4"));
        assert_eq!(last.items, vec![4]);
        assert_eq!(last.next_cursor, None);

        let past_end = Page::from_slice(&all, 2, Some("9"));
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.next_cursor, None);
    }
}
