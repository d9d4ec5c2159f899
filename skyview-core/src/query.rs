//! Long-poll state machine for Insights-style queries.
//!
//! `execute` stops any previous query, starts a new one and polls until the
//! provider reports a terminal status. Rows are published only on a terminal
//! transition, and the query id is cleared on every exit path.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, UiError};
use crate::gateway::InsightsGateway;
use crate::resource::InsightsRow;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryStatus {
    #[default]
    Idle,
    Scheduled,
    Running,
    Complete,
    Cancelled,
    Failed,
    Timeout,
    Unknown,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Scheduled => "SCHEDULED",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Running)
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryParams {
    pub query: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: usize,
}

impl QueryParams {
    /// A query over the last `window` up to now.
    pub fn last(query: &str, window: chrono::Duration, limit: usize) -> Self {
        let end = Utc::now();
        Self {
            query: query.to_string(),
            start: end - window,
            end,
            limit,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryResults {
    pub status: QueryStatus,
    pub rows: Vec<InsightsRow>,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Input(#[from] UiError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Query failed with status {0}")]
    Failed(QueryStatus),
    #[error("Query did not finish after {0} polls")]
    PollLimit(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_polls: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_polls: 10,
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Default)]
struct RunnerState {
    query_id: Option<String>,
    status: QueryStatus,
}

/// Cheap to clone; clones share the current query.
#[derive(Clone)]
pub struct QueryRunner {
    gateway: Arc<dyn InsightsGateway>,
    policy: PollPolicy,
    state: Arc<Mutex<RunnerState>>,
}

impl QueryRunner {
    pub fn new(gateway: Arc<dyn InsightsGateway>, policy: PollPolicy) -> Self {
        Self {
            gateway,
            policy,
            state: Arc::new(Mutex::new(RunnerState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn query_id(&self) -> Option<String> {
        self.lock().query_id.clone()
    }

    pub fn status(&self) -> QueryStatus {
        self.lock().status
    }

    fn finish(&self, status: QueryStatus) {
        let mut state = self.lock();
        state.query_id = None;
        state.status = status;
    }

    /// Start `params` over `groups` and poll until terminal.
    pub async fn execute(
        &self,
        params: QueryParams,
        groups: Vec<String>,
    ) -> Result<Vec<InsightsRow>, QueryError> {
        if groups.is_empty() {
            return Err(UiError::missing("Log group not selected").into());
        }
        self.stop().await;

        let query_id = match self.gateway.start_query(&params, &groups).await {
            Ok(id) => id,
            Err(e) => {
                self.finish(QueryStatus::Failed);
                return Err(e.into());
            }
        };
        info!(query_id = %query_id, groups = groups.len(), "insights query started");
        {
            let mut state = self.lock();
            state.query_id = Some(query_id.clone());
            state.status = QueryStatus::Running;
        }

        for poll in 1..=self.policy.max_polls {
            tokio::time::sleep(self.policy.interval).await;
            let results = match self.gateway.get_query_results(&query_id).await {
                Ok(results) => results,
                Err(e) => {
                    self.finish(QueryStatus::Failed);
                    return Err(e.into());
                }
            };
            debug!(query_id = %query_id, poll, status = %results.status, "insights poll");

            match results.status {
                status if status.is_pending() => {
                    self.lock().status = status;
                }
                status @ (QueryStatus::Complete | QueryStatus::Cancelled) => {
                    self.finish(status);
                    return Ok(results.rows);
                }
                status => {
                    self.finish(status);
                    return Err(QueryError::Failed(status));
                }
            }
        }

        warn!(query_id = %query_id, polls = self.policy.max_polls, "insights query poll limit reached");
        if let Err(e) = self.gateway.stop_query(&query_id).await {
            debug!(error = %e, "stop after poll limit failed");
        }
        self.finish(QueryStatus::Timeout);
        Err(QueryError::PollLimit(self.policy.max_polls))
    }

    /// Stop the current query, if any.
    pub async fn stop(&self) {
        let query_id = self.lock().query_id.take();
        if let Some(query_id) = query_id {
            if let Err(e) = self.gateway.stop_query(&query_id).await {
                // Usually the query already finished.
                debug!(query_id = %query_id, error = %e, "stop query failed");
            }
            self.lock().status = QueryStatus::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayResult;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedInsights {
        statuses: Mutex<VecDeque<QueryStatus>>,
        rows: Vec<InsightsRow>,
        poll_error: Option<GatewayError>,
        started: Mutex<Vec<String>>,
        stopped: Mutex<Vec<String>>,
    }

    impl ScriptedInsights {
        fn new(statuses: &[QueryStatus], rows: Vec<InsightsRow>) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                rows,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl InsightsGateway for ScriptedInsights {
        async fn start_query(&self, _: &QueryParams, _: &[String]) -> GatewayResult<String> {
            let mut started = self.started.lock().unwrap();
            let id = format!("q-{}", started.len() + 1);
            started.push(id.clone());
            Ok(id)
        }

        async fn get_query_results(&self, _: &str) -> GatewayResult<QueryResults> {
            if let Some(e) = &self.poll_error {
                return Err(e.clone());
            }
            let status = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(QueryStatus::Running);
            let rows = if status == QueryStatus::Complete {
                self.rows.clone()
            } else {
                Vec::new()
            };
            Ok(QueryResults { status, rows })
        }

        async fn stop_query(&self, query_id: &str) -> GatewayResult<()> {
            self.stopped.lock().unwrap().push(query_id.to_string());
            Ok(())
        }
    }

    fn fast() -> PollPolicy {
        PollPolicy {
            max_polls: 10,
            interval: Duration::ZERO,
        }
    }

    fn params() -> QueryParams {
        QueryParams::last("fields @message", chrono::Duration::hours(1), 100)
    }

    #[tokio::test]
    async fn test_running_then_complete_publishes_rows() {
        let rows = vec![InsightsRow::from_pairs([("@message", "hello")])];
        let gateway = Arc::new(ScriptedInsights::new(
            &[QueryStatus::Running, QueryStatus::Running, QueryStatus::Complete],
            rows.clone(),
        ));
        let runner = QueryRunner::new(gateway.clone(), fast());
        let out = runner.execute(params(), vec!["/aws/lambda/a".into()]).await.unwrap();
        assert_eq!(out, rows);
        assert_eq!(runner.query_id(), None);
        assert_eq!(runner.status(), QueryStatus::Complete);
    }

    #[tokio::test]
    async fn test_failed_status_message() {
        let gateway = Arc::new(ScriptedInsights::new(&[QueryStatus::Failed], Vec::new()));
        let runner = QueryRunner::new(gateway, fast());
        let err = runner.execute(params(), vec!["g".into()]).await.unwrap_err();
        assert_eq!(err.to_string(), "Query failed with status FAILED");
        assert_eq!(runner.query_id(), None);
    }

    #[tokio::test]
    async fn test_inner_error_surfaces() {
        let gateway = Arc::new(ScriptedInsights {
            poll_error: Some(GatewayError::service("logs", "MalformedQueryException", "bad")),
            ..Default::default()
        });
        let runner = QueryRunner::new(gateway, fast());
        let err = runner.execute(params(), vec!["g".into()]).await.unwrap_err();
        assert_eq!(err.to_string(), "logs: MalformedQueryException: bad");
        assert_eq!(runner.query_id(), None);
    }

    #[tokio::test]
    async fn test_requires_log_group() {
        let gateway = Arc::new(ScriptedInsights::default());
        let runner = QueryRunner::new(gateway, fast());
        let err = runner.execute(params(), Vec::new()).await.unwrap_err();
        assert!(matches!(err, QueryError::Input(UiError::MissingRequiredInput(_))));
    }

    #[tokio::test]
    async fn test_poll_limit_stops_query() {
        let gateway = Arc::new(ScriptedInsights::new(&[], Vec::new()));
        let runner = QueryRunner::new(
            gateway.clone(),
            PollPolicy {
                max_polls: 3,
                interval: Duration::ZERO,
            },
        );
        let err = runner.execute(params(), vec!["g".into()]).await.unwrap_err();
        assert!(matches!(err, QueryError::PollLimit(3)));
        assert_eq!(runner.query_id(), None);
        assert_eq!(*gateway.stopped.lock().unwrap(), vec!["q-1".to_string()]);
    }

    #[tokio::test]
    async fn test_stop_clears_query_id() {
        let gateway = Arc::new(ScriptedInsights::default());
        let runner = QueryRunner::new(gateway.clone(), fast());
        runner.lock().query_id = Some("q-old".into());
        runner.stop().await;
        assert_eq!(runner.query_id(), None);
        assert_eq!(runner.status(), QueryStatus::Cancelled);
        runner.stop().await;
        assert_eq!(gateway.stopped.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_stops_previous_query() {
        let gateway = Arc::new(ScriptedInsights::new(&[QueryStatus::Complete], Vec::new()));
        let runner = QueryRunner::new(gateway.clone(), fast());
        runner.lock().query_id = Some("q-old".into());
        runner.execute(params(), vec!["g".into()]).await.unwrap();
        assert_eq!(*gateway.stopped.lock().unwrap(), vec!["q-old".to_string()]);
    }
}
