//! Deterministic demo data set.
//!
//! Everything derives from the profile name, so switching profile shows a
//! visibly different account. Log timestamps count back from the moment the
//! set is built so relative Insights windows find them.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use skyview_core::resource::{
    Alarm, AttributeValue, Bucket, EventBus, EventRule, Execution, ExecutionDetail,
    FunctionSummary, Item, KeySchema, LogEvent, LogGroup, LogStream, MetricSummary,
    Parameter, Stack, StackEvent, StackResource, StateMachine, Subnet,
    TableSummary, Vpc,
};

const BASE_EPOCH: i64 = 1_714_564_800;

const FUNCTION_NAMES: [&str; 14] = [
    "orders-api",
    "payments-worker",
    "thumbnail-resizer",
    "email-sender",
    "audit-stream",
    "inventory-sync",
    "auth-authorizer",
    "report-builder",
    "webhook-relay",
    "search-indexer",
    "cart-expiry",
    "invoice-renderer",
    "geo-lookup",
    "feature-flags",
];

const RUNTIMES: [&str; 4] = ["nodejs20.x", "python3.12", "java21", "provided.al2023"];

const LEVELS: [&str; 4] = ["INFO", "DEBUG", "WARN", "ERROR"];

pub struct DemoData {
    pub account: String,
    pub region: String,
    pub functions: Vec<FunctionSummary>,
    pub log_groups: Vec<LogGroup>,
    pub log_streams: BTreeMap<String, Vec<LogStream>>,
    pub log_events: BTreeMap<(String, String), Vec<LogEvent>>,
    pub alarms: Vec<Alarm>,
    pub metrics: Vec<MetricSummary>,
    pub stacks: Vec<Stack>,
    pub stack_events: BTreeMap<String, Vec<StackEvent>>,
    pub stack_resources: BTreeMap<String, Vec<StackResource>>,
    pub tables: Vec<TableSummary>,
    pub items: BTreeMap<String, Vec<Item>>,
    pub buckets: Vec<Bucket>,
    pub objects: BTreeMap<String, Vec<(String, u64)>>,
    pub state_machines: Vec<StateMachine>,
    pub executions: BTreeMap<String, Vec<ExecutionDetail>>,
    pub parameters: Vec<Parameter>,
    pub vpcs: Vec<Vpc>,
    pub subnets: BTreeMap<String, Vec<Subnet>>,
    pub event_buses: Vec<EventBus>,
    pub rules: BTreeMap<String, Vec<EventRule>>,
}

fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(BASE_EPOCH, 0).unwrap_or_default()
}

fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

fn n(value: impl ToString) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

fn item(pairs: Vec<(&str, AttributeValue)>) -> Item {
    Item {
        attributes: pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    }
}

/// Small deterministic hash of the profile name.
pub fn profile_seed(profile: Option<&str>) -> usize {
    profile
        .unwrap_or("default")
        .bytes()
        .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
        % 1_000_003
}

impl DemoData {
    pub fn generate(profile: Option<&str>, region: &str, now: DateTime<Utc>) -> Self {
        let seed = profile_seed(profile);
        let account = format!("{}", 100_000_000_000u64 + (seed as u64 % 899_999_999_999));
        let mut data = Self {
            account,
            region: region.to_string(),
            functions: Vec::new(),
            log_groups: Vec::new(),
            log_streams: BTreeMap::new(),
            log_events: BTreeMap::new(),
            alarms: Vec::new(),
            metrics: Vec::new(),
            stacks: Vec::new(),
            stack_events: BTreeMap::new(),
            stack_resources: BTreeMap::new(),
            tables: Vec::new(),
            items: BTreeMap::new(),
            buckets: Vec::new(),
            objects: BTreeMap::new(),
            state_machines: Vec::new(),
            executions: BTreeMap::new(),
            parameters: Vec::new(),
            vpcs: Vec::new(),
            subnets: BTreeMap::new(),
            event_buses: Vec::new(),
            rules: BTreeMap::new(),
        };
        data.lambda(seed);
        data.logs(seed, now);
        data.cloudwatch(seed);
        data.cloudformation(seed);
        data.dynamodb(seed);
        data.s3(seed);
        data.step_functions(seed);
        data.ssm(seed);
        data.vpc(seed);
        data.eventbridge(seed);
        data
    }

    fn arn(&self, service: &str, resource: &str) -> String {
        format!(
            "arn:aws:{service}:{}:{}:{resource}",
            self.region, self.account
        )
    }

    fn lambda(&mut self, seed: usize) {
        let count = 10 + seed % 5;
        for (i, name) in FUNCTION_NAMES.iter().take(count).enumerate() {
            let mut environment = BTreeMap::new();
            environment.insert("STAGE".to_string(), "prod".to_string());
            if i % 3 == 0 {
                environment.insert("TABLE_NAME".to_string(), "orders".to_string());
            }
            self.functions.push(FunctionSummary {
                name: name.to_string(),
                arn: self.arn("lambda", &format!("function:{name}")),
                runtime: RUNTIMES[(i + seed) % RUNTIMES.len()].to_string(),
                handler: "index.handler".to_string(),
                memory_mb: 128 << (i % 4),
                timeout_secs: 3 + (i as u32 % 5) * 10,
                last_modified: Some(base_time() - Duration::days(i as i64)),
                log_group: (*name == "audit-stream").then(|| "/custom/audit".to_string()),
                environment,
            });
        }
    }

    fn logs(&mut self, seed: usize, now: DateTime<Utc>) {
        let mut groups: Vec<String> = self
            .functions
            .iter()
            .map(FunctionSummary::resolved_log_group)
            .collect();
        groups.push("/ecs/web".to_string());
        groups.sort();

        for (g, group) in groups.iter().enumerate() {
            self.log_groups.push(LogGroup {
                name: group.clone(),
                arn: self.arn("logs", &format!("log-group:{group}")),
                stored_bytes: ((g + 1) * 48_000 + seed % 1000) as u64,
                retention_days: (g % 2 == 0).then_some(14),
                created: Some(base_time() - Duration::days(30 + g as i64)),
            });

            let mut streams = Vec::new();
            for day in 0..4 {
                let stream = format!("2024/05/{:02}/[$LATEST]{:08x}", day + 1, (seed + g * 97 + day) * 2654435761 % 0xffff_ffff);
                let mut events = Vec::new();
                for e in 0..30i64 {
                    let level = LEVELS[(e as usize + g) % LEVELS.len()];
                    let timestamp = now - Duration::minutes((day as i64) * 45 + e);
                    let message = if e % 5 == 0 {
                        format!(
                            r#"{{"level":"{level}","requestId":"req-{g}-{day}-{e}","durationMs":{},"path":"/orders/{e}"}}"#,
                            (e * 7 + g as i64) % 900
                        )
                    } else {
                        format!("{level} request {e} handled by {group} in {}ms", (e * 13) % 400)
                    };
                    events.push(LogEvent {
                        stream: stream.clone(),
                        timestamp,
                        message,
                    });
                }
                events.sort_by_key(|e| e.timestamp);
                streams.push(LogStream {
                    group: group.clone(),
                    name: stream.clone(),
                    first_event: events.first().map(|e| e.timestamp),
                    last_event: events.last().map(|e| e.timestamp),
                });
                self.log_events.insert((group.clone(), stream), events);
            }
            streams.sort_by(|a, b| b.last_event.cmp(&a.last_event));
            self.log_streams.insert(group.clone(), streams);
        }
    }

    fn cloudwatch(&mut self, seed: usize) {
        let states = ["OK", "ALARM", "INSUFFICIENT_DATA", "OK"];
        for (i, function) in self.functions.iter().take(8).enumerate() {
            let state = states[(i + seed) % states.len()];
            let name = format!("{}-errors", function.name);
            self.alarms.push(Alarm {
                arn: format!(
                    "arn:aws:cloudwatch:{}:{}:alarm:{name}",
                    self.region, self.account
                ),
                name,
                state: state.to_string(),
                metric: "Errors".to_string(),
                namespace: "AWS/Lambda".to_string(),
                threshold: (i as f64 + 1.0) * 5.0,
                updated: Some(base_time() - Duration::hours(i as i64)),
                reason: format!("Threshold Crossed: datapoint evaluated to {state}"),
            });
        }

        for function in &self.functions {
            for metric in ["Invocations", "Errors", "Duration", "Throttles"] {
                let mut dimensions = BTreeMap::new();
                dimensions.insert("FunctionName".to_string(), function.name.clone());
                self.metrics.push(MetricSummary {
                    namespace: "AWS/Lambda".to_string(),
                    name: metric.to_string(),
                    dimensions,
                });
            }
        }
        for table in ["users", "orders", "sessions", "inventory"] {
            for metric in ["ConsumedReadCapacityUnits", "ConsumedWriteCapacityUnits"] {
                let mut dimensions = BTreeMap::new();
                dimensions.insert("TableName".to_string(), table.to_string());
                self.metrics.push(MetricSummary {
                    namespace: "AWS/DynamoDB".to_string(),
                    name: metric.to_string(),
                    dimensions,
                });
            }
        }
    }

    fn cloudformation(&mut self, seed: usize) {
        let names = ["network", "data", "api", "frontend", "monitoring"];
        let statuses = [
            "CREATE_COMPLETE",
            "UPDATE_COMPLETE",
            "UPDATE_ROLLBACK_COMPLETE",
            "CREATE_COMPLETE",
            "UPDATE_IN_PROGRESS",
        ];
        for (i, short) in names.iter().enumerate() {
            let name = format!("{short}-prod");
            let status = statuses[(i + seed) % statuses.len()];
            let mut parameters = BTreeMap::new();
            parameters.insert("Stage".to_string(), "prod".to_string());
            let mut outputs = BTreeMap::new();
            outputs.insert(
                format!("{}Arn", short),
                self.arn("cloudformation", &format!("export/{short}")),
            );
            self.stacks.push(Stack {
                id: self.arn("cloudformation", &format!("stack/{name}/{i:04}")),
                name: name.clone(),
                status: status.to_string(),
                description: Some(format!("The {short} layer")),
                created: Some(base_time() - Duration::days(90 - i as i64)),
                updated: Some(base_time() - Duration::days(i as i64)),
                parameters,
                outputs,
            });

            let resource_types = [
                "AWS::IAM::Role",
                "AWS::Lambda::Function",
                "AWS::DynamoDB::Table",
                "AWS::S3::Bucket",
                "AWS::SNS::Topic",
                "AWS::SQS::Queue",
            ];
            let resources: Vec<StackResource> = resource_types
                .iter()
                .enumerate()
                .map(|(r, kind)| StackResource {
                    logical_id: format!("{}{}", kind.rsplit("::").next().unwrap_or("Res"), r),
                    physical_id: format!("{name}-{}", r * 1000 + i),
                    resource_type: kind.to_string(),
                    status: "CREATE_COMPLETE".to_string(),
                })
                .collect();

            let mut events = Vec::new();
            for (e, resource) in resources.iter().enumerate() {
                for (step, phase) in ["CREATE_IN_PROGRESS", "CREATE_COMPLETE"].iter().enumerate() {
                    events.push(StackEvent {
                        stack: name.clone(),
                        timestamp: base_time() - Duration::minutes((e * 2 + step) as i64),
                        logical_id: resource.logical_id.clone(),
                        resource_type: resource.resource_type.clone(),
                        status: phase.to_string(),
                        reason: (step == 0).then(|| "Resource creation Initiated".to_string()),
                    });
                }
            }
            events.push(StackEvent {
                stack: name.clone(),
                timestamp: base_time(),
                logical_id: name.clone(),
                resource_type: "AWS::CloudFormation::Stack".to_string(),
                status: status.to_string(),
                reason: None,
            });
            events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            self.stack_events.insert(name.clone(), events);
            self.stack_resources.insert(name, resources);
        }
    }

    fn dynamodb(&mut self, seed: usize) {
        let schemas = [
            ("users", "user_id", None),
            ("orders", "customer_id", Some("order_date")),
            ("sessions", "session_id", None),
            ("inventory", "sku", Some("warehouse")),
        ];
        for (t, (name, pk, sk)) in schemas.iter().enumerate() {
            let items: Vec<Item> = (0..60usize)
                .map(|i| match *name {
                    "users" => {
                        let mut attrs = vec![
                            ("user_id", s(&format!("u#{i:03}"))),
                            ("email", s(&format!("user{i}@example.com"))),
                            ("age", n(18 + (i * 7 + seed) % 50)),
                            ("active", AttributeValue::Bool(i % 3 != 0)),
                        ];
                        if i % 4 == 0 {
                            attrs.push((
                                "tags",
                                AttributeValue::L(vec![s("beta"), s("newsletter")]),
                            ));
                        }
                        item(attrs)
                    }
                    "orders" => item(vec![
                        ("customer_id", s(&format!("c#{:03}", i % 10))),
                        ("order_date", s(&format!("2024-05-{:02}", i / 10 + 1))),
                        ("total", n(format!("{}.{:02}", 10 + i * 3, i % 100))),
                        ("status", s(["PENDING", "SHIPPED", "DELIVERED"][i % 3])),
                    ]),
                    "sessions" => {
                        let mut device = BTreeMap::new();
                        device.insert("os".to_string(), s(["ios", "android", "web"][i % 3]));
                        item(vec![
                            ("session_id", s(&format!("s-{:06x}", i * 7919 + seed))),
                            ("user_id", s(&format!("u#{:03}", i % 20))),
                            ("device", AttributeValue::M(device)),
                            ("expired", AttributeValue::Bool(i % 5 == 0)),
                        ])
                    }
                    _ => item(vec![
                        ("sku", s(&format!("SKU-{:04}", i / 2))),
                        ("warehouse", s(["east", "west"][i % 2])),
                        ("quantity", n((i * 37 + seed) % 500)),
                    ]),
                })
                .collect();
            self.tables.push(TableSummary {
                name: name.to_string(),
                arn: self.arn("dynamodb", &format!("table/{name}")),
                status: "ACTIVE".to_string(),
                item_count: items.len() as u64,
                size_bytes: (items.len() * 180 + t * 7) as u64,
                key_schema: KeySchema {
                    partition_key: pk.to_string(),
                    sort_key: sk.map(str::to_string),
                },
            });
            self.items.insert(name.to_string(), items);
        }
    }

    fn s3(&mut self, seed: usize) {
        let names = ["app-logs", "static-assets", "data-lake", "backups", "uploads"];
        for (b, short) in names.iter().enumerate() {
            let name = format!("{short}-{:04}", seed % 10_000);
            self.buckets.push(Bucket {
                name: name.clone(),
                region: self.region.clone(),
                created: Some(base_time() - Duration::days(365 - b as i64 * 20)),
            });
            let mut keys = vec![("README.md".to_string(), 1_024u64)];
            for day in 1..=3 {
                for hour in [0, 6, 12, 18] {
                    keys.push((
                        format!("2024/05/{day:02}/events-{hour:02}.json"),
                        (4_096 * (day + hour + 1)) as u64,
                    ));
                }
            }
            keys.push(("images/logo.png".to_string(), 20_480));
            keys.push(("images/icons/close.svg".to_string(), 512));
            keys.sort();
            self.objects.insert(name, keys);
        }
    }

    fn step_functions(&mut self, seed: usize) {
        let names = ["order-fulfilment", "refund-flow", "nightly-report", "user-onboarding"];
        let statuses = ["SUCCEEDED", "FAILED", "RUNNING", "SUCCEEDED", "TIMED_OUT", "ABORTED"];
        for (m, name) in names.iter().enumerate() {
            let arn = self.arn("states", &format!("stateMachine:{name}"));
            self.state_machines.push(StateMachine {
                name: name.to_string(),
                arn: arn.clone(),
                kind: if m % 2 == 0 { "STANDARD" } else { "EXPRESS" }.to_string(),
                created: Some(base_time() - Duration::days(60 + m as i64)),
            });
            let executions = (0..20usize)
                .map(|e| {
                    let status = statuses[(e + seed + m) % statuses.len()];
                    let exec_name = format!("run-{:04}", 1000 + e);
                    let started = base_time() - Duration::hours(e as i64);
                    let execution = Execution {
                        name: exec_name.clone(),
                        arn: self.arn("states", &format!("execution:{name}:{exec_name}")),
                        state_machine_arn: arn.clone(),
                        status: status.to_string(),
                        started: Some(started),
                        stopped: (status != "RUNNING").then(|| started + Duration::seconds(42)),
                    };
                    let failed = matches!(status, "FAILED" | "TIMED_OUT");
                    ExecutionDetail {
                        execution,
                        input: format!(r#"{{"orderId":"o-{e}","attempt":1}}"#),
                        output: (status == "SUCCEEDED")
                            .then(|| format!(r#"{{"orderId":"o-{e}","result":"ok"}}"#)),
                        error: failed.then(|| "States.TaskFailed".to_string()),
                        cause: failed.then(|| format!("Task charge-card failed for o-{e}")),
                    }
                })
                .collect();
            self.executions.insert(arn, executions);
        }
    }

    fn ssm(&mut self, seed: usize) {
        let names = [
            ("/app/prod/db/host", "String", "db.internal.example.com"),
            ("/app/prod/db/port", "String", "5432"),
            ("/app/prod/db/password", "SecureString", "s3cr3t-value"),
            ("/app/prod/api/url", "String", "https://api.example.com"),
            ("/app/prod/api/keys", "StringList", "key-a,key-b,key-c"),
            ("/app/prod/flags", "String", r#"{"newCheckout":true,"darkMode":false}"#),
            ("/app/staging/db/host", "String", "db.staging.example.com"),
            ("/app/staging/db/password", "SecureString", "st4ging"),
            ("/app/staging/api/url", "String", "https://staging.example.com"),
            ("/shared/region", "String", "us-east-1"),
            ("/shared/log-level", "String", "info"),
            ("/shared/feature/search", "String", "enabled"),
        ];
        for (i, (name, kind, value)) in names.iter().enumerate() {
            self.parameters.push(Parameter {
                name: name.to_string(),
                kind: kind.to_string(),
                version: 1 + ((i + seed) % 4) as i64,
                last_modified: Some(base_time() - Duration::days(i as i64 * 3)),
                value: Some(value.to_string()),
            });
        }
    }

    fn vpc(&mut self, seed: usize) {
        let azs = ["a", "b", "c"];
        for v in 0..3usize {
            let id = format!("vpc-{:08x}", (seed + v * 4099) % 0xffff_ffff);
            self.vpcs.push(Vpc {
                id: id.clone(),
                name: match v {
                    0 => None,
                    1 => Some("prod".to_string()),
                    _ => Some("staging".to_string()),
                },
                cidr: format!("10.{v}.0.0/16"),
                state: "available".to_string(),
                is_default: v == 0,
            });
            let subnets = (0..4usize)
                .map(|sn| Subnet {
                    id: format!("subnet-{:08x}", (seed + v * 131 + sn * 17) % 0xffff_ffff),
                    vpc_id: id.clone(),
                    cidr: format!("10.{v}.{sn}.0/24"),
                    availability_zone: format!("{}{}", self.region, azs[sn % azs.len()]),
                    available_ips: 251 - (sn as u32 * 11),
                })
                .collect();
            self.subnets.insert(id, subnets);
        }
    }

    fn eventbridge(&mut self, _seed: usize) {
        for bus in ["default", "orders", "audit"] {
            self.event_buses.push(EventBus {
                name: bus.to_string(),
                arn: self.arn("events", &format!("event-bus/{bus}")),
                policy: (bus != "default").then(|| {
                    format!(r#"{{"Version":"2012-10-17","Statement":[{{"Sid":"allow-{bus}"}}]}}"#)
                }),
            });
            let rules = (0..5usize)
                .map(|r| EventRule {
                    name: format!("{bus}-rule-{r}"),
                    bus: bus.to_string(),
                    state: if r == 4 { "DISABLED" } else { "ENABLED" }.to_string(),
                    schedule: (r % 2 == 0).then(|| format!("rate({} minutes)", 5 * (r + 1))),
                    pattern: (r % 2 == 1).then(|| {
                        format!(r#"{{"source":["app.{bus}"],"detail-type":["event-{r}"]}}"#)
                    }),
                })
                .collect();
            self.rules.insert(bus.to_string(), rules);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_differ_deterministically() {
        let now = Utc::now();
        let a = DemoData::generate(None, "us-east-1", now);
        let b = DemoData::generate(None, "us-east-1", now);
        let c = DemoData::generate(Some("staging"), "us-east-1", now);
        assert_eq!(a.account, b.account);
        assert_eq!(a.functions, b.functions);
        assert_ne!(a.account, c.account);
    }

    #[test]
    fn test_every_function_has_a_log_group() {
        let data = DemoData::generate(None, "eu-west-1", Utc::now());
        for function in &data.functions {
            let group = function.resolved_log_group();
            assert!(
                data.log_groups.iter().any(|g| g.name == group),
                "missing {group}"
            );
            assert!(!data.log_streams[&group].is_empty());
        }
        assert!(data.functions[0].arn.contains(":eu-west-1:"));
    }
}
