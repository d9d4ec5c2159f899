//! Cross-view drill-through graph.
//!
//! Selecting a row produces a plan of steps: configure one or more target
//! views with a key, refresh them, then optionally switch page and focus a
//! pane. The plan is data; the shell executes it against whatever views own
//! the addressed panes, so no view holds a reference to another.

use std::fmt;

use crate::error::UiError;
use crate::resource::{
    Bucket, EventBus, Execution, FunctionSummary, InsightsRow, LogGroup, LogStream,
    ObjectSummary, Stack, StateMachine, TableSummary, Vpc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Lambda,
    Logs,
    CloudWatch,
    CloudFormation,
    DynamoDb,
    S3,
    StepFunctions,
    Ssm,
    Vpc,
    EventBridge,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 10] = [
        Self::Lambda,
        Self::Logs,
        Self::CloudWatch,
        Self::CloudFormation,
        Self::DynamoDb,
        Self::S3,
        Self::StepFunctions,
        Self::Ssm,
        Self::Vpc,
        Self::EventBridge,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Lambda => "Lambda",
            Self::Logs => "CloudWatch Logs",
            Self::CloudWatch => "CloudWatch",
            Self::CloudFormation => "CloudFormation",
            Self::DynamoDb => "DynamoDB",
            Self::S3 => "S3",
            Self::StepFunctions => "Step Functions",
            Self::Ssm => "Systems Manager",
            Self::Vpc => "VPC",
            Self::EventBridge => "EventBridge",
        }
    }

    pub fn pages(&self) -> &'static [PageKind] {
        use PageKind::*;
        match self {
            Self::Lambda => &[Functions, Invoke],
            Self::Logs => &[LogGroups, LogEvents, Insights],
            Self::CloudWatch => &[Alarms, Metrics],
            Self::CloudFormation => &[Stacks],
            Self::DynamoDb => &[Tables, Items],
            Self::S3 => &[Buckets, Objects],
            Self::StepFunctions => &[StateMachines, Executions],
            Self::Ssm => &[Parameters],
            Self::Vpc => &[Vpcs],
            Self::EventBridge => &[EventBuses],
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageKind {
    Functions,
    Invoke,
    LogGroups,
    LogEvents,
    Insights,
    Alarms,
    Metrics,
    Stacks,
    Tables,
    Items,
    Buckets,
    Objects,
    StateMachines,
    Executions,
    Parameters,
    Vpcs,
    EventBuses,
}

impl PageKind {
    pub fn service(&self) -> ServiceKind {
        match self {
            Self::Functions | Self::Invoke => ServiceKind::Lambda,
            Self::LogGroups | Self::LogEvents | Self::Insights => ServiceKind::Logs,
            Self::Alarms | Self::Metrics => ServiceKind::CloudWatch,
            Self::Stacks => ServiceKind::CloudFormation,
            Self::Tables | Self::Items => ServiceKind::DynamoDb,
            Self::Buckets | Self::Objects => ServiceKind::S3,
            Self::StateMachines | Self::Executions => ServiceKind::StepFunctions,
            Self::Parameters => ServiceKind::Ssm,
            Self::Vpcs => ServiceKind::Vpc,
            Self::EventBuses => ServiceKind::EventBridge,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Functions => "Functions",
            Self::Invoke => "Invoke",
            Self::LogGroups => "Log Groups",
            Self::LogEvents => "Log Events",
            Self::Insights => "Insights",
            Self::Alarms => "Alarms",
            Self::Metrics => "Metrics",
            Self::Stacks => "Stacks",
            Self::Tables => "Tables",
            Self::Items => "Items",
            Self::Buckets => "Buckets",
            Self::Objects => "Objects",
            Self::StateMachines => "State Machines",
            Self::Executions => "Executions",
            Self::Parameters => "Parameters",
            Self::Vpcs => "VPCs",
            Self::EventBuses => "Event Buses",
        }
    }
}

/// Focusable panes. A pane belongs to exactly one page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaneKind {
    Functions,
    FunctionDetails,
    InvokePayload,
    InvokeResult,
    LogGroups,
    LogStreams,
    LogEvents,
    EventDetails,
    InsightsGroups,
    InsightsQuery,
    InsightsResults,
    Alarms,
    AlarmDetails,
    Metrics,
    Stacks,
    StackDetails,
    StackEvents,
    StackResources,
    Tables,
    TableDetails,
    Items,
    ItemDetails,
    Buckets,
    Objects,
    ObjectDetails,
    StateMachines,
    Executions,
    ExecutionSummary,
    ExecutionDetails,
    Parameters,
    ParameterDetails,
    Vpcs,
    Subnets,
    EventBuses,
    Rules,
    RuleDetails,
}

impl PaneKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Functions => "Functions",
            Self::FunctionDetails => "Function Details",
            Self::InvokePayload => "Payload",
            Self::InvokeResult => "Result",
            Self::LogGroups => "Log Groups",
            Self::LogStreams => "Log Streams",
            Self::LogEvents => "Log Events",
            Self::EventDetails => "Event",
            Self::InsightsGroups => "Log Groups",
            Self::InsightsQuery => "Query",
            Self::InsightsResults => "Results",
            Self::Alarms => "Alarms",
            Self::AlarmDetails => "Alarm Details",
            Self::Metrics => "Metrics",
            Self::Stacks => "Stacks",
            Self::StackDetails => "Stack Details",
            Self::StackEvents => "Stack Events",
            Self::StackResources => "Resources",
            Self::Tables => "Tables",
            Self::TableDetails => "Table Details",
            Self::Items => "Items",
            Self::ItemDetails => "Item",
            Self::Buckets => "Buckets",
            Self::Objects => "Objects",
            Self::ObjectDetails => "Object Details",
            Self::StateMachines => "State Machines",
            Self::Executions => "Executions",
            Self::ExecutionSummary => "Summary",
            Self::ExecutionDetails => "Input / Output",
            Self::Parameters => "Parameters",
            Self::ParameterDetails => "Value",
            Self::Vpcs => "VPCs",
            Self::Subnets => "Subnets",
            Self::EventBuses => "Event Buses",
            Self::Rules => "Rules",
            Self::RuleDetails => "Rule",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewAddress {
    pub page: PageKind,
    pub pane: PaneKind,
}

impl ViewAddress {
    pub const fn new(page: PageKind, pane: PaneKind) -> Self {
        Self { page, pane }
    }
}

/// The parameter a target view is configured with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrillKey {
    Function { name: String },
    LogGroup { group: String },
    LogStream { group: String, stream: String },
    Stack { name: String },
    StateMachine { arn: String },
    Execution { arn: String },
    Table { name: String },
    Bucket { bucket: String, prefix: String },
    Vpc { id: String },
    EventBus { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrillStep {
    Configure { target: ViewAddress, key: DrillKey },
    Refresh { target: ViewAddress, reset: bool },
    SwitchPage(PageKind),
    FocusPane(ViewAddress),
}

/// What the user selected.
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    Function(FunctionSummary),
    LogGroup(LogGroup),
    LogStream(LogStream),
    InsightsRow(InsightsRow),
    Stack(Stack),
    StateMachine(StateMachine),
    Execution(Execution),
    Table(TableSummary),
    Bucket(Bucket),
    Object(ObjectSummary),
    Vpc(Vpc),
    EventBus(EventBus),
}

const STREAMS: ViewAddress = ViewAddress::new(PageKind::LogGroups, PaneKind::LogStreams);
const EVENTS: ViewAddress = ViewAddress::new(PageKind::LogEvents, PaneKind::LogEvents);
const OBJECTS: ViewAddress = ViewAddress::new(PageKind::Objects, PaneKind::Objects);

pub struct DrillController;

impl DrillController {
    pub fn plan(selection: &Selection) -> Result<Vec<DrillStep>, UiError> {
        use DrillStep::*;

        Ok(match selection {
            Selection::Function(f) => vec![
                Configure {
                    target: STREAMS,
                    key: DrillKey::LogGroup {
                        group: f.resolved_log_group(),
                    },
                },
                Refresh {
                    target: STREAMS,
                    reset: true,
                },
                SwitchPage(PageKind::LogGroups),
                FocusPane(STREAMS),
            ],
            Selection::LogGroup(g) => vec![
                Configure {
                    target: STREAMS,
                    key: DrillKey::LogGroup {
                        group: g.name.clone(),
                    },
                },
                Refresh {
                    target: STREAMS,
                    reset: true,
                },
                FocusPane(STREAMS),
            ],
            Selection::LogStream(s) => events_steps(s.group.clone(), s.name.clone()),
            Selection::InsightsRow(row) => {
                let log = row
                    .get("@log")
                    .ok_or_else(|| UiError::missing("Result row has no @log field"))?;
                let stream = row
                    .get("@logStream")
                    .ok_or_else(|| UiError::missing("Result row has no @logStream field"))?;
                events_steps(group_from_log_field(log), stream.to_string())
            }
            Selection::Stack(s) => {
                let key = DrillKey::Stack {
                    name: s.name.clone(),
                };
                let mut steps = Vec::new();
                for pane in [
                    PaneKind::StackDetails,
                    PaneKind::StackEvents,
                    PaneKind::StackResources,
                ] {
                    let target = ViewAddress::new(PageKind::Stacks, pane);
                    steps.push(Configure {
                        target,
                        key: key.clone(),
                    });
                    steps.push(Refresh {
                        target,
                        reset: true,
                    });
                }
                steps
            }
            Selection::StateMachine(m) => {
                let target = ViewAddress::new(PageKind::Executions, PaneKind::Executions);
                vec![
                    Configure {
                        target,
                        key: DrillKey::StateMachine { arn: m.arn.clone() },
                    },
                    Refresh {
                        target,
                        reset: true,
                    },
                    SwitchPage(PageKind::Executions),
                    FocusPane(target),
                ]
            }
            Selection::Execution(e) => {
                let key = DrillKey::Execution { arn: e.arn.clone() };
                let mut steps = Vec::new();
                for pane in [PaneKind::ExecutionSummary, PaneKind::ExecutionDetails] {
                    let target = ViewAddress::new(PageKind::Executions, pane);
                    steps.push(Configure {
                        target,
                        key: key.clone(),
                    });
                    steps.push(Refresh {
                        target,
                        reset: true,
                    });
                }
                steps
            }
            Selection::Table(t) => {
                let target = ViewAddress::new(PageKind::Items, PaneKind::Items);
                vec![
                    Configure {
                        target,
                        key: DrillKey::Table {
                            name: t.name.clone(),
                        },
                    },
                    Refresh {
                        target,
                        reset: true,
                    },
                    SwitchPage(PageKind::Items),
                    FocusPane(target),
                ]
            }
            Selection::Bucket(b) => vec![
                Configure {
                    target: OBJECTS,
                    key: DrillKey::Bucket {
                        bucket: b.name.clone(),
                        prefix: String::new(),
                    },
                },
                Refresh {
                    target: OBJECTS,
                    reset: true,
                },
                SwitchPage(PageKind::Objects),
                FocusPane(OBJECTS),
            ],
            Selection::Object(o) if o.is_prefix => vec![
                Configure {
                    target: OBJECTS,
                    key: DrillKey::Bucket {
                        bucket: o.bucket.clone(),
                        prefix: o.key.clone(),
                    },
                },
                Refresh {
                    target: OBJECTS,
                    reset: true,
                },
            ],
            Selection::Object(_) => Vec::new(),
            Selection::Vpc(v) => {
                let target = ViewAddress::new(PageKind::Vpcs, PaneKind::Subnets);
                vec![
                    Configure {
                        target,
                        key: DrillKey::Vpc { id: v.id.clone() },
                    },
                    Refresh {
                        target,
                        reset: true,
                    },
                    FocusPane(target),
                ]
            }
            Selection::EventBus(b) => {
                let target = ViewAddress::new(PageKind::EventBuses, PaneKind::Rules);
                vec![
                    Configure {
                        target,
                        key: DrillKey::EventBus {
                            name: b.name.clone(),
                        },
                    },
                    Refresh {
                        target,
                        reset: true,
                    },
                    FocusPane(target),
                ]
            }
        })
    }
}

impl DrillController {
    /// Open the Invoke page on `function`'s payload editor.
    pub fn invoke_plan(function: &FunctionSummary) -> Vec<DrillStep> {
        let target = ViewAddress::new(PageKind::Invoke, PaneKind::InvokePayload);
        vec![
            DrillStep::Configure {
                target,
                key: DrillKey::Function {
                    name: function.name.clone(),
                },
            },
            DrillStep::SwitchPage(PageKind::Invoke),
            DrillStep::FocusPane(target),
        ]
    }
}

fn events_steps(group: String, stream: String) -> Vec<DrillStep> {
    vec![
        DrillStep::Configure {
            target: EVENTS,
            key: DrillKey::LogStream { group, stream },
        },
        DrillStep::Refresh {
            target: EVENTS,
            reset: true,
        },
        DrillStep::SwitchPage(PageKind::LogEvents),
        DrillStep::FocusPane(EVENTS),
    ]
}

/// `@log` is `<account>:<group>`; the group itself may contain colons.
pub fn group_from_log_field(log: &str) -> String {
    match log.split_once(':') {
        Some((_, group)) => group.to_string(),
        None => log.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn function(name: &str, log_group: Option<&str>) -> FunctionSummary {
        FunctionSummary {
            name: name.into(),
            arn: format!("arn:aws:lambda:us-east-1:123:function:{name}"),
            runtime: "nodejs20.x".into(),
            handler: "index.handler".into(),
            memory_mb: 128,
            timeout_secs: 3,
            last_modified: None,
            log_group: log_group.map(str::to_string),
            environment: BTreeMap::new(),
        }
    }

    #[test]
    fn test_function_drills_into_log_streams() {
        let steps = DrillController::plan(&Selection::Function(function("orders", None))).unwrap();
        assert_eq!(
            steps[0],
            DrillStep::Configure {
                target: STREAMS,
                key: DrillKey::LogGroup {
                    group: "/aws/lambda/orders".into()
                },
            }
        );
        assert_eq!(
            steps[1],
            DrillStep::Refresh {
                target: STREAMS,
                reset: true
            }
        );
        assert_eq!(steps[2], DrillStep::SwitchPage(PageKind::LogGroups));
        assert_eq!(PageKind::LogGroups.service(), ServiceKind::Logs);
    }

    #[test]
    fn test_invoke_targets_payload_editor() {
        let steps = DrillController::invoke_plan(&function("orders", None));
        assert_eq!(
            steps,
            vec![
                DrillStep::Configure {
                    target: ViewAddress::new(PageKind::Invoke, PaneKind::InvokePayload),
                    key: DrillKey::Function {
                        name: "orders".into()
                    },
                },
                DrillStep::SwitchPage(PageKind::Invoke),
                DrillStep::FocusPane(ViewAddress::new(PageKind::Invoke, PaneKind::InvokePayload)),
            ]
        );
    }

    #[test]
    fn test_custom_log_group_wins() {
        let steps =
            DrillController::plan(&Selection::Function(function("x", Some("/custom/x")))).unwrap();
        assert!(matches!(
            &steps[0],
            DrillStep::Configure { key: DrillKey::LogGroup { group }, .. } if group == "/custom/x"
        ));
    }

    #[test]
    fn test_insights_row_resolves_group_and_stream() {
        let row = InsightsRow::from_pairs([
            ("@log", "123456789012:/aws/lambda/a:b"),
            ("@logStream", "2024/01/01/[$LATEST]abc"),
        ]);
        let steps = DrillController::plan(&Selection::InsightsRow(row)).unwrap();
        assert_eq!(
            steps[0],
            DrillStep::Configure {
                target: EVENTS,
                key: DrillKey::LogStream {
                    group: "/aws/lambda/a:b".into(),
                    stream: "2024/01/01/[$LATEST]abc".into(),
                },
            }
        );
        assert_eq!(steps[2], DrillStep::SwitchPage(PageKind::LogEvents));
    }

    #[test]
    fn test_insights_row_without_log_field() {
        let row = InsightsRow::from_pairs([("@message", "hi")]);
        let err = DrillController::plan(&Selection::InsightsRow(row)).unwrap_err();
        assert!(matches!(err, UiError::MissingRequiredInput(_)));
    }

    #[test]
    fn test_stack_configures_three_panes() {
        let stack = Stack {
            name: "web".into(),
            id: "arn:stack/web".into(),
            status: "CREATE_COMPLETE".into(),
            description: None,
            created: None,
            updated: None,
            parameters: BTreeMap::new(),
            outputs: BTreeMap::new(),
        };
        let steps = DrillController::plan(&Selection::Stack(stack)).unwrap();
        let configured: Vec<PaneKind> = steps
            .iter()
            .filter_map(|s| match s {
                DrillStep::Configure { target, .. } => Some(target.pane),
                _ => None,
            })
            .collect();
        assert_eq!(
            configured,
            vec![
                PaneKind::StackDetails,
                PaneKind::StackEvents,
                PaneKind::StackResources
            ]
        );
        assert!(!steps.iter().any(|s| matches!(s, DrillStep::SwitchPage(_))));
    }

    #[test]
    fn test_plain_object_has_no_drill() {
        let object = ObjectSummary {
            bucket: "b".into(),
            key: "a.txt".into(),
            size: 1,
            storage_class: "STANDARD".into(),
            last_modified: None,
            is_prefix: false,
        };
        assert!(DrillController::plan(&Selection::Object(object)).unwrap().is_empty());
    }

    #[test]
    fn test_every_page_belongs_to_its_service() {
        for service in ServiceKind::ALL {
            for page in service.pages() {
                assert_eq!(page.service(), service);
            }
        }
    }
}
