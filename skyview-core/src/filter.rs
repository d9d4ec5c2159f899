//! Structured attribute filters for table scans and queries.
//!
//! A form row (`FilterInput`) is validated into a typed `FilterPredicate`;
//! predicates are combined with AND and rendered into a provider-style
//! expression with `#nN` name and `:vN` value placeholders.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{
    ATTRIBUTE_NAME_NOT_SET, EMPTY_FILTER_CONDITION, FIRST_VALUE_NOT_SET, SECOND_VALUE_NOT_SET,
    UNSUPPORTED_CONDITION, UiError,
};
use crate::resource::{AttributeValue, Item};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    String,
    Number,
    Boolean,
    Binary,
    Null,
}

impl AttributeType {
    pub const ALL: [AttributeType; 5] = [
        Self::String,
        Self::Number,
        Self::Boolean,
        Self::Binary,
        Self::Null,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Binary => "Binary",
            Self::Null => "Null",
        }
    }

    /// The legal (type, condition) matrix.
    pub fn supports(self, condition: Condition) -> bool {
        use Condition::*;
        match self {
            Self::String | Self::Binary => true,
            Self::Number => !matches!(condition, Contains | BeginsWith),
            Self::Boolean => matches!(condition, Eq | Ne | Exists | NotExists),
            Self::Null => matches!(condition, Exists | NotExists),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AttributeType {
    type Err = UiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "s" => Ok(Self::String),
            "number" | "n" => Ok(Self::Number),
            "boolean" | "bool" => Ok(Self::Boolean),
            "binary" | "b" => Ok(Self::Binary),
            "null" => Ok(Self::Null),
            other => Err(UiError::option(format!("Unknown attribute type: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Exists,
    NotExists,
    Between,
    Contains,
    BeginsWith,
}

impl Condition {
    pub const ALL: [Condition; 11] = [
        Self::Eq,
        Self::Ne,
        Self::Lt,
        Self::Gt,
        Self::Lte,
        Self::Gte,
        Self::Exists,
        Self::NotExists,
        Self::Between,
        Self::Contains,
        Self::BeginsWith,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Lte => "<=",
            Self::Gte => ">=",
            Self::Exists => "exists",
            Self::NotExists => "not exists",
            Self::Between => "between",
            Self::Contains => "contains",
            Self::BeginsWith => "begins with",
        }
    }

    /// How many operand values the condition takes.
    pub fn arity(self) -> usize {
        match self {
            Self::Exists | Self::NotExists => 0,
            Self::Between => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Condition {
    type Err = UiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "=" | "==" | "eq" => Ok(Self::Eq),
            "<>" | "!=" | "ne" => Ok(Self::Ne),
            "<" | "lt" => Ok(Self::Lt),
            ">" | "gt" => Ok(Self::Gt),
            "<=" | "lte" | "le" => Ok(Self::Lte),
            ">=" | "gte" | "ge" => Ok(Self::Gte),
            "exists" => Ok(Self::Exists),
            "not exists" | "notexists" => Ok(Self::NotExists),
            "between" => Ok(Self::Between),
            "contains" => Ok(Self::Contains),
            "begins with" | "beginswith" => Ok(Self::BeginsWith),
            _ => Err(UiError::option(format!("Unknown condition: {}", s.trim()))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Binary(String),
}

impl FilterValue {
    fn parse(attribute_type: AttributeType, raw: &str) -> Result<Self, UiError> {
        match attribute_type {
            AttributeType::Boolean => raw
                .parse::<bool>()
                .map(Self::Boolean)
                .map_err(|e| UiError::option(e.to_string())),
            AttributeType::Number => raw
                .parse::<f64>()
                .map(Self::Number)
                .map_err(|e| UiError::option(e.to_string())),
            AttributeType::Binary => Ok(Self::Binary(raw.to_string())),
            AttributeType::String | AttributeType::Null => Ok(Self::String(raw.to_string())),
        }
    }

    fn to_attribute_value(&self) -> Result<AttributeValue, UiError> {
        Ok(match self {
            Self::String(s) => AttributeValue::S(s.clone()),
            Self::Binary(b) => AttributeValue::B(b.clone()),
            Self::Boolean(b) => AttributeValue::Bool(*b),
            Self::Number(n) if !n.is_finite() => {
                return Err(UiError::FailedToBuildExpression(format!(
                    "number {n} cannot be encoded"
                )));
            }
            Self::Number(n) => AttributeValue::N(format_number(*n)),
        })
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Raw form row, exactly as typed by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterInput {
    pub attribute: String,
    pub attribute_type: String,
    pub condition: String,
    pub value1: String,
    pub value2: String,
}

impl FilterInput {
    pub fn new(attribute: &str, attribute_type: &str, condition: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            attribute_type: attribute_type.to_string(),
            condition: condition.to_string(),
            ..Default::default()
        }
    }

    pub fn with_values(mut self, value1: &str, value2: &str) -> Self {
        self.value1 = value1.to_string();
        self.value2 = value2.to_string();
        self
    }

    /// A row the user never touched.
    pub fn is_blank(&self) -> bool {
        self.attribute.trim().is_empty()
            && self.value1.trim().is_empty()
            && self.value2.trim().is_empty()
    }

    /// Validate and parse the row.
    pub fn build(&self) -> Result<FilterPredicate, UiError> {
        let attribute = self.attribute.trim();
        if attribute.is_empty() {
            return Err(UiError::missing(ATTRIBUTE_NAME_NOT_SET));
        }
        let attribute_type: AttributeType = self.attribute_type.parse()?;
        let condition: Condition = self.condition.parse()?;
        if !attribute_type.supports(condition) {
            return Err(UiError::option(UNSUPPORTED_CONDITION));
        }

        let mut predicate = FilterPredicate {
            attribute: attribute.to_string(),
            attribute_type,
            condition,
            value1: None,
            value2: None,
        };
        if condition.arity() == 0 {
            return Ok(predicate);
        }

        let value1 = self.value1.trim();
        if value1.is_empty() {
            return Err(UiError::missing(FIRST_VALUE_NOT_SET));
        }
        predicate.value1 = Some(FilterValue::parse(attribute_type, value1)?);

        if condition == Condition::Between {
            let value2 = self.value2.trim();
            if value2.is_empty() {
                return Err(UiError::missing(SECOND_VALUE_NOT_SET));
            }
            predicate.value2 = Some(FilterValue::parse(attribute_type, value2)?);
        }
        Ok(predicate)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterPredicate {
    pub attribute: String,
    pub attribute_type: AttributeType,
    pub condition: Condition,
    pub value1: Option<FilterValue>,
    pub value2: Option<FilterValue>,
}

impl FilterPredicate {
    /// Evaluate the predicate against an item.
    pub fn matches(&self, item: &Item) -> bool {
        let actual = item.get(&self.attribute);
        match self.condition {
            Condition::Exists => return actual.is_some(),
            Condition::NotExists => return actual.is_none(),
            _ => {}
        }
        let (Some(actual), Some(v1)) = (actual, self.value1.as_ref()) else {
            return false;
        };

        use std::cmp::Ordering;
        let cmp = |expected: &FilterValue| -> Option<Ordering> {
            match (actual, expected) {
                (AttributeValue::S(a), FilterValue::String(b))
                | (AttributeValue::B(a), FilterValue::Binary(b)) => Some(a.as_str().cmp(b.as_str())),
                (AttributeValue::N(a), FilterValue::Number(b)) => {
                    a.parse::<f64>().ok().and_then(|a| a.partial_cmp(b))
                }
                (AttributeValue::Bool(a), FilterValue::Boolean(b)) => Some(a.cmp(b)),
                _ => None,
            }
        };

        match self.condition {
            Condition::Eq => cmp(v1) == Some(Ordering::Equal),
            Condition::Ne => cmp(v1) != Some(Ordering::Equal),
            Condition::Lt => cmp(v1) == Some(Ordering::Less),
            Condition::Gt => cmp(v1) == Some(Ordering::Greater),
            Condition::Lte => matches!(cmp(v1), Some(Ordering::Less | Ordering::Equal)),
            Condition::Gte => matches!(cmp(v1), Some(Ordering::Greater | Ordering::Equal)),
            Condition::Between => {
                let Some(v2) = self.value2.as_ref() else {
                    return false;
                };
                matches!(cmp(v1), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(cmp(v2), Some(Ordering::Less | Ordering::Equal))
            }
            Condition::Contains => match (actual, v1) {
                (AttributeValue::S(a), FilterValue::String(b))
                | (AttributeValue::B(a), FilterValue::Binary(b)) => a.contains(b.as_str()),
                (AttributeValue::L(items), FilterValue::String(b)) => items
                    .iter()
                    .any(|i| matches!(i, AttributeValue::S(s) if s == b)),
                _ => false,
            },
            Condition::BeginsWith => match (actual, v1) {
                (AttributeValue::S(a), FilterValue::String(b))
                | (AttributeValue::B(a), FilterValue::Binary(b)) => a.starts_with(b.as_str()),
                _ => false,
            },
            Condition::Exists | Condition::NotExists => false,
        }
    }
}

// ============================================================================
// Expression rendering
// ============================================================================

/// Placeholder maps referenced by rendered expressions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionAttributes {
    pub names: BTreeMap<String, String>,
    pub values: BTreeMap<String, AttributeValue>,
}

#[derive(Default)]
struct ExpressionBuilder {
    attributes: ExpressionAttributes,
    next_value: usize,
}

impl ExpressionBuilder {
    fn name(&mut self, attribute: &str) -> String {
        if let Some((placeholder, _)) = self
            .attributes
            .names
            .iter()
            .find(|(_, name)| name.as_str() == attribute)
        {
            return placeholder.clone();
        }
        let placeholder = format!("#n{}", self.attributes.names.len());
        self.attributes
            .names
            .insert(placeholder.clone(), attribute.to_string());
        placeholder
    }

    fn value(&mut self, value: &FilterValue) -> Result<String, UiError> {
        let placeholder = format!(":v{}", self.next_value);
        self.next_value += 1;
        self.attributes
            .values
            .insert(placeholder.clone(), value.to_attribute_value()?);
        Ok(placeholder)
    }

    fn operand(&mut self, value: Option<&FilterValue>, condition: Condition) -> Result<String, UiError> {
        let value = value.ok_or_else(|| {
            UiError::FailedToBuildExpression(format!("missing operand for '{condition}'"))
        })?;
        self.value(value)
    }

    fn condition(&mut self, p: &FilterPredicate) -> Result<String, UiError> {
        let name = self.name(&p.attribute);
        let v1 = p.value1.as_ref();
        Ok(match p.condition {
            Condition::Exists => format!("attribute_exists({name})"),
            Condition::NotExists => format!("attribute_not_exists({name})"),
            Condition::Contains => format!("contains({name}, {})", self.operand(v1, p.condition)?),
            Condition::BeginsWith => {
                format!("begins_with({name}, {})", self.operand(v1, p.condition)?)
            }
            Condition::Between => {
                let low = self.operand(v1, p.condition)?;
                let high = self.operand(p.value2.as_ref(), p.condition)?;
                format!("{name} BETWEEN {low} AND {high}")
            }
            op => format!("{name} {} {}", op.label(), self.operand(v1, p.condition)?),
        })
    }

    fn conjunction(&mut self, predicates: &[FilterPredicate]) -> Result<Option<String>, UiError> {
        if predicates.is_empty() {
            return Ok(None);
        }
        let parts = predicates
            .iter()
            .map(|p| self.condition(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(parts.join(" AND ")))
    }

    fn projection(&mut self, projection: &[String]) -> Option<String> {
        if projection.is_empty() {
            return None;
        }
        Some(
            projection
                .iter()
                .map(|a| self.name(a))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Split a comma-separated projection list.
pub fn parse_projection(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep only the projected attributes of an item.
pub fn project(item: &Item, projection: &[String]) -> Item {
    if projection.is_empty() {
        return item.clone();
    }
    Item {
        attributes: item
            .attributes
            .iter()
            .filter(|(k, _)| projection.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

fn build_predicates(filters: &[FilterInput]) -> Result<Vec<FilterPredicate>, UiError> {
    filters
        .iter()
        .filter(|f| !f.is_blank())
        .map(FilterInput::build)
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanRequest {
    pub predicates: Vec<FilterPredicate>,
    pub projection: Vec<String>,
    pub filter_expression: Option<String>,
    pub projection_expression: Option<String>,
    pub attributes: ExpressionAttributes,
}

impl ScanRequest {
    pub fn matches(&self, item: &Item) -> bool {
        self.predicates.iter().all(|p| p.matches(item))
    }
}

/// The scan form: any number of filter rows plus a projection list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanForm {
    pub filters: Vec<FilterInput>,
    pub projection: String,
    /// Reject an empty combined filter.
    pub require_filter: bool,
}

impl ScanForm {
    pub fn build(&self) -> Result<ScanRequest, UiError> {
        let predicates = build_predicates(&self.filters)?;
        if predicates.is_empty() && self.require_filter {
            return Err(UiError::InvalidFilterCondition(
                EMPTY_FILTER_CONDITION.to_string(),
            ));
        }
        let projection = parse_projection(&self.projection);

        let mut builder = ExpressionBuilder::default();
        let filter_expression = builder.conjunction(&predicates)?;
        let projection_expression = builder.projection(&projection);
        Ok(ScanRequest {
            predicates,
            projection,
            filter_expression,
            projection_expression,
            attributes: builder.attributes,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition {
    pub partition: FilterPredicate,
    pub sort: Option<FilterPredicate>,
}

impl KeyCondition {
    pub fn matches(&self, item: &Item) -> bool {
        self.partition.matches(item) && self.sort.as_ref().is_none_or(|s| s.matches(item))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyConditionInput {
    pub partition: FilterInput,
    /// Blank rows mean "no sort key condition".
    pub sort: FilterInput,
}

impl KeyConditionInput {
    pub fn build(&self) -> Result<KeyCondition, UiError> {
        let partition = self.partition.build()?;
        if !is_key_type(partition.attribute_type) {
            return Err(UiError::InvalidKeyCondition(
                "Key attributes must be String, Number or Binary".into(),
            ));
        }
        if partition.condition != Condition::Eq {
            return Err(UiError::InvalidKeyCondition(
                "Partition key condition must be equality".into(),
            ));
        }

        let sort = if self.sort.is_blank() {
            None
        } else {
            let sort = self.sort.build()?;
            let allowed = matches!(
                sort.condition,
                Condition::Eq
                    | Condition::Lt
                    | Condition::Lte
                    | Condition::Gt
                    | Condition::Gte
                    | Condition::Between
                    | Condition::BeginsWith
            ) && !(sort.condition == Condition::BeginsWith
                && sort.attribute_type == AttributeType::Number);
            if !is_key_type(sort.attribute_type) || !allowed {
                return Err(UiError::InvalidKeyCondition(
                    "Sort key does not support given condition".into(),
                ));
            }
            Some(sort)
        };
        Ok(KeyCondition { partition, sort })
    }
}

fn is_key_type(t: AttributeType) -> bool {
    matches!(
        t,
        AttributeType::String | AttributeType::Number | AttributeType::Binary
    )
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
    pub key: KeyCondition,
    pub predicates: Vec<FilterPredicate>,
    pub projection: Vec<String>,
    pub index: Option<String>,
    pub key_condition_expression: String,
    pub filter_expression: Option<String>,
    pub projection_expression: Option<String>,
    pub attributes: ExpressionAttributes,
}

impl QueryRequest {
    pub fn matches(&self, item: &Item) -> bool {
        self.key.matches(item) && self.predicates.iter().all(|p| p.matches(item))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryForm {
    pub key: KeyConditionInput,
    pub filters: Vec<FilterInput>,
    pub projection: String,
    pub index: String,
}

impl QueryForm {
    pub fn build(&self) -> Result<QueryRequest, UiError> {
        let key = self.key.build()?;
        let predicates = build_predicates(&self.filters)?;
        let projection = parse_projection(&self.projection);

        let mut builder = ExpressionBuilder::default();
        let mut key_parts = vec![builder.condition(&key.partition)?];
        if let Some(sort) = &key.sort {
            key_parts.push(builder.condition(sort)?);
        }
        let filter_expression = builder.conjunction(&predicates)?;
        let projection_expression = builder.projection(&projection);
        let index = self.index.trim();
        Ok(QueryRequest {
            key_condition_expression: key_parts.join(" AND "),
            key,
            predicates,
            projection,
            index: (!index.is_empty()).then(|| index.to_string()),
            filter_expression,
            projection_expression,
            attributes: builder.attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pairs: &[(&str, AttributeValue)]) -> Item {
        Item {
            attributes: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_boolean_rejects_begins_with() {
        let err = FilterInput::new("flag", "Boolean", "BeginsWith")
            .with_values("x", "")
            .build()
            .unwrap_err();
        assert!(matches!(err, UiError::InvalidOption(_)));
        assert_eq!(err.message(), "Attribute type does not support given condition");
    }

    #[test]
    fn test_between_requires_second_value() {
        let err = FilterInput::new("age", "Number", "Between")
            .with_values("10", "")
            .build()
            .unwrap_err();
        assert!(matches!(err, UiError::MissingRequiredInput(_)));
        assert_eq!(err.message(), "Second attribute value not set");
    }

    #[test]
    fn test_validation_order() {
        let err = FilterInput::new("  ", "Nope", "Nope").build().unwrap_err();
        assert_eq!(err.message(), ATTRIBUTE_NAME_NOT_SET);

        let err = FilterInput::new("a", "Nope", "Eq").build().unwrap_err();
        assert!(matches!(err, UiError::InvalidOption(_)));
        assert!(err.message().contains("attribute type"));

        let err = FilterInput::new("a", "String", "Like").build().unwrap_err();
        assert!(err.message().contains("Unknown condition"));

        let err = FilterInput::new("a", "String", "Eq").build().unwrap_err();
        assert_eq!(err.message(), FIRST_VALUE_NOT_SET);
    }

    #[test]
    fn test_parse_errors_surface() {
        let err = FilterInput::new("n", "Number", "Gt")
            .with_values("ten", "")
            .build()
            .unwrap_err();
        assert!(matches!(err, UiError::InvalidOption(_)));
        assert_eq!(err.message(), "invalid float literal");

        let err = FilterInput::new("b", "Boolean", "Eq")
            .with_values("yes", "")
            .build()
            .unwrap_err();
        assert!(matches!(err, UiError::InvalidOption(_)));
    }

    #[test]
    fn test_exists_ignores_values() {
        let p = FilterInput::new("ttl", "Number", "NotExists")
            .with_values("whatever", "ignored")
            .build()
            .unwrap();
        assert_eq!(p.value1, None);
        assert_eq!(p.value2, None);
    }

    #[test]
    fn test_type_condition_matrix() {
        for c in Condition::ALL {
            assert!(AttributeType::String.supports(c));
            assert!(AttributeType::Binary.supports(c));
        }
        assert!(!AttributeType::Number.supports(Condition::Contains));
        assert!(AttributeType::Number.supports(Condition::Between));
        assert!(!AttributeType::Boolean.supports(Condition::Lt));
        assert!(AttributeType::Null.supports(Condition::NotExists));
        assert!(!AttributeType::Null.supports(Condition::Eq));
    }

    #[test]
    fn test_scan_form_expression() {
        let form = ScanForm {
            filters: vec![
                FilterInput::new("age", "Number", "Between").with_values("10", "20"),
                FilterInput::default(),
                FilterInput::new("name", "String", "begins_with").with_values("Al", ""),
                FilterInput::new("deleted", "Null", "not exists"),
            ],
            projection: "name, age ,".into(),
            require_filter: true,
        };
        let req = form.build().unwrap();
        assert_eq!(
            req.filter_expression.as_deref(),
            Some("#n0 BETWEEN :v0 AND :v1 AND begins_with(#n1, :v2) AND attribute_not_exists(#n2)")
        );
        assert_eq!(req.projection_expression.as_deref(), Some("#n1, #n0"));
        assert_eq!(req.attributes.values.get(":v0"), Some(&AttributeValue::N("10".into())));
        assert_eq!(req.projection, vec!["name", "age"]);
    }

    #[test]
    fn test_empty_required_filter() {
        let form = ScanForm {
            filters: vec![FilterInput::default()],
            projection: String::new(),
            require_filter: true,
        };
        assert!(matches!(
            form.build(),
            Err(UiError::InvalidFilterCondition(_))
        ));

        let optional = ScanForm {
            require_filter: false,
            ..form
        };
        assert_eq!(optional.build().unwrap().filter_expression, None);
    }

    #[test]
    fn test_translation_error() {
        let p = FilterPredicate {
            attribute: "x".into(),
            attribute_type: AttributeType::Number,
            condition: Condition::Eq,
            value1: None,
            value2: None,
        };
        let mut builder = ExpressionBuilder::default();
        assert!(matches!(
            builder.condition(&p),
            Err(UiError::FailedToBuildExpression(_))
        ));

        let form = ScanForm {
            filters: vec![FilterInput::new("x", "Number", "Eq").with_values("inf", "")],
            ..Default::default()
        };
        assert!(matches!(
            form.build(),
            Err(UiError::FailedToBuildExpression(_))
        ));
    }

    #[test]
    fn test_predicate_matching() {
        let it = item(&[
            ("name", AttributeValue::S("Alice".into())),
            ("age", AttributeValue::N("34".into())),
            ("active", AttributeValue::Bool(true)),
        ]);
        let build = |a: &str, t: &str, c: &str, v1: &str, v2: &str| {
            FilterInput::new(a, t, c).with_values(v1, v2).build().unwrap()
        };
        assert!(build("age", "Number", "between", "30", "40", ).matches(&it));
        assert!(!build("age", "Number", ">", "40", "").matches(&it));
        assert!(build("name", "String", "contains", "lic", "").matches(&it));
        assert!(build("active", "Boolean", "=", "true", "").matches(&it));
        assert!(build("missing", "String", "not exists", "", "").matches(&it));
        assert!(!build("missing", "String", "=", "x", "").matches(&it));
    }

    #[test]
    fn test_key_condition() {
        let form = QueryForm {
            key: KeyConditionInput {
                partition: FilterInput::new("pk", "String", "=").with_values("user#1", ""),
                sort: FilterInput::new("sk", "String", "begins_with").with_values("order#", ""),
            },
            filters: vec![FilterInput::new("total", "Number", ">").with_values("10", "")],
            projection: String::new(),
            index: " ".into(),
        };
        let req = form.build().unwrap();
        assert_eq!(
            req.key_condition_expression,
            "#n0 = :v0 AND begins_with(#n1, :v1)"
        );
        assert_eq!(req.filter_expression.as_deref(), Some("#n2 > :v2"));
        assert_eq!(req.index, None);

        let bad = KeyConditionInput {
            partition: FilterInput::new("pk", "String", ">").with_values("a", ""),
            sort: FilterInput::default(),
        };
        assert!(matches!(bad.build(), Err(UiError::InvalidKeyCondition(_))));

        let bad_sort = KeyConditionInput {
            partition: FilterInput::new("pk", "String", "=").with_values("a", ""),
            sort: FilterInput::new("sk", "Number", "begins_with").with_values("1", ""),
        };
        // Number does not support begins_with at all, so the filter matrix
        // rejects it first.
        assert!(matches!(bad_sort.build(), Err(UiError::InvalidOption(_))));

        let bad_sort = KeyConditionInput {
            partition: FilterInput::new("pk", "String", "=").with_values("a", ""),
            sort: FilterInput::new("sk", "String", "contains").with_values("1", ""),
        };
        assert!(matches!(bad_sort.build(), Err(UiError::InvalidKeyCondition(_))));
    }
}
