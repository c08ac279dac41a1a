use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::cmp::Ordering;
use uuid::Uuid;

/// System query options accepted by every list route
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ODataQuery {
    #[serde(rename = "$filter")]
    pub filter: Option<String>,
    #[serde(rename = "$orderby")]
    pub orderby: Option<String>,
    #[serde(rename = "$top")]
    pub top: Option<usize>,
    #[serde(rename = "$skip")]
    pub skip: Option<usize>,
    #[serde(rename = "$count")]
    pub count: Option<bool>,
}

/// One page of a list result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.count", skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// Whether an ordering between the two sides satisfies the operator.
    /// Incomparable sides only satisfy `ne`.
    pub fn holds(self, ordering: Option<Ordering>) -> bool {
        match self {
            CompareOp::Eq => ordering == Some(Ordering::Equal),
            CompareOp::Ne => ordering != Some(Ordering::Equal),
            CompareOp::Gt => ordering == Some(Ordering::Greater),
            CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            CompareOp::Lt => ordering == Some(Ordering::Less),
            CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFunction {
    Contains,
    StartsWith,
    EndsWith,
}

impl StringFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "contains" => Some(StringFunction::Contains),
            "startswith" => Some(StringFunction::StartsWith),
            "endswith" => Some(StringFunction::EndsWith),
            _ => None,
        }
    }
}

/// Typed literal as written in the expression
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    String(String),
}

impl Literal {
    pub fn to_json(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Literal::Uuid(id) => Value::String(id.to_string()),
            Literal::DateTime(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Literal::Date(d) => Value::String(d.to_string()),
            Literal::Time(t) => Value::String(t.to_string()),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

/// A property path (`name`, `options/theme`) or a literal
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(Vec<String>),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    And(Box<FilterNode>, Box<FilterNode>),
    Or(Box<FilterNode>, Box<FilterNode>),
    Not(Box<FilterNode>),
    Compare { left: Operand, op: CompareOp, right: Operand },
    In { target: Operand, values: Vec<Operand> },
    Function { function: StringFunction, target: Operand, argument: Operand },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderInfo {
    pub field: Vec<String>,
    pub sort: SortDirection,
}
