use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use odata_params::filters as od;
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

use super::error::QueryError;
use super::types::{CompareOp, FilterNode, Literal, Operand, StringFunction};

impl From<od::CompareOperator> for CompareOp {
    fn from(op: od::CompareOperator) -> Self {
        use od::CompareOperator::{Equal, GreaterOrEqual, GreaterThan, LessOrEqual, LessThan, NotEqual};
        match op {
            Equal => CompareOp::Eq,
            NotEqual => CompareOp::Ne,
            GreaterThan => CompareOp::Gt,
            GreaterOrEqual => CompareOp::Ge,
            LessThan => CompareOp::Lt,
            LessOrEqual => CompareOp::Le,
        }
    }
}

impl TryFrom<od::Value> for Literal {
    type Error = QueryError;

    fn try_from(value: od::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            od::Value::Null => Literal::Null,
            od::Value::Bool(b) => Literal::Bool(b),
            od::Value::Number(n) => {
                let text = n.to_string();
                Literal::Number(text.parse().map_err(|_| QueryError::InvalidLiteral(text))?)
            }
            od::Value::Uuid(id) => Literal::Uuid(id),
            od::Value::DateTime(dt) => Literal::DateTime(dt),
            od::Value::Date(d) => Literal::Date(d),
            od::Value::Time(t) => Literal::Time(t),
            od::Value::String(s) => Literal::String(s),
        })
    }
}

fn operand(expr: od::Expr) -> Result<Operand, QueryError> {
    match expr {
        od::Expr::Identifier(name) => Ok(Operand::Field(name.split('/').map(str::to_string).collect())),
        od::Expr::Value(value) => Ok(Operand::Literal(value.try_into()?)),
        other => Err(QueryError::InvalidExpression(format!(
            "operands must be properties or literals, got {:?}",
            other
        ))),
    }
}

fn convert(expr: od::Expr) -> Result<FilterNode, QueryError> {
    match expr {
        od::Expr::And(left, right) => Ok(FilterNode::And(Box::new(convert(*left)?), Box::new(convert(*right)?))),
        od::Expr::Or(left, right) => Ok(FilterNode::Or(Box::new(convert(*left)?), Box::new(convert(*right)?))),
        od::Expr::Not(inner) => Ok(FilterNode::Not(Box::new(convert(*inner)?))),
        od::Expr::Compare(left, op, right) => Ok(FilterNode::Compare {
            left: operand(*left)?,
            op: op.into(),
            right: operand(*right)?,
        }),
        od::Expr::In(target, values) => Ok(FilterNode::In {
            target: operand(*target)?,
            values: values.into_iter().map(operand).collect::<Result<_, _>>()?,
        }),
        od::Expr::Function(name, args) => {
            let function = StringFunction::from_name(&name).ok_or(QueryError::UnsupportedFunction(name))?;
            let [target, argument]: [od::Expr; 2] = args
                .try_into()
                .map_err(|_| QueryError::InvalidExpression("string functions take two arguments".to_string()))?;
            Ok(FilterNode::Function {
                function,
                target: operand(target)?,
                argument: operand(argument)?,
            })
        }
        od::Expr::Identifier(_) | od::Expr::Value(_) => {
            Err(QueryError::InvalidExpression("a bare operand is not a condition".to_string()))
        }
    }
}

pub struct FilterWhere;

impl FilterWhere {
    /// Parse a `$filter` expression into a tree
    pub fn parse(expression: &str) -> Result<FilterNode, QueryError> {
        if expression.trim().is_empty() {
            return Err(QueryError::Syntax("empty expression".to_string()));
        }
        let ast = od::parse_str(expression).map_err(|e| QueryError::Syntax(format!("{:?}", e)))?;
        convert(ast)
    }

    /// Evaluate against one JSON row. Unknown properties read as null.
    pub fn matches(node: &FilterNode, row: &Value) -> bool {
        match node {
            FilterNode::And(left, right) => Self::matches(left, row) && Self::matches(right, row),
            FilterNode::Or(left, right) => Self::matches(left, row) || Self::matches(right, row),
            FilterNode::Not(inner) => !Self::matches(inner, row),
            FilterNode::Compare { left, op, right } => op.holds(compare_operands(left, right, row)),
            FilterNode::In { target, values } => values
                .iter()
                .any(|value| compare_operands(target, value, row) == Some(Ordering::Equal)),
            FilterNode::Function { function, target, argument } => {
                let (Some(haystack), Some(needle)) = (text(target, row), text(argument, row)) else {
                    return false;
                };
                match function {
                    StringFunction::Contains => haystack.contains(needle),
                    StringFunction::StartsWith => haystack.starts_with(needle),
                    StringFunction::EndsWith => haystack.ends_with(needle),
                }
            }
        }
    }
}

pub(crate) fn lookup<'a>(row: &'a Value, path: &[String]) -> &'a Value {
    let mut current = row;
    for segment in path {
        match current.get(segment) {
            Some(next) => current = next,
            None => return &Value::Null,
        }
    }
    current
}

fn text<'a>(operand: &'a Operand, row: &'a Value) -> Option<&'a str> {
    match operand {
        Operand::Field(path) => lookup(row, path).as_str(),
        Operand::Literal(Literal::String(s)) => Some(s),
        Operand::Literal(_) => None,
    }
}

fn compare_operands(left: &Operand, right: &Operand, row: &Value) -> Option<Ordering> {
    match (left, right) {
        (Operand::Field(a), Operand::Field(b)) => compare_values(lookup(row, a), lookup(row, b)),
        (Operand::Field(path), Operand::Literal(literal)) => compare_literal(lookup(row, path), literal),
        (Operand::Literal(literal), Operand::Field(path)) => {
            compare_literal(lookup(row, path), literal).map(Ordering::reverse)
        }
        (Operand::Literal(a), Operand::Literal(b)) => compare_literal(&a.to_json(), b),
    }
}

fn instant(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Compare a stored value against a literal using the literal's type
fn compare_literal(value: &Value, literal: &Literal) -> Option<Ordering> {
    match literal {
        Literal::Null => value.is_null().then_some(Ordering::Equal),
        Literal::Bool(b) => Some(value.as_bool()?.cmp(b)),
        Literal::Number(n) => value.as_f64()?.partial_cmp(n),
        Literal::Uuid(id) => Some(Uuid::parse_str(value.as_str()?).ok()?.cmp(id)),
        Literal::DateTime(dt) => Some(instant(value.as_str()?)?.cmp(dt)),
        Literal::Date(d) => {
            let s = value.as_str()?;
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| instant(s).map(|dt| dt.date_naive()))?;
            Some(date.cmp(d))
        }
        Literal::Time(t) => Some(NaiveTime::parse_from_str(value.as_str()?, "%H:%M:%S%.f").ok()?.cmp(t)),
        Literal::String(s) => Some(value.as_str()?.cmp(s.as_str())),
    }
}

/// Ordering between two stored values of the same JSON type; None across types.
/// Strings that are both RFC 3339 timestamps compare as instants.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => match (instant(a), instant(b)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => Some(a.cmp(b)),
        },
        _ => None,
    }
}
