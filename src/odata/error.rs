use thiserror::Error;

use crate::outcome::ErrorCode;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Malformed expression: {0}")]
    Syntax(String),

    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("Unsupported expression: {0}")]
    InvalidExpression(String),

    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),

    #[error("Invalid $orderby: {0}")]
    InvalidOrderBy(String),
}

impl QueryError {
    /// Query option the error belongs to
    pub fn option(&self) -> &'static str {
        match self {
            QueryError::InvalidOrderBy(_) => "$orderby",
            _ => "$filter",
        }
    }

    pub fn to_error_code(&self) -> ErrorCode {
        ErrorCode::format_invalid(self.option(), self.to_string())
    }
}
