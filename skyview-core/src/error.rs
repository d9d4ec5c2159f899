//! Error taxonomy shared by the table contracts, the expression builders and
//! the gateway layer.
//!
//! `UiError` values carry a stable upper-case code which is part of the
//! rendered message (`CODE: message`). Messages are matched verbatim by tests
//! and surfaced unchanged in the error overlay.

use thiserror::Error;

/// Table data rows have a different arity than the headings.
pub const TABLE_DIMENSIONS_MISMATCH: &str = "Table data and headings dimensions do not match";
/// Display rows and private payloads have different lengths.
pub const PRIVATE_DATA_ROWS_MISMATCH: &str = "Table data and private data row counts do not match";
/// The payload-bearing column is not one of the headings.
pub const PRIVATE_COLUMN_OUT_OF_BOUNDS: &str = "Private data column index out of bounds";

pub const ATTRIBUTE_NAME_NOT_SET: &str = "Attribute name not set";
pub const FIRST_VALUE_NOT_SET: &str = "First attribute value not set";
pub const SECOND_VALUE_NOT_SET: &str = "Second attribute value not set";
pub const UNSUPPORTED_CONDITION: &str = "Attribute type does not support given condition";
pub const EMPTY_FILTER_CONDITION: &str = "Filter condition is empty";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UiError {
    /// Caller bug: table population with mismatching shapes.
    #[error("INVALID_DATA_DIMENTIONS: {0}")]
    InvalidDataDimensions(String),
    #[error("MISSING_REQUIRED_INPUT: {0}")]
    MissingRequiredInput(String),
    #[error("INVALID_OPTION: {0}")]
    InvalidOption(String),
    #[error("INVALID_FILTER_CONDITION: {0}")]
    InvalidFilterCondition(String),
    #[error("INVALID_KEY_CONDITION: {0}")]
    InvalidKeyCondition(String),
    /// Wraps a downstream translation failure.
    #[error("FAILED_TO_BUILD_EXPRESSION: {0}")]
    FailedToBuildExpression(String),
}

impl UiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDataDimensions(_) => "INVALID_DATA_DIMENTIONS",
            Self::MissingRequiredInput(_) => "MISSING_REQUIRED_INPUT",
            Self::InvalidOption(_) => "INVALID_OPTION",
            Self::InvalidFilterCondition(_) => "INVALID_FILTER_CONDITION",
            Self::InvalidKeyCondition(_) => "INVALID_KEY_CONDITION",
            Self::FailedToBuildExpression(_) => "FAILED_TO_BUILD_EXPRESSION",
        }
    }

    /// The message without its code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidDataDimensions(m)
            | Self::MissingRequiredInput(m)
            | Self::InvalidOption(m)
            | Self::InvalidFilterCondition(m)
            | Self::InvalidKeyCondition(m)
            | Self::FailedToBuildExpression(m) => m,
        }
    }

    pub fn dimensions(message: &str) -> Self {
        Self::InvalidDataDimensions(message.to_string())
    }

    pub fn missing(message: &str) -> Self {
        Self::MissingRequiredInput(message.to_string())
    }

    pub fn option(message: impl Into<String>) -> Self {
        Self::InvalidOption(message.into())
    }
}

/// Errors returned by a resource gateway. Provider messages are kept intact.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("{service}: {code}: {message}")]
    Service {
        service: String,
        code: String,
        message: String,
    },
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("request throttled: {0}")]
    Throttled(String),
    #[error("operation not supported: {0}")]
    Unsupported(String),
    #[error("request timed out")]
    Timeout,
}

impl GatewayError {
    pub fn service(service: &str, code: &str, message: impl Into<String>) -> Self {
        Self::Service {
            service: service.to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = UiError::dimensions(TABLE_DIMENSIONS_MISMATCH);
        assert_eq!(
            err.to_string(),
            "INVALID_DATA_DIMENTIONS: Table data and headings dimensions do not match"
        );
        assert_eq!(err.code(), "INVALID_DATA_DIMENTIONS");
        assert_eq!(err.message(), TABLE_DIMENSIONS_MISMATCH);
    }

    #[test]
    fn test_gateway_error_keeps_provider_message() {
        let err = GatewayError::service("logs", "AccessDenied", "not authorized to perform logs:Describe");
        assert_eq!(
            err.to_string(),
            "logs: AccessDenied: not authorized to perform logs:Describe"
        );
    }
}
