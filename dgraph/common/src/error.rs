use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub type StubResult<T> = Result<T, StubError>;

/// A single error entry reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResultError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl ApiResultError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: None,
        }
    }
}

/// Structured errors returned by the server in a well-formed response.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{}", summarize(.errors))]
pub struct ApiError {
    url: String,
    errors: Vec<ApiResultError>,
}

fn summarize(errors: &[ApiResultError]) -> &str {
    errors
        .first()
        .map(|e| e.message.as_str())
        .unwrap_or("API returned errors")
}

impl ApiError {
    pub fn new(url: impl Into<String>, errors: Vec<ApiResultError>) -> Self {
        Self {
            url: url.into(),
            errors,
        }
    }

    /// Builds an error carrying a single message.
    pub fn with_message(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(url, vec![ApiResultError::new(message)])
    }

    /// The server endpoint that reported the errors.
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.url
    }

    #[inline]
    pub fn errors(&self) -> &[ApiResultError] {
        &self.errors
    }

    /// Lower-cased message of the first reported error, if any.
    fn first_message_lowercase(&self) -> Option<String> {
        self.errors.first().map(|e| e.message.to_lowercase())
    }

    /// The server aborted the transaction and asks for a retry.
    pub fn is_aborted(&self) -> bool {
        self.first_message_lowercase()
            .is_some_and(|m| m.contains("abort") && m.contains("retry"))
    }

    /// The server detected a conflict with another transaction.
    pub fn is_conflict(&self) -> bool {
        self.first_message_lowercase()
            .is_some_and(|m| m.contains("conflict"))
    }
}

/// Failure of a single stub call.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum StubError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Api(#[from] ApiError),

    #[error("invalid status code = {status}")]
    Http { status: u16 },

    #[error("response is not JSON")]
    NonJson { response_text: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(message: &str) -> ApiError {
        ApiError::with_message("http://localhost:8080/mutate", message)
    }

    #[test]
    fn test_classify_abort() {
        let err = api("Transaction has been aborted. Please retry");
        assert!(err.is_aborted());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_classify_conflict() {
        let err = api("Transaction aborted due to CONFLICT on key");
        assert!(err.is_conflict());
        assert!(!err.is_aborted());
    }

    #[test]
    fn test_classify_other() {
        let err = api("some other failure");
        assert!(!err.is_aborted());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_only_first_error_counts() {
        let err = ApiError::new("url", vec![
            ApiResultError::new("bad nquad"),
            ApiResultError::new("conflict, please retry after abort"),
        ]);
        assert!(!err.is_aborted());
        assert!(!err.is_conflict());
        assert_eq!(err.to_string(), "bad nquad");
    }

    #[test]
    fn test_empty_error_list() {
        let err = ApiError::new("url", vec![]);
        assert!(!err.is_aborted());
        assert!(!err.is_conflict());
        assert_eq!(err.to_string(), "API returned errors");
    }

    #[test]
    fn test_api_error_through_diagnostic() {
        let err = api("Transaction has been aborted. Please retry");
        assert_eq!(err.endpoint(), "http://localhost:8080/mutate");

        let stub_err = StubError::from(err);
        let diagnostic: &dyn Diagnostic = &stub_err;
        assert!(diagnostic.url().is_none());
        assert!(diagnostic.help().is_none());
        assert!(diagnostic.code().is_none());
        assert_eq!(
            stub_err.to_string(),
            "Transaction has been aborted. Please retry"
        );
    }

    #[test]
    fn test_stub_error_messages() {
        assert_eq!(
            StubError::Http { status: 503 }.to_string(),
            "invalid status code = 503"
        );
        let err = StubError::NonJson {
            response_text: "<html>".into(),
        };
        assert_eq!(err.to_string(), "response is not JSON");
    }
}
