use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Operator-facing failures raised by every docgen component.
#[derive(Debug, Error)]
pub enum DocgenError {
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("template registration rejected: {0}")]
    RegistrationRejected(String),
    #[error("template upload rejected: {0}")]
    UploadRejected(String),
    #[error("document generation failed: {0}")]
    GenerationFailed(String),
    #[error("no active document{}", describe_id(.0))]
    NoActiveDocument(Option<String>),
    #[error("document edit failed: {0}")]
    EditFailed(String),
    #[error("unsupported download format '{0}' (expected docx or pdf)")]
    UnsupportedFormat(String),
    #[error("document download failed: {0}")]
    DownloadFailed(String),
    #[error("field '{key}' is not part of the {template} form")]
    UnknownField { key: String, template: String },
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
    #[error("no template selected")]
    NoTemplateSelected,
    #[error("schema already registered for template '{0}'")]
    SchemaConflict(String),
    #[error("{0} aborted")]
    Aborted(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_id(id: &Option<String>) -> String {
    id.as_deref()
        .map(|id| format!(" with id {id}"))
        .unwrap_or_default()
}

impl From<serde_yaml::Error> for DocgenError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl DocgenError {
    pub fn context<T: fmt::Display>(self, ctx: T) -> Self {
        match self {
            DocgenError::Config(msg) => DocgenError::Config(format!("{ctx}: {msg}")),
            DocgenError::CatalogUnavailable(msg) => {
                DocgenError::CatalogUnavailable(format!("{ctx}: {msg}"))
            }
            other => other,
        }
    }
}

/// Failures produced by the request-execution helper before a component
/// converts them into its own [`DocgenError`] kind.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{}", rejected_message(.status, .reason))]
    Rejected {
        status: StatusCode,
        reason: Option<String>,
    },
    #[error("request timed out")]
    Timeout,
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn rejected_message(status: &StatusCode, reason: &Option<String>) -> String {
    match reason {
        Some(reason) => reason.clone(),
        None => format!("backend returned status {status}"),
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Malformed(err.to_string())
    }
}
