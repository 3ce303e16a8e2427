use serde_json::{Value, json};

/// Failure taxonomy shared by the upstream client and the tool handlers.
///
/// Every variant is recovered at the dispatch boundary and rendered as an
/// error-flagged tool result; none of them terminates the process.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing, blank or malformed argument.
    #[error("{message}")]
    Validation { field: String, message: String },

    /// Operation attempted in the wrong client state (e.g. API base before
    /// version resolution).
    #[error("{0}")]
    State(String),

    /// Non-success HTTP status from the management API.
    #[error("{operation} failed: {status} {status_text}{}", format_body(.body))]
    Upstream {
        operation: String,
        status: u16,
        status_text: String,
        body: Option<String>,
    },

    /// Unexpected response shape from version discovery.
    #[error("{0}")]
    Protocol(String),

    /// The management API could not be reached.
    #[error("{operation} could not reach Cloudera Manager: {message}")]
    Transport { operation: String, message: String },

    /// Success status with a body that is not JSON.
    #[error("{operation} returned an undecodable body: {message}")]
    Decode { operation: String, message: String },
}

fn format_body(body: &Option<String>) -> String {
    match body {
        Some(body) if !body.is_empty() => format!(" - {body}"),
        _ => String::new(),
    }
}

/// Machine-readable error codes surfaced in tool error envelopes.
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const STATE_ERROR: &str = "state_error";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const PROTOCOL_ERROR: &str = "protocol_error";
    pub const CONNECTION_ERROR: &str = "connection_error";
    pub const DECODE_ERROR: &str = "decode_error";
    pub const UNKNOWN_TOOL: &str = "unknown_tool";
}

impl GatewayError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => codes::VALIDATION_FAILED,
            Self::State(_) => codes::STATE_ERROR,
            Self::Upstream { .. } => codes::UPSTREAM_ERROR,
            Self::Protocol(_) => codes::PROTOCOL_ERROR,
            Self::Transport { .. } => codes::CONNECTION_ERROR,
            Self::Decode { .. } => codes::DECODE_ERROR,
        }
    }

    /// Structured detail attached to the error envelope, if any.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Upstream {
                operation,
                status,
                status_text,
                body,
            } => Some(json!({
                "operation": operation,
                "status": status,
                "statusText": status_text,
                "body": body,
            })),
            _ => None,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}
