use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::GatewayError;

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^v\d+$").expect("version pattern is valid"));

/// Management API version segment, e.g. `v54`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApiVersion(String);

impl ApiVersion {
    /// Parse a version as returned by `GET /api/version`.
    ///
    /// The endpoint answers either plain text (`v54`) or a JSON string
    /// (`"v54"`), so surrounding whitespace and one pair of quotes are
    /// stripped before matching.
    pub fn parse_discovery_body(raw: &str) -> Result<Self, GatewayError> {
        let trimmed = raw.trim();
        let unquoted = trimmed.strip_prefix('"').unwrap_or(trimmed);
        let unquoted = unquoted.strip_suffix('"').unwrap_or(unquoted);
        Self::parse(unquoted).map_err(|_| {
            GatewayError::Protocol(format!(
                "Unexpected version format from /api/version: {raw}"
            ))
        })
    }

    /// Parse an already-clean version string (pinned via configuration).
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        if VERSION_PATTERN.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(GatewayError::validation(
                "apiVersion",
                format!("'{raw}' is not an API version like v54"),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
