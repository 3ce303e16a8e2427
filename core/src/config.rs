use std::fmt;
use std::time::Duration;

use url::Url;

use crate::version::ApiVersion;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Connection settings for the Cloudera Manager REST API.
///
/// Immutable once built. The password is never printed by `Debug`.
#[derive(Clone)]
pub struct UpstreamConfig {
    base_url: String,
    username: String,
    password: String,
    api_version: Option<ApiVersion>,
    verify_tls: bool,
    timeout: Duration,
}

impl UpstreamConfig {
    /// Validate raw settings. `base_url` must be an absolute http(s) URL;
    /// a trailing slash is dropped.
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        api_version: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Missing("CLDR_CM_BASE_URL"));
        }
        if username.trim().is_empty() {
            return Err(ConfigError::Missing("CLDR_CM_USERNAME"));
        }
        if password.is_empty() {
            return Err(ConfigError::Missing("CLDR_CM_PASSWORD"));
        }

        let parsed = Url::parse(base_url).map_err(|e| ConfigError::Invalid {
            var: "CLDR_CM_BASE_URL",
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                var: "CLDR_CM_BASE_URL",
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let api_version = match api_version.map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => Some(ApiVersion::parse(raw).map_err(|e| ConfigError::Invalid {
                var: "CLDR_CM_API_VERSION",
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            api_version,
            verify_tls: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "CLDR_CM_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn api_version(&self) -> Option<&ApiVersion> {
        self.api_version.as_ref()
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Everything the gateway needs at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub upstream: UpstreamConfig,
    /// Process-wide write enablement; fixed for the process lifetime.
    pub writes_enabled: bool,
}

/// `ALLOW_WRITES`: only `true` (any case) enables writes.
pub fn writes_enabled_flag(raw: Option<&str>) -> bool {
    raw.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// `CLDR_CM_VERIFY_SSL`: only `false` (any case) turns verification off.
pub fn verify_tls_flag(raw: Option<&str>) -> bool {
    !raw.is_some_and(|v| v.eq_ignore_ascii_case("false"))
}
