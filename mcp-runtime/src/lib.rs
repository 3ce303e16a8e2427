use std::time::Duration;

use clap::{Args, Subcommand};
use cmgate_core::config::{ConfigError, DEFAULT_TIMEOUT_SECS, verify_tls_flag, writes_enabled_flag};
use cmgate_core::{GatewayConfig, GatewayError, UpstreamConfig};
use serde_json::{Value, json};

pub mod args;
pub mod client;
pub mod gate;
pub mod paging;
pub mod registry;
pub mod server;
pub mod tools;

use client::{CmClient, View};
use gate::SafetyGate;
use registry::ToolRegistry;
use server::{McpServer, to_pretty_json};
use tools::Gateway;

#[derive(Subcommand)]
pub enum McpCommands {
    /// Run the Cloudera Manager MCP server over stdio
    Serve,
    /// Read-only connectivity check: version, clusters, services of the first cluster
    Smoke,
    /// Print the advertised tool catalog without contacting Cloudera Manager
    Tools,
}

/// Connection and policy settings, each with an environment fallback.
#[derive(Args, Clone, Debug, Default)]
pub struct GatewayArgs {
    /// Cloudera Manager base URL, e.g. https://cm.example.com:7183
    #[arg(long, env = "CLDR_CM_BASE_URL")]
    pub base_url: Option<String>,
    /// Cloudera Manager user
    #[arg(long, env = "CLDR_CM_USERNAME")]
    pub username: Option<String>,
    /// Cloudera Manager password
    #[arg(long, env = "CLDR_CM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Pin the API version (e.g. v54) instead of discovering it
    #[arg(long, env = "CLDR_CM_API_VERSION")]
    pub api_version: Option<String>,
    /// Verify TLS certificates (set to false for self-signed lab clusters)
    #[arg(long, env = "CLDR_CM_VERIFY_SSL")]
    pub verify_ssl: Option<String>,
    /// Per-request timeout in seconds
    #[arg(long, env = "CLDR_CM_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
    /// Enable mutating tools (each call still needs confirm=true)
    #[arg(long, env = "ALLOW_WRITES")]
    pub allow_writes: Option<String>,
}

impl GatewayArgs {
    pub fn into_config(self) -> Result<GatewayConfig, ConfigError> {
        let upstream = UpstreamConfig::new(
            self.base_url.as_deref().unwrap_or_default(),
            self.username.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
            self.api_version.as_deref(),
        )?
        .with_verify_tls(verify_tls_flag(self.verify_ssl.as_deref()))
        .with_timeout(Duration::from_secs(
            self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        ))?;
        Ok(GatewayConfig {
            upstream,
            writes_enabled: writes_enabled_flag(self.allow_writes.as_deref()),
        })
    }
}

pub async fn run(args: GatewayArgs, command: McpCommands) -> i32 {
    if matches!(command, McpCommands::Tools) {
        println!("{}", to_pretty_json(&ToolRegistry::new().tools_list_payload()));
        return 0;
    }

    let config = match args.into_config() {
        Ok(config) => config,
        Err(err) => return fail("config_error", &err.to_string()),
    };
    let client = match CmClient::new(config.upstream.clone()) {
        Ok(client) => client,
        Err(err) => return fail(err.code(), &err.to_string()),
    };

    if matches!(command, McpCommands::Smoke) {
        return match smoke_report(&client).await {
            Ok(report) => {
                println!("{}", to_pretty_json(&report));
                0
            }
            Err(err) => fail(err.code(), &err.to_string()),
        };
    }

    tracing::info!(
        base_url = config.upstream.base_url(),
        writes_enabled = config.writes_enabled,
        "starting {}",
        server::MCP_SERVER_NAME
    );
    let server = McpServer::new(Gateway::new(client, SafetyGate::new(config.writes_enabled)));
    match server.serve_stdio().await {
        Ok(()) => 0,
        Err(err) => fail("mcp_server_error", &err),
    }
}

/// Report a fatal error once, as JSON on stderr, and yield the exit code.
fn fail(code: &str, message: &str) -> i32 {
    eprintln!(
        "{}",
        to_pretty_json(&json!({ "error": code, "message": message }))
    );
    1
}

/// Resolve the version, list clusters, then list the first cluster's
/// services. Never issues a mutating call.
pub async fn smoke_report(client: &CmClient) -> Result<Value, GatewayError> {
    let info = client.api_info().await?;
    let clusters = client.list_clusters(Some(View::Summary)).await?;

    let first_cluster = clusters
        .pointer("/items/0/name")
        .or_else(|| clusters.pointer("/0/name"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let services = match &first_cluster {
        Some(name) => Some(client.list_services(name, Some(View::Summary)).await?),
        None => None,
    };

    Ok(json!({
        "status": "ok",
        "apiInfo": info,
        "clusters": clusters,
        "firstCluster": first_cluster,
        "services": services,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GatewayArgs {
        GatewayArgs {
            base_url: Some("https://cm.example:7183/".to_string()),
            username: Some("admin".to_string()),
            password: Some("admin".to_string()),
            ..GatewayArgs::default()
        }
    }

    #[test]
    fn defaults_verify_tls_and_disable_writes() {
        let config = args().into_config().unwrap();
        assert!(config.upstream.verify_tls());
        assert!(!config.writes_enabled);
        assert_eq!(config.upstream.timeout(), Duration::from_secs(30));
        assert_eq!(config.upstream.base_url(), "https://cm.example:7183");
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let config = GatewayArgs {
            verify_ssl: Some("false".to_string()),
            allow_writes: Some("true".to_string()),
            timeout_secs: Some(5),
            api_version: Some("v54".to_string()),
            ..args()
        }
        .into_config()
        .unwrap();
        assert!(!config.upstream.verify_tls());
        assert!(config.writes_enabled);
        assert_eq!(config.upstream.timeout(), Duration::from_secs(5));
        assert_eq!(config.upstream.api_version().unwrap().as_str(), "v54");
    }

    #[test]
    fn loose_flag_spellings_keep_safe_defaults() {
        let config = GatewayArgs {
            verify_ssl: Some("0".to_string()),
            allow_writes: Some("1".to_string()),
            ..args()
        }
        .into_config()
        .unwrap();
        assert!(config.upstream.verify_tls());
        assert!(!config.writes_enabled);
    }

    #[test]
    fn missing_credentials_fail_fast() {
        let err = GatewayArgs {
            password: None,
            ..args()
        }
        .into_config()
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("CLDR_CM_PASSWORD"));
    }
}
