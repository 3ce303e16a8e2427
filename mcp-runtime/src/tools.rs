use cmgate_core::GatewayError;
use cmgate_core::error::codes;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::args::{
    arg_action, arg_bounded_u64, arg_optional_non_empty_strings, arg_optional_string, arg_view,
    reject_unknown_arguments, required_string, required_u64,
};
use crate::client::{CmClient, CommandListOptions, View};
use crate::gate::{GateDecision, SafetyGate};
use crate::paging::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, page};
use crate::registry::{ToolDefinition, ToolId, ToolKind, ToolRegistry};

/// Failure envelope carried in an error-flagged tool result.
#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    #[serde(rename = "error")]
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
            details: None,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(codes::VALIDATION_FAILED, message)
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "error": self.code }))
    }
}

/// Operator-facing hint for failures that are usually configuration.
fn remediation(err: &GatewayError) -> Option<&'static str> {
    match err {
        GatewayError::Transport { .. } => {
            Some("Ensure Cloudera Manager is reachable and CLDR_CM_BASE_URL points to it.")
        }
        GatewayError::Upstream { status: 401, .. } => {
            Some("Check CLDR_CM_USERNAME and CLDR_CM_PASSWORD.")
        }
        GatewayError::Upstream { status: 404, .. } => {
            Some("Check the cluster and service names with list_clusters and list_services.")
        }
        GatewayError::Protocol(_) => {
            Some("Pin CLDR_CM_API_VERSION (e.g. v54) if version discovery is unavailable.")
        }
        _ => None,
    }
}

impl From<GatewayError> for ToolError {
    fn from(err: GatewayError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            field: err.field().map(str::to_string),
            docs_hint: remediation(&err),
            details: err.details(),
        }
    }
}

/// Tool catalog bound to an upstream client and the write gate.
pub struct Gateway {
    client: CmClient,
    gate: SafetyGate,
    registry: ToolRegistry,
}

impl Gateway {
    pub fn new(client: CmClient, gate: SafetyGate) -> Self {
        Self {
            client,
            gate,
            registry: ToolRegistry::new(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn client(&self) -> &CmClient {
        &self.client
    }

    pub fn gate(&self) -> SafetyGate {
        self.gate
    }

    /// Run a resolved tool. Write tools pass the gate before their
    /// arguments are even parsed, so a refusal never depends on them.
    pub async fn execute(
        &self,
        tool: &ToolDefinition,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        if tool.kind == ToolKind::Write {
            if let GateDecision::Refused(refusal) = self.gate.check(args) {
                tracing::warn!(tool = tool.name, reason = refusal.reason(), "write refused");
                return Ok(refusal.to_value(tool.name));
            }
        }
        reject_unknown_arguments(tool, args)?;

        match tool.id {
            ToolId::GetApiInfo => self.get_api_info().await,
            ToolId::ListClusters => self.list_clusters(args).await,
            ToolId::ListServices => self.list_services(args).await,
            ToolId::ListCommands => self.list_commands(args).await,
            ToolId::GetCommand => self.get_command(args).await,
            ToolId::ListParcels => self.list_parcels(args).await,
            ToolId::GetParcelsUsage => self.get_parcels_usage(args).await,
            ToolId::ServiceCommand => self.service_command(args).await,
            ToolId::InspectHosts => self.inspect_hosts(args).await,
        }
    }

    async fn get_api_info(&self) -> Result<Value, ToolError> {
        let info = self.client.api_info().await?;
        Ok(json!(info))
    }

    async fn list_clusters(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let view = arg_view(args)?;
        self.client.resolve_version().await?;
        Ok(self.client.list_clusters(view).await?)
    }

    async fn list_services(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let cluster = required_string(args, "cluster")?;
        let view = arg_view(args)?;
        self.client.resolve_version().await?;
        Ok(self.client.list_services(&cluster, view).await?)
    }

    async fn list_commands(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let cluster = required_string(args, "cluster")?;
        let service = arg_optional_string(args, "service")?;
        let options = CommandListOptions {
            view: arg_view(args)?,
            limit: arg_bounded_u64(args, "limit", 1, MAX_PAGE_LIMIT)?,
            offset: arg_bounded_u64(args, "offset", 0, u64::MAX)?,
        };
        self.client.resolve_version().await?;
        let data = match service {
            Some(service) => {
                self.client
                    .list_service_commands(&cluster, &service, &options)
                    .await?
            }
            None => self.client.list_cluster_commands(&cluster, &options).await?,
        };
        Ok(data)
    }

    async fn get_command(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let id = required_u64(args, "id")?;
        self.client.resolve_version().await?;
        Ok(self.client.get_command(id).await?)
    }

    async fn list_parcels(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let cluster = required_string(args, "cluster")?;
        let view = arg_view(args)?.unwrap_or(View::Summary);
        let limit = arg_bounded_u64(args, "limit", 1, MAX_PAGE_LIMIT)?
            .map_or(DEFAULT_PAGE_LIMIT, |v| v as usize);
        let offset = arg_bounded_u64(args, "offset", 0, u64::MAX)?
            .map_or(0, |v| usize::try_from(v).unwrap_or(usize::MAX));
        self.client.resolve_version().await?;
        let raw = self.client.list_parcels(&cluster, Some(view)).await?;
        Ok(json!(page(raw, limit, offset)))
    }

    async fn get_parcels_usage(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let cluster = required_string(args, "cluster")?;
        // Accepted for shape compatibility with list_parcels; usage is unpaged.
        arg_view(args)?;
        arg_bounded_u64(args, "limit", 1, MAX_PAGE_LIMIT)?;
        arg_bounded_u64(args, "offset", 0, u64::MAX)?;
        self.client.resolve_version().await?;
        Ok(self.client.get_parcels_usage(&cluster).await?)
    }

    async fn service_command(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let cluster = required_string(args, "cluster")?;
        let service = required_string(args, "service")?;
        let action = arg_action(args)?;
        self.client.resolve_version().await?;
        tracing::info!(cluster = %cluster, service = %service, action = action.as_str(), "running service command");
        Ok(self
            .client
            .service_command(&cluster, &service, action)
            .await?)
    }

    async fn inspect_hosts(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let host_ids = arg_optional_non_empty_strings(args, "hostIds")?;
        self.client.resolve_version().await?;
        tracing::info!(hosts = host_ids.as_ref().map_or(0, Vec::len), "running host inspector");
        Ok(self.client.inspect_hosts(host_ids.as_deref()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmgate_core::UpstreamConfig;

    // Port 9 (discard) is never listening; any request that slips through
    // surfaces as a connection error instead of a refusal.
    fn gateway(writes_enabled: bool) -> Gateway {
        let config = UpstreamConfig::new("http://127.0.0.1:9", "admin", "admin", Some("v54")).unwrap();
        Gateway::new(CmClient::new(config).unwrap(), SafetyGate::new(writes_enabled))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn write_tools_refuse_when_writes_disabled_even_with_bad_arguments() {
        let gateway = gateway(false);
        let tool = gateway.registry().resolve("service_command").unwrap();
        let value = gateway
            .execute(tool, &args(json!({"confirm": "yes", "bogus": true})))
            .await
            .unwrap();
        assert_eq!(value["reason"], "writes_disabled");
    }

    #[tokio::test]
    async fn write_tools_refuse_without_confirm() {
        let gateway = gateway(true);
        let tool = gateway.registry().resolve("cm.write.inspect_hosts").unwrap();
        let value = gateway.execute(tool, &args(json!({}))).await.unwrap();
        assert_eq!(value["reason"], "confirm_required");
        assert_eq!(value["tool"], "inspect_hosts");
    }

    #[tokio::test]
    async fn confirmed_write_with_invalid_action_fails_validation() {
        let gateway = gateway(true);
        let tool = gateway.registry().resolve("service_command").unwrap();
        let err = gateway
            .execute(
                tool,
                &args(json!({"cluster": "c1", "service": "hdfs", "action": "reboot", "confirm": true})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, "validation_failed");
        assert_eq!(err.field.as_deref(), Some("action"));
    }

    #[tokio::test]
    async fn read_tool_validation_happens_before_network() {
        let gateway = gateway(false);
        let tool = gateway.registry().resolve("list_parcels").unwrap();
        let err = gateway
            .execute(tool, &args(json!({"cluster": "c1", "limit": 0})))
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("limit"));

        let tool = gateway.registry().resolve("get_api_info").unwrap();
        let err = gateway
            .execute(tool, &args(json!({"verbose": true})))
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("verbose"));
    }

    #[test]
    fn upstream_errors_keep_status_details() {
        let err: ToolError = GatewayError::Upstream {
            operation: "listServices".to_string(),
            status: 503,
            status_text: "Service Unavailable".to_string(),
            body: None,
        }
        .into();
        assert_eq!(err.code, "upstream_error");
        assert!(err.message.contains("503"));
        assert_eq!(err.to_value()["details"]["status"], 503);
        assert!(err.to_value().get("docs_hint").is_none());
    }

    #[test]
    fn envelope_omits_absent_fields() {
        let value = ToolError::validation("cluster", "clusterName is required").to_value();
        assert_eq!(
            value,
            json!({
                "error": "validation_failed",
                "message": "clusterName is required",
                "field": "cluster"
            })
        );

        let err: ToolError = GatewayError::Upstream {
            operation: "listServices".to_string(),
            status: 401,
            status_text: "Unauthorized".to_string(),
            body: None,
        }
        .into();
        assert!(err.docs_hint.unwrap().contains("CLDR_CM_USERNAME"));
    }
}
