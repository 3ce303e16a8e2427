use std::sync::{PoisonError, RwLock};

use cmgate_core::auth::basic_authorization;
use cmgate_core::{ApiVersion, GatewayError, UpstreamConfig};
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Summary,
    Full,
}

impl View {
    pub fn as_str(self) -> &'static str {
        match self {
            View::Summary => "summary",
            View::Full => "full",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "summary" => Some(View::Summary),
            "full" => Some(View::Full),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "start" => Some(ServiceAction::Start),
            "stop" => Some(ServiceAction::Stop),
            "restart" => Some(ServiceAction::Restart),
            _ => None,
        }
    }
}

/// Query options forwarded verbatim to the natively paged command listings.
#[derive(Debug, Clone, Default)]
pub struct CommandListOptions {
    pub view: Option<View>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl CommandListOptions {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(view) = self.view {
            query.push(("view", view.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfo {
    pub version: ApiVersion,
    pub base_url: String,
}

/// Version resolution state. Moves from `Unresolved` to `Resolved` at most
/// once and never back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionState {
    Unresolved,
    Resolved(ApiVersion),
}

impl VersionState {
    fn api_base(&self, base_url: &str) -> Result<String, GatewayError> {
        match self {
            VersionState::Unresolved => Err(GatewayError::State(
                "API version not resolved yet".to_string(),
            )),
            VersionState::Resolved(version) => Ok(format!("{base_url}/api/{version}")),
        }
    }
}

/// Authenticated client for the Cloudera Manager REST API.
///
/// TLS verification, timeout and credentials are baked into the wrapped
/// `reqwest::Client` at construction; nothing here touches process state.
pub struct CmClient {
    config: UpstreamConfig,
    http: reqwest::Client,
    version: RwLock<VersionState>,
    resolving: tokio::sync::Mutex<()>,
}

impl CmClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, GatewayError> {
        let http = build_http_client(&config)?;
        let version = match config.api_version() {
            Some(pinned) => VersionState::Resolved(pinned.clone()),
            None => VersionState::Unresolved,
        };
        Ok(Self {
            config,
            http,
            version: RwLock::new(version),
            resolving: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    pub fn version_state(&self) -> VersionState {
        self.version
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return the cached version, discovering it on first use.
    ///
    /// Concurrent first callers queue on a single in-flight discovery.
    pub async fn resolve_version(&self) -> Result<ApiVersion, GatewayError> {
        if let VersionState::Resolved(version) = self.version_state() {
            return Ok(version);
        }
        let _in_flight = self.resolving.lock().await;
        if let VersionState::Resolved(version) = self.version_state() {
            return Ok(version);
        }

        let version = self.discover_version().await?;
        {
            let mut state = self.version.write().unwrap_or_else(PoisonError::into_inner);
            if *state == VersionState::Unresolved {
                *state = VersionState::Resolved(version.clone());
            }
        }
        tracing::info!(version = %version, "resolved Cloudera Manager API version");
        Ok(version)
    }

    async fn discover_version(&self) -> Result<ApiVersion, GatewayError> {
        let url = self.url_from(self.config.base_url(), &["api", "version"], &[])?;
        tracing::debug!(url = %url, "discovering API version");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error("resolveVersion", &e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Protocol(format!(
                "Failed to get API version: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )));
        }
        let text = response
            .text()
            .await
            .map_err(|e| transport_error("resolveVersion", &e))?;
        ApiVersion::parse_discovery_body(&text)
    }

    /// `{baseUrl}/api/{version}`. Fails with a state error before resolution.
    pub fn api_base(&self) -> Result<String, GatewayError> {
        self.version_state().api_base(self.config.base_url())
    }

    pub async fn api_info(&self) -> Result<ApiInfo, GatewayError> {
        let version = self.resolve_version().await?;
        Ok(ApiInfo {
            version,
            base_url: self.config.base_url().to_string(),
        })
    }

    pub async fn list_clusters(&self, view: Option<View>) -> Result<Value, GatewayError> {
        let url = self.endpoint(&["clusters"], &view_query(view))?;
        self.send("listClusters", Method::GET, url, None).await
    }

    pub async fn list_services(
        &self,
        cluster: &str,
        view: Option<View>,
    ) -> Result<Value, GatewayError> {
        require_name("cluster", "clusterName", cluster)?;
        let url = self.endpoint(&["clusters", cluster, "services"], &view_query(view))?;
        self.send("listServices", Method::GET, url, None).await
    }

    pub async fn service_command(
        &self,
        cluster: &str,
        service: &str,
        action: ServiceAction,
    ) -> Result<Value, GatewayError> {
        require_name("cluster", "clusterName", cluster)?;
        require_name("service", "serviceName", service)?;
        let url = self.endpoint(
            &[
                "clusters",
                cluster,
                "services",
                service,
                "commands",
                action.as_str(),
            ],
            &[],
        )?;
        let operation = format!("serviceCommand:{}", action.as_str());
        self.send(&operation, Method::POST, url, None).await
    }

    pub async fn get_command(&self, id: u64) -> Result<Value, GatewayError> {
        let id = id.to_string();
        let url = self.endpoint(&["commands", id.as_str()], &[])?;
        self.send("getCommand", Method::GET, url, None).await
    }

    pub async fn list_cluster_commands(
        &self,
        cluster: &str,
        options: &CommandListOptions,
    ) -> Result<Value, GatewayError> {
        require_name("cluster", "clusterName", cluster)?;
        let url = self.endpoint(&["clusters", cluster, "commands"], &options.query())?;
        self.send("listClusterCommands", Method::GET, url, None)
            .await
    }

    pub async fn list_service_commands(
        &self,
        cluster: &str,
        service: &str,
        options: &CommandListOptions,
    ) -> Result<Value, GatewayError> {
        require_name("cluster", "clusterName", cluster)?;
        require_name("service", "serviceName", service)?;
        let url = self.endpoint(
            &["clusters", cluster, "services", service, "commands"],
            &options.query(),
        )?;
        self.send("listServiceCommands", Method::GET, url, None)
            .await
    }

    pub async fn list_parcels(
        &self,
        cluster: &str,
        view: Option<View>,
    ) -> Result<Value, GatewayError> {
        require_name("cluster", "clusterName", cluster)?;
        let url = self.endpoint(&["clusters", cluster, "parcels"], &view_query(view))?;
        self.send("listParcels", Method::GET, url, None).await
    }

    pub async fn get_parcels_usage(&self, cluster: &str) -> Result<Value, GatewayError> {
        require_name("cluster", "clusterName", cluster)?;
        let url = self.endpoint(&["clusters", cluster, "parcels", "usage"], &[])?;
        self.send("getParcelsUsage", Method::GET, url, None).await
    }

    /// Trigger the host inspector. Without host ids every managed host is
    /// inspected.
    pub async fn inspect_hosts(&self, host_ids: Option<&[String]>) -> Result<Value, GatewayError> {
        let url = self.endpoint(&["cm", "commands", "inspectHosts"], &[])?;
        let body = host_ids.map(|ids| json!({ "items": ids }));
        self.send("inspectHosts", Method::POST, url, body).await
    }

    fn endpoint(
        &self,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> Result<Url, GatewayError> {
        let base = self.api_base()?;
        self.url_from(&base, segments, query)
    }

    /// Append `segments` to `base`, percent-encoding each one.
    fn url_from(
        &self,
        base: &str,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> Result<Url, GatewayError> {
        let mut url = Url::parse(base)
            .map_err(|e| GatewayError::State(format!("Invalid Cloudera Manager base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::State("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<Value, GatewayError> {
        tracing::debug!(operation, method = %method, url = %url, "cloudera manager request");
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        let status = response.status();
        if !status.is_success() {
            // Body is best-effort context; a failed read is not reported.
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            tracing::warn!(operation, status = status.as_u16(), "cloudera manager request failed");
            return Err(GatewayError::Upstream {
                operation: operation.to_string(),
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(operation, &e))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }
}

fn build_http_client(config: &UpstreamConfig) -> Result<reqwest::Client, GatewayError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    let mut authorization =
        HeaderValue::from_str(&basic_authorization(config.username(), config.password()))
            .map_err(|e| GatewayError::validation("username", format!("Invalid credentials: {e}")))?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);

    if !config.verify_tls() {
        tracing::warn!("TLS certificate verification disabled for Cloudera Manager client");
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .danger_accept_invalid_certs(!config.verify_tls())
        .timeout(config.timeout())
        .build()
        .map_err(|e| transport_error("buildClient", &e))
}

fn transport_error(operation: &str, err: &reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}

fn require_name(field: &str, label: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::validation(field, format!("{label} is required")));
    }
    // URL path normalization would swallow these segments and address a
    // different resource.
    if matches!(value, "." | "..") {
        return Err(GatewayError::validation(
            field,
            format!("{label} must not be '.' or '..'"),
        ));
    }
    Ok(())
}

fn view_query(view: Option<View>) -> Vec<(&'static str, String)> {
    view.map(|v| vec![("view", v.as_str().to_string())])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(pinned: Option<&str>) -> CmClient {
        let config = UpstreamConfig::new("http://127.0.0.1:9/cm/", "admin", "admin", pinned).unwrap();
        CmClient::new(config).unwrap()
    }

    #[test]
    fn api_base_requires_resolved_version() {
        let client = client(None);
        assert_eq!(client.version_state(), VersionState::Unresolved);
        let err = client.api_base().unwrap_err();
        assert_eq!(err.code(), "state_error");
    }

    #[test]
    fn pinned_version_starts_resolved() {
        let client = client(Some("v41"));
        assert_eq!(client.api_base().unwrap(), "http://127.0.0.1:9/cm/api/v41");
    }

    #[test]
    fn endpoint_percent_encodes_caller_names() {
        let client = client(Some("v54"));
        let url = client
            .endpoint(&["clusters", "Cluster 1/prod", "services"], &[("view", "full".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9/cm/api/v54/clusters/Cluster%201%2Fprod/services?view=full"
        );
    }

    #[tokio::test]
    async fn dot_segment_names_are_rejected() {
        let client = client(Some("v54"));
        for name in [".", ".."] {
            let err = client.list_services(name, None).await.unwrap_err();
            assert_eq!(err.field(), Some("cluster"));
            assert_eq!(err.code(), "validation_failed");

            let err = client
                .service_command("c1", name, ServiceAction::Stop)
                .await
                .unwrap_err();
            assert_eq!(err.field(), Some("service"));
        }
        // Dots inside a longer name are ordinary characters.
        let url = client.endpoint(&["clusters", "...", "services"], &[]).unwrap();
        assert!(url.path().ends_with("/clusters/.../services"));
    }

    #[tokio::test]
    async fn blank_names_fail_before_any_request() {
        let client = client(Some("v54"));
        let err = client.list_services("  ", None).await.unwrap_err();
        assert_eq!(err.field(), Some("cluster"));
        assert_eq!(err.to_string(), "clusterName is required");

        let err = client
            .service_command("c1", "", ServiceAction::Restart)
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("service"));
    }

    #[test]
    fn command_list_options_only_forward_present_values() {
        let options = CommandListOptions {
            view: Some(View::Summary),
            limit: None,
            offset: Some(20),
        };
        assert_eq!(
            options.query(),
            vec![("view", "summary".to_string()), ("offset", "20".to_string())]
        );
        assert!(CommandListOptions::default().query().is_empty());
    }
}
