use std::collections::HashMap;

use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    GetApiInfo,
    ListClusters,
    ListServices,
    ListCommands,
    GetCommand,
    ListParcels,
    GetParcelsUsage,
    ServiceCommand,
    InspectHosts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Read,
    Write,
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub id: ToolId,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ToolKind,
    input_schema: Option<Value>,
}

impl ToolDefinition {
    /// Schema advertised in discovery; tools without one accept no arguments.
    pub fn input_schema(&self) -> Value {
        self.input_schema.clone().unwrap_or_else(|| {
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            })
        })
    }

    /// Argument names the schema declares.
    pub fn accepts(&self, key: &str) -> bool {
        self.input_schema
            .as_ref()
            .and_then(|schema| schema.get("properties"))
            .and_then(Value::as_object)
            .is_some_and(|properties| properties.contains_key(key))
    }
}

/// Hidden compatibility names accepted for invocation but never listed.
const LEGACY_ALIASES: [(&str, &str); 18] = [
    ("cm.read.get_api_info", "get_api_info"),
    ("cm.read.list_clusters", "list_clusters"),
    ("cm.read.list_services", "list_services"),
    ("cm.read.list_commands", "list_commands"),
    ("cm.read.get_command", "get_command"),
    ("cm.read.list_parcels", "list_parcels"),
    ("cm.read.get_parcels_usage", "get_parcels_usage"),
    ("cm.write.service_command", "service_command"),
    ("cm.write.inspect_hosts", "inspect_hosts"),
    ("cm_read_get_api_info", "get_api_info"),
    ("cm_read_list_clusters", "list_clusters"),
    ("cm_read_list_services", "list_services"),
    ("cm_read_list_commands", "list_commands"),
    ("cm_read_get_command", "get_command"),
    ("cm_read_list_parcels", "list_parcels"),
    ("cm_read_get_parcels_usage", "get_parcels_usage"),
    ("cm_write_service_command", "service_command"),
    ("cm_write_inspect_hosts", "inspect_hosts"),
];

/// Static tool catalog: one canonical table plus an alias layer resolved
/// in front of it.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    by_name: HashMap<&'static str, usize>,
    aliases: HashMap<&'static str, &'static str>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        let tools: Vec<ToolDefinition> = read_tools().into_iter().chain(write_tools()).collect();
        let by_name: HashMap<&'static str, usize> = tools
            .iter()
            .enumerate()
            .map(|(idx, tool)| (tool.name, idx))
            .collect();
        let aliases = LEGACY_ALIASES
            .iter()
            .filter(|(_, canonical)| by_name.contains_key(canonical))
            .map(|&(legacy, canonical)| (legacy, canonical))
            .collect();
        Self {
            tools,
            by_name,
            aliases,
        }
    }

    /// Look up a canonical or legacy name.
    pub fn resolve(&self, name: &str) -> Option<&ToolDefinition> {
        let canonical = self.aliases.get(name).copied().unwrap_or(name);
        self.by_name.get(canonical).map(|&idx| &self.tools[idx])
    }

    /// Canonical definitions in registration order (reads, then writes).
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.aliases.iter().map(|(&legacy, &canonical)| (legacy, canonical))
    }

    pub fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect();
        json!({ "tools": tools })
    }
}

fn view_schema() -> Value {
    json!({ "type": "string", "enum": ["summary", "full"] })
}

fn paged_cluster_schema() -> Value {
    json!({
        "type": "object",
        "required": ["cluster"],
        "properties": {
            "cluster": { "type": "string" },
            "view": view_schema(),
            "limit": { "type": "number", "minimum": 1, "maximum": 500 },
            "offset": { "type": "number", "minimum": 0 }
        },
        "additionalProperties": false
    })
}

fn read_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            id: ToolId::GetApiInfo,
            name: "get_api_info",
            description: "Get Cloudera Manager API version and base URL",
            kind: ToolKind::Read,
            input_schema: None,
        },
        ToolDefinition {
            id: ToolId::ListClusters,
            name: "list_clusters",
            description: "List clusters (summary or full view)",
            kind: ToolKind::Read,
            input_schema: Some(json!({
                "type": "object",
                "properties": { "view": view_schema() },
                "additionalProperties": false
            })),
        },
        ToolDefinition {
            id: ToolId::ListServices,
            name: "list_services",
            description: "List services in a cluster",
            kind: ToolKind::Read,
            input_schema: Some(json!({
                "type": "object",
                "required": ["cluster"],
                "properties": {
                    "cluster": { "type": "string" },
                    "view": view_schema()
                },
                "additionalProperties": false
            })),
        },
        ToolDefinition {
            id: ToolId::ListCommands,
            name: "list_commands",
            description: "List recent commands for a cluster or service",
            kind: ToolKind::Read,
            input_schema: Some(json!({
                "type": "object",
                "required": ["cluster"],
                "properties": {
                    "cluster": { "type": "string" },
                    "service": { "type": "string" },
                    "view": view_schema(),
                    "limit": { "type": "number", "minimum": 1, "maximum": 500 },
                    "offset": { "type": "number", "minimum": 0 }
                },
                "additionalProperties": false
            })),
        },
        ToolDefinition {
            id: ToolId::GetCommand,
            name: "get_command",
            description: "Get command status by id",
            kind: ToolKind::Read,
            input_schema: Some(json!({
                "type": "object",
                "required": ["id"],
                "properties": { "id": { "type": "number" } },
                "additionalProperties": false
            })),
        },
        ToolDefinition {
            id: ToolId::ListParcels,
            name: "list_parcels",
            description: "List parcels that a cluster has access to (supports view; limit/offset are applied client-side)",
            kind: ToolKind::Read,
            input_schema: Some(paged_cluster_schema()),
        },
        ToolDefinition {
            id: ToolId::GetParcelsUsage,
            name: "get_parcels_usage",
            description: "Get parcel usage details for a cluster (no paging supported by Cloudera Manager)",
            kind: ToolKind::Read,
            input_schema: Some(paged_cluster_schema()),
        },
    ]
}

fn write_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            id: ToolId::ServiceCommand,
            name: "service_command",
            description: "Run start/stop/restart on a service (requires confirm and ALLOW_WRITES=true)",
            kind: ToolKind::Write,
            input_schema: Some(json!({
                "type": "object",
                "required": ["cluster", "service", "action"],
                "properties": {
                    "cluster": { "type": "string" },
                    "service": { "type": "string" },
                    "action": { "type": "string", "enum": ["start", "stop", "restart"] },
                    "confirm": { "type": "boolean", "default": false }
                },
                "additionalProperties": false
            })),
        },
        ToolDefinition {
            id: ToolId::InspectHosts,
            name: "inspect_hosts",
            description: "Run the Cloudera Manager host inspector (requires confirm and ALLOW_WRITES=true)",
            kind: ToolKind::Write,
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "hostIds": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                    "confirm": { "type": "boolean", "default": false }
                },
                "additionalProperties": false
            })),
        },
    ]
}
