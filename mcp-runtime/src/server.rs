use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::tools::{Gateway, ToolError};
use cmgate_core::error::codes;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "cmgate-mcp";

/// How a message arrived on the wire; the answer goes back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length` headers followed by the JSON body.
    Headers,
    /// One JSON document per line.
    Lines,
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

/// JSON-RPC front end for the tool gateway. Cheap to clone; every clone
/// shares one gateway and therefore one upstream session.
#[derive(Clone)]
pub struct McpServer {
    gateway: Arc<Gateway>,
}

impl McpServer {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub async fn serve_stdio(&self) -> Result<(), String> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve until the input closes. Requests are handled concurrently and
    /// answered in completion order. Malformed frames are answered with a
    /// parse error; a read failure stops intake but every request already
    /// accepted is still answered before returning.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::channel(32);
        let reader_task = tokio::spawn(read_loop(reader, tx));
        let mut in_flight: JoinSet<(Framing, Vec<Value>)> = JoinSet::new();
        let mut input_open = true;
        let mut read_failure: Option<String> = None;

        loop {
            tokio::select! {
                incoming = rx.recv(), if input_open => match incoming {
                    Some(Ok((framing, Ok(message)))) => {
                        let server = self.clone();
                        in_flight.spawn(async move {
                            (framing, server.handle_incoming_message(message).await)
                        });
                    }
                    Some(Ok((framing, Err(reason)))) => {
                        tracing::warn!(reason = %reason, "malformed MCP frame");
                        let response = rpc_response(Value::Null, Err(RpcError::parse_error(reason)));
                        write_framed_json(&mut writer, framing, &response)
                            .await
                            .map_err(|e| format!("Failed to write MCP response: {e}"))?;
                    }
                    Some(Err(err)) => {
                        tracing::error!(error = %err, "MCP input failed; draining in-flight requests");
                        read_failure = Some(format!("Failed to read MCP message: {err}"));
                        input_open = false;
                    }
                    None => input_open = false,
                },
                Some(joined) = in_flight.join_next() => match joined {
                    Ok((framing, responses)) => {
                        for response in responses {
                            write_framed_json(&mut writer, framing, &response)
                                .await
                                .map_err(|e| format!("Failed to write MCP response: {e}"))?;
                        }
                    }
                    Err(err) => tracing::error!(error = %err, "MCP request task failed"),
                },
                else => break,
            }
        }

        if let Err(err) = reader_task.await {
            return Err(format!("MCP reader stopped unexpectedly: {err}"));
        }
        match read_failure {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }

    /// Answer one decoded message or batch. Notifications and client
    /// responses produce nothing; a batch of only those produces an empty vec.
    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let items = match incoming {
            Value::Array(batch) if batch.is_empty() => {
                return vec![rpc_response(
                    Value::Null,
                    Err(RpcError::invalid_request("Batch request must not be empty")),
                )];
            }
            Value::Array(batch) => batch,
            single => vec![single],
        };

        let mut responses = Vec::with_capacity(items.len());
        for item in items {
            match Inbound::classify(item) {
                Inbound::Request { id, method, params } => {
                    let outcome = self.handle_request(&method, params).await;
                    responses.push(rpc_response(id, outcome));
                }
                Inbound::Notification { method, params } => {
                    self.handle_notification(&method, &params);
                }
                Inbound::Response => {}
                Inbound::Invalid { id, error } => responses.push(rpc_response(id, Err(error))),
            }
        }
        responses
    }

    fn handle_notification(&self, method: &str, params: &Value) {
        match method {
            "notifications/initialized" => tracing::info!(
                writes_enabled = self.gateway.gate().writes_enabled(),
                "MCP client ready"
            ),
            // Tool calls run to completion; upstream commands cannot be recalled.
            "notifications/cancelled" => tracing::info!(
                request_id = %params.get("requestId").unwrap_or(&serde_json::Value::Null),
                "cancellation received for a request that will still complete"
            ),
            _ => tracing::debug!(method, "notification ignored"),
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => {
                let client = params.get("clientInfo");
                tracing::info!(
                    client = client.and_then(|c| c.get("name")).and_then(serde_json::Value::as_str).unwrap_or("unknown"),
                    client_version = client.and_then(|c| c.get("version")).and_then(serde_json::Value::as_str).unwrap_or("unknown"),
                    requested_protocol = params.get("protocolVersion").and_then(serde_json::Value::as_str).unwrap_or("unspecified"),
                    "MCP initialize"
                );
                Ok(self.initialize_payload())
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.gateway.registry().tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        let writes = if self.gateway.gate().writes_enabled() {
            "Write tools (service_command, inspect_hosts) are enabled but every call must pass confirm=true."
        } else {
            "Write tools are disabled for this server (ALLOW_WRITES is not true); they answer with a refusal."
        };
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "listChanged": false },
                "prompts": { "listChanged": false }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": format!(
                "Read-only Cloudera Manager tools: get_api_info, list_clusters, list_services, list_commands, get_command, list_parcels, get_parcels_usage. {writes}"
            )
        })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        Ok(self.call_tool(name, args).await)
    }

    /// Resolve and run one tool. Always yields a well-formed tool result,
    /// including when the handler panics.
    pub async fn call_tool(&self, name: &str, args: Map<String, Value>) -> Value {
        let Some(tool) = self.gateway.registry().resolve(name).cloned() else {
            tracing::warn!(tool = name, "unknown tool");
            let err = ToolError::new(codes::UNKNOWN_TOOL, format!("Unknown tool: {name}"));
            return build_tool_call_response(err.to_value(), true);
        };

        tracing::debug!(tool = tool.name, requested = name, "tool call");
        let gateway = Arc::clone(&self.gateway);
        let task = tokio::spawn(async move { gateway.execute(&tool, &args).await });

        match task.await {
            Ok(Ok(payload)) => build_tool_call_response(payload, false),
            Ok(Err(err)) => {
                tracing::warn!(tool = name, code = %err.code, message = %err.message, "tool failed");
                build_tool_call_response(err.to_value(), true)
            }
            Err(join_err) => {
                tracing::error!(tool = name, error = %join_err, "tool handler aborted");
                let err = ToolError::new("internal_error", format!("Tool '{name}' failed unexpectedly"));
                build_tool_call_response(err.to_value(), true)
            }
        }
    }
}

fn build_tool_call_response(payload: Value, is_error: bool) -> Value {
    let text = to_pretty_json(&payload);
    let mut response = json!({
        "content": [{ "type": "text", "text": text }],
    });
    if payload.is_object() {
        response["structuredContent"] = payload;
    }
    if is_error {
        response["isError"] = Value::Bool(true);
    }
    response
}

/// A decoded JSON-RPC message, sorted by what the server owes in return.
enum Inbound {
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
        params: Value,
    },
    /// A reply to a server-initiated request; this server never sends any.
    Response,
    Invalid {
        id: Value,
        error: RpcError,
    },
}

impl Inbound {
    fn classify(message: Value) -> Self {
        let Value::Object(mut obj) = message else {
            return Inbound::Invalid {
                id: Value::Null,
                error: RpcError::invalid_request("Request must be a JSON object"),
            };
        };
        let id = obj.remove("id");

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return Inbound::Invalid {
                id: id.unwrap_or(Value::Null),
                error: RpcError::invalid_request("jsonrpc must be '2.0'"),
            };
        }

        let method = match obj.remove("method") {
            Some(Value::String(method)) => method,
            None if obj.contains_key("result") || obj.contains_key("error") => {
                return Inbound::Response;
            }
            _ => {
                return Inbound::Invalid {
                    id: id.unwrap_or(Value::Null),
                    error: RpcError::invalid_request("method must be a string"),
                };
            }
        };
        let params = obj.remove("params").unwrap_or(Value::Null);

        match id {
            Some(id) => Inbound::Request { id, method, params },
            None => Inbound::Notification { method, params },
        }
    }
}

fn rpc_response(id: Value, outcome: Result<Value, RpcError>) -> Value {
    match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(error) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": error.code, "message": error.message }
        }),
    }
}

/// Largest `Content-Length` body the server will buffer.
pub const MAX_MESSAGE_BYTES: u64 = 16 * 1024 * 1024;

/// One frame off the wire: the parsed message, or why it could not be used.
pub type Frame = (Framing, Result<Value, String>);

type ReadResult = Result<Frame, std::io::Error>;

async fn read_loop<R>(mut reader: R, tx: mpsc::Sender<ReadResult>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let next = match read_framed_json(&mut reader).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => break,
            Err(err) => Err(err),
        };
        let fatal = next.is_err();
        if tx.send(next).await.is_err() || fatal {
            break;
        }
    }
}

/// Read one message in either framing. `Ok(None)` on clean EOF.
///
/// Bad input is reported as a frame-level `Err` and reading resumes at the
/// next boundary: a stray line in line mode, the blank line ending a header
/// block, or the end of an oversized body. Only I/O failures and truncated
/// input are returned as the outer error.
pub async fn read_framed_json<R>(reader: &mut R) -> Result<Option<Frame>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<Result<u64, String>> = None;
    let mut header_problem: Option<String> = None;
    let mut saw_header = false;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if !saw_header {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        let trimmed = line.trim();
        if !saw_header {
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                let parsed = serde_json::from_str(trimmed)
                    .map_err(|e| format!("Invalid JSON payload: {e}"));
                return Ok(Some((Framing::Lines, parsed)));
            }
            if header_field(trimmed).is_none() {
                return Ok(Some((
                    Framing::Lines,
                    Err("Expected a JSON message or an MCP header line".to_string()),
                )));
            }
        }
        if trimmed.is_empty() {
            break;
        }
        saw_header = true;

        match header_field(trimmed) {
            Some((name, value)) if name.eq_ignore_ascii_case("content-length") => {
                content_length = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid Content-Length header: {value}")),
                );
            }
            Some(_) => {}
            None => {
                header_problem.get_or_insert_with(|| "Malformed MCP header line".to_string());
            }
        }
    }

    if let Some(problem) = header_problem {
        return Ok(Some((Framing::Headers, Err(problem))));
    }
    let content_length = match content_length {
        Some(Ok(length)) => length,
        Some(Err(problem)) => return Ok(Some((Framing::Headers, Err(problem)))),
        None => {
            return Ok(Some((
                Framing::Headers,
                Err("Missing Content-Length header".to_string()),
            )));
        }
    };

    if content_length > MAX_MESSAGE_BYTES {
        let skipped =
            tokio::io::copy(&mut (&mut *reader).take(content_length), &mut tokio::io::sink())
                .await?;
        tracing::warn!(content_length, skipped, "discarded oversized MCP message");
        return Ok(Some((
            Framing::Headers,
            Err(format!(
                "Message of {content_length} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit"
            )),
        )));
    }

    let mut payload = vec![0_u8; content_length as usize];
    reader.read_exact(&mut payload).await?;

    let parsed = serde_json::from_slice(&payload).map_err(|e| format!("Invalid JSON payload: {e}"));
    Ok(Some((Framing::Headers, parsed)))
}

/// Split `Name: value` when the name is a plain header token.
fn header_field(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let is_token = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    is_token.then(|| (name, value.trim()))
}

pub async fn write_framed_json<W>(
    writer: &mut W,
    framing: Framing,
    value: &Value,
) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::Headers => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
        Framing::Lines => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CmClient;
    use crate::gate::SafetyGate;
    use cmgate_core::UpstreamConfig;

    fn server() -> McpServer {
        let config = UpstreamConfig::new("http://127.0.0.1:9", "admin", "admin", Some("v54")).unwrap();
        McpServer::new(Gateway::new(
            CmClient::new(config).unwrap(),
            SafetyGate::new(false),
        ))
    }

    #[tokio::test]
    async fn reads_header_framed_and_line_delimited_messages() {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        let input = format!(
            "Content-Length: {}\r\n\r\n{body}\n{{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}}\n",
            body.len()
        );
        let mut reader = tokio::io::BufReader::new(input.as_bytes());

        let (framing, first) = read_framed_json(&mut reader).await.unwrap().unwrap();
        assert_eq!(framing, Framing::Headers);
        assert_eq!(first.unwrap()["id"], 1);

        let (framing, second) = read_framed_json(&mut reader).await.unwrap().unwrap();
        assert_eq!(framing, Framing::Lines);
        assert_eq!(second.unwrap()["id"], 2);

        assert!(read_framed_json(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn header_without_length_is_a_frame_error() {
        let mut reader = tokio::io::BufReader::new("Content-Type: application/json\r\n\r\n".as_bytes());
        let (framing, frame) = read_framed_json(&mut reader).await.unwrap().unwrap();
        assert_eq!(framing, Framing::Headers);
        assert!(frame.unwrap_err().contains("Missing Content-Length"));
        assert!(read_framed_json(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn line_framed_output_is_one_document_per_line() {
        let mut out = Vec::new();
        write_framed_json(&mut out, Framing::Lines, &json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(out, b"{\"a\":1}\n");

        let mut out = Vec::new();
        write_framed_json(&mut out, Framing::Headers, &json!({"a": 1}))
            .await
            .unwrap();
        assert!(out.starts_with(b"Content-Length: 7\r\n"));
    }

    #[tokio::test]
    async fn unknown_method_and_bad_version_are_rpc_errors() {
        let server = server();
        let responses = server
            .handle_incoming_message(json!({"jsonrpc": "2.0", "id": 3, "method": "nope"}))
            .await;
        assert_eq!(responses[0]["error"]["code"], -32601);

        let responses = server
            .handle_incoming_message(json!({"jsonrpc": "1.0", "id": 4, "method": "ping"}))
            .await;
        assert_eq!(responses[0]["error"]["code"], -32600);
        assert_eq!(responses[0]["id"], 4);
    }

    #[tokio::test]
    async fn notifications_and_empty_batches() {
        let server = server();
        let responses = server
            .handle_incoming_message(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        assert!(responses.is_empty());

        let responses = server.handle_incoming_message(json!([])).await;
        assert_eq!(responses[0]["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn batch_mixes_requests_notifications_and_client_replies() {
        let server = server();
        let responses = server
            .handle_incoming_message(json!([
                {"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 4}},
                {"jsonrpc": "2.0", "id": 8, "result": {}},
                {"jsonrpc": "2.0", "id": 9, "method": "ping"},
                {"jsonrpc": "2.0", "id": 10},
                "ping"
            ]))
            .await;
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 9);
        assert_eq!(responses[0]["result"], json!({}));
        assert_eq!(responses[1]["id"], 10);
        assert_eq!(responses[1]["error"]["code"], -32600);
        assert_eq!(responses[2]["id"], Value::Null);
        assert_eq!(responses[2]["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result_not_an_rpc_error() {
        let server = server();
        let responses = server
            .handle_incoming_message(json!({
                "jsonrpc": "2.0",
                "id": 5,
                "method": "tools/call",
                "params": { "name": "drop_cluster", "arguments": {} }
            }))
            .await;
        let result = &responses[0]["result"];
        assert_eq!(result["isError"], true);
        assert!(
            result["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("Unknown tool: drop_cluster")
        );
    }

    #[tokio::test]
    async fn non_object_arguments_are_invalid_params() {
        let server = server();
        let responses = server
            .handle_incoming_message(json!({
                "jsonrpc": "2.0",
                "id": 6,
                "method": "tools/call",
                "params": { "name": "list_clusters", "arguments": [1] }
            }))
            .await;
        assert_eq!(responses[0]["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn serve_answers_parse_errors_and_keeps_going() {
        let server = server();
        let input = "{not json}\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n";
        let mut out = Vec::new();
        server
            .serve(tokio::io::BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap();

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().any(|v| v["error"]["code"] == -32700));
        assert!(lines.iter().any(|v| v["id"] == 7 && v["result"] == json!({})));
    }

    async fn written_frames(out: Vec<u8>) -> Vec<(Framing, Value)> {
        let mut reader = tokio::io::BufReader::new(out.as_slice());
        let mut frames = Vec::new();
        while let Some((framing, frame)) = read_framed_json(&mut reader).await.unwrap() {
            frames.push((framing, frame.unwrap()));
        }
        frames
    }

    #[tokio::test]
    async fn stray_text_line_is_answered_and_reading_resumes() {
        let server = server();
        let input = "hello\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n\n";
        let mut out = Vec::new();
        server
            .serve(tokio::io::BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap();

        let frames = written_frames(out).await;
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().any(|(_, v)| v["error"]["code"] == -32700));
        assert!(
            frames
                .iter()
                .any(|(f, v)| *f == Framing::Lines && v["id"] == 7 && v["result"] == json!({}))
        );
    }

    #[tokio::test]
    async fn bad_content_length_does_not_drop_accepted_requests() {
        let server = server();
        let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\nContent-Length: abc\r\n\r\n";
        let mut out = Vec::new();
        server
            .serve(tokio::io::BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap();

        let frames = written_frames(out).await;
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().any(|(f, v)| *f == Framing::Headers
            && v["error"]["code"] == -32700
            && v["error"]["message"].as_str().unwrap().contains("Content-Length")));
        assert!(frames.iter().any(|(_, v)| v["id"] == 1));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_without_buffering() {
        let server = server();
        let input = "Content-Length: 18446744073709551615\r\n\r\n{}";
        let mut out = Vec::new();
        server
            .serve(tokio::io::BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap();

        let frames = written_frames(out).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, Framing::Headers);
        assert_eq!(frames[0].1["error"]["code"], -32700);
        assert!(
            frames[0].1["error"]["message"]
                .as_str()
                .unwrap()
                .contains("exceeds")
        );
    }

    #[tokio::test]
    async fn truncated_input_still_answers_accepted_requests() {
        let server = server();
        let input = "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\nContent-Length: 10\r\n\r\n{}";
        let mut out = Vec::new();
        let err = server
            .serve(tokio::io::BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap_err();
        assert!(err.contains("Failed to read MCP message"));

        let frames = written_frames(out).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].1["id"], 3);
    }

    #[test]
    fn header_field_requires_a_token_name() {
        assert_eq!(header_field("Content-Length: 12"), Some(("Content-Length", "12")));
        assert_eq!(header_field("hello"), None);
        assert_eq!(header_field("not a header: x"), None);
        assert_eq!(header_field(": x"), None);
    }
}
