//! MCP client for the proxy's streamable HTTP endpoint, just enough for the tests.

use anyhow::Context as _;
use futures::StreamExt as _;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const PROTOCOL_VERSION: &str = "2024-11-05";

pub struct McpSession {
    client: reqwest::Client,
    endpoint: String,
    session_id: String,
    next_id: AtomicU64,
}

impl McpSession {
    /// `initialize` + `notifications/initialized` against `<base_url>/mcp`.
    pub async fn connect(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();
        let endpoint = format!("{}/mcp", base_url.trim_end_matches('/'));

        let resp = post(
            &client,
            &endpoint,
            None,
            &json!({
                "jsonrpc": "2.0",
                "id": 0,
                "method": "initialize",
                "params": {
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": { "name": "openapi-mcp-proxy-tests", "version": "0" }
                }
            }),
        )
        .await?;
        let session_id = resp
            .headers()
            .get("Mcp-Session-Id")
            .and_then(|h| h.to_str().ok())
            .context("initialize response has no Mcp-Session-Id")?
            .to_string();

        let init = first_message(resp).await?;
        anyhow::ensure!(
            init.pointer("/result/capabilities/tools").is_some(),
            "tools capability missing: {init}"
        );

        let ack = post(
            &client,
            &endpoint,
            Some(&session_id),
            &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await?;
        anyhow::ensure!(
            ack.status() == reqwest::StatusCode::ACCEPTED,
            "notifications/initialized returned {}",
            ack.status()
        );

        Ok(Self {
            client,
            endpoint,
            session_id,
            next_id: AtomicU64::new(1),
        })
    }

    /// Send one JSON-RPC request and return its response message.
    pub async fn request(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let resp = post(
            &self.client,
            &self.endpoint,
            Some(&self.session_id),
            &json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}),
        )
        .await?;

        let msg = tokio::time::timeout(Duration::from_secs(20), first_message(resp))
            .await
            .with_context(|| format!("timeout waiting for {method}"))??;
        anyhow::ensure!(msg.get("id") == Some(&json!(id)), "id mismatch: {msg}");
        Ok(msg)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> anyhow::Result<Value> {
        self.request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }
}

/// Names from a `tools/list` response, in listed order.
pub fn tool_names(msg: &Value) -> anyhow::Result<Vec<String>> {
    let tools = msg
        .pointer("/result/tools")
        .and_then(Value::as_array)
        .with_context(|| format!("no result.tools: {msg}"))?;
    Ok(tools
        .iter()
        .filter_map(|t| t["name"].as_str().map(str::to_string))
        .collect())
}

/// Text of the single content block of a `tools/call` response.
pub fn call_text(msg: &Value) -> anyhow::Result<String> {
    msg.pointer("/result/content/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("no text content: {msg}"))
}

/// [`call_text`] parsed as JSON.
pub fn call_json(msg: &Value) -> anyhow::Result<Value> {
    serde_json::from_str(&call_text(msg)?).context("tool text is not JSON")
}

pub fn call_failed(msg: &Value) -> bool {
    msg.pointer("/result/isError") == Some(&Value::Bool(true))
}

async fn post(
    client: &reqwest::Client,
    endpoint: &str,
    session_id: Option<&str>,
    body: &Value,
) -> anyhow::Result<reqwest::Response> {
    let mut req = client
        .post(endpoint)
        .header("Accept", "application/json, text/event-stream")
        .json(body);
    if let Some(id) = session_id {
        req = req.header("Mcp-Session-Id", id);
    }
    req.send()
        .await
        .context("POST /mcp")?
        .error_for_status()
        .context("POST /mcp status")
}

/// First JSON-RPC message of a response, whether it is plain JSON or an event stream.
async fn first_message(resp: reqwest::Response) -> anyhow::Result<Value> {
    let is_json = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json {
        return resp.json().await.context("parse JSON response");
    }

    let mut body = resp.bytes_stream();
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk.context("read event stream")?);
        while let Some(end) = buf.windows(2).position(|w| w == b"\n\n") {
            let event: Vec<u8> = buf.drain(..end + 2).collect();
            let data: Vec<String> = String::from_utf8_lossy(&event)
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
            // Priming events carry no data.
            if !data.is_empty() {
                return serde_json::from_str(&data.join("\n")).context("parse event data");
            }
        }
    }
    anyhow::bail!("event stream ended without a message")
}
