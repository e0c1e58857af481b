//! Error types for the MCP proxy.

use openapi_mcp_http::safety::sanitize_reqwest_error;
use openapi_mcp_tools::error::ExecuteError;
use rmcp::model::{CallToolResult, Content};
use thiserror::Error;

/// Per-call failures surfaced to MCP clients.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// No catalog entry for the requested tool name. No HTTP request is issued.
    #[error("Method {0} not found")]
    ToolNotFound(String),

    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

impl ProxyError {
    /// Client-facing message. Transport failures have their request URL redacted.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            ProxyError::Execute(ExecuteError::Transport(e)) => sanitize_reqwest_error(e),
            other => other.to_string(),
        }
    }

    /// Render as a failed tool call (`isError: true`) carrying the error message.
    #[must_use]
    pub fn into_call_result(self) -> CallToolResult {
        CallToolResult {
            content: vec![Content::text(self.message())],
            structured_content: None,
            is_error: Some(true),
            meta: None,
        }
    }
}

/// Result type alias for proxy calls.
pub type Result<T> = std::result::Result<T, ProxyError>;
