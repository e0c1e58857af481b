//! HTTP vocabulary shared by the `OpenAPI` → MCP proxy.
//!
//! This crate is intended to be used by:
//! - `openapi-mcp-tools` (catalog build + HTTP execution)
//! - `openapi-mcp-proxy` (tool annotations on `tools/list`)

pub mod headers;
pub mod safety;
pub mod verb;
