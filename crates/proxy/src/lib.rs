//! MCP server exposing the operations of one `OpenAPI` document as tools.
//!
//! [`proxy::McpProxy`] is the `rmcp` server handler; [`transport`] serves it over stdio or
//! streamable HTTP.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod transport;
