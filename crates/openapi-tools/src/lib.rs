//! `OpenAPI` → MCP tool core.
//!
//! - [`catalog`]: operation extraction and the tool catalog
//! - [`executor`]: argument partitioning and HTTP execution
//! - [`content`]: response shaping into tool content
//! - [`loader`]: document loading and base URL resolution
//!
//! Nothing here depends on an MCP transport; `openapi-mcp-proxy` binds it to one.

pub mod catalog;
pub mod config;
pub mod content;
pub mod error;
pub mod executor;
pub mod loader;
pub mod schema;
