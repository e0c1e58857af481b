//! HTTP verbs recognized on `OpenAPI` path items.
//!
//! Dispatch is keyed on this tagged variant plus a path template, never on dynamically named
//! client bindings.

use reqwest::Method;
use rmcp::model::ToolAnnotations;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the five operation verbs the catalog registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported HTTP verb '{0}'")]
pub struct UnsupportedVerb(pub String);

impl HttpVerb {
    /// Verbs in the order they are visited on a path item.
    pub const ALL: [HttpVerb; 5] = [
        HttpVerb::Get,
        HttpVerb::Post,
        HttpVerb::Put,
        HttpVerb::Delete,
        HttpVerb::Patch,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "get",
            HttpVerb::Post => "post",
            HttpVerb::Put => "put",
            HttpVerb::Delete => "delete",
            HttpVerb::Patch => "patch",
        }
    }

    #[must_use]
    pub fn method(self) -> Method {
        match self {
            HttpVerb::Get => Method::GET,
            HttpVerb::Post => Method::POST,
            HttpVerb::Put => Method::PUT,
            HttpVerb::Delete => Method::DELETE,
            HttpVerb::Patch => Method::PATCH,
        }
    }

    /// Generate MCP tool annotations based on the verb's HTTP semantics.
    ///
    /// `openWorldHint` is always `true`: every tool talks to an external system.
    #[must_use]
    pub fn annotations(self) -> ToolAnnotations {
        let open_world_hint = Some(true);
        let (read_only, destructive, idempotent) = match self {
            HttpVerb::Get => (Some(true), Some(false), Some(true)),
            HttpVerb::Post => (Some(false), Some(false), Some(false)),
            HttpVerb::Put | HttpVerb::Delete => (Some(false), Some(true), Some(true)),
            // PATCH may or may not be idempotent; do not guess.
            HttpVerb::Patch => (Some(false), Some(true), None),
        };

        ToolAnnotations {
            title: None,
            read_only_hint: read_only,
            destructive_hint: destructive,
            idempotent_hint: idempotent,
            open_world_hint,
        }
    }
}

impl FromStr for HttpVerb {
    type Err = UnsupportedVerb;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        HttpVerb::ALL
            .into_iter()
            .find(|v| v.as_str() == lower)
            .ok_or_else(|| UnsupportedVerb(s.to_string()))
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}
