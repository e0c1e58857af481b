//! HTTP execution of catalogued operations.
//!
//! The executor owns a dispatch table (`operationId` → verb + path template) built from the same
//! document walk as the catalog, a shared `reqwest::Client`, and the static request defaults.

use crate::catalog::{location_and_data, operations};
use crate::config::ProxyConfig;
use crate::error::{ExecuteError, Result, SpecError};
use openapi_mcp_http::headers::HeaderSet;
use openapi_mcp_http::verb::HttpVerb;
use openapiv3::{OpenAPI, Operation, ReferenceOr};
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Where a call's arguments go.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentPartition {
    /// Path/query (or, without a request body, every) argument.
    pub url_params: Map<String, Value>,
    /// Remaining arguments, sent as the JSON body.
    pub body_params: Map<String, Value>,
}

/// Split call arguments between URL parameters and the request body.
///
/// Declared `path`/`query` parameters present in `args` become URL parameters. When the operation
/// declares no request body, every remaining argument is a URL parameter too.
#[must_use]
pub fn partition_arguments(operation: &Operation, mut args: Map<String, Value>) -> ArgumentPartition {
    let mut url_params = Map::new();

    for param in &operation.parameters {
        let ReferenceOr::Item(param) = param else {
            continue;
        };
        let (location, data) = location_and_data(param);
        if matches!(location, "path" | "query")
            && let Some(value) = args.remove(&data.name)
        {
            url_params.insert(data.name.clone(), value);
        }
    }

    if operation.request_body.is_none() {
        url_params.append(&mut args);
    }

    ArgumentPartition {
        url_params,
        body_params: args,
    }
}

/// Decoded response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl ResponseBody {
    fn decode(bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        let Some(ct) = content_type.map(str::to_ascii_lowercase) else {
            return ResponseBody::Bytes(bytes);
        };

        if ct.contains("json") {
            if bytes.is_empty() {
                return ResponseBody::Text(String::new());
            }
            return match serde_json::from_slice(&bytes) {
                Ok(v) => ResponseBody::Json(v),
                Err(_) => match String::from_utf8(bytes) {
                    Ok(s) => ResponseBody::Text(s),
                    Err(e) => ResponseBody::Bytes(e.into_bytes()),
                },
            };
        }

        if ct.starts_with("text/") || ct.contains("xml") || ct.contains("html") {
            return match String::from_utf8(bytes) {
                Ok(s) => ResponseBody::Text(s),
                Err(e) => ResponseBody::Bytes(e.into_bytes()),
            };
        }

        ResponseBody::Bytes(bytes)
    }

    /// Raw bytes of the payload (JSON is re-serialized compactly).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ResponseBody::Json(v) => v.to_string().into_bytes(),
            ResponseBody::Text(s) => s.clone().into_bytes(),
            ResponseBody::Bytes(b) => b.clone(),
        }
    }
}

/// Successful upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderSet,
    pub body: ResponseBody,
}

impl HttpResponse {
    #[must_use]
    pub fn content_type(&self) -> Option<std::borrow::Cow<'_, str>> {
        self.headers.get("content-type")
    }
}

/// Verb and path template an `operationId` dispatches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub verb: HttpVerb,
    pub path: String,
}

/// Issues HTTP requests for catalogued operations.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
    routes: HashMap<String, Route>,
}

impl HttpExecutor {
    /// Build an executor for `document`, sending requests to `base_url`.
    ///
    /// Every request carries `Content-Type: application/json` unless `config.headers` overrides
    /// it, plus every configured static header.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Config`] for invalid header names/values or if the HTTP client cannot
    /// be built.
    pub fn new(document: &OpenAPI, base_url: &str, config: &ProxyConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SpecError::Config(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SpecError::Config(format!("invalid value for header '{name}': {e}")))?;
            default_headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(|e| SpecError::Config(format!("failed to build HTTP client: {e}")))?;

        let mut routes = HashMap::new();
        for (path, verb, operation) in operations(document) {
            if let Some(id) = operation.operation_id {
                routes.entry(id).or_insert_with(|| Route {
                    verb,
                    path: path.to_string(),
                });
            }
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
            routes,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn route(&self, operation_id: &str) -> Option<&Route> {
        self.routes.get(operation_id)
    }

    /// Execute `operation` with the given arguments.
    ///
    /// The request is dispatched through the route table by `operationId`; `verb` and `path` are
    /// the location the caller found the operation under and must agree with the table.
    ///
    /// # Errors
    ///
    /// - [`ExecuteError::OperationIdRequired`] if the operation has no `operationId`
    /// - [`ExecuteError::OperationNotFound`] if the route table has no entry for it
    /// - [`ExecuteError::Http`] on a non-2xx response
    /// - [`ExecuteError::Transport`] on network failure
    pub async fn execute(
        &self,
        operation: &Operation,
        verb: HttpVerb,
        path: &str,
        args: Map<String, Value>,
    ) -> std::result::Result<HttpResponse, ExecuteError> {
        let operation_id = operation
            .operation_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ExecuteError::OperationIdRequired)?;

        let route = self
            .routes
            .get(operation_id)
            .ok_or_else(|| ExecuteError::OperationNotFound(operation_id.to_string()))?;
        if route.verb != verb || route.path != path {
            tracing::warn!(
                operation_id = %operation_id,
                requested = %format!("{verb} {path}"),
                routed = %format!("{} {}", route.verb, route.path),
                "Operation location differs from route table; using route table"
            );
        }

        let partition = partition_arguments(operation, args);
        let request = self.build_request(route, operation, partition)?;

        tracing::debug!(
            operation_id = %operation_id,
            method = %route.verb,
            path = %route.path,
            "Executing upstream request"
        );

        let response = request.send().await?;
        let status = response.status();
        let headers = HeaderSet::from(response.headers());

        if !status.is_success() {
            tracing::warn!(
                operation_id = %operation_id,
                status = status.as_u16(),
                "Upstream returned error status"
            );
            return Err(ExecuteError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        let body = ResponseBody::decode(bytes, headers.get("content-type").as_deref());

        Ok(HttpResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }

    fn build_request(
        &self,
        route: &Route,
        operation: &Operation,
        partition: ArgumentPartition,
    ) -> std::result::Result<reqwest::RequestBuilder, ExecuteError> {
        let locations: HashMap<&str, &'static str> = operation
            .parameters
            .iter()
            .filter_map(|p| match p {
                ReferenceOr::Item(p) => {
                    let (location, data) = location_and_data(p);
                    Some((data.name.as_str(), location))
                }
                ReferenceOr::Reference { .. } => None,
            })
            .collect();

        let mut path = route.path.clone();
        let mut query: Vec<(String, String)> = Vec::new();
        let mut headers: Vec<(String, String)> = Vec::new();
        let mut cookies: Vec<String> = Vec::new();

        for (name, value) in &partition.url_params {
            if value.is_null() {
                continue;
            }
            match locations.get(name.as_str()).copied() {
                Some("path") => {
                    path = path.replace(
                        &format!("{{{name}}}"),
                        &percent_encode(&value_to_string(value)),
                    );
                }
                Some("header") => headers.push((name.clone(), value_to_string(value))),
                Some("cookie") => cookies.push(format!("{name}={}", value_to_string(value))),
                _ => match value {
                    Value::Array(items) => query.extend(
                        items
                            .iter()
                            .filter(|v| !v.is_null())
                            .map(|v| (name.clone(), value_to_string(v))),
                    ),
                    other => query.push((name.clone(), value_to_string(other))),
                },
            }
        }

        let url = build_url(&self.base_url, &path, &query)?;
        let mut request = self.client.request(route.verb.method(), url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if !cookies.is_empty() {
            request = request.header(COOKIE, cookies.join("; "));
        }
        if operation.request_body.is_some() {
            request = request.json(&Value::Object(partition.body_params));
        }
        if let Some(t) = self.timeout {
            request = request.timeout(t);
        }
        Ok(request)
    }
}

fn build_url(
    base_url: &str,
    path: &str,
    query: &[(String, String)],
) -> std::result::Result<Url, ExecuteError> {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    let mut url = Url::parse(&format!("{base_url}{path}"))
        .map_err(|e| ExecuteError::InvalidUrl(e.to_string()))?;

    if !query.is_empty() {
        let encoded: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect();
        url.set_query(Some(&encoded.join("&")));
    }
    Ok(url)
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn percent_encode(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
