//! `OpenAPI` document loading and base URL resolution.

use crate::error::{Result, SpecError};
use openapi_mcp_http::safety::{redact_url, sanitize_reqwest_error};
use openapi_mcp_http::verb::HttpVerb;
use openapiv3::OpenAPI;
use serde_yaml::Value;
use url::Url;

fn is_http_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Load an `OpenAPI` document from an http(s) URL or a local file path.
///
/// # Errors
///
/// Returns [`SpecError::Fetch`], [`SpecError::ReadFile`] or [`SpecError::Parse`].
pub async fn load_document(location: &str, client: &reqwest::Client) -> Result<OpenAPI> {
    let content = if is_http_url(location) {
        let url = Url::parse(location).map_err(|e| SpecError::Fetch {
            url: location.to_string(),
            message: e.to_string(),
        })?;
        tracing::info!(url = %redact_url(&url), "Fetching OpenAPI spec");

        let fetch_err = |message: String| SpecError::Fetch {
            url: redact_url(&url),
            message,
        };
        let resp = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_err(sanitize_reqwest_error(&e)))?;
        if !resp.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", resp.status())));
        }
        resp.text()
            .await
            .map_err(|e| fetch_err(sanitize_reqwest_error(&e)))?
    } else {
        tracing::info!(path = %location, "Loading OpenAPI spec");
        tokio::fs::read_to_string(location)
            .await
            .map_err(|e| SpecError::ReadFile {
                path: location.to_string(),
                source: e,
            })?
    };

    parse_document(&content, location)
}

/// Parse a JSON or YAML `OpenAPI` document.
///
/// Operation keys on path items are matched case-insensitively (`GET` is read as `get`).
///
/// # Errors
///
/// Returns [`SpecError::Parse`] if the text is not a well-formed `OpenAPI` document.
pub fn parse_document(content: &str, location: &str) -> Result<OpenAPI> {
    let parse_err = |source| SpecError::Parse {
        location: location.to_string(),
        source,
    };
    // JSON is a valid subset of YAML, so serde_yaml alone is enough.
    let mut raw: Value = serde_yaml::from_str(content).map_err(parse_err)?;
    normalize_verb_keys(&mut raw);
    if raw
        .get("openapi")
        .and_then(Value::as_str)
        .is_some_and(|v| v.starts_with("3.1"))
    {
        downgrade_schema_keywords(&mut raw);
    }
    serde_yaml::from_value(raw).map_err(parse_err)
}

/// Rewrite 3.1 schema keywords into their 3.0 shapes so the document model can read them.
///
/// - `type: [T, "null"]` → `type: T` + `nullable: true`; other type lists drop `type` (any)
/// - numeric `exclusiveMinimum`/`exclusiveMaximum` → `minimum`/`maximum` + `true`
fn downgrade_schema_keywords(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            let type_list = match map.get("type") {
                Some(Value::Sequence(types)) => Some(types.clone()),
                _ => None,
            };
            if let Some(types) = type_list {
                map.remove("type");
                let (nulls, rest): (Vec<Value>, Vec<Value>) = types
                    .into_iter()
                    .partition(|t| t.as_str() == Some("null"));
                if let [only] = rest.as_slice() {
                    map.insert(Value::from("type"), only.clone());
                }
                if !nulls.is_empty() {
                    map.insert(Value::from("nullable"), Value::Bool(true));
                }
            }

            for (exclusive, inclusive) in [
                ("exclusiveMinimum", "minimum"),
                ("exclusiveMaximum", "maximum"),
            ] {
                let bound = match map.get(exclusive) {
                    Some(bound @ Value::Number(_)) => bound.clone(),
                    _ => continue,
                };
                map.insert(Value::from(inclusive), bound);
                map.insert(Value::from(exclusive), Value::Bool(true));
            }

            for (_, child) in map.iter_mut() {
                downgrade_schema_keywords(child);
            }
        }
        Value::Sequence(items) => items.iter_mut().for_each(downgrade_schema_keywords),
        _ => {}
    }
}

fn normalize_verb_keys(raw: &mut Value) {
    let Some(paths) = raw.get_mut("paths").and_then(Value::as_mapping_mut) else {
        return;
    };

    for (path, item) in paths.iter_mut() {
        let Some(item) = item.as_mapping_mut() else {
            continue;
        };

        let renames: Vec<(Value, String)> = item
            .keys()
            .filter_map(|key| {
                let name = key.as_str()?;
                let lower = name.to_ascii_lowercase();
                (lower != name && lower.parse::<HttpVerb>().is_ok()).then(|| (key.clone(), lower))
            })
            .collect();

        for (key, lower) in renames {
            let Some(operation) = item.remove(&key) else {
                continue;
            };
            if item.contains_key(lower.as_str()) {
                tracing::warn!(
                    path = ?path.as_str(),
                    key = ?key.as_str(),
                    "Ignoring operation key that duplicates '{lower}'"
                );
                continue;
            }
            item.insert(Value::String(lower), operation);
        }
    }
}

/// Pick the upstream base URL for outbound calls.
///
/// `override_url` wins over `servers[0].url`. Server variables are substituted with their
/// defaults. Relative server URLs are resolved against the spec URL when the spec itself was
/// loaded from one. The returned value has no trailing slash.
///
/// # Errors
///
/// Returns [`SpecError::MissingBaseUrl`] when no candidate exists, and
/// [`SpecError::InvalidBaseUrl`] when the candidate cannot be turned into an absolute URL.
pub fn resolve_base_url(
    document: &OpenAPI,
    override_url: Option<&str>,
    spec_location: &str,
) -> Result<String> {
    let candidate = match override_url {
        Some(url) => url.to_string(),
        None => {
            let server = document.servers.first().ok_or(SpecError::MissingBaseUrl)?;
            let mut url = server.url.clone();
            if let Some(variables) = &server.variables {
                for (name, var) in variables {
                    url = url.replace(&format!("{{{name}}}"), &var.default);
                }
            }
            url
        }
    };

    if candidate.trim().is_empty() {
        return Err(SpecError::MissingBaseUrl);
    }

    let invalid = |message: String| SpecError::InvalidBaseUrl {
        url: candidate.clone(),
        message,
    };

    let resolved = if is_http_url(&candidate) {
        Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?
    } else if is_http_url(spec_location) {
        let mut spec_url = Url::parse(spec_location).map_err(|e| invalid(e.to_string()))?;
        spec_url.set_fragment(None);
        spec_url
            .join(&candidate)
            .map_err(|e| invalid(format!("{e} (set baseUrl explicitly)")))?
    } else {
        return Err(invalid(
            "must be an absolute http(s) URL (set baseUrl explicitly)".to_string(),
        ));
    };

    Ok(resolved.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const MINIMAL: &str = r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
servers:
  - url: https://api.example.com/v1/
paths:
  /pets:
    GET:
      operationId: listPets
      responses: { "200": { description: ok } }
    Post:
      operationId: addPet
      responses: { "201": { description: created } }
"#;

    #[test]
    fn parses_yaml_and_normalizes_verb_case() {
        let doc = parse_document(MINIMAL, "inline").unwrap();
        let item = doc.paths.paths["/pets"].as_item().unwrap();
        assert_eq!(
            item.get.as_ref().and_then(|o| o.operation_id.as_deref()),
            Some("listPets")
        );
        assert_eq!(
            item.post.as_ref().and_then(|o| o.operation_id.as_deref()),
            Some("addPet")
        );
    }

    #[test]
    fn parses_json_documents() {
        let doc = parse_document(
            r#"{"openapi":"3.0.0","info":{"title":"t","version":"1"},"paths":{}}"#,
            "inline.json",
        )
        .unwrap();
        assert_eq!(doc.info.title, "t");
    }

    const OPENAPI_31: &str = r#"
openapi: "3.1.0"
info: { title: t, version: "1" }
paths:
  /pets:
    get:
      operationId: listPets
      parameters:
        - name: tag
          in: query
          schema: { type: [string, "null"] }
        - name: cursor
          in: query
          schema: { type: [string, integer] }
      responses: { "200": { description: ok } }
    post:
      operationId: addPet
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                age: { type: integer, exclusiveMinimum: 0, exclusiveMaximum: 30 }
      responses: { "201": { description: created } }
"#;

    fn query_schema(doc: &OpenAPI, index: usize) -> openapiv3::Schema {
        let op = doc.paths.paths["/pets"]
            .as_item()
            .and_then(|item| item.get.clone())
            .unwrap();
        let Some(openapiv3::ReferenceOr::Item(param)) = op.parameters.get(index) else {
            panic!("inline parameter expected");
        };
        let openapiv3::ParameterSchemaOrContent::Schema(openapiv3::ReferenceOr::Item(schema)) =
            &crate::catalog::location_and_data(param).1.format
        else {
            panic!("inline schema expected");
        };
        schema.clone()
    }

    #[test]
    fn reads_31_type_lists() {
        let doc = parse_document(OPENAPI_31, "inline").unwrap();

        let tag = query_schema(&doc, 0);
        assert!(matches!(
            tag.schema_kind,
            openapiv3::SchemaKind::Type(openapiv3::Type::String(_))
        ));
        assert!(tag.schema_data.nullable);

        let cursor = query_schema(&doc, 1);
        assert!(matches!(cursor.schema_kind, openapiv3::SchemaKind::Any(_)));
        assert!(!cursor.schema_data.nullable);
    }

    #[test]
    fn reads_31_numeric_exclusive_bounds() {
        let doc = parse_document(OPENAPI_31, "inline").unwrap();
        let catalog = crate::catalog::ToolCatalog::build(&doc, "API").unwrap();
        let entry = catalog.lookup("API-addPet").unwrap();

        let Some(openapiv3::ReferenceOr::Item(body)) = &entry.operation.request_body else {
            panic!("inline body expected");
        };
        let Some(openapiv3::ReferenceOr::Item(schema)) = body
            .content
            .get("application/json")
            .and_then(|m| m.schema.as_ref())
        else {
            panic!("inline schema expected");
        };
        let openapiv3::SchemaKind::Type(openapiv3::Type::Object(obj)) = &schema.schema_kind else {
            panic!("object schema expected");
        };
        let Some(openapiv3::ReferenceOr::Item(age)) = obj.properties.get("age") else {
            panic!("inline property expected");
        };
        let openapiv3::SchemaKind::Type(openapiv3::Type::Integer(int)) = &age.schema_kind else {
            panic!("integer schema expected");
        };
        assert_eq!(int.minimum, Some(0));
        assert!(int.exclusive_minimum);
        assert_eq!(int.maximum, Some(30));
        assert!(int.exclusive_maximum);
    }

    #[test]
    fn leaves_30_documents_untouched() {
        let doc = parse_document(MINIMAL, "inline").unwrap();
        assert_eq!(doc.openapi, "3.0.0");
        assert_eq!(doc.paths.paths.len(), 1);
    }

    #[test]
    fn parse_errors_name_the_location() {
        let err = parse_document("openapi: [", "broken.yaml").unwrap_err();
        assert!(matches!(err, SpecError::Parse { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[tokio::test]
    async fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let client = reqwest::Client::new();
        let doc = load_document(file.path().to_str().unwrap(), &client)
            .await
            .unwrap();
        assert_eq!(doc.paths.paths.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let client = reqwest::Client::new();
        let err = load_document("/definitely/not/here.yaml", &client)
            .await
            .unwrap_err();
        assert!(matches!(err, SpecError::ReadFile { .. }));
    }

    #[tokio::test]
    async fn loads_from_url() {
        let app = axum::Router::new().route(
            "/openapi.yaml",
            axum::routing::get(|| async { MINIMAL }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        let client = reqwest::Client::new();
        let location = format!("http://{addr}/openapi.yaml");
        let doc = load_document(&location, &client).await.unwrap();
        assert!(doc.paths.paths.contains_key("/pets"));

        let err = load_document(&format!("http://{addr}/missing.yaml"), &client)
            .await
            .unwrap_err();
        assert!(matches!(err, SpecError::Fetch { .. }));

        let _ = tx.send(());
        let _ = server.await;
    }

    #[test]
    fn base_url_comes_from_first_server() {
        let doc = parse_document(MINIMAL, "inline").unwrap();
        assert_eq!(
            resolve_base_url(&doc, None, "spec.yaml").unwrap(),
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn base_url_override_wins() {
        let doc = parse_document(MINIMAL, "inline").unwrap();
        assert_eq!(
            resolve_base_url(&doc, Some("http://localhost:8080"), "spec.yaml").unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn missing_servers_is_fatal() {
        let doc = parse_document(
            r#"{"openapi":"3.0.0","info":{"title":"t","version":"1"},"paths":{}}"#,
            "inline",
        )
        .unwrap();
        let err = resolve_base_url(&doc, None, "spec.yaml").unwrap_err();
        assert!(matches!(err, SpecError::MissingBaseUrl));
        assert_eq!(err.to_string(), "No base URL found in OpenAPI spec");
    }

    #[test]
    fn relative_server_urls_resolve_against_spec_url() {
        let doc = parse_document(
            r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
servers:
  - url: /api/v3
paths: {}
"#,
            "inline",
        )
        .unwrap();
        assert_eq!(
            resolve_base_url(&doc, None, "https://petstore.example.com/openapi.json").unwrap(),
            "https://petstore.example.com/api/v3"
        );
        assert!(matches!(
            resolve_base_url(&doc, None, "./openapi.json"),
            Err(SpecError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn server_variables_use_defaults() {
        let doc = parse_document(
            r#"
openapi: "3.0.0"
info: { title: t, version: "1" }
servers:
  - url: https://{region}.example.com/{version}
    variables:
      region: { default: eu }
      version: { default: v2 }
paths: {}
"#,
            "inline",
        )
        .unwrap();
        assert_eq!(
            resolve_base_url(&doc, None, "spec.yaml").unwrap(),
            "https://eu.example.com/v2"
        );
    }
}
