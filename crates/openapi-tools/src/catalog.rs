//! Tool catalog: `OpenAPI` operations → MCP tool methods.
//!
//! The catalog is built once from an immutable document and never mutated afterwards. It holds
//! two views of the same operations:
//! - `tools`: namespace → ordered tool methods (used for `tools/list`)
//! - `lookup`: qualified name → operation + verb + path template (used for `tools/call`)
//!
//! Both views derive their keys from [`qualified_name`], so listing and dispatch cannot drift.

use crate::error::CatalogError;
use crate::schema::{
    SemanticType, is_image_media_type, kind_of, type_of_opt, type_of_parameter_format,
};
use indexmap::IndexMap;
use openapi_mcp_http::verb::HttpVerb;
use openapiv3::{
    OpenAPI, Operation, Parameter, ParameterData, PathItem, ReferenceOr, RequestBody, Responses,
    SchemaKind, StatusCode, Type,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Build the public tool name for an operation.
#[must_use]
pub fn qualified_name(namespace: &str, operation_id: &str) -> String {
    format!("{namespace}-{operation_id}")
}

/// One tool argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: SemanticType,
    pub description: String,
    pub optional: bool,
}

/// What a successful call returns, derived from the `200`/`201` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnDescriptor {
    #[serde(rename = "type")]
    pub return_type: SemanticType,
    pub description: String,
}

/// Catalog-level representation of one `OpenAPI` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolMethod {
    /// The `operationId`.
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
    pub returns: Option<ReturnDescriptor>,
}

impl ToolMethod {
    /// JSON Schema object describing this method's arguments.
    #[must_use]
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required: Vec<Value> = Vec::new();

        for param in &self.params {
            let mut prop = param.param_type.json_schema();
            prop["description"] = json!(param.description);
            properties.insert(param.name.clone(), prop);

            if !param.optional && !required.iter().any(|r| r == param.name.as_str()) {
                required.push(json!(param.name));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        schema.insert("required".to_string(), Value::Array(required));
        schema
    }
}

/// Methods registered under one namespace, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolNamespace {
    pub methods: Vec<ToolMethod>,
}

/// Dispatch entry: the operation plus the verb and path template it was found under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupEntry {
    #[serde(flatten)]
    pub operation: Operation,
    pub method: HttpVerb,
    pub path: String,
}

/// Immutable tool catalog derived from an `OpenAPI` document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCatalog {
    #[serde(skip)]
    namespace: String,
    tools: IndexMap<String, ToolNamespace>,
    #[serde(rename = "openApiLookup")]
    lookup: IndexMap<String, LookupEntry>,
}

impl ToolCatalog {
    /// Build the catalog for `document`, registering every method under `namespace`.
    ///
    /// Operations without an `operationId` are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateOperationId`] if two operations share an `operationId`.
    pub fn build(document: &OpenAPI, namespace: &str) -> Result<Self, CatalogError> {
        let mut methods: Vec<ToolMethod> = Vec::new();
        let mut lookup: IndexMap<String, LookupEntry> = IndexMap::new();
        let mut seen: HashMap<String, String> = HashMap::new();

        for (path, verb, operation) in operations(document) {
            let Some(method) = method_from_operation(&operation, verb, path) else {
                continue;
            };

            let location = format!("{verb} {path}");
            if let Some(first) = seen.insert(method.name.clone(), location.clone()) {
                return Err(CatalogError::DuplicateOperationId {
                    operation_id: method.name,
                    first,
                    second: location,
                });
            }

            lookup.insert(
                qualified_name(namespace, &method.name),
                LookupEntry {
                    operation,
                    method: verb,
                    path: path.to_string(),
                },
            );
            methods.push(method);
        }

        tracing::debug!(
            namespace = %namespace,
            methods = methods.len(),
            "built tool catalog"
        );

        let mut tools = IndexMap::new();
        tools.insert(namespace.to_string(), ToolNamespace { methods });

        Ok(Self {
            namespace: namespace.to_string(),
            tools,
            lookup,
        })
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Namespace → methods view.
    #[must_use]
    pub fn tools(&self) -> &IndexMap<String, ToolNamespace> {
        &self.tools
    }

    /// Qualified name → dispatch entry view.
    #[must_use]
    pub fn operation_lookup(&self) -> &IndexMap<String, LookupEntry> {
        &self.lookup
    }

    /// Resolve a qualified tool name.
    #[must_use]
    pub fn lookup(&self, qualified: &str) -> Option<&LookupEntry> {
        self.lookup.get(qualified)
    }

    /// Every method paired with its qualified name, namespace by namespace in document order.
    pub fn entries(&self) -> impl Iterator<Item = (String, &ToolMethod)> {
        self.tools.iter().flat_map(|(ns, def)| {
            def.methods
                .iter()
                .map(move |m| (qualified_name(ns, &m.name), m))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

/// Walk every `(path, verb, operation)` in the document, in document path order.
///
/// Path-level parameters are merged into each operation's list; an operation-level parameter
/// with the same location and name wins. Path items given as `$ref` are not resolved.
pub(crate) fn operations(document: &OpenAPI) -> Vec<(&str, HttpVerb, Operation)> {
    let mut out = Vec::new();
    for (path, item) in &document.paths.paths {
        let item = match item {
            ReferenceOr::Item(item) => item,
            ReferenceOr::Reference { reference } => {
                tracing::warn!(path = %path, reference = %reference, "skipping $ref path item");
                continue;
            }
        };

        for verb in HttpVerb::ALL {
            if let Some(op) = operation_for(item, verb) {
                let mut op = op.clone();
                op.parameters = merge_parameters(&item.parameters, &op.parameters);
                out.push((path.as_str(), verb, op));
            }
        }
    }
    out
}

fn operation_for(item: &PathItem, verb: HttpVerb) -> Option<&Operation> {
    match verb {
        HttpVerb::Get => item.get.as_ref(),
        HttpVerb::Post => item.post.as_ref(),
        HttpVerb::Put => item.put.as_ref(),
        HttpVerb::Delete => item.delete.as_ref(),
        HttpVerb::Patch => item.patch.as_ref(),
    }
}

fn merge_parameters(
    path_level: &[ReferenceOr<Parameter>],
    operation_level: &[ReferenceOr<Parameter>],
) -> Vec<ReferenceOr<Parameter>> {
    fn key(p: &ReferenceOr<Parameter>) -> Option<(&'static str, &str)> {
        match p {
            ReferenceOr::Item(p) => {
                let (loc, data) = location_and_data(p);
                Some((loc, data.name.as_str()))
            }
            ReferenceOr::Reference { .. } => None,
        }
    }

    let mut merged: Vec<ReferenceOr<Parameter>> = path_level
        .iter()
        .filter(|p| {
            key(p).is_none_or(|k| !operation_level.iter().any(|o| key(o) == Some(k)))
        })
        .cloned()
        .collect();
    merged.extend(operation_level.iter().cloned());
    merged
}

/// Declared location (`path`, `query`, `header`, `cookie`) and shared data of a parameter.
#[must_use]
pub fn location_and_data(param: &Parameter) -> (&'static str, &ParameterData) {
    match param {
        Parameter::Path { parameter_data, .. } => ("path", parameter_data),
        Parameter::Query { parameter_data, .. } => ("query", parameter_data),
        Parameter::Header { parameter_data, .. } => ("header", parameter_data),
        Parameter::Cookie { parameter_data, .. } => ("cookie", parameter_data),
    }
}

/// Convert one operation into a tool method, or `None` if it has no `operationId`.
fn method_from_operation(operation: &Operation, verb: HttpVerb, path: &str) -> Option<ToolMethod> {
    let Some(operation_id) = operation.operation_id.as_deref().filter(|id| !id.is_empty()) else {
        tracing::warn!(method = %verb, path = %path, "Operation without operationId; skipping");
        return None;
    };

    let mut params: Vec<ToolParam> = Vec::new();

    for param in &operation.parameters {
        // `$ref` parameters are not resolved.
        let ReferenceOr::Item(param) = param else {
            continue;
        };
        let (_, data) = location_and_data(param);
        params.push(ToolParam {
            name: data.name.clone(),
            param_type: type_of_parameter_format(&data.format),
            description: data.description.clone().unwrap_or_default(),
            optional: !data.required,
        });
    }

    if let Some(ReferenceOr::Item(body)) = &operation.request_body {
        params.extend(body_params(body));
    }

    Some(ToolMethod {
        name: operation_id.to_string(),
        description: operation
            .summary
            .clone()
            .or_else(|| operation.description.clone())
            .unwrap_or_default(),
        params,
        returns: return_descriptor(&operation.responses),
    })
}

/// Flatten the top-level properties of an inline `application/json` object body.
fn body_params(body: &RequestBody) -> Vec<ToolParam> {
    let Some(ReferenceOr::Item(schema)) = body
        .content
        .get("application/json")
        .and_then(|media| media.schema.as_ref())
    else {
        return Vec::new();
    };

    let (properties, required) = match &schema.schema_kind {
        SchemaKind::Type(Type::Object(obj)) => (&obj.properties, &obj.required),
        SchemaKind::Any(any) if any.typ.as_deref() == Some("object") => {
            (&any.properties, &any.required)
        }
        _ => return Vec::new(),
    };

    properties
        .iter()
        .filter_map(|(name, prop)| {
            let ReferenceOr::Item(prop) = prop else {
                return None;
            };
            Some(ToolParam {
                name: name.clone(),
                param_type: kind_of(prop),
                description: prop.schema_data.description.clone().unwrap_or_default(),
                optional: !required.contains(name),
            })
        })
        .collect()
}

fn return_descriptor(responses: &Responses) -> Option<ReturnDescriptor> {
    let success = responses
        .responses
        .get(&StatusCode::Code(200))
        .or_else(|| responses.responses.get(&StatusCode::Code(201)))?;

    let ReferenceOr::Item(response) = success else {
        return None;
    };
    if response.content.is_empty() {
        return None;
    }

    let description = response.description.clone();
    let return_type = if let Some(media) = response.content.get("application/json") {
        type_of_opt(media.schema.as_ref())
    } else if response.content.keys().any(|k| is_image_media_type(k)) {
        SemanticType::Binary
    } else {
        SemanticType::Any
    };

    Some(ReturnDescriptor {
        return_type,
        description,
    })
}
