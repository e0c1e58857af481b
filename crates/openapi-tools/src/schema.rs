//! Schema normalization.
//!
//! Tool parameters only need a coarse type tag, so `OpenAPI` schemas are collapsed into
//! [`SemanticType`]. References are never dereferenced: any `$ref` node is `any`.

use mime::Mime;
use openapiv3::{ParameterSchemaOrContent, ReferenceOr, Schema, SchemaKind, Type};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::borrow::Borrow;
use std::fmt;

/// Coarse semantic type of a parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Binary,
    Any,
}

impl SemanticType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticType::String => "string",
            SemanticType::Number => "number",
            SemanticType::Boolean => "boolean",
            SemanticType::Array => "array",
            SemanticType::Object => "object",
            SemanticType::Binary => "binary",
            SemanticType::Any => "any",
        }
    }

    /// JSON Schema fragment for this type.
    ///
    /// `binary` and `any` are not JSON Schema types: `binary` becomes a binary-format string and
    /// `any` carries no `type` constraint.
    #[must_use]
    pub fn json_schema(self) -> Value {
        match self {
            SemanticType::Binary => json!({"type": "string", "format": "binary"}),
            SemanticType::Any => json!({}),
            other => json!({"type": other.as_str()}),
        }
    }

    fn from_type_name(name: &str) -> Self {
        match name {
            "integer" | "number" => SemanticType::Number,
            "string" => SemanticType::String,
            "boolean" => SemanticType::Boolean,
            "array" => SemanticType::Array,
            "object" => SemanticType::Object,
            _ => SemanticType::Any,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a schema node that may be a `$ref`.
#[must_use]
pub fn type_of<S: Borrow<Schema>>(schema: &ReferenceOr<S>) -> SemanticType {
    match schema {
        ReferenceOr::Reference { .. } => SemanticType::Any,
        ReferenceOr::Item(s) => kind_of(s.borrow()),
    }
}

/// Normalize an optional schema node; an absent schema is `any`.
#[must_use]
pub fn type_of_opt<S: Borrow<Schema>>(schema: Option<&ReferenceOr<S>>) -> SemanticType {
    schema.map_or(SemanticType::Any, type_of)
}

/// Normalize a parameter's `schema`/`content` slot. Content-described parameters are `any`.
#[must_use]
pub fn type_of_parameter_format(format: &ParameterSchemaOrContent) -> SemanticType {
    match format {
        ParameterSchemaOrContent::Schema(s) => type_of(s),
        ParameterSchemaOrContent::Content(_) => SemanticType::Any,
    }
}

/// Normalize an inline schema.
#[must_use]
pub fn kind_of(schema: &Schema) -> SemanticType {
    match &schema.schema_kind {
        SchemaKind::Type(Type::Integer(_) | Type::Number(_)) => SemanticType::Number,
        SchemaKind::Type(Type::String(_)) => SemanticType::String,
        SchemaKind::Type(Type::Boolean(_)) => SemanticType::Boolean,
        SchemaKind::Type(Type::Array(_)) => SemanticType::Array,
        SchemaKind::Type(Type::Object(_)) => SemanticType::Object,
        // Loosely-shaped schemas still carry their declared `type`, if any.
        SchemaKind::Any(any) => any
            .typ
            .as_deref()
            .map_or(SemanticType::Any, SemanticType::from_type_name),
        SchemaKind::OneOf { .. }
        | SchemaKind::AllOf { .. }
        | SchemaKind::AnyOf { .. }
        | SchemaKind::Not { .. } => SemanticType::Any,
    }
}

/// Whether a media type key (e.g. `image/png`) denotes an image.
#[must_use]
pub fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .parse::<Mime>()
        .is_ok_and(|m| m.type_() == mime::IMAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(yaml: &str) -> ReferenceOr<Schema> {
        serde_yaml::from_str(yaml).expect("valid schema")
    }

    #[test]
    fn integer_and_number_normalize_to_number() {
        assert_eq!(type_of(&schema("type: integer")), SemanticType::Number);
        assert_eq!(type_of(&schema("type: number\nformat: float")), SemanticType::Number);
    }

    #[test]
    fn scalar_and_container_types_keep_their_tag() {
        assert_eq!(type_of(&schema("type: string")), SemanticType::String);
        assert_eq!(type_of(&schema("type: boolean")), SemanticType::Boolean);
        assert_eq!(
            type_of(&schema("type: array\nitems:\n  type: string")),
            SemanticType::Array
        );
        assert_eq!(
            type_of(&schema("type: object\nproperties:\n  id:\n    type: integer")),
            SemanticType::Object
        );
    }

    #[test]
    fn references_are_never_dereferenced() {
        assert_eq!(
            type_of(&schema("$ref: '#/components/schemas/Pet'")),
            SemanticType::Any
        );
    }

    #[test]
    fn absent_or_untyped_schemas_are_any() {
        assert_eq!(type_of_opt::<Schema>(None), SemanticType::Any);
        assert_eq!(type_of(&schema("description: anything goes")), SemanticType::Any);
        assert_eq!(
            type_of(&schema("oneOf:\n  - type: string\n  - type: integer")),
            SemanticType::Any
        );
    }

    #[test]
    fn detects_image_media_types() {
        assert!(is_image_media_type("image/png"));
        assert!(is_image_media_type("image/jpeg"));
        assert!(is_image_media_type("image/svg+xml"));
        assert!(!is_image_media_type("application/json"));
        assert!(!is_image_media_type("not a media type"));
    }

    #[test]
    fn json_schema_rendering_is_json_schema_legal() {
        assert_eq!(SemanticType::Number.json_schema(), json!({"type": "number"}));
        assert_eq!(
            SemanticType::Binary.json_schema(),
            json!({"type": "string", "format": "binary"})
        );
        assert_eq!(SemanticType::Any.json_schema(), json!({}));
    }
}
