//! Response → tool content shaping, driven by the response `content-type`.

use crate::executor::{HttpResponse, ResponseBody};
use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;

/// The single content block a tool call produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    /// Base64 image data.
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Base64 opaque payload.
    Binary {
        data: String,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

impl ToolContent {
    /// Shape a successful response.
    ///
    /// - no `content-type` → binary
    /// - contains `text` or `json` → text; non-string JSON bodies are serialized compactly
    /// - contains `image` → image
    /// - anything else → binary
    #[must_use]
    pub fn from_response(response: &HttpResponse) -> Self {
        let Some(content_type) = response.content_type() else {
            return ToolContent::Binary {
                data: encode(&response.body),
                mime_type: None,
            };
        };
        let lowered = content_type.to_ascii_lowercase();

        if lowered.contains("text") || lowered.contains("json") {
            return ToolContent::Text {
                text: body_text(&response.body),
            };
        }

        if lowered.contains("image") {
            return ToolContent::Image {
                data: encode(&response.body),
                mime_type: content_type.into_owned(),
            };
        }

        ToolContent::Binary {
            data: encode(&response.body),
            mime_type: Some(content_type.into_owned()),
        }
    }

    /// `text`, `image` or `binary`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ToolContent::Text { .. } => "text",
            ToolContent::Image { .. } => "image",
            ToolContent::Binary { .. } => "binary",
        }
    }
}

fn body_text(body: &ResponseBody) -> String {
    match body {
        ResponseBody::Json(Value::String(s)) => s.clone(),
        ResponseBody::Json(v) => v.to_string(),
        ResponseBody::Text(s) => s.clone(),
        ResponseBody::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

fn encode(body: &ResponseBody) -> String {
    base64::engine::general_purpose::STANDARD.encode(body.to_bytes())
}
