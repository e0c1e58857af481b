//! MCP server handler bound to one `OpenAPI` document.

use crate::error::{ProxyError, Result};
use openapi_mcp_tools::catalog::{ToolCatalog, ToolMethod};
use openapi_mcp_tools::config::ProxyConfig;
use openapi_mcp_tools::content::ToolContent;
use openapi_mcp_tools::error::SpecError;
use openapi_mcp_tools::executor::HttpExecutor;
use openapi_mcp_tools::loader::{load_document, resolve_base_url};
use openapiv3::OpenAPI;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ErrorData, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParams, ProtocolVersion, ResourceContents, ServerCapabilities,
    ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use std::sync::Arc;

/// Protocol adapter: lists the catalog as MCP tools and dispatches `tools/call` to the executor.
///
/// Cheap to clone; all state is immutable after construction and shared behind an `Arc`.
#[derive(Clone)]
pub struct McpProxy {
    inner: Arc<Inner>,
}

struct Inner {
    server_name: String,
    title: String,
    catalog: ToolCatalog,
    executor: HttpExecutor,
    tools: Vec<Tool>,
}

impl McpProxy {
    /// Build the proxy for an already-parsed document.
    ///
    /// # Errors
    ///
    /// Fails if no base URL can be resolved, if two operations share an `operationId`, or if the
    /// configured headers are invalid.
    pub fn new(document: &OpenAPI, config: &ProxyConfig) -> std::result::Result<Self, SpecError> {
        let base_url = resolve_base_url(document, config.base_url.as_deref(), &config.spec)?;
        let catalog = ToolCatalog::build(document, &config.namespace)?;
        let executor = HttpExecutor::new(document, &base_url, config)?;
        let tools = tool_entries(&catalog);

        tracing::info!(
            spec = %config.spec,
            base_url = %base_url,
            namespace = %catalog.namespace(),
            tools = tools.len(),
            "OpenAPI tools ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                server_name: config.server_name.clone(),
                title: document.info.title.clone(),
                catalog,
                executor,
                tools,
            }),
        })
    }

    /// Load the document named by `config.spec` and build the proxy.
    ///
    /// # Errors
    ///
    /// See [`load_document`] and [`McpProxy::new`].
    pub async fn load(config: &ProxyConfig) -> std::result::Result<Self, SpecError> {
        let client = reqwest::Client::new();
        let document = load_document(&config.spec, &client).await?;
        Self::new(&document, config)
    }

    #[must_use]
    pub fn tools(&self) -> &[Tool] {
        &self.inner.tools
    }

    #[must_use]
    pub fn catalog(&self) -> &ToolCatalog {
        &self.inner.catalog
    }

    /// Resolve `name` through the lookup, execute it, and shape the response.
    ///
    /// # Errors
    ///
    /// [`ProxyError::ToolNotFound`] for unknown names; executor failures otherwise.
    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> Result<ToolContent> {
        let entry = self
            .inner
            .catalog
            .lookup(name)
            .ok_or_else(|| ProxyError::ToolNotFound(name.to_string()))?;

        tracing::debug!(tool = %name, method = %entry.method, path = %entry.path, "tools/call");

        let response = self
            .inner
            .executor
            .execute(
                &entry.operation,
                entry.method,
                &entry.path,
                arguments.unwrap_or_default(),
            )
            .await?;

        Ok(ToolContent::from_response(&response))
    }

    /// [`McpProxy::call`], with failures rendered as an `isError` tool result.
    pub async fn call_tool_result(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> CallToolResult {
        match self.call(name, arguments).await {
            Ok(content) => CallToolResult {
                content: vec![content_block(name, content)],
                structured_content: None,
                is_error: Some(false),
                meta: None,
            },
            Err(e) => {
                tracing::error!(tool = %name, error = %e.message(), "tools/call failed");
                e.into_call_result()
            }
        }
    }
}

fn tool_entries(catalog: &ToolCatalog) -> Vec<Tool> {
    catalog
        .entries()
        .map(|(name, method)| tool_entry(catalog, name, method))
        .collect()
}

fn tool_entry(catalog: &ToolCatalog, name: String, method: &ToolMethod) -> Tool {
    let verb = catalog.lookup(&name).map(|e| e.method);
    let mut tool = Tool::new(
        name,
        method.description.clone(),
        Arc::new(method.input_schema()),
    );
    tool.annotations = verb.map(|v| v.annotations());
    tool
}

/// Opaque payloads travel as an embedded blob resource named after the tool.
fn content_block(tool: &str, content: ToolContent) -> Content {
    match content {
        ToolContent::Text { text } => Content::text(text),
        ToolContent::Image { data, mime_type } => Content::image(data, mime_type),
        ToolContent::Binary { data, mime_type } => {
            Content::resource(ResourceContents::BlobResourceContents {
                uri: format!("openapi-mcp://{tool}/response"),
                mime_type,
                blob: data,
                meta: None,
            })
        }
    }
}

impl ServerHandler for McpProxy {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: self.inner.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some(self.inner.title.clone()),
                ..Default::default()
            },
            instructions: Some(format!(
                "Tools for the '{}' HTTP API. Each tool is one API operation, named \
                 '<namespace>-<operationId>'.",
                self.inner.title
            )),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.inner.tools.clone(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        Ok(self.call_tool_result(&request.name, request.arguments).await)
    }
}
