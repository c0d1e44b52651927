//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the [`ToolRegistry`] into an MCP Streamable HTTP endpoint that
//! Claude, Cursor, and other MCP clients can connect to with the standard
//! JSON-RPC protocol. Every facade operation is exposed as an MCP tool;
//! per-call failures come back as tool error content carrying the same
//! `{error_kind, message}` envelope the REST surface uses. Schema
//! documents and reference libraries are also published as MCP resources
//! under `cdes://` URIs.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::{ErrorData as McpError, ServerHandler};

use crate::engine::Engine;
use crate::error::QueryError;
use crate::tools::{error_envelope, ToolContext, ToolRegistry};

const SCHEMA_RESOURCE_PREFIX: &str = "cdes://schemas/v1/";
const REFERENCE_RESOURCE_PREFIX: &str = "cdes://reference/";

/// Bridges the tool registry to the MCP protocol.
///
/// Each MCP session receives a clone (everything is behind `Arc`), so all
/// sessions share the same engine and tool set.
#[derive(Clone)]
pub struct CdesService {
    engine: Arc<Engine>,
    tools: Arc<ToolRegistry>,
}

impl CdesService {
    pub fn new(engine: Arc<Engine>, tools: Arc<ToolRegistry>) -> Self {
        Self { engine, tools }
    }

    /// Convert a facade tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::tools::Tool) -> Tool {
        let schema_value = tool.parameters_schema();
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> = match schema_value {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    /// Descriptor for one readable document (schema or reference library).
    fn to_mcp_resource(uri: String, name: &str, description: &str) -> Resource {
        Resource {
            raw: RawResource {
                uri,
                name: name.to_string(),
                title: None,
                description: if description.is_empty() {
                    None
                } else {
                    Some(description.to_string())
                },
                mime_type: Some("application/json".to_string()),
                size: None,
                icons: None,
                meta: None,
            },
            annotations: None,
        }
    }
}

/// Build the axum-mountable Streamable HTTP service for the bridge.
pub fn http_service(
    engine: Arc<Engine>,
    tools: Arc<ToolRegistry>,
) -> StreamableHttpService<CdesService, LocalSessionManager> {
    let service = CdesService::new(engine, tools);
    StreamableHttpService::new(
        move || Ok(service.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    )
}

impl ServerHandler for CdesService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "cdes-server".to_string(),
                title: Some("CDES Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some(
                    "Schema registry, validation, and reference-data search for the \
                     Cannabis Data Exchange Standard"
                        .to_string(),
                ),
                icons: None,
                website_url: Some("https://www.cdes.world".to_string()),
            },
            instructions: Some(
                "CDES schema and reference-data server. Use list_schemas and get_schema to \
                 discover CDES v1 schemas, validate_data to check a document against one, \
                 get_entity / list_entities / lookup_color for terpene and cannabinoid \
                 lookups, and search for free-text queries across all reference libraries. \
                 Schemas and reference libraries can also be read as resources under \
                 cdes://schemas/v1/{name} and cdes://reference/{name}."
                    .to_string(),
            ),
        }
    }

    // ── Tools ────────────────────────────────────────────────────────────

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.tools.find(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let ctx = ToolContext::new(self.engine.clone());
        match tool.execute(params, &ctx).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => {
                let body = serde_json::to_string_pretty(&error_envelope(&e)).unwrap_or_default();
                Ok(CallToolResult::error(vec![Content::text(body)]))
            }
        }
    }

    // ── Resources ────────────────────────────────────────────────────────

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let mut resources: Vec<Resource> = self
            .engine
            .registry
            .list()
            .iter()
            .map(|doc| {
                Self::to_mcp_resource(
                    format!("{SCHEMA_RESOURCE_PREFIX}{}", doc.name),
                    &doc.name,
                    &doc.description,
                )
            })
            .collect();
        resources.extend(self.engine.reference_sets().iter().map(|set| {
            Self::to_mcp_resource(
                format!("{REFERENCE_RESOURCE_PREFIX}{}", set.name),
                &set.name,
                &set.description,
            )
        }));
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    // Both namespaces are enumerated in full by `list_resources`.
    fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourceTemplatesResult, McpError>> + Send + '_
    {
        std::future::ready(Ok(ListResourceTemplatesResult::with_all_items(Vec::new())))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let body = if let Some(name) = request.uri.strip_prefix(SCHEMA_RESOURCE_PREFIX) {
            self.engine.registry.get(name).map(|doc| doc.raw.clone())
        } else if let Some(name) = request.uri.strip_prefix(REFERENCE_RESOURCE_PREFIX) {
            self.engine.reference_resource(name)
        } else {
            return Err(McpError::new(
                ErrorCode::INVALID_PARAMS,
                format!("unsupported resource URI: {}", request.uri),
                None,
            ));
        };

        match body {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value).unwrap_or_default();
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::TextResourceContents {
                        uri: request.uri,
                        mime_type: Some("application/json".to_string()),
                        text,
                        meta: None,
                    }],
                })
            }
            Err(e) => {
                let code = match &e {
                    QueryError::NotFound(_) => ErrorCode::RESOURCE_NOT_FOUND,
                    QueryError::InvalidInput(_) => ErrorCode::INVALID_PARAMS,
                };
                Err(McpError::new(code, e.to_string(), None))
            }
        }
    }
}
