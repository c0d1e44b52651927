//! Query facade: the operation catalogue exposed to every transport.
//!
//! Each operation is a [`Tool`]: a name, a description, a JSON Schema for
//! its parameters, and an execute function over the shared [`Engine`].
//! The same registry backs the HTTP routes, the MCP bridge, and the CLI,
//! so all three surfaces dispatch identically.
//!
//! Per-call failures never cross this boundary raw: callers go through
//! [`ToolRegistry::call`] and convert the typed [`QueryError`] with
//! [`error_envelope`], keeping `{error_kind, message}` stable everywhere.
//!
//! # Example
//!
//! ```rust
//! use cdes_server::tools::ToolRegistry;
//!
//! let tools = ToolRegistry::with_builtins();
//! assert!(tools.find("validate_data").is_some());
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::Engine;
use crate::error::QueryError;
use crate::models::Category;
use crate::validate::{json_type_name, validate};

/// One operation of the query facade.
///
/// Implementations are stateless; all data access goes through the
/// [`ToolContext`] handed to [`execute`](Tool::execute).
#[async_trait]
pub trait Tool: Send + Sync {
    /// Operation name, used as the route path (`POST /tools/{name}`) and
    /// the MCP tool name.
    fn name(&self) -> &str;

    /// One-line description for discovery.
    fn description(&self) -> &str;

    /// JSON Schema for the parameters object.
    fn parameters_schema(&self) -> Value;

    /// Run the operation. Failures are typed: the caller decides how to
    /// render them for its transport.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, QueryError>;
}

/// Execution context: a handle on the immutable engine.
pub struct ToolContext {
    engine: Arc<Engine>,
}

impl ToolContext {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

/// The structured error result the facade promises to every caller.
pub fn error_envelope(err: &QueryError) -> Value {
    json!({
        "error": {
            "error_kind": err.error_kind(),
            "message": err.to_string(),
        }
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter extraction
// ═══════════════════════════════════════════════════════════════════════

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, QueryError> {
    match params.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(QueryError::invalid_input(format!(
            "parameter '{key}' must be a string, got {}",
            json_type_name(other)
        ))),
        None => Err(QueryError::invalid_input(format!(
            "missing required parameter: {key}"
        ))),
    }
}

fn optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>, QueryError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(QueryError::invalid_input(format!(
            "parameter '{key}' must be a string, got {}",
            json_type_name(other)
        ))),
    }
}

fn category_param(params: &Value, key: &str) -> Result<Category, QueryError> {
    required_str(params, key)?
        .parse::<Category>()
        .map_err(QueryError::invalid_input)
}

const CATEGORY_VALUES: [&str; 3] = ["terpene", "cannabinoid", "color"];

// ═══════════════════════════════════════════════════════════════════════
// Built-in operations
// ═══════════════════════════════════════════════════════════════════════

/// `list_schemas` — ordered schema summaries.
pub struct ListSchemasTool;

#[async_trait]
impl Tool for ListSchemasTool {
    fn name(&self) -> &str {
        "list_schemas"
    }

    fn description(&self) -> &str {
        "List all available CDES v1 schemas with titles, descriptions, and required fields"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value, QueryError> {
        let summaries: Vec<Value> = ctx
            .engine()
            .registry
            .list()
            .iter()
            .map(|d| d.summary())
            .collect();
        Ok(Value::Array(summaries))
    }
}

/// `get_schema` — one full schema document.
pub struct GetSchemaTool;

#[async_trait]
impl Tool for GetSchemaTool {
    fn name(&self) -> &str {
        "get_schema"
    }

    fn description(&self) -> &str {
        "Get the full CDES v1 JSON schema by name (e.g. strain, coa, terpene-profile)"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Canonical schema name" }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, QueryError> {
        let name = required_str(&params, "name")?;
        let doc = ctx.engine().registry.get(name)?;
        Ok(doc.raw.clone())
    }
}

/// `validate_data` — schema validation; failures are data, not errors.
pub struct ValidateDataTool;

#[async_trait]
impl Tool for ValidateDataTool {
    fn name(&self) -> &str {
        "validate_data"
    }

    fn description(&self) -> &str {
        "Validate a data object against a CDES v1 schema"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "schema_name": { "type": "string", "description": "Schema to validate against" },
                "data": { "type": "object", "description": "The JSON object to validate" }
            },
            "required": ["schema_name", "data"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, QueryError> {
        let schema_name = required_str(&params, "schema_name")?;
        let data = params
            .get("data")
            .ok_or_else(|| QueryError::invalid_input("missing required parameter: data"))?;

        let result = validate(&ctx.engine().registry, schema_name, data)?;
        Ok(json!({
            "valid": result.is_valid,
            "schemaName": schema_name,
            "errorCount": result.violations.len(),
            "errors": result.violations,
        }))
    }
}

/// `get_entity` — full reference record by id or name.
pub struct GetEntityTool;

#[async_trait]
impl Tool for GetEntityTool {
    fn name(&self) -> &str {
        "get_entity"
    }

    fn description(&self) -> &str {
        "Look up a reference entity by id (e.g. 'terpene:myrcene') or case-insensitive name"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": { "type": "string", "enum": CATEGORY_VALUES },
                "id_or_name": { "type": "string", "description": "Entity id or name" }
            },
            "required": ["category", "id_or_name"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, QueryError> {
        let category = category_param(&params, "category")?;
        let key = required_str(&params, "id_or_name")?;
        let entity = ctx.engine().store.get(category, key)?;
        Ok(entity.detail())
    }
}

/// `lookup_color` — standardized display color for a terpene.
pub struct LookupColorTool;

#[async_trait]
impl Tool for LookupColorTool {
    fn name(&self) -> &str {
        "lookup_color"
    }

    fn description(&self) -> &str {
        "Get the standardized WCAG-compliant display color for a terpene"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "terpene": { "type": "string", "description": "Terpene key, id, or name" }
            },
            "required": ["terpene"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, QueryError> {
        let key = required_str(&params, "terpene")?;
        let entity = ctx.engine().store.get(Category::Color, key)?;
        Ok(entity.detail())
    }
}

/// `list_entities` — ordered entity summaries for one category.
pub struct ListEntitiesTool;

#[async_trait]
impl Tool for ListEntitiesTool {
    fn name(&self) -> &str {
        "list_entities"
    }

    fn description(&self) -> &str {
        "List all reference entities in a category, in load order"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": { "type": "string", "enum": CATEGORY_VALUES }
            },
            "required": ["category"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, QueryError> {
        let category = category_param(&params, "category")?;
        let summaries: Vec<Value> = ctx
            .engine()
            .store
            .list(category)
            .iter()
            .map(|e| e.summary())
            .collect();
        Ok(Value::Array(summaries))
    }
}

/// `search` — ranked free-text search over all reference data.
pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search across all CDES reference data (names, aromas, effects, descriptions)"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Free-text search term" },
                "category": { "type": "string", "enum": CATEGORY_VALUES }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value, QueryError> {
        let query = required_str(&params, "query")?;
        let category = optional_str(&params, "category")?
            .map(|s| s.parse::<Category>().map_err(QueryError::invalid_input))
            .transpose()?;

        let hits = ctx.engine().search(query, category);
        let results: Vec<Value> = hits
            .iter()
            .map(|hit| {
                let name = match ctx.engine().store.get(hit.category, &hit.entity_id) {
                    Ok(entity) => entity.display_name.clone(),
                    Err(_) => hit.entity_id.clone(),
                };
                json!({
                    "id": hit.entity_id,
                    "name": name,
                    "category": hit.category,
                    "score": hit.score,
                    "matchedFields": hit.matched_fields,
                })
            })
            .collect();

        Ok(json!({
            "query": query,
            "resultCount": results.len(),
            "results": results,
        }))
    }
}

/// `get_overview` — precomputed aggregate summary of the standard.
pub struct OverviewTool;

#[async_trait]
impl Tool for OverviewTool {
    fn name(&self) -> &str {
        "get_overview"
    }

    fn description(&self) -> &str {
        "Get a comprehensive overview of the Cannabis Data Exchange Standard"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value, QueryError> {
        Ok(ctx.engine().overview().clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Ordered collection of facade operations.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry pre-loaded with the full operation catalogue.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ListSchemasTool));
        registry.register(Box::new(GetSchemaTool));
        registry.register(Box::new(ValidateDataTool));
        registry.register(Box::new(GetEntityTool));
        registry.register(Box::new(LookupColorTool));
        registry.register(Box::new(ListEntitiesTool));
        registry.register(Box::new(SearchTool));
        registry.register(Box::new(OverviewTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Dispatch one call. Unknown operation names are a per-call
    /// NotFound, same as unknown schemas or entities.
    pub async fn call(
        &self,
        name: &str,
        params: Value,
        ctx: &ToolContext,
    ) -> Result<Value, QueryError> {
        let tool = self
            .find(name)
            .ok_or_else(|| QueryError::not_found(format!("unknown operation '{name}'")))?;
        tool.execute(params, ctx).await
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::models::{ReferenceEntity, SchemaDocument};
    use crate::registry::SchemaRegistry;
    use crate::store::ReferenceStore;

    fn test_ctx() -> ToolContext {
        let mut registry = SchemaRegistry::new();
        registry.insert(SchemaDocument {
            name: "strain".into(),
            title: "Strain".into(),
            description: "A cannabis strain record.".into(),
            schema_id: "https://schemas.terprint.com/cdes/v1/strain.json".into(),
            required_fields: vec!["name".into()],
            raw: json!({
                "title": "Strain",
                "type": "object",
                "required": ["name"],
                "properties": {"name": {"type": "string"}},
            }),
        });

        let mut store = ReferenceStore::new();
        let fields = json!({
            "id": "terpene:myrcene",
            "name": "Myrcene",
            "casNumber": "123-35-3",
            "aroma": ["earthy", "musky"],
        });
        let Value::Object(fields) = fields else {
            unreachable!()
        };
        store.insert(ReferenceEntity {
            id: "terpene:myrcene".into(),
            display_name: "Myrcene".into(),
            category: Category::Terpene,
            aliases: Vec::new(),
            fields,
        });
        let fields = json!({"terpene": "myrcene", "hex": "#7A6F4E", "rgb": "122,111,78"});
        let Value::Object(fields) = fields else {
            unreachable!()
        };
        store.insert(ReferenceEntity {
            id: "myrcene".into(),
            display_name: "myrcene".into(),
            category: Category::Color,
            aliases: vec!["terpene:myrcene".into()],
            fields,
        });

        let engine = Engine::new(
            registry,
            store,
            Vec::new(),
            SearchConfig::default(),
            "test".into(),
        );
        ToolContext::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn registry_carries_the_full_catalogue() {
        let tools = ToolRegistry::with_builtins();
        let names: Vec<&str> = tools.tools().iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "list_schemas",
                "get_schema",
                "validate_data",
                "get_entity",
                "lookup_color",
                "list_entities",
                "search",
                "get_overview",
            ]
        );
    }

    #[tokio::test]
    async fn dispatch_reaches_every_operation() {
        let ctx = test_ctx();
        let tools = ToolRegistry::with_builtins();

        let schemas = tools.call("list_schemas", json!({}), &ctx).await.unwrap();
        assert_eq!(schemas[0]["name"], "strain");

        let schema = tools
            .call("get_schema", json!({"name": "strain"}), &ctx)
            .await
            .unwrap();
        assert_eq!(schema["title"], "Strain");

        let verdict = tools
            .call(
                "validate_data",
                json!({"schema_name": "strain", "data": {"name": "OG Kush"}}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(verdict["valid"], true);
        assert_eq!(verdict["errorCount"], 0);

        let entity = tools
            .call(
                "get_entity",
                json!({"category": "terpene", "id_or_name": "Myrcene"}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(entity["casNumber"], "123-35-3");

        let color = tools
            .call("lookup_color", json!({"terpene": "terpene:myrcene"}), &ctx)
            .await
            .unwrap();
        assert_eq!(color["hex"], "#7A6F4E");

        let listed = tools
            .call("list_entities", json!({"category": "terpene"}), &ctx)
            .await
            .unwrap();
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let found = tools
            .call("search", json!({"query": "earthy"}), &ctx)
            .await
            .unwrap();
        assert_eq!(found["resultCount"], 1);
        assert_eq!(found["results"][0]["name"], "Myrcene");

        let overview = tools.call("get_overview", json!({}), &ctx).await.unwrap();
        assert_eq!(overview["specVersion"], "1.0.0");
    }

    #[tokio::test]
    async fn invalid_validation_reports_violations_not_errors() {
        let ctx = test_ctx();
        let tools = ToolRegistry::with_builtins();
        let verdict = tools
            .call(
                "validate_data",
                json!({"schema_name": "strain", "data": {}}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(verdict["valid"], false);
        assert_eq!(verdict["errors"][0]["path"], "name");
        assert_eq!(verdict["errors"][0]["expected"], "name");
    }

    #[tokio::test]
    async fn errors_map_to_stable_kinds() {
        let ctx = test_ctx();
        let tools = ToolRegistry::with_builtins();

        let err = tools
            .call("get_schema", json!({"name": "nope"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "not_found");

        let err = tools
            .call("get_schema", json!({"name": 7}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "invalid_input");

        let err = tools
            .call(
                "get_entity",
                json!({"category": "strain", "id_or_name": "x"}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "invalid_input");

        let err = tools
            .call(
                "validate_data",
                json!({"schema_name": "strain", "data": [1, 2]}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "invalid_input");

        let err = tools.call("no_such_tool", json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.error_kind(), "not_found");

        let envelope = error_envelope(&err);
        assert_eq!(envelope["error"]["error_kind"], "not_found");
        assert!(envelope["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("no_such_tool")));
    }

    #[tokio::test]
    async fn empty_search_query_is_empty_not_an_error() {
        let ctx = test_ctx();
        let tools = ToolRegistry::with_builtins();
        let found = tools
            .call("search", json!({"query": "   "}), &ctx)
            .await
            .unwrap();
        assert_eq!(found["resultCount"], 0);
        assert_eq!(found["results"], json!([]));
    }
}
