//! MCP server exposing GLPI item operations as tools.
//!
//! `GlpiServer` implements the MCP `ServerHandler` trait. Each tool locks
//! the shared [`GlpiClient`], runs one router operation and returns the JSON
//! answer as text.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::client::GlpiClient;
use crate::error::GlpiError;
use crate::models::parse_item_id;
use crate::tools::{
    CreateItemInput, DeleteItemInput, GetItemInput, ListItemsInput, SearchEngineInput,
    SearchItemsInput, SearchOptionsInput, UpdateItemInput,
};

/// Maximum length of a tool answer before truncation.
const MAX_OUTPUT_LENGTH: usize = 60_000;

/// The GLPI MCP server.
#[derive(Clone)]
pub struct GlpiServer {
    /// Router shared by all tool calls; one call runs at a time.
    client: Arc<Mutex<GlpiClient>>,
    /// Tool router for MCP tool dispatch.
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GlpiServer {
    /// Creates a new server around a client.
    pub fn new(client: GlpiClient) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            tool_router: Self::tool_router(),
        }
    }

    /// Handle to the shared client, e.g. to close the session on shutdown.
    pub fn client(&self) -> Arc<Mutex<GlpiClient>> {
        Arc::clone(&self.client)
    }

    /// A simple ping tool to verify the server is running.
    #[tool(description = "Test connectivity to the GLPI MCP server. Returns 'pong' if the server is running correctly.")]
    fn ping(&self) -> String {
        tracing::debug!("ping tool called");
        "pong".to_string()
    }

    /// Lists known item types and their REST paths.
    #[tool(description = "List the item types this server knows and their REST paths. Other GLPI item types (e.g. 'Computer', 'Printer') can be used as well.")]
    async fn list_item_types(&self) -> Result<String, String> {
        tracing::debug!("list_item_types tool called");
        let client = self.client.lock().await;
        Ok(format_result(&client.help_item()))
    }

    /// Fetches one item by ID.
    #[tool(description = "Get one GLPI item by type and numeric ID. Without an ID the item type path itself is fetched (e.g. 'getFullSession', 'getMyProfiles').")]
    async fn get_item(
        &self,
        Parameters(input): Parameters<GetItemInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(item_type = %input.item_type, id = ?input.id, "get_item tool called");

        let mut client = self.client.lock().await;
        let value = client
            .get(
                &input.item_type,
                input.id.as_deref(),
                input.expand_dropdowns.unwrap_or(false),
            )
            .await
            .map_err(|e| tool_error(&client, "get item", &e))?;

        Ok(format_result(&value))
    }

    /// Lists items of a type.
    #[tool(description = "List GLPI items of a type (first 5000). Optional search_text filters are applied by the server.")]
    async fn list_items(
        &self,
        Parameters(input): Parameters<ListItemsInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(item_type = %input.item_type, "list_items tool called");

        let filters = input.filters();
        let mut client = self.client.lock().await;
        let value = client
            .get_all(
                &input.item_type,
                input.expand_dropdowns.unwrap_or(false),
                &filters,
            )
            .await
            .map_err(|e| tool_error(&client, "list items", &e))?;

        Ok(format_result(&value))
    }

    /// Filters items of a type by field substrings.
    #[tool(description = "Search GLPI items of a type. Returns items where any criterion's value appears (case-insensitive) in the given field.")]
    async fn search_items(
        &self,
        Parameters(input): Parameters<SearchItemsInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(item_type = %input.item_type, criteria = input.criteria.len(), "search_items tool called");

        if input.criteria.is_empty() {
            return Err("At least one search criterion is required.".to_string());
        }

        let mut client = self.client.lock().await;
        let value = client
            .search(
                &input.item_type,
                &input.criteria_document(),
                input.expand_dropdowns.unwrap_or(false),
            )
            .await
            .map_err(|e| tool_error(&client, "search items", &e))?;

        Ok(format_result(&value))
    }

    /// Queries GLPI's search engine.
    #[tool(description = "Query the GLPI search engine. Supported fields: name, id, location, type, serialnumber, body, tags, processor, lastupdate, manufacturer, status, model, operatingsystem.")]
    async fn search_engine(
        &self,
        Parameters(input): Parameters<SearchEngineInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(item_type = %input.item_type, "search_engine tool called");

        let criteria = input.engine_criteria();
        let mut client = self.client.lock().await;
        let value = client
            .search_engine(&input.item_type, &criteria)
            .await
            .map_err(|e| tool_error(&client, "run search", &e))?;

        Ok(format_result(&value))
    }

    /// Lists the search options of an item type.
    #[tool(description = "List the search options (field ids and names) available for a GLPI item type.")]
    async fn list_search_options(
        &self,
        Parameters(input): Parameters<SearchOptionsInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(item_type = %input.item_type, "list_search_options tool called");

        let mut client = self.client.lock().await;
        let value = client
            .search_options(&input.item_type)
            .await
            .map_err(|e| tool_error(&client, "list search options", &e))?;

        Ok(format_result(&value))
    }

    // ========================================================================
    // Write tools
    // ========================================================================

    /// Creates an item.
    #[tool(description = "Create a GLPI item of the given type from a map of field values. Returns GLPI's answer with the new ID.")]
    async fn create_item(
        &self,
        Parameters(input): Parameters<CreateItemInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(item_type = %input.item_type, "create_item tool called");

        if input.fields.is_empty() {
            return Err("At least one field is required to create an item.".to_string());
        }

        let mut client = self.client.lock().await;
        let value = client
            .create(&input.item_type, &input.fields)
            .await
            .map_err(|e| tool_error(&client, "create item", &e))?;

        Ok(format_result(&value))
    }

    /// Updates an item.
    #[tool(description = "Update fields of an existing GLPI item. Item type and numeric ID are required.")]
    async fn update_item(
        &self,
        Parameters(input): Parameters<UpdateItemInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(item_type = %input.item_type, id = %input.id, "update_item tool called");

        if !input.has_updates() {
            return Err("At least one field must be provided for update.".to_string());
        }

        let id = parse_item_id(&input.id).map_err(|e| e.to_string())?;
        let mut fields = input.fields.clone();
        fields.insert("id".to_string(), Value::from(id));

        let mut client = self.client.lock().await;
        let value = client
            .update(&input.item_type, &fields)
            .await
            .map_err(|e| tool_error(&client, "update item", &e))?;

        Ok(format_result(&value))
    }

    /// Deletes an item.
    #[tool(description = "Delete a GLPI item. Set force_purge to delete permanently instead of moving it to the trash.")]
    async fn delete_item(
        &self,
        Parameters(input): Parameters<DeleteItemInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(item_type = %input.item_type, id = %input.id, "delete_item tool called");

        let mut client = self.client.lock().await;
        let value = client
            .delete(
                &input.item_type,
                &input.id,
                input.force_purge.unwrap_or(false),
            )
            .await
            .map_err(|e| tool_error(&client, "delete item", &e))?;

        Ok(format_result(&value))
    }
}

#[tool_handler]
impl ServerHandler for GlpiServer {
    /// Returns server information for the MCP initialize handshake.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "This server provides access to a GLPI service desk. \
                 Use list_item_types to see known item types, list_items or \
                 search_items to find items, get_item for details, and \
                 search_engine for GLPI search engine queries. Create, modify \
                 and delete items with create_item, update_item and delete_item. \
                 Start with 'ping' to verify connectivity."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Logs a failed tool call and builds the message returned to the caller.
fn tool_error(client: &GlpiClient, action: &str, error: &GlpiError) -> String {
    let sanitized = client.sanitize(&error.to_string());
    tracing::error!(error = %sanitized, action = action, "GLPI tool call failed");
    format!("Failed to {}: {}", action, sanitized)
}

/// Pretty-prints a JSON answer, truncated to a size an assistant can take in.
fn format_result(value: &Value) -> String {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    truncate_text(&text, MAX_OUTPUT_LENGTH)
}

/// Truncates a string if it exceeds the maximum length.
///
/// If truncated, appends "... [truncated]" to indicate the content was cut.
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.len() <= max_length {
        return text.to_string();
    }

    let mut end = max_length.saturating_sub(15); // Leave room for "... [truncated]"
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    if let Some(newline_pos) = text[..end].rfind('\n') {
        end = newline_pos;
    }
    format!("{}... [truncated]", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn test_client() -> GlpiClient {
        let config = Config::builder()
            .base_url("https://glpi.test.example.com/apirest.php")
            .app_token("app_token_12345")
            .user_token("user_token_67890")
            .build_with_bundle(None)
            .expect("valid test config");
        GlpiClient::new(&config).expect("Failed to create test client")
    }

    #[test]
    fn test_server_creation() {
        let server = GlpiServer::new(test_client());
        let info = server.get_info();
        assert!(info.instructions.is_some());
    }

    #[test]
    fn test_server_info_has_tools_capability() {
        let server = GlpiServer::new(test_client());
        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_ping_tool_returns_pong() {
        let server = GlpiServer::new(test_client());
        assert_eq!(server.ping(), "pong");
    }

    #[tokio::test]
    async fn test_list_item_types() {
        let server = GlpiServer::new(test_client());
        let output = server.list_item_types().await.unwrap();
        assert!(output.contains("\"ticket\": \"/Ticket\""));
    }

    #[tokio::test]
    async fn test_get_item_rejects_non_numeric_id() {
        let server = GlpiServer::new(test_client());
        let input = GetItemInput {
            item_type: "ticket".to_string(),
            id: Some("abc".to_string()),
            expand_dropdowns: None,
        };
        let err = server.get_item(Parameters(input)).await.unwrap_err();
        assert!(err.starts_with("Failed to get item"));
        assert!(err.contains("integer"));
        assert!(!server.client().lock().await.has_session());
    }

    #[tokio::test]
    async fn test_update_item_requires_fields() {
        let server = GlpiServer::new(test_client());
        let input = UpdateItemInput {
            item_type: "ticket".to_string(),
            id: "4".to_string(),
            fields: serde_json::Map::new(),
        };
        let err = server.update_item(Parameters(input)).await.unwrap_err();
        assert!(err.contains("At least one field"));
    }

    #[test]
    fn test_tool_error_is_sanitized() {
        let client = test_client();
        let err = GlpiError::session("rejected app_token_12345 / user_token_67890");
        let message = tool_error(&client, "get item", &err);
        assert!(!message.contains("app_token_12345"));
        assert!(!message.contains("user_token_67890"));
        assert!(message.contains("[REDACTED]"));
    }

    #[test]
    fn test_format_result_pretty_prints() {
        let output = format_result(&json!({"id": 1, "name": "x"}));
        assert!(output.contains("\n"));
        assert!(output.contains("\"name\": \"x\""));
    }

    #[test]
    fn test_truncate_text_short_text() {
        assert_eq!(truncate_text("Short text", 100), "Short text");
    }

    #[test]
    fn test_truncate_text_long_text() {
        let text = "line of text\n".repeat(500);
        let result = truncate_text(&text, 100);
        assert!(result.len() <= 100);
        assert!(result.ends_with("... [truncated]"));
    }

    #[test]
    fn test_truncate_text_multibyte() {
        let text = "æøå".repeat(100);
        let result = truncate_text(&text, 50);
        assert!(result.ends_with("... [truncated]"));
    }
}
