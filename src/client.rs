//! Item router for the GLPI REST API.
//!
//! `GlpiClient` offers CRUD and search operations keyed by item name
//! (`"ticket"`, `"Computer"`, `"/Ticket/12/TicketFollowup"`, ...). It opens
//! the session on first use, maps names to REST paths through an
//! [`ItemMap`], and delegates the HTTP work to [`GlpiService`].
//!
//! Every operation returns `Result<serde_json::Value, GlpiError>`. Service
//! failures (session, transport, non-JSON answers) and malformed input both
//! come back as `Err`; nothing panics. GLPI's own error payloads such as
//! `["ERROR_ITEM_NOT_FOUND", "..."]` are JSON and come back as `Ok`.

use reqwest::Method;
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::error::GlpiError;
use crate::glpi_service::{GlpiService, RequestOptions};
use crate::models::{
    delete_envelope, engine_query, filter_records, input_envelope, item_id_from_data,
    parse_item_id, search_text_query, EngineCriterion, ItemMap, SearchQuery, SearchText,
};

/// Item name of the search options endpoint.
const SEARCH_OPTIONS_ITEM: &str = "listSearchOptions";

/// Item name of the search engine endpoint.
const SEARCH_ITEM: &str = "search";

/// Generic client for every GLPI item type.
///
/// Operations take `&mut self`: one client holds one session and serves one
/// call at a time. Share it behind a mutex if several tasks need it.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let mut glpi = GlpiClient::new(&config)?;
///
/// let ticket = glpi.get("ticket", Some("42"), true).await?;
/// let servers = glpi
///     .search("Computer", &json!({"criteria": [{"field": "name", "value": "srv"}]}), false)
///     .await?;
/// ```
pub struct GlpiClient {
    service: GlpiService,
    item_map: ItemMap,
}

impl GlpiClient {
    /// Creates a client with the default item map. No request is sent.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, GlpiError> {
        Ok(Self {
            service: GlpiService::new(config)?,
            item_map: ItemMap::new(),
        })
    }

    /// Replaces the item map.
    pub fn with_item_map(mut self, item_map: ItemMap) -> Self {
        self.item_map = item_map;
        self
    }

    /// The current item map, including names registered so far.
    pub fn item_map(&self) -> &ItemMap {
        &self.item_map
    }

    /// Lists the known items as `{"available_items": {...}}`.
    pub fn help_item(&self) -> Value {
        json!({ "available_items": self.item_map })
    }

    /// The underlying session/transport layer.
    pub fn service(&self) -> &GlpiService {
        &self.service
    }

    /// Returns true once a session has been opened.
    pub fn has_session(&self) -> bool {
        self.service.has_session()
    }

    /// Opens the session unless one is already held. Returns its token.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Session` or `GlpiError::Http` when the session
    /// cannot be opened.
    pub async fn ensure_session(&mut self) -> Result<String, GlpiError> {
        if !self.service.has_session() {
            tracing::debug!("No GLPI session yet, initializing");
        }
        self.service.session_token().await
    }

    /// Closes the session. The next operation opens a new one.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Http` when the server cannot be reached.
    pub async fn kill_session(&mut self) -> Result<(), GlpiError> {
        self.service.kill_session().await
    }

    /// Resolves an item name to its path, registering unknown names, and
    /// makes it the active item path.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Validation` for names with no usable segment.
    pub fn resolve_uri(&mut self, name: &str) -> Result<String, GlpiError> {
        let resolution = self.item_map.resolve_and_register(name)?;
        self.service.set_uri(resolution.path.as_str());
        Ok(resolution.path)
    }

    /// Creates an item from `data`, sent as `{"input": {...}}`.
    pub async fn create(&mut self, name: &str, data: &Map<String, Value>) -> Result<Value, GlpiError> {
        self.ensure_session().await?;
        let uri = self.resolve_uri(name)?;

        tracing::debug!(item = %name, fields = data.len(), "Creating item");

        let options = RequestOptions::new()
            .accept_json()
            .with_body(input_envelope(data));
        self.send(Method::POST, &uri, options).await
    }

    /// Lists items of a type.
    ///
    /// Without `search_text` the fixed range `0-5000` is requested; otherwise
    /// each filter becomes a `searchText[field]=value` parameter.
    pub async fn get_all(
        &mut self,
        name: &str,
        expand_dropdowns: bool,
        search_text: &[SearchText],
    ) -> Result<Value, GlpiError> {
        self.ensure_session().await?;
        let uri = self.resolve_uri(name)?;
        let path = format!("{}{}", uri, search_text_query(search_text));

        self.send(Method::GET, &path, expand_options(expand_dropdowns))
            .await
    }

    /// Fetches one item by id.
    ///
    /// With `id == None`, `name` itself is fetched as a path (e.g.
    /// `"getFullSession"`).
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Validation`, before any request, when `id` is not
    /// an integer.
    pub async fn get(
        &mut self,
        name: &str,
        id: Option<&str>,
        expand_dropdowns: bool,
    ) -> Result<Value, GlpiError> {
        let id = id.map(parse_item_id).transpose()?;

        self.ensure_session().await?;
        let uri = self.resolve_uri(name)?;

        match id {
            None => self.send(Method::GET, name, RequestOptions::new()).await,
            Some(id) => {
                let path = format!("{}/{}", uri, id);
                self.send(Method::GET, &path, expand_options(expand_dropdowns))
                    .await
            }
        }
    }

    /// Lists the search options of an item type.
    pub async fn search_options(&mut self, name: &str) -> Result<Value, GlpiError> {
        self.ensure_session().await?;
        let uri = self.resolve_uri(SEARCH_OPTIONS_ITEM)?;
        let path = format!("{}/{}", uri, name);

        self.send(Method::GET, &path, RequestOptions::new().accept_json())
            .await
    }

    /// Searches items of a type.
    ///
    /// `criteria` is either `{"criteria": [{"field": .., "value": ..}, ..]}`,
    /// which fetches every item and keeps those where any criterion's value
    /// appears (case-insensitively) in the named field, or
    /// `{"metacriteria": [..]}`, which is not supported and answers with an
    /// informational message.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Validation` when `criteria` has neither key.
    pub async fn search(
        &mut self,
        name: &str,
        criteria: &Value,
        expand_dropdowns: bool,
    ) -> Result<Value, GlpiError> {
        match SearchQuery::from_value(criteria)? {
            SearchQuery::Criteria(criteria) => {
                let data = self.get_all(name, expand_dropdowns, &[]).await?;
                match data {
                    Value::Array(records) => {
                        let kept = filter_records(&records, &criteria);
                        tracing::debug!(
                            item = %name,
                            total = records.len(),
                            kept = kept.len(),
                            "Filtered items"
                        );
                        Ok(Value::Array(kept))
                    }
                    // error payloads are handed back untouched
                    other => Ok(other),
                }
            }
            SearchQuery::MetaCriteria(_) => Ok(json!({ "message_info": "Not implemented yet" })),
        }
    }

    /// Runs a query through GLPI's search engine.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Lookup`, before any request, for a field without
    /// a search option id.
    pub async fn search_engine(
        &mut self,
        name: &str,
        criteria: &[EngineCriterion],
    ) -> Result<Value, GlpiError> {
        let query = engine_query(name, criteria)?;

        self.ensure_session().await?;
        let uri = self.resolve_uri(SEARCH_ITEM)?;
        let path = format!("{}/{}", uri, query);

        self.send(Method::GET, &path, RequestOptions::new().accept_json())
            .await
    }

    /// Updates the item identified by `data["id"]`.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Validation`, before any request, when `data` has
    /// no integer `id`.
    pub async fn update(&mut self, name: &str, data: &Map<String, Value>) -> Result<Value, GlpiError> {
        let id = item_id_from_data(data)?;

        self.ensure_session().await?;
        let uri = self.resolve_uri(name)?;
        let path = format!("{}/{}", uri, id);

        tracing::debug!(item = %name, id = id, "Updating item");

        let options = RequestOptions::new()
            .accept_json()
            .with_body(input_envelope(data));
        self.send(Method::PUT, &path, options).await
    }

    /// Deletes an item, purging it from the trash when `force_purge` is set.
    ///
    /// The request goes to the collection path with the id in the body.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Validation`, before any request, when `id` is not
    /// an integer.
    pub async fn delete(&mut self, name: &str, id: &str, force_purge: bool) -> Result<Value, GlpiError> {
        let id = parse_item_id(id)
            .map_err(|_| GlpiError::validation("Please define item_id to be deleted."))?;

        self.ensure_session().await?;
        let uri = self.resolve_uri(name)?;

        tracing::debug!(item = %name, id = id, force_purge = force_purge, "Deleting item");

        let options = RequestOptions::new().with_body(delete_envelope(id, force_purge));
        self.send(Method::DELETE, &uri, options).await
    }

    /// Removes every secret from a message.
    pub fn sanitize(&self, message: &str) -> String {
        self.service.sanitize(message)
    }

    async fn send(
        &mut self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, GlpiError> {
        let response = self.service.request(method, path, options).await?;
        if !response.is_success() {
            tracing::debug!(status = %response.status, path = %path, "GLPI answered with an error status");
        }
        response.json()
    }
}

fn expand_options(expand_dropdowns: bool) -> RequestOptions {
    if expand_dropdowns {
        RequestOptions::new().with_param("expand_dropdowns", true)
    } else {
        RequestOptions::new()
    }
}
