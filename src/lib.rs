//! # glpi-sdk
//!
//! A client for the GLPI REST API, plus an MCP (Model Context Protocol)
//! server that exposes GLPI items as tools.
//!
//! ## Features
//!
//! - **Sessions**: `initSession` on first use, with user-token or basic
//!   authentication, and `killSession` on demand
//! - **Items**: create, fetch, list, update and delete any GLPI item type by name
//! - **Search**: client-side substring filtering and GLPI search engine queries
//! - **Diagnostics**: HTML error pages are reduced to their readable text
//! - **Security**: tokens and passwords are never logged or exposed in error messages
//!
//! ## Architecture
//!
//! - [`config`] - Configuration from the builder, environment variables or a
//!   VCAP_SERVICES credential bundle
//! - [`error`] - Error type with message sanitization
//! - [`glpi_service`] - Session handling and HTTP transport
//! - [`client`] - Item router with the CRUD and search operations
//! - [`models`] - Item map, payload envelopes, search queries and raw responses
//! - [`server`] - MCP server implementation with tool routing
//! - [`tools`] - Tool input parameter structs
//!
//! ## Configuration
//!
//! [`Config::from_env`](config::Config::from_env) reads:
//!
//! - `GLPI_URL`: API root, e.g. `https://glpi.example.com/apirest.php`
//! - `GLPI_APP_TOKEN`: application token
//! - `GLPI_USER_TOKEN`, or `GLPI_USERNAME` and `GLPI_PASSWORD`
//!
//! Optional: `GLPI_SESSION_WRITE`, `GLPI_SSL_VERIFY`, `GLPI_TIMEOUT_SECS`,
//! `GLPI_VCAP_SERVICE`.
//!
//! ## Example
//!
//! ```ignore
//! use glpi_sdk::client::GlpiClient;
//! use glpi_sdk::config::Config;
//! use serde_json::{json, Map, Value};
//!
//! async fn example() -> Result<(), glpi_sdk::error::GlpiError> {
//!     let config = Config::builder()
//!         .base_url("https://glpi.example.com/apirest.php")
//!         .app_token("app-token")
//!         .user_token("user-token")
//!         .writable(true)
//!         .build()?;
//!     let mut glpi = GlpiClient::new(&config)?;
//!
//!     let mut ticket = Map::new();
//!     ticket.insert("name".into(), json!("Printer down"));
//!     ticket.insert("content".into(), json!("Third floor printer is jammed"));
//!     let created = glpi.create("ticket", &ticket).await?;
//!
//!     let id = created["id"].to_string();
//!     let fetched = glpi.get("ticket", Some(&id), true).await?;
//!     println!("{}", fetched["name"]);
//!
//!     glpi.kill_session().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod glpi_service;
pub mod models;
pub mod server;
pub mod tools;
