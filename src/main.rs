//! glpi-mcp - MCP server for GLPI
//!
//! This binary runs as an MCP server using stdio transport, giving MCP
//! clients access to a GLPI instance.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `GLPI_URL`: API root of the GLPI instance
//! - `GLPI_APP_TOKEN`: application token
//! - `GLPI_USER_TOKEN`, or `GLPI_USERNAME` and `GLPI_PASSWORD`
//!
//! # Usage
//!
//! ```bash
//! GLPI_URL=https://glpi.example.com/apirest.php GLPI_APP_TOKEN=xxx GLPI_USER_TOKEN=yyy ./glpi-mcp
//! ```

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{fmt, EnvFilter};

use glpi_sdk::{client, config, server};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout is reserved for MCP JSON-RPC messages
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("glpi_mcp=info,glpi_sdk=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting GLPI MCP server v{}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::from_env().context("Failed to load configuration")?;

    tracing::debug!(
        base_url = %config.base_url,
        auth = ?config.auth,
        writable = config.writable,
        "Configuration loaded"
    );

    let mut glpi = client::GlpiClient::new(&config).context("Failed to create GLPI client")?;

    tracing::info!("Opening GLPI session...");
    if let Err(e) = glpi.ensure_session().await {
        tracing::error!(error = %glpi.sanitize(&e.to_string()), "Session test failed");
        // Tools retry the session on every call
        tracing::warn!(
            "Server will start but may not be able to reach GLPI. \
             Check configuration and network connectivity."
        );
    }

    let server = server::GlpiServer::new(glpi);
    let shared = server.client();

    tracing::info!("Server initialized, starting stdio transport");

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })
        .context("Failed to start server")?;

    tracing::info!("Server running, waiting for requests");

    service
        .waiting()
        .await
        .context("Server error during operation")?;

    tracing::info!("Server shutting down");

    let mut glpi = shared.lock().await;
    if glpi.has_session() {
        if let Err(e) = glpi.kill_session().await {
            tracing::warn!(error = %glpi.sanitize(&e.to_string()), "Failed to close GLPI session");
        }
    }

    Ok(())
}
