//! MCP tool implementations for the GLPI server.
//!
//! This module contains the input types for the MCP tools that expose
//! GLPI item operations.

mod inputs;

pub use inputs::*;
