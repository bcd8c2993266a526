//! Data models for the GLPI REST API.
//!
//! This module contains the item name mapping, request payload envelopes,
//! search criteria with their query builders, and response helpers.

mod item_map;
mod payload;
mod response;
mod search;

pub use item_map::*;
pub use payload::*;
pub use response::*;
pub use search::*;
