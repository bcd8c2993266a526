//! Mapping from logical item names to REST paths.
//!
//! The map is open: asking for a name it does not know registers a path for
//! it instead of failing. Resolution is split into a pure lookup
//! ([`ItemMap::resolve`]) and an explicit mutation ([`ItemMap::register`]).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::GlpiError;

/// Entries every new map starts with.
const DEFAULT_ITEMS: &[(&str, &str)] = &[
    ("ticket", "/Ticket"),
    ("knowbase", "/knowbaseitem"),
    ("listSearchOptions", "/listSearchOptions"),
    ("search", "/search"),
    ("user", "user"),
    ("getFullSession", "getFullSession"),
    ("getActiveProfile", "getActiveProfile"),
    ("getMyProfiles", "getMyProfiles"),
    ("location", "location"),
];

/// Item name to URI path mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ItemMap {
    entries: BTreeMap<String, String>,
}

/// Outcome of resolving a name against an [`ItemMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Name under which the path is (or will be) stored.
    pub name: String,
    /// REST path for the item.
    pub path: String,
    /// True when the name was unknown and must be registered.
    pub is_new: bool,
}

impl Default for ItemMap {
    fn default() -> Self {
        Self::from_entries(
            DEFAULT_ITEMS
                .iter()
                .map(|(name, path)| (name.to_string(), path.to_string())),
        )
    }
}

impl ItemMap {
    /// Creates the default map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map holding exactly the given entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Returns the path registered for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, path)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Works out which name and path `name` refers to without changing the map.
    ///
    /// - a known name resolves to its stored path;
    /// - an unknown `/path` resolves to its first segment as name, with the
    ///   input kept as path;
    /// - any other unknown name resolves to itself with a `/name` path.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Validation` when the name is empty or has no
    /// segment after the leading separator.
    pub fn resolve(&self, name: &str) -> Result<Resolution, GlpiError> {
        if let Some(path) = self.get(name) {
            return Ok(Resolution {
                name: name.to_string(),
                path: path.to_string(),
                is_new: false,
            });
        }

        let (canonical, path) = match name.strip_prefix('/') {
            Some(rest) => {
                let bare = rest.split('/').next().unwrap_or_default();
                (bare.to_string(), name.to_string())
            }
            None => (name.to_string(), format!("/{}", name)),
        };

        if canonical.is_empty() {
            return Err(GlpiError::validation(format!(
                "cannot derive an item name from {:?}",
                name
            )));
        }

        Ok(Resolution {
            name: canonical,
            path,
            is_new: true,
        })
    }

    /// Stores a resolution produced by [`resolve`](Self::resolve).
    pub fn register(&mut self, resolution: &Resolution) {
        if resolution.is_new {
            tracing::debug!(
                item = %resolution.name,
                path = %resolution.path,
                "Registering item path"
            );
            self.entries
                .insert(resolution.name.clone(), resolution.path.clone());
        }
    }

    /// Resolves `name` and registers it when new.
    pub fn resolve_and_register(&mut self, name: &str) -> Result<Resolution, GlpiError> {
        let resolution = self.resolve(name)?;
        self.register(&resolution);
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_is_seeded() {
        let map = ItemMap::new();
        assert_eq!(map.get("ticket"), Some("/Ticket"));
        assert_eq!(map.get("knowbase"), Some("/knowbaseitem"));
        assert_eq!(map.get("user"), Some("user"));
        assert_eq!(map.len(), 9);
    }

    #[test]
    fn test_resolve_known_name() {
        let map = ItemMap::new();
        let resolution = map.resolve("ticket").unwrap();
        assert_eq!(resolution.path, "/Ticket");
        assert!(!resolution.is_new);
    }

    #[test]
    fn test_resolve_bare_name_derives_path() {
        let map = ItemMap::new();
        let resolution = map.resolve("Computer").unwrap();
        assert_eq!(resolution.name, "Computer");
        assert_eq!(resolution.path, "/Computer");
        assert!(resolution.is_new);
        // resolve alone never changes the map
        assert_eq!(map.get("Computer"), None);
    }

    #[test]
    fn test_resolve_path_derives_name() {
        let mut map = ItemMap::new();
        let resolution = map.resolve_and_register("/customthing").unwrap();
        assert_eq!(resolution.name, "customthing");
        assert_eq!(resolution.path, "/customthing");
        assert_eq!(map.get("customthing"), Some("/customthing"));

        let again = map.resolve("customthing").unwrap();
        assert!(!again.is_new);
        assert_eq!(again.path, "/customthing");
    }

    #[test]
    fn test_resolve_nested_path_uses_first_segment() {
        let map = ItemMap::new();
        let resolution = map.resolve("/Ticket/12/TicketFollowup").unwrap();
        assert_eq!(resolution.name, "Ticket");
        assert_eq!(resolution.path, "/Ticket/12/TicketFollowup");
    }

    #[test]
    fn test_resolve_rejects_empty_names() {
        let map = ItemMap::new();
        assert!(map.resolve("").is_err());
        assert!(map.resolve("/").is_err());
    }

    #[test]
    fn test_custom_map_replaces_defaults() {
        let map = ItemMap::from_entries([("computer".to_string(), "/Computer".to_string())]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("ticket"), None);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let map = ItemMap::from_entries([("computer".to_string(), "/Computer".to_string())]);
        let value = serde_json::to_value(&map).unwrap();
        assert_eq!(value, serde_json::json!({"computer": "/Computer"}));
    }
}
