//! Recently used and favorite tools, persisted as JSON path arrays.

use crate::registry::ToolEntry;
use crate::registry::ToolRegistry;
use log::warn;
use sdt_storage::KeyValueStore;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;

/// Default bound on the recents list.
pub const MAX_RECENT_TOOLS: usize = 5;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct PathList(Vec<String>);

/// Read-modify-write access to the recents and favorites keys.
///
/// Storage failures and corrupt values read as empty lists; writes that fail
/// are logged and dropped.
#[derive(Clone)]
pub struct ToolHistory {
    store: Arc<dyn KeyValueStore>,
    recent_key: String,
    favorites_key: String,
    max_recent: usize,
}

impl ToolHistory {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        recent_key: impl Into<String>,
        favorites_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            recent_key: recent_key.into(),
            favorites_key: favorites_key.into(),
            max_recent: MAX_RECENT_TOOLS,
        }
    }

    pub fn with_max_recent(mut self, max_recent: usize) -> Self {
        self.max_recent = max_recent;
        self
    }

    /// Most-recent-first list of tool paths.
    pub fn recent_tools(&self) -> Vec<String> {
        self.read(&self.recent_key)
    }

    /// Moves `path` to the front of the recents list, dropping the oldest entry
    /// past the bound.
    pub fn add_recent(&self, path: &str) -> Vec<String> {
        let mut recent = self.recent_tools();
        recent.retain(|existing| existing != path);
        recent.insert(0, path.to_owned());
        recent.truncate(self.max_recent);
        self.write(&self.recent_key, &recent);
        recent
    }

    pub fn favorite_tools(&self) -> Vec<String> {
        self.read(&self.favorites_key)
    }

    pub fn is_favorite(&self, path: &str) -> bool {
        self.favorite_tools().iter().any(|favorite| favorite == path)
    }

    /// Flips membership of `path` and returns the new membership.
    pub fn toggle_favorite(&self, path: &str) -> bool {
        let mut favorites = self.favorite_tools();
        let was_favorite = favorites.iter().any(|favorite| favorite == path);
        if was_favorite {
            favorites.retain(|favorite| favorite != path);
        } else {
            favorites.push(path.to_owned());
        }
        self.write(&self.favorites_key, &favorites);
        !was_favorite
    }

    /// Records a visit when `location_path` is a registered tool page.
    pub fn track_visit<'a>(
        &self,
        registry: &'a ToolRegistry,
        location_path: &str,
    ) -> Option<&'a ToolEntry> {
        let tool = registry.find_for_location(location_path)?;
        self.add_recent(&tool.path);
        Some(tool)
    }

    fn read(&self, key: &str) -> Vec<String> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(error) => {
                warn!("failed to read `{key}`: {error}");
                return Vec::new();
            }
        };
        serde_json::from_str::<PathList>(&raw)
            .map(|list| list.0)
            .unwrap_or_default()
    }

    fn write(&self, key: &str, paths: &[String]) {
        let encoded = match serde_json::to_string(&PathList(paths.to_vec())) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!("failed to encode `{key}`: {error}");
                return;
            }
        };
        if let Err(error) = self.store.set(key, &encoded) {
            warn!("failed to persist `{key}`: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MAX_RECENT_TOOLS;
    use super::ToolHistory;
    use crate::registry::ToolRegistry;
    use sdt_storage::KeyValueStore;
    use sdt_storage::MemoryStore;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn history() -> (ToolHistory, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            ToolHistory::new(store.clone(), "sdt_recent_tools", "sdt_favorite_tools"),
            store,
        )
    }

    #[test]
    fn recents_stay_bounded_unique_and_most_recent_first() {
        let (history, _store) = history();
        let visits = [
            "/a", "/b", "/c", "/a", "/d", "/e", "/f", "/b", "/g", "/g", "/c",
        ];

        for (count, path) in visits.iter().enumerate() {
            let recent = history.add_recent(path);
            let unique: BTreeSet<_> = recent.iter().collect();
            assert_eq!(unique.len(), recent.len());
            assert!(recent.len() <= MAX_RECENT_TOOLS);
            assert_eq!(recent.first().map(String::as_str), Some(*path));
            assert!(recent.len() <= count + 1);
        }

        assert_eq!(history.recent_tools(), vec!["/c", "/g", "/b", "/f", "/e"]);
    }

    #[test]
    fn recents_are_stored_as_json_arrays() {
        let (history, store) = history();
        history.add_recent("/json-formatter");
        history.add_recent("/uuid-generator");
        assert_eq!(
            store.get("sdt_recent_tools"),
            Ok(Some("[\"/uuid-generator\",\"/json-formatter\"]".to_owned()))
        );
    }

    #[test]
    fn corrupt_values_read_as_empty() {
        let (history, store) = history();
        assert!(store.set("sdt_recent_tools", "{not json").is_ok());
        assert!(store.set("sdt_favorite_tools", "{\"a\":1}").is_ok());
        assert!(history.recent_tools().is_empty());
        assert!(history.favorite_tools().is_empty());
        assert_eq!(history.add_recent("/a"), vec!["/a"]);
    }

    #[test]
    fn toggling_a_favorite_twice_restores_membership() {
        let (history, _store) = history();
        assert!(history.toggle_favorite("/regex-tester"));
        assert!(history.is_favorite("/regex-tester"));
        assert!(!history.toggle_favorite("/regex-tester"));
        assert!(!history.is_favorite("/regex-tester"));

        history.toggle_favorite("/jwt-decoder");
        let before = history.favorite_tools();
        history.toggle_favorite("/diff-checker");
        history.toggle_favorite("/diff-checker");
        assert_eq!(history.favorite_tools(), before);
    }

    #[test]
    fn only_tool_pages_are_tracked() {
        let (history, _store) = history();
        let registry = ToolRegistry::default();
        assert!(history.track_visit(&registry, "/json-formatter.html").is_some());
        assert!(history.track_visit(&registry, "/privacy-policy").is_none());
        assert_eq!(history.recent_tools(), vec!["/json-formatter"]);
    }
}
