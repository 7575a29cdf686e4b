//! Client-side key-value storage with per-site partitions and a session fallback.

use sdt_core::ShellError;
use sdt_core::ShellResult;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// String key-value store with the semantics of a page's local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ShellResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ShellResult<()>;
    fn remove(&self, key: &str) -> ShellResult<()>;
}

/// Durable storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub partition_by_top_level_site: bool,
    pub ephemeral_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            partition_by_top_level_site: true,
            ephemeral_mode: false,
        }
    }
}

/// File-backed store holding one site's keys in a single partition file.
#[derive(Debug, Clone)]
pub struct PartitionStore {
    pub config: StorageConfig,
    site: String,
    persistent_root: Option<PathBuf>,
}

impl PartitionStore {
    pub fn new(config: StorageConfig, site: impl Into<String>) -> Self {
        Self {
            config,
            site: site.into(),
            persistent_root: None,
        }
    }

    pub fn with_persistent_root(mut self, root: PathBuf) -> Self {
        self.persistent_root = Some(root);
        self
    }

    pub fn persistent_root(&self) -> Option<&Path> {
        self.persistent_root.as_deref()
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    fn partition_path(&self) -> ShellResult<PathBuf> {
        if self.config.ephemeral_mode {
            return Err(ShellError::new(
                "storage.persistence_disabled",
                "persistent storage is disabled in ephemeral mode",
            ));
        }

        let root = self.persistent_root.as_ref().ok_or_else(|| {
            ShellError::new(
                "storage.persistence_unconfigured",
                "persistent storage root is not configured",
            )
        })?;

        let partition = if self.config.partition_by_top_level_site {
            sanitize_partition_name(&self.site)
        } else {
            "global".to_owned()
        };

        Ok(root.join("partitions").join(format!("{partition}.json")))
    }
}

impl KeyValueStore for PartitionStore {
    fn get(&self, key: &str) -> ShellResult<Option<String>> {
        let path = self.partition_path()?;
        let map = read_partition_map(&path)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ShellResult<()> {
        let path = self.partition_path()?;
        let mut map = read_partition_map(&path)?;
        map.insert(key.to_owned(), value.to_owned());
        write_partition_map(&path, &map)
    }

    fn remove(&self, key: &str) -> ShellResult<()> {
        let path = self.partition_path()?;
        let mut map = read_partition_map(&path)?;
        map.remove(key);

        if map.is_empty() {
            if path.exists() {
                fs::remove_file(&path).map_err(|error| {
                    ShellError::new(
                        "storage.partition_remove_failed",
                        format!(
                            "failed removing empty partition file `{}`: {error}",
                            path.display()
                        ),
                    )
                })?;
            }
            return Ok(());
        }

        write_partition_map(&path, &map)
    }
}

/// Volatile store; the backing map lives as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, apply: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> T {
        let mut guard = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        apply(&mut guard)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ShellResult<Option<String>> {
        Ok(self.with_entries(|entries| entries.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> ShellResult<()> {
        self.with_entries(|entries| entries.insert(key.to_owned(), value.to_owned()));
        Ok(())
    }

    fn remove(&self, key: &str) -> ShellResult<()> {
        self.with_entries(|entries| entries.remove(key));
        Ok(())
    }
}

/// Wraps a persistent store and degrades to in-memory storage for the rest of the
/// session after the first failure. Never returns an error.
pub struct SessionStore {
    primary: Box<dyn KeyValueStore>,
    session: MemoryStore,
    degraded: AtomicBool,
}

impl SessionStore {
    pub fn new(primary: Box<dyn KeyValueStore>) -> Self {
        Self {
            primary,
            session: MemoryStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn degrade(&self, error: &ShellError) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            log::warn!("storage unavailable, keeping preferences in memory for this session: {error}");
        }
    }
}

impl KeyValueStore for SessionStore {
    fn get(&self, key: &str) -> ShellResult<Option<String>> {
        if !self.is_degraded() {
            match self.primary.get(key) {
                Ok(value) => return Ok(value),
                Err(error) => self.degrade(&error),
            }
        }
        self.session.get(key)
    }

    fn set(&self, key: &str, value: &str) -> ShellResult<()> {
        if !self.is_degraded() {
            match self.primary.set(key, value) {
                Ok(()) => return Ok(()),
                Err(error) => self.degrade(&error),
            }
        }
        self.session.set(key, value)
    }

    fn remove(&self, key: &str) -> ShellResult<()> {
        if !self.is_degraded() {
            match self.primary.remove(key) {
                Ok(()) => return Ok(()),
                Err(error) => self.degrade(&error),
            }
        }
        self.session.remove(key)
    }
}

fn sanitize_partition_name(input: &str) -> String {
    let mut out = String::new();
    for ch in input.trim().to_ascii_lowercase().chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }

    if out.is_empty() {
        "unknown".to_owned()
    } else {
        out
    }
}

fn read_partition_map(path: &Path) -> ShellResult<BTreeMap<String, String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(error) => {
            return Err(ShellError::new(
                "storage.partition_read_failed",
                format!("failed to read partition file `{}`: {error}", path.display()),
            ));
        }
    };

    serde_json::from_str(&content).map_err(|error| {
        ShellError::new(
            "storage.partition_format_invalid",
            format!("partition file `{}` is not a JSON object of strings: {error}", path.display()),
        )
    })
}

/// Writes the whole partition next to its final path, then renames it over.
fn write_partition_map(path: &Path, map: &BTreeMap<String, String>) -> ShellResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            ShellError::new(
                "storage.partition_dir_create_failed",
                format!("failed to create partition directory `{}`: {error}", parent.display()),
            )
        })?;
    }

    let encoded = serde_json::to_string_pretty(map).map_err(|error| {
        ShellError::new(
            "storage.partition_encode_failed",
            format!("failed to encode partition: {error}"),
        )
    })?;

    let staged = path.with_extension("json.tmp");
    fs::write(&staged, encoded)
        .and_then(|()| fs::rename(&staged, path))
        .map_err(|error| {
            ShellError::new(
                "storage.partition_write_failed",
                format!("failed to write partition file `{}`: {error}", path.display()),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::KeyValueStore;
    use super::MemoryStore;
    use super::PartitionStore;
    use super::SessionStore;
    use super::StorageConfig;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_storage_root(label: &str) -> std::path::PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|value| value.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("sdt-storage-test-{label}-{stamp}"))
    }

    fn ephemeral_store() -> PartitionStore {
        let config = StorageConfig {
            partition_by_top_level_site: true,
            ephemeral_mode: true,
        };
        PartitionStore::new(config, "simpledevtools.tech")
            .with_persistent_root(temp_storage_root("ephemeral"))
    }

    #[test]
    fn partition_value_roundtrip() {
        let root = temp_storage_root("roundtrip");
        let store = PartitionStore::new(StorageConfig::default(), "simpledevtools.tech")
            .with_persistent_root(root.clone());

        assert!(store.set("theme", "dark").is_ok());
        assert_eq!(store.get("theme"), Ok(Some("dark".to_owned())));
        assert!(store.set("sdt_recent_tools", "[\"/json-formatter\"]").is_ok());
        assert_eq!(
            store.get("sdt_recent_tools"),
            Ok(Some("[\"/json-formatter\"]".to_owned()))
        );

        assert!(store.remove("theme").is_ok());
        assert_eq!(store.get("theme"), Ok(None));

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn removing_last_key_deletes_partition_file() {
        let root = temp_storage_root("cleanup");
        let store = PartitionStore::new(StorageConfig::default(), "Simple Dev/Tools")
            .with_persistent_root(root.clone());

        assert!(store.set("theme", "light").is_ok());
        let file = root.join("partitions").join("simple_dev_tools.json");
        assert!(file.exists());
        let stored = std::fs::read_to_string(&file).unwrap_or_default();
        assert!(stored.contains("\"theme\": \"light\""), "{stored}");

        assert!(store.remove("theme").is_ok());
        assert!(!file.exists());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn corrupt_partition_file_degrades_the_session_store() {
        let root = temp_storage_root("corrupt");
        let partitions = root.join("partitions");
        assert!(std::fs::create_dir_all(&partitions).is_ok());
        assert!(std::fs::write(partitions.join("simpledevtools.tech.json"), "theme=dark").is_ok());

        let partition = PartitionStore::new(StorageConfig::default(), "simpledevtools.tech")
            .with_persistent_root(root.clone());
        assert_eq!(
            partition.get("theme").map_err(|error| error.code),
            Err("storage.partition_format_invalid")
        );

        let store = SessionStore::new(Box::new(partition));
        assert_eq!(store.get("theme"), Ok(None));
        assert!(store.is_degraded());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn ephemeral_mode_blocks_persistence() {
        let wrote = ephemeral_store().set("k", "v");
        assert!(wrote.is_err());
        if let Err(error) = wrote {
            assert_eq!(error.code, "storage.persistence_disabled");
        }
    }

    #[test]
    fn session_store_degrades_to_memory() {
        let store = SessionStore::new(Box::new(ephemeral_store()));
        assert!(!store.is_degraded());

        assert!(store.set("theme", "dark").is_ok());
        assert!(store.is_degraded());
        assert_eq!(store.get("theme"), Ok(Some("dark".to_owned())));

        assert!(store.remove("theme").is_ok());
        assert_eq!(store.get("theme"), Ok(None));
    }

    #[test]
    fn session_store_passes_through_healthy_primary() {
        let store = SessionStore::new(Box::new(MemoryStore::new()));
        assert!(store.set("theme", "light").is_ok());
        assert_eq!(store.get("theme"), Ok(Some("light".to_owned())));
        assert!(!store.is_degraded());
    }
}
