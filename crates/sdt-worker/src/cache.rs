//! Named cache generations mapping request keys to stored responses.

use async_trait::async_trait;
use sdt_core::ShellResult;
use sdt_net::Response;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

/// Origin-scoped cache storage holding one map per cache name.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Creates the named cache if it does not exist yet.
    async fn open(&self, name: &str) -> ShellResult<()>;
    /// Names of every cache generation currently stored.
    async fn keys(&self) -> ShellResult<Vec<String>>;
    /// Deletes a whole generation. Returns whether it existed.
    async fn delete(&self, name: &str) -> ShellResult<bool>;
    async fn lookup(&self, name: &str, key: &str) -> ShellResult<Option<Response>>;
    /// Stores `response` under `key`, creating the cache when missing.
    async fn put(&self, name: &str, key: &str, response: Response) -> ShellResult<()>;
    async fn entry_keys(&self, name: &str) -> ShellResult<Vec<String>>;
}

type Generations = BTreeMap<String, BTreeMap<String, Response>>;

/// In-process cache storage. Clones share the same generations.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStorage {
    generations: Arc<Mutex<Generations>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str, key: &str) -> bool {
        self.with_generations(|generations| {
            generations
                .get(name)
                .is_some_and(|entries| entries.contains_key(key))
        })
    }

    pub fn entry_count(&self, name: &str) -> usize {
        self.with_generations(|generations| generations.get(name).map_or(0, BTreeMap::len))
    }

    fn with_generations<T>(&self, f: impl FnOnce(&mut Generations) -> T) -> T {
        match self.generations.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                f(&mut guard)
            }
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> ShellResult<()> {
        self.with_generations(|generations| {
            generations.entry(name.to_owned()).or_default();
        });
        Ok(())
    }

    async fn keys(&self) -> ShellResult<Vec<String>> {
        Ok(self.with_generations(|generations| generations.keys().cloned().collect()))
    }

    async fn delete(&self, name: &str) -> ShellResult<bool> {
        Ok(self.with_generations(|generations| generations.remove(name).is_some()))
    }

    async fn lookup(&self, name: &str, key: &str) -> ShellResult<Option<Response>> {
        Ok(self.with_generations(|generations| {
            generations
                .get(name)
                .and_then(|entries| entries.get(key))
                .cloned()
        }))
    }

    async fn put(&self, name: &str, key: &str, response: Response) -> ShellResult<()> {
        self.with_generations(|generations| {
            generations
                .entry(name.to_owned())
                .or_default()
                .insert(key.to_owned(), response);
        });
        Ok(())
    }

    async fn entry_keys(&self, name: &str) -> ShellResult<Vec<String>> {
        Ok(self.with_generations(|generations| {
            generations
                .get(name)
                .map(|entries| entries.keys().cloned().collect())
                .unwrap_or_default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::CacheStorage;
    use super::MemoryCacheStorage;
    use futures::executor::block_on;
    use sdt_net::Response;
    use sdt_net::StatusCode;

    #[test]
    fn generations_are_independent() {
        let storage = MemoryCacheStorage::new();
        let response = Response::synthetic(StatusCode::OK, "OK", "home");

        assert!(block_on(storage.put("v1", "https://a.test/", response.clone())).is_ok());
        assert!(block_on(storage.open("v2")).is_ok());

        assert!(storage.contains("v1", "https://a.test/"));
        assert!(!storage.contains("v2", "https://a.test/"));
        assert_eq!(block_on(storage.keys()), Ok(vec!["v1".to_owned(), "v2".to_owned()]));
    }

    #[test]
    fn delete_reports_existence() {
        let storage = MemoryCacheStorage::new();
        assert!(block_on(storage.open("v1")).is_ok());
        assert_eq!(block_on(storage.delete("v1")), Ok(true));
        assert_eq!(block_on(storage.delete("v1")), Ok(false));
        assert_eq!(block_on(storage.lookup("v1", "k")), Ok(None));
    }

    #[test]
    fn clones_share_state() {
        let storage = MemoryCacheStorage::new();
        let other = storage.clone();
        let response = Response::synthetic(StatusCode::OK, "OK", "");
        assert!(block_on(other.put("v1", "k", response)).is_ok());
        assert_eq!(storage.entry_count("v1"), 1);
    }
}
