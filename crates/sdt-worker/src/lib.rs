//! Offline navigation cache: versioned cache generations, a worker lifecycle,
//! and cache-first fetch interception for one origin.

pub mod cache;
pub mod manifest;
pub mod registration;
pub mod worker;

pub use cache::CacheStorage;
pub use cache::MemoryCacheStorage;
pub use manifest::CacheManifest;
pub use manifest::DEFAULT_CACHE_VERSION;
pub use registration::Registration;
pub use registration::WorkerFetcher;
pub use worker::ServiceWorker;
pub use worker::WorkerState;
