//! Worker registration for one origin and the fetch adapter pages use.

use crate::cache::CacheStorage;
use crate::manifest::CacheManifest;
use crate::worker::ServiceWorker;
use crate::worker::WorkerState;
use async_trait::async_trait;
use log::info;
use log::warn;
use sdt_core::ShellResult;
use sdt_net::Fetcher;
use sdt_net::Request;
use sdt_net::Response;
use sdt_net::SiteUrl;
use std::sync::Arc;
use std::sync::Mutex;

/// Holds the active (and possibly a waiting) worker version for an origin.
pub struct Registration {
    origin: SiteUrl,
    caches: Arc<dyn CacheStorage>,
    network: Arc<dyn Fetcher>,
    active: Mutex<Option<Arc<ServiceWorker>>>,
    waiting: Mutex<Option<ServiceWorker>>,
}

impl Registration {
    pub fn new(origin: SiteUrl, caches: Arc<dyn CacheStorage>, network: Arc<dyn Fetcher>) -> Self {
        Self {
            origin,
            caches,
            network,
            active: Mutex::new(None),
            waiting: Mutex::new(None),
        }
    }

    pub fn origin(&self) -> &SiteUrl {
        &self.origin
    }

    pub fn network(&self) -> Arc<dyn Fetcher> {
        Arc::clone(&self.network)
    }

    pub fn active(&self) -> Option<Arc<ServiceWorker>> {
        lock(&self.active).clone()
    }

    pub fn active_version(&self) -> Option<String> {
        self.active().map(|worker| worker.version().to_owned())
    }

    pub fn waiting_version(&self) -> Option<String> {
        lock(&self.waiting)
            .as_ref()
            .map(|worker| worker.version().to_owned())
    }

    /// Installs `manifest` as a new worker version.
    ///
    /// Re-registering the active version is a no-op. A failed install leaves
    /// the previously active version serving. A version that skips waiting (or
    /// the first version for the origin) activates immediately; otherwise it
    /// waits for [`Registration::activate_waiting`].
    pub async fn register(&self, manifest: CacheManifest) -> ShellResult<WorkerState> {
        if self.active_version().as_deref() == Some(manifest.version.as_str()) {
            return Ok(WorkerState::Active);
        }

        let mut worker = ServiceWorker::new(
            self.origin.clone(),
            manifest,
            Arc::clone(&self.caches),
            Arc::clone(&self.network),
        );
        if let Err(error) = worker.install().await {
            match self.active_version() {
                Some(version) => warn!("keeping cache generation {version} after failed install"),
                None => warn!("no cache generation active after failed install"),
            }
            return Err(error);
        }

        if worker.skips_waiting() || self.active().is_none() {
            self.promote(worker).await?;
            return Ok(WorkerState::Active);
        }

        info!("cache generation {} installed and waiting", worker.version());
        let replaced = lock(&self.waiting).replace(worker);
        if let Some(mut previous) = replaced {
            previous.retire();
        }
        Ok(WorkerState::Waiting)
    }

    /// Activates the waiting version, if any. Returns whether one was promoted.
    pub async fn activate_waiting(&self) -> ShellResult<bool> {
        let waiting = lock(&self.waiting).take();
        let Some(worker) = waiting else {
            return Ok(false);
        };
        self.promote(worker).await?;
        Ok(true)
    }

    async fn promote(&self, mut worker: ServiceWorker) -> ShellResult<()> {
        worker.activate().await?;
        let previous = lock(&self.active).replace(Arc::new(worker));
        if let Some(previous) = previous {
            info!("cache generation {} superseded", previous.version());
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Routes page requests through the active worker, or straight to the network
/// while no version is active.
#[derive(Clone)]
pub struct WorkerFetcher {
    registration: Arc<Registration>,
}

impl WorkerFetcher {
    pub fn new(registration: Arc<Registration>) -> Self {
        Self { registration }
    }

    pub fn registration(&self) -> &Arc<Registration> {
        &self.registration
    }
}

#[async_trait]
impl Fetcher for WorkerFetcher {
    async fn fetch(&self, request: &Request) -> ShellResult<Response> {
        match self.registration.active() {
            Some(worker) => Ok(worker.handle_fetch(request).await),
            None => self.registration.network.fetch(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Registration;
    use super::WorkerFetcher;
    use crate::cache::MemoryCacheStorage;
    use crate::manifest::CacheManifest;
    use crate::worker::WorkerState;
    use futures::executor::block_on;
    use sdt_net::Fetcher;
    use sdt_net::MemoryFetcher;
    use sdt_net::Request;
    use sdt_net::SiteUrl;
    use sdt_net::StatusCode;
    use std::sync::Arc;

    fn url(input: &str) -> SiteUrl {
        match SiteUrl::parse(input) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    fn setup() -> (Arc<Registration>, MemoryCacheStorage, Arc<MemoryFetcher>) {
        let origin = url("https://simpledevtools.tech/");
        let network = Arc::new(MemoryFetcher::new(origin.clone()));
        for path in ["/", "/index.html", "/tools.html"] {
            assert!(network.insert(path, path).is_ok());
        }
        let caches = MemoryCacheStorage::new();
        let registration = Arc::new(Registration::new(
            origin,
            Arc::new(caches.clone()),
            network.clone(),
        ));
        (registration, caches, network)
    }

    fn manifest(version: &str) -> CacheManifest {
        CacheManifest::new(version).with_assets(["/", "/index.html"])
    }

    #[test]
    fn first_registration_activates() {
        let (registration, caches, _network) = setup();
        let state = block_on(registration.register(manifest("v1")));
        assert_eq!(state, Ok(WorkerState::Active));
        assert_eq!(registration.active_version().as_deref(), Some("v1"));
        assert_eq!(caches.entry_count("v1"), 2);
    }

    #[test]
    fn failed_install_keeps_previous_version() {
        let (registration, caches, _network) = setup();
        assert!(block_on(registration.register(manifest("v1"))).is_ok());

        let broken = CacheManifest::new("v2").with_assets(["/", "/gone.html"]);
        assert!(block_on(registration.register(broken)).is_err());
        assert_eq!(registration.active_version().as_deref(), Some("v1"));
        assert_eq!(caches.entry_count("v1"), 2);
        assert_eq!(caches.entry_count("v2"), 0);
    }

    #[test]
    fn new_version_replaces_old_generation() {
        let (registration, caches, _network) = setup();
        assert!(block_on(registration.register(manifest("v1"))).is_ok());
        assert!(block_on(registration.register(manifest("v2"))).is_ok());

        assert_eq!(registration.active_version().as_deref(), Some("v2"));
        assert_eq!(caches.entry_count("v1"), 0);
    }

    #[test]
    fn version_without_skip_waiting_waits_for_promotion() {
        let (registration, _caches, _network) = setup();
        assert!(block_on(registration.register(manifest("v1"))).is_ok());

        let state = block_on(registration.register(manifest("v2").with_skip_waiting(false)));
        assert_eq!(state, Ok(WorkerState::Waiting));
        assert_eq!(registration.active_version().as_deref(), Some("v1"));
        assert_eq!(registration.waiting_version().as_deref(), Some("v2"));

        assert_eq!(block_on(registration.activate_waiting()), Ok(true));
        assert_eq!(registration.active_version().as_deref(), Some("v2"));
        assert_eq!(block_on(registration.activate_waiting()), Ok(false));
    }

    #[test]
    fn reregistering_active_version_is_a_noop() {
        let (registration, _caches, network) = setup();
        assert!(block_on(registration.register(manifest("v1"))).is_ok());
        let before = network.request_count();
        assert_eq!(block_on(registration.register(manifest("v1"))), Ok(WorkerState::Active));
        assert_eq!(network.request_count(), before);
    }

    #[test]
    fn worker_fetcher_goes_direct_until_a_version_is_active() {
        let (registration, _caches, network) = setup();
        let fetcher = WorkerFetcher::new(Arc::clone(&registration));
        let request = Request::get(url("https://simpledevtools.tech/index.html"));

        assert!(block_on(fetcher.fetch(&request)).is_ok());
        assert_eq!(network.requests_for("/index.html"), 1);

        assert!(block_on(registration.register(manifest("v1"))).is_ok());
        let installs = network.requests_for("/index.html");
        network.set_offline(true);

        let response = block_on(fetcher.fetch(&request));
        assert_eq!(response.map(|value| value.status), Ok(StatusCode::OK));
        assert_eq!(network.requests_for("/index.html"), installs);
    }
}
