//! Navigation cache worker: install, activate, and fetch interception.

use crate::cache::CacheStorage;
use crate::manifest::CacheManifest;
use log::debug;
use log::info;
use log::warn;
use sdt_core::ShellError;
use sdt_core::ShellResult;
use sdt_net::Fetcher;
use sdt_net::Method;
use sdt_net::Request;
use sdt_net::Response;
use sdt_net::ResponseType;
use sdt_net::SiteUrl;
use sdt_net::StatusCode;
use std::sync::Arc;

/// Lifecycle position of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    /// Installed, waiting for the previous version to release its clients.
    Waiting,
    Active,
    /// Failed install or superseded; never serves again.
    Redundant,
}

/// One version of the navigation cache, bound to a single origin.
pub struct ServiceWorker {
    origin: SiteUrl,
    manifest: CacheManifest,
    caches: Arc<dyn CacheStorage>,
    network: Arc<dyn Fetcher>,
    state: WorkerState,
    controls_clients: bool,
}

impl ServiceWorker {
    pub fn new(
        origin: SiteUrl,
        manifest: CacheManifest,
        caches: Arc<dyn CacheStorage>,
        network: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            origin,
            manifest,
            caches,
            network,
            state: WorkerState::Installing,
            controls_clients: false,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn origin(&self) -> &SiteUrl {
        &self.origin
    }

    pub fn skips_waiting(&self) -> bool {
        self.manifest.skip_waiting
    }

    /// True once activation has claimed every open page.
    pub fn controls_clients(&self) -> bool {
        self.controls_clients
    }

    /// Populates this version's cache with every manifest asset.
    ///
    /// Either all assets land in the cache or none do: a single failed fetch
    /// leaves no generation behind and marks the worker redundant.
    pub async fn install(&mut self) -> ShellResult<()> {
        self.require_state(WorkerState::Installing, "install")?;

        match self.populate().await {
            Ok(count) => {
                info!(
                    "installed cache generation {} with {count} assets",
                    self.manifest.version
                );
                self.state = WorkerState::Waiting;
                Ok(())
            }
            Err(error) => {
                if let Err(cleanup) = self.caches.delete(&self.manifest.version).await {
                    warn!("failed to discard partial cache generation: {cleanup}");
                }
                warn!("cache install for {} failed: {error}", self.manifest.version);
                self.state = WorkerState::Redundant;
                Err(error)
            }
        }
    }

    async fn populate(&self) -> ShellResult<usize> {
        let mut fetched = Vec::with_capacity(self.manifest.assets.len());

        for asset in &self.manifest.assets {
            let request = Request::get(self.origin.join(asset)?);
            let response = self.network.fetch(&request).await.map_err(|error| {
                ShellError::new(
                    "worker.install.asset_failed",
                    format!("failed to fetch `{asset}`: {error}"),
                )
            })?;

            if !response.ok() {
                return Err(ShellError::new(
                    "worker.install.asset_failed",
                    format!(
                        "failed to fetch `{asset}`: status {}",
                        response.status.as_u16()
                    ),
                ));
            }

            fetched.push((request.cache_key().to_owned(), response));
        }

        self.caches.open(&self.manifest.version).await?;
        let count = fetched.len();
        for (key, response) in fetched {
            self.caches.put(&self.manifest.version, &key, response).await?;
        }
        Ok(count)
    }

    /// Deletes every other cache generation, then claims all open pages.
    pub async fn activate(&mut self) -> ShellResult<()> {
        self.require_state(WorkerState::Waiting, "activate")?;

        for name in self.caches.keys().await? {
            if name == self.manifest.version {
                continue;
            }
            if self.caches.delete(&name).await? {
                info!("deleted stale cache generation {name}");
            }
        }

        self.state = WorkerState::Active;
        self.controls_clients = true;
        info!("cache generation {} is active", self.manifest.version);
        Ok(())
    }

    pub(crate) fn retire(&mut self) {
        self.state = WorkerState::Redundant;
        self.controls_clients = false;
    }

    /// Answers an intercepted request. Never fails: network errors become
    /// synthetic responses so the page never sees a rejected fetch.
    pub async fn handle_fetch(&self, request: &Request) -> Response {
        if !request.url.same_origin(&self.origin) {
            return match self.network.fetch(request).await {
                Ok(response) => response,
                Err(error) => {
                    debug!("cross-origin fetch failed: {error}");
                    Response::synthetic(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable", "")
                }
            };
        }

        let version = self.manifest.version.as_str();
        let key = request.cache_key();
        let cacheable_method = request.method == Method::Get;

        if cacheable_method {
            match self.caches.lookup(version, key).await {
                Ok(Some(response)) => {
                    debug!("cache hit for {key}");
                    return response;
                }
                Ok(None) => debug!("cache miss for {key}"),
                Err(error) => warn!("cache lookup for {key} failed: {error}"),
            }
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if cacheable_method && is_cacheable(&response) {
                    if let Err(error) = self.caches.put(version, key, response.clone()).await {
                        warn!("failed to cache {key}: {error}");
                    }
                }
                response
            }
            Err(error) => {
                warn!("network fetch for {key} failed: {error}");
                Response::synthetic(StatusCode::REQUEST_TIMEOUT, "Request Timeout", "Network error")
            }
        }
    }

    fn require_state(&self, expected: WorkerState, operation: &str) -> ShellResult<()> {
        if self.state == expected {
            return Ok(());
        }
        Err(ShellError::new(
            "worker.state_invalid",
            format!(
                "cannot {operation} worker {} in state {:?}",
                self.manifest.version, self.state
            ),
        ))
    }
}

/// Only a complete same-origin 200 is stored; 204, 206 and the rest pass through.
fn is_cacheable(response: &Response) -> bool {
    response.status == StatusCode::OK && response.response_type == ResponseType::Basic
}
