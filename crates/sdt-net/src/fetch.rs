//! The `Fetcher` seam and the two network stand-ins the shell runs against.

use crate::http::Method;
use crate::http::Request;
use crate::http::Response;
use crate::http::ResponseType;
use crate::http::StatusCode;
use crate::url::SiteUrl;
use async_trait::async_trait;
use sdt_core::ShellError;
use sdt_core::ShellResult;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

/// Anything that can answer a request. An `Err` is a network-level failure
/// (offline, connection refused); HTTP error statuses come back as `Ok`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> ShellResult<Response>;
}

#[async_trait]
impl<F> Fetcher for Arc<F>
where
    F: Fetcher + ?Sized,
{
    async fn fetch(&self, request: &Request) -> ShellResult<Response> {
        (**self).fetch(request).await
    }
}

fn network_error(request: &Request, reason: &str) -> ShellError {
    ShellError::new(
        "net.fetch_failed",
        format!("{} {} failed: {reason}", request.method.as_str(), request.url),
    )
}

#[derive(Debug, Default)]
struct MemoryFetcherState {
    responses: BTreeMap<String, (StatusCode, Vec<u8>, Option<String>)>,
    failing: BTreeSet<String>,
    offline: bool,
    requests: Vec<String>,
}

/// In-memory network with a request log, used to observe cache behaviour.
///
/// Unknown same-origin URLs answer 404; unknown cross-origin URLs fail like
/// an unreachable host.
#[derive(Debug)]
pub struct MemoryFetcher {
    origin: SiteUrl,
    state: Mutex<MemoryFetcherState>,
}

impl MemoryFetcher {
    pub fn new(origin: SiteUrl) -> Self {
        Self {
            origin,
            state: Mutex::new(MemoryFetcherState::default()),
        }
    }

    pub fn origin(&self) -> &SiteUrl {
        &self.origin
    }

    /// Serves `body` with status 200 at `location` (a path or an absolute URL).
    pub fn insert(&self, location: &str, body: &str) -> ShellResult<()> {
        self.insert_with_status(location, StatusCode::OK, body, None)
    }

    pub fn insert_with_status(
        &self,
        location: &str,
        status: StatusCode,
        body: &str,
        content_type: Option<&str>,
    ) -> ShellResult<()> {
        let key = self.key_for(location)?;
        self.with_state(|state| {
            state.responses.insert(
                key,
                (status, body.as_bytes().to_vec(), content_type.map(str::to_owned)),
            );
        });
        Ok(())
    }

    /// Makes requests for `location` fail at the network level.
    pub fn fail(&self, location: &str) -> ShellResult<()> {
        let key = self.key_for(location)?;
        self.with_state(|state| {
            state.failing.insert(key);
        });
        Ok(())
    }

    pub fn set_offline(&self, offline: bool) {
        self.with_state(|state| state.offline = offline);
    }

    pub fn request_count(&self) -> usize {
        self.with_state(|state| state.requests.len())
    }

    pub fn requests_for(&self, location: &str) -> usize {
        let Ok(key) = self.key_for(location) else {
            return 0;
        };
        self.with_state(|state| state.requests.iter().filter(|url| **url == key).count())
    }

    fn key_for(&self, location: &str) -> ShellResult<String> {
        Ok(self.origin.join(location)?.as_str().to_owned())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryFetcherState) -> T) -> T {
        match self.state.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                f(&mut guard)
            }
        }
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, request: &Request) -> ShellResult<Response> {
        let key = request.cache_key().to_owned();
        let same_origin = request.url.same_origin(&self.origin);

        let entry = self.with_state(|state| {
            state.requests.push(key.clone());
            if state.offline || state.failing.contains(&key) {
                return Err(());
            }
            Ok(state.responses.get(&key).cloned())
        });

        let entry = entry.map_err(|()| network_error(request, "network unreachable"))?;
        let response_type = if same_origin {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        };

        match entry {
            Some((status, body, content_type)) => {
                let response = Response::new(&request.url, status, response_type, body);
                match content_type {
                    Some(value) => response.with_header("Content-Type", &value),
                    None => Ok(response),
                }
            }
            None if same_origin => Ok(Response::new(
                &request.url,
                StatusCode::NOT_FOUND,
                response_type,
                Vec::new(),
            )),
            None => Err(network_error(request, "host unreachable")),
        }
    }
}

/// Serves a static site directory as one origin.
///
/// `/` and directory paths map to `index.html`. Requests for other origins
/// fail as if the machine were offline.
#[derive(Debug, Clone)]
pub struct StaticSiteFetcher {
    origin: SiteUrl,
    root: PathBuf,
}

impl StaticSiteFetcher {
    pub fn new(origin: SiteUrl, root: impl Into<PathBuf>) -> Self {
        Self {
            origin,
            root: root.into(),
        }
    }

    pub fn origin(&self) -> &SiteUrl {
        &self.origin
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_file(&self, url_path: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for segment in url_path.split('/').filter(|segment| !segment.is_empty()) {
            if segment == ".." || segment == "." || segment.contains('\\') {
                return None;
            }
            path.push(segment);
        }

        if url_path.ends_with('/') || path.is_dir() {
            path.push("index.html");
        }
        Some(path)
    }
}

#[async_trait]
impl Fetcher for StaticSiteFetcher {
    async fn fetch(&self, request: &Request) -> ShellResult<Response> {
        if !request.url.same_origin(&self.origin) {
            return Err(network_error(request, "offline"));
        }

        if request.method != Method::Get && request.method != Method::Head {
            return Ok(Response::new(
                &request.url,
                StatusCode::METHOD_NOT_ALLOWED,
                ResponseType::Basic,
                Vec::new(),
            ));
        }

        let Some(path) = self.resolve_file(request.url.path()) else {
            return Ok(Response::new(
                &request.url,
                StatusCode::NOT_FOUND,
                ResponseType::Basic,
                Vec::new(),
            ));
        };

        let body = match std::fs::read(&path) {
            Ok(body) => body,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                log::debug!("static fetch miss for {}", path.display());
                return Ok(Response::new(
                    &request.url,
                    StatusCode::NOT_FOUND,
                    ResponseType::Basic,
                    Vec::new(),
                ));
            }
            Err(error) => {
                return Err(network_error(
                    request,
                    &format!("failed to read `{}`: {error}", path.display()),
                ));
            }
        };

        let body = if request.method == Method::Head {
            Vec::new()
        } else {
            body
        };

        Response::new(&request.url, StatusCode::OK, ResponseType::Basic, body)
            .with_header("Content-Type", content_type_for(&path))
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
