//! Headless walk over a static site: the pages are served through the
//! navigation cache and every visit runs through the shell.

use log::debug;
use log::info;
use log::warn;
use sdt_core::ShellError;
use sdt_core::ShellResult;
use sdt_dom::Document;
use sdt_dom::collapse_whitespace;
use sdt_html::HtmlParser;
use sdt_html::decode_text_response;
use sdt_net::Fetcher;
use sdt_net::Request;
use sdt_net::SiteUrl;
use sdt_net::StaticSiteFetcher;
use sdt_shell::EventOutcome;
use sdt_shell::NoopHooks;
use sdt_shell::Page;
use sdt_shell::RouteOutcome;
use sdt_shell::Shell;
use sdt_shell::ShellConfig;
use sdt_shell::router::fallback_url;
use sdt_shell::router::normalize_path;
use sdt_storage::KeyValueStore;
use sdt_storage::PartitionStore;
use sdt_storage::SessionStore;
use sdt_storage::StorageConfig;
use sdt_worker::CacheManifest;
use sdt_worker::MemoryCacheStorage;
use sdt_worker::Registration;
use sdt_worker::WorkerFetcher;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_ORIGIN: &str = "https://simpledevtools.tech/";
const SUMMARY_CHARS: usize = 96;

pub const USAGE: &str = "usage: sdt-preview <site-dir> [path ...]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    pub site_dir: PathBuf,
    pub origin: String,
    pub storage_dir: PathBuf,
    /// First entry is loaded and booted, the rest are reached through the router.
    pub paths: Vec<String>,
}

impl PreviewConfig {
    /// Reads `<site-dir> [path ...]`; origin and storage root come from the
    /// environment.
    pub fn from_args<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let site_dir = args
            .next()
            .ok_or_else(|| "missing site directory".to_owned())?;
        if site_dir.starts_with('-') {
            return Err(format!("unsupported option `{site_dir}`"));
        }

        let mut paths: Vec<String> = args.collect();
        if paths.is_empty() {
            paths.push("/".to_owned());
        }

        Ok(Self {
            site_dir: PathBuf::from(site_dir),
            origin: default_origin(),
            storage_dir: default_storage_root(),
            paths,
        })
    }
}

fn default_origin() -> String {
    std::env::var("SDT_ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_owned())
}

fn default_storage_root() -> PathBuf {
    if let Some(override_root) = std::env::var_os("SDT_STORAGE_DIR") {
        return PathBuf::from(override_root);
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".sdt-preview")
}

/// How a visit reached its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitKind {
    /// Browser-native load followed by a shell boot.
    Boot,
    /// Main content swapped in by the router.
    Routed { source: String },
    /// The shell gave up and the page was loaded from scratch.
    FullNavigation { url: String },
    /// Nothing happened; the previous page stays.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub requested: String,
    pub location: String,
    pub title: String,
    pub kind: VisitKind,
    /// Start of the main landmark's text.
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewReport {
    pub cache_version: Option<String>,
    pub storage_degraded: bool,
    pub visits: Vec<Visit>,
    pub recent_tools: Vec<String>,
}

/// Installs the navigation cache, boots the shell on the first path and
/// walks the others.
pub async fn run(config: &PreviewConfig) -> ShellResult<PreviewReport> {
    let origin = SiteUrl::parse(&config.origin)?;
    let network: Arc<dyn Fetcher> = Arc::new(StaticSiteFetcher::new(origin.clone(), config.site_dir.clone()));
    let registration = Arc::new(Registration::new(
        origin.clone(),
        Arc::new(MemoryCacheStorage::new()),
        network,
    ));
    if let Err(error) = registration.register(CacheManifest::default()).await {
        warn!("navigation cache not installed, pages come straight from disk: {error}");
    }
    let fetcher: Arc<dyn Fetcher> = Arc::new(WorkerFetcher::new(Arc::clone(&registration)));

    let session = Arc::new(SessionStore::new(Box::new(
        PartitionStore::new(StorageConfig::default(), origin.host())
            .with_persistent_root(config.storage_dir.clone()),
    )));
    let store: Arc<dyn KeyValueStore> = session.clone();

    let (first, rest) = match config.paths.split_first() {
        Some((first, rest)) => (first.as_str(), rest),
        None => ("/", &[][..]),
    };

    let mut shell = boot_page(&origin.join(first)?, &fetcher, &store).await?;
    let mut visits = vec![visit(&shell, first, VisitKind::Boot)];

    for path in rest {
        let kind = match shell.navigate(path).await {
            EventOutcome::Routed(RouteOutcome::Loaded { source, .. }) => VisitKind::Routed { source },
            EventOutcome::Routed(RouteOutcome::FullNavigation(url)) | EventOutcome::FullNavigation(url) => {
                match boot_page(&url, &fetcher, &store).await {
                    Ok(next) => shell = next,
                    Err(error) => warn!("full load of {url} failed: {error}"),
                }
                VisitKind::FullNavigation {
                    url: url.as_str().to_owned(),
                }
            }
            EventOutcome::Handled | EventOutcome::Ignored => VisitKind::Skipped,
        };
        visits.push(visit(&shell, path, kind));
    }

    Ok(PreviewReport {
        cache_version: registration.active_version(),
        storage_degraded: session.is_degraded(),
        visits,
        recent_tools: shell.tool_history().recent_tools(),
    })
}

async fn boot_page(url: &SiteUrl, fetcher: &Arc<dyn Fetcher>, store: &Arc<dyn KeyValueStore>) -> ShellResult<Shell> {
    let document = load_document(fetcher.as_ref(), url).await?;
    let mut shell = Shell::new(
        ShellConfig::default(),
        Page::new(url.clone(), document),
        Arc::clone(store),
        Arc::new(NoopHooks),
    )
    .with_router(Arc::clone(fetcher));
    let summary = shell.boot();
    debug!(
        "booted {url}: {} action controls enhanced, breadcrumbs {}",
        summary.enhanced_buttons, summary.breadcrumbs
    );
    Ok(shell)
}

/// Fetches the document a browser would show for `url`, trying the `.html`
/// file behind a pretty path when the path itself is missing.
async fn load_document(fetcher: &dyn Fetcher, url: &SiteUrl) -> ShellResult<Document> {
    let response = fetcher.fetch(&Request::get(url.clone())).await?;
    let response = if response.ok() {
        response
    } else {
        let fallback = url.join(&format!("/{}", fallback_url(&normalize_path(url.path())).trim_start_matches('/')))?;
        debug!("{url} answered {}, trying {fallback}", response.status.as_u16());
        fetcher.fetch(&Request::get(fallback)).await?
    };
    if !response.ok() {
        return Err(ShellError::new(
            "preview.load_status",
            format!("{url} answered {}", response.status.as_u16()),
        ));
    }
    let markup = decode_text_response(&response.body, response.content_type());
    Ok(HtmlParser.parse(&markup))
}

fn visit(shell: &Shell, requested: &str, kind: VisitKind) -> Visit {
    let document = &shell.page().document;
    let summary = document
        .first_element_by_tag(document.root(), "main")
        .map(|main| collapse_whitespace(&document.text_content(main)))
        .map(|text| text.chars().take(SUMMARY_CHARS).collect())
        .unwrap_or_default();
    let visit = Visit {
        requested: requested.to_owned(),
        location: shell.page().location().as_str().to_owned(),
        title: document.title(),
        kind,
        summary,
    };
    info!("{} -> {} [{:?}] {}", visit.requested, visit.location, visit.kind, visit.title);
    visit
}
