//! Same-origin client router: fetch a route's source page and splice its main
//! content into the live document.

use crate::hooks::PageHooks;
use crate::page::Page;
use log::debug;
use log::info;
use log::warn;
use sdt_core::ShellError;
use sdt_core::ShellResult;
use sdt_dom::Document;
use sdt_dom::NodeId;
use sdt_html::HtmlParser;
use sdt_html::decode_text_response;
use sdt_net::Fetcher;
use sdt_net::SiteUrl;
use sdt_net::get_request;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Logical path mapped to the document that renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub path: String,
    pub source: String,
}

/// Ordered route list with unique paths and a mandatory `/` default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    default_index: usize,
}

impl RouteTable {
    pub fn new<I, P, S>(entries: I) -> ShellResult<Self>
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<String>,
        S: Into<String>,
    {
        let entries: Vec<RouteEntry> = entries
            .into_iter()
            .map(|(path, source)| RouteEntry {
                path: path.into(),
                source: source.into(),
            })
            .collect();

        let mut seen = BTreeSet::new();
        for entry in &entries {
            if !seen.insert(entry.path.as_str()) {
                return Err(ShellError::new(
                    "router.route_duplicate",
                    format!("route `{}` is defined twice", entry.path),
                ));
            }
        }

        let default_index = entries
            .iter()
            .position(|entry| entry.path == "/")
            .ok_or_else(|| {
                ShellError::new(
                    "router.default_route_missing",
                    "route table must define `/`",
                )
            })?;

        Ok(Self {
            entries,
            default_index,
        })
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|entry| entry.path == path)
    }

    /// The entry for `path`, or the `/` entry when the path is unknown.
    pub fn resolve(&self, path: &str) -> &RouteEntry {
        self.entries
            .iter()
            .find(|entry| entry.path == path)
            .unwrap_or(&self.entries[self.default_index])
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        let entries = [
            ("/", "index.html"),
            ("/json-formatter", "json-formatter.html"),
            ("/privacy-policy", "privacy-policy.html"),
            ("/terms", "terms.html"),
        ];
        Self {
            entries: entries
                .iter()
                .map(|(path, source)| RouteEntry {
                    path: (*path).to_owned(),
                    source: (*source).to_owned(),
                })
                .collect(),
            default_index: 0,
        }
    }
}

/// Strips a trailing `.html` and ensures a leading slash.
pub fn normalize_path(path: &str) -> String {
    let bare = path.strip_suffix(".html").unwrap_or(path);
    if bare.starts_with('/') {
        bare.to_owned()
    } else {
        format!("/{bare}")
    }
}

/// Best-guess document for a browser-native load of `path`.
pub fn fallback_url(path: &str) -> String {
    if path.ends_with('/') {
        "index.html".to_owned()
    } else {
        format!("{path}.html")
    }
}

/// What a click on an anchor with `href` should do under the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    Navigate(String),
    /// Leave the click to the browser (external or protocol-relative, mail, in-page anchors).
    Browser,
}

pub fn classify_link(href: Option<&str>) -> LinkAction {
    let Some(href) = href.filter(|value| !value.is_empty()) else {
        return LinkAction::Browser;
    };

    if href == "/" || href == "index.html" {
        return LinkAction::Navigate("/".to_owned());
    }

    let off_site = href.starts_with("http") || href.starts_with("//") || href.starts_with("mailto:");
    if off_site || href.starts_with('#') {
        return LinkAction::Browser;
    }

    LinkAction::Navigate(href.to_owned())
}

/// Result of a route load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Main content was swapped in place.
    Loaded {
        path: String,
        source: String,
        /// Theme toggle control found after the swap.
        theme_toggle: Option<NodeId>,
    },
    /// The load failed and a browser-native navigation was requested instead.
    FullNavigation(SiteUrl),
}

/// Client router bound to one fetcher and route table.
#[derive(Clone)]
pub struct Router {
    routes: RouteTable,
    fetcher: Arc<dyn Fetcher>,
    parser: HtmlParser,
}

impl Router {
    pub fn new(routes: RouteTable, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            routes,
            fetcher,
            parser: HtmlParser,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Pushes a history entry for the normalized `path` and loads it.
    pub async fn navigate(&self, page: &mut Page, hooks: &dyn PageHooks, path: &str) -> RouteOutcome {
        let normalized = normalize_path(path);
        match page.location().join(&normalized) {
            Ok(url) if !url.same_origin(page.location()) => {
                // Foreign origins never enter the routed history.
                info!("{url} is off-site, handing it to the browser");
                page.navigate_full(url.clone());
                return RouteOutcome::FullNavigation(url);
            }
            Ok(url) => page.push_state(url),
            Err(error) => {
                warn!("cannot navigate to `{path}`: {error}");
                return self.escalate(page, &normalized);
            }
        }
        self.load_page(page, hooks).await
    }

    /// Loads the route for the current location without touching history.
    pub async fn load_page(&self, page: &mut Page, hooks: &dyn PageHooks) -> RouteOutcome {
        let path = page.path().to_owned();
        let route = self.routes.resolve(&path).clone();
        debug!("route {path} resolved to {}", route.source);

        match self.splice_route(page, &route.source).await {
            Ok(()) => {
                hooks.render_icons(&page.document);
                page.scroll_to(0);
                let theme_toggle = page.document.get_element_by_id("theme-toggle");
                RouteOutcome::Loaded {
                    path,
                    source: route.source,
                    theme_toggle,
                }
            }
            Err(error) => {
                warn!("client-side load of {path} failed: {error}");
                self.escalate(page, &path)
            }
        }
    }

    async fn splice_route(&self, page: &mut Page, source: &str) -> ShellResult<()> {
        let markup = match self.fetch_markup(page.location(), source).await {
            Ok(markup) => markup,
            Err(error) => {
                let retry = if source.ends_with(".html") {
                    source.to_owned()
                } else {
                    format!("{source}.html")
                };
                debug!("fetch of {source} failed ({error}), retrying {retry}");
                self.fetch_markup(page.location(), &retry).await?
            }
        };

        let fetched = self.parser.parse(&markup);
        splice_document(&mut page.document, &fetched)
    }

    async fn fetch_markup(&self, location: &SiteUrl, source: &str) -> ShellResult<String> {
        let request = get_request(location, &format!("/{}", source.trim_start_matches('/')))?;
        let response = self.fetcher.fetch(&request).await?;
        if !response.ok() {
            return Err(ShellError::new(
                "router.fetch_status",
                format!("`{source}` answered {}", response.status.as_u16()),
            ));
        }
        Ok(decode_text_response(&response.body, response.content_type()))
    }

    fn escalate(&self, page: &mut Page, path: &str) -> RouteOutcome {
        let target = fallback_url(path);
        let url = page
            .location()
            .join(&target)
            .unwrap_or_else(|_| page.location().clone());
        info!("falling back to full navigation: {url}");
        page.navigate_full(url.clone());
        RouteOutcome::FullNavigation(url)
    }
}

/// Copies title and meta description from `fetched`, then replaces the live
/// `<main>` children with the fetched ones. Chrome outside `<main>` is kept.
fn splice_document(live: &mut Document, fetched: &Document) -> ShellResult<()> {
    let new_main = fetched
        .first_element_by_tag(fetched.root(), "main")
        .ok_or_else(|| ShellError::new("router.main_missing", "fetched page has no <main>"))?;
    let live_main = live
        .first_element_by_tag(live.root(), "main")
        .ok_or_else(|| ShellError::new("router.main_missing", "live page has no <main>"))?;

    live.set_title(&fetched.title())?;

    if let Some(description) = meta_description(fetched)
        .and_then(|node| fetched.attribute(node, "content"))
        .map(str::to_owned)
    {
        if let Some(live_meta) = meta_description(live) {
            live.set_attribute(live_meta, "content", &description)?;
        }
    }

    live.replace_children_from(live_main, fetched, new_main)
}

fn meta_description(document: &Document) -> Option<NodeId> {
    document.find_first(document.root(), |element| {
        element.tag == "meta" && element.attr("name") == Some("description")
    })
}
