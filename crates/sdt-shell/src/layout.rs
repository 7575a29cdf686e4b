//! Shared navigation bar and footer injected into every page.

use crate::hooks::PageHooks;
use log::debug;
use sdt_core::ShellError;
use sdt_core::ShellResult;
use sdt_dom::Document;
use sdt_dom::NodeId;
use sdt_html::HtmlParser;

const NAV_MARKUP: &str = r#"<nav class="fixed top-0 w-full z-50 glass-nav border-b border-neutral-200/50 dark:border-neutral-800/50 backdrop-blur-md bg-white/70 dark:bg-black/70">
    <div class="max-w-7xl mx-auto px-6 h-16 flex items-center justify-between">
        <a href="/" class="flex items-center gap-2 group">
            <img src="logo-small.png" alt="SimpleDevTools Logo" class="w-8 h-8" width="32" height="32">
            <span class="font-display font-medium text-lg tracking-tight text-neutral-900 dark:text-white">SimpleDevTools</span>
        </a>
        <div class="hidden md:flex items-center gap-8 text-sm font-medium text-neutral-500 dark:text-neutral-400">
            <a href="/" class="hover:text-black dark:hover:text-white transition-colors">Home</a>
            <a href="/tools" class="hover:text-black dark:hover:text-white transition-colors">Tools</a>
            <a href="/how-it-works" class="hover:text-black dark:hover:text-white transition-colors">How It Works</a>
            <div class="h-4 w-px bg-neutral-200 dark:bg-neutral-800"></div>
            <a href="https://github.com/helloimabid/" target="_blank" class="hover:text-black dark:hover:text-white transition-colors">
                <i data-lucide="github" class="w-4 h-4"></i>
            </a>
            <button id="theme-toggle" class="p-2 rounded-full hover:bg-neutral-100 dark:hover:bg-neutral-800 transition-colors">
                <i data-lucide="sun" class="w-4 h-4 block dark:hidden"></i>
                <i data-lucide="moon" class="w-4 h-4 hidden dark:block"></i>
            </button>
        </div>
    </div>
</nav>"#;

const FOOTER_MARKUP: &str = r#"<footer class="border-t border-neutral-200 dark:border-neutral-800 bg-white dark:bg-black pt-12 pb-8 text-sm relative z-10 mt-auto">
    <div class="max-w-7xl mx-auto px-6">
        <div class="grid grid-cols-1 md:grid-cols-6 gap-8 mb-12">
            <div class="col-span-1 md:col-span-2">
                <span class="font-display font-semibold tracking-tight text-neutral-900 dark:text-white">SimpleDevTools</span>
                <p class="text-neutral-500 dark:text-neutral-400 max-w-xs leading-relaxed">Privacy-first utilities for the modern web. Built for developers, by developers.</p>
            </div>
            <div>
                <h4 class="font-medium mb-4 text-neutral-900 dark:text-white">Tools</h4>
                <ul class="space-y-2 text-neutral-500 dark:text-neutral-400">
                    <li><a href="/json-formatter">JSON Formatter</a></li>
                    <li><a href="/base64-encoder">Base64 Encoder</a></li>
                    <li><a href="/hash-generator">Hash Generator</a></li>
                    <li><a href="/uuid-generator">UUID Generator</a></li>
                    <li><a href="/regex-tester">Regex Tester</a></li>
                    <li><a href="/jwt-decoder">JWT Decoder</a></li>
                    <li><a href="/image-compressor">Image Compressor</a></li>
                    <li><a href="/password-strength-analyzer">Password Strength Analyzer</a></li>
                </ul>
            </div>
            <div>
                <h4 class="font-medium mb-4 text-neutral-900 dark:text-white">Legal</h4>
                <ul class="space-y-2 text-neutral-500 dark:text-neutral-400">
                    <li><a href="/privacy-policy">Privacy Policy</a></li>
                    <li><a href="/terms">Terms of Service</a></li>
                </ul>
            </div>
            <div>
                <h4 class="font-medium mb-4 text-neutral-900 dark:text-white">Contact</h4>
                <ul class="space-y-2 text-neutral-500 dark:text-neutral-400">
                    <li><a href="/contact">Contact Me</a></li>
                </ul>
            </div>
            <div>
                <h4 class="font-medium mb-4 text-neutral-900 dark:text-white">Guides</h4>
                <ul class="space-y-2 text-neutral-500 dark:text-neutral-400">
                    <li><a href="/guides">All Guides</a></li>
                </ul>
            </div>
        </div>
        <div class="flex flex-col md:flex-row items-center justify-between pt-8 border-t border-neutral-200 dark:border-neutral-800">
            <span class="text-neutral-400 text-xs">&copy; SimpleDevTools.tech. All rights reserved.</span>
            <span class="text-xs text-neutral-400">Systems Operational</span>
        </div>
    </div>
</footer>"#;

/// References to the injected chrome, handed to components that attach to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chrome {
    pub nav: NodeId,
    /// Inner container of the navigation bar; the mobile menu trigger lives here.
    pub nav_container: Option<NodeId>,
    pub footer: NodeId,
    pub theme_toggle: Option<NodeId>,
}

/// Prepends the navigation bar and appends the footer to `<body>`.
///
/// A `<nav>` or `<footer>` that is already a direct child of `<body>` is kept
/// as is, so repeated calls never duplicate chrome.
pub fn inject_chrome(document: &mut Document, hooks: &dyn PageHooks) -> ShellResult<Chrome> {
    let body = document
        .body()
        .ok_or_else(|| ShellError::new("layout.body_missing", "document has no <body>"))?;

    let mut inserted = false;

    let nav = match direct_child(document, body, "nav") {
        Some(nav) => nav,
        None => {
            let nodes = HtmlParser.parse_fragment(document, NAV_MARKUP);
            let anchor = document.children(body).first().copied();
            for node in &nodes {
                document.insert_before(body, *node, anchor)?;
            }
            inserted = true;
            direct_child(document, body, "nav")
                .ok_or_else(|| ShellError::new("layout.nav_missing", "navigation markup has no <nav>"))?
        }
    };

    let footer = match direct_child(document, body, "footer") {
        Some(footer) => footer,
        None => {
            for node in HtmlParser.parse_fragment(document, FOOTER_MARKUP) {
                document.append_child(body, node)?;
            }
            inserted = true;
            direct_child(document, body, "footer")
                .ok_or_else(|| ShellError::new("layout.footer_missing", "footer markup has no <footer>"))?
        }
    };

    if inserted {
        debug!("injected site chrome");
        hooks.render_icons(document);
    }

    let nav_container =
        document.find_first(nav, |element| element.tag == "div" && element.has_class("max-w-7xl"));

    Ok(Chrome {
        nav,
        nav_container,
        footer,
        theme_toggle: document.get_element_by_id("theme-toggle"),
    })
}

fn direct_child(document: &Document, parent: NodeId, tag: &str) -> Option<NodeId> {
    document
        .element_children(parent)
        .into_iter()
        .find(|child| document.is_element(*child, tag))
}

#[cfg(test)]
mod tests {
    use super::inject_chrome;
    use crate::hooks::RecordingHooks;
    use sdt_dom::Document;
    use sdt_html::HtmlParser;

    #[test]
    fn chrome_wraps_body_content() {
        let mut document = HtmlParser.parse("<body><main><h1>Tool</h1></main></body>");
        let hooks = RecordingHooks::new();

        let chrome = match inject_chrome(&mut document, &hooks) {
            Ok(chrome) => chrome,
            Err(error) => panic!("{error}"),
        };

        let body = document.body();
        let children = body.map(|body| document.element_children(body)).unwrap_or_default();
        assert_eq!(children.first().copied(), Some(chrome.nav));
        assert_eq!(children.last().copied(), Some(chrome.footer));
        assert!(chrome.theme_toggle.is_some());
        assert!(chrome.nav_container.is_some());
        assert_eq!(hooks.icon_renders(), 1);
    }

    #[test]
    fn repeated_injection_is_idempotent() {
        let mut document = Document::page();
        let hooks = RecordingHooks::new();

        let first = inject_chrome(&mut document, &hooks);
        let second = inject_chrome(&mut document, &hooks);
        assert!(first.is_ok());
        assert_eq!(first, second);

        let navs = document.find_all(document.root(), |element| element.tag == "nav");
        let footers = document.find_all(document.root(), |element| element.tag == "footer");
        let toggles = document.find_all(document.root(), |element| element.id() == Some("theme-toggle"));
        assert_eq!((navs.len(), footers.len(), toggles.len()), (1, 1, 1));
        assert_eq!(hooks.icon_renders(), 1);
    }

    #[test]
    fn footer_lists_legal_and_guide_links() {
        let mut document = Document::page();
        assert!(inject_chrome(&mut document, &RecordingHooks::new()).is_ok());
        let hrefs: Vec<_> = document
            .find_all(document.root(), |element| element.tag == "a")
            .into_iter()
            .filter_map(|node| document.attribute(node, "href").map(str::to_owned))
            .collect();
        for expected in ["/privacy-policy", "/terms", "/contact", "/guides", "/tools", "/how-it-works"] {
            assert!(hrefs.iter().any(|href| href == expected), "missing {expected}");
        }
    }

    #[test]
    fn missing_body_is_an_error() {
        let mut document = Document::empty();
        let result = inject_chrome(&mut document, &RecordingHooks::new());
        assert_eq!(result.map_err(|error| error.code), Err("layout.body_missing"));
    }
}
