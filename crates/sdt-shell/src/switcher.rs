//! Command-palette style quick switcher over the tool registry.

use crate::hooks::PageHooks;
use crate::menu::closest_with_class;
use crate::menu::is_within;
use crate::page::Page;
use crate::registry::ToolEntry;
use crate::registry::ToolRegistry;
use crate::tool_history::ToolHistory;
use log::debug;
use log::warn;
use sdt_core::ShellError;
use sdt_core::ShellResult;
use sdt_dom::Document;
use sdt_dom::NodeId;
use sdt_html::HtmlParser;

const OPEN_CLASS: &str = "open";
const SELECTED_CLASS: &str = "selected";
const RESULT_CLASS: &str = "qs-result";

const SWITCHER_MARKUP: &str = r#"<div id="quick-switcher">
    <div class="qs-backdrop"></div>
    <div class="qs-modal">
        <div class="qs-header">
            <i data-lucide="search" class="qs-search-icon"></i>
            <input type="text" id="qs-input" placeholder="Search tools..." autocomplete="off">
            <kbd class="qs-kbd">ESC</kbd>
        </div>
        <div class="qs-results" id="qs-results"></div>
        <div class="qs-footer">
            <span><kbd>↑↓</kbd> Navigate</span>
            <span><kbd>↵</kbd> Open</span>
            <span><kbd>ESC</kbd> Close</span>
        </div>
    </div>
</div>"#;

/// Filtered view of the registry. `recent` is only populated for an empty
/// query, in which case `rest` holds every other tool in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredTools<'a> {
    pub recent: Vec<&'a ToolEntry>,
    pub rest: Vec<&'a ToolEntry>,
}

impl<'a> FilteredTools<'a> {
    pub fn len(&self) -> usize {
        self.recent.len() + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether results render under "Recently Used" / "All Tools" headings.
    pub fn is_sectioned(&self) -> bool {
        !self.recent.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ToolEntry> + '_ {
        self.recent.iter().chain(self.rest.iter()).copied()
    }
}

/// Filters the registry for `query`.
///
/// A blank query lists known recents first, in recency order, then the
/// remaining tools in registry order with no tool listed twice. Otherwise the
/// trimmed, lower-cased query is matched as a substring of names and keywords.
pub fn filter_tools<'a>(
    registry: &'a ToolRegistry,
    recents: &[String],
    query: &str,
) -> FilteredTools<'a> {
    let needle = query.trim().to_lowercase();
    if !needle.is_empty() {
        return FilteredTools {
            recent: Vec::new(),
            rest: registry
                .tools()
                .iter()
                .filter(|tool| tool.matches(&needle))
                .collect(),
        };
    }

    let mut recent: Vec<&ToolEntry> = Vec::new();
    for path in recents {
        if let Some(tool) = registry.get(path)
            && !recent.iter().any(|seen| seen.path == tool.path)
        {
            recent.push(tool);
        }
    }
    let rest = registry
        .tools()
        .iter()
        .filter(|tool| !recent.iter().any(|seen| seen.path == tool.path))
        .collect();
    FilteredTools { recent, rest }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SwitcherElements {
    root: NodeId,
    backdrop: Option<NodeId>,
    input: NodeId,
    results: NodeId,
}

/// Result of a key pressed while the switcher input has focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitcherKey {
    /// The key is not one the switcher reacts to.
    Ignored,
    Handled,
    /// Confirm pressed on a result; the caller closes and navigates.
    Activate(String),
}

/// Modal switcher state: open flag, query, rendered results and selection.
#[derive(Debug, Clone, Default)]
pub struct QuickSwitcher {
    elements: Option<SwitcherElements>,
    open: bool,
    query: String,
    selected: usize,
    results: Vec<(NodeId, String)>,
}

impl QuickSwitcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_path(&self) -> Option<&str> {
        self.results.get(self.selected).map(|(_, path)| path.as_str())
    }

    /// Paths of the rendered results, in display order.
    pub fn result_paths(&self) -> Vec<&str> {
        self.results.iter().map(|(_, path)| path.as_str()).collect()
    }

    /// The text input, once the modal exists.
    pub fn input(&self) -> Option<NodeId> {
        self.elements.map(|elements| elements.input)
    }

    /// Builds the modal on first use; reuses one already in the document.
    pub fn ensure_created(&mut self, document: &mut Document) -> ShellResult<()> {
        if let Some(elements) = self.elements
            && document.is_connected(elements.root)
        {
            return Ok(());
        }

        let root = match document.get_element_by_id("quick-switcher") {
            Some(root) => root,
            None => {
                let body = document
                    .body()
                    .ok_or_else(|| ShellError::new("switcher.body_missing", "document has no <body>"))?;
                for node in HtmlParser.parse_fragment(document, SWITCHER_MARKUP) {
                    document.append_child(body, node)?;
                }
                document.get_element_by_id("quick-switcher").ok_or_else(|| {
                    ShellError::new("switcher.markup_invalid", "switcher markup has no root")
                })?
            }
        };

        let input = document
            .find_first(root, |element| element.id() == Some("qs-input"))
            .ok_or_else(|| ShellError::new("switcher.input_missing", "switcher has no #qs-input"))?;
        let results = document
            .find_first(root, |element| element.id() == Some("qs-results"))
            .ok_or_else(|| ShellError::new("switcher.results_missing", "switcher has no #qs-results"))?;
        let backdrop = document.find_first(root, |element| element.has_class("qs-backdrop"));

        self.elements = Some(SwitcherElements {
            root,
            backdrop,
            input,
            results,
        });
        debug!("quick switcher created");
        Ok(())
    }

    pub fn open(
        &mut self,
        page: &mut Page,
        registry: &ToolRegistry,
        history: &ToolHistory,
        hooks: &dyn PageHooks,
    ) {
        if let Err(error) = self.ensure_created(&mut page.document) {
            warn!("quick switcher unavailable: {error}");
            return;
        }
        let Some(elements) = self.elements else {
            return;
        };

        report(page.document.add_class(elements.root, OPEN_CLASS));
        self.open = true;
        self.selected = 0;
        self.query.clear();
        report(page.document.set_attribute(elements.input, "value", ""));
        page.focus(Some(elements.input));
        self.render(&mut page.document, registry, history, hooks);
        page.set_scroll_locked(true);
        debug!("quick switcher opened");
    }

    pub fn close(&mut self, page: &mut Page) {
        if let Some(elements) = self.elements {
            report(page.document.remove_class(elements.root, OPEN_CLASS));
            if page
                .focused()
                .is_some_and(|focused| is_within(&page.document, focused, elements.root))
            {
                page.focus(None);
            }
        }
        if self.open {
            debug!("quick switcher closed");
        }
        self.open = false;
        page.set_scroll_locked(false);
    }

    pub fn toggle(
        &mut self,
        page: &mut Page,
        registry: &ToolRegistry,
        history: &ToolHistory,
        hooks: &dyn PageHooks,
    ) -> bool {
        if self.open {
            self.close(page);
        } else {
            self.open(page, registry, history, hooks);
        }
        self.open
    }

    /// Replaces the query, as typing in the input does, and re-renders.
    pub fn set_query(
        &mut self,
        page: &mut Page,
        registry: &ToolRegistry,
        history: &ToolHistory,
        hooks: &dyn PageHooks,
        query: &str,
    ) {
        let Some(elements) = self.elements else {
            return;
        };
        query.clone_into(&mut self.query);
        report(page.document.set_attribute(elements.input, "value", query));
        self.render(&mut page.document, registry, history, hooks);
    }

    /// Moves the highlight by `delta`, clamped to the rendered results.
    pub fn move_selection(&mut self, document: &mut Document, delta: isize) {
        let last = self.results.len().saturating_sub(1);
        self.selected = self.selected.saturating_add_signed(delta).min(last);
        self.update_selection(document);
    }

    /// Handles navigation keys typed into the switcher input.
    pub fn handle_key(&mut self, page: &mut Page, key: &str) -> SwitcherKey {
        if !self.open {
            return SwitcherKey::Ignored;
        }
        match key {
            "ArrowDown" => {
                self.move_selection(&mut page.document, 1);
                SwitcherKey::Handled
            }
            "ArrowUp" => {
                self.move_selection(&mut page.document, -1);
                SwitcherKey::Handled
            }
            "Enter" => match self.selected_path() {
                Some(path) => SwitcherKey::Activate(path.to_owned()),
                None => SwitcherKey::Handled,
            },
            "Escape" => {
                self.close(page);
                SwitcherKey::Handled
            }
            _ => SwitcherKey::Ignored,
        }
    }

    pub fn is_backdrop(&self, document: &Document, target: NodeId) -> bool {
        self.elements
            .and_then(|elements| elements.backdrop)
            .is_some_and(|backdrop| is_within(document, target, backdrop))
    }

    /// Path of the rendered result containing `target`, if any.
    pub fn result_at(&self, document: &Document, target: NodeId) -> Option<String> {
        let elements = self.elements?;
        let result = closest_with_class(document, target, RESULT_CLASS)?;
        if !is_within(document, result, elements.results) {
            return None;
        }
        self.results
            .iter()
            .find(|(node, _)| *node == result)
            .map(|(_, path)| path.clone())
    }

    fn render(
        &mut self,
        document: &mut Document,
        registry: &ToolRegistry,
        history: &ToolHistory,
        hooks: &dyn PageHooks,
    ) {
        let Some(elements) = self.elements else {
            return;
        };
        let recents = history.recent_tools();
        let favorites = history.favorite_tools();
        let filtered = filter_tools(registry, &recents, &self.query);

        document.clear_children(elements.results);
        self.results.clear();
        self.selected = 0;

        if filtered.is_empty() {
            report(append_text_element(document, elements.results, "div", "qs-empty", "No tools found"));
            return;
        }

        let rendered = if filtered.is_sectioned() {
            self.append_sections(document, elements.results, &filtered, &favorites)
        } else {
            self.append_results(document, elements.results, &filtered.rest, &favorites)
        };
        report(rendered);

        self.update_selection(document);
        hooks.render_icons(document);
    }

    fn append_sections(
        &mut self,
        document: &mut Document,
        container: NodeId,
        filtered: &FilteredTools<'_>,
        favorites: &[String],
    ) -> ShellResult<()> {
        append_text_element(document, container, "div", "qs-section-title", "Recently Used")?;
        self.append_results(document, container, &filtered.recent, favorites)?;
        append_text_element(document, container, "div", "qs-section-title", "All Tools")?;
        self.append_results(document, container, &filtered.rest, favorites)
    }

    fn append_results(
        &mut self,
        document: &mut Document,
        container: NodeId,
        tools: &[&ToolEntry],
        favorites: &[String],
    ) -> ShellResult<()> {
        for tool in tools {
            let index = self.results.len().to_string();
            let anchor = document.create_element_with_attrs(
                "a",
                &[("href", &tool.path), ("class", RESULT_CLASS), ("data-index", &index)],
            );

            let icon_box = document.create_element_with_attrs("div", &[("class", "qs-result-icon")]);
            let icon = document.create_element_with_attrs("i", &[("data-lucide", &tool.icon)]);
            document.append_child(icon_box, icon)?;
            document.append_child(anchor, icon_box)?;

            let info = document.create_element_with_attrs("div", &[("class", "qs-result-info")]);
            append_text_element(document, info, "div", "qs-result-name", &tool.name)?;
            append_text_element(document, info, "div", "qs-result-url", &tool.path)?;
            document.append_child(anchor, info)?;

            if favorites.iter().any(|favorite| *favorite == tool.path) {
                append_text_element(document, anchor, "span", "qs-result-badge", "\u{2605} Favorite")?;
            }

            document.append_child(container, anchor)?;
            self.results.push((anchor, tool.path.clone()));
        }
        Ok(())
    }

    fn update_selection(&self, document: &mut Document) {
        for (index, (node, _)) in self.results.iter().enumerate() {
            let change = if index == self.selected {
                document.add_class(*node, SELECTED_CLASS)
            } else {
                document.remove_class(*node, SELECTED_CLASS)
            };
            report(change);
        }
    }
}

fn append_text_element(
    document: &mut Document,
    parent: NodeId,
    tag: &str,
    class: &str,
    text: &str,
) -> ShellResult<()> {
    let node = document.create_element_with_attrs(tag, &[("class", class)]);
    let text = document.create_text(text);
    document.append_child(node, text)?;
    document.append_child(parent, node)
}

fn report(result: ShellResult<()>) {
    if let Err(error) = result {
        warn!("quick switcher update failed: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::QuickSwitcher;
    use super::SwitcherKey;
    use super::filter_tools;
    use crate::hooks::RecordingHooks;
    use crate::page::Page;
    use crate::registry::ToolRegistry;
    use crate::tool_history::ToolHistory;
    use sdt_dom::Document;
    use sdt_net::SiteUrl;
    use sdt_storage::MemoryStore;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn page() -> Page {
        match SiteUrl::parse("https://simpledevtools.tech/tools") {
            Ok(url) => Page::new(url, Document::page()),
            Err(error) => panic!("{error}"),
        }
    }

    fn history() -> ToolHistory {
        ToolHistory::new(Arc::new(MemoryStore::new()), "sdt_recent_tools", "sdt_favorite_tools")
    }

    fn paths(tools: impl Iterator<Item = String>) -> Vec<String> {
        tools.collect()
    }

    #[test]
    fn blank_query_lists_recents_then_remaining_tools() {
        let registry = ToolRegistry::default();
        let recents = vec!["/json-formatter".to_owned(), "/uuid-generator".to_owned()];

        let filtered = filter_tools(&registry, &recents, "");
        assert!(filtered.is_sectioned());
        assert_eq!(
            paths(filtered.recent.iter().map(|tool| tool.path.clone())),
            vec!["/json-formatter", "/uuid-generator"]
        );

        let expected_rest: Vec<String> = registry
            .tools()
            .iter()
            .filter(|tool| !recents.contains(&tool.path))
            .map(|tool| tool.path.clone())
            .collect();
        assert_eq!(paths(filtered.rest.iter().map(|tool| tool.path.clone())), expected_rest);

        let unique: BTreeSet<_> = filtered.iter().map(|tool| tool.path.as_str()).collect();
        assert_eq!(unique.len(), filtered.len());
        assert_eq!(filtered.len(), registry.len());
    }

    #[test]
    fn unknown_and_repeated_recents_are_skipped() {
        let registry = ToolRegistry::default();
        let recents = vec![
            "/retired-tool".to_owned(),
            "/regex-tester".to_owned(),
            "/regex-tester".to_owned(),
        ];
        let filtered = filter_tools(&registry, &recents, "   ");
        assert_eq!(
            paths(filtered.recent.iter().map(|tool| tool.path.clone())),
            vec!["/regex-tester"]
        );
        assert_eq!(filtered.len(), registry.len());
    }

    #[test]
    fn query_matches_names_and_keywords_case_insensitively() {
        let registry = ToolRegistry::default();
        let by_name = filter_tools(&registry, &[], "  JSON ");
        assert!(!by_name.is_sectioned());
        assert!(by_name.iter().any(|tool| tool.path == "/json-formatter"));
        assert!(by_name.iter().all(|tool| tool.matches("json")));

        let by_keyword = filter_tools(&registry, &[], "sha");
        assert!(by_keyword.iter().any(|tool| tool.path == "/hash-generator"));

        assert!(filter_tools(&registry, &[], "no such tool").is_empty());
    }

    #[test]
    fn opening_renders_sections_and_locks_scroll() {
        let registry = ToolRegistry::default();
        let history = history();
        history.add_recent("/uuid-generator");
        history.add_recent("/json-formatter");
        history.toggle_favorite("/uuid-generator");
        let hooks = RecordingHooks::new();
        let mut page = page();
        let mut switcher = QuickSwitcher::new();

        switcher.open(&mut page, &registry, &history, &hooks);
        assert!(switcher.is_open());
        assert!(page.scroll_locked());
        assert_eq!(page.focused(), switcher.input());
        assert_eq!(hooks.icon_renders(), 1);

        let result_paths = switcher.result_paths();
        assert_eq!(result_paths.first().copied(), Some("/json-formatter"));
        assert_eq!(result_paths.get(1).copied(), Some("/uuid-generator"));
        assert_eq!(result_paths.len(), registry.len());

        let document = &page.document;
        let titles: Vec<String> = document
            .find_all(document.root(), |element| element.has_class("qs-section-title"))
            .into_iter()
            .map(|node| document.text_content(node))
            .collect();
        assert_eq!(titles, vec!["Recently Used", "All Tools"]);

        let badges = document.find_all(document.root(), |element| element.has_class("qs-result-badge"));
        assert_eq!(badges.len(), 1);
        let selected = document.find_all(document.root(), |element| element.has_class("selected"));
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn selection_is_clamped_and_confirm_activates() {
        let registry = ToolRegistry::default();
        let history = history();
        let hooks = RecordingHooks::new();
        let mut page = page();
        let mut switcher = QuickSwitcher::new();
        switcher.open(&mut page, &registry, &history, &hooks);

        switcher.set_query(&mut page, &registry, &history, &hooks, "uuid");
        assert_eq!(switcher.result_paths(), vec!["/uuid-generator"]);

        assert_eq!(switcher.handle_key(&mut page, "ArrowUp"), SwitcherKey::Handled);
        assert_eq!(switcher.handle_key(&mut page, "ArrowDown"), SwitcherKey::Handled);
        assert_eq!(switcher.selected_index(), 0);
        assert_eq!(
            switcher.handle_key(&mut page, "Enter"),
            SwitcherKey::Activate("/uuid-generator".to_owned())
        );

        switcher.set_query(&mut page, &registry, &history, &hooks, "");
        for _ in 0..100 {
            switcher.handle_key(&mut page, "ArrowDown");
        }
        assert_eq!(switcher.selected_index(), registry.len() - 1);
    }

    #[test]
    fn empty_results_show_placeholder() {
        let registry = ToolRegistry::default();
        let history = history();
        let hooks = RecordingHooks::new();
        let mut page = page();
        let mut switcher = QuickSwitcher::new();
        switcher.open(&mut page, &registry, &history, &hooks);
        switcher.set_query(&mut page, &registry, &history, &hooks, "zzz");

        assert!(switcher.result_paths().is_empty());
        assert_eq!(switcher.handle_key(&mut page, "Enter"), SwitcherKey::Handled);
        let empty = page
            .document
            .find_first(page.document.root(), |element| element.has_class("qs-empty"))
            .map(|node| page.document.text_content(node));
        assert_eq!(empty.as_deref(), Some("No tools found"));
    }

    #[test]
    fn escape_and_toggle_close_without_navigating() {
        let registry = ToolRegistry::default();
        let history = history();
        let hooks = RecordingHooks::new();
        let mut page = page();
        let mut switcher = QuickSwitcher::new();

        assert!(switcher.toggle(&mut page, &registry, &history, &hooks));
        assert_eq!(switcher.handle_key(&mut page, "Escape"), SwitcherKey::Handled);
        assert!(!switcher.is_open());
        assert!(!page.scroll_locked());
        assert_eq!(page.focused(), None);

        assert!(switcher.toggle(&mut page, &registry, &history, &hooks));
        assert!(!switcher.toggle(&mut page, &registry, &history, &hooks));
        assert!(page.take_full_navigation().is_none());

        let roots = page
            .document
            .find_all(page.document.root(), |element| element.id() == Some("quick-switcher"));
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn clicks_resolve_to_results_and_backdrop() {
        let registry = ToolRegistry::default();
        let history = history();
        let hooks = RecordingHooks::new();
        let mut page = page();
        let mut switcher = QuickSwitcher::new();
        switcher.open(&mut page, &registry, &history, &hooks);
        switcher.set_query(&mut page, &registry, &history, &hooks, "regex");

        let document = &page.document;
        let name = document
            .find_first(document.root(), |element| element.has_class("qs-result-name"))
            .unwrap_or_default();
        assert_eq!(switcher.result_at(document, name).as_deref(), Some("/regex-tester"));

        let backdrop = document
            .find_first(document.root(), |element| element.has_class("qs-backdrop"))
            .unwrap_or_default();
        assert!(switcher.is_backdrop(document, backdrop));
        assert_eq!(switcher.result_at(document, backdrop), None);
    }
}
