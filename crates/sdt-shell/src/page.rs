//! Live page context: document, location, session history, viewport and clock.

use log::warn;
use sdt_dom::Document;
use sdt_dom::NodeId;
use sdt_net::SiteUrl;

/// Default viewport width for a headless page.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Everything the shell components mutate for one loaded page.
#[derive(Debug, Clone)]
pub struct Page {
    pub document: Document,
    history: Vec<SiteUrl>,
    history_index: usize,
    scroll_y: u32,
    viewport_width: u32,
    now_ms: u64,
    focused: Option<NodeId>,
    full_navigation: Option<SiteUrl>,
}

impl Page {
    pub fn new(url: SiteUrl, document: Document) -> Self {
        Self {
            document,
            history: vec![url],
            history_index: 0,
            scroll_y: 0,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            now_ms: 0,
            focused: None,
            full_navigation: None,
        }
    }

    pub fn location(&self) -> &SiteUrl {
        // `history` always holds at least the initial entry.
        &self.history[self.history_index]
    }

    pub fn path(&self) -> &str {
        self.location().path()
    }

    /// Adds a history entry and makes it current, dropping any forward entries.
    pub fn push_state(&mut self, url: SiteUrl) {
        self.history.truncate(self.history_index + 1);
        self.history.push(url);
        self.history_index = self.history.len() - 1;
    }

    /// Moves one entry back. Returns false at the start of history.
    pub fn back(&mut self) -> bool {
        if self.history_index == 0 {
            return false;
        }
        self.history_index -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.history_index + 1 >= self.history.len() {
            return false;
        }
        self.history_index += 1;
        true
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn scroll_to(&mut self, y: u32) {
        self.scroll_y = y;
    }

    pub fn scroll_y(&self) -> u32 {
        self.scroll_y
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn set_viewport_width(&mut self, width: u32) {
        self.viewport_width = width;
    }

    /// Milliseconds since the page was created.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn advance_clock(&mut self, elapsed_ms: u64) {
        self.now_ms = self.now_ms.saturating_add(elapsed_ms);
    }

    pub fn focus(&mut self, node: Option<NodeId>) {
        self.focused = node;
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// True when focus sits in a control that takes typed text.
    pub fn focus_in_text_input(&self) -> bool {
        let Some(element) = self.focused.and_then(|node| self.document.element(node)) else {
            return false;
        };
        matches!(element.tag.as_str(), "input" | "textarea" | "select")
            || element.attr("contenteditable").is_some()
    }

    /// Locks or restores body scrolling while an overlay is shown.
    pub fn set_scroll_locked(&mut self, locked: bool) {
        let Some(body) = self.document.body() else {
            return;
        };
        let value = if locked { "hidden" } else { "" };
        if let Err(error) = self.document.set_style_property(body, "overflow", value) {
            warn!("failed to update body overflow: {error}");
        }
    }

    pub fn scroll_locked(&self) -> bool {
        self.document
            .body()
            .and_then(|body| self.document.style_property(body, "overflow"))
            .is_some_and(|value| value == "hidden")
    }

    /// Records a browser-native load of `url`, replacing this page.
    pub fn navigate_full(&mut self, url: SiteUrl) {
        self.full_navigation = Some(url);
    }

    pub fn pending_full_navigation(&self) -> Option<&SiteUrl> {
        self.full_navigation.as_ref()
    }

    pub fn take_full_navigation(&mut self) -> Option<SiteUrl> {
        self.full_navigation.take()
    }
}

#[cfg(test)]
mod tests {
    use super::Page;
    use sdt_dom::Document;
    use sdt_net::SiteUrl;

    fn url(input: &str) -> SiteUrl {
        match SiteUrl::parse(input) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn history_moves_back_and_forward() {
        let mut page = Page::new(url("https://simpledevtools.tech/"), Document::page());
        page.push_state(url("https://simpledevtools.tech/terms"));
        page.push_state(url("https://simpledevtools.tech/json-formatter"));

        assert!(page.back());
        assert_eq!(page.path(), "/terms");
        assert!(page.back());
        assert!(!page.back());
        assert!(page.forward());
        assert_eq!(page.path(), "/terms");
    }

    #[test]
    fn push_state_drops_forward_entries() {
        let mut page = Page::new(url("https://simpledevtools.tech/"), Document::page());
        page.push_state(url("https://simpledevtools.tech/a"));
        assert!(page.back());
        page.push_state(url("https://simpledevtools.tech/b"));
        assert_eq!(page.history_len(), 2);
        assert!(!page.forward());
    }

    #[test]
    fn text_inputs_are_detected() {
        let mut page = Page::new(url("https://simpledevtools.tech/"), Document::page());
        let input = page.document.create_element("textarea");
        let editable = page
            .document
            .create_element_with_attrs("div", &[("contenteditable", "true")]);
        let button = page.document.create_element("button");

        page.focus(Some(input));
        assert!(page.focus_in_text_input());
        page.focus(Some(editable));
        assert!(page.focus_in_text_input());
        page.focus(Some(button));
        assert!(!page.focus_in_text_input());
    }

    #[test]
    fn scroll_lock_round_trips_through_body_style() {
        let mut page = Page::new(url("https://simpledevtools.tech/"), Document::page());
        page.set_scroll_locked(true);
        assert!(page.scroll_locked());
        page.set_scroll_locked(false);
        assert!(!page.scroll_locked());
    }
}
