//! Global keyboard dispatch, the shortcuts help modal and action-button lookup.

use crate::hooks::PageHooks;
use crate::menu::is_within;
use crate::page::Page;
use log::debug;
use log::warn;
use sdt_core::ShellError;
use sdt_core::ShellResult;
use sdt_dom::Document;
use sdt_dom::NodeId;

/// Key event as delivered to the document-level listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Key value, e.g. `"k"`, `"Enter"`, `"Escape"`, `"C"` with shift held.
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyEvent {
    pub fn key(key: &str) -> Self {
        Self {
            key: key.to_owned(),
            ctrl: false,
            meta: false,
            shift: false,
            alt: false,
        }
    }

    pub fn ctrl(key: &str) -> Self {
        Self {
            ctrl: true,
            ..Self::key(key)
        }
    }

    pub fn meta(key: &str) -> Self {
        Self {
            meta: true,
            ..Self::key(key)
        }
    }

    /// Ctrl+Shift with the shifted key value, e.g. `"C"`.
    pub fn ctrl_shift(key: &str) -> Self {
        Self {
            ctrl: true,
            shift: true,
            ..Self::key(key)
        }
    }

    pub fn shift(key: &str) -> Self {
        Self {
            shift: true,
            ..Self::key(key)
        }
    }

    fn command_modifier(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Tool-page action a modified key combination proxies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Format,
    Copy,
    Clear,
    Download,
}

impl ActionKind {
    pub const ALL: [Self; 4] = [Self::Format, Self::Copy, Self::Clear, Self::Download];

    /// Token used by the recognised button patterns
    /// (`[data-action=X]`, `#X-btn`, `.X-btn`, `button[onclick*=X]`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Copy => "copy",
            Self::Clear => "clear",
            Self::Download => "download",
        }
    }

    /// Human-readable binding, e.g. `Ctrl+Shift+C`.
    pub fn shortcut_label(self, modifier: &str) -> String {
        match self {
            Self::Format => format!("{modifier}+Enter"),
            Self::Copy => format!("{modifier}+Shift+C"),
            Self::Clear => format!("{modifier}+Shift+X"),
            Self::Download => format!("{modifier}+S"),
        }
    }
}

/// First element in document order matching any of the action's button patterns.
pub fn find_action_button(document: &Document, action: ActionKind) -> Option<NodeId> {
    let token = action.as_str();
    let id = format!("{token}-btn");
    document.find_first(document.root(), |element| {
        element.attr("data-action") == Some(token)
            || element.id() == Some(id.as_str())
            || element.has_class(&id)
            || (element.tag == "button"
                && element.attr("onclick").is_some_and(|handler| handler.contains(token)))
    })
}

/// What the global listener decided a key press means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutCommand {
    ToggleSwitcher,
    /// Escape: the caller closes the topmost open modal.
    Escape,
    ToggleHelp,
    /// Second key of a `g` chord.
    Navigate(&'static str),
    Action(ActionKind),
}

/// Global key dispatch with the pending `g` chord.
#[derive(Debug, Clone)]
pub struct KeyboardShortcuts {
    chord_window_ms: u64,
    chord_started_ms: Option<u64>,
}

impl KeyboardShortcuts {
    pub fn new(chord_window_ms: u64) -> Self {
        Self {
            chord_window_ms,
            chord_started_ms: None,
        }
    }

    pub fn chord_pending(&self) -> bool {
        self.chord_started_ms.is_some()
    }

    /// Maps a key press to a command. Unmodified single-key shortcuts are
    /// skipped while focus is in a text input.
    pub fn dispatch(&mut self, event: &KeyEvent, in_text_input: bool, now_ms: u64) -> Option<ShortcutCommand> {
        if event.command_modifier() {
            let command = match event.key.as_str() {
                "k" => Some(ShortcutCommand::ToggleSwitcher),
                "Enter" => Some(ShortcutCommand::Action(ActionKind::Format)),
                "C" if event.shift => Some(ShortcutCommand::Action(ActionKind::Copy)),
                "X" if event.shift => Some(ShortcutCommand::Action(ActionKind::Clear)),
                "s" => Some(ShortcutCommand::Action(ActionKind::Download)),
                _ => None,
            };
            if command.is_some() {
                return command;
            }
        }

        if event.key == "Escape" {
            return Some(ShortcutCommand::Escape);
        }

        if in_text_input {
            return None;
        }

        if event.key == "?" || (event.shift && event.key == "/") {
            return Some(ShortcutCommand::ToggleHelp);
        }

        if event.command_modifier() || event.alt {
            return None;
        }

        if event.key.eq_ignore_ascii_case("g") {
            self.chord_started_ms = Some(now_ms);
            return None;
        }

        let started = self.chord_started_ms.take()?;
        if now_ms.saturating_sub(started) >= self.chord_window_ms {
            return None;
        }
        match event.key.as_str() {
            "h" | "H" => Some(ShortcutCommand::Navigate("/")),
            "t" | "T" => Some(ShortcutCommand::Navigate("/tools")),
            _ => None,
        }
    }
}

struct Binding {
    keys: &'static [&'static str],
    /// Keys pressed one after another rather than together.
    sequence: bool,
    description: &'static str,
}

const MODIFIER: &str = "Ctrl";

const HELP_SECTIONS: &[(&str, &[Binding])] = &[
    (
        "Navigation",
        &[
            Binding { keys: &[MODIFIER, "K"], sequence: false, description: "Quick tool switcher" },
            Binding { keys: &["?"], sequence: false, description: "Show this help" },
            Binding { keys: &["G", "H"], sequence: true, description: "Go to Home" },
            Binding { keys: &["G", "T"], sequence: true, description: "Go to Tools" },
        ],
    ),
    (
        "Tool Actions",
        &[
            Binding { keys: &[MODIFIER, "Enter"], sequence: false, description: "Format / Process" },
            Binding { keys: &[MODIFIER, "Shift", "C"], sequence: false, description: "Copy output" },
            Binding { keys: &[MODIFIER, "Shift", "X"], sequence: false, description: "Clear all" },
            Binding { keys: &[MODIFIER, "S"], sequence: false, description: "Download output" },
        ],
    ),
    (
        "Editor",
        &[
            Binding { keys: &[MODIFIER, "Z"], sequence: false, description: "Undo" },
            Binding { keys: &[MODIFIER, "Shift", "Z"], sequence: false, description: "Redo" },
            Binding { keys: &["Tab"], sequence: false, description: "Indent" },
            Binding { keys: &["Shift", "Tab"], sequence: false, description: "Outdent" },
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HelpElements {
    root: NodeId,
    backdrop: NodeId,
    close_button: NodeId,
}

/// Static reference modal listing the key bindings.
#[derive(Debug, Clone)]
pub struct ShortcutsHelp {
    modifier_label: String,
    elements: Option<HelpElements>,
    open: bool,
}

impl ShortcutsHelp {
    pub fn new(modifier_label: impl Into<String>) -> Self {
        Self {
            modifier_label: modifier_label.into(),
            elements: None,
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn ensure_created(&mut self, document: &mut Document) -> ShellResult<()> {
        if let Some(elements) = self.elements
            && document.is_connected(elements.root)
        {
            return Ok(());
        }
        let root = match document.get_element_by_id("shortcuts-modal") {
            Some(root) => root,
            None => self.build(document)?,
        };
        let backdrop = document
            .find_first(root, |element| element.has_class("sm-backdrop"))
            .ok_or_else(|| ShellError::new("help.markup_invalid", "help modal has no backdrop"))?;
        let close_button = document
            .find_first(root, |element| element.has_class("sm-close"))
            .ok_or_else(|| ShellError::new("help.markup_invalid", "help modal has no close button"))?;
        self.elements = Some(HelpElements {
            root,
            backdrop,
            close_button,
        });
        Ok(())
    }

    pub fn open(&mut self, page: &mut Page, hooks: &dyn PageHooks) {
        if let Err(error) = self.ensure_created(&mut page.document) {
            warn!("shortcuts help unavailable: {error}");
            return;
        }
        let Some(elements) = self.elements else {
            return;
        };
        if let Err(error) = page.document.add_class(elements.root, "open") {
            warn!("failed to open shortcuts help: {error}");
            return;
        }
        self.open = true;
        page.set_scroll_locked(true);
        hooks.render_icons(&page.document);
        debug!("shortcuts help opened");
    }

    pub fn close(&mut self, page: &mut Page) {
        if let Some(elements) = self.elements
            && let Err(error) = page.document.remove_class(elements.root, "open")
        {
            warn!("failed to close shortcuts help: {error}");
        }
        self.open = false;
        page.set_scroll_locked(false);
    }

    pub fn toggle(&mut self, page: &mut Page, hooks: &dyn PageHooks) -> bool {
        if self.open {
            self.close(page);
        } else {
            self.open(page, hooks);
        }
        self.open
    }

    /// True for clicks on the backdrop or the close button.
    pub fn is_dismiss_target(&self, document: &Document, target: NodeId) -> bool {
        self.elements.is_some_and(|elements| {
            is_within(document, target, elements.backdrop)
                || is_within(document, target, elements.close_button)
        })
    }

    fn build(&self, document: &mut Document) -> ShellResult<NodeId> {
        let body = document
            .body()
            .ok_or_else(|| ShellError::new("help.body_missing", "document has no <body>"))?;

        let root = document.create_element_with_attrs("div", &[("id", "shortcuts-modal")]);
        let backdrop = document.create_element_with_attrs("div", &[("class", "sm-backdrop")]);
        document.append_child(root, backdrop)?;
        let modal = document.create_element_with_attrs("div", &[("class", "sm-modal")]);
        document.append_child(root, modal)?;

        let header = document.create_element_with_attrs("div", &[("class", "sm-header")]);
        append_text(document, header, "h2", &[], "Keyboard Shortcuts")?;
        let close = document.create_element_with_attrs("button", &[("class", "sm-close")]);
        let icon = document.create_element_with_attrs("i", &[("data-lucide", "x")]);
        document.append_child(close, icon)?;
        document.append_child(header, close)?;
        document.append_child(modal, header)?;

        let content = document.create_element_with_attrs("div", &[("class", "sm-content")]);
        for (title, bindings) in HELP_SECTIONS {
            let section = document.create_element_with_attrs("div", &[("class", "sm-section")]);
            append_text(document, section, "h3", &[], title)?;
            for binding in *bindings {
                self.append_binding(document, section, binding)?;
            }
            document.append_child(content, section)?;
        }
        document.append_child(modal, content)?;

        let footer = document.create_element_with_attrs("div", &[("class", "sm-footer")]);
        let hint = document.create_element_with_attrs("span", &[("class", "sm-hint")]);
        let press = document.create_text("Press ");
        document.append_child(hint, press)?;
        append_text(document, hint, "kbd", &[], "?")?;
        let rest = document.create_text(" anytime to toggle this help");
        document.append_child(hint, rest)?;
        document.append_child(footer, hint)?;
        document.append_child(modal, footer)?;

        document.append_child(body, root)?;
        Ok(root)
    }

    fn append_binding(&self, document: &mut Document, section: NodeId, binding: &Binding) -> ShellResult<()> {
        let row = document.create_element_with_attrs("div", &[("class", "sm-shortcut")]);
        let joiner = if binding.sequence { " then " } else { " + " };
        for (index, key) in binding.keys.iter().enumerate() {
            if index > 0 {
                let text = document.create_text(joiner);
                document.append_child(row, text)?;
            }
            let label: &str = if *key == MODIFIER { &self.modifier_label } else { key };
            append_text(document, row, "kbd", &[], label)?;
        }
        append_text(document, row, "span", &[], binding.description)?;
        document.append_child(section, row)
    }
}

pub(crate) fn append_text(
    document: &mut Document,
    parent: NodeId,
    tag: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> ShellResult<NodeId> {
    let node = document.create_element_with_attrs(tag, attrs);
    let text = document.create_text(text);
    document.append_child(node, text)?;
    document.append_child(parent, node)?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::ActionKind;
    use super::KeyEvent;
    use super::KeyboardShortcuts;
    use super::ShortcutCommand;
    use super::ShortcutsHelp;
    use super::find_action_button;
    use crate::hooks::RecordingHooks;
    use crate::page::Page;
    use sdt_dom::Document;
    use sdt_html::HtmlParser;
    use sdt_net::SiteUrl;

    fn page(document: Document) -> Page {
        match SiteUrl::parse("https://simpledevtools.tech/json-formatter") {
            Ok(url) => Page::new(url, document),
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn modifier_combinations_map_to_commands() {
        let mut keys = KeyboardShortcuts::new(500);
        assert_eq!(keys.dispatch(&KeyEvent::ctrl("k"), false, 0), Some(ShortcutCommand::ToggleSwitcher));
        assert_eq!(keys.dispatch(&KeyEvent::meta("k"), true, 0), Some(ShortcutCommand::ToggleSwitcher));
        assert_eq!(
            keys.dispatch(&KeyEvent::ctrl("Enter"), false, 0),
            Some(ShortcutCommand::Action(ActionKind::Format))
        );
        assert_eq!(
            keys.dispatch(&KeyEvent::ctrl_shift("C"), false, 0),
            Some(ShortcutCommand::Action(ActionKind::Copy))
        );
        assert_eq!(
            keys.dispatch(&KeyEvent::ctrl_shift("X"), true, 0),
            Some(ShortcutCommand::Action(ActionKind::Clear))
        );
        assert_eq!(
            keys.dispatch(&KeyEvent::meta("s"), false, 0),
            Some(ShortcutCommand::Action(ActionKind::Download))
        );
        assert_eq!(keys.dispatch(&KeyEvent::ctrl("C"), false, 0), None);
    }

    #[test]
    fn single_keys_are_ignored_inside_text_inputs() {
        let mut keys = KeyboardShortcuts::new(500);
        assert_eq!(keys.dispatch(&KeyEvent::key("?"), true, 0), None);
        assert_eq!(keys.dispatch(&KeyEvent::key("g"), true, 0), None);
        assert!(!keys.chord_pending());
        assert_eq!(keys.dispatch(&KeyEvent::key("Escape"), true, 0), Some(ShortcutCommand::Escape));

        assert_eq!(keys.dispatch(&KeyEvent::key("?"), false, 0), Some(ShortcutCommand::ToggleHelp));
        assert_eq!(keys.dispatch(&KeyEvent::shift("/"), false, 0), Some(ShortcutCommand::ToggleHelp));
    }

    #[test]
    fn g_chord_navigates_within_the_window() {
        let mut keys = KeyboardShortcuts::new(500);
        assert_eq!(keys.dispatch(&KeyEvent::key("g"), false, 1_000), None);
        assert!(keys.chord_pending());
        assert_eq!(keys.dispatch(&KeyEvent::key("h"), false, 1_499), Some(ShortcutCommand::Navigate("/")));
        assert!(!keys.chord_pending());

        assert_eq!(keys.dispatch(&KeyEvent::key("G"), false, 2_000), None);
        assert_eq!(keys.dispatch(&KeyEvent::key("T"), false, 2_100), Some(ShortcutCommand::Navigate("/tools")));
    }

    #[test]
    fn expired_or_broken_chords_do_nothing() {
        let mut keys = KeyboardShortcuts::new(500);
        keys.dispatch(&KeyEvent::key("g"), false, 0);
        assert_eq!(keys.dispatch(&KeyEvent::key("h"), false, 500), None);
        assert!(!keys.chord_pending());

        keys.dispatch(&KeyEvent::key("g"), false, 1_000);
        assert_eq!(keys.dispatch(&KeyEvent::key("x"), false, 1_100), None);
        assert_eq!(keys.dispatch(&KeyEvent::key("h"), false, 1_200), None);
    }

    #[test]
    fn action_buttons_match_any_pattern_in_document_order() {
        let document = HtmlParser.parse(
            "<body><main>\
             <button class=\"btn\" onclick=\"clearAll()\">Clear</button>\
             <button id=\"copy-btn\">Copy</button>\
             <a class=\"download-btn\" href=\"#\">Save</a>\
             <div data-action=\"format\">Go</div>\
             <button onclick=\"formatJSON()\">Format</button>\
             </main></body>",
        );
        let label = |action| {
            find_action_button(&document, action)
                .map(|node| document.text_content(node))
                .unwrap_or_default()
        };
        assert_eq!(label(ActionKind::Clear), "Clear");
        assert_eq!(label(ActionKind::Copy), "Copy");
        assert_eq!(label(ActionKind::Download), "Save");
        assert_eq!(label(ActionKind::Format), "Go");

        let bare = HtmlParser.parse("<body><div onclick=\"format()\"></div></body>");
        assert_eq!(find_action_button(&bare, ActionKind::Format), None);
    }

    #[test]
    fn help_modal_lists_bindings_and_toggles() {
        let hooks = RecordingHooks::new();
        let mut page = page(Document::page());
        let mut help = ShortcutsHelp::new("Ctrl");

        assert!(help.toggle(&mut page, &hooks));
        assert!(page.scroll_locked());
        let document = &page.document;
        let root = document.get_element_by_id("shortcuts-modal").unwrap_or_default();
        assert!(document.has_class(root, "open"));
        let headings: Vec<String> = document
            .find_all(root, |element| element.tag == "h3")
            .into_iter()
            .map(|node| document.text_content(node))
            .collect();
        assert_eq!(headings, vec!["Navigation", "Tool Actions", "Editor"]);
        let text = document.text_content(root);
        assert!(text.contains("G then H"));
        assert!(text.contains("Ctrl + Shift + C"));
        assert!(!text.contains("F11"));

        let close = document
            .find_first(root, |element| element.has_class("sm-close"))
            .unwrap_or_default();
        assert!(help.is_dismiss_target(document, close));
        assert!(!help.toggle(&mut page, &hooks));
        assert!(!page.scroll_locked());

        help.open(&mut page, &hooks);
        let modals = page
            .document
            .find_all(page.document.root(), |element| element.id() == Some("shortcuts-modal"));
        assert_eq!(modals.len(), 1);
    }

    #[test]
    fn help_uses_the_configured_modifier_label() {
        let hooks = RecordingHooks::new();
        let mut page = page(Document::page());
        let mut help = ShortcutsHelp::new("Cmd");
        help.open(&mut page, &hooks);
        let text = page.document.text_content(page.document.root());
        assert!(text.contains("Cmd + K"));
        assert!(!text.contains("Ctrl"));
        assert_eq!(ActionKind::Copy.shortcut_label("Cmd"), "Cmd+Shift+C");
    }
}
