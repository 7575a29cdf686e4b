//! Slide-out navigation panel for narrow viewports.

use crate::config::MenuTiming;
use crate::hooks::PageHooks;
use crate::layout::Chrome;
use crate::page::Page;
use log::debug;
use log::warn;
use sdt_core::ShellError;
use sdt_core::ShellResult;
use sdt_dom::Document;
use sdt_dom::NodeId;
use sdt_html::HtmlParser;

const PANEL_HIDDEN_CLASS: &str = "translate-x-full";
const OVERLAY_HIDDEN_CLASS: &str = "opacity-0";
const OVERLAY_INERT_CLASS: &str = "pointer-events-none";
const LINK_CLASS: &str = "mobile-menu-link";

const TRIGGER_MARKUP: &str = r#"<button id="mobile-menu-button" class="md:hidden p-2 text-neutral-600 dark:text-neutral-400 hover:text-black dark:hover:text-white transition-colors" aria-label="Toggle menu" aria-expanded="false">
    <i data-lucide="menu" class="w-5 h-5"></i>
</button>"#;

const OVERLAY_MARKUP: &str = r#"<div id="mobile-menu-overlay" class="fixed inset-0 bg-black/50 backdrop-blur-sm z-40 opacity-0 pointer-events-none transition-opacity duration-300 md:hidden"></div>"#;

const PANEL_MARKUP: &str = r##"<div id="mobile-menu" class="fixed top-0 right-0 h-full w-72 bg-white dark:bg-neutral-950 border-l border-neutral-200 dark:border-neutral-800 z-50 transform translate-x-full transition-transform duration-300 ease-in-out md:hidden">
    <div class="flex flex-col h-full">
        <div class="flex items-center justify-between p-6 border-b border-neutral-200 dark:border-neutral-800">
            <span class="font-display font-semibold text-lg text-neutral-900 dark:text-white">Menu</span>
            <button id="menu-close" class="p-2 text-neutral-500 hover:text-black dark:hover:text-white transition-colors" aria-label="Close menu">
                <i data-lucide="x" class="w-5 h-5"></i>
            </button>
        </div>
        <nav class="flex-1 p-6 space-y-1">
            <a href="/" class="flex items-center gap-3 px-4 py-3 rounded-lg text-neutral-600 dark:text-neutral-400">
                <i data-lucide="home" class="w-5 h-5"></i>
                <span>Home</span>
            </a>
            <a href="/tools" class="mobile-menu-link flex items-center gap-3 px-4 py-3 rounded-lg text-neutral-600 dark:text-neutral-400">
                <i data-lucide="grid-3x3" class="w-5 h-5"></i>
                <span>Tools</span>
            </a>
            <a href="/how-it-works" class="flex items-center gap-3 px-4 py-3 rounded-lg text-neutral-600 dark:text-neutral-400">
                <i data-lucide="info" class="w-5 h-5"></i>
                <span>How It Works</span>
            </a>
            <a href="https://github.com/helloimabid/" target="_blank" class="flex items-center gap-3 px-4 py-3 rounded-lg text-neutral-600 dark:text-neutral-400">
                <i data-lucide="github" class="w-5 h-5"></i>
                <span>GitHub</span>
            </a>
        </nav>
        <div class="p-6 border-t border-neutral-200 dark:border-neutral-800">
            <button id="mobile-theme-toggle" class="flex items-center gap-3 w-full px-4 py-3 rounded-lg text-neutral-600 dark:text-neutral-400">
                <i data-lucide="sun" class="w-5 h-5 block dark:hidden"></i>
                <i data-lucide="moon" class="w-5 h-5 hidden dark:block"></i>
                <span>Toggle Theme</span>
            </button>
            <p class="text-xs text-neutral-400 mt-4 px-4">&copy; SimpleDevTools.tech</p>
        </div>
    </div>
</div>"##;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Closed,
    Open,
}

/// Elements the controller drives, resolved once at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuElements {
    pub trigger: NodeId,
    pub panel: NodeId,
    pub overlay: NodeId,
    pub close_button: Option<NodeId>,
    pub theme_toggle: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuStep {
    /// Fade the overlay in and slide the panel into view.
    Reveal,
    /// Stop the faded overlay from catching pointer events.
    DisableOverlayPointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledStep {
    due_ms: u64,
    step: MenuStep,
}

/// What a click inside the menu's elements amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuClick {
    /// The click did not touch the menu.
    Outside,
    /// The menu handled the click.
    Handled,
    /// The panel's theme toggle was clicked; the caller flips the theme.
    ThemeToggle,
}

/// Closed/open state machine over the mobile panel and its overlay.
#[derive(Debug, Clone)]
pub struct MobileMenu {
    state: MenuState,
    elements: MenuElements,
    timing: MenuTiming,
    desktop_breakpoint: u32,
    pending: Vec<ScheduledStep>,
}

impl MobileMenu {
    /// Binds to the trigger in the injected navigation bar, creating the
    /// trigger, overlay and panel when the page does not already carry them.
    pub fn initialize(
        document: &mut Document,
        chrome: &Chrome,
        timing: MenuTiming,
        desktop_breakpoint: u32,
        hooks: &dyn PageHooks,
    ) -> ShellResult<Self> {
        let mut inserted = false;

        let trigger = match document.get_element_by_id("mobile-menu-button") {
            Some(trigger) => trigger,
            None => {
                let container = chrome.nav_container.ok_or_else(|| {
                    ShellError::new(
                        "menu.trigger_missing",
                        "navigation bar has no container for the menu trigger",
                    )
                })?;
                inserted = true;
                insert_markup(document, container, TRIGGER_MARKUP, "mobile-menu-button")?
            }
        };

        let body = document
            .body()
            .ok_or_else(|| ShellError::new("menu.body_missing", "document has no <body>"))?;

        let overlay = match document.get_element_by_id("mobile-menu-overlay") {
            Some(overlay) => overlay,
            None => {
                inserted = true;
                insert_markup(document, body, OVERLAY_MARKUP, "mobile-menu-overlay")?
            }
        };

        let panel = match document.get_element_by_id("mobile-menu") {
            Some(panel) => panel,
            None => {
                inserted = true;
                insert_markup(document, body, PANEL_MARKUP, "mobile-menu")?
            }
        };

        if inserted {
            hooks.render_icons(document);
        }

        let elements = MenuElements {
            trigger,
            panel,
            overlay,
            close_button: document
                .get_element_by_id("menu-close")
                .filter(|node| is_within(document, *node, panel)),
            theme_toggle: document
                .get_element_by_id("mobile-theme-toggle")
                .filter(|node| is_within(document, *node, panel)),
        };
        debug!("mobile menu bound to trigger node {trigger}");

        Ok(Self {
            state: MenuState::Closed,
            elements,
            timing,
            desktop_breakpoint,
            pending: Vec::new(),
        })
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == MenuState::Open
    }

    pub fn elements(&self) -> &MenuElements {
        &self.elements
    }

    /// Number of presentational steps still waiting for the clock.
    pub fn pending_steps(&self) -> usize {
        self.pending.len()
    }

    pub fn open(&mut self, page: &mut Page, hooks: &dyn PageHooks) {
        if self.is_open() {
            return;
        }
        self.state = MenuState::Open;
        self.pending.clear();

        let overlay = self.elements.overlay;
        update(&mut page.document, |document| document.remove_class(overlay, OVERLAY_INERT_CLASS));
        self.schedule(page, self.timing.reveal_delay_ms, MenuStep::Reveal);
        page.set_scroll_locked(true);
        self.set_trigger_icon(&mut page.document, "x", true);
        hooks.render_icons(&page.document);
        debug!("mobile menu opened");
    }

    pub fn close(&mut self, page: &mut Page, hooks: &dyn PageHooks) {
        if !self.is_open() {
            return;
        }
        self.state = MenuState::Closed;
        self.pending.clear();

        let MenuElements { panel, overlay, .. } = self.elements;
        update(&mut page.document, |document| document.add_class(panel, PANEL_HIDDEN_CLASS));
        update(&mut page.document, |document| document.add_class(overlay, OVERLAY_HIDDEN_CLASS));
        self.schedule(page, self.timing.hide_delay_ms, MenuStep::DisableOverlayPointer);
        page.set_scroll_locked(false);
        self.set_trigger_icon(&mut page.document, "menu", false);
        hooks.render_icons(&page.document);
        debug!("mobile menu closed");
    }

    pub fn toggle(&mut self, page: &mut Page, hooks: &dyn PageHooks) -> MenuState {
        match self.state {
            MenuState::Closed => self.open(page, hooks),
            MenuState::Open => self.close(page, hooks),
        }
        self.state
    }

    /// Escape closes an open menu. Returns whether the key was consumed.
    pub fn on_escape(&mut self, page: &mut Page, hooks: &dyn PageHooks) -> bool {
        if !self.is_open() {
            return false;
        }
        self.close(page, hooks);
        true
    }

    /// Closes an open menu once the viewport reaches desktop width.
    pub fn on_resize(&mut self, page: &mut Page, hooks: &dyn PageHooks) {
        if self.is_open() && page.viewport_width() >= self.desktop_breakpoint {
            self.close(page, hooks);
        }
    }

    /// Routes a click on `target` to the transition it triggers.
    pub fn on_click(&mut self, page: &mut Page, hooks: &dyn PageHooks, target: NodeId) -> MenuClick {
        let document = &page.document;
        let elements = self.elements;

        if is_within(document, target, elements.trigger) {
            self.toggle(page, hooks);
            return MenuClick::Handled;
        }
        if target == elements.overlay
            || elements
                .close_button
                .is_some_and(|close| is_within(document, target, close))
        {
            self.close(page, hooks);
            return MenuClick::Handled;
        }
        if elements
            .theme_toggle
            .is_some_and(|toggle| is_within(document, target, toggle))
        {
            return MenuClick::ThemeToggle;
        }
        let in_page_link = closest_with_class(document, target, LINK_CLASS)
            .filter(|link| is_within(document, *link, elements.panel))
            .and_then(|link| document.attribute(link, "href"))
            .is_some_and(|href| href.starts_with('#'));
        if in_page_link {
            self.close(page, hooks);
            return MenuClick::Handled;
        }
        MenuClick::Outside
    }

    /// Runs every presentational step whose delay has elapsed on the page clock.
    pub fn advance(&mut self, page: &mut Page) {
        let now = page.now_ms();
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|scheduled| scheduled.due_ms <= now);
        self.pending = waiting;

        let MenuElements { panel, overlay, .. } = self.elements;
        for scheduled in due {
            match scheduled.step {
                MenuStep::Reveal => {
                    update(&mut page.document, |document| {
                        document.remove_class(overlay, OVERLAY_HIDDEN_CLASS)
                    });
                    update(&mut page.document, |document| {
                        document.remove_class(panel, PANEL_HIDDEN_CLASS)
                    });
                }
                MenuStep::DisableOverlayPointer => {
                    update(&mut page.document, |document| {
                        document.add_class(overlay, OVERLAY_INERT_CLASS)
                    });
                }
            }
        }
    }

    fn schedule(&mut self, page: &Page, delay_ms: u64, step: MenuStep) {
        self.pending.push(ScheduledStep {
            due_ms: page.now_ms().saturating_add(delay_ms),
            step,
        });
    }

    fn set_trigger_icon(&self, document: &mut Document, icon: &str, expanded: bool) {
        let trigger = self.elements.trigger;
        let placeholder = match document.first_element_by_tag(trigger, "i") {
            Some(node) => node,
            None => {
                let node = document.create_element("i");
                if let Err(error) = document.append_child(trigger, node) {
                    warn!("failed to add menu trigger icon: {error}");
                    return;
                }
                node
            }
        };
        update(document, |document| document.set_attribute(placeholder, "data-lucide", icon));
        let expanded = if expanded { "true" } else { "false" };
        update(document, |document| document.set_attribute(trigger, "aria-expanded", expanded));
    }
}

fn update(document: &mut Document, change: impl FnOnce(&mut Document) -> ShellResult<()>) {
    if let Err(error) = change(document) {
        warn!("mobile menu update failed: {error}");
    }
}

fn insert_markup(
    document: &mut Document,
    parent: NodeId,
    markup: &str,
    id: &str,
) -> ShellResult<NodeId> {
    for node in HtmlParser.parse_fragment(document, markup) {
        document.append_child(parent, node)?;
    }
    document
        .get_element_by_id(id)
        .ok_or_else(|| ShellError::new("menu.markup_invalid", format!("menu markup has no #{id}")))
}

/// True when `node` is `ancestor` or sits below it.
pub(crate) fn is_within(document: &Document, node: NodeId, ancestor: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = document.parent(id);
    }
    false
}

pub(crate) fn closest_with_class(document: &Document, node: NodeId, class: &str) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(id) = current {
        if document.has_class(id, class) {
            return Some(id);
        }
        current = document.parent(id);
    }
    None
}
