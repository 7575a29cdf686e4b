//! Client shell for the SimpleDevTools static site.
//!
//! [`Shell`] owns one page context and wires the components together in boot
//! order: theme first, then the injected chrome, then everything that attaches
//! to the chrome. Event entry points (`click`, `key_down`, `resize`, history
//! moves) dispatch to the component that owns the target.

pub mod config;
pub mod enhancements;
pub mod hooks;
pub mod layout;
pub mod menu;
pub mod page;
pub mod registry;
pub mod router;
pub mod shortcuts;
pub mod switcher;
pub mod theme;
pub mod tool_history;

pub use config::MenuTiming;
pub use config::ShellConfig;
pub use config::StorageKeys;
pub use enhancements::add_breadcrumbs;
pub use enhancements::enhance_action_buttons;
pub use hooks::NoopHooks;
pub use hooks::PageHooks;
pub use hooks::RecordingHooks;
pub use layout::Chrome;
pub use layout::inject_chrome;
pub use menu::MenuClick;
pub use menu::MenuElements;
pub use menu::MenuState;
pub use menu::MobileMenu;
pub use page::Page;
pub use registry::ToolEntry;
pub use registry::ToolRegistry;
pub use router::LinkAction;
pub use router::RouteEntry;
pub use router::RouteOutcome;
pub use router::RouteTable;
pub use router::Router;
pub use shortcuts::ActionKind;
pub use shortcuts::KeyEvent;
pub use shortcuts::KeyboardShortcuts;
pub use shortcuts::ShortcutCommand;
pub use shortcuts::ShortcutsHelp;
pub use shortcuts::find_action_button;
pub use switcher::FilteredTools;
pub use switcher::QuickSwitcher;
pub use switcher::SwitcherKey;
pub use switcher::filter_tools;
pub use theme::Theme;
pub use theme::ThemeStore;
pub use tool_history::ToolHistory;

use log::debug;
use log::error;
use log::info;
use log::warn;
use sdt_dom::NodeId;
use sdt_net::Fetcher;
use sdt_net::SiteUrl;
use sdt_storage::KeyValueStore;
use std::sync::Arc;

/// What boot set up on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootSummary {
    pub theme: Theme,
    pub chrome: Option<Chrome>,
    pub menu_ready: bool,
    /// Tool path recorded as a recent visit, if the page is a tool page.
    pub tracked_tool: Option<String>,
    pub enhanced_buttons: usize,
    pub breadcrumbs: bool,
}

/// Result of delivering one event to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// No shell component reacted; the host's default behaviour applies.
    Ignored,
    Handled,
    /// The client router handled a navigation.
    Routed(RouteOutcome),
    /// A browser-native load of the URL was requested.
    FullNavigation(SiteUrl),
}

/// One page context with every shell component attached.
pub struct Shell {
    config: ShellConfig,
    page: Page,
    hooks: Arc<dyn PageHooks>,
    themes: ThemeStore,
    history: ToolHistory,
    router: Option<Router>,
    chrome: Option<Chrome>,
    theme_toggle: Option<NodeId>,
    menu: Option<MobileMenu>,
    switcher: QuickSwitcher,
    help: ShortcutsHelp,
    keys: KeyboardShortcuts,
}

impl Shell {
    pub fn new(
        config: ShellConfig,
        page: Page,
        store: Arc<dyn KeyValueStore>,
        hooks: Arc<dyn PageHooks>,
    ) -> Self {
        let keys = &config.storage_keys;
        let themes = ThemeStore::new(store.clone(), keys.theme.clone());
        let history = ToolHistory::new(store, keys.recent_tools.clone(), keys.favorite_tools.clone())
            .with_max_recent(config.max_recent_tools);
        let help = ShortcutsHelp::new(config.modifier_label.clone());
        let keys = KeyboardShortcuts::new(config.chord_window_ms);
        Self {
            config,
            page,
            hooks,
            themes,
            history,
            router: None,
            chrome: None,
            theme_toggle: None,
            menu: None,
            switcher: QuickSwitcher::new(),
            help,
            keys,
        }
    }

    /// Routes internal navigation through `fetcher` instead of full page loads.
    pub fn with_router(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.router = Some(Router::new(self.config.routes.clone(), fetcher));
        self
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn into_page(self) -> Page {
        self.page
    }

    pub fn themes(&self) -> &ThemeStore {
        &self.themes
    }

    pub fn theme(&self) -> Theme {
        self.themes.current(&self.page.document)
    }

    pub fn tool_history(&self) -> &ToolHistory {
        &self.history
    }

    pub fn chrome(&self) -> Option<&Chrome> {
        self.chrome.as_ref()
    }

    /// Theme toggle currently bound for clicks.
    pub fn theme_toggle(&self) -> Option<NodeId> {
        self.theme_toggle
    }

    pub fn menu(&self) -> Option<&MobileMenu> {
        self.menu.as_ref()
    }

    pub fn switcher(&self) -> &QuickSwitcher {
        &self.switcher
    }

    pub fn help(&self) -> &ShortcutsHelp {
        &self.help
    }

    pub fn has_router(&self) -> bool {
        self.router.is_some()
    }

    /// Runs the page-load sequence. Failures of one component are logged and
    /// leave the remaining components working.
    pub fn boot(&mut self) -> BootSummary {
        let hooks = self.hooks.clone();
        let theme = self.themes.initialize(&mut self.page.document, hooks.as_ref());

        self.chrome = match inject_chrome(&mut self.page.document, hooks.as_ref()) {
            Ok(chrome) => Some(chrome),
            Err(error) => {
                error!("site chrome not injected: {error}");
                None
            }
        };
        self.theme_toggle = self.chrome.and_then(|chrome| chrome.theme_toggle);

        self.menu = self.chrome.and_then(|chrome| {
            MobileMenu::initialize(
                &mut self.page.document,
                &chrome,
                self.config.menu_timing,
                self.config.desktop_breakpoint,
                hooks.as_ref(),
            )
            .map_err(|error| error!("mobile menu disabled: {error}"))
            .ok()
        });

        let enhancements = self.refresh_page_enhancements();
        let summary = BootSummary {
            theme,
            chrome: self.chrome,
            menu_ready: self.menu.is_some(),
            tracked_tool: enhancements.tracked_tool,
            enhanced_buttons: enhancements.enhanced_buttons,
            breadcrumbs: enhancements.breadcrumbs,
        };
        info!(
            "shell booted on {} (theme {}, menu {})",
            self.page.path(),
            theme.as_str(),
            if summary.menu_ready { "ready" } else { "unavailable" }
        );
        summary
    }

    /// Delivers a click on `target`.
    pub async fn click(&mut self, target: NodeId) -> EventOutcome {
        let hooks = self.hooks.clone();

        if let Some(menu) = self.menu.as_mut() {
            match menu.on_click(&mut self.page, hooks.as_ref(), target) {
                MenuClick::Handled => return EventOutcome::Handled,
                MenuClick::ThemeToggle => {
                    self.themes.toggle(&mut self.page.document);
                    hooks.render_icons(&self.page.document);
                    return EventOutcome::Handled;
                }
                MenuClick::Outside => {}
            }
        }

        if self
            .theme_toggle
            .is_some_and(|toggle| menu::is_within(&self.page.document, target, toggle))
        {
            self.themes.toggle(&mut self.page.document);
            return EventOutcome::Handled;
        }

        if self.switcher.is_open() {
            if self.switcher.is_backdrop(&self.page.document, target) {
                self.switcher.close(&mut self.page);
                return EventOutcome::Handled;
            }
            if let Some(path) = self.switcher.result_at(&self.page.document, target) {
                self.switcher.close(&mut self.page);
                return self.navigate(&path).await;
            }
        }

        if self.help.is_open() && self.help.is_dismiss_target(&self.page.document, target) {
            self.help.close(&mut self.page);
            return EventOutcome::Handled;
        }

        let Some(anchor) = self.page.document.closest(target, "a") else {
            return EventOutcome::Ignored;
        };
        if self.page.document.attribute(anchor, "target") == Some("_blank") {
            return EventOutcome::Ignored;
        }
        let href = self.page.document.attribute(anchor, "href").map(str::to_owned);
        match router::classify_link(href.as_deref()) {
            LinkAction::Browser => EventOutcome::Ignored,
            LinkAction::Navigate(path) => self.navigate(&path).await,
        }
    }

    /// Delivers a key press to the focused switcher input, then the menu,
    /// then the global shortcut listener.
    pub async fn key_down(&mut self, event: KeyEvent) -> EventOutcome {
        let hooks = self.hooks.clone();

        let switcher_focused = self.switcher.is_open()
            && self.switcher.input().is_some()
            && self.page.focused() == self.switcher.input();
        if switcher_focused {
            match self.switcher.handle_key(&mut self.page, &event.key) {
                SwitcherKey::Activate(path) => {
                    self.switcher.close(&mut self.page);
                    return self.navigate(&path).await;
                }
                SwitcherKey::Handled => return EventOutcome::Handled,
                SwitcherKey::Ignored => {}
            }
        }

        let in_text_input = self.page.focus_in_text_input();
        let Some(command) = self.keys.dispatch(&event, in_text_input, self.page.now_ms()) else {
            return EventOutcome::Ignored;
        };
        debug!("key {:?} mapped to {command:?}", event.key);

        match command {
            ShortcutCommand::ToggleSwitcher => {
                self.switcher.toggle(
                    &mut self.page,
                    &self.config.tools,
                    &self.history,
                    hooks.as_ref(),
                );
                EventOutcome::Handled
            }
            ShortcutCommand::Escape => {
                if self.switcher.is_open() {
                    self.switcher.close(&mut self.page);
                    EventOutcome::Handled
                } else if self.help.is_open() {
                    self.help.close(&mut self.page);
                    EventOutcome::Handled
                } else if self
                    .menu
                    .as_mut()
                    .is_some_and(|menu| menu.on_escape(&mut self.page, hooks.as_ref()))
                {
                    EventOutcome::Handled
                } else {
                    EventOutcome::Ignored
                }
            }
            ShortcutCommand::ToggleHelp => {
                self.help.toggle(&mut self.page, hooks.as_ref());
                EventOutcome::Handled
            }
            ShortcutCommand::Navigate(path) => self.navigate(path).await,
            ShortcutCommand::Action(action) => match find_action_button(&self.page.document, action) {
                Some(button) => {
                    hooks.activate_control(&self.page.document, button);
                    EventOutcome::Handled
                }
                None => EventOutcome::Ignored,
            },
        }
    }

    /// Types `query` into the open switcher.
    pub fn type_query(&mut self, query: &str) {
        if !self.switcher.is_open() {
            return;
        }
        self.switcher.set_query(
            &mut self.page,
            &self.config.tools,
            &self.history,
            self.hooks.as_ref(),
            query,
        );
    }

    pub fn resize(&mut self, width: u32) {
        self.page.set_viewport_width(width);
        if let Some(menu) = self.menu.as_mut() {
            menu.on_resize(&mut self.page, self.hooks.as_ref());
        }
    }

    /// Advances the page clock and runs due presentational steps.
    pub fn advance_clock(&mut self, elapsed_ms: u64) {
        self.page.advance_clock(elapsed_ms);
        if let Some(menu) = self.menu.as_mut() {
            menu.advance(&mut self.page);
        }
    }

    /// Browser back button.
    pub async fn back(&mut self) -> EventOutcome {
        if !self.page.back() {
            return EventOutcome::Ignored;
        }
        self.pop_state().await
    }

    /// Browser forward button.
    pub async fn forward(&mut self) -> EventOutcome {
        if !self.page.forward() {
            return EventOutcome::Ignored;
        }
        self.pop_state().await
    }

    async fn pop_state(&mut self) -> EventOutcome {
        let Some(router) = self.router.as_ref() else {
            let location = self.page.location().clone();
            self.page.navigate_full(location.clone());
            return EventOutcome::FullNavigation(location);
        };
        let outcome = router.load_page(&mut self.page, self.hooks.as_ref()).await;
        self.after_route(&outcome);
        EventOutcome::Routed(outcome)
    }

    /// Navigates through the router when present, else requests a full load.
    pub async fn navigate(&mut self, path: &str) -> EventOutcome {
        match self.router.as_ref() {
            Some(router) => {
                let outcome = router.navigate(&mut self.page, self.hooks.as_ref(), path).await;
                self.after_route(&outcome);
                EventOutcome::Routed(outcome)
            }
            None => match self.page.location().join(path) {
                Ok(url) => {
                    self.page.navigate_full(url.clone());
                    EventOutcome::FullNavigation(url)
                }
                Err(error) => {
                    warn!("cannot navigate to `{path}`: {error}");
                    EventOutcome::Ignored
                }
            },
        }
    }

    fn after_route(&mut self, outcome: &RouteOutcome) {
        let RouteOutcome::Loaded { theme_toggle, .. } = outcome else {
            return;
        };
        self.theme_toggle = *theme_toggle;
        if let Some(menu) = self.menu.as_mut() {
            menu.close(&mut self.page, self.hooks.as_ref());
        }
        self.refresh_page_enhancements();
    }

    /// Visit tracking, shortcut hints and breadcrumbs for the current main content.
    fn refresh_page_enhancements(&mut self) -> PageEnhancements {
        let path = self.page.path().to_owned();
        let tracked_tool = self
            .history
            .track_visit(&self.config.tools, &path)
            .map(|tool| tool.path.clone());
        let enhanced_buttons = enhance_action_buttons(&mut self.page.document, &self.config.modifier_label);
        let breadcrumbs = add_breadcrumbs(
            &mut self.page.document,
            &path,
            &self.config.tools,
            self.hooks.as_ref(),
        );
        PageEnhancements {
            tracked_tool,
            enhanced_buttons,
            breadcrumbs,
        }
    }
}

struct PageEnhancements {
    tracked_tool: Option<String>,
    enhanced_buttons: usize,
    breadcrumbs: bool,
}
