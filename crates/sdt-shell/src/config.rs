//! Shell configuration with the site's defaults.

use crate::registry::ToolRegistry;
use crate::router::RouteTable;
use crate::tool_history::MAX_RECENT_TOOLS;

/// Client-storage keys owned by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub theme: String,
    pub recent_tools: String,
    pub favorite_tools: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            theme: "theme".to_owned(),
            recent_tools: "sdt_recent_tools".to_owned(),
            favorite_tools: "sdt_favorite_tools".to_owned(),
        }
    }
}

/// Presentational delays for the mobile menu transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuTiming {
    /// Delay before the overlay fades in and the panel slides in.
    pub reveal_delay_ms: u64,
    /// Delay before the faded overlay stops catching pointer events.
    pub hide_delay_ms: u64,
}

impl Default for MenuTiming {
    fn default() -> Self {
        Self {
            reveal_delay_ms: 10,
            hide_delay_ms: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub routes: RouteTable,
    pub tools: ToolRegistry,
    /// Viewport width at which the mobile menu closes itself.
    pub desktop_breakpoint: u32,
    /// Window for the second key of a `g` chord.
    pub chord_window_ms: u64,
    pub menu_timing: MenuTiming,
    pub storage_keys: StorageKeys,
    pub max_recent_tools: usize,
    /// Modifier name shown in shortcut hints.
    pub modifier_label: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            routes: RouteTable::default(),
            tools: ToolRegistry::default(),
            desktop_breakpoint: 768,
            chord_window_ms: 500,
            menu_timing: MenuTiming::default(),
            storage_keys: StorageKeys::default(),
            max_recent_tools: MAX_RECENT_TOOLS,
            modifier_label: "Ctrl".to_owned(),
        }
    }
}

impl ShellConfig {
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_desktop_breakpoint(mut self, width: u32) -> Self {
        self.desktop_breakpoint = width;
        self
    }

    pub fn with_chord_window_ms(mut self, window_ms: u64) -> Self {
        self.chord_window_ms = window_ms;
        self
    }

    pub fn with_menu_timing(mut self, timing: MenuTiming) -> Self {
        self.menu_timing = timing;
        self
    }

    pub fn with_storage_keys(mut self, keys: StorageKeys) -> Self {
        self.storage_keys = keys;
        self
    }

    pub fn with_max_recent_tools(mut self, max: usize) -> Self {
        self.max_recent_tools = max;
        self
    }

    pub fn with_modifier_label(mut self, label: impl Into<String>) -> Self {
        self.modifier_label = label.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::ShellConfig;

    #[test]
    fn defaults_match_site_behaviour() {
        let config = ShellConfig::default();
        assert_eq!(config.desktop_breakpoint, 768);
        assert_eq!(config.chord_window_ms, 500);
        assert_eq!(config.menu_timing.reveal_delay_ms, 10);
        assert_eq!(config.menu_timing.hide_delay_ms, 300);
        assert_eq!(config.storage_keys.recent_tools, "sdt_recent_tools");
        assert_eq!(config.max_recent_tools, 5);
        assert!(config.routes.contains("/"));
    }
}
