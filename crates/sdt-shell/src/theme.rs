//! Dark/light preference persisted in key-value storage and reflected on `<html>`.

use crate::hooks::PageHooks;
use log::debug;
use log::warn;
use sdt_core::ShellResult;
use sdt_dom::Document;
use sdt_storage::KeyValueStore;
use std::sync::Arc;

/// Class toggled on the document element for the dark theme.
pub const DARK_CLASS: &str = "dark";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

/// Reads and writes the theme key.
#[derive(Clone)]
pub struct ThemeStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl ThemeStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The explicitly stored preference, if any. Unknown values count as unset.
    pub fn stored(&self) -> Option<Theme> {
        match self.store.get(&self.key) {
            Ok(value) => value.as_deref().and_then(Theme::parse),
            Err(error) => {
                warn!("theme preference unavailable: {error}");
                None
            }
        }
    }

    /// Stored preference, else the host's color-scheme signal.
    pub fn preference(&self, hooks: &dyn PageHooks) -> Theme {
        self.stored().unwrap_or_else(|| {
            if hooks.prefers_dark_color_scheme() {
                Theme::Dark
            } else {
                Theme::Light
            }
        })
    }

    /// Theme currently reflected on the document.
    pub fn current(&self, document: &Document) -> Theme {
        let dark = document
            .document_element()
            .is_some_and(|root| document.has_class(root, DARK_CLASS));
        if dark { Theme::Dark } else { Theme::Light }
    }

    /// Reflects the resolved preference before anything themed is shown.
    pub fn initialize(&self, document: &mut Document, hooks: &dyn PageHooks) -> Theme {
        let theme = self.preference(hooks);
        if let Err(error) = apply(document, theme) {
            warn!("failed to apply theme: {error}");
        }
        theme
    }

    /// Applies `theme` to the document, then persists it. A failed write only
    /// loses persistence; the document keeps the new theme.
    pub fn set_preference(&self, document: &mut Document, theme: Theme) {
        if let Err(error) = apply(document, theme) {
            warn!("failed to apply theme: {error}");
        }
        if let Err(error) = self.store.set(&self.key, theme.as_str()) {
            warn!("failed to persist theme preference: {error}");
        }
        debug!("theme set to {}", theme.as_str());
    }

    pub fn toggle(&self, document: &mut Document) -> Theme {
        let next = self.current(document).flipped();
        self.set_preference(document, next);
        next
    }
}

fn apply(document: &mut Document, theme: Theme) -> ShellResult<()> {
    document.ensure_page_skeleton();
    let Some(root) = document.document_element() else {
        return Ok(());
    };
    match theme {
        Theme::Dark => document.add_class(root, DARK_CLASS),
        Theme::Light => document.remove_class(root, DARK_CLASS),
    }
}

#[cfg(test)]
mod tests {
    use super::Theme;
    use super::ThemeStore;
    use crate::hooks::RecordingHooks;
    use sdt_dom::Document;
    use sdt_storage::KeyValueStore;
    use sdt_storage::MemoryStore;
    use sdt_storage::PartitionStore;
    use sdt_storage::SessionStore;
    use sdt_storage::StorageConfig;
    use std::sync::Arc;

    fn store() -> (ThemeStore, Arc<MemoryStore>) {
        let backing = Arc::new(MemoryStore::new());
        (ThemeStore::new(backing.clone(), "theme"), backing)
    }

    #[test]
    fn falls_back_to_color_scheme_when_unset() {
        let (themes, _backing) = store();
        let mut document = Document::page();
        let hooks = RecordingHooks::new().with_prefers_dark(true);

        assert_eq!(themes.stored(), None);
        assert_eq!(themes.initialize(&mut document, &hooks), Theme::Dark);
        assert_eq!(themes.current(&document), Theme::Dark);
    }

    #[test]
    fn stored_preference_wins_over_color_scheme() {
        let (themes, backing) = store();
        assert!(backing.set("theme", "light").is_ok());
        let mut document = Document::page();
        let hooks = RecordingHooks::new().with_prefers_dark(true);

        assert_eq!(themes.initialize(&mut document, &hooks), Theme::Light);
        assert_eq!(themes.current(&document), Theme::Light);
    }

    #[test]
    fn toggle_flips_and_persists() {
        let (themes, backing) = store();
        let mut document = Document::page();

        assert_eq!(themes.toggle(&mut document), Theme::Dark);
        assert_eq!(backing.get("theme"), Ok(Some("dark".to_owned())));
        assert_eq!(themes.toggle(&mut document), Theme::Light);
        assert_eq!(backing.get("theme"), Ok(Some("light".to_owned())));
    }

    #[test]
    fn unavailable_storage_still_themes_the_document() {
        let ephemeral = PartitionStore::new(
            StorageConfig {
                partition_by_top_level_site: true,
                ephemeral_mode: true,
            },
            "simpledevtools.tech",
        );
        let session = Arc::new(SessionStore::new(Box::new(ephemeral)));
        let themes = ThemeStore::new(session.clone(), "theme");
        let mut document = Document::page();

        themes.set_preference(&mut document, Theme::Dark);
        assert_eq!(themes.current(&document), Theme::Dark);
        assert!(session.is_degraded());
        assert_eq!(themes.stored(), Some(Theme::Dark));
    }
}
