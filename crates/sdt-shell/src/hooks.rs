//! Side effects the shell delegates to its host.

use sdt_dom::Document;
use sdt_dom::NodeId;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Host integration points the shell calls out to but does not implement.
pub trait PageHooks: Send + Sync {
    /// Turns freshly inserted icon placeholders (`<i data-lucide=...>`) into glyphs.
    /// Called once after every batch of insertions that may contain placeholders.
    fn render_icons(&self, document: &Document);

    /// The user agent's OS-level color-scheme signal.
    fn prefers_dark_color_scheme(&self) -> bool;

    /// Activates a page-specific control, e.g. a tool's format button.
    fn activate_control(&self, document: &Document, node: NodeId);
}

/// Hooks for a host with no icon library and a light color scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl PageHooks for NoopHooks {
    fn render_icons(&self, _document: &Document) {}

    fn prefers_dark_color_scheme(&self) -> bool {
        false
    }

    fn activate_control(&self, _document: &Document, _node: NodeId) {}
}

/// Hooks that count icon passes and remember which controls were activated.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    prefers_dark: bool,
    icon_renders: AtomicUsize,
    activated: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefers_dark(mut self, prefers_dark: bool) -> Self {
        self.prefers_dark = prefers_dark;
        self
    }

    pub fn icon_renders(&self) -> usize {
        self.icon_renders.load(Ordering::SeqCst)
    }

    /// Activated controls, described by id when present and by tag otherwise.
    pub fn activated(&self) -> Vec<String> {
        match self.activated.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PageHooks for RecordingHooks {
    fn render_icons(&self, _document: &Document) {
        self.icon_renders.fetch_add(1, Ordering::SeqCst);
    }

    fn prefers_dark_color_scheme(&self) -> bool {
        self.prefers_dark
    }

    fn activate_control(&self, document: &Document, node: NodeId) {
        let label = document
            .element(node)
            .map(|element| {
                element
                    .id()
                    .map_or_else(|| element.tag.clone(), str::to_owned)
            })
            .unwrap_or_default();
        match self.activated.lock() {
            Ok(mut guard) => guard.push(label),
            Err(poisoned) => poisoned.into_inner().push(label),
        }
    }
}
