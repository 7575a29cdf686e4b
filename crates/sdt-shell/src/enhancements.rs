//! Page enhancements applied at boot: shortcut hints on action buttons and
//! breadcrumbs on tool pages.

use crate::hooks::PageHooks;
use crate::registry::ToolRegistry;
use crate::shortcuts::ActionKind;
use crate::shortcuts::append_text;
use log::debug;
use log::warn;
use sdt_core::ShellResult;
use sdt_dom::Document;
use sdt_dom::ElementData;
use sdt_dom::NodeId;

const ENHANCED_ATTR: &str = "data-shortcut-enhanced";
const HINT_CLASS: &str = "kbd-hint";

struct ButtonHint {
    action: ActionKind,
    label: &'static str,
    handlers: &'static [&'static str],
    id_fragment: Option<&'static str>,
}

impl ButtonHint {
    fn matches(&self, element: &ElementData) -> bool {
        let handler_match = element
            .attr("onclick")
            .is_some_and(|handler| self.handlers.iter().any(|name| handler.contains(name)));
        let id_match = self
            .id_fragment
            .is_some_and(|fragment| element.id().is_some_and(|id| id.contains(fragment)));
        handler_match || id_match
    }
}

const BUTTON_HINTS: &[ButtonHint] = &[
    ButtonHint {
        action: ActionKind::Copy,
        label: "Copy",
        handlers: &["copyOutput", "copyResult"],
        id_fragment: Some("copy-btn"),
    },
    ButtonHint {
        action: ActionKind::Clear,
        label: "Clear",
        handlers: &["clearAll", "clearInput", "clearFields"],
        id_fragment: None,
    },
    ButtonHint {
        action: ActionKind::Download,
        label: "Download",
        handlers: &["downloadResult", "download"],
        id_fragment: None,
    },
    ButtonHint {
        action: ActionKind::Format,
        label: "Format",
        handlers: &["format", "beautify", "process"],
        id_fragment: None,
    },
];

/// Adds the shortcut to the title of recognised action controls and a
/// `kbd` hint after their label. Controls are marked so repeated runs skip
/// them. Returns how many controls were enhanced.
pub fn enhance_action_buttons(document: &mut Document, modifier_label: &str) -> usize {
    let mut enhanced = 0;
    for hint in BUTTON_HINTS {
        let shortcut = hint.action.shortcut_label(modifier_label);
        let controls = document.find_all(document.root(), |element| hint.matches(element));
        for control in controls {
            if document.has_attribute(control, ENHANCED_ATTR) {
                continue;
            }
            match enhance_control(document, control, hint.label, &shortcut) {
                Ok(()) => enhanced += 1,
                Err(error) => warn!("failed to enhance action control: {error}"),
            }
        }
    }
    if enhanced > 0 {
        debug!("enhanced {enhanced} action controls with shortcut hints");
    }
    enhanced
}

fn enhance_control(document: &mut Document, control: NodeId, label: &str, shortcut: &str) -> ShellResult<()> {
    document.set_attribute(control, ENHANCED_ATTR, "true")?;
    let title = document
        .attribute(control, "title")
        .unwrap_or(label)
        .to_owned();
    document.set_attribute(control, "title", &format!("{title} ({shortcut})"))?;

    let Some(text) = document.first_element_by_tag(control, "span") else {
        return Ok(());
    };
    if document
        .find_first(control, |element| element.has_class(HINT_CLASS))
        .is_some()
    {
        return Ok(());
    }
    let Some(parent) = document.parent(text) else {
        return Ok(());
    };
    let next = document
        .children(parent)
        .iter()
        .position(|child| *child == text)
        .and_then(|position| document.children(parent).get(position + 1).copied());
    let kbd = document.create_element_with_attrs(
        "kbd",
        &[(
            "class",
            "kbd-hint hidden sm:inline-flex ml-1.5 px-1 py-0.5 text-[9px] font-mono rounded",
        )],
    );
    let content = document.create_text(shortcut);
    document.append_child(kbd, content)?;
    document.insert_before(parent, kbd, next)
}

/// Inserts a Home › Tools › tool breadcrumb at the top of `<main>` on tool
/// pages. Returns whether one was inserted.
pub fn add_breadcrumbs(
    document: &mut Document,
    location_path: &str,
    registry: &ToolRegistry,
    hooks: &dyn PageHooks,
) -> bool {
    let Some(tool) = registry.find_for_location(location_path) else {
        return false;
    };
    let existing = document.find_first(document.root(), |element| element.has_class("breadcrumb-nav"));
    if existing.is_some() {
        return false;
    }
    let Some(main) = document.first_element_by_tag(document.root(), "main") else {
        return false;
    };

    match build_breadcrumb(document, &tool.name) {
        Ok(breadcrumb) => {
            if let Err(error) = document.prepend_child(main, breadcrumb) {
                warn!("failed to insert breadcrumbs: {error}");
                return false;
            }
            hooks.render_icons(document);
            true
        }
        Err(error) => {
            warn!("failed to build breadcrumbs: {error}");
            false
        }
    }
}

fn build_breadcrumb(document: &mut Document, tool_name: &str) -> ShellResult<NodeId> {
    let nav = document.create_element_with_attrs(
        "nav",
        &[
            ("class", "breadcrumb-nav container mx-auto px-4 sm:px-6 lg:px-8 pt-4"),
            ("aria-label", "Breadcrumb"),
        ],
    );
    let list = document.create_element_with_attrs(
        "ol",
        &[("class", "flex items-center gap-1.5 text-xs text-neutral-500 dark:text-neutral-400")],
    );
    document.append_child(nav, list)?;

    let home = document.create_element("li");
    append_text(document, home, "a", &[("href", "/")], "Home")?;
    document.append_child(list, home)?;

    let tools = crumb_item(document)?;
    append_text(document, tools, "a", &[("href", "/tools")], "Tools")?;
    document.append_child(list, tools)?;

    let current = crumb_item(document)?;
    append_text(
        document,
        current,
        "span",
        &[("class", "text-neutral-900 dark:text-neutral-100 font-medium")],
        tool_name,
    )?;
    document.append_child(list, current)?;
    Ok(nav)
}

fn crumb_item(document: &mut Document) -> ShellResult<NodeId> {
    let item = document.create_element_with_attrs("li", &[("class", "flex items-center gap-1.5")]);
    let chevron = document.create_element_with_attrs(
        "i",
        &[("data-lucide", "chevron-right"), ("class", "w-3 h-3")],
    );
    document.append_child(item, chevron)?;
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::add_breadcrumbs;
    use super::enhance_action_buttons;
    use crate::hooks::RecordingHooks;
    use crate::registry::ToolRegistry;
    use sdt_html::HtmlParser;

    const TOOL_PAGE: &str = "<body><main>\
        <button onclick=\"copyOutput()\"><span>Copy</span></button>\
        <button id=\"json-copy-btn\" title=\"Copy JSON\">Copy</button>\
        <button onclick=\"clearAll()\"><i data-lucide=\"trash\"></i><span>Clear</span></button>\
        <button onclick=\"downloadResult()\">Save</button>\
        <button onclick=\"formatJSON()\"><span>Format</span><kbd class=\"kbd-hint\">Ctrl+Enter</kbd></button>\
        </main></body>";

    #[test]
    fn action_controls_get_titles_and_hints_once() {
        let mut document = HtmlParser.parse(TOOL_PAGE);

        assert_eq!(enhance_action_buttons(&mut document, "Ctrl"), 5);
        assert_eq!(enhance_action_buttons(&mut document, "Ctrl"), 0);

        let titles: Vec<String> = document
            .find_all(document.root(), |element| element.tag == "button")
            .into_iter()
            .filter_map(|node| document.attribute(node, "title").map(str::to_owned))
            .collect();
        assert_eq!(
            titles,
            vec![
                "Copy (Ctrl+Shift+C)",
                "Copy JSON (Ctrl+Shift+C)",
                "Clear (Ctrl+Shift+X)",
                "Download (Ctrl+S)",
                "Format (Ctrl+Enter)",
            ]
        );

        let hints = document.find_all(document.root(), |element| element.has_class("kbd-hint"));
        assert_eq!(hints.len(), 3);

        let clear = document
            .find_first(document.root(), |element| element.attr("onclick") == Some("clearAll()"))
            .unwrap_or_default();
        let tags: Vec<&str> = document
            .element_children(clear)
            .into_iter()
            .filter_map(|child| document.tag_name(child))
            .collect();
        assert_eq!(tags, vec!["i", "span", "kbd"]);
    }

    #[test]
    fn breadcrumbs_only_on_tool_pages_and_only_once() {
        let registry = ToolRegistry::default();
        let hooks = RecordingHooks::new();
        let mut document = HtmlParser.parse("<body><main><h1>JWT</h1></main></body>");

        assert!(!add_breadcrumbs(&mut document, "/tools", &registry, &hooks));
        assert!(add_breadcrumbs(&mut document, "/jwt-decoder.html", &registry, &hooks));
        assert!(!add_breadcrumbs(&mut document, "/jwt-decoder", &registry, &hooks));
        assert_eq!(hooks.icon_renders(), 1);

        let main = document.first_element_by_tag(document.root(), "main").unwrap_or_default();
        let first = document.element_children(main).first().copied().unwrap_or_default();
        assert!(document.has_class(first, "breadcrumb-nav"));
        assert_eq!(document.attribute(first, "aria-label"), Some("Breadcrumb"));
        let text = sdt_dom::collapse_whitespace(&document.text_content(first));
        assert_eq!(text, "HomeToolsJWT Decoder");
    }

    #[test]
    fn pages_without_main_get_no_breadcrumbs() {
        let registry = ToolRegistry::default();
        let mut document = HtmlParser.parse("<body><div>JSON</div></body>");
        assert!(!add_breadcrumbs(&mut document, "/json-formatter", &registry, &RecordingHooks::new()));
    }
}
