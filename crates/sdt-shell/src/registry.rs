//! Static registry of discoverable tools.

use sdt_core::ShellError;
use sdt_core::ShellResult;
use std::collections::BTreeSet;

/// One discoverable tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEntry {
    pub name: String,
    /// Canonical extensionless path, e.g. `/json-formatter`.
    pub path: String,
    /// Icon placeholder id rendered by the host's icon library.
    pub icon: String,
    pub keywords: Vec<String>,
}

impl ToolEntry {
    pub fn new(name: &str, path: &str, icon: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            path: path.to_owned(),
            icon: icon.to_owned(),
            keywords: keywords.iter().map(|keyword| (*keyword).to_owned()).collect(),
        }
    }

    /// Case-insensitive substring match against the name and keywords.
    /// `needle` must already be trimmed and lower-cased.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.keywords.iter().any(|keyword| keyword.contains(needle))
    }
}

/// Ordered tool list, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRegistry {
    tools: Vec<ToolEntry>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<ToolEntry>) -> ShellResult<Self> {
        let mut seen = BTreeSet::new();
        for tool in &tools {
            if !seen.insert(tool.path.as_str()) {
                return Err(ShellError::new(
                    "registry.tool_duplicate",
                    format!("tool path `{}` is registered twice", tool.path),
                ));
            }
        }
        Ok(Self { tools })
    }

    pub fn tools(&self) -> &[ToolEntry] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&ToolEntry> {
        self.tools.iter().find(|tool| tool.path == path)
    }

    /// Finds the tool served at `location_path`, with or without `.html`.
    pub fn find_for_location(&self, location_path: &str) -> Option<&ToolEntry> {
        let bare = location_path.strip_suffix(".html").unwrap_or(location_path);
        self.get(location_path).or_else(|| self.get(bare))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self {
            tools: default_tools(),
        }
    }
}

fn default_tools() -> Vec<ToolEntry> {
    vec![
        ToolEntry::new(
            "JSON Formatter",
            "/json-formatter",
            "braces",
            &["json", "format", "beautify", "validate", "minify"],
        ),
        ToolEntry::new(
            "Base64 Encoder",
            "/base64-encoder",
            "file-key",
            &["base64", "encode", "decode", "convert"],
        ),
        ToolEntry::new(
            "UUID Generator",
            "/uuid-generator",
            "fingerprint",
            &["uuid", "guid", "generate", "unique"],
        ),
        ToolEntry::new(
            "JWT Decoder",
            "/jwt-decoder",
            "key",
            &["jwt", "token", "decode", "auth"],
        ),
        ToolEntry::new(
            "Regex Tester",
            "/regex-tester",
            "regex",
            &["regex", "regular expression", "pattern", "match"],
        ),
        ToolEntry::new(
            "Hash Generator",
            "/hash-generator",
            "hash",
            &["hash", "md5", "sha256", "sha512", "checksum"],
        ),
        ToolEntry::new(
            "Image Compressor",
            "/image-compressor",
            "image",
            &["image", "compress", "optimize", "resize"],
        ),
        ToolEntry::new(
            "Password Analyzer",
            "/password-strength-analyzer",
            "shield-check",
            &["password", "strength", "security"],
        ),
        ToolEntry::new(
            "JavaScript Formatter",
            "/javascript-formatter",
            "code-2",
            &["javascript", "js", "format", "beautify"],
        ),
        ToolEntry::new(
            "CSS Formatter",
            "/css-formatter",
            "palette",
            &["css", "format", "beautify", "style"],
        ),
        ToolEntry::new(
            "HTML Formatter",
            "/html-formatter",
            "code",
            &["html", "format", "beautify", "markup"],
        ),
        ToolEntry::new(
            "SQL Formatter",
            "/sql-formatter",
            "database",
            &["sql", "format", "query", "database"],
        ),
        ToolEntry::new(
            "Markdown Editor",
            "/markdown-editor",
            "file-text",
            &["markdown", "md", "editor", "preview"],
        ),
        ToolEntry::new(
            "URL Encoder",
            "/url-encoder",
            "link",
            &["url", "encode", "decode", "uri"],
        ),
        ToolEntry::new(
            "Color Picker",
            "/color-picker",
            "pipette",
            &["color", "picker", "hex", "rgb", "hsl"],
        ),
        ToolEntry::new(
            "Timestamp Converter",
            "/timestamp-converter",
            "clock",
            &["timestamp", "unix", "epoch", "date"],
        ),
        ToolEntry::new(
            "Lorem Ipsum Generator",
            "/lorem-ipsum",
            "text",
            &["lorem", "ipsum", "placeholder", "text"],
        ),
        ToolEntry::new(
            "Diff Checker",
            "/diff-checker",
            "git-compare",
            &["diff", "compare", "difference", "text"],
        ),
        ToolEntry::new(
            "Hash Encoder",
            "/hash-encoder",
            "lock",
            &["hash", "encode", "md5", "sha"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::ToolEntry;
    use super::ToolRegistry;

    #[test]
    fn default_registry_has_unique_paths() {
        let registry = ToolRegistry::default();
        assert_eq!(registry.len(), 19);
        assert!(ToolRegistry::new(registry.tools().to_vec()).is_ok());
        assert_eq!(
            registry.tools().first().map(|tool| tool.path.as_str()),
            Some("/json-formatter")
        );
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let tool = ToolEntry::new("A", "/a", "x", &[]);
        let result = ToolRegistry::new(vec![tool.clone(), tool]);
        assert_eq!(result.map_err(|error| error.code), Err("registry.tool_duplicate"));
    }

    #[test]
    fn location_lookup_ignores_html_extension() {
        let registry = ToolRegistry::default();
        assert_eq!(
            registry.find_for_location("/uuid-generator.html").map(|tool| tool.name.as_str()),
            Some("UUID Generator")
        );
        assert!(registry.find_for_location("/tools").is_none());
    }

    #[test]
    fn matching_covers_name_and_keywords() {
        let registry = ToolRegistry::default();
        let json = registry.get("/json-formatter");
        assert!(json.is_some_and(|tool| tool.matches("json form")));
        assert!(json.is_some_and(|tool| tool.matches("minify")));
        assert!(!json.is_some_and(|tool| tool.matches("sha")));
    }
}
