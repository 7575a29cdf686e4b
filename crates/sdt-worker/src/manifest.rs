//! Versioned list of core assets populated on install.

/// Version tag of the currently shipped cache generation.
pub const DEFAULT_CACHE_VERSION: &str = "simpledevtools-v5";

const DEFAULT_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/tools.html",
    "/json-formatter.html",
    "/base64-encoder.html",
    "/image-background-remover.html",
    "/image-converter.html",
    "/json-csv-converter.html",
    "/markdown-html-converter.html",
    "/images-to-pdf.html",
    "/json-xml-converter.html",
    "/yaml-json-converter.html",
    "/text-case-converter.html",
    "/unit-converter.html",
    "/guides.html",
    "/guides/json-formatter-guide.html",
    "/dist/output.css",
    "/dist/js/lucide.min.js",
    "/layout.js",
    "/logo.png",
    "/favicon.ico",
];

/// The cache name doubles as the version tag. Bump it whenever the asset list
/// or the caching rules change so clients regenerate the whole cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheManifest {
    pub version: String,
    pub assets: Vec<String>,
    /// Activate as soon as install succeeds instead of waiting for clients to close.
    pub skip_waiting: bool,
}

impl Default for CacheManifest {
    fn default() -> Self {
        Self {
            version: DEFAULT_CACHE_VERSION.to_owned(),
            assets: DEFAULT_ASSETS.iter().map(|asset| (*asset).to_owned()).collect(),
            skip_waiting: true,
        }
    }
}

impl CacheManifest {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            assets: Vec::new(),
            skip_waiting: true,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets = assets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::CacheManifest;
    use super::DEFAULT_CACHE_VERSION;

    #[test]
    fn default_manifest_covers_core_assets() {
        let manifest = CacheManifest::default();
        assert_eq!(manifest.version, DEFAULT_CACHE_VERSION);
        assert_eq!(manifest.assets.first().map(String::as_str), Some("/"));
        assert!(manifest.assets.iter().any(|asset| asset == "/favicon.ico"));
        assert!(manifest.assets.iter().any(|asset| asset == "/dist/output.css"));
        assert_eq!(manifest.assets.len(), 21);
        assert!(manifest.skip_waiting);
    }

    #[test]
    fn builder_replaces_assets() {
        let manifest = CacheManifest::new("v2").with_assets(["/", "/a.html"]);
        assert_eq!(manifest.assets, vec!["/".to_owned(), "/a.html".to_owned()]);
    }
}
