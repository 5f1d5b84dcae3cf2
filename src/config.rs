//! Runtime configuration.
//!
//! Every value has a default matching the Adafruit CircuitPython setup and
//! can be overridden from the environment (a `.env` file is loaded first by
//! the binary).

/// Tunables for a single stats run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    pub github_api_url: String,
    pub github_token: Option<String>,
    pub pypistats_api_url: String,
    pub pypi_url: String,
    pub bundle_owner: String,
    pub bundle_repo: String,
    pub bundle_asset_prefix: String,
    pub library_owner: String,
    pub library_prefix: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            github_api_url: "https://api.github.com".to_string(),
            github_token: None,
            pypistats_api_url: "https://pypistats.org".to_string(),
            pypi_url: "https://pypi.org".to_string(),
            bundle_owner: "adafruit".to_string(),
            bundle_repo: "Adafruit_CircuitPython_Bundle".to_string(),
            bundle_asset_prefix: "adafruit".to_string(),
            library_owner: "adafruit".to_string(),
            library_prefix: "Adafruit_CircuitPython".to_string(),
        }
    }
}

impl StatsConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let base = |key: &str, default: String| {
            get(key)
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default)
        };

        let defaults = Self::default();
        Self {
            github_api_url: base("GITHUB_API_URL", defaults.github_api_url),
            github_token: get("GITHUB_TOKEN").or_else(|| get("ADABOT_GITHUB_ACCESS_TOKEN")),
            pypistats_api_url: base("PYPISTATS_API_URL", defaults.pypistats_api_url),
            pypi_url: base("PYPI_URL", defaults.pypi_url),
            bundle_owner: get("BUNDLE_OWNER").unwrap_or(defaults.bundle_owner),
            bundle_repo: get("BUNDLE_REPO").unwrap_or(defaults.bundle_repo),
            bundle_asset_prefix: get("BUNDLE_ASSET_PREFIX").unwrap_or(defaults.bundle_asset_prefix),
            library_owner: get("LIBRARY_OWNER").unwrap_or(defaults.library_owner),
            library_prefix: get("LIBRARY_PREFIX").unwrap_or(defaults.library_prefix),
        }
    }
}
