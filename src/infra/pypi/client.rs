use reqwest::Method;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::fetch::{self, HttpClient};

/// Timeout applied to every pypistats.org request.
pub const STATS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct RecentResponse {
    data: RecentData,
}

#[derive(Deserialize)]
struct RecentData {
    last_week: u64,
}

pub struct PypiClient<C> {
    http: C,
    stats_url: String,
    index_url: String,
}

/// Maps a repository name onto its package index name:
/// `Adafruit_CircuitPython_Foo` becomes `adafruit-circuitpython-foo`.
pub fn normalize_package_name(name: &str) -> String {
    name.replace('_', "-").to_lowercase()
}

impl<C: HttpClient> PypiClient<C> {
    pub fn new(http: C, stats_url: impl Into<String>, index_url: impl Into<String>) -> Self {
        Self {
            http,
            stats_url: stats_url.into().trim_end_matches('/').to_string(),
            index_url: index_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Downloads over the last seven days, per pypistats.org.
    #[tracing::instrument(skip(self))]
    pub async fn last_week_downloads(&self, package: &str) -> Result<u64, SourceError> {
        let url = format!(
            "{}/api/packages/{}/recent",
            self.stats_url,
            normalize_package_name(package)
        );
        let mut req = fetch::request(Method::GET, &url)?;
        *req.timeout_mut() = Some(STATS_TIMEOUT);

        let recent: RecentResponse = fetch::fetch_json(&self.http, req).await?;
        debug!(last_week = recent.data.last_week, "Recent downloads");
        Ok(recent.data.last_week)
    }

    /// Whether the package index has a project under `name`.
    ///
    /// A failed request counts as "not published".
    #[tracing::instrument(skip(self))]
    pub async fn is_published(&self, name: &str) -> bool {
        let url = format!("{}/pypi/{}/json", self.index_url, name);
        let req = match fetch::request(Method::HEAD, &url) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "Cannot build package index request");
                return false;
            }
        };

        match self.http.execute(req).await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Package index check failed");
                false
            }
        }
    }
}
