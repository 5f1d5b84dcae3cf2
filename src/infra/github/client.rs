use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, HeaderValue, LINK};
use reqwest::{Method, Request, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::fetch::{self, HttpClient};
use crate::services::catalog_api::Repo;
use crate::stats::Release;

const GITHUB_JSON: &str = "application/vnd.github+json";

#[derive(Deserialize)]
struct SearchResponse {
    items: Vec<Repo>,
}

pub struct GitHubClient<C> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> GitHubClient<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn get(&self, url: &str) -> Result<Request, SourceError> {
        let mut req = fetch::request(Method::GET, url)?;
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        Ok(req)
    }

    /// Lists the releases of `owner/repo`, as returned by the API.
    #[tracing::instrument(skip(self))]
    pub async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<Release>, SourceError> {
        let url = format!("{}/repos/{}/{}/releases", self.base_url, owner, repo);
        let releases: Vec<Release> = fetch::fetch_json(&self.http, self.get(&url)?).await?;
        debug!(count = releases.len(), "Releases fetched");
        Ok(releases)
    }

    /// Runs a repository search and follows `Link: rel="next"` until the
    /// result set is exhausted.
    #[tracing::instrument(skip(self))]
    pub async fn search_repos(&self, query: &str) -> Result<Vec<Repo>> {
        let mut url = Url::parse(&format!("{}/search/repositories", self.base_url))
            .context("invalid GitHub API base URL")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("per_page", "100")
            .append_pair("sort", "updated")
            .append_pair("order", "asc");

        let mut repos = Vec::new();
        let mut next = Some(url.to_string());
        let mut page = 0;

        while let Some(url) = next.take() {
            page += 1;
            let resp = fetch::send_checked(&self.http, self.get(&url)?)
                .await
                .with_context(|| format!("repository search page {page} failed"))?;

            next = resp
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_page_link);

            let body: SearchResponse = resp
                .json()
                .await
                .with_context(|| format!("repository search page {page} was malformed"))?;
            debug!(page, items = body.items.len(), "Search page fetched");
            repos.extend(body.items);
        }

        info!(total = repos.len(), pages = page, "Repository search complete");
        Ok(repos)
    }
}

/// Extracts the `rel="next"` target from a `Link` header value.
pub fn next_page_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;
        segments
            .any(|s| s.trim() == r#"rel="next""#)
            .then(|| target.to_string())
    })
}
