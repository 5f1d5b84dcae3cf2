//! The weekly download report.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::collections::BTreeMap;
use std::io::Write;
use tracing::{info, warn};

use crate::config::StatsConfig;
use crate::error::SourceError;
use crate::fetch::HttpClient;
use crate::infra::github::GitHubClient;
use crate::infra::pypi::PypiClient;
use crate::output::ReportWriter;
use crate::services::catalog_api::RepoCatalog;
use crate::stats::{BundleStats, aggregate_releases};

pub const REPORT_TITLE: &str = "Adafruit CircuitPython Library Download Stats";

/// Fetches the bundle's releases and aggregates the last week of downloads.
#[tracing::instrument(skip_all, fields(bundle = %config.bundle_repo))]
pub async fn bundle_stats<C: HttpClient>(
    github: &GitHubClient<C>,
    config: &StatsConfig,
    today: NaiveDate,
) -> Result<BundleStats, SourceError> {
    let releases = github
        .list_releases(&config.bundle_owner, &config.bundle_repo)
        .await?;
    Ok(aggregate_releases(releases, today, &config.bundle_asset_prefix))
}

/// Last-week package index downloads for every published library, keyed by
/// repository name. Per-library failures are kept inline.
#[tracing::instrument(skip_all)]
pub async fn library_downloads<C: HttpClient, K: RepoCatalog>(
    catalog: &K,
    pypi: &PypiClient<C>,
) -> Result<BTreeMap<String, Result<u64, SourceError>>> {
    let repos = catalog
        .list_repos()
        .await
        .context("failed to list library repositories")?;

    let mut downloads = BTreeMap::new();
    for repo in &repos {
        if !catalog.is_published(repo).await {
            continue;
        }
        let result = pypi.last_week_downloads(&repo.name).await;
        if let Err(e) = &result {
            warn!(
                repo = %repo.name,
                status = ?e.status(),
                error = %e,
                "Download stats unavailable"
            );
        }
        downloads.insert(repo.name.clone(), result);
    }

    info!(
        repos = repos.len(),
        published = downloads.len(),
        "Library downloads collected"
    );
    Ok(downloads)
}

/// Writes the full report. Failures of either stats source appear inline;
/// only unexpected failures are returned.
pub async fn run_stat_check<G, P, K, W>(
    github: &GitHubClient<G>,
    pypi: &PypiClient<P>,
    catalog: &K,
    config: &StatsConfig,
    out: &mut ReportWriter<W>,
    now: DateTime<Local>,
) -> Result<()>
where
    G: HttpClient,
    P: HttpClient,
    K: RepoCatalog,
    W: Write,
{
    out.emit(REPORT_TITLE)?;
    out.emit(format!("Report Date: {}", now.format("%d %B %Y, %I:%M%p")))?;
    out.emit("")?;

    out.emit(format!("{} downloads for the past week:", config.bundle_repo))?;
    match bundle_stats(github, config, now.date_naive()).await {
        Ok(stats) => {
            for tag in &stats.skipped_tags {
                out.emit(format!("Skipping release. Tag name invalid: {tag}"))?;
            }
            for (family, count) in &stats.families {
                out.emit(format!(" * {family}: {count}"))?;
            }
        }
        Err(e) => {
            warn!(status = ?e.status(), error = %e, "Bundle stats unavailable");
            out.emit(format!(" * Failed to retrieve bundle stats: {e}"))?;
        }
    }
    out.emit("")?;

    out.emit("Adafruit CircuitPython Library PyPi downloads for the past week:")?;
    for (repo, result) in library_downloads(catalog, pypi).await? {
        let value = match result {
            Ok(count) => count.to_string(),
            Err(e) => format!("Failed to retrieve data ({e})"),
        };
        out.emit(format!(" * {repo}: {value}"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use crate::output::{ReportConfig, Verbosity};
    use crate::services::catalog_api::{Owner, Repo};
    use chrono::TimeZone;
    use std::path::PathBuf;

    struct FixedCatalog {
        repos: Vec<Repo>,
        unpublished: Vec<&'static str>,
    }

    #[async_trait::async_trait]
    impl RepoCatalog for FixedCatalog {
        async fn list_repos(&self) -> Result<Vec<Repo>> {
            Ok(self.repos.clone())
        }

        async fn is_published(&self, repo: &Repo) -> bool {
            !self.unpublished.iter().any(|name| *name == repo.name)
        }
    }

    struct FailingCatalog;

    #[async_trait::async_trait]
    impl RepoCatalog for FailingCatalog {
        async fn list_repos(&self) -> Result<Vec<Repo>> {
            Err(anyhow::anyhow!("search unavailable"))
        }

        async fn is_published(&self, _repo: &Repo) -> bool {
            true
        }
    }

    fn repo(name: &str) -> Repo {
        Repo {
            name: name.to_string(),
            full_name: format!("adafruit/{name}"),
            owner: Owner {
                login: "adafruit".to_string(),
            },
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 15, 4, 0).unwrap()
    }

    fn clients(
        server: &mockito::Server,
    ) -> (GitHubClient<BasicClient>, PypiClient<BasicClient>, StatsConfig) {
        clients_at(&server.url())
    }

    fn clients_at(
        url: &str,
    ) -> (GitHubClient<BasicClient>, PypiClient<BasicClient>, StatsConfig) {
        let config = StatsConfig {
            github_api_url: url.to_string(),
            pypistats_api_url: url.to_string(),
            pypi_url: url.to_string(),
            ..StatsConfig::default()
        };
        let github = GitHubClient::new(BasicClient::new().unwrap(), &config.github_api_url);
        let pypi = PypiClient::new(
            BasicClient::new().unwrap(),
            &config.pypistats_api_url,
            &config.pypi_url,
        );
        (github, pypi, config)
    }

    fn writer() -> ReportWriter<Vec<u8>> {
        ReportWriter::with_console(
            ReportConfig {
                output_file: Some(PathBuf::from("unused.txt")),
                verbosity: Verbosity::Silent,
            },
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn test_report_layout() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/adafruit/Adafruit_CircuitPython_Bundle/releases")
            .with_status(200)
            .with_body(
                r#"[
                {"tag_name": "20240114", "assets": [{"name": "adafruit-circuitpython-bundle-py-20240114.zip", "download_count": 10}]},
                {"tag_name": "nightly", "assets": []},
                {"tag_name": "20240112", "assets": [{"name": "adafruit-circuitpython-bundle-py-20240112.zip", "download_count": 5}]}
            ]"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/api/packages/adafruit-circuitpython-b/recent")
            .with_status(200)
            .with_body(r#"{"data": {"last_week": 12}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/packages/adafruit-circuitpython-a/recent")
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let (github, pypi, config) = clients(&server);
        let catalog = FixedCatalog {
            repos: vec![
                repo("Adafruit_CircuitPython_B"),
                repo("Adafruit_CircuitPython_A"),
                repo("Adafruit_CircuitPython_C"),
            ],
            unpublished: vec!["Adafruit_CircuitPython_C"],
        };
        let mut out = writer();

        run_stat_check(&github, &pypi, &catalog, &config, &mut out, now())
            .await
            .unwrap();

        assert_eq!(
            out.buffered(),
            [
                "Adafruit CircuitPython Library Download Stats",
                "Report Date: 15 January 2024, 03:04PM",
                "",
                "Adafruit_CircuitPython_Bundle downloads for the past week:",
                "Skipping release. Tag name invalid: nightly",
                " * adafruit-circuitpython-bundle-py: 15",
                "",
                "Adafruit CircuitPython Library PyPi downloads for the past week:",
                " * Adafruit_CircuitPython_A: Failed to retrieve data (500 Internal Server Error: oops)",
                " * Adafruit_CircuitPython_B: 12",
            ]
        );
    }

    #[tokio::test]
    async fn test_bundle_failure_is_inline() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/adafruit/Adafruit_CircuitPython_Bundle/releases")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let (github, pypi, config) = clients(&server);
        let catalog = FixedCatalog {
            repos: vec![],
            unpublished: vec![],
        };
        let mut out = writer();

        run_stat_check(&github, &pypi, &catalog, &config, &mut out, now())
            .await
            .unwrap();

        let expected = " * Failed to retrieve bundle stats: 502 Bad Gateway: bad gateway";
        assert!(out.buffered().iter().any(|line| line == expected));
    }

    #[tokio::test]
    async fn test_unreachable_sources_are_inline() {
        // Nothing listens on a port that was bound and released.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let (github, pypi, config) = clients_at(&url);
        let catalog = FixedCatalog {
            repos: vec![repo("Adafruit_CircuitPython_A")],
            unpublished: vec![],
        };
        let mut out = writer();

        run_stat_check(&github, &pypi, &catalog, &config, &mut out, now())
            .await
            .unwrap();

        let bundle_prefix = " * Failed to retrieve bundle stats: request failed: ";
        let library_prefix = " * Adafruit_CircuitPython_A: Failed to retrieve data (request failed: ";
        let lines = out.buffered();
        assert!(lines.iter().any(|l| l.starts_with(bundle_prefix)), "{lines:?}");
        assert!(lines.iter().any(|l| l.starts_with(library_prefix)), "{lines:?}");
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/adafruit/Adafruit_CircuitPython_Bundle/releases")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let (github, pypi, config) = clients(&server);
        let mut out = writer();

        let err = run_stat_check(&github, &pypi, &FailingCatalog, &config, &mut out, now())
            .await
            .unwrap_err();

        assert_eq!(
            format!("{err:#}"),
            "failed to list library repositories: search unavailable"
        );
        // Lines written before the failure are kept for the output file.
        assert_eq!(out.buffered()[0], REPORT_TITLE);
    }
}
