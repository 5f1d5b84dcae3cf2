use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::client::GitHubClient;
use crate::fetch::HttpClient;
use crate::infra::pypi::PypiClient;
use crate::services::catalog_api::{Repo, RepoCatalog};

/// Library repositories found by GitHub search, checked against PyPI.
pub struct LibraryCatalog<'a, G, P> {
    github: &'a GitHubClient<G>,
    pypi: &'a PypiClient<P>,
    owner: String,
    prefix: String,
}

impl<'a, G, P> LibraryCatalog<'a, G, P> {
    pub fn new(
        github: &'a GitHubClient<G>,
        pypi: &'a PypiClient<P>,
        owner: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            github,
            pypi,
            owner: owner.into(),
            prefix: prefix.into(),
        }
    }

    fn is_library(&self, repo: &Repo) -> bool {
        repo.owner.login == self.owner && repo.name.starts_with(&self.prefix)
    }
}

#[async_trait]
impl<'a, G: HttpClient, P: HttpClient> RepoCatalog for LibraryCatalog<'a, G, P> {
    async fn list_repos(&self) -> Result<Vec<Repo>> {
        let query = format!("{} in:name fork:true", self.prefix);
        let repos = self.github.search_repos(&query).await?;

        let libraries: Vec<Repo> = repos.into_iter().filter(|r| self.is_library(r)).collect();
        debug!(count = libraries.len(), owner = %self.owner, "Library repositories");
        Ok(libraries)
    }

    async fn is_published(&self, repo: &Repo) -> bool {
        self.pypi.is_published(&repo.name).await
    }
}
