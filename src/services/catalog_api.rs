//! Trait and types for enumerating the libraries to report on.

use anyhow::Result;
use serde::Deserialize;

/// Owner of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// A hosted library repository. Does not contain all fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
}

/// Abstraction over the source of candidate library repositories.
#[async_trait::async_trait]
pub trait RepoCatalog: Send + Sync {
    /// Returns every repository that belongs to the library family.
    async fn list_repos(&self) -> Result<Vec<Repo>>;

    /// Returns `true` if `repo` is published on the package index.
    async fn is_published(&self, repo: &Repo) -> bool;
}
