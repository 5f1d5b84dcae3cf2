//! GitHub REST API: bundle releases and library repository search.

mod catalog;
mod client;

pub use catalog::LibraryCatalog;
pub use client::{GitHubClient, next_page_link};
