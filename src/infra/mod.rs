pub mod github;
pub mod pypi;
