//! PyPI publication checks and pypistats.org download counts.

mod client;

pub use client::{PypiClient, STATS_TIMEOUT, normalize_package_name};
