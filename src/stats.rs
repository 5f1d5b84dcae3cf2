//! Bundle release download aggregation.
//!
//! Bundle releases are tagged with their build date (`YYYYMMDD`). Each asset
//! name ends in a version suffix, so assets are grouped into families by
//! dropping the last `-` separated part before summing their downloads.

use chrono::NaiveDate;
use serde::Deserialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::SourceError;

/// Only releases tagged within this many days of today are counted.
pub const RELEASE_WINDOW_DAYS: i64 = 7;

/// A release from the hosting API. Does not contain all fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A downloadable release asset. Does not contain all fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    pub download_count: u64,
}

/// Per-family download totals for the bundle, plus the tags that were skipped.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BundleStats {
    pub families: BTreeMap<String, u64>,
    pub skipped_tags: Vec<String>,
}

/// Parses a `YYYYMMDD` tag into a date.
pub fn parse_tag_date(tag: &str) -> Result<NaiveDate, SourceError> {
    let invalid = || SourceError::InvalidTag(tag.to_string());

    if tag.len() != 8 || !tag.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let year = tag[..4].parse().map_err(|_| invalid())?;
    let month = tag[4..6].parse().map_err(|_| invalid())?;
    let day = tag[6..].parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Strips the trailing `-version` part of an asset name.
///
/// `adafruit-circuitpython-bundle-py-20240101.zip` becomes
/// `adafruit-circuitpython-bundle-py`. Names without a `-` are their own family.
pub fn asset_family(name: &str) -> &str {
    match name.rfind('-') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Sums downloads per asset family over releases tagged within the window
/// ending at `today`.
///
/// Releases are ordered newest-first by tag date before the cutoff applies,
/// so the result does not depend on the order the API returned them in.
/// Only assets whose names start with `asset_prefix` are counted.
pub fn aggregate_releases(
    releases: Vec<Release>,
    today: NaiveDate,
    asset_prefix: &str,
) -> BundleStats {
    let mut stats = BundleStats::default();

    let mut dated = Vec::with_capacity(releases.len());
    for release in releases {
        match parse_tag_date(&release.tag_name) {
            Ok(date) => dated.push((date, release)),
            Err(e) => {
                warn!(tag = %release.tag_name, error = %e, "Skipping release");
                stats.skipped_tags.push(release.tag_name);
            }
        }
    }
    dated.sort_by_key(|(date, _)| Reverse(*date));

    for (date, release) in dated {
        let age = (today - date).num_days();
        if age > RELEASE_WINDOW_DAYS {
            debug!(tag = %release.tag_name, age, "Release outside window, stopping");
            break;
        }

        for asset in release.assets {
            if !asset.name.starts_with(asset_prefix) {
                continue;
            }
            *stats
                .families
                .entry(asset_family(&asset.name).to_string())
                .or_default() += asset.download_count;
        }
    }

    stats
}
