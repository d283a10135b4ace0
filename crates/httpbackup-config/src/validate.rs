//! Normalisation rules applied on every load and save.
//!
//! # Design
//! - Normalisation never fails: invalid values are replaced, never rejected.
//! - The same interval rule is used for the initial load and for live reloads.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::defaults::{
    DEFAULT_RETENTION, DEFAULT_WEB_LISTEN_ADDR, NEGATIVE_INTERVAL_FALLBACK, default_backup_folder,
};
use crate::model::{Config, Site};

/// Map a raw `IntervalMinutes` value onto the scheduler interval.
///
/// Negative values become `1`; `0` stays `0` and disables the scheduler.
#[must_use]
pub fn normalize_interval(value: i64) -> u64 {
    let normalized = if value < 0 {
        NEGATIVE_INTERVAL_FALLBACK
    } else {
        value
    };
    u64::try_from(normalized).unwrap_or(0)
}

impl Config {
    /// Replace invalid values with defaults and drop unusable or duplicate sites.
    ///
    /// Idempotent: normalising an already normalised document changes nothing.
    pub fn validate_and_normalize(&mut self) {
        if self.interval_minutes < 0 {
            self.interval_minutes = NEGATIVE_INTERVAL_FALLBACK;
        }
        if self.retention <= 0 {
            self.retention = DEFAULT_RETENTION;
        }

        let folder = self.backup_folder.to_string_lossy();
        let trimmed = folder.trim();
        self.backup_folder = if trimmed.is_empty() {
            default_backup_folder()
        } else {
            PathBuf::from(trimmed)
        };

        let addr = self.web_listen_addr.trim();
        self.web_listen_addr = if addr.is_empty() {
            DEFAULT_WEB_LISTEN_ADDR.to_string()
        } else {
            addr.to_string()
        };

        self.sites = dedupe_sites(std::mem::take(&mut self.sites));
    }

    /// Normalised copy of `self`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.validate_and_normalize();
        self
    }
}

fn dedupe_sites(sites: Vec<Site>) -> Vec<Site> {
    let mut seen = HashSet::with_capacity(sites.len());
    let mut kept = Vec::with_capacity(sites.len());
    for site in sites {
        let name = site.name.trim().to_string();
        let url = site.url.trim().to_string();
        if name.is_empty() && url.is_empty() {
            continue;
        }
        if !name.is_empty() && !seen.insert(name.to_lowercase()) {
            debug!(site = %name, "dropping duplicate site entry");
            continue;
        }
        kept.push(Site {
            enabled: site.enabled,
            name,
            url,
        });
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str, url: &str) -> Site {
        Site {
            enabled: true,
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn interval_rule_handles_negative_and_zero() {
        assert_eq!(normalize_interval(-7), 1);
        assert_eq!(normalize_interval(0), 0);
        assert_eq!(normalize_interval(15), 15);
    }

    #[test]
    fn zero_document_gets_usable_defaults() {
        let mut config = Config {
            interval_minutes: -3,
            retention: -1,
            backup_folder: PathBuf::from("   "),
            web_listen_addr: " \t".to_string(),
            sites: Vec::new(),
        };
        config.validate_and_normalize();

        assert_eq!(config.interval_minutes, 1);
        assert_eq!(config.retention, DEFAULT_RETENTION);
        assert_eq!(config.backup_folder, default_backup_folder());
        assert_eq!(config.web_listen_addr, DEFAULT_WEB_LISTEN_ADDR);
    }

    #[test]
    fn zero_interval_is_preserved() {
        let config = Config {
            interval_minutes: 0,
            ..Config::initial()
        }
        .normalized();
        assert_eq!(config.interval_minutes, 0);
        assert_eq!(config.effective_interval_minutes(), 0);
    }

    #[test]
    fn sites_are_trimmed_and_deduplicated_keeping_first() {
        let mut config = Config {
            sites: vec![
                site("  Alpha ", " http://a/1 "),
                site("", ""),
                site("ALPHA", "http://a/2"),
                site("beta", "http://b"),
                site("", "http://nameless"),
                site("", "http://nameless-too"),
            ],
            ..Config::initial()
        };
        config.validate_and_normalize();

        let pairs: Vec<_> = config
            .sites
            .iter()
            .map(|site| (site.name.as_str(), site.url.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("Alpha", "http://a/1"),
                ("beta", "http://b"),
                ("", "http://nameless"),
                ("", "http://nameless-too"),
            ]
        );
    }

    #[test]
    fn normalisation_is_idempotent() {
        let mut config = Config {
            interval_minutes: -1,
            retention: 0,
            sites: vec![site(" x ", "u"), site("X", "v")],
            ..Config::default()
        };
        config.validate_and_normalize();
        let once = config.clone();
        config.validate_and_normalize();
        assert_eq!(config, once);
    }
}
