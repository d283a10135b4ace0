//! Typed configuration document.
//!
//! # Design
//! - Field names mirror the on-disk JSON keys exactly (`PascalCase`).
//! - Missing keys decode to zero values; `validate_and_normalize` turns them into
//!   usable settings, so a hand-edited file never fails to load over a blank field.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_INTERVAL_MINUTES, DEFAULT_RETENTION, DEFAULT_WEB_LISTEN_ADDR, EXAMPLE_SITE_NAME,
    EXAMPLE_SITE_URL, default_backup_folder,
};
use crate::validate::normalize_interval;

/// Complete scheduler configuration as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Address the control API binds to; changes require a restart.
    #[serde(default)]
    pub web_listen_addr: String,
    /// Minutes between scheduled runs; `0` disables the scheduler.
    #[serde(default)]
    pub interval_minutes: i64,
    /// Root directory that receives one sub-directory per site.
    #[serde(default)]
    pub backup_folder: PathBuf,
    /// Number of archives kept per site.
    #[serde(default)]
    pub retention: i64,
    /// Sites in the order the operator listed them.
    #[serde(default)]
    pub sites: Vec<Site>,
}

/// A named HTTP endpoint that serves one backup archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Site {
    /// Whether the site participates in runs.
    #[serde(default)]
    pub enabled: bool,
    /// Unique (case-insensitive) display name, also used as the directory name.
    #[serde(default)]
    pub name: String,
    /// Archive download URL.
    #[serde(default)]
    pub url: String,
}

impl Config {
    /// Document written when no configuration file exists yet.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            web_listen_addr: DEFAULT_WEB_LISTEN_ADDR.to_string(),
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            backup_folder: default_backup_folder(),
            retention: DEFAULT_RETENTION,
            sites: vec![Site {
                enabled: true,
                name: EXAMPLE_SITE_NAME.to_string(),
                url: EXAMPLE_SITE_URL.to_string(),
            }],
        }
    }

    /// Normalised scheduler interval in minutes; `0` means disabled.
    #[must_use]
    pub fn effective_interval_minutes(&self) -> u64 {
        normalize_interval(self.interval_minutes)
    }

    /// Sites with `Enabled == true`, in document order.
    pub fn enabled_sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter().filter(|site| site.enabled)
    }

    /// Directory that holds archives for the named site.
    #[must_use]
    pub fn site_dir(&self, site_name: &str) -> PathBuf {
        self.backup_root().join(site_name)
    }

    /// Backup root with redundant separators removed.
    #[must_use]
    pub fn backup_root(&self) -> PathBuf {
        self.backup_folder.components().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_keys_match_document_layout() {
        let value = serde_json::to_value(Config::initial()).expect("serialize");
        let object = value.as_object().expect("object");
        for key in [
            "WebListenAddr",
            "IntervalMinutes",
            "BackupFolder",
            "Retention",
            "Sites",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        let site = &value["Sites"][0];
        assert_eq!(site["Enabled"], json!(true));
        assert_eq!(site["Name"], json!("Example Site"));
        assert_eq!(site["Url"], json!("http://example.com/backup.zip"));
    }

    #[test]
    fn missing_keys_decode_to_zero_values() {
        let config: Config = serde_json::from_value(json!({ "Sites": [{ "Name": "a" }] }))
            .expect("decode");
        assert_eq!(config.interval_minutes, 0);
        assert_eq!(config.retention, 0);
        assert!(config.backup_folder.as_os_str().is_empty());
        assert!(!config.sites[0].enabled);
        assert!(config.sites[0].url.is_empty());
    }

    #[test]
    fn enabled_sites_preserve_document_order() {
        let config = Config {
            sites: vec![
                Site {
                    enabled: true,
                    name: "b".into(),
                    url: "http://b".into(),
                },
                Site {
                    enabled: false,
                    name: "c".into(),
                    url: "http://c".into(),
                },
                Site {
                    enabled: true,
                    name: "a".into(),
                    url: "http://a".into(),
                },
            ],
            ..Config::initial()
        };
        let names: Vec<_> = config.enabled_sites().map(|site| site.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn site_dir_joins_name_under_cleaned_root() {
        let config = Config {
            backup_folder: PathBuf::from("backups//nightly/"),
            ..Config::initial()
        };
        assert_eq!(
            config.site_dir("alpha"),
            PathBuf::from("backups").join("nightly").join("alpha")
        );
    }
}
