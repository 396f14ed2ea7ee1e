//! Source list file schemas.
//!
//! Every schema version the source list has ever had is a closed set of
//! [`VersionedSourceList`] variants. Older variants are upgraded through pure
//! functions, one step at a time, until they reach [`SourceListFile`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::datetime::{from_optional_epoch_string, to_epoch_string};
use crate::feed::source::SourceDescriptor;
use crate::{FeederError, Result};

/// Schema version written by this build.
pub const CURRENT_VERSION: &str = "0.1.1";

/// Known schema versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// `0.1` / `0.1.0`: title/subtitle keys, no filenames.
    V0_1,
    /// `0.1.1`: current layout.
    V0_1_1,
}

impl SchemaVersion {
    /// Parse a version string; unknown versions cannot be migrated.
    pub fn parse(version: &str) -> Result<Self> {
        match version.trim() {
            "0.1" | "0.1.0" => Ok(SchemaVersion::V0_1),
            "0.1.1" => Ok(SchemaVersion::V0_1_1),
            other => Err(FeederError::Migration(format!(
                "unsupported source list version '{}'",
                other
            ))),
        }
    }

    pub fn is_current(self) -> bool {
        self == SchemaVersion::V0_1_1
    }
}

/// Source list file, current layout.
///
/// The `sources_*` lists are parallel: entry `i` of each list describes
/// source `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceListFile {
    pub version: String,
    #[serde(default)]
    pub savefile_list: Vec<String>,
    #[serde(default)]
    pub sources_urls: Vec<String>,
    #[serde(default)]
    pub sources_names: Vec<String>,
    #[serde(default)]
    pub sources_subnames: Vec<String>,
    #[serde(default)]
    pub sources_filenames: Vec<String>,
    /// Epoch-seconds strings; empty string means unset.
    #[serde(default)]
    pub sources_updated: Vec<String>,
}

/// Source list file, `0.1` layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceListV0_1 {
    pub version: String,
    #[serde(default)]
    pub savefile_list: Vec<String>,
    #[serde(default)]
    pub sources_url: Vec<String>,
    #[serde(default)]
    pub sources_title: Vec<String>,
    #[serde(default)]
    pub sources_subtitle: Vec<String>,
}

/// A parsed source list in whatever version it was written.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedSourceList {
    V0_1(SourceListV0_1),
    V0_1_1(SourceListFile),
}

impl VersionedSourceList {
    /// Parse source list text, dispatching on its `version` key.
    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse()?;
        let version = match table.get("version") {
            Some(toml::Value::String(version)) => version.clone(),
            Some(_) => {
                return Err(FeederError::Parse(
                    "source list 'version' must be a string".to_string(),
                ))
            }
            None => {
                return Err(FeederError::Parse(
                    "source list has no 'version' key".to_string(),
                ))
            }
        };

        match SchemaVersion::parse(&version)? {
            SchemaVersion::V0_1 => Ok(Self::V0_1(toml::from_str(content)?)),
            SchemaVersion::V0_1_1 => Ok(Self::V0_1_1(toml::from_str(content)?)),
        }
    }

    pub fn version(&self) -> SchemaVersion {
        match self {
            Self::V0_1(_) => SchemaVersion::V0_1,
            Self::V0_1_1(_) => SchemaVersion::V0_1_1,
        }
    }

    /// Version string exactly as written in the file.
    pub fn version_str(&self) -> &str {
        match self {
            Self::V0_1(file) => &file.version,
            Self::V0_1_1(file) => &file.version,
        }
    }

    /// Apply migration steps until the current layout is reached.
    pub fn upgrade(self) -> SourceListFile {
        let mut list = self;
        loop {
            list = match list {
                Self::V0_1(old) => Self::V0_1_1(migrate_v0_1(old)),
                Self::V0_1_1(current) => return current,
            };
        }
    }
}

/// `0.1` -> `0.1.1`: rename title/subtitle keys, start without filenames.
pub fn migrate_v0_1(old: SourceListV0_1) -> SourceListFile {
    SourceListFile {
        version: "0.1.1".to_string(),
        savefile_list: old.savefile_list,
        sources_urls: old.sources_url,
        sources_names: old.sources_title,
        sources_subnames: old.sources_subtitle,
        sources_filenames: Vec::new(),
        sources_updated: Vec::new(),
    }
}

impl SourceListFile {
    /// Flatten descriptors into the parallel-list layout.
    pub fn from_descriptors(savefile_list: Vec<String>, descriptors: &[SourceDescriptor]) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            savefile_list,
            sources_urls: descriptors.iter().map(|d| d.url.clone()).collect(),
            sources_names: descriptors.iter().map(|d| d.name.clone()).collect(),
            sources_subnames: descriptors.iter().map(|d| d.subname.clone()).collect(),
            sources_filenames: descriptors.iter().map(|d| d.filename.clone()).collect(),
            sources_updated: descriptors
                .iter()
                .map(|d| d.updated.as_ref().map(to_epoch_string).unwrap_or_default())
                .collect(),
        }
    }

    /// Zip the parallel lists into descriptors.
    ///
    /// URLs, names and subnames must have the same length. An empty filename
    /// list means "derive every filename"; an absent or short updated list
    /// leaves every time unset.
    pub fn descriptors(&self) -> Result<Vec<SourceDescriptor>> {
        let count = self.sources_urls.len();
        if self.sources_names.len() != count || self.sources_subnames.len() != count {
            return Err(FeederError::Parse(format!(
                "source list is inconsistent: {} urls, {} names, {} subnames",
                count,
                self.sources_names.len(),
                self.sources_subnames.len()
            )));
        }

        let filenames = match self.sources_filenames.len() {
            0 => None,
            n if n == count => Some(&self.sources_filenames),
            n => {
                return Err(FeederError::Parse(format!(
                    "source list is inconsistent: {} urls, {} filenames",
                    count, n
                )))
            }
        };

        let updated = if self.sources_updated.len() == count {
            Some(&self.sources_updated)
        } else {
            if !self.sources_updated.is_empty() {
                warn!(
                    "Ignoring sources_updated: {} entries for {} sources",
                    self.sources_updated.len(),
                    count
                );
            }
            None
        };

        let descriptors = (0..count)
            .map(|i| SourceDescriptor {
                url: self.sources_urls[i].clone(),
                name: self.sources_names[i].clone(),
                subname: self.sources_subnames[i].clone(),
                filename: filenames.map(|f| f[i].clone()).unwrap_or_default(),
                updated: updated.and_then(|u| match from_optional_epoch_string(&u[i]) {
                    Ok(time) => time,
                    Err(e) => {
                        warn!("Ignoring update time of '{}': {}", self.sources_urls[i], e);
                        None
                    }
                }),
            })
            .collect();
        Ok(descriptors)
    }

    /// Render as TOML text.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| FeederError::Save(format!("failed to serialize source list: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const LEGACY: &str = r#"
version = "0.1"
savefile_list = ["data/sourcelist.conf"]
sources_url = ["http://a.example/rss", "http://b.example/rss"]
sources_title = ["Alpha", "Beta"]
sources_subtitle = ["", "World"]
"#;

    #[test]
    fn test_schema_version_parse() {
        assert_eq!(SchemaVersion::parse("0.1").unwrap(), SchemaVersion::V0_1);
        assert_eq!(SchemaVersion::parse("0.1.0").unwrap(), SchemaVersion::V0_1);
        assert_eq!(SchemaVersion::parse("0.1.1").unwrap(), SchemaVersion::V0_1_1);
        assert!(SchemaVersion::parse("0.1.1").unwrap().is_current());
        assert!(matches!(
            SchemaVersion::parse("0.2"),
            Err(FeederError::Migration(_))
        ));
    }

    #[test]
    fn test_parse_legacy() {
        let list = VersionedSourceList::parse(LEGACY).unwrap();
        assert_eq!(list.version(), SchemaVersion::V0_1);
        assert_eq!(list.version_str(), "0.1");
    }

    #[test]
    fn test_parse_unknown_version() {
        let result = VersionedSourceList::parse("version = \"9.9\"\n");
        assert!(matches!(result, Err(FeederError::Migration(_))));
    }

    #[test]
    fn test_parse_missing_version() {
        let result = VersionedSourceList::parse("sources_urls = []\n");
        assert!(matches!(result, Err(FeederError::Parse(_))));

        let result = VersionedSourceList::parse("version = 1\n");
        assert!(matches!(result, Err(FeederError::Parse(_))));
    }

    #[test]
    fn test_parse_not_toml() {
        let result = VersionedSourceList::parse("this is [not toml");
        assert!(matches!(result, Err(FeederError::Parse(_))));
    }

    #[test]
    fn test_upgrade_legacy() {
        let current = VersionedSourceList::parse(LEGACY).unwrap().upgrade();

        assert_eq!(current.version, CURRENT_VERSION);
        assert_eq!(current.savefile_list, vec!["data/sourcelist.conf"]);
        assert_eq!(
            current.sources_urls,
            vec!["http://a.example/rss", "http://b.example/rss"]
        );
        assert_eq!(current.sources_names, vec!["Alpha", "Beta"]);
        assert_eq!(current.sources_subnames, vec!["", "World"]);
        assert!(current.sources_filenames.is_empty());
        assert!(current.sources_updated.is_empty());
    }

    #[test]
    fn test_upgrade_current_is_identity() {
        let file = SourceListFile {
            version: CURRENT_VERSION.to_string(),
            sources_urls: vec!["http://a".to_string()],
            sources_names: vec!["A".to_string()],
            sources_subnames: vec![String::new()],
            ..Default::default()
        };
        let upgraded = VersionedSourceList::V0_1_1(file.clone()).upgrade();
        assert_eq!(upgraded, file);
    }

    #[test]
    fn test_descriptors_roundtrip() {
        let updated = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let descriptors = vec![
            SourceDescriptor {
                url: "http://a".to_string(),
                name: "A".to_string(),
                subname: String::new(),
                filename: "data/A.json".to_string(),
                updated: Some(updated),
            },
            SourceDescriptor {
                url: "http://b".to_string(),
                name: "B".to_string(),
                subname: "Sub".to_string(),
                filename: "data/B_Sub.json".to_string(),
                updated: None,
            },
        ];

        let file = SourceListFile::from_descriptors(vec!["x.conf".to_string()], &descriptors);
        assert_eq!(file.sources_updated[1], "");

        let text = file.to_toml().unwrap();
        let parsed = match VersionedSourceList::parse(&text).unwrap() {
            VersionedSourceList::V0_1_1(file) => file,
            other => panic!("unexpected version: {:?}", other),
        };
        assert_eq!(parsed, file);
        assert_eq!(parsed.descriptors().unwrap(), descriptors);
    }

    #[test]
    fn test_descriptors_length_mismatch() {
        let file = SourceListFile {
            version: CURRENT_VERSION.to_string(),
            sources_urls: vec!["http://a".to_string(), "http://b".to_string()],
            sources_names: vec!["A".to_string()],
            sources_subnames: vec![String::new(), String::new()],
            ..Default::default()
        };
        assert!(matches!(file.descriptors(), Err(FeederError::Parse(_))));
    }

    #[test]
    fn test_descriptors_optional_lists() {
        let file = SourceListFile {
            version: CURRENT_VERSION.to_string(),
            sources_urls: vec!["http://a".to_string(), "http://b".to_string()],
            sources_names: vec!["A".to_string(), "B".to_string()],
            sources_subnames: vec![String::new(), String::new()],
            sources_filenames: Vec::new(),
            sources_updated: vec!["1700000000.000".to_string()],
            savefile_list: Vec::new(),
        };

        let descriptors = file.descriptors().unwrap();
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors.iter().all(|d| d.filename.is_empty()));
        assert!(descriptors.iter().all(|d| d.updated.is_none()));
    }

    #[test]
    fn test_descriptors_bad_update_time() {
        let file = SourceListFile {
            version: CURRENT_VERSION.to_string(),
            sources_urls: vec!["http://a".to_string()],
            sources_names: vec!["A".to_string()],
            sources_subnames: vec![String::new()],
            sources_filenames: vec!["a.json".to_string()],
            sources_updated: vec!["yesterday".to_string()],
            savefile_list: Vec::new(),
        };

        let descriptors = file.descriptors().unwrap();
        assert_eq!(descriptors[0].updated, None);
        assert_eq!(descriptors[0].filename, "a.json");
    }
}
