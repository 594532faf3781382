//! Manifest handling.
//!
//! The service publishes two kinds of manifests:
//!
//! - the index, returned when no `path` is given, listing for each data version the manifests
//!   available per date for both `fulls` and `incrementals`:
//!
//! ```json
//! { "manifests": [
//!     { "version": "v2",
//!       "fulls": [ { "date": "2024-01-01", "path": "/manifests/…/manifest.json" } ],
//!       "incrementals": [ … ] } ] }
//! ```
//!
//! - the per-date manifest, mapping each category of data to the list of files:
//!
//! ```json
//! { "reviews": [ { "path": "/…/reviews/part-0000.gz" } ], "questions": [ … ] }
//! ```
//!
//! Only keys holding an array of objects (or an empty one) are categories, anything else in the
//! per-date manifest is metadata and is ignored.  Both documents are decoded leniently: a bad
//! record or entry is logged and skipped, the rest stays usable.
//!

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{EnumString, VariantNames};
use tracing::{debug, trace, warn};

use crate::ExportError;

/// Category selecting every file.
pub const ALL: &str = "all";

/// Full snapshots or deltas.
///
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    EnumString,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    strum::Display,
    VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Group {
    Fulls,
    Incrementals,
}

/// One manifest for one date.
///
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub date: String,
    pub path: String,
}

/// All manifests for a given data version.  A missing group is not the same as an empty one.
///
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ManifestGroup {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulls: Option<Vec<ManifestEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incrementals: Option<Vec<ManifestEntry>>,
}

impl ManifestGroup {
    /// Return the entries for `group`, if this record has it at all.
    ///
    pub fn entries(&self, group: Group) -> Option<&[ManifestEntry]> {
        match group {
            Group::Fulls => self.fulls.as_deref(),
            Group::Incrementals => self.incrementals.as_deref(),
        }
    }

    /// Decode one record of the index, keeping whatever is usable.  A record without a
    /// `version` is useless, a bad entry only loses that entry.
    ///
    fn from_value(record: Value) -> Option<Self> {
        let mut map = match record {
            Value::Object(map) => map,
            other => {
                warn!("skipping index record, not an object: {}", other);
                return None;
            }
        };
        let version = match map.get("version").and_then(Value::as_str) {
            Some(version) => version.to_string(),
            None => {
                warn!("skipping index record without version: {:?}", map);
                return None;
            }
        };

        let fulls = lenient_entries(&version, Group::Fulls, map.remove("fulls"));
        let incrementals =
            lenient_entries(&version, Group::Incrementals, map.remove("incrementals"));
        Some(ManifestGroup {
            version,
            fulls,
            incrementals,
        })
    }
}

/// Entries of one group, `None` when the record does not have that group at all.
///
fn lenient_entries(
    version: &str,
    group: Group,
    value: Option<Value>,
) -> Option<Vec<ManifestEntry>> {
    match value? {
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<ManifestEntry>(item) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("{} {}: skipping bad manifest entry: {}", version, group, e);
                        None
                    }
                })
                .collect(),
        ),
        other => {
            warn!("{} {}: not a list of manifests: {}", version, group, other);
            Some(vec![])
        }
    }
}

/// Index as sent, records are decoded one by one.
///
#[derive(Deserialize)]
struct RawIndex {
    manifests: Vec<Value>,
}

/// The top-level list of manifests.
///
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ManifestIndex {
    pub manifests: Vec<ManifestGroup>,
}

impl<'de> Deserialize<'de> for ManifestIndex {
    /// Only the outer shape is mandatory, see `ManifestGroup::from_value()`.
    ///
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawIndex::deserialize(deserializer)?;
        let manifests = raw
            .manifests
            .into_iter()
            .filter_map(ManifestGroup::from_value)
            .collect();
        Ok(ManifestIndex { manifests })
    }
}

impl ManifestIndex {
    pub fn from_slice(data: &[u8]) -> Result<Self, ExportError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Find the manifest path for `version`, `date` and `group`.
    ///
    /// The first record with the right version *and* the group wins, the date is then looked up
    /// in that record only (exact string match).
    ///
    #[tracing::instrument(skip(self))]
    pub fn find(&self, version: &str, date: &str, group: Group) -> Result<String, ExportError> {
        let not_found = || ExportError::ManifestNotFound {
            version: version.to_string(),
            date: date.to_string(),
            group,
        };

        let entries = self
            .manifests
            .iter()
            .find(|m| m.version == version && m.entries(group).is_some())
            .and_then(|m| m.entries(group))
            .ok_or_else(not_found)?;

        let item = entries
            .iter()
            .find(|e| e.date == date)
            .ok_or_else(not_found)?;

        debug!("manifestPath={}", item.path);
        Ok(item.path.clone())
    }
}

/// Free-standing version of `ManifestIndex::find()`.
///
pub fn find_manifest_path(
    index: &ManifestIndex,
    version: &str,
    date: &str,
    group: Group,
) -> Result<String, ExportError> {
    index.find(version, date, group)
}

/// One file of a per-date manifest.  Only `path` is used, the rest is kept for logging.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One category with its files.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub name: String,
    pub files: Vec<FileEntry>,
}

impl Category {
    /// A list holding objects (or nothing) is a category, everything else is metadata.  Objects
    /// without a `path` are dropped one by one.
    ///
    fn from_value(name: String, value: Value) -> Option<Self> {
        let items = match value {
            Value::Array(items) if items.is_empty() || items.iter().any(Value::is_object) => items,
            other => {
                trace!("skipping metadata key {}: {}", name, other);
                return None;
            }
        };

        let files = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<FileEntry>(item) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!("{}: skipping bad file entry: {}", name, e);
                    None
                }
            })
            .collect();
        Some(Category { name, files })
    }
}

/// A per-date manifest, categories in document order.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedManifest {
    categories: Vec<Category>,
}

impl ResolvedManifest {
    pub fn from_slice(data: &[u8]) -> Result<Self, ExportError> {
        let value: Value = serde_json::from_slice(data)?;
        Self::try_from(value)
    }

    /// Category names, in document order
    ///
    pub fn names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Return the paths of all files in `category`, or every file for `all`.  An unknown
    /// category is not an error, there is just nothing to fetch.
    ///
    #[tracing::instrument(skip(self))]
    pub fn files(&self, category: &str) -> Vec<String> {
        let files = self
            .categories
            .iter()
            .filter(|c| category == ALL || c.name == category)
            .flat_map(|c| c.files.iter().map(|f| f.path.clone()))
            .collect::<Vec<_>>();
        debug!("Files to download: {:?}", files);
        files
    }
}

impl TryFrom<Value> for ResolvedManifest {
    type Error = ExportError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(ExportError::Decode(format!(
                    "manifest is not an object: {other}"
                )))
            }
        };

        let categories = map
            .into_iter()
            .filter_map(|(name, v)| Category::from_value(name, v))
            .collect();
        Ok(ResolvedManifest { categories })
    }
}

impl From<Vec<Category>> for ResolvedManifest {
    fn from(categories: Vec<Category>) -> Self {
        ResolvedManifest { categories }
    }
}

/// Free-standing version of `ResolvedManifest::files()`.
///
pub fn files_for_category(resolved: &ResolvedManifest, category: &str) -> Vec<String> {
    resolved.files(category)
}
