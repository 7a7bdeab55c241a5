//! Remote index document

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::error::{EntryError, FetchError};

/// One downloadable artifact announced by the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackIndexEntry {
    #[serde(alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Version")]
    pub version: String,

    #[serde(alias = "Sha256", alias = "SHA256")]
    pub sha256: String,

    #[serde(alias = "Url", alias = "URL")]
    pub url: String,

    #[serde(rename = "sigUrl", alias = "SigUrl", alias = "sigurl", alias = "sig_url")]
    pub sig_url: String,
}

/// `index.json`: two independent entry collections
///
/// Entries are kept as raw JSON and converted one at a time, so a malformed
/// entry only fails itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackIndex {
    #[serde(default, alias = "Packs", deserialize_with = "null_as_empty")]
    pub packs: Vec<serde_json::Value>,

    #[serde(default, alias = "Localization", deserialize_with = "null_as_empty")]
    pub localization: Vec<serde_json::Value>,
}

impl PackIndex {
    pub fn parse(bytes: &[u8]) -> Result<Self, FetchError> {
        let index: Self = serde_json::from_slice(bytes)?;
        debug!(
            packs = index.packs.len(),
            localization = index.localization.len(),
            "PackIndex::parse: parsed"
        );
        Ok(index)
    }

    /// Raw entries of one collection
    pub fn raw_entries(&self, collection: Collection) -> &[serde_json::Value] {
        match collection {
            Collection::Packs => &self.packs,
            Collection::Localization => &self.localization,
        }
    }

    /// Entries of one collection, each converted on its own
    pub fn entries(&self, collection: Collection) -> impl Iterator<Item = Result<PackIndexEntry, EntryError>> + '_ {
        self.raw_entries(collection)
            .iter()
            .enumerate()
            .map(|(position, value)| PackIndexEntry::from_value(position, value))
    }
}

impl PackIndexEntry {
    /// Convert one raw index entry
    pub fn from_value(position: usize, value: &serde_json::Value) -> Result<Self, EntryError> {
        serde_json::from_value(value.clone()).map_err(|e| EntryError::Malformed {
            name: entry_label(position, value),
            reason: e.to_string(),
        })
    }
}

/// Name used to report an entry that may not have a usable `name`
pub fn entry_label(position: usize, value: &serde_json::Value) -> String {
    ["name", "Name"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", position))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Entry collections of the index, in sync order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Packs,
    Localization,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Packs, Collection::Localization];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Packs => "packs",
            Collection::Localization => "localization",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
