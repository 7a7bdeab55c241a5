//! Pack data model and read-only projections

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::canonical::canonicalize;
use super::error::PackLoadError;

/// gameId of the built-in fallback pack
pub const GENERAL_GAME_ID: &str = "General";

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Explicit `null` reads as the field's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_version))
}

/// A verified set of categorized prompt templates for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    #[serde(rename = "gameId", default, deserialize_with = "null_as_default")]
    pub game_id: String,

    #[serde(default = "default_version", deserialize_with = "null_as_default_version")]
    pub version: String,

    /// Window title substrings, compared after canonicalization
    #[serde(default, deserialize_with = "null_as_default")]
    pub matchers: Vec<String>,

    /// Category id to category, in document order
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: IndexMap<String, Category>,

    #[serde(skip)]
    canonical_matchers: Vec<String>,
}

/// One hotkey-addressable prompt inside a pack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,

    /// Display-only hotkey text, e.g. `Ctrl+Alt+G`
    #[serde(default, deserialize_with = "null_as_default")]
    pub hotkey: String,

    /// Prompt body, without the Game/Category header
    #[serde(default, deserialize_with = "null_as_default")]
    pub template: String,

    #[serde(
        rename = "secondaryQueryTemplate",
        alias = "ytTemplate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub secondary_query_template: Option<String>,
}

impl Category {
    /// Trimmed label, or `id` when the label is blank
    pub fn display_label<'a>(&'a self, id: &'a str) -> &'a str {
        let label = self.label.trim();
        if label.is_empty() { id } else { label }
    }
}

impl Pack {
    /// The empty terminal fallback pack
    pub fn general() -> Self {
        Self::new(GENERAL_GAME_ID, default_version(), Vec::new(), IndexMap::new())
    }

    pub fn new(
        game_id: impl Into<String>,
        version: impl Into<String>,
        matchers: Vec<String>,
        categories: IndexMap<String, Category>,
    ) -> Self {
        let mut pack = Self {
            game_id: game_id.into(),
            version: version.into(),
            matchers,
            categories,
            canonical_matchers: Vec::new(),
        };
        pack.prepare();
        pack
    }

    /// Parse a verified pack body and apply load-time guard-rails
    ///
    /// Rejects a missing or blank gameId and keeps only the first
    /// `max_categories` categories.
    pub fn from_json(bytes: &[u8], max_categories: usize) -> Result<Self, PackLoadError> {
        debug!(len = bytes.len(), %max_categories, "Pack::from_json: called");
        let mut pack: Pack = serde_json::from_slice(bytes)?;

        pack.game_id = pack.game_id.trim().to_string();
        if pack.game_id.is_empty() {
            return Err(PackLoadError::MissingGameId);
        }

        if pack.categories.len() > max_categories {
            debug!(
                game_id = %pack.game_id,
                count = pack.categories.len(),
                "Pack::from_json: truncating categories"
            );
            pack.categories.truncate(max_categories);
        }

        pack.prepare();
        Ok(pack)
    }

    fn prepare(&mut self) {
        self.canonical_matchers = self
            .matchers
            .iter()
            .map(|m| canonicalize(m))
            .filter(|m| !m.is_empty())
            .collect();
    }

    /// Matchers in canonical form, blanks removed
    pub fn canonical_matchers(&self) -> &[String] {
        &self.canonical_matchers
    }

    pub fn is_general(&self) -> bool {
        self.game_id.eq_ignore_ascii_case(GENERAL_GAME_ID)
    }

    /// Look up a category by id, exact first then ignoring ASCII case
    pub fn category(&self, id: &str) -> Option<(&str, &Category)> {
        if let Some((key, category)) = self.categories.get_key_value(id) {
            return Some((key.as_str(), category));
        }
        self.categories
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(id))
            .map(|(key, category)| (key.as_str(), category))
    }

    /// Read-only projection for the UI layer
    pub fn capabilities(&self) -> GameCapabilities {
        let shortcuts = if self.categories.is_empty() {
            ShortcutCapability::legacy_defaults()
        } else {
            self.categories
                .iter()
                .map(|(id, category)| ShortcutCapability {
                    id: id.clone(),
                    label: category.display_label(id).to_string(),
                    hotkey_text: category.hotkey.clone(),
                })
                .collect()
        };

        GameCapabilities {
            game_name: self.game_id.clone(),
            shortcuts,
        }
    }
}

/// What the UI may show for the active game
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameCapabilities {
    pub game_name: String,
    pub shortcuts: Vec<ShortcutCapability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortcutCapability {
    pub id: String,
    pub label: String,
    pub hotkey_text: String,
}

impl ShortcutCapability {
    fn new(id: &str, label: &str, hotkey_text: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            hotkey_text: hotkey_text.to_string(),
        }
    }

    /// Shortcuts offered before any pack with categories is installed
    pub fn legacy_defaults() -> Vec<Self> {
        vec![
            Self::new("Quest", "Quest / Mission", "Ctrl+Alt+Q"),
            Self::new("GunMods", "Gun / Mods", "Ctrl+Alt+G"),
            Self::new("LootItem", "Loot / Item", "Ctrl+Alt+L"),
            Self::new("KeysCards", "Keys / Cards", "Ctrl+Alt+K"),
        ]
    }
}
