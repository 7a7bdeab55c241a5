//! Secondary query rendering
//!
//! A category may carry a follow-up query template such as `<WeaponBase> build`.
//! `{Game}` and `{Category}` are substituted from the pack; every `<Token>` is
//! filled from a bold `**Heading:** value` line of the AI response. A template
//! with any token left unfilled is not used at all.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::packs::Pack;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecondaryQueryError {
    #[error("Category '{0}' not found in pack")]
    UnknownCategory(String),

    #[error("Category has no secondary query template")]
    NoTemplate,

    #[error("Response does not satisfy placeholders: {}", missing.join(", "))]
    Unsatisfiable { missing: Vec<String> },
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>\r\n]+)>").expect("static placeholder pattern"));

static ANY_HEADING: LazyLock<Regex> =
    LazyLock::new(|| heading_regex(r"[^*:\r\n]+?").expect("static heading pattern"));

/// Heading spellings that differ from common token names
const SYNONYMS: [(&str, &str); 6] = [
    ("weaponbase", "Weapon"),
    ("weapon", "Weapon"),
    ("quest", "Quest"),
    ("item", "Item"),
    ("key/card", "Key/Card"),
    ("keycard", "Key/Card"),
];

/// `**Name:** value`, `**Name**: value` or `**Name:** **value**`
fn heading_regex(name_pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?i)\*\*\s*{}\s*(?:\*\*\s*:|:\s*\*\*|:)[ \t]*(?P<val>[^\r\n]+)",
        name_pattern
    ))
}

fn clean_value(raw: &str) -> Option<String> {
    let value = raw.replace("**", "").trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}

/// Value of the first `**heading:**` line, ignoring case
fn extract_heading(heading: &str, text: &str) -> Option<String> {
    let heading = heading.trim();
    if heading.is_empty() {
        return None;
    }
    let re = heading_regex(&regex::escape(heading)).ok()?;
    re.captures_iter(text)
        .filter_map(|caps| caps.name("val").and_then(|m| clean_value(m.as_str())))
        .next()
}

/// Resolve a placeholder token against the response text
///
/// Tries the exact heading, the name without a `Base` suffix, the synonym
/// table, and finally the first bold heading in the response.
pub fn extract_token_value(token: &str, text: &str) -> Option<String> {
    debug!(%token, "extract_token_value: called");
    if text.trim().is_empty() {
        return None;
    }
    let token = token.trim();

    if let Some(value) = extract_heading(token, text) {
        return Some(value);
    }

    if token.len() > 4 && token.to_ascii_lowercase().ends_with("base") {
        let root = &token[..token.len() - 4];
        if let Some(value) = extract_heading(root, text) {
            debug!(%token, %root, "extract_token_value: matched without Base suffix");
            return Some(value);
        }
    }

    let normalized = token.to_lowercase();
    if let Some((_, heading)) = SYNONYMS.iter().find(|(name, _)| *name == normalized)
        && let Some(value) = extract_heading(heading, text)
    {
        debug!(%token, %heading, "extract_token_value: matched synonym");
        return Some(value);
    }

    let value = ANY_HEADING
        .captures_iter(text)
        .filter_map(|caps| caps.name("val").and_then(|m| clean_value(m.as_str())))
        .next();
    if value.is_some() {
        debug!(%token, "extract_token_value: using first heading");
    }
    value
}

/// Render the secondary query of `category_id` in `pack` from `response_text`
pub fn render_secondary_query(
    pack: &Pack,
    category_id: &str,
    response_text: &str,
) -> Result<String, SecondaryQueryError> {
    debug!(game_id = %pack.game_id, %category_id, "render_secondary_query: called");
    let (id, category) = pack
        .category(category_id)
        .ok_or_else(|| SecondaryQueryError::UnknownCategory(category_id.to_string()))?;

    let template = category
        .secondary_query_template
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(SecondaryQueryError::NoTemplate)?;

    let game = if pack.game_id.trim().is_empty() { "Game" } else { pack.game_id.as_str() };
    let mut result = template
        .replace("{Game}", game)
        .replace("{Category}", category.display_label(id));

    let mut tokens: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(&result) {
        let placeholder = caps[0].to_string();
        if !tokens.contains(&placeholder) {
            tokens.push(placeholder);
        }
    }

    let mut missing = Vec::new();
    for placeholder in tokens {
        let name = &placeholder[1..placeholder.len() - 1];
        match extract_token_value(name, response_text) {
            Some(value) => result = result.replace(&placeholder, &value),
            None => missing.push(name.to_string()),
        }
    }

    if !missing.is_empty() {
        debug!(?missing, "render_secondary_query: unsatisfiable");
        return Err(SecondaryQueryError::Unsatisfiable { missing });
    }

    Ok(result.replace("**", "").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packs::Category;
    use indexmap::IndexMap;

    fn pack_with(template: Option<&str>) -> Pack {
        let mut categories = IndexMap::new();
        categories.insert(
            "GunMods".to_string(),
            Category {
                label: "Gun Mods".to_string(),
                template: "Give weapon mod advice".to_string(),
                secondary_query_template: template.map(str::to_string),
                ..Default::default()
            },
        );
        Pack::new("EscapeFromTarkov", "1", vec![], categories)
    }

    #[test]
    fn test_base_suffix_scenario() {
        let pack = pack_with(Some("<WeaponBase> build"));
        let response = "Here is your build.\n**Weapon:** AK-74\n**Mods:** PSO scope";

        assert_eq!(
            render_secondary_query(&pack, "GunMods", response).unwrap(),
            "AK-74 build"
        );
    }

    #[test]
    fn test_unsatisfiable_without_headings() {
        let pack = pack_with(Some("<Quest> walkthrough"));
        let response = "Go to the lighthouse and talk to the trader.";

        assert_eq!(
            render_secondary_query(&pack, "GunMods", response),
            Err(SecondaryQueryError::Unsatisfiable {
                missing: vec!["Quest".to_string()]
            })
        );
    }

    #[test]
    fn test_game_and_category_tokens() {
        let pack = pack_with(Some("{Game} {Category} <Weapon> meta"));
        let response = "**Weapon**: M4A1";

        assert_eq!(
            render_secondary_query(&pack, "GunMods", response).unwrap(),
            "EscapeFromTarkov Gun Mods M4A1 meta"
        );
    }

    #[test]
    fn test_bold_value_is_unwrapped() {
        let pack = pack_with(Some("<Weapon> build"));
        assert_eq!(
            render_secondary_query(&pack, "GunMods", "**Weapon:** **AK-74M**").unwrap(),
            "AK-74M build"
        );
    }

    #[test]
    fn test_repeated_token_resolved_once() {
        let pack = pack_with(Some("<Weapon> vs <Weapon>"));
        assert_eq!(
            render_secondary_query(&pack, "GunMods", "**weapon:** SVD").unwrap(),
            "SVD vs SVD"
        );
    }

    #[test]
    fn test_synonym_table() {
        let pack = pack_with(Some("<keycard> location"));
        assert_eq!(
            render_secondary_query(&pack, "GunMods", "**Key/Card:** Marked key").unwrap(),
            "Marked key location"
        );
    }

    #[test]
    fn test_first_heading_last_resort() {
        let pack = pack_with(Some("<Boss> weakness"));
        let response = "Intro line\n**Target:** Killa\n**Other:** ignored";
        assert_eq!(
            render_secondary_query(&pack, "GunMods", response).unwrap(),
            "Killa weakness"
        );
    }

    #[test]
    fn test_partial_resolution_fails_whole_render() {
        let pack = pack_with(Some("<Weapon> <Quest>"));
        // The first-heading fallback fills anything once a heading exists, so
        // use an empty heading value to leave nothing usable
        let err = render_secondary_query(&pack, "GunMods", "**Weapon:**   \n").unwrap_err();
        assert_eq!(
            err,
            SecondaryQueryError::Unsatisfiable {
                missing: vec!["Weapon".to_string(), "Quest".to_string()]
            }
        );
    }

    #[test]
    fn test_no_template_and_unknown_category() {
        assert_eq!(
            render_secondary_query(&pack_with(None), "GunMods", "**Weapon:** AK"),
            Err(SecondaryQueryError::NoTemplate)
        );
        assert_eq!(
            render_secondary_query(&pack_with(Some("  ")), "GunMods", "**Weapon:** AK"),
            Err(SecondaryQueryError::NoTemplate)
        );
        assert_eq!(
            render_secondary_query(&pack_with(Some("x")), "Loot", ""),
            Err(SecondaryQueryError::UnknownCategory("Loot".to_string()))
        );
    }

    #[test]
    fn test_template_without_placeholders() {
        let pack = pack_with(Some("{Game} **best** loadouts"));
        assert_eq!(
            render_secondary_query(&pack, "GunMods", "").unwrap(),
            "EscapeFromTarkov best loadouts"
        );
    }

    #[test]
    fn test_extract_heading_variants() {
        assert_eq!(extract_heading("Weapon", "**Weapon:** AK-74").as_deref(), Some("AK-74"));
        assert_eq!(extract_heading("Weapon", "- **Weapon**: AK-74 ").as_deref(), Some("AK-74"));
        assert_eq!(extract_heading("Key/Card", "**Key/Card:** Dorm 314").as_deref(), Some("Dorm 314"));
        assert_eq!(extract_heading("Weapon", "Weapon: AK-74"), None);
    }
}
