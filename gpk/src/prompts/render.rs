//! Prompt rendering

use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, warn};

use super::embedded::{FRAME, PREAMBLE};
use super::secondary::{SecondaryQueryError, render_secondary_query};
use crate::packs::Pack;

/// Map old hard-coded category labels to their ids; everything else passes through
pub fn map_legacy_category(category: &str) -> &str {
    const LEGACY: [(&str, &str); 3] = [("Gun Mods", "GunMods"), ("Loot", "LootItem"), ("Keys", "KeysCards")];

    let trimmed = category.trim();
    LEGACY
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(trimmed))
        .map(|(_, id)| *id)
        .unwrap_or(trimmed)
}

/// Values substituted into the frame template
#[derive(Debug, Clone, Serialize)]
struct FrameContext<'a> {
    preamble: &'a str,
    game: &'a str,
    category: &'a str,
    body: Option<&'a str>,
    ocr: Option<String>,
}

/// Renders category prompts and secondary queries from pack data
pub struct TemplateEngine {
    hbs: Handlebars<'static>,
    ocr_max_chars: usize,
}

impl TemplateEngine {
    pub fn new(ocr_max_chars: usize) -> Self {
        debug!(%ocr_max_chars, "TemplateEngine::new: called");
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, ocr_max_chars }
    }

    pub fn ocr_max_chars(&self) -> usize {
        self.ocr_max_chars
    }

    /// Full prompt for `category` of `pack`
    ///
    /// An unknown category yields the header-only prompt. Never fails.
    pub fn render_prompt(&self, pack: &Pack, category: &str, ocr_snippet: Option<&str>) -> String {
        debug!(game_id = %pack.game_id, %category, "TemplateEngine::render_prompt: called");
        let category_id = map_legacy_category(category);
        let ocr = self.ocr_excerpt(ocr_snippet);

        let context = match pack.category(category_id) {
            Some((id, cat)) => FrameContext {
                preamble: PREAMBLE,
                game: &pack.game_id,
                category: cat.display_label(id),
                body: Some(cat.template.trim()).filter(|b| !b.is_empty()),
                ocr,
            },
            None => {
                debug!(%category_id, "TemplateEngine::render_prompt: unknown category, header only");
                FrameContext {
                    preamble: PREAMBLE,
                    game: &pack.game_id,
                    category: category_id,
                    body: None,
                    ocr,
                }
            }
        };

        match self.hbs.render_template(FRAME, &context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "Prompt frame failed to render, composing plain prompt");
                compose_plain(&context)
            }
        }
    }

    /// See [`render_secondary_query`]
    pub fn render_secondary_query(
        &self,
        pack: &Pack,
        category: &str,
        response_text: &str,
    ) -> Result<String, SecondaryQueryError> {
        render_secondary_query(pack, map_legacy_category(category), response_text)
    }

    fn ocr_excerpt(&self, ocr_snippet: Option<&str>) -> Option<String> {
        ocr_snippet
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.chars().take(self.ocr_max_chars).collect())
    }
}

fn compose_plain(context: &FrameContext<'_>) -> String {
    let mut out = format!(
        "{}\nGame: {}\nCategory: {}\n",
        context.preamble, context.game, context.category
    );
    if let Some(body) = context.body {
        out.push_str(&format!("\n{}\n", body));
    }
    if let Some(ocr) = &context.ocr {
        out.push_str(&format!("\nOCR: \"{}\"\n", ocr));
    }
    out
}
