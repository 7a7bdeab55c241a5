//! Consumer facade over the pack store and template engine

use std::sync::Arc;

use tracing::debug;

use crate::packs::{GameCapabilities, PackStore};
use crate::prompts::{SecondaryQueryError, TemplateEngine, synthesize_fallback_query};

/// The only surface the UI layer talks to
///
/// Every method resolves the title against the current snapshot and returns
/// plain values; nothing here blocks on I/O or fails.
pub struct PackService {
    store: Arc<PackStore>,
    templates: TemplateEngine,
}

impl PackService {
    pub fn new(store: Arc<PackStore>, templates: TemplateEngine) -> Self {
        Self { store, templates }
    }

    pub fn store(&self) -> &Arc<PackStore> {
        &self.store
    }

    /// Prompt for `category` of the pack matching `raw_title`
    pub fn get_prompt(&self, raw_title: &str, category: &str, ocr_snippet: Option<&str>) -> String {
        debug!(%raw_title, %category, "PackService::get_prompt: called");
        let pack = self.store.resolve(raw_title);
        self.templates.render_prompt(&pack, category, ocr_snippet)
    }

    pub fn get_active_capabilities(&self, raw_title: &str) -> GameCapabilities {
        debug!(%raw_title, "PackService::get_active_capabilities: called");
        self.store.resolve(raw_title).capabilities()
    }

    /// Pack-tailored secondary query, `None` when the pack cannot provide one
    pub fn try_build_secondary_query(&self, raw_title: &str, category: &str, response_text: &str) -> Option<String> {
        self.build_secondary_query(raw_title, category, response_text).ok()
    }

    pub fn build_secondary_query(
        &self,
        raw_title: &str,
        category: &str,
        response_text: &str,
    ) -> Result<String, SecondaryQueryError> {
        debug!(%raw_title, %category, "PackService::build_secondary_query: called");
        let pack = self.store.resolve(raw_title);
        self.templates.render_secondary_query(&pack, category, response_text)
    }

    /// Pack-tailored query, else one synthesized from the response
    pub fn secondary_query_or_fallback(&self, raw_title: &str, category: &str, response_text: &str) -> String {
        let pack = self.store.resolve(raw_title);
        match self.templates.render_secondary_query(&pack, category, response_text) {
            Ok(query) => query,
            Err(e) => {
                debug!(error = %e, "PackService::secondary_query_or_fallback: synthesizing");
                synthesize_fallback_query(&pack.game_id, response_text)
            }
        }
    }
}
