//! Window title to pack resolution

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::canonical::canonicalize;
use super::model::Pack;
use super::store::PackSet;

/// How a title was matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKind {
    ExactId,
    CaseInsensitiveId,
    /// Canonical matcher that hit
    Matcher(String),
    Fallback,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::ExactId => write!(f, "exact gameId"),
            MatchKind::CaseInsensitiveId => write!(f, "gameId (case-insensitive)"),
            MatchKind::Matcher(m) => write!(f, "matcher '{}'", m),
            MatchKind::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub pack: Arc<Pack>,
    pub kind: MatchKind,
}

impl PackSet {
    /// Resolve a raw window title to a pack; never fails
    ///
    /// Order: exact gameId, gameId ignoring case, then the first pack in
    /// registration order with a canonical matcher contained in the canonical
    /// title, then General.
    pub fn resolve_with_reason(&self, raw_title: &str) -> Resolution {
        debug!(%raw_title, "PackSet::resolve_with_reason: called");
        if raw_title.trim().is_empty() {
            return self.fallback();
        }

        if let Some(pack) = self.packs().iter().find(|p| p.game_id == raw_title) {
            return Resolution {
                pack: pack.clone(),
                kind: MatchKind::ExactId,
            };
        }

        if let Some(pack) = self
            .packs()
            .iter()
            .find(|p| p.game_id.to_lowercase() == raw_title.to_lowercase())
        {
            return Resolution {
                pack: pack.clone(),
                kind: MatchKind::CaseInsensitiveId,
            };
        }

        let title = canonicalize(raw_title);
        if title.is_empty() {
            debug!("PackSet::resolve_with_reason: title canonicalizes to nothing");
            return self.fallback();
        }

        for pack in self.packs() {
            if let Some(matcher) = pack.canonical_matchers().iter().find(|m| title.contains(m.as_str())) {
                debug!(game_id = %pack.game_id, %matcher, "PackSet::resolve_with_reason: matcher hit");
                return Resolution {
                    pack: pack.clone(),
                    kind: MatchKind::Matcher(matcher.clone()),
                };
            }
        }

        self.fallback()
    }

    pub fn resolve(&self, raw_title: &str) -> Arc<Pack> {
        self.resolve_with_reason(raw_title).pack
    }

    fn fallback(&self) -> Resolution {
        Resolution {
            pack: self.general(),
            kind: MatchKind::Fallback,
        }
    }
}
