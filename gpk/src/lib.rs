//! Gamepacks - signed content pack sync and window title resolution
//!
//! Content packs map a recognized game to categorized prompt templates. They
//! are published as signed artifacts next to a remote index, synced to disk,
//! verified again on load and resolved from free-text foreground window titles.
//!
//! # Modules
//!
//! - [`integrity`] - ECDSA P-256 verification, trust root and size ceiling
//! - [`sync`] - Index diff, download, verify and atomic install
//! - [`packs`] - Pack store, canonicalization and resolution
//! - [`prompts`] - Prompt frame, secondary queries and fallback queries
//! - [`service`] - Facade used by the UI layer
//! - [`detect`] - Window title debouncing
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod detect;
pub mod integrity;
pub mod packs;
pub mod prompts;
pub mod service;
pub mod sync;

// Re-export commonly used types
pub use config::Config;
pub use detect::TitleDebouncer;
pub use integrity::{IntegrityError, IntegrityVerifier, KeySource, TrustError, TrustRoot};
pub use packs::{
    Category, GameCapabilities, LoadReport, MatchKind, Pack, PackLoadError, PackSet, PackSources, PackStore,
    ShortcutCapability, canonicalize, spawn_reload_listener,
};
pub use prompts::{SecondaryQueryError, TemplateEngine, synthesize_fallback_query};
pub use service::PackService;
pub use sync::{
    ChangeNotifier, EntryError, FetchError, HttpFetcher, PackFetcher, PackIndex, PackIndexEntry, SyncEngine,
    SyncOutcome, SyncReport, SyncSchedule, SyncTargets,
};
