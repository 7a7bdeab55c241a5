//! Packs: verified loading, in-memory store and title resolution
//!
//! [`PackStore`] scans the machine and user pack directories, verifies every
//! `*.gpack` against its detached signature, parses it into a [`Pack`] and
//! swaps a new [`PackSet`] snapshot in whole. Resolution runs on a snapshot and
//! never touches the disk or the network.

mod canonical;
mod error;
mod model;
mod resolver;
mod store;

pub use canonical::canonicalize;
pub use error::PackLoadError;
pub use model::{Category, GENERAL_GAME_ID, GameCapabilities, Pack, ShortcutCapability};
pub use resolver::{MatchKind, Resolution};
pub use store::{LoadReport, PackSet, PackSources, PackStore, spawn_reload_listener};
