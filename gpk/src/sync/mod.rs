//! Pack synchronisation
//!
//! Fetches the remote index, diffs it against the artifacts on disk and installs
//! changed entries after verification. Each entry succeeds or fails on its own;
//! only a failure to fetch the index aborts a cycle.
//!
//! The engine only touches the filesystem. Consumers learn about installs
//! through the [`ChangeNotifier`] and reload on their own schedule.

mod engine;
mod error;
mod fetcher;
mod index;
mod install;
mod notify;

pub use engine::{EntryOutcome, SyncEngine, SyncOutcome, SyncReport, SyncSchedule, SyncTargets};
pub use error::{EntryError, FetchError};
pub use fetcher::{DEFAULT_MAX_RESPONSE_BYTES, HttpFetcher, PackFetcher};
pub use index::{Collection, PackIndex, PackIndexEntry};
pub use install::{ARTIFACT_EXT, ArtifactPaths, SIGNATURE_EXT, StagedArtifact, validate_name};
pub use notify::ChangeNotifier;

#[cfg(test)]
pub use fetcher::mock;
