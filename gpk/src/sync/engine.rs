//! Sync engine: one cycle, or a periodic schedule of cycles

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::{EntryError, FetchError};
use super::fetcher::PackFetcher;
use super::index::{Collection, PackIndex, PackIndexEntry, entry_label};
use super::install::{ArtifactPaths, StagedArtifact, validate_name};
use super::notify::ChangeNotifier;
use crate::config::Config;
use crate::integrity::IntegrityVerifier;

/// Directories each collection is installed into
#[derive(Debug, Clone)]
pub struct SyncTargets {
    pub packs_dir: PathBuf,
    pub localization_dir: PathBuf,
}

impl SyncTargets {
    pub fn from_config(config: &Config) -> Self {
        Self {
            packs_dir: config.paths.user_packs_dir.clone(),
            localization_dir: config.paths.localization_dir.clone(),
        }
    }

    pub fn dir_for(&self, collection: Collection) -> &Path {
        match collection {
            Collection::Packs => &self.packs_dir,
            Collection::Localization => &self.localization_dir,
        }
    }
}

/// When the periodic loop runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSchedule {
    pub initial_delay: Duration,
    /// `None` runs a single cycle after the initial delay
    pub interval: Option<Duration>,
}

impl SyncSchedule {
    pub fn from_config(config: &Config) -> Self {
        Self {
            initial_delay: config.sync.initial_delay(),
            interval: config.sync.interval(),
        }
    }
}

/// Result of syncing a single entry
#[derive(Debug)]
pub enum EntryOutcome {
    UpToDate,
    Installed,
}

/// What a completed cycle did
#[derive(Debug, Default)]
pub struct SyncReport {
    pub installed: Vec<String>,
    pub up_to_date: Vec<String>,
    pub failed: Vec<(String, EntryError)>,
    /// Cancellation stopped the cycle before every entry was visited
    pub cancelled: bool,
}

impl SyncReport {
    /// At least one entry was installed
    pub fn changed(&self) -> bool {
        !self.installed.is_empty()
    }
}

/// Result of a call to [`SyncEngine::run_once`]
#[derive(Debug)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// The index could not be fetched or parsed; nothing on disk changed
    Aborted(FetchError),
    /// Another cycle holds the single-flight gate
    AlreadyRunning,
}

impl SyncOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Fetches the remote index and installs changed, verified artifacts
pub struct SyncEngine {
    index_url: String,
    fetcher: Arc<dyn PackFetcher>,
    verifier: Arc<IntegrityVerifier>,
    targets: SyncTargets,
    notifier: ChangeNotifier,
    gate: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        index_url: impl Into<String>,
        fetcher: Arc<dyn PackFetcher>,
        verifier: Arc<IntegrityVerifier>,
        targets: SyncTargets,
        notifier: ChangeNotifier,
    ) -> Self {
        let index_url = index_url.into();
        debug!(%index_url, ?targets, "SyncEngine::new: called");
        Self {
            index_url,
            fetcher,
            verifier,
            targets,
            notifier,
            gate: Mutex::new(()),
        }
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn targets(&self) -> &SyncTargets {
        &self.targets
    }

    /// Run one cycle unless one is already in flight
    ///
    /// Never returns an error: index failures abort the cycle, entry failures are
    /// collected in the report. The change notifier fires at most once.
    pub async fn run_once(&self, cancel: &CancellationToken) -> SyncOutcome {
        debug!("SyncEngine::run_once: called");
        let Ok(_guard) = self.gate.try_lock() else {
            info!("Sync cycle already running, skipping");
            return SyncOutcome::AlreadyRunning;
        };

        if cancel.is_cancelled() {
            debug!("SyncEngine::run_once: cancelled before start");
            return SyncOutcome::Completed(SyncReport {
                cancelled: true,
                ..Default::default()
            });
        }

        info!(url = %self.index_url, "Sync cycle started");
        let index = match self.fetch_index().await {
            Ok(index) => index,
            Err(e) => {
                error!(url = %self.index_url, error = %e, "Failed to fetch pack index, cycle aborted");
                return SyncOutcome::Aborted(e);
            }
        };

        let mut report = SyncReport::default();
        'collections: for collection in Collection::ALL {
            let dir = self.targets.dir_for(collection);
            for (position, raw) in index.raw_entries(collection).iter().enumerate() {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break 'collections;
                }

                let entry = match PackIndexEntry::from_value(position, raw) {
                    Ok(entry) => entry,
                    Err(e) => {
                        let name = entry_label(position, raw);
                        warn!(%name, %collection, error = %e, "Skipping malformed index entry");
                        report.failed.push((name, e));
                        continue;
                    }
                };

                match self.sync_entry(&entry, dir, cancel).await {
                    Ok(EntryOutcome::UpToDate) => {
                        debug!(name = %entry.name, %collection, "SyncEngine::run_once: up to date");
                        report.up_to_date.push(entry.name.clone());
                    }
                    Ok(EntryOutcome::Installed) => {
                        info!(name = %entry.name, version = %entry.version, %collection, "Installed artifact");
                        report.installed.push(entry.name.clone());
                    }
                    Err(EntryError::Cancelled) => {
                        debug!(name = %entry.name, "SyncEngine::run_once: cancelled mid-entry");
                        report.cancelled = true;
                        break 'collections;
                    }
                    Err(e) => {
                        warn!(name = %entry.name, %collection, error = %e, "Entry sync failed, keeping previous version");
                        report.failed.push((entry.name.clone(), e));
                    }
                }
            }
        }

        if report.changed() {
            self.notifier.notify();
        }

        info!(
            installed = report.installed.len(),
            up_to_date = report.up_to_date.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "Sync cycle finished"
        );
        SyncOutcome::Completed(report)
    }

    /// Run cycles on `schedule` until `cancel` fires
    ///
    /// Cycles are awaited in sequence so the loop never overlaps itself; a manual
    /// [`run_once`](Self::run_once) racing a tick gets `AlreadyRunning`.
    pub async fn run(self: Arc<Self>, schedule: SyncSchedule, cancel: CancellationToken) {
        info!(?schedule, "SyncEngine started");

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("run: cancelled during initial delay");
                return;
            }
            _ = tokio::time::sleep(schedule.initial_delay) => {}
        }

        let Some(interval) = schedule.interval else {
            debug!("run: one-shot mode");
            self.run_once(&cancel).await;
            return;
        };

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("run: shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    if let SyncOutcome::Aborted(e) = self.run_once(&cancel).await {
                        debug!(retryable = e.is_retryable(), "run: cycle aborted, next tick retries");
                    }
                }
            }
        }

        info!("SyncEngine stopped");
    }

    async fn fetch_index(&self) -> Result<PackIndex, FetchError> {
        debug!("fetch_index: called");
        let bytes = self.fetcher.fetch(&self.index_url).await?;
        PackIndex::parse(&bytes)
    }

    async fn sync_entry(
        &self,
        entry: &PackIndexEntry,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<EntryOutcome, EntryError> {
        debug!(name = %entry.name, ?dir, "sync_entry: called");
        validate_name(&entry.name)?;

        let paths = ArtifactPaths::new(dir, &entry.name);
        if paths.is_current(&entry.sha256) {
            return Ok(EntryOutcome::UpToDate);
        }

        let data = self.fetcher.fetch(&self.resolve_url(&entry.url)).await?;
        checkpoint(cancel)?;
        let signature = self.fetcher.fetch(&self.resolve_url(&entry.sig_url)).await?;
        checkpoint(cancel)?;

        let staged = StagedArtifact::stage(dir, &data, signature.trim_ascii())?;
        self.verifier
            .check_with_hash(&staged.read_data()?, &staged.read_signature()?, &entry.sha256)?;
        checkpoint(cancel)?;

        staged.install(&paths)?;
        Ok(EntryOutcome::Installed)
    }

    /// Absolute URLs pass through; relative ones resolve against the index location
    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let relative = url.trim_start_matches('/');
        match reqwest::Url::parse(&self.index_url).and_then(|base| base.join(relative)) {
            Ok(joined) => joined.to_string(),
            Err(e) => {
                debug!(%url, error = %e, "resolve_url: index URL is not a base");
                url.to_string()
            }
        }
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), EntryError> {
    if cancel.is_cancelled() {
        Err(EntryError::Cancelled)
    } else {
        Ok(())
    }
}
