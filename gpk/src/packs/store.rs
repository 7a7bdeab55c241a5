//! In-memory pack store, loaded from verified files on disk

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::PackLoadError;
use super::model::{GENERAL_GAME_ID, Pack};
use super::resolver::Resolution;
use crate::config::Config;
use crate::integrity::{IntegrityError, IntegrityVerifier, MAX_SIGNATURE_BYTES};
use crate::sync::{ARTIFACT_EXT, ArtifactPaths};

/// Immutable snapshot of loaded packs in registration order
///
/// Always contains a General pack.
#[derive(Debug, Clone)]
pub struct PackSet {
    packs: Vec<Arc<Pack>>,
}

impl PackSet {
    pub fn new(mut packs: Vec<Arc<Pack>>) -> Self {
        if !packs.iter().any(|p| p.game_id.eq_ignore_ascii_case(GENERAL_GAME_ID)) {
            packs.push(Arc::new(Pack::general()));
        }
        Self { packs }
    }

    pub fn packs(&self) -> &[Arc<Pack>] {
        &self.packs
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn get(&self, game_id: &str) -> Option<Arc<Pack>> {
        self.packs
            .iter()
            .find(|p| p.game_id.eq_ignore_ascii_case(game_id))
            .cloned()
    }

    pub fn general(&self) -> Arc<Pack> {
        self.get(GENERAL_GAME_ID)
            .unwrap_or_else(|| Arc::new(Pack::general()))
    }
}

impl Default for PackSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Directories scanned by [`PackStore::load`], in precedence order
#[derive(Debug, Clone)]
pub struct PackSources {
    /// Bundled packs, loaded first
    pub machine_dir: PathBuf,
    /// Synced packs, loaded second; same gameId overrides
    pub user_dir: PathBuf,
}

impl PackSources {
    pub fn from_config(config: &Config) -> Self {
        Self {
            machine_dir: config.paths.machine_packs_dir.clone(),
            user_dir: config.paths.user_packs_dir.clone(),
        }
    }

    fn dirs(&self) -> [&Path; 2] {
        [&self.machine_dir, &self.user_dir]
    }
}

/// Outcome of a load
#[derive(Debug, Default)]
pub struct LoadReport {
    /// gameIds in registration order, General excluded unless a file provided it
    pub loaded: Vec<String>,
    pub skipped: Vec<(PathBuf, PackLoadError)>,
}

/// Shared pack map
///
/// Readers take a cheap [`PackSet`] snapshot under the lock and work on it
/// outside; a load builds a new set and swaps it in whole.
pub struct PackStore {
    verifier: Arc<IntegrityVerifier>,
    sources: PackSources,
    max_categories: usize,
    current: Mutex<Arc<PackSet>>,
    reload: Mutex<()>,
}

impl PackStore {
    /// Empty store holding only General; call [`load`](Self::load) to populate
    pub fn new(verifier: Arc<IntegrityVerifier>, sources: PackSources, max_categories: usize) -> Self {
        debug!(?sources, %max_categories, "PackStore::new: called");
        Self {
            verifier,
            sources,
            max_categories,
            current: Mutex::new(Arc::new(PackSet::default())),
            reload: Mutex::new(()),
        }
    }

    pub fn sources(&self) -> &PackSources {
        &self.sources
    }

    /// Rescan both directories and replace the pack map
    ///
    /// Never fails: unreadable directories are logged, bad files are reported
    /// in [`LoadReport::skipped`].
    pub fn load(&self) -> LoadReport {
        debug!("PackStore::load: called");
        let _reload = lock(&self.reload);

        let mut packs: Vec<Arc<Pack>> = Vec::new();
        let mut report = LoadReport::default();

        for dir in self.sources.dirs() {
            for path in list_artifacts(dir) {
                match self.load_file(&path) {
                    Ok(pack) => {
                        if let Some(slot) = packs
                            .iter_mut()
                            .find(|p| p.game_id.eq_ignore_ascii_case(&pack.game_id))
                        {
                            debug!(game_id = %pack.game_id, ?path, "PackStore::load: overriding earlier pack");
                            *slot = Arc::new(pack);
                        } else {
                            packs.push(Arc::new(pack));
                        }
                    }
                    Err(e) => {
                        warn!(?path, error = %e, "Skipping pack");
                        report.skipped.push((path, e));
                    }
                }
            }
        }

        report.loaded = packs.iter().map(|p| p.game_id.clone()).collect();
        let set = Arc::new(PackSet::new(packs));
        *lock(&self.current) = set;

        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "Pack store loaded"
        );
        report
    }

    fn load_file(&self, path: &Path) -> Result<Pack, PackLoadError> {
        debug!(?path, "load_file: called");
        let paths = ArtifactPaths::for_artifact(path);
        if !paths.signature.exists() {
            return Err(PackLoadError::MissingSignature(paths.signature));
        }

        let data = read_capped(&paths.data, self.verifier.max_artifact_bytes())?;
        let signature = read_capped(&paths.signature, MAX_SIGNATURE_BYTES)?;
        self.verifier.check(&data, &signature)?;
        Pack::from_json(&data, self.max_categories)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<PackSet> {
        lock(&self.current).clone()
    }

    pub fn resolve(&self, raw_title: &str) -> Arc<Pack> {
        self.snapshot().resolve(raw_title)
    }

    pub fn resolve_with_reason(&self, raw_title: &str) -> Resolution {
        self.snapshot().resolve_with_reason(raw_title)
    }
}

/// Reload `store` on every change notification until cancelled or the sender is gone
pub fn spawn_reload_listener(
    store: Arc<PackStore>,
    mut changes: watch::Receiver<u64>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    debug!("spawn_reload_listener: called");
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("spawn_reload_listener: cancelled");
                    break;
                }
                changed = changes.changed() => {
                    if changed.is_err() {
                        debug!("spawn_reload_listener: notifier dropped");
                        break;
                    }
                    let generation = *changes.borrow_and_update();
                    let store = store.clone();
                    match tokio::task::spawn_blocking(move || store.load()).await {
                        Ok(report) => info!(%generation, loaded = report.loaded.len(), "Packs reloaded after sync"),
                        Err(e) => warn!(%generation, error = %e, "Pack reload task failed"),
                    }
                }
            }
        }
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read `path` unless its on-disk size already exceeds `limit`
fn read_capped(path: &Path, limit: usize) -> Result<Vec<u8>, PackLoadError> {
    let io_err = |source| PackLoadError::Read {
        path: path.to_path_buf(),
        source,
    };
    let size = usize::try_from(fs::metadata(path).map_err(io_err)?.len()).unwrap_or(usize::MAX);
    if size > limit {
        return Err(IntegrityError::TooLarge { size, limit }.into());
    }
    fs::read(path).map_err(io_err)
}

/// `*.gpack` files in `dir`, sorted by file name
fn list_artifacts(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(?dir, error = %e, "list_artifacts: directory not readable");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == ARTIFACT_EXT))
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::TrustRoot;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::{Signature, SigningKey};
    use std::time::Duration;
    use tempfile::TempDir;

    fn signing_key() -> SigningKey {
        SigningKey::from_slice(&[0x21; 32]).unwrap()
    }

    fn write_signed(dir: &Path, name: &str, body: &str) {
        fs::create_dir_all(dir).unwrap();
        let sig: Signature = signing_key().sign(body.as_bytes());
        fs::write(dir.join(format!("{}.gpack", name)), body).unwrap();
        fs::write(dir.join(format!("{}.sig", name)), STANDARD.encode(sig.to_bytes())).unwrap();
    }

    fn pack_json(game_id: &str, version: &str, matchers: &[&str]) -> String {
        serde_json::json!({
            "gameId": game_id,
            "version": version,
            "matchers": matchers,
            "categories": { "Quest": { "label": "Quest", "template": "Explain" } }
        })
        .to_string()
    }

    struct Fixture {
        temp: TempDir,
        store: PackStore,
    }

    impl Fixture {
        fn machine(&self) -> PathBuf {
            self.temp.path().join("machine")
        }

        fn user(&self) -> PathBuf {
            self.temp.path().join("user")
        }
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let verifier = Arc::new(IntegrityVerifier::new(
            TrustRoot::from_key(signing_key().verifying_key().clone()),
            512 * 1024,
        ));
        let sources = PackSources {
            machine_dir: temp.path().join("machine"),
            user_dir: temp.path().join("user"),
        };
        let store = PackStore::new(verifier, sources, 16);
        Fixture { temp, store }
    }

    #[test]
    fn test_new_store_has_general_only() {
        let f = fixture();
        let snapshot = f.store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(f.store.resolve("Anything").is_general());
    }

    #[test]
    fn test_load_missing_dirs_yields_general() {
        let f = fixture();
        let report = f.store.load();
        assert!(report.loaded.is_empty());
        assert!(report.skipped.is_empty());
        assert!(f.store.resolve("").is_general());
    }

    #[test]
    fn test_load_verified_packs() {
        let f = fixture();
        write_signed(&f.machine(), "arc", &pack_json("ArcRaiders", "1", &["Arc Raiders"]));
        write_signed(&f.user(), "eft", &pack_json("EscapeFromTarkov", "1", &["Escape from Tarkov"]));

        let report = f.store.load();
        assert_eq!(report.loaded, ["ArcRaiders", "EscapeFromTarkov"]);
        assert_eq!(f.store.resolve("EscapeFromTarkov.exe - Live").game_id, "EscapeFromTarkov");
        assert_eq!(f.store.snapshot().len(), 3);
    }

    #[test]
    fn test_user_dir_overrides_machine_in_place() {
        let f = fixture();
        write_signed(&f.machine(), "a", &pack_json("Alpha", "1", &["alpha"]));
        write_signed(&f.machine(), "b", &pack_json("Beta", "1", &["beta"]));
        write_signed(&f.user(), "alpha-new", &pack_json("ALPHA", "2", &["alpha"]));

        let report = f.store.load();
        assert_eq!(report.loaded, ["ALPHA", "Beta"]);
        assert_eq!(f.store.resolve("alpha").version, "2");
    }

    #[test]
    fn test_bad_files_are_skipped_individually() {
        let f = fixture();
        write_signed(&f.machine(), "good", &pack_json("Good", "1", &[]));
        write_signed(&f.machine(), "nogameid", r#"{"version":"1"}"#);
        write_signed(&f.machine(), "garbage", "{ not json");

        // Valid JSON but signature over different bytes
        write_signed(&f.machine(), "tampered", &pack_json("Tampered", "1", &[]));
        fs::write(f.machine().join("tampered.gpack"), pack_json("Tampered", "2", &[])).unwrap();

        // No signature at all
        fs::write(f.machine().join("unsigned.gpack"), pack_json("Unsigned", "1", &[])).unwrap();

        let report = f.store.load();
        assert_eq!(report.loaded, ["Good"]);
        assert_eq!(report.skipped.len(), 4);

        let reason = |name: &str| {
            report
                .skipped
                .iter()
                .find(|(p, _)| p.file_name().is_some_and(|n| n == format!("{}.gpack", name).as_str()))
                .map(|(_, e)| e)
                .unwrap()
        };
        assert!(matches!(reason("nogameid"), PackLoadError::MissingGameId));
        assert!(matches!(reason("garbage"), PackLoadError::Parse(_)));
        assert!(reason("tampered").is_integrity());
        assert!(matches!(reason("unsigned"), PackLoadError::MissingSignature(_)));
    }

    #[test]
    fn test_oversize_files_skipped_before_reading() {
        let f = fixture();
        write_signed(&f.machine(), "good", &pack_json("Good", "1", &[]));

        // Sparse file past the ceiling: the metadata check rejects it
        write_signed(&f.machine(), "huge", &pack_json("Huge", "1", &[]));
        fs::File::create(f.machine().join("huge.gpack"))
            .unwrap()
            .set_len(64 * 1024 * 1024)
            .unwrap();

        write_signed(&f.machine(), "bigsig", &pack_json("BigSig", "1", &[]));
        fs::write(f.machine().join("bigsig.sig"), "A".repeat(MAX_SIGNATURE_BYTES + 1)).unwrap();

        let report = f.store.load();
        assert_eq!(report.loaded, ["Good"]);
        assert_eq!(report.skipped.len(), 2);
        for (_, e) in &report.skipped {
            assert!(matches!(e, PackLoadError::Integrity(IntegrityError::TooLarge { .. })));
        }
    }

    #[test]
    fn test_registration_order_stable_across_reloads() {
        let f = fixture();
        write_signed(&f.machine(), "c", &pack_json("Charlie", "1", &["game"]));
        write_signed(&f.machine(), "a", &pack_json("Alpha", "1", &["game"]));
        write_signed(&f.user(), "b", &pack_json("Bravo", "1", &["game"]));

        let first = f.store.load();
        assert_eq!(first.loaded, ["Alpha", "Charlie", "Bravo"]);
        assert_eq!(f.store.resolve("Some Game").game_id, "Alpha");

        for _ in 0..5 {
            let report = f.store.load();
            assert_eq!(report.loaded, first.loaded);
            assert_eq!(f.store.resolve("Some Game").game_id, "Alpha");
        }
    }

    #[test]
    fn test_snapshot_is_unaffected_by_reload() {
        let f = fixture();
        write_signed(&f.machine(), "a", &pack_json("Alpha", "1", &[]));
        f.store.load();
        let before = f.store.snapshot();

        write_signed(&f.machine(), "a", &pack_json("Alpha", "2", &[]));
        f.store.load();

        assert_eq!(before.get("Alpha").unwrap().version, "1");
        assert_eq!(f.store.snapshot().get("Alpha").unwrap().version, "2");
    }

    #[test]
    fn test_general_pack_from_disk_is_kept() {
        let f = fixture();
        write_signed(&f.machine(), "general", &pack_json("General", "3", &[]));
        f.store.load();

        let snapshot = f.store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.general().version, "3");
    }

    #[tokio::test]
    async fn test_reload_listener_reloads_on_notification() {
        let f = fixture();
        let store = Arc::new(f.store);
        let (tx, rx) = watch::channel(0u64);
        let cancel = CancellationToken::new();
        let handle = spawn_reload_listener(store.clone(), rx, cancel.clone());

        write_signed(&f.temp.path().join("user"), "a", &pack_json("Alpha", "1", &[]));
        tx.send_modify(|g| *g += 1);

        let mut reloaded = false;
        for _ in 0..200 {
            if store.snapshot().get("Alpha").is_some() {
                reloaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(reloaded, "store should reload after notification");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("listener should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_reload_listener_stops_when_sender_dropped() {
        let f = fixture();
        let (tx, rx) = watch::channel(0u64);
        let handle = spawn_reload_listener(Arc::new(f.store), rx, CancellationToken::new());

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("listener should stop")
            .unwrap();
    }
}
