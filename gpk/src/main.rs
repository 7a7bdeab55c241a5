//! gpk - signed game pack sync and resolution
//!
//! CLI entry point: composition root for the verifier, sync engine, pack store
//! and template engine.

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::CommandFactory;
use clap::Parser;
use eyre::{Context, Result, eyre};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use gamepacks::cli::{Cli, Command, OutputFormat, get_log_path};
use gamepacks::config::Config;
use gamepacks::detect::TitleDebouncer;
use gamepacks::integrity::{IntegrityVerifier, TrustRoot};
use gamepacks::packs::{PackSources, PackStore, spawn_reload_listener};
use gamepacks::prompts::TemplateEngine;
use gamepacks::service::PackService;
use gamepacks::sync::{
    ArtifactPaths, ChangeNotifier, DEFAULT_MAX_RESPONSE_BYTES, HttpFetcher, SyncEngine, SyncOutcome, SyncSchedule,
    SyncTargets,
};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(index = %config.sync.index_url(), "gpk loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Sync) => cmd_sync(&config).await,
        Some(Command::Watch) => cmd_watch(&config).await,
        Some(Command::Packs) => cmd_packs(&config),
        Some(Command::Resolve { title }) => cmd_resolve(&config, &title),
        Some(Command::Prompt { title, category, ocr }) => {
            let service = build_service(&config)?;
            print!("{}", service.get_prompt(&title, &category, ocr.as_deref()));
            Ok(())
        }
        Some(Command::Capabilities { title, format }) => cmd_capabilities(&config, &title, format),
        Some(Command::Query {
            title,
            category,
            response_file,
        }) => cmd_query(&config, &title, &category, &response_file),
        Some(Command::Detect) => cmd_detect(&config),
        Some(Command::Verify { artifact, sig }) => cmd_verify(&config, &artifact, sig),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

fn build_verifier(config: &Config) -> Result<Arc<IntegrityVerifier>> {
    let trust = TrustRoot::load(&config.key_override_path()).context("Failed to load trust root")?;
    debug!(source = ?trust.source(), "build_verifier: trust root ready");
    Ok(Arc::new(IntegrityVerifier::new(trust, config.limits.max_artifact_bytes)))
}

fn build_store(config: &Config, verifier: Arc<IntegrityVerifier>) -> Arc<PackStore> {
    let store = Arc::new(PackStore::new(
        verifier,
        PackSources::from_config(config),
        config.limits.max_categories,
    ));
    store.load();
    store
}

fn build_service(config: &Config) -> Result<PackService> {
    let store = build_store(config, build_verifier(config)?);
    Ok(PackService::new(store, TemplateEngine::new(config.limits.ocr_max_chars)))
}

fn build_engine(config: &Config, verifier: Arc<IntegrityVerifier>, notifier: ChangeNotifier) -> Result<SyncEngine> {
    let fetcher = HttpFetcher::new(config.sync.timeout(), DEFAULT_MAX_RESPONSE_BYTES)
        .context("Failed to create HTTP client")?;
    Ok(SyncEngine::new(
        config.sync.index_url(),
        Arc::new(fetcher),
        verifier,
        SyncTargets::from_config(config),
        notifier,
    ))
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            token.cancel();
        }
    });
}

async fn cmd_sync(config: &Config) -> Result<()> {
    debug!("cmd_sync: called");
    let engine = build_engine(config, build_verifier(config)?, ChangeNotifier::new())?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match engine.run_once(&cancel).await {
        SyncOutcome::Completed(report) => {
            for name in &report.installed {
                println!("installed   {}", name);
            }
            for name in &report.up_to_date {
                println!("up-to-date  {}", name);
            }
            for (name, e) in &report.failed {
                println!("failed      {}: {}", name, e);
            }
            if report.cancelled {
                println!("cancelled");
            }
            Ok(())
        }
        SyncOutcome::Aborted(e) => Err(eyre!("Sync aborted: {}", e)),
        SyncOutcome::AlreadyRunning => Err(eyre!("Sync already running")),
    }
}

async fn cmd_watch(config: &Config) -> Result<()> {
    debug!("cmd_watch: called");
    let verifier = build_verifier(config)?;
    let store = build_store(config, verifier.clone());
    let notifier = ChangeNotifier::new();
    let engine = Arc::new(build_engine(config, verifier, notifier.clone())?);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let listener = spawn_reload_listener(store.clone(), notifier.subscribe(), cancel.clone());
    let schedule = SyncSchedule::from_config(config);
    println!(
        "Watching {} ({} packs loaded), Ctrl-C to stop",
        config.sync.index_url(),
        store.snapshot().len()
    );

    engine.run(schedule, cancel.clone()).await;
    if schedule.interval.is_none() {
        // One-shot schedule: the reload listener has nothing left to wait for
        cancel.cancel();
    }
    listener.await.context("Reload listener panicked")?;
    Ok(())
}

fn cmd_packs(config: &Config) -> Result<()> {
    debug!("cmd_packs: called");
    let store = Arc::new(PackStore::new(
        build_verifier(config)?,
        PackSources::from_config(config),
        config.limits.max_categories,
    ));
    let report = store.load();

    for pack in store.snapshot().packs() {
        println!(
            "{:<24} {:<10} {} categories, {} matchers",
            pack.game_id,
            pack.version,
            pack.categories.len(),
            pack.matchers.len()
        );
    }
    for (path, e) in &report.skipped {
        println!("skipped {}: {}", path.display(), e);
    }
    Ok(())
}

fn cmd_resolve(config: &Config, title: &str) -> Result<()> {
    debug!(%title, "cmd_resolve: called");
    let store = build_store(config, build_verifier(config)?);
    let resolution = store.resolve_with_reason(title);
    println!("{} ({})", resolution.pack.game_id, resolution.kind);
    Ok(())
}

fn cmd_capabilities(config: &Config, title: &str, format: OutputFormat) -> Result<()> {
    debug!(%title, %format, "cmd_capabilities: called");
    let caps = build_service(config)?.get_active_capabilities(title);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&caps)?),
        OutputFormat::Text => {
            println!("{}", caps.game_name);
            for s in &caps.shortcuts {
                println!("  {:<12} {:<20} {}", s.hotkey_text, s.label, s.id);
            }
        }
    }
    Ok(())
}

fn cmd_query(config: &Config, title: &str, category: &str, response_file: &Path) -> Result<()> {
    debug!(%title, %category, ?response_file, "cmd_query: called");
    let response = fs::read_to_string(response_file)
        .context(format!("Failed to read response file {}", response_file.display()))?;
    let service = build_service(config)?;
    println!("{}", service.secondary_query_or_fallback(title, category, &response));
    Ok(())
}

fn cmd_detect(config: &Config) -> Result<()> {
    debug!(debounce = ?config.detect.debounce(), "cmd_detect: called");
    let store = build_store(config, build_verifier(config)?);
    let mut debouncer = TitleDebouncer::from_config(config);

    for line in std::io::stdin().lock().lines() {
        let line = line.context("Failed to read title from stdin")?;
        if let Some(title) = debouncer.observe(&line, Instant::now()) {
            let resolution = store.resolve_with_reason(&title);
            info!(%title, game_id = %resolution.pack.game_id, "Stable window title");
            println!("{} -> {} ({})", title, resolution.pack.game_id, resolution.kind);
        }
    }
    Ok(())
}

fn cmd_verify(config: &Config, artifact: &Path, sig: Option<PathBuf>) -> Result<()> {
    debug!(?artifact, ?sig, "cmd_verify: called");
    let sig = sig.unwrap_or_else(|| ArtifactPaths::for_artifact(artifact).signature);
    let data = fs::read(artifact).context(format!("Failed to read {}", artifact.display()))?;
    let signature = fs::read(&sig).context(format!("Failed to read {}", sig.display()))?;

    let verifier = build_verifier(config)?;
    match verifier.check(&data, &signature) {
        Ok(()) => {
            println!("OK {} ({:?})", artifact.display(), verifier.trust().source());
            Ok(())
        }
        Err(e) => Err(eyre!("Verification failed for {}: {}", artifact.display(), e)),
    }
}
