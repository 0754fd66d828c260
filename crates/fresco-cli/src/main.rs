use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fresco_cli::config::{Cli, Command, EngineArgs};
use fresco_cli::dev_ledger::{DevLedger, LedgerFile};
use fresco_cli::schedule::FileScheduleController;
use fresco_core::{DurableStore, HotStore};
use fresco_engine::{CanvasCodec, CycleOutcome, EngineConfig, SnapshotEngine};
use fresco_store::{FileDurableStore, FileHotStore, FileStoreConfig};

type Engine = SnapshotEngine<DevLedger, FileDurableStore, FileHotStore, FileScheduleController>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    tokio::fs::create_dir_all(&cli.data_dir).await?;

    match cli.command {
        Command::Init { width, height } => init(&cli.data_dir, width, height).await,
        Command::Run(args) => {
            let engine = build_engine(&cli.data_dir, args).await?;
            let outcome = engine.run_cycle().await?;
            report(&outcome);
            Ok(())
        }
        Command::Watch(args) => watch(&cli.data_dir, args).await,
        Command::History => history(&cli.data_dir).await,
    }
}

/// Seed the data directory: blank canvas snapshot in both stores, ledger
/// file pointing at it.
async fn init(data_dir: &Path, width: u32, height: u32) -> anyhow::Result<()> {
    if width == 0 || height == 0 {
        anyhow::bail!("canvas dimensions must be positive, got {width}x{height}");
    }
    let ledger_path = data_dir.join("ledger.json");
    if tokio::fs::try_exists(&ledger_path).await? {
        anyhow::bail!("ledger file {} already exists", ledger_path.display());
    }

    let durable = FileDurableStore::new(FileStoreConfig {
        base_dir: data_dir.join("durable"),
        ..FileStoreConfig::default()
    })
    .await?;
    let hot = FileHotStore::new(data_dir.join("hot")).await?;

    let codec = CanvasCodec::default();
    let blank = codec.blank_canvas(width, height);
    let bytes = codec.encode(&blank)?;

    let genesis_ref = durable.write(&bytes).await?;
    hot.write(&genesis_ref.hash_hex(), &bytes, "image/png")
        .await?;
    DevLedger::init(&ledger_path, genesis_ref).await?;

    info!(%genesis_ref, width, height, "Genesis snapshot published");
    println!("{genesis_ref}");
    Ok(())
}

async fn build_engine(data_dir: &Path, args: EngineArgs) -> anyhow::Result<Engine> {
    let config: EngineConfig = args.into_engine_config()?;

    let ledger = Arc::new(DevLedger::new(data_dir.join("ledger.json")));
    let durable = Arc::new(
        FileDurableStore::new(FileStoreConfig {
            base_dir: data_dir.join("durable"),
            ..FileStoreConfig::default()
        })
        .await?,
    );
    let hot = Arc::new(FileHotStore::new(data_dir.join("hot")).await?);
    let scheduler = Arc::new(FileScheduleController::new(data_dir.join("interval")));

    Ok(SnapshotEngine::new(ledger, durable, hot, scheduler, config))
}

/// Loop until interrupted, sleeping for the cadence-chosen interval
/// between cycles.
async fn watch(data_dir: &Path, args: EngineArgs) -> anyhow::Result<()> {
    let engine = build_engine(data_dir, args).await?;
    let scheduler = FileScheduleController::new(data_dir.join("interval"));
    let idle_minutes = engine.config().max_interval_minutes;

    loop {
        match engine.run_cycle().await {
            Ok(outcome) => report(&outcome),
            // Another writer won the conditional commit; a retry against
            // the same base would lose again.
            Err(e) if e.is_commit_rejected() => return Err(e.into()),
            Err(e) => error!(error = %e, "Cycle failed, retrying after the idle interval"),
        }

        let minutes = scheduler.current_interval(idle_minutes).await;
        info!(minutes, "Sleeping until the next cycle");
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(u64::from(minutes) * 60)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                return Ok(());
            }
        }
    }
}

/// Dump the publication history as CSV, newest last.
async fn history(data_dir: &Path) -> anyhow::Result<()> {
    let file = LedgerFile::load(&data_dir.join("ledger.json")).await?;
    println!("kind,block,artifact");
    for event in &file.publications {
        let kind = match event.kind {
            fresco_core::PublicationKind::Snapshot => "snapshot",
            fresco_core::PublicationKind::Delta => "delta",
        };
        println!("{kind},{},{}", event.block, event.artifact_ref);
    }
    Ok(())
}

fn report(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::TooFewBlocks => warn!("Chain shorter than the confirmation depth"),
        CycleOutcome::TooFewEvents { count } => {
            info!(count, "Not enough new color events to commit")
        }
        CycleOutcome::Committed { commits, deferred } => {
            for commit in commits {
                info!(
                    block = commit.new_block,
                    snapshot = %commit.snapshot_ref.short_hash(),
                    delta = %commit.delta_ref.short_hash(),
                    "Committed snapshot"
                );
            }
            if *deferred > 0 {
                info!(deferred, "Changes left for the next cycle");
            }
        }
    }
}
