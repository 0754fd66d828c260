use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use fresco_core::IndexMode;
use fresco_engine::EngineConfig;

#[derive(Parser)]
#[command(name = "fresco", about = "Incremental snapshot engine for an event-sourced pixel canvas")]
pub struct Cli {
    /// Data directory holding the ledger file, artifact stores, and
    /// schedule state
    #[arg(long, env = "FRESCO_DATA_DIR", default_value = "./fresco-data")]
    pub data_dir: PathBuf,

    /// Log filter (overridden by RUST_LOG when set)
    #[arg(long, env = "FRESCO_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a blank-canvas genesis snapshot and the ledger file
    Init {
        /// Canvas width in cells
        #[arg(long, env = "FRESCO_CANVAS_WIDTH", default_value_t = 1_000)]
        width: u32,
        /// Canvas height in cells
        #[arg(long, env = "FRESCO_CANVAS_HEIGHT", default_value_t = 1_000)]
        height: u32,
    },
    /// Run a single snapshot cycle
    Run(EngineArgs),
    /// Run cycles in a loop, sleeping for the cadence-chosen interval
    Watch(EngineArgs),
    /// Print the artifact publication history as CSV
    History,
}

/// Indexing convention flag (see [`IndexMode`])
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexModeArg {
    OneBased,
    ZeroBased,
}

impl From<IndexModeArg> for IndexMode {
    fn from(arg: IndexModeArg) -> Self {
        match arg {
            IndexModeArg::OneBased => IndexMode::OneBased,
            IndexModeArg::ZeroBased => IndexMode::ZeroBased,
        }
    }
}

#[derive(Debug, Args)]
pub struct EngineArgs {
    /// Canvas region to snapshot
    #[arg(long, env = "FRESCO_REGION", default_value_t = 0)]
    pub region: u64,

    /// Confirmation depth in blocks
    #[arg(long, env = "FRESCO_CONFIRMATIONS", default_value_t = 2)]
    pub confirmations: u64,

    /// Minimum change count before a cycle commits
    #[arg(long, env = "FRESCO_MIN_BATCH", default_value_t = 3_000)]
    pub min_batch: usize,

    /// Maximum change count per commit
    #[arg(long, env = "FRESCO_MAX_BATCH", default_value_t = 3_500)]
    pub max_batch: usize,

    /// Polling interval while the canvas is active (minutes)
    #[arg(long, env = "FRESCO_MIN_INTERVAL", default_value_t = 20)]
    pub min_interval: u32,

    /// Polling interval while the canvas is idle (minutes)
    #[arg(long, env = "FRESCO_MAX_INTERVAL", default_value_t = 100)]
    pub max_interval: u32,

    /// Pixel/color indexing convention of the region's events
    #[arg(long, env = "FRESCO_INDEX_MODE", value_enum, default_value_t = IndexModeArg::OneBased)]
    pub index_mode: IndexModeArg,
}

impl EngineArgs {
    /// Validate and convert into an engine configuration. All parameter
    /// problems surface here, before any store or ledger is touched.
    pub fn into_engine_config(self) -> anyhow::Result<EngineConfig> {
        if self.confirmations == 0 {
            anyhow::bail!("--confirmations must be positive");
        }
        if self.min_batch > self.max_batch {
            anyhow::bail!(
                "--min-batch {} exceeds --max-batch {}",
                self.min_batch,
                self.max_batch
            );
        }
        if self.min_interval == 0 || self.min_interval > self.max_interval {
            anyhow::bail!(
                "interval bounds {}..{} are not a valid range",
                self.min_interval,
                self.max_interval
            );
        }
        Ok(EngineConfig::default()
            .with_region(self.region)
            .with_confirmations(self.confirmations)
            .with_batch_bounds(self.min_batch, self.max_batch)
            .with_intervals(self.min_interval, self.max_interval)
            .with_index_mode(self.index_mode.into()))
    }
}
