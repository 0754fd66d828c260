//! File-backed schedule controller.
//!
//! The production deployment adjusts an external cron rule; locally the
//! chosen interval is persisted to a small text file that the `watch`
//! loop reads back to decide how long to sleep.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use fresco_core::{ScheduleController, ScheduleError};

#[derive(Debug)]
pub struct FileScheduleController {
    path: PathBuf,
}

impl FileScheduleController {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Last persisted interval, or `default_minutes` when none was set yet.
    pub async fn current_interval(&self, default_minutes: u32) -> u32 {
        match fs::read_to_string(&self.path).await {
            Ok(text) => text.trim().parse().unwrap_or(default_minutes),
            Err(_) => default_minutes,
        }
    }
}

async fn write_atomic(path: &Path, text: &str) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, text).await?;
    fs::rename(&temp_path, path).await
}

#[async_trait]
impl ScheduleController for FileScheduleController {
    async fn set_interval(&self, minutes: u32) -> Result<(), ScheduleError> {
        write_atomic(&self.path, &minutes.to_string())
            .await
            .map_err(|e| ScheduleError::Update(e.to_string()))?;
        debug!(minutes, "Polling interval persisted");
        Ok(())
    }
}
