//! File-backed ledger for local development and demos.
//!
//! State lives in a single JSON document re-read on every query, so a
//! separate process (or a text editor) can append color events while a
//! `watch` loop is running. Commits rewrite the document atomically and
//! enforce the same conditional-update contract as the production chain:
//! the assumed base block must match the canonical pointer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use fresco_core::{
    ColorEvent, ContentRef, Ledger, LedgerError, LedgerPointer, PublicationEvent, PublicationKind,
};

/// On-disk document backing a [`DevLedger`]
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LedgerFile {
    /// Current chain height
    pub height: u64,
    /// Canonical pointer, absent until `fresco init` seeds it
    pub pointer: Option<LedgerPointer>,
    /// Color events in block order
    #[serde(default)]
    pub events: Vec<ColorEvent>,
    /// Artifact publication history
    #[serde(default)]
    pub publications: Vec<PublicationEvent>,
}

impl LedgerFile {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        write_atomic(path, &serde_json::to_vec_pretty(self)?).await?;
        Ok(())
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes).await?;
    fs::rename(&temp_path, path).await
}

/// JSON-file-backed [`Ledger`] implementation
#[derive(Debug)]
pub struct DevLedger {
    path: PathBuf,
    // Serializes read-modify-write commits against the file.
    commit_lock: Mutex<()>,
}

impl DevLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            commit_lock: Mutex::new(()),
        }
    }

    /// Seed a fresh ledger file with a genesis pointer at block 0.
    pub async fn init(path: &Path, genesis_ref: ContentRef) -> anyhow::Result<()> {
        let file = LedgerFile {
            height: 0,
            pointer: Some(LedgerPointer {
                last_snapshot_block: 0,
                last_snapshot_ref: genesis_ref,
            }),
            events: Vec::new(),
            publications: vec![PublicationEvent {
                kind: PublicationKind::Snapshot,
                block: 0,
                artifact_ref: genesis_ref,
            }],
        };
        file.save(path).await?;
        info!(path = %path.display(), "Ledger file initialized");
        Ok(())
    }

    async fn load(&self) -> Result<LedgerFile, LedgerError> {
        LedgerFile::load(&self.path)
            .await
            .map_err(|e| LedgerError::Rpc(format!("ledger file {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl Ledger for DevLedger {
    async fn latest_snapshot_info(&self, _region: u64) -> Result<LedgerPointer, LedgerError> {
        self.load().await?.pointer.ok_or_else(|| {
            LedgerError::Rpc("ledger file has no canonical pointer, run `fresco init`".to_string())
        })
    }

    async fn query_color_events(
        &self,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<ColorEvent>, LedgerError> {
        let file = self.load().await?;
        let upper = to.unwrap_or(u64::MAX);
        Ok(file
            .events
            .into_iter()
            .filter(|e| e.block >= from && e.block <= upper)
            .collect())
    }

    async fn query_publication_events(
        &self,
        kind: PublicationKind,
    ) -> Result<Vec<PublicationEvent>, LedgerError> {
        let file = self.load().await?;
        Ok(file
            .publications
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect())
    }

    async fn commit_snapshot(
        &self,
        _region: u64,
        base_block: u64,
        new_block: u64,
        snapshot_ref: ContentRef,
        delta_ref: ContentRef,
    ) -> Result<(), LedgerError> {
        let _guard = self.commit_lock.lock().await;
        let mut file = self.load().await?;

        let Some(pointer) = file.pointer else {
            return Err(LedgerError::CommitRejected(
                "ledger file has no canonical pointer".to_string(),
            ));
        };
        if base_block != pointer.last_snapshot_block {
            return Err(LedgerError::CommitRejected(format!(
                "assumed base block {base_block} does not match canonical {}",
                pointer.last_snapshot_block
            )));
        }
        if new_block <= base_block {
            return Err(LedgerError::CommitRejected(format!(
                "new block {new_block} does not advance past base {base_block}"
            )));
        }

        file.pointer = Some(LedgerPointer {
            last_snapshot_block: new_block,
            last_snapshot_ref: snapshot_ref,
        });
        file.publications.push(PublicationEvent {
            kind: PublicationKind::Snapshot,
            block: new_block,
            artifact_ref: snapshot_ref,
        });
        file.publications.push(PublicationEvent {
            kind: PublicationKind::Delta,
            block: new_block,
            artifact_ref: delta_ref,
        });
        file.save(&self.path)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        debug!(base_block, new_block, "Dev ledger commit accepted");
        Ok(())
    }

    async fn current_block_height(&self) -> Result<u64, LedgerError> {
        Ok(self.load().await?.height)
    }
}
