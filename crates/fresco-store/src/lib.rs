//! Store implementations for the Fresco snapshot engine
//!
//! Two variants of each collaborator live behind the `fresco-core` traits:
//!
//! - [`FileDurableStore`] / [`FileHotStore`]: file-backed production
//!   variants with sharded content addressing and atomic writes
//! - [`MemoryDurableStore`] / [`MemoryHotStore`]: in-memory variants for
//!   tests and local development

pub mod durable;
pub mod hot;
pub mod memory;

pub use durable::{FileDurableStore, FileStoreConfig};
pub use hot::FileHotStore;
pub use memory::{MemoryDurableStore, MemoryHotStore};
