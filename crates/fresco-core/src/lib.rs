//! Core domain model for the Fresco snapshot engine
//!
//! This crate defines the shared vocabulary of the engine:
//!
//! - [`ColorEvent`], [`BlockDelta`] and [`DeltaRecord`]: the event-sourced
//!   change history of the canvas and its compacted, chained form
//! - [`ContentRef`]: BLAKE3 content addresses for durable artifacts
//! - [`Palette`] and [`IndexMode`]: the color codec and the explicit
//!   pixel/color indexing convention
//! - capability traits for the external collaborators: [`Ledger`],
//!   [`DurableStore`], [`HotStore`] and [`ScheduleController`]
//!
//! Production and test collaborators implement the same traits; the
//! [`mock`] module provides the in-process test variants.

pub mod color;
pub mod content_ref;
pub mod error;
pub mod event;
pub mod mock;
pub mod traits;

pub use color::{IndexMode, Palette, Rgb};
pub use content_ref::ContentRef;
pub use error::{LedgerError, ScheduleError, StorageError};
pub use event::{
    BlockDelta, ColorEvent, DeltaRecord, LedgerPointer, PixelChange, PublicationEvent,
    PublicationKind, DELTA_WIRE_VERSION,
};
pub use traits::{DurableStore, HotStore, Ledger, ScheduleController};
