//! Process bootstrap pieces shared by the `fresco` binary and its tests.

pub mod config;
pub mod dev_ledger;
pub mod schedule;

pub use config::{Cli, Command, EngineArgs};
pub use dev_ledger::DevLedger;
pub use schedule::FileScheduleController;
