//! Cadence controller: derive the polling interval from observed activity
//!
//! Two policies exist in the system's history; both are kept behind one
//! enum so deployments can swap them. [`CadencePolicy::BlockThreshold`]
//! is the default: it needs no wall clock and matches the behavior of
//! the block-count revision.

use chrono::{Duration, Utc};

use fresco_core::ColorEvent;

/// Policy for choosing the next polling interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CadencePolicy {
    /// Active if the last event landed within `recent_blocks` of the
    /// chain head
    BlockThreshold { recent_blocks: u64 },
    /// Active if the last event's block timestamp falls within `window`
    /// of the current wall clock
    WallClock { window: Duration },
}

impl Default for CadencePolicy {
    fn default() -> Self {
        // Roughly 10 minutes of blocks on the upstream chain.
        CadencePolicy::BlockThreshold { recent_blocks: 300 }
    }
}

impl CadencePolicy {
    /// Choose the polling interval in minutes: `min_minutes` while the
    /// canvas is active, `max_minutes` otherwise. An empty event list is
    /// always inactive.
    pub fn choose_interval(
        &self,
        events: &[ColorEvent],
        latest_block: u64,
        min_minutes: u32,
        max_minutes: u32,
    ) -> u32 {
        if self.is_active(events, latest_block) {
            min_minutes
        } else {
            max_minutes
        }
    }

    fn is_active(&self, events: &[ColorEvent], latest_block: u64) -> bool {
        let Some(last) = events.last() else {
            return false;
        };
        match self {
            CadencePolicy::BlockThreshold { recent_blocks } => {
                last.block >= latest_block.saturating_sub(*recent_blocks)
            }
            CadencePolicy::WallClock { window } => match last.timestamp {
                Some(ts) => Utc::now().signed_duration_since(ts) <= *window,
                None => false,
            },
        }
    }
}
