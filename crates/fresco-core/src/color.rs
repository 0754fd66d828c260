//! Color codec: palette-indexed colors and the indexing convention
//!
//! The canvas history contains both 0-based and 1-based pixel/color
//! indices, depending on which revision of the upstream contracts emitted
//! the events. The convention is therefore an explicit [`IndexMode`]
//! parameter rather than a hard-coded assumption.

use serde::{Deserialize, Serialize};

/// One palette entry as an RGB triple
pub type Rgb = [u8; 3];

/// Pixel/color indexing convention used by a canvas region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// Pixel ids and color ids start at 1; color 0 is "unset" and maps
    /// to the background palette entry.
    #[default]
    OneBased,
    /// Pixel ids and color ids start at 0.
    ZeroBased,
}

impl IndexMode {
    /// Convert a pixel id to a 0-based cell index, or `None` when the id
    /// falls before the first cell (a 1-based id of 0).
    pub fn pixel_index(&self, pixel_id: u64) -> Option<u64> {
        match self {
            IndexMode::OneBased => pixel_id.checked_sub(1),
            IndexMode::ZeroBased => Some(pixel_id),
        }
    }

    /// Convert a color id to a palette slot, or `None` when out of range.
    fn palette_slot(&self, color_id: u32, palette_len: usize) -> Option<usize> {
        let slot = match self {
            IndexMode::OneBased => (color_id as usize).checked_sub(1)?,
            IndexMode::ZeroBased => color_id as usize,
        };
        (slot < palette_len).then_some(slot)
    }
}

/// Fixed 16-color palette; entry 0 is the default/background color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; 16],
}

/// The live palette of the upstream canvas contracts.
const DEFAULT_COLORS: [Rgb; 16] = [
    [0xff, 0xff, 0xff],
    [0x9f, 0x9f, 0x9f],
    [0x00, 0x00, 0x00],
    [0xdc, 0x26, 0x2a],
    [0xff, 0x9c, 0xd2],
    [0xff, 0xd9, 0xcd],
    [0xff, 0xa0, 0x48],
    [0x7a, 0x3d, 0x04],
    [0xff, 0xea, 0x6f],
    [0x84, 0xe4, 0x6c],
    [0x11, 0x7a, 0x00],
    [0x92, 0xf3, 0xed],
    [0x00, 0xa1, 0xd4],
    [0x00, 0x57, 0x96],
    [0xa6, 0x7c, 0xff],
    [0x62, 0x00, 0xaf],
];

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS,
        }
    }
}

impl Palette {
    /// Create a palette from explicit entries
    pub fn new(colors: [Rgb; 16]) -> Self {
        Self { colors }
    }

    /// Raw palette entry by slot; out-of-range slots resolve to the
    /// background color
    pub fn entry(&self, slot: usize) -> Rgb {
        self.colors.get(slot).copied().unwrap_or(self.colors[0])
    }

    /// The background color (entry 0)
    pub fn background(&self) -> Rgb {
        self.colors[0]
    }

    /// Resolve a color id to an RGB triple under the given indexing mode.
    ///
    /// Total over all inputs: any out-of-range id resolves to the
    /// background color, never an error.
    pub fn color(&self, color_id: u32, mode: IndexMode) -> Rgb {
        match mode.palette_slot(color_id, self.colors.len()) {
            Some(slot) => self.colors[slot],
            None => self.colors[0],
        }
    }

    /// Resolve a color id to an RGBA pixel (alpha always 0xFF).
    pub fn pixel(&self, color_id: u32, mode: IndexMode) -> [u8; 4] {
        let [r, g, b] = self.color(color_id, mode);
        [r, g, b, 0xff]
    }
}
