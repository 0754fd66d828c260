//! Canvas image codec: PNG encode/decode and in-place painting
//!
//! The canvas file format is fixed: one RGBA pixel per grid cell, alpha
//! always 0xFF, truecolor with no embedded palette table (colors resolve
//! from the in-memory [`Palette`] at paint time), maximum compression,
//! no interlace.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, Rgba, RgbaImage};
use tracing::warn;

use fresco_core::{BlockDelta, IndexMode, Palette};

use crate::error::EngineError;

/// Codec for canvas snapshot images.
///
/// The indexing convention is an explicit parameter: canvas history
/// contains both 0-based and 1-based pixel/color ids depending on the
/// emitting contract revision.
#[derive(Debug, Clone)]
pub struct CanvasCodec {
    palette: Palette,
    index_mode: IndexMode,
}

impl Default for CanvasCodec {
    fn default() -> Self {
        Self::new(IndexMode::default())
    }
}

impl CanvasCodec {
    pub fn new(index_mode: IndexMode) -> Self {
        Self {
            palette: Palette::default(),
            index_mode,
        }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn index_mode(&self) -> IndexMode {
        self.index_mode
    }

    /// Decode a PNG snapshot into the pixel grid
    pub fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, EngineError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| EngineError::codec(e.to_string()))?;
        Ok(image.into_rgba8())
    }

    /// Encode the pixel grid as a PNG with the fixed options
    pub fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, EngineError> {
        let mut out = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::NoFilter);
        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| EngineError::codec(e.to_string()))?;
        Ok(out)
    }

    /// Apply block deltas to the grid in place.
    ///
    /// The previous grid contents are consumed by the mutation. Pixel ids
    /// that fall outside the canvas are skipped with a warning rather
    /// than written out of bounds.
    pub fn paint(&self, image: &mut RgbaImage, deltas: &[BlockDelta]) {
        let cells = u64::from(image.width()) * u64::from(image.height());

        for delta in deltas {
            for change in &delta.changes {
                let Some(index) = self.index_mode.pixel_index(change.pixel_id) else {
                    warn!(pixel_id = change.pixel_id, "Pixel id before first cell, skipping");
                    continue;
                };
                if index >= cells {
                    warn!(
                        pixel_id = change.pixel_id,
                        block = delta.block,
                        "Pixel id outside canvas, skipping"
                    );
                    continue;
                }
                let x = (index % u64::from(image.width())) as u32;
                let y = (index / u64::from(image.width())) as u32;
                let pixel = self.palette.pixel(change.color_id, self.index_mode);
                image.put_pixel(x, y, Rgba(pixel));
            }
        }
    }

    /// A blank canvas filled with the background color
    pub fn blank_canvas(&self, width: u32, height: u32) -> RgbaImage {
        let [r, g, b] = self.palette.background();
        RgbaImage::from_pixel(width, height, Rgba([r, g, b, 0xff]))
    }
}
