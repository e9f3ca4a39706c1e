//! Frame scaling for the software pipeline
//!
//! Nearest-neighbour resampling of tightly packed BGRA surfaces. Cheap
//! enough to run on the pull thread for every frame.

use tracing::debug;

use crate::error::{RecorderError, Result};
use crate::types::Size;

/// Precomputed BGRA scaler for one source/destination size pair
pub struct FrameScaler {
    src: Size,
    dst: Size,
    /// Source column for every destination column
    x_map: Vec<usize>,
    /// Source row for every destination row
    y_map: Vec<usize>,
    output: Vec<u8>,
}

impl FrameScaler {
    /// Create a new frame scaler
    pub fn new(src: Size, dst: Size) -> Result<Self> {
        if src.is_empty() || dst.is_empty() {
            return Err(RecorderError::prepare(format!(
                "Cannot scale {} to {}",
                src, dst
            )));
        }

        debug!("Creating scaler: BGRA {} -> {}", src, dst);

        let x_map = (0..dst.width as usize)
            .map(|x| x * src.width as usize / dst.width as usize)
            .collect();
        let y_map = (0..dst.height as usize)
            .map(|y| y * src.height as usize / dst.height as usize)
            .collect();

        Ok(Self {
            src,
            dst,
            x_map,
            y_map,
            output: vec![0; dst.width as usize * dst.height as usize * 4],
        })
    }

    /// Scale one BGRA image. Returns the input untouched if no scaling is needed.
    pub fn scale<'a>(&'a mut self, input: &'a [u8]) -> Result<&'a [u8]> {
        let expected = self.src.width as usize * self.src.height as usize * 4;
        if input.len() != expected {
            return Err(RecorderError::runtime(format!(
                "Frame has {} bytes, expected {} for {}",
                input.len(),
                expected,
                self.src
            )));
        }

        if self.src == self.dst {
            return Ok(input);
        }

        let src_stride = self.src.width as usize * 4;
        let dst_stride = self.dst.width as usize * 4;
        for (row, &sy) in self.output.chunks_exact_mut(dst_stride).zip(&self.y_map) {
            let src_row = &input[sy * src_stride..(sy + 1) * src_stride];
            for (pixel, &sx) in row.chunks_exact_mut(4).zip(&self.x_map) {
                pixel.copy_from_slice(&src_row[sx * 4..sx * 4 + 4]);
            }
        }

        Ok(&self.output)
    }

    /// Get output dimensions
    pub fn output_size(&self) -> Size {
        self.dst
    }
}

/// Fit `src` inside `max` keeping its aspect ratio.
///
/// Never upscales, and rounds both dimensions down to even values.
pub fn calculate_scaled_size(src: Size, max: Size) -> Size {
    if src.width <= max.width && src.height <= max.height {
        return Size::new((src.width & !1).max(2), (src.height & !1).max(2));
    }

    let src_aspect = src.width as f64 / src.height as f64;
    let dst_aspect = max.width as f64 / max.height as f64;

    let (width, height) = if src_aspect > dst_aspect {
        // Width-limited
        (max.width, (max.width as f64 / src_aspect) as u32)
    } else {
        // Height-limited
        ((max.height as f64 * src_aspect) as u32, max.height)
    };

    Size::new((width & !1).max(2), (height & !1).max(2))
}
