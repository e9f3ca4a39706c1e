//! Core types for screenrec
//!
//! These types represent the data that moves between the capture source,
//! the frame bridge and the encoding pipeline.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Global handle counter for unique recorder IDs
static HANDLE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying a recorder in logs and stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Create a new unique handle
    pub fn new() -> Self {
        Self(HANDLE_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw handle value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel layout of an uncompressed stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit B, G, R, A
    #[default]
    Bgra8,
}

/// An image owned by the graphics device.
///
/// Dropping the surface releases it back to the device; a frame therefore
/// releases its surface exactly once, whoever ends up owning it last.
pub trait Surface: Send {
    /// Dimensions of the surface
    fn size(&self) -> Size;

    /// CPU-visible BGRA pixels, tightly packed, if the surface can be mapped
    fn pixels(&self) -> Option<&[u8]>;
}

/// Surface backed by system memory
#[derive(Debug, Clone)]
pub struct MemorySurface {
    size: Size,
    data: Vec<u8>,
}

impl MemorySurface {
    /// Wrap tightly packed BGRA data
    ///
    /// Returns `None` if `data` does not match `size`.
    pub fn new(size: Size, data: Vec<u8>) -> Option<Self> {
        let expected = size.width as usize * size.height as usize * 4;
        (data.len() == expected).then_some(Self { size, data })
    }

    /// Surface filled with one BGRA color
    pub fn filled(size: Size, color: [u8; 4]) -> Self {
        let pixels = size.width as usize * size.height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&color);
        }
        Self { size, data }
    }
}

impl Surface for MemorySurface {
    fn size(&self) -> Size {
        self.size
    }

    fn pixels(&self) -> Option<&[u8]> {
        Some(&self.data)
    }
}

/// One captured image plus its capture timestamp.
///
/// Frames are moved, never cloned: ownership passes from the capture session
/// to the bridge and on to the encoder.
pub struct Frame {
    timestamp: Duration,
    surface: Box<dyn Surface>,
}

impl Frame {
    /// Create a frame from a surface captured at `timestamp`
    pub fn new(timestamp: Duration, surface: impl Surface + 'static) -> Self {
        Self {
            timestamp,
            surface: Box::new(surface),
        }
    }

    /// System-relative capture time
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// The backing surface
    pub fn surface(&self) -> &dyn Surface {
        self.surface.as_ref()
    }

    pub fn size(&self) -> Size {
        self.surface.size()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("timestamp", &self.timestamp)
            .field("size", &self.surface.size())
            .finish()
    }
}

/// A display that can be captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureTarget {
    /// Device name (e.g. "\\.\DISPLAY1", "VIRTUAL-1")
    pub name: String,
    /// Native size
    pub size: Size,
    /// Whether this is the primary display
    pub primary: bool,
}

impl CaptureTarget {
    pub fn new(name: impl Into<String>, size: Size) -> Self {
        Self {
            name: name.into(),
            size,
            primary: false,
        }
    }

    /// Mark as the primary display
    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }
}

impl std::fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.size)?;
        if self.primary {
            write!(f, " [primary]")?;
        }
        Ok(())
    }
}

/// Parameters of the single uncompressed video stream fed to the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoStreamDescriptor {
    pub size: Size,
    pub format: PixelFormat,
    /// Live sources never seek and have no known duration
    pub live: bool,
}

impl VideoStreamDescriptor {
    /// Uncompressed BGRA stream for a capture target
    pub fn for_target(target: &CaptureTarget) -> Self {
        Self {
            size: target.size,
            format: PixelFormat::Bgra8,
            live: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let a = Handle::new();
        let b = Handle::new();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_memory_surface_rejects_wrong_length() {
        assert!(MemorySurface::new(Size::new(2, 2), vec![0; 15]).is_none());
        assert!(MemorySurface::new(Size::new(2, 2), vec![0; 16]).is_some());
    }

    #[test]
    fn test_filled_surface() {
        let surface = MemorySurface::filled(Size::new(3, 1), [1, 2, 3, 4]);
        assert_eq!(surface.pixels().unwrap(), &[1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn test_stream_descriptor_uses_target_size() {
        let target = CaptureTarget::new("VIRTUAL-1", Size::new(1920, 1080)).with_primary(true);
        let stream = VideoStreamDescriptor::for_target(&target);
        assert_eq!(stream.size, Size::new(1920, 1080));
        assert_eq!(stream.format, PixelFormat::Bgra8);
        assert!(stream.live);
        assert_eq!(target.to_string(), "VIRTUAL-1 (1920x1080) [primary]");
    }
}
