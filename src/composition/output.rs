//! Encoding of rendered images and the temporary files they are sent from.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgb, RgbImage, RgbaImage};
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

use crate::errors::RenderError;

/// Background used when dropping alpha for delivery
pub const FLATTEN_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Alpha-capable encoding used for previews
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Composite over an opaque background, dropping alpha
pub fn flatten(image: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let mix = |fg: u8, bg: u8| {
            ((u32::from(fg) * alpha + u32::from(bg) * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([
            mix(r, background.0[0]),
            mix(g, background.0[1]),
            mix(b, background.0[2]),
        ])
    })
}

/// Opaque encoding used for the final download
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, RenderError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Encoded render kept in a temporary file until it has been sent
///
/// The file is removed when the artifact is dropped. `discard` does the same
/// and logs a failed removal.
#[derive(Debug)]
pub struct RenderArtifact {
    file: NamedTempFile,
}

impl RenderArtifact {
    /// Write `bytes` to a fresh temporary file ending in `suffix`
    pub fn write(bytes: &[u8], suffix: &str) -> Result<Self, RenderError> {
        let mut file = Builder::new().prefix("logo-").suffix(suffix).tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!(path = %file.path().display(), bytes = bytes.len(), "Render artifact written");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            warn!(path = %path.display(), error = %e, "Failed to clean up temporary file");
        }
    }
}
