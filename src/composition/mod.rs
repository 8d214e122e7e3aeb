//! # Composition Engine Module
//!
//! Turns a source photo, a logo text and a set of style values into a rendered
//! image. The engine knows nothing about sessions or users: every input arrives
//! in a [`RenderRequest`] built fresh for each render and dropped afterwards.
//!
//! ## Pipeline
//!
//! 1. Decode the source bytes to RGBA
//! 2. Ask the placement strategy for a target box (whole image when it has none)
//! 3. Fit the font size to the box, then apply the user's size multiplier
//! 4. Center the text in the box and shift it by the user's offset
//! 5. Blur the background outside the text box when blur is requested
//! 6. Draw shadow, halo and main layers on a transparent layer and overlay it

pub mod blur;
pub mod fit;
pub mod layers;
pub mod output;
pub mod region;
pub mod text;

use image::{imageops, Rgba, RgbaImage};
use imageproc::rect::Rect;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::errors::RenderError;
use crate::fonts::FontCatalog;
use crate::session::{EditSession, NamedColor, Offset};

pub use blur::apply_background_blur;
pub use fit::{fit_font, scale_fit, FontFit};
pub use layers::{render_layered_text, Halo, Shadow, TextEffects};
pub use output::{encode_jpeg, encode_png, flatten, RenderArtifact, FLATTEN_BACKGROUND};
pub use region::{FullFrame, LargestContour, PlacementStrategy};
pub use text::{TextMeasure, TextRun};

/// Inputs for one render
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: Vec<u8>,
    pub text: String,
    pub font: String,
    pub color: NamedColor,
    pub position: Offset,
    pub size_multiplier: f32,
    pub blur_intensity: u8,
}

impl RenderRequest {
    /// Snapshot the style fields of `session` together with the photo bytes
    pub fn from_session(session: &EditSession, source: Vec<u8>) -> Self {
        Self {
            source,
            text: session.text.clone(),
            font: session.font.clone(),
            color: session.color,
            position: session.position,
            size_multiplier: session.size_multiplier,
            blur_intensity: session.blur_intensity,
        }
    }
}

/// Engine-wide settings that do not change per user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub effects: TextEffects,
    /// Whether blur intensity is honored at all
    pub blur_enabled: bool,
    pub jpeg_quality: u8,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            effects: TextEffects {
                shadow: Some(Shadow::black(4, 4)),
                halo: Halo::Glow {
                    color: Rgba([255, 255, 255, 255]),
                    strength: 3,
                },
            },
            blur_enabled: true,
            jpeg_quality: 90,
        }
    }
}

/// A finished render and where its text ended up
#[derive(Debug, Clone)]
pub struct Rendered {
    pub image: RgbaImage,
    pub text_box: Rect,
    pub fit: FontFit,
}

/// Shared, cheaply cloneable renderer
#[derive(Clone)]
pub struct CompositionEngine {
    fonts: Arc<FontCatalog>,
    placement: Arc<dyn PlacementStrategy>,
    options: EngineOptions,
}

impl CompositionEngine {
    pub fn new(
        fonts: Arc<FontCatalog>,
        placement: Arc<dyn PlacementStrategy>,
        options: EngineOptions,
    ) -> Self {
        Self {
            fonts,
            placement,
            options,
        }
    }

    pub fn fonts(&self) -> &FontCatalog {
        &self.fonts
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Produce the alpha-capable composite for `request`
    pub fn render(&self, request: &RenderRequest) -> Result<Rendered, RenderError> {
        let start = Instant::now();

        let mut image = image::load_from_memory(&request.source)
            .map_err(|e| RenderError::Decode(e.to_string()))?
            .to_rgba8();
        let font = self.fonts.load(&request.font)?;
        let (width, height) = image.dimensions();

        let region = self
            .placement
            .select(&image)
            .unwrap_or_else(|| Rect::at(0, 0).of_size(width.max(1), height.max(1)));

        let fitted = fit_font(font.as_ref(), &request.text, region.width(), region.height());
        let fit = scale_fit(font.as_ref(), &request.text, fitted, request.size_multiplier);
        if !fitted.fits {
            debug!(size = fitted.size, "Text overflows the placement box at the smallest size");
        }

        let x = region.left() + (region.width() as i32 - fit.width as i32) / 2 + request.position.x;
        let y =
            region.top() + (region.height() as i32 - fit.height as i32) / 2 + request.position.y;
        let text_box = Rect::at(x, y).of_size(fit.width.max(1), fit.height.max(1));

        if self.options.blur_enabled && request.blur_intensity > 0 {
            image = apply_background_blur(image, request.blur_intensity, Some(text_box));
        }

        let mut layer = RgbaImage::new(width, height);
        let run = TextRun::new(font.as_ref(), fit.size, &request.text);
        render_layered_text(
            &mut layer,
            (x, y),
            &run,
            request.color.rgba(),
            &self.options.effects,
        );
        imageops::overlay(&mut image, &layer, 0, 0);

        info!(
            placement = self.placement.name(),
            font_size = fit.size,
            x,
            y,
            blur = request.blur_intensity,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Render completed"
        );

        Ok(Rendered {
            image,
            text_box,
            fit,
        })
    }

    /// Render and write a PNG preview to a temporary file
    pub fn render_preview(&self, request: &RenderRequest) -> Result<RenderArtifact, RenderError> {
        let rendered = self.render(request)?;
        RenderArtifact::write(&encode_png(&rendered.image)?, ".png")
    }

    /// Render, flatten onto white and write a JPEG for download
    pub fn render_final(&self, request: &RenderRequest) -> Result<RenderArtifact, RenderError> {
        let rendered = self.render(request)?;
        let flat = flatten(&rendered.image, FLATTEN_BACKGROUND);
        RenderArtifact::write(&encode_jpeg(&flat, self.options.jpeg_quality)?, ".jpg")
    }
}
