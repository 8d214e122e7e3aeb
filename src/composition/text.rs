//! Glyph measurement and drawing on RGBA canvases.

use image::{Pixel, Rgba, RgbaImage};
use imageproc::drawing::text_size;
use rusttype::{point, Font, Scale};

/// Anything that can report the rendered extent of a string at a given size
pub trait TextMeasure {
    /// (width, height) in pixels of `text` at `size`
    fn measure(&self, size: f32, text: &str) -> (u32, u32);
}

impl TextMeasure for Font<'_> {
    fn measure(&self, size: f32, text: &str) -> (u32, u32) {
        let (w, h) = text_size(Scale::uniform(size), self, text);
        (w.max(0) as u32, h.max(0) as u32)
    }
}

/// A string set in one font at one size
#[derive(Clone, Copy)]
pub struct TextRun<'a> {
    pub font: &'a Font<'a>,
    pub size: f32,
    pub text: &'a str,
}

impl<'a> TextRun<'a> {
    pub fn new(font: &'a Font<'a>, size: f32, text: &'a str) -> Self {
        Self { font, size, text }
    }

    pub fn extent(&self) -> (u32, u32) {
        self.font.measure(self.size, self.text)
    }
}

/// Draw `run` with its top-left at (x, y), alpha-blending coverage over the canvas
///
/// Uses the same layout origin as `imageproc::drawing::text_size`, so the drawn
/// glyphs fit inside the measured extent.
pub fn draw_run(canvas: &mut RgbaImage, run: &TextRun, x: i32, y: i32, color: Rgba<u8>) {
    let scale = Scale::uniform(run.size);
    let v_metrics = run.font.v_metrics(scale);
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);

    for glyph in run.font.layout(run.text, scale, point(0.0, v_metrics.ascent)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = x + bb.min.x + gx as i32;
            let py = y + bb.min.y + gy as i32;
            if px < 0 || py < 0 || px >= width || py >= height {
                return;
            }
            let alpha = (color.0[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
            if alpha == 0 {
                return;
            }
            let mut src = color;
            src.0[3] = alpha;
            canvas.get_pixel_mut(px as u32, py as u32).blend(&src);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn bundled_font() -> Font<'static> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/fonts/DejaVuSans-Bold.ttf");
        Font::try_from_vec(std::fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn test_measure_grows_with_size() {
        let font = bundled_font();
        let (w_small, h_small) = font.measure(20.0, "HELLO");
        let (w_large, h_large) = font.measure(40.0, "HELLO");
        assert!(w_large > w_small);
        assert!(h_large > h_small);
    }

    #[test]
    fn test_draw_stays_inside_measured_extent() {
        let font = bundled_font();
        let run = TextRun::new(&font, 32.0, "Logo");
        let (w, h) = run.extent();

        let mut canvas = RgbaImage::new(w + 40, h + 40);
        draw_run(&mut canvas, &run, 20, 20, Rgba([255, 0, 0, 255]));

        for (x, y, p) in canvas.enumerate_pixels() {
            if p.0[3] > 0 {
                assert!(x >= 20 && x < 20 + w, "x {x} outside extent");
                assert!(y >= 20 && y < 20 + h, "y {y} outside extent");
            }
        }
        assert!(canvas.pixels().any(|p| p.0 == [255, 0, 0, 255]));
    }
}
