//! Placement region selection
//!
//! A strategy picks the rectangle the text is centered in. The contour heuristic
//! is one option among others; callers fall back to the full frame on `None`.

use image::{imageops, GrayImage, RgbaImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::rect::Rect;
use tracing::debug;

/// Chooses where on the source image the text should be placed
pub trait PlacementStrategy: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Target rectangle, or `None` to center on the whole image
    fn select(&self, image: &RgbaImage) -> Option<Rect>;
}

/// Always centers on the whole image
#[derive(Debug, Clone, Copy, Default)]
pub struct FullFrame;

impl PlacementStrategy for FullFrame {
    fn name(&self) -> &'static str {
        "full_frame"
    }

    fn select(&self, _image: &RgbaImage) -> Option<Rect> {
        None
    }
}

/// Bounding box of the external contour enclosing the largest area
///
/// Pipeline: grayscale, Gaussian blur, Canny edges, outer contour extraction.
#[derive(Debug, Clone, Copy)]
pub struct LargestContour {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for LargestContour {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

impl LargestContour {
    fn edges(&self, image: &RgbaImage) -> GrayImage {
        let gray = imageops::grayscale(image);
        let smoothed = if self.blur_sigma > 0.0 {
            gaussian_blur_f32(&gray, self.blur_sigma)
        } else {
            gray
        };
        canny(&smoothed, self.canny_low, self.canny_high)
    }
}

impl PlacementStrategy for LargestContour {
    fn name(&self) -> &'static str {
        "largest_contour"
    }

    fn select(&self, image: &RgbaImage) -> Option<Rect> {
        let edges = self.edges(image);
        let contours = find_contours::<i32>(&edges);

        let best = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|c| bounding_box(c).map(|rect| (enclosed_area(c), rect)))
            .max_by(|a, b| a.0.total_cmp(&b.0));

        match best {
            Some((area, rect)) => {
                debug!(
                    contours = contours.len(),
                    area,
                    x = rect.left(),
                    y = rect.top(),
                    width = rect.width(),
                    height = rect.height(),
                    "Placement region selected"
                );
                Some(rect)
            }
            None => {
                debug!("No external contours found, using full frame");
                None
            }
        }
    }
}

/// Shoelace area of the contour polygon
fn enclosed_area(contour: &Contour<i32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Axis-aligned bounding box; `None` for degenerate contours
fn bounding_box(contour: &Contour<i32>) -> Option<Rect> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let width = (max_x - min_x + 1) as u32;
    let height = (max_y - min_y + 1) as u32;
    if width < 2 || height < 2 {
        return None;
    }
    Some(Rect::at(min_x, min_y).of_size(width, height))
}
