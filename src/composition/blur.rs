//! Background blur with a sharp text band.

use image::RgbaImage;
use imageproc::filter::gaussian_blur_f32;
use imageproc::rect::Rect;

/// Blur the whole image, then restore the original pixels inside `exclude`
///
/// Intensity 0 returns the input untouched. `exclude` is clipped to the image.
pub fn apply_background_blur(image: RgbaImage, intensity: u8, exclude: Option<Rect>) -> RgbaImage {
    if intensity == 0 {
        return image;
    }

    let mut blurred = gaussian_blur_f32(&image, f32::from(intensity));

    if let Some(rect) = exclude.and_then(|r| clip(r, image.width(), image.height())) {
        let (x0, y0, x1, y1) = rect;
        for y in y0..y1 {
            for x in x0..x1 {
                blurred.put_pixel(x, y, *image.get_pixel(x, y));
            }
        }
    }

    blurred
}

/// Rectangle clipped to the image as half-open pixel bounds
fn clip(rect: Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = rect.left().max(0) as u32;
    let y0 = rect.top().max(0) as u32;
    let x1 = (rect.right() + 1).clamp(0, width as i32) as u32;
    let y1 = (rect.bottom() + 1).clamp(0, height as i32) as u32;
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}
