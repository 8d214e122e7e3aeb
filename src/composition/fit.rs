//! Font size fitting
//!
//! Linear search downward from a large size until the text fits the target box.

use super::text::TextMeasure;

/// First size tried
pub const FIT_START_SIZE: f32 = 100.0;
/// Decrement between attempts
pub const FIT_STEP: f32 = 5.0;
/// Search stops once the size would drop to this floor
pub const FIT_FLOOR: f32 = 10.0;

/// Outcome of a fit: the chosen size and the text extent at that size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontFit {
    pub size: f32,
    pub width: u32,
    pub height: u32,
    /// False when even the smallest tried size overflowed the box
    pub fits: bool,
}

/// Largest size in the search sequence at which `text` fits `max_width` x `max_height`
///
/// When nothing fits, the last-tried (too large) measurement is returned with
/// `fits == false`; callers may overflow the box in that case.
pub fn fit_font<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    max_width: u32,
    max_height: u32,
) -> FontFit {
    let mut size = FIT_START_SIZE;
    loop {
        let (width, height) = measure.measure(size, text);
        let fits = width <= max_width && height <= max_height;
        let next = size - FIT_STEP;
        if fits || next <= FIT_FLOOR {
            return FontFit {
                size,
                width,
                height,
                fits,
            };
        }
        size = next;
    }
}

/// Apply the user's size multiplier on top of an auto-fit
///
/// The result may exceed the box; the multiplier is a user-controlled zoom.
pub fn scale_fit<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    fit: FontFit,
    multiplier: f32,
) -> FontFit {
    if (multiplier - 1.0).abs() < f32::EPSILON {
        return fit;
    }
    let size = (fit.size * multiplier).max(1.0);
    let (width, height) = measure.measure(size, text);
    FontFit {
        size,
        width,
        height,
        fits: fit.fits,
    }
}
