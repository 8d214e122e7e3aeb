//! Layered text rendering
//!
//! Draw order, back to front: shadow, halo (glow, outline or brushstroke), main fill.
//! Each layer is finished before the next starts, so later layers always cover
//! earlier ones where they overlap.

use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::text::{draw_run, TextRun};

/// Offsets for the hard outline: the four orthogonal unit neighbours
const OUTLINE_OFFSETS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Drop shadow under the text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub offset: (i32, i32),
    pub color: Rgba<u8>,
}

impl Shadow {
    pub fn black(dx: i32, dy: i32) -> Self {
        Self {
            offset: (dx, dy),
            color: Rgba([0, 0, 0, 255]),
        }
    }
}

/// Effect drawn between the shadow and the main fill
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Halo {
    None,
    /// Copies at ±k on both axes for k = 1..=strength
    Glow { color: Rgba<u8>, strength: u32 },
    /// Copies at the four orthogonal unit offsets
    Outline { color: Rgba<u8> },
    /// Copies at seeded random offsets within ±jitter
    Brushstroke {
        color: Rgba<u8>,
        strokes: u32,
        jitter: i32,
        seed: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextEffects {
    pub shadow: Option<Shadow>,
    pub halo: Halo,
}

impl Default for TextEffects {
    fn default() -> Self {
        Self {
            shadow: None,
            halo: Halo::None,
        }
    }
}

/// Offsets at which the halo copies are drawn, in draw order
pub fn halo_offsets(halo: &Halo) -> Vec<(i32, i32)> {
    match *halo {
        Halo::None => Vec::new(),
        Halo::Glow { strength, .. } => (1..=strength as i32)
            .flat_map(|k| [(-k, -k), (k, -k), (-k, k), (k, k)])
            .collect(),
        Halo::Outline { .. } => OUTLINE_OFFSETS.to_vec(),
        Halo::Brushstroke {
            strokes,
            jitter,
            seed,
            ..
        } => {
            let mut rng = StdRng::seed_from_u64(seed);
            let jitter = jitter.abs();
            (0..strokes)
                .map(|_| (rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter)))
                .collect()
        }
    }
}

fn halo_color(halo: &Halo) -> Option<Rgba<u8>> {
    match *halo {
        Halo::None => None,
        Halo::Glow { color, .. } | Halo::Outline { color } | Halo::Brushstroke { color, .. } => {
            Some(color)
        }
    }
}

/// Render `run` at `origin` with the configured effects
pub fn render_layered_text(
    canvas: &mut RgbaImage,
    origin: (i32, i32),
    run: &TextRun,
    text_color: Rgba<u8>,
    effects: &TextEffects,
) {
    let (x, y) = origin;

    if let Some(shadow) = effects.shadow {
        draw_run(
            canvas,
            run,
            x + shadow.offset.0,
            y + shadow.offset.1,
            shadow.color,
        );
    }

    if let Some(color) = halo_color(&effects.halo) {
        for (dx, dy) in halo_offsets(&effects.halo) {
            draw_run(canvas, run, x + dx, y + dy, color);
        }
    }

    draw_run(canvas, run, x, y, text_color);
}
