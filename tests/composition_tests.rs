//! # Composition Engine Tests
//!
//! Rendering properties checked through the public engine API with the bundled
//! fonts: placement, blur exclusion, layer order and determinism.

use image::{Rgba, RgbaImage};
use imageproc::rect::Rect;
use std::path::Path;
use std::sync::Arc;

use logo_bot::composition::{
    apply_background_blur, encode_png, fit_font, render_layered_text, CompositionEngine,
    EngineOptions, FullFrame, Halo, LargestContour, PlacementStrategy, RenderRequest, Shadow,
    TextEffects, TextRun,
};
use logo_bot::fonts::{bundled_fonts, FontCatalog};
use logo_bot::session::{NamedColor, Offset};

fn catalog() -> Arc<FontCatalog> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
    Arc::new(FontCatalog::new(dir, bundled_fonts()))
}

fn engine(placement: Arc<dyn PlacementStrategy>, options: EngineOptions) -> CompositionEngine {
    CompositionEngine::new(catalog(), placement, options)
}

fn request(image: &RgbaImage, text: &str) -> RenderRequest {
    RenderRequest {
        source: encode_png(image).unwrap(),
        text: text.to_string(),
        font: "dejavu_bold".to_string(),
        color: NamedColor::Red,
        position: Offset::default(),
        size_multiplier: 1.0,
        blur_intensity: 0,
    }
}

/// Dark frame with a bright panel in the lower right
fn panel_photo() -> RgbaImage {
    let mut image = RgbaImage::from_pixel(600, 400, Rgba([20, 20, 20, 255]));
    for y in 220..380 {
        for x in 300..580 {
            image.put_pixel(x, y, Rgba([240, 240, 240, 255]));
        }
    }
    image
}

#[test]
fn test_region_detection_centers_text_in_panel() {
    let rendered = engine(Arc::new(LargestContour::default()), EngineOptions::default())
        .render(&request(&panel_photo(), "LOGO"))
        .unwrap();

    let b = rendered.text_box;
    let center_x = b.left() + b.width() as i32 / 2;
    let center_y = b.top() + b.height() as i32 / 2;
    assert!((center_x - 440).abs() <= 6, "center x {center_x}");
    assert!((center_y - 300).abs() <= 6, "center y {center_y}");
    assert!(b.width() <= 290);
}

#[test]
fn test_region_detection_falls_back_to_full_frame() {
    let flat = RgbaImage::from_pixel(600, 400, Rgba([120, 80, 40, 255]));
    let contour = engine(Arc::new(LargestContour::default()), EngineOptions::default())
        .render(&request(&flat, "LOGO"))
        .unwrap();
    let full = engine(Arc::new(FullFrame), EngineOptions::default())
        .render(&request(&flat, "LOGO"))
        .unwrap();
    assert_eq!(contour.text_box, full.text_box);
    assert_eq!(contour.image, full.image);
}

#[test]
fn test_render_is_deterministic_for_every_halo() {
    let photo = panel_photo();
    let halos = [
        Halo::None,
        Halo::Glow {
            color: Rgba([255, 255, 255, 255]),
            strength: 3,
        },
        Halo::Outline {
            color: Rgba([255, 255, 255, 255]),
        },
        Halo::Brushstroke {
            color: Rgba([255, 255, 0, 255]),
            strokes: 10,
            jitter: 3,
            seed: 99,
        },
    ];
    for halo in halos {
        let options = EngineOptions {
            effects: TextEffects {
                shadow: Some(Shadow::black(4, 4)),
                halo,
            },
            ..EngineOptions::default()
        };
        let engine = engine(Arc::new(FullFrame), options);
        let first = engine.render(&request(&photo, "Brand")).unwrap();
        let second = engine.render(&request(&photo, "Brand")).unwrap();
        assert_eq!(first.image, second.image, "{halo:?} not deterministic");
    }
}

#[test]
fn test_blurred_render_keeps_text_box_sharp() {
    let photo = RgbaImage::from_fn(300, 200, |x, y| {
        if (x / 3 + y / 3) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 60, 120, 255])
        }
    });
    let mut req = request(&photo, "HI");
    req.blur_intensity = 4;

    let sharp = engine(Arc::new(FullFrame), EngineOptions::default())
        .render(&request(&photo, "HI"))
        .unwrap();
    let blurred = engine(Arc::new(FullFrame), EngineOptions::default())
        .render(&req)
        .unwrap();

    let b = blurred.text_box;
    assert_eq!(b, sharp.text_box);
    for y in b.top()..=b.bottom() {
        for x in b.left()..=b.right() {
            let (x, y) = (x as u32, y as u32);
            assert_eq!(blurred.image.get_pixel(x, y), sharp.image.get_pixel(x, y));
        }
    }
    // Corner is far from any glyph or halo
    assert_ne!(blurred.image.get_pixel(1, 1), photo.get_pixel(1, 1));
}

#[test]
fn test_blur_disabled_ignores_intensity() {
    let photo = panel_photo();
    let mut req = request(&photo, "HI");
    req.blur_intensity = 8;
    let options = EngineOptions {
        blur_enabled: false,
        ..EngineOptions::default()
    };
    let rendered = engine(Arc::new(FullFrame), options).render(&req).unwrap();
    assert_eq!(rendered.image.get_pixel(1, 1), photo.get_pixel(1, 1));
}

#[test]
fn test_size_multiplier_can_overflow_box() {
    let photo = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255]));
    let mut req = request(&photo, "OVERSIZED");
    let base = engine(Arc::new(FullFrame), EngineOptions::default())
        .render(&req)
        .unwrap();
    req.size_multiplier = 2.0;
    let zoomed = engine(Arc::new(FullFrame), EngineOptions::default())
        .render(&req)
        .unwrap();

    assert!(zoomed.fit.size > base.fit.size);
    assert!(zoomed.text_box.width() > 200);
    assert!(zoomed.text_box.left() < 0);
}

#[test]
fn test_fit_with_real_font_respects_box() {
    let fonts = catalog();
    let font = fonts.load("dejavu_sans").unwrap();
    for (w, h) in [(600, 200), (300, 80), (120, 40)] {
        let fit = fit_font(font.as_ref(), "Coffee Shop", w, h);
        if fit.fits {
            assert!(fit.width <= w && fit.height <= h);
        }
    }
}

#[test]
fn test_shadow_is_overdrawn_by_main_text() {
    let fonts = catalog();
    let font = fonts.load("dejavu_bold").unwrap();
    let run = TextRun::new(font.as_ref(), 60.0, "AB");
    let red = Rgba([255, 0, 0, 255]);

    // Shadow placed exactly under the main text
    let effects = TextEffects {
        shadow: Some(Shadow::black(0, 0)),
        halo: Halo::None,
    };
    let mut with_shadow = RgbaImage::new(200, 100);
    render_layered_text(&mut with_shadow, (10, 10), &run, red, &effects);

    let mut plain = RgbaImage::new(200, 100);
    render_layered_text(&mut plain, (10, 10), &run, red, &TextEffects::default());

    for (x, y, p) in plain.enumerate_pixels() {
        if p.0[3] == 255 {
            assert_eq!(*with_shadow.get_pixel(x, y), red);
        }
    }
}

#[test]
fn test_blur_exclusion_on_photo_like_image() {
    let photo = RgbaImage::from_fn(80, 60, |x, y| {
        Rgba([(x * 3) as u8, (y * 4) as u8, ((x * y) % 251) as u8, 255])
    });
    let rect = Rect::at(20, 15).of_size(30, 20);
    let out = apply_background_blur(photo.clone(), 5, Some(rect));
    for y in 15..35 {
        for x in 20..50 {
            assert_eq!(out.get_pixel(x, y), photo.get_pixel(x, y));
        }
    }
}
