//! # Configuration Module
//!
//! Runtime settings read from the environment (a `.env` file is loaded first by
//! `main`). Every value except the bot token has a default, so a bare token is
//! enough to run the bot with the bundled fonts and an in-memory session store.

use anyhow::{anyhow, bail, Context, Result};
use image::Rgba;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::composition::{
    EngineOptions, FullFrame, Halo, LargestContour, PlacementStrategy, Shadow, TextEffects,
};
use crate::controller::ControllerConfig;
use crate::controls::SizeMode;
use crate::fonts::{bundled_fonts, FontEntry};
use crate::session::{NamedColor, SessionDefaults};

// Constants for configuration defaults
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024; // 200MB upload cap
pub const DEFAULT_MAX_TEXT_CHARS: usize = 64;
pub const DEFAULT_FONTS_DIR: &str = "assets/fonts";
pub const DEFAULT_GLOW_STRENGTH: u32 = 3;
pub const DEFAULT_SHADOW_OFFSET: (i32, i32) = (4, 4);
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
/// Copies drawn by the brushstroke halo
pub const BRUSHSTROKE_STROKES: u32 = 12;
/// Maximum brushstroke displacement in pixels
pub const BRUSHSTROKE_JITTER: i32 = 3;
/// Fixed seed so brushstroke renders are reproducible
pub const BRUSHSTROKE_SEED: u64 = 0x6c6f_676f;

/// Halo style selected by `RENDER_HALO`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaloKind {
    Glow,
    Outline,
    Brushstroke,
    None,
}

impl FromStr for HaloKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "glow" => Ok(HaloKind::Glow),
            "outline" => Ok(HaloKind::Outline),
            "brushstroke" => Ok(HaloKind::Brushstroke),
            "none" | "off" => Ok(HaloKind::None),
            other => bail!("unknown halo style '{other}'"),
        }
    }
}

/// Rendering settings
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub halo: HaloKind,
    pub glow_strength: u32,
    pub glow_color: NamedColor,
    pub shadow: Option<(i32, i32)>,
    pub region_detection: bool,
    pub blur_enabled: bool,
    pub jpeg_quality: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            halo: HaloKind::Glow,
            glow_strength: DEFAULT_GLOW_STRENGTH,
            glow_color: NamedColor::White,
            shadow: Some(DEFAULT_SHADOW_OFFSET),
            region_detection: false,
            blur_enabled: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl RenderConfig {
    pub fn engine_options(&self) -> EngineOptions {
        let color: Rgba<u8> = self.glow_color.rgba();
        let halo = match self.halo {
            HaloKind::Glow => Halo::Glow {
                color,
                strength: self.glow_strength,
            },
            HaloKind::Outline => Halo::Outline { color },
            HaloKind::Brushstroke => Halo::Brushstroke {
                color,
                strokes: BRUSHSTROKE_STROKES,
                jitter: BRUSHSTROKE_JITTER,
                seed: BRUSHSTROKE_SEED,
            },
            HaloKind::None => Halo::None,
        };
        EngineOptions {
            effects: TextEffects {
                shadow: self.shadow.map(|(dx, dy)| Shadow::black(dx, dy)),
                halo,
            },
            blur_enabled: self.blur_enabled,
            jpeg_quality: self.jpeg_quality,
        }
    }

    pub fn placement(&self) -> Arc<dyn PlacementStrategy> {
        if self.region_detection {
            Arc::new(LargestContour::default())
        } else {
            Arc::new(FullFrame)
        }
    }
}

/// Everything `main` needs to start the bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub database_url: Option<String>,
    pub photos_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub fonts: Vec<FontEntry>,
    pub default_font: String,
    pub default_color: NamedColor,
    pub max_upload_bytes: u64,
    pub max_text_chars: usize,
    pub session_ttl_minutes: u64,
    pub clear_after_finalize: bool,
    pub size_mode: SizeMode,
    pub render: RenderConfig,
}

impl BotConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("TELEGRAM_BOT_TOKEN")
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        let fonts = match get("FONT_CATALOG") {
            Some(spec) => parse_font_catalog(&spec)?,
            None => bundled_fonts(),
        };
        let default_font = match get("DEFAULT_FONT") {
            Some(id) => id,
            None => fonts
                .first()
                .map(|f| f.id.clone())
                .ok_or_else(|| anyhow!("font catalog is empty"))?,
        };
        if !fonts.iter().any(|f| f.id == default_font) {
            bail!("DEFAULT_FONT '{default_font}' is not in the font catalog");
        }

        let default_color = match get("DEFAULT_COLOR") {
            Some(name) => parse_color("DEFAULT_COLOR", &name)?,
            None => NamedColor::Red,
        };

        let size_mode = match get("SIZE_MODE").as_deref().map(str::trim) {
            None | Some("proportional") => SizeMode::Proportional,
            Some("fixed") => SizeMode::Fixed,
            Some(other) => bail!("SIZE_MODE must be 'proportional' or 'fixed', got '{other}'"),
        };

        let render = RenderConfig {
            halo: parse_or(&get, "RENDER_HALO", HaloKind::Glow)?,
            glow_strength: parse_or(&get, "RENDER_GLOW_STRENGTH", DEFAULT_GLOW_STRENGTH)?,
            glow_color: match get("RENDER_GLOW_COLOR") {
                Some(name) => parse_color("RENDER_GLOW_COLOR", &name)?,
                None => NamedColor::White,
            },
            shadow: match get("RENDER_SHADOW") {
                Some(spec) => parse_shadow(&spec)?,
                None => Some(DEFAULT_SHADOW_OFFSET),
            },
            region_detection: parse_or(&get, "RENDER_REGION_DETECTION", false)?,
            blur_enabled: parse_or(&get, "RENDER_BLUR", true)?,
            jpeg_quality: parse_or(&get, "RENDER_JPEG_QUALITY", DEFAULT_JPEG_QUALITY)?,
        };
        if !(1..=100).contains(&render.jpeg_quality) {
            bail!("RENDER_JPEG_QUALITY must be between 1 and 100");
        }

        Ok(Self {
            bot_token,
            database_url: get("DATABASE_URL"),
            photos_dir: get("PHOTOS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("logo-bot").join("photos")),
            fonts_dir: PathBuf::from(
                get("FONTS_DIR").unwrap_or_else(|| DEFAULT_FONTS_DIR.to_string()),
            ),
            fonts,
            default_font,
            default_color,
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            max_text_chars: parse_or(&get, "MAX_TEXT_CHARS", DEFAULT_MAX_TEXT_CHARS)?,
            session_ttl_minutes: parse_or(&get, "SESSION_TTL_MINUTES", 0)?,
            clear_after_finalize: parse_or(&get, "CLEAR_AFTER_FINALIZE", true)?,
            size_mode,
            render,
        })
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            max_upload_bytes: self.max_upload_bytes,
            defaults: SessionDefaults {
                font: self.default_font.clone(),
                color: self.default_color,
                max_text_chars: self.max_text_chars,
            },
            size_mode: self.size_mode,
            clear_after_finalize: self.clear_after_finalize,
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}

fn parse_color(key: &str, name: &str) -> Result<NamedColor> {
    NamedColor::from_name(name)
        .ok_or_else(|| anyhow!("Invalid value for {key}: unknown color '{name}'"))
}

/// `dx,dy` or `none`
fn parse_shadow(spec: &str) -> Result<Option<(i32, i32)>> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("none") || spec.eq_ignore_ascii_case("off") {
        return Ok(None);
    }
    let (dx, dy) = spec
        .split_once(',')
        .ok_or_else(|| anyhow!("RENDER_SHADOW must be 'dx,dy' or 'none', got '{spec}'"))?;
    let dx = dx.trim().parse().context("Invalid RENDER_SHADOW x offset")?;
    let dy = dy.trim().parse().context("Invalid RENDER_SHADOW y offset")?;
    Ok(Some((dx, dy)))
}

/// `id:Label:file` entries separated by `;`
fn parse_font_catalog(spec: &str) -> Result<Vec<FontEntry>> {
    let entries = spec
        .split(';')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            FontEntry::parse(part).ok_or_else(|| anyhow!("Invalid FONT_CATALOG entry '{part}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    if entries.is_empty() {
        bail!("FONT_CATALOG has no entries");
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<BotConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_token_only() {
        let config = load(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap();
        assert_eq!(config.max_upload_bytes, 200 * 1024 * 1024);
        assert_eq!(config.max_text_chars, 64);
        assert_eq!(config.default_font, "dejavu_bold");
        assert_eq!(config.default_color, NamedColor::Red);
        assert_eq!(config.size_mode, SizeMode::Proportional);
        assert!(config.clear_after_finalize);
        assert!(config.database_url.is_none());
        assert_eq!(config.render, RenderConfig::default());
    }

    #[test]
    fn test_missing_token_is_an_error() {
        assert!(load(&[]).is_err());
        assert!(load(&[("TELEGRAM_BOT_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn test_render_overrides() {
        let config = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("RENDER_HALO", "outline"),
            ("RENDER_SHADOW", "none"),
            ("RENDER_REGION_DETECTION", "true"),
            ("RENDER_GLOW_COLOR", "yellow"),
            ("SIZE_MODE", "fixed"),
        ])
        .unwrap();
        assert_eq!(config.render.halo, HaloKind::Outline);
        assert_eq!(config.render.shadow, None);
        assert_eq!(config.size_mode, SizeMode::Fixed);

        let options = config.render.engine_options();
        assert_eq!(
            options.effects.halo,
            Halo::Outline {
                color: NamedColor::Yellow.rgba()
            }
        );
        assert_eq!(config.render.placement().name(), "largest_contour");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(load(&[("TELEGRAM_BOT_TOKEN", "t"), ("RENDER_HALO", "sparkles")]).is_err());
        assert!(load(&[("TELEGRAM_BOT_TOKEN", "t"), ("RENDER_SHADOW", "4")]).is_err());
        assert!(load(&[("TELEGRAM_BOT_TOKEN", "t"), ("MAX_TEXT_CHARS", "lots")]).is_err());
        assert!(load(&[("TELEGRAM_BOT_TOKEN", "t"), ("DEFAULT_FONT", "comic_sans")]).is_err());
        assert!(load(&[("TELEGRAM_BOT_TOKEN", "t"), ("RENDER_JPEG_QUALITY", "0")]).is_err());
    }

    #[test]
    fn test_font_catalog_override() {
        let config = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("FONT_CATALOG", "a:Alpha:a.ttf; b:Beta:b.ttf"),
        ])
        .unwrap();
        assert_eq!(config.fonts.len(), 2);
        assert_eq!(config.default_font, "a");
        assert_eq!(config.fonts[1].label, "Beta");
    }
}
