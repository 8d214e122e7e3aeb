//! # Edit Session Module
//!
//! Per-user editing state collected across the conversation: the stored photo,
//! the logo text and every style choice made through the control surface.
//! All mutation goes through methods that keep the session invariants.

use chrono::{DateTime, Utc};
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::{InvalidInput, MissingState, SessionError};

/// Pixels moved per directional nudge
pub const NUDGE_STEP: i32 = 20;
/// Lower bound applied by the grow/shrink buttons
pub const MIN_SIZE_MULTIPLIER: f32 = 0.5;
/// Upper bound applied by the grow/shrink buttons
pub const MAX_SIZE_MULTIPLIER: f32 = 2.0;
/// Highest background blur intensity
pub const MAX_BLUR_INTENSITY: u8 = 10;

/// Identity of the user an event belongs to and where to reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub user_id: i64,
    pub chat_id: i64,
    pub language_code: Option<String>,
}

impl UserRef {
    pub fn new(user_id: i64, chat_id: i64) -> Self {
        Self {
            user_id,
            chat_id,
            language_code: None,
        }
    }

    pub fn with_language(mut self, language_code: Option<String>) -> Self {
        self.language_code = language_code;
        self
    }

    pub fn lang(&self) -> Option<&str> {
        self.language_code.as_deref()
    }
}

/// A message already delivered by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Text offset from the computed center of the placement box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

/// Text colors offered on the control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedColor {
    Red,
    Blue,
    Green,
    Black,
    Yellow,
    Orange,
    Purple,
    White,
}

impl NamedColor {
    pub const ALL: [NamedColor; 8] = [
        NamedColor::Red,
        NamedColor::Blue,
        NamedColor::Green,
        NamedColor::Black,
        NamedColor::Yellow,
        NamedColor::Orange,
        NamedColor::Purple,
        NamedColor::White,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NamedColor::Red => "red",
            NamedColor::Blue => "blue",
            NamedColor::Green => "green",
            NamedColor::Black => "black",
            NamedColor::Yellow => "yellow",
            NamedColor::Orange => "orange",
            NamedColor::Purple => "purple",
            NamedColor::White => "white",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Opaque RGBA value, matching the CSS color names
    pub fn rgba(&self) -> Rgba<u8> {
        match self {
            NamedColor::Red => Rgba([255, 0, 0, 255]),
            NamedColor::Blue => Rgba([0, 0, 255, 255]),
            NamedColor::Green => Rgba([0, 128, 0, 255]),
            NamedColor::Black => Rgba([0, 0, 0, 255]),
            NamedColor::Yellow => Rgba([255, 255, 0, 255]),
            NamedColor::Orange => Rgba([255, 165, 0, 255]),
            NamedColor::Purple => Rgba([128, 0, 128, 255]),
            NamedColor::White => Rgba([255, 255, 255, 255]),
        }
    }

    /// Swatch shown on the color buttons
    pub fn swatch(&self) -> &'static str {
        match self {
            NamedColor::Red => "🔴",
            NamedColor::Blue => "🔵",
            NamedColor::Green => "🟢",
            NamedColor::Black => "⚫",
            NamedColor::Yellow => "🟡",
            NamedColor::Orange => "🟠",
            NamedColor::Purple => "🟣",
            NamedColor::White => "⚪",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// How a size button changes the multiplier
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeChange {
    /// Multiply by the factor, then clamp to [MIN_SIZE_MULTIPLIER, MAX_SIZE_MULTIPLIER]
    Scale(f32),
    /// Replace the multiplier with a fixed value
    Set(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurChange {
    Increase,
    Decrease,
}

/// A mutating adjustment from the control surface
#[derive(Debug, Clone, PartialEq)]
pub enum Adjustment {
    Move(Direction),
    Resize(SizeChange),
    Color(NamedColor),
    Font(String),
    Blur(BlurChange),
}

/// Conversation phase, derived from the stored session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingPhoto,
    AwaitingText,
    Ready,
}

impl SessionPhase {
    pub fn of(session: Option<&EditSession>) -> Self {
        match session {
            None => SessionPhase::AwaitingPhoto,
            Some(s) if s.text.is_empty() => SessionPhase::AwaitingText,
            Some(_) => SessionPhase::Ready,
        }
    }
}

/// Style values a fresh session starts with
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDefaults {
    pub font: String,
    pub color: NamedColor,
    pub max_text_chars: usize,
}

/// Editing state for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSession {
    source_image: PathBuf,
    pub text: String,
    pub font: String,
    pub color: NamedColor,
    pub position: Offset,
    pub size_multiplier: f32,
    pub blur_intensity: u8,
    /// Message currently showing the last good render
    pub output_message: Option<MessageRef>,
    /// Incremented on each photo upload
    pub generation: u64,
    pub language_code: Option<String>,
    pub touched_at: DateTime<Utc>,
}

impl EditSession {
    pub fn new(source_image: PathBuf, generation: u64, defaults: &SessionDefaults) -> Self {
        Self {
            source_image,
            text: String::new(),
            font: defaults.font.clone(),
            color: defaults.color,
            position: Offset::default(),
            size_multiplier: 1.0,
            blur_intensity: 0,
            output_message: None,
            generation,
            language_code: None,
            touched_at: Utc::now(),
        }
    }

    pub fn source_image(&self) -> &PathBuf {
        &self.source_image
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::of(Some(self))
    }

    pub fn touch(&mut self) {
        self.touched_at = Utc::now();
    }

    /// Record the logo text; the stored value is trimmed
    pub fn set_text(&mut self, text: &str, max_chars: usize) -> Result<(), SessionError> {
        let trimmed = validate_logo_text(text, max_chars)?;
        self.text = trimmed;
        Ok(())
    }

    /// Apply one control-surface adjustment
    ///
    /// `known_font` decides whether a font id may be selected.
    pub fn apply(
        &mut self,
        adjustment: &Adjustment,
        known_font: impl Fn(&str) -> bool,
    ) -> Result<(), SessionError> {
        if self.text.is_empty() {
            return Err(SessionError::Precondition(MissingState::Text));
        }

        match adjustment {
            Adjustment::Move(direction) => {
                let (dx, dy) = match direction {
                    Direction::Left => (-NUDGE_STEP, 0),
                    Direction::Right => (NUDGE_STEP, 0),
                    Direction::Up => (0, -NUDGE_STEP),
                    Direction::Down => (0, NUDGE_STEP),
                };
                self.position.x = self.position.x.saturating_add(dx);
                self.position.y = self.position.y.saturating_add(dy);
            }
            Adjustment::Resize(SizeChange::Scale(factor)) => {
                self.size_multiplier = (self.size_multiplier * factor)
                    .clamp(MIN_SIZE_MULTIPLIER, MAX_SIZE_MULTIPLIER);
            }
            Adjustment::Resize(SizeChange::Set(value)) => {
                if *value > 0.0 {
                    self.size_multiplier = *value;
                }
            }
            Adjustment::Color(color) => self.color = *color,
            Adjustment::Font(id) => {
                if !known_font(id) {
                    return Err(SessionError::Validation(InvalidInput::UnknownFont(
                        id.clone(),
                    )));
                }
                self.font = id.clone();
            }
            Adjustment::Blur(BlurChange::Increase) => {
                self.blur_intensity = (self.blur_intensity + 1).min(MAX_BLUR_INTENSITY);
            }
            Adjustment::Blur(BlurChange::Decrease) => {
                self.blur_intensity = self.blur_intensity.saturating_sub(1);
            }
        }
        Ok(())
    }
}

/// Validates logo text input
pub fn validate_logo_text(text: &str, max_chars: usize) -> Result<String, SessionError> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(SessionError::Validation(InvalidInput::EmptyText));
    }

    if trimmed.chars().count() > max_chars {
        return Err(SessionError::Validation(InvalidInput::TextTooLong {
            max: max_chars,
        }));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> SessionDefaults {
        SessionDefaults {
            font: "dejavu_bold".to_string(),
            color: NamedColor::Red,
            max_text_chars: 64,
        }
    }

    fn ready_session() -> EditSession {
        let mut session = EditSession::new(PathBuf::from("photo.png"), 1, &defaults());
        session.set_text("HELLO", 64).unwrap();
        session
    }

    #[test]
    fn test_logo_text_validation() {
        assert!(validate_logo_text("HELLO", 64).is_ok());
        assert!(validate_logo_text("  Mom's Bakery  ", 64).is_ok());

        assert!(validate_logo_text("", 64).is_err());
        assert!(validate_logo_text("   ", 64).is_err());
        assert!(validate_logo_text(&"a".repeat(65), 64).is_err());
    }

    #[test]
    fn test_logo_text_trimming() {
        let result = validate_logo_text("  Test Logo  ", 64);
        assert_eq!(result.unwrap(), "Test Logo");
    }

    #[test]
    fn test_adjustment_requires_text() {
        let mut session = EditSession::new(PathBuf::from("photo.png"), 1, &defaults());
        let result = session.apply(&Adjustment::Move(Direction::Left), |_| true);
        assert_eq!(result, Err(SessionError::Precondition(MissingState::Text)));
        assert_eq!(session.position, Offset::default());
    }

    #[test]
    fn test_size_multiplier_is_clamped() {
        let mut session = ready_session();
        for _ in 0..20 {
            session
                .apply(&Adjustment::Resize(SizeChange::Scale(1.1)), |_| true)
                .unwrap();
        }
        assert_eq!(session.size_multiplier, MAX_SIZE_MULTIPLIER);

        for _ in 0..40 {
            session
                .apply(&Adjustment::Resize(SizeChange::Scale(0.9)), |_| true)
                .unwrap();
        }
        assert_eq!(session.size_multiplier, MIN_SIZE_MULTIPLIER);
    }

    #[test]
    fn test_fixed_size_values() {
        let mut session = ready_session();
        session
            .apply(&Adjustment::Resize(SizeChange::Set(1.5)), |_| true)
            .unwrap();
        assert_eq!(session.size_multiplier, 1.5);
        session
            .apply(&Adjustment::Resize(SizeChange::Set(0.8)), |_| true)
            .unwrap();
        assert_eq!(session.size_multiplier, 0.8);
    }

    #[test]
    fn test_blur_saturates() {
        let mut session = ready_session();
        for _ in 0..15 {
            session
                .apply(&Adjustment::Blur(BlurChange::Increase), |_| true)
                .unwrap();
        }
        assert_eq!(session.blur_intensity, MAX_BLUR_INTENSITY);

        for _ in 0..15 {
            session
                .apply(&Adjustment::Blur(BlurChange::Decrease), |_| true)
                .unwrap();
        }
        assert_eq!(session.blur_intensity, 0);
    }

    #[test]
    fn test_unknown_font_is_rejected() {
        let mut session = ready_session();
        let result = session.apply(&Adjustment::Font("comic".to_string()), |id| id == "mono");
        assert!(matches!(
            result,
            Err(SessionError::Validation(InvalidInput::UnknownFont(_)))
        ));
        assert_eq!(session.font, "dejavu_bold");
    }

    #[test]
    fn test_phase_follows_text() {
        let session = EditSession::new(PathBuf::from("photo.png"), 1, &defaults());
        assert_eq!(session.phase(), SessionPhase::AwaitingText);
        assert_eq!(ready_session().phase(), SessionPhase::Ready);
        assert_eq!(SessionPhase::of(None), SessionPhase::AwaitingPhoto);
    }

    #[test]
    fn test_named_colors_round_trip_by_name() {
        for color in NamedColor::ALL {
            assert_eq!(NamedColor::from_name(color.name()), Some(color));
        }
        assert_eq!(NamedColor::from_name(" Orange "), Some(NamedColor::Orange));
        assert_eq!(NamedColor::from_name("teal"), None);
    }
}
