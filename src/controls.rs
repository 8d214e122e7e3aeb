//! Control surface vocabulary: the button ids the controller understands and a
//! transport-neutral description of the adjustment keyboard.

use crate::localization::t_lang;
use crate::session::{Adjustment, BlurChange, Direction, NamedColor, SizeChange};

/// Grow factor for the proportional size buttons
pub const GROW_FACTOR: f32 = 1.1;
/// Shrink factor for the proportional size buttons
pub const SHRINK_FACTOR: f32 = 0.9;
/// Multiplier set by the fixed zoom-in button
pub const ZOOM_IN_VALUE: f32 = 1.5;
/// Multiplier set by the fixed zoom-out button
pub const ZOOM_OUT_VALUE: f32 = 0.8;

const FONT_PREFIX: &str = "font_";
const COLOR_PREFIX: &str = "color_";

/// Which size buttons the keyboard shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMode {
    /// ×1.1 / ×0.9, clamped
    Proportional,
    /// Fixed 1.5 / 0.8 multipliers
    Fixed,
}

/// Everything a button press can ask for
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Adjust(Adjustment),
    Finalize,
}

impl Action {
    /// Parse a button id; both the short and the prefixed spellings are accepted
    pub fn parse(action_id: &str) -> Option<Action> {
        let action = match action_id {
            "left" | "move_left" => Action::Adjust(Adjustment::Move(Direction::Left)),
            "right" | "move_right" => Action::Adjust(Adjustment::Move(Direction::Right)),
            "up" | "move_up" => Action::Adjust(Adjustment::Move(Direction::Up)),
            "down" | "move_down" => Action::Adjust(Adjustment::Move(Direction::Down)),
            "increase" | "increase_size" | "bigger" => {
                Action::Adjust(Adjustment::Resize(SizeChange::Scale(GROW_FACTOR)))
            }
            "decrease" | "decrease_size" | "smaller" => {
                Action::Adjust(Adjustment::Resize(SizeChange::Scale(SHRINK_FACTOR)))
            }
            "zoom_in" => Action::Adjust(Adjustment::Resize(SizeChange::Set(ZOOM_IN_VALUE))),
            "zoom_out" => Action::Adjust(Adjustment::Resize(SizeChange::Set(ZOOM_OUT_VALUE))),
            "blur_increase" | "blur_plus" => Action::Adjust(Adjustment::Blur(BlurChange::Increase)),
            "blur_decrease" | "blur_minus" => {
                Action::Adjust(Adjustment::Blur(BlurChange::Decrease))
            }
            "finalize" | "download" | "download_logo" | "download_jpg" => Action::Finalize,
            other => {
                if let Some(name) = other.strip_prefix(COLOR_PREFIX) {
                    Action::Adjust(Adjustment::Color(NamedColor::from_name(name)?))
                } else if let Some(font_id) = other.strip_prefix(FONT_PREFIX) {
                    if font_id.is_empty() {
                        return None;
                    }
                    Action::Adjust(Adjustment::Font(font_id.to_string()))
                } else {
                    return None;
                }
            }
        };
        Some(action)
    }
}

/// One button: visible label plus the id sent back on press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub label: String,
    pub action_id: String,
}

impl Control {
    fn new(label: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action_id: action_id.into(),
        }
    }
}

/// Rows of buttons shown under every rendered image
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlSurface {
    pub rows: Vec<Vec<Control>>,
}

impl ControlSurface {
    /// Build the adjustment keyboard
    ///
    /// `fonts` is the (id, label) list from the font catalog.
    pub fn adjustment(
        fonts: &[(String, String)],
        size_mode: SizeMode,
        blur_enabled: bool,
        language_code: Option<&str>,
    ) -> Self {
        let mut rows = vec![
            vec![
                Control::new(t_lang("control-left", language_code), "move_left"),
                Control::new(t_lang("control-right", language_code), "move_right"),
            ],
            vec![
                Control::new(t_lang("control-up", language_code), "move_up"),
                Control::new(t_lang("control-down", language_code), "move_down"),
            ],
        ];

        rows.push(match size_mode {
            SizeMode::Proportional => vec![
                Control::new(t_lang("control-bigger", language_code), "increase_size"),
                Control::new(t_lang("control-smaller", language_code), "decrease_size"),
            ],
            SizeMode::Fixed => vec![
                Control::new(t_lang("control-zoom-in", language_code), "zoom_in"),
                Control::new(t_lang("control-zoom-out", language_code), "zoom_out"),
            ],
        });

        // Telegram caps a row at 8 buttons
        rows.push(
            NamedColor::ALL
                .iter()
                .map(|c| Control::new(c.swatch(), format!("{COLOR_PREFIX}{}", c.name())))
                .collect(),
        );

        for chunk in fonts.chunks(3) {
            rows.push(
                chunk
                    .iter()
                    .map(|(id, label)| Control::new(label.clone(), format!("{FONT_PREFIX}{id}")))
                    .collect(),
            );
        }

        if blur_enabled {
            rows.push(vec![
                Control::new(t_lang("control-blur-plus", language_code), "blur_plus"),
                Control::new(t_lang("control-blur-minus", language_code), "blur_minus"),
            ]);
        }

        rows.push(vec![Control::new(
            t_lang("control-download", language_code),
            "download_logo",
        )]);

        Self { rows }
    }

    pub fn action_ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|c| c.action_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_movement_spellings() {
        assert_eq!(
            Action::parse("left"),
            Some(Action::Adjust(Adjustment::Move(Direction::Left)))
        );
        assert_eq!(Action::parse("move_left"), Action::parse("left"));
        assert_eq!(Action::parse("move_down"), Action::parse("down"));
    }

    #[test]
    fn test_parse_colors_and_fonts() {
        assert_eq!(
            Action::parse("color_purple"),
            Some(Action::Adjust(Adjustment::Color(NamedColor::Purple)))
        );
        assert_eq!(Action::parse("color_teal"), None);
        assert_eq!(
            Action::parse("font_dejavu_serif"),
            Some(Action::Adjust(Adjustment::Font("dejavu_serif".to_string())))
        );
        assert_eq!(Action::parse("font_"), None);
    }

    #[test]
    fn test_parse_finalize_and_unknown() {
        assert_eq!(Action::parse("download_logo"), Some(Action::Finalize));
        assert_eq!(Action::parse("download_jpg"), Some(Action::Finalize));
        assert_eq!(Action::parse("launch_rocket"), None);
    }

    #[test]
    fn test_every_surface_button_parses() {
        let fonts = vec![
            ("sans".to_string(), "Sans".to_string()),
            ("serif".to_string(), "Serif".to_string()),
        ];
        for mode in [SizeMode::Proportional, SizeMode::Fixed] {
            let surface = ControlSurface::adjustment(&fonts, mode, true, None);
            for id in surface.action_ids() {
                assert!(Action::parse(id).is_some(), "unparseable button id {id}");
            }
        }
    }

    #[test]
    fn test_blur_row_is_optional() {
        let surface = ControlSurface::adjustment(&[], SizeMode::Proportional, false, None);
        assert!(surface.action_ids().all(|id| !id.starts_with("blur")));
    }
}
