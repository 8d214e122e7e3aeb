//! # Session Error Types Module
//!
//! This module defines the error taxonomy used by the session controller and the
//! composition engine. Every failure an inbound event can hit maps onto exactly one
//! of these kinds, and every kind has a user-visible message.

use crate::localization::{t_args_lang, t_lang};

/// State the operation needs but the session does not have yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingState {
    /// No session exists or no photo has been stored
    Photo,
    /// The session has a photo but no text yet
    Text,
}

/// User input that fails a constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    /// Text was empty after trimming
    EmptyText,
    /// Text longer than the configured cap
    TextTooLong { max: usize },
    /// Upload larger than the configured cap
    UploadTooLarge { limit_bytes: u64 },
    /// Upload bytes are not a recognised image
    UnsupportedFormat,
    /// Font id not present in the catalog
    UnknownFont(String),
    /// Button id outside the control vocabulary
    UnknownAction(String),
}

/// Failures inside the composition engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Source image could not be decoded
    Decode(String),
    /// Font file missing or unreadable
    FontLoad(String),
    /// Rendered image could not be encoded
    Encode(String),
    /// Temporary artifact or photo file I/O
    Io(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Decode(msg) => write!(f, "Decode error: {msg}"),
            RenderError::FontLoad(msg) => write!(f, "Font load error: {msg}"),
            RenderError::Encode(msg) => write!(f, "Encode error: {msg}"),
            RenderError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => RenderError::Io(e.to_string()),
            image::ImageError::Encoding(e) => RenderError::Encode(e.to_string()),
            other => RenderError::Decode(other.to_string()),
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err.to_string())
    }
}

/// Error kinds surfaced by the session controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Prior state (photo before text, text before adjustment) is missing
    Precondition(MissingState),
    /// User input fails a constraint
    Validation(InvalidInput),
    /// Image decode, font load or compositing failure
    Render(RenderError),
    /// Sending or editing a message failed
    Transport(String),
    /// Reading or writing the session store or photo storage failed
    Storage(String),
}

impl SessionError {
    /// Short label used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Precondition(_) => "precondition",
            SessionError::Validation(_) => "validation",
            SessionError::Render(_) => "render",
            SessionError::Transport(_) => "transport",
            SessionError::Storage(_) => "storage",
        }
    }

    /// Whether the failure was caused by the user rather than the system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SessionError::Precondition(_) | SessionError::Validation(_)
        )
    }

    /// Localized message shown to the user for this failure
    pub fn user_message(&self, language_code: Option<&str>) -> String {
        match self {
            SessionError::Precondition(MissingState::Photo) => {
                t_lang("error-photo-required", language_code)
            }
            SessionError::Precondition(MissingState::Text) => {
                t_lang("error-text-required", language_code)
            }
            SessionError::Validation(InvalidInput::EmptyText) => {
                t_lang("error-empty-text", language_code)
            }
            SessionError::Validation(InvalidInput::TextTooLong { max }) => t_args_lang(
                "error-text-too-long",
                &[("max", &max.to_string())],
                language_code,
            ),
            SessionError::Validation(InvalidInput::UploadTooLarge { limit_bytes }) => {
                let limit_mb = limit_bytes / (1024 * 1024);
                t_args_lang(
                    "error-upload-too-large",
                    &[("limit", &limit_mb.to_string())],
                    language_code,
                )
            }
            SessionError::Validation(InvalidInput::UnsupportedFormat) => {
                t_lang("error-unsupported-format", language_code)
            }
            SessionError::Validation(InvalidInput::UnknownFont(_)) => {
                t_lang("error-unknown-font", language_code)
            }
            SessionError::Validation(InvalidInput::UnknownAction(_)) => {
                t_lang("error-unknown-action", language_code)
            }
            SessionError::Render(_) => t_lang("error-render-failed", language_code),
            SessionError::Transport(_) | SessionError::Storage(_) => {
                t_lang("error-internal", language_code)
            }
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Precondition(MissingState::Photo) => {
                write!(f, "Precondition error: no photo stored")
            }
            SessionError::Precondition(MissingState::Text) => {
                write!(f, "Precondition error: no text provided")
            }
            SessionError::Validation(input) => match input {
                InvalidInput::EmptyText => write!(f, "Validation error: empty text"),
                InvalidInput::TextTooLong { max } => {
                    write!(f, "Validation error: text longer than {max} characters")
                }
                InvalidInput::UploadTooLarge { limit_bytes } => {
                    write!(f, "Validation error: upload exceeds {limit_bytes} bytes")
                }
                InvalidInput::UnsupportedFormat => {
                    write!(f, "Validation error: unsupported image format")
                }
                InvalidInput::UnknownFont(id) => write!(f, "Validation error: unknown font {id}"),
                InvalidInput::UnknownAction(id) => {
                    write!(f, "Validation error: unknown action {id}")
                }
            },
            SessionError::Render(err) => write!(f, "Render error: {err}"),
            SessionError::Transport(msg) => write!(f, "Transport error: {msg}"),
            SessionError::Storage(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<RenderError> for SessionError {
    fn from(err: RenderError) -> Self {
        SessionError::Render(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_formatting() {
        let err = SessionError::Render(RenderError::FontLoad("missing.ttf".to_string()));
        assert_eq!(err.to_string(), "Render error: Font load error: missing.ttf");

        let err = SessionError::Validation(InvalidInput::UploadTooLarge { limit_bytes: 10 });
        assert_eq!(err.to_string(), "Validation error: upload exceeds 10 bytes");
    }

    #[test]
    fn test_user_errors_are_classified() {
        assert!(SessionError::Precondition(MissingState::Photo).is_user_error());
        assert!(SessionError::Validation(InvalidInput::EmptyText).is_user_error());
        assert!(!SessionError::Transport("timeout".to_string()).is_user_error());
        assert_eq!(SessionError::Storage("down".to_string()).kind(), "storage");
    }

    #[test]
    fn test_upload_limit_message_is_in_megabytes() {
        let err = SessionError::Validation(InvalidInput::UploadTooLarge {
            limit_bytes: 200 * 1024 * 1024,
        });
        assert!(err.user_message(Some("en")).contains("200"));
    }
}
