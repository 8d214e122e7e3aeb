//! # Localization Tests
//!
//! This module contains unit tests for the localization functionality,
//! testing message retrieval and formatting with various edge cases.

use fluent_bundle::FluentArgs;
use logo_bot::localization::{t_args_lang, t_lang, LocalizationManager};

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        // Create a new localization manager for each test
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message("prompt-send-text", None, Some("en"));
        assert!(!message.is_empty());
        assert!(message.contains("Photo received"));
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message("nonexistent-key", None, Some("en"));
        assert!(message.starts_with("Missing translation:"));
    }

    #[test]
    fn test_get_message_unsupported_language() {
        let manager = setup_localization();

        let message = manager.get_message("error-photo-required", None, Some("xx"));
        // Should fall back to English
        assert_eq!(message, manager.get_message("error-photo-required", None, Some("en")));
    }

    #[test]
    fn test_regional_variant_uses_primary_language() {
        let manager = setup_localization();

        assert!(manager.is_language_supported("fr-CA"));
        assert!(!manager.is_language_supported("de"));
        assert_eq!(
            manager.get_message("error-photo-required", None, Some("fr-CA")),
            manager.get_message("error-photo-required", None, Some("fr"))
        );
    }

    #[test]
    fn test_get_message_with_args() {
        let manager = setup_localization();

        let mut args = FluentArgs::new();
        args.set("limit", "200");

        let message = manager.get_message("error-upload-too-large", Some(&args), Some("en"));
        assert!(message.contains("200"));
        // Isolation marks are disabled for Telegram
        assert!(!message.contains('\u{2068}'));
    }

    #[test]
    fn test_french_differs_from_english() {
        assert_ne!(
            t_lang("prompt-send-text", Some("fr")),
            t_lang("prompt-send-text", Some("en"))
        );
    }

    #[test]
    fn test_every_english_key_is_translated() {
        let manager = setup_localization();
        let keys = include_str!("../locales/en/main.ftl")
            .lines()
            .filter_map(|line| line.split_once(" = ").map(|(key, _)| key.trim()))
            .filter(|key| !key.starts_with('#'));

        for key in keys {
            let fr = manager.get_message(key, None, Some("fr"));
            assert!(!fr.starts_with("Missing"), "missing French translation for {key}");
        }
    }

    #[test]
    fn test_convenience_helpers() {
        let message = t_args_lang("error-text-too-long", &[("max", "64")], Some("en"));
        assert!(message.contains("64"));
        assert_eq!(t_lang("error-internal", None), t_lang("error-internal", Some("en")));
    }
}
