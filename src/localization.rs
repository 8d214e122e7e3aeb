use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use std::sync::LazyLock;
use unic_langid::LanguageIdentifier;
use anyhow::Result;

const FALLBACK_LANGUAGE: &str = "en";

// Bundled resources; the binary does not depend on the working directory
const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("fr", include_str!("../locales/fr/main.ftl")),
];

/// Localization manager for the logo bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every bundled language
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (code, source) in RESOURCES {
            let locale: LanguageIdentifier = code.parse()?;
            let bundle = Self::create_bundle(locale, source)?;
            bundles.insert(code.to_string(), bundle);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(
        locale: LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Telegram renders the bidi isolation marks literally
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow::anyhow!("Invalid fluent resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow::anyhow!("Duplicate fluent messages: {errors:?}"))?;

        Ok(bundle)
    }

    /// Whether a bundle exists for the primary subtag of `language_code`
    pub fn is_language_supported(&self, language_code: &str) -> bool {
        self.bundles.contains_key(primary_subtag(language_code))
    }

    /// Get a localized message, falling back to English for unknown languages
    pub fn get_message(
        &self,
        key: &str,
        args: Option<&FluentArgs>,
        language_code: Option<&str>,
    ) -> String {
        let requested = language_code.map(primary_subtag).unwrap_or(FALLBACK_LANGUAGE);
        let bundle = match self
            .bundles
            .get(requested)
            .or_else(|| self.bundles.get(FALLBACK_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {key}"),
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {key}"),
        };

        let mut errors = vec![];
        bundle.format_pattern(pattern, args, &mut errors).into_owned()
    }
}

fn primary_subtag(language_code: &str) -> &str {
    language_code.split(['-', '_']).next().unwrap_or(language_code)
}

static LOCALIZATION_MANAGER: LazyLock<Option<LocalizationManager>> = LazyLock::new(|| {
    match LocalizationManager::new() {
        Ok(manager) => Some(manager),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load localization bundles");
            None
        }
    }
});

/// Get the global localization manager
pub fn get_localization_manager() -> Option<&'static LocalizationManager> {
    LOCALIZATION_MANAGER.as_ref()
}

/// Convenience function to get a localized message in the user's language
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    match get_localization_manager() {
        Some(manager) => manager.get_message(key, None, language_code),
        None => key.to_string(),
    }
}

/// Convenience function to get a localized message with arguments in the user's language
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let mut fluent_args = FluentArgs::new();
    for (name, value) in args {
        fluent_args.set(*name, value.to_string());
    }
    match get_localization_manager() {
        Some(manager) => manager.get_message(key, Some(&fluent_args), language_code),
        None => key.to_string(),
    }
}
