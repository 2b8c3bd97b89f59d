use capitulo_core::catalog::client::{
    CatalogConfig, DEFAULT_BASE_URL, DEFAULT_LANGUAGE, DEFAULT_MAX_RESULTS, MAX_RESULTS_LIMIT,
};
use std::env;

pub const BOT_TOKEN: &str = "BOT_TOKEN";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const CATALOG_BASE_URL: &str = "CATALOG_BASE_URL";
pub const CATALOG_LANGUAGE: &str = "CATALOG_LANGUAGE";
pub const CATALOG_MAX_RESULTS: &str = "CATALOG_MAX_RESULTS";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://capitulo_cero.db";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("environment variable {0} is required but not set")]
    Missing(&'static str),
    #[error("environment variable {key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime configuration, read once at startup.
#[derive(PartialEq, Eq)]
pub struct Settings {
    pub bot_token: String,
    pub database_url: String,
    pub catalog: CatalogConfig,
}

impl core::fmt::Debug for Settings {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Settings")
            .field("bot_token", &"<redacted>")
            .field("database_url", &self.database_url)
            .field("catalog", &self.catalog)
            .finish()
    }
}

impl Settings {
    /// Reads settings from the process environment.
    /// # Errors
    /// Fails if the bot token is missing or a value cannot be parsed.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called once at startup")]
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset.
    /// # Errors
    /// Fails if the bot token is missing, a value cannot be parsed or `CATALOG_MAX_RESULTS` is
    /// outside `1..=40`.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called once at startup")]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let bot_token = get(BOT_TOKEN).ok_or(SettingsError::Missing(BOT_TOKEN))?;
        let max_results = match get(CATALOG_MAX_RESULTS) {
            Some(value) => value
                .parse::<u8>()
                .ok()
                .filter(|max| (1..=MAX_RESULTS_LIMIT).contains(max))
                .ok_or(SettingsError::Invalid {
                    key: CATALOG_MAX_RESULTS,
                    value,
                })?,
            None => DEFAULT_MAX_RESULTS,
        };

        Ok(Self {
            bot_token,
            database_url: get(DATABASE_URL).unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            catalog: CatalogConfig {
                base_url: get(CATALOG_BASE_URL)
                    .map_or_else(|| DEFAULT_BASE_URL.to_owned(), |url| {
                        url.trim_end_matches('/').to_owned()
                    }),
                language: get(CATALOG_LANGUAGE).unwrap_or_else(|| DEFAULT_LANGUAGE.to_owned()),
                max_results,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_token_is_set() {
        let settings = Settings::from_lookup(lookup(&[(BOT_TOKEN, "123:abc")])).unwrap();

        assert_eq!(settings.bot_token, "123:abc");
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(settings.catalog, CatalogConfig::default());
    }

    #[test]
    fn missing_or_blank_token_is_an_error() {
        assert_eq!(
            Settings::from_lookup(lookup(&[])),
            Err(SettingsError::Missing(BOT_TOKEN))
        );
        assert_eq!(
            Settings::from_lookup(lookup(&[(BOT_TOKEN, "   ")])),
            Err(SettingsError::Missing(BOT_TOKEN))
        );
    }

    #[test]
    fn overrides_are_read() {
        let settings = Settings::from_lookup(lookup(&[
            (BOT_TOKEN, "t"),
            (DATABASE_URL, "sqlite::memory:"),
            (CATALOG_BASE_URL, "http://localhost:8080/books/v1/"),
            (CATALOG_LANGUAGE, "en"),
            (CATALOG_MAX_RESULTS, "5"),
        ]))
        .unwrap();

        assert_eq!(settings.database_url, "sqlite::memory:");
        assert_eq!(
            settings.catalog,
            CatalogConfig {
                base_url: "http://localhost:8080/books/v1".to_owned(),
                language: "en".to_owned(),
                max_results: 5,
            }
        );
    }

    #[test]
    fn max_results_must_be_within_the_catalog_limit() {
        for value in ["0", "-1", "tres", "41", "255", "1000"] {
            assert_eq!(
                Settings::from_lookup(lookup(&[(BOT_TOKEN, "t"), (CATALOG_MAX_RESULTS, value)])),
                Err(SettingsError::Invalid {
                    key: CATALOG_MAX_RESULTS,
                    value: value.to_owned(),
                })
            );
        }
    }

    #[test]
    fn max_results_accepts_the_catalog_limit() {
        let settings =
            Settings::from_lookup(lookup(&[(BOT_TOKEN, "t"), (CATALOG_MAX_RESULTS, "40")])).unwrap();
        assert_eq!(settings.catalog.max_results, 40);
    }

    #[test]
    fn debug_output_hides_the_token() {
        let settings = Settings::from_lookup(lookup(&[(BOT_TOKEN, "secret-token")])).unwrap();
        assert!(!format!("{settings:?}").contains("secret-token"));
    }
}
