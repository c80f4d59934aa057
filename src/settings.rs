//! Startup settings read from the process environment.

use crate::client::GeminiModel;
use std::time::Duration;

/// Environment variables consulted for the provider credential, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];
/// Environment variable selecting the Gemini model (`flash` or `pro`).
pub const MODEL_ENV_VAR: &str = "PIXLY_MODEL";
/// Environment variable overriding the generation timeout, in seconds.
pub const TIMEOUT_ENV_VAR: &str = "PIXLY_TIMEOUT_SECS";

/// Default upper bound on one generation call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    api_key: Option<String>,
    model: GeminiModel,
    timeout: Duration,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty());

        let model = match lookup(MODEL_ENV_VAR) {
            Some(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!(value = %value, "ignoring {MODEL_ENV_VAR}: {e}");
                GeminiModel::default()
            }),
            None => GeminiModel::default(),
        };

        let timeout = match lookup(TIMEOUT_ENV_VAR) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %value, "ignoring {TIMEOUT_ENV_VAR}: expected a positive number of seconds");
                    DEFAULT_TIMEOUT
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        Self {
            api_key,
            model,
            timeout,
        }
    }

    /// Overrides the credential. Blank keys count as absent.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into().trim().to_string();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Overrides the model.
    pub fn with_model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The provider credential, if configured.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Returns true when a provider credential is present.
    pub fn credential_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Gemini model to use.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    /// Upper bound on one generation call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert!(!settings.credential_configured());
        assert_eq!(settings.model(), GeminiModel::default());
        assert_eq!(settings.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_api_key_precedence() {
        let settings = Settings::from_lookup(lookup(&[
            ("API_KEY", "generic"),
            ("GOOGLE_API_KEY", "google"),
        ]));
        assert_eq!(settings.api_key(), Some("google"));

        let settings = Settings::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "  "),
            ("API_KEY", "generic"),
        ]));
        assert_eq!(settings.api_key(), Some("generic"));
    }

    #[test]
    fn test_model_and_timeout() {
        let settings = Settings::from_lookup(lookup(&[
            ("PIXLY_MODEL", "flash"),
            ("PIXLY_TIMEOUT_SECS", "30"),
        ]));
        assert_eq!(settings.model(), GeminiModel::Flash);
        assert_eq!(settings.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[
            ("PIXLY_MODEL", "imagen"),
            ("PIXLY_TIMEOUT_SECS", "0"),
        ]));
        assert_eq!(settings.model(), GeminiModel::default());
        assert_eq!(settings.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_with_api_key_blank_is_absent() {
        assert!(!Settings::default().with_api_key(" ").credential_configured());
        assert!(Settings::default().with_api_key("k").credential_configured());
    }

    #[test]
    fn test_debug_hides_key() {
        let settings = Settings::default().with_api_key("secret-key");
        assert!(!format!("{settings:?}").contains("secret-key"));
    }
}
