//! Runtime configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use xiuxian_gemini::DEFAULT_MODEL;

use crate::error::AppError;

/// Everything `main` needs to wire the service.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `GEMINI_API_KEY`; empty means every generation call fails with a
    /// missing-credential error.
    pub gemini_api_key: String,
    /// `GEMINI_MODEL`.
    pub gemini_model: String,
    /// `GEMINI_BASE_URL`, for pointing at a proxy.
    pub gemini_base_url: Option<String>,
    /// `UNSPLASH_ACCESS_KEY`.
    pub unsplash_access_key: String,
    /// `XIUXIAN_SAVE_DIR`.
    pub save_dir: PathBuf,
    /// `HOST`.
    pub host: String,
    /// `PORT`.
    pub port: u16,
    /// `RETRY_BASE_DELAY_MS`.
    pub retry_base_delay: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("gemini_api_key_set", &!self.gemini_api_key.is_empty())
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("unsplash_access_key_set", &!self.unsplash_access_key.is_empty())
            .field("save_dir", &self.save_dir)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("retry_base_delay", &self.retry_base_delay)
            .finish()
    }
}

impl AppConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when `PORT` or `RETRY_BASE_DELAY_MS` is
    /// not a valid number.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`; unset and blank values fall
    /// back to defaults.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        let retry_base_delay = match get("RETRY_BASE_DELAY_MS") {
            Some(raw) => Duration::from_millis(raw.parse().map_err(|e| {
                AppError::Config(format!("RETRY_BASE_DELAY_MS must be a whole number: {e}"))
            })?),
            None => Duration::from_secs(1),
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            gemini_base_url: get("GEMINI_BASE_URL"),
            unsplash_access_key: get("UNSPLASH_ACCESS_KEY").unwrap_or_default(),
            save_dir: get("XIUXIAN_SAVE_DIR").map_or_else(|| PathBuf::from("saves"), PathBuf::from),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
            retry_base_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.gemini_api_key, "");
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.gemini_base_url, None);
        assert_eq!(config.save_dir, PathBuf::from("saves"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.retry_base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_values_are_read_and_trimmed() {
        let config = config_from(&[
            ("GEMINI_API_KEY", " key "),
            ("GEMINI_MODEL", "gemini-2.5-pro"),
            ("UNSPLASH_ACCESS_KEY", "access"),
            ("XIUXIAN_SAVE_DIR", "/var/lib/xiuxian"),
            ("PORT", "8080"),
            ("RETRY_BASE_DELAY_MS", "250"),
        ])
        .unwrap();

        assert_eq!(config.gemini_api_key, "key");
        assert_eq!(config.gemini_model, "gemini-2.5-pro");
        assert_eq!(config.unsplash_access_key, "access");
        assert_eq!(config.save_dir, PathBuf::from("/var/lib/xiuxian"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.retry_base_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_port_is_a_config_error() {
        let result = config_from(&[("PORT", "eighty")]);

        assert!(matches!(result, Err(AppError::Config(message)) if message.starts_with("PORT")));
    }

    #[test]
    fn test_debug_output_hides_keys() {
        let config = config_from(&[("GEMINI_API_KEY", "secret-value")]).unwrap();

        let printed = format!("{config:?}");

        assert!(!printed.contains("secret-value"));
        assert!(printed.contains("gemini_api_key_set: true"));
    }
}
