use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "nasal-insight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Gemini endpoint and model used by the upload analyzer.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro-exp-03-25";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Upper bound for a request timeout (one hour).
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Environment variable names
pub const ENV_API_KEY: &str = "NASAL_INSIGHT_API_KEY";
pub const ENV_MODEL: &str = "NASAL_INSIGHT_MODEL";
pub const ENV_BASE_URL: &str = "NASAL_INSIGHT_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "NASAL_INSIGHT_TIMEOUT_SECS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "nasal_insight_lib=debug,nasal_insight=debug,warn"
    } else {
        "nasal_insight_lib=info,nasal_insight=info,warn"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set — add it to the environment or a .env file")]
    MissingVar(&'static str),

    #[error("{name} has an invalid value: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Settings for the remote image classifier.
#[derive(Clone)]
pub struct AnalyzerConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for AnalyzerConfig {
    // api_key is a credential; never print it.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AnalyzerConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get(ENV_API_KEY).ok_or(ConfigError::MissingVar(ENV_API_KEY))?;
        let model = get(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = get(ENV_BASE_URL)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs = match get(ENV_TIMEOUT_SECS) {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if (1..=MAX_TIMEOUT_SECS).contains(&secs) => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: ENV_TIMEOUT_SECS,
                        value: raw,
                    })
                }
            },
        };

        Ok(Self {
            api_key,
            model,
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
