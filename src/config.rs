//! # Configuration
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file in the working directory (or a parent). Variables already set
//! in the environment win over the file.
//!
//! | Variable | Fallback | Default |
//! |---|---|---|
//! | `PLAUSIBLE_BASE_URL` | `BASE_URL` | required |
//! | `PLAUSIBLE_API_KEY` | `API_KEY` | required |
//! | `OUTPUT_DIR` | | `./output` |
//! | `PLAUSIBLE_TIMEOUT_SECS` | | `30` |
//! | `PLAUSIBLE_MAX_RETRIES` | | `3` |

use crate::api::client::{ClientOptions, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, RetryPolicy};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Invalid or missing configuration. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing { var: &'static str },
    Invalid { var: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing { var } => {
                write!(f, "{} environment variable is required", var)
            }
            ConfigError::Invalid { var, reason } => write!(f, "{} is invalid: {}", var, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime configuration for the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Plausible instance root, without a trailing slash.
    pub base_url: String,
    pub api_key: String,
    pub output_dir: PathBuf,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Config {
    /// Load `.env` if present, then read the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("PLAUSIBLE_BASE_URL")
            .or_else(|| non_empty("BASE_URL"))
            .ok_or(ConfigError::Missing {
                var: "PLAUSIBLE_BASE_URL",
            })?;
        let base_url = validate_base_url(base_url.trim())?;

        let api_key = non_empty("PLAUSIBLE_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .ok_or(ConfigError::Missing {
                var: "PLAUSIBLE_API_KEY",
            })?
            .trim()
            .to_string();

        let output_dir = non_empty("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let timeout = match non_empty("PLAUSIBLE_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "PLAUSIBLE_TIMEOUT_SECS",
                        reason: format!("expected a positive number of seconds, got '{}'", raw),
                    });
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        let max_retries = match non_empty("PLAUSIBLE_MAX_RETRIES") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| ConfigError::Invalid {
                var: "PLAUSIBLE_MAX_RETRIES",
                reason: format!("expected a non-negative integer, got '{}'", raw),
            })?,
            None => DEFAULT_MAX_RETRIES,
        };

        Ok(Self {
            base_url,
            api_key,
            output_dir,
            timeout,
            max_retries,
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.timeout,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                ..RetryPolicy::default()
            },
        }
    }

    /// The API key with all but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", tail)
    }
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "PLAUSIBLE_BASE_URL",
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(format!("'{}' is not a URL ({})", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "scheme must be http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid(format!("'{}' has no host", raw)));
    }

    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(&[("BASE_URL", "https://x.test"), ("API_KEY", "abc")]).unwrap();
        assert_eq!(config.base_url, "https://x.test");
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_prefixed_variables_take_precedence() {
        let config = load(&[
            ("BASE_URL", "https://fallback.test"),
            ("PLAUSIBLE_BASE_URL", "https://plausible.example.com/"),
            ("API_KEY", "fallback"),
            ("PLAUSIBLE_API_KEY", "primary"),
        ])
        .unwrap();
        assert_eq!(config.base_url, "https://plausible.example.com");
        assert_eq!(config.api_key, "primary");
    }

    #[test]
    fn test_missing_values_are_reported() {
        assert_eq!(
            load(&[("API_KEY", "abc")]).unwrap_err(),
            ConfigError::Missing {
                var: "PLAUSIBLE_BASE_URL"
            }
        );
        assert_eq!(
            load(&[("BASE_URL", "https://x.test"), ("API_KEY", "   ")]).unwrap_err(),
            ConfigError::Missing {
                var: "PLAUSIBLE_API_KEY"
            }
        );
    }

    #[test]
    fn test_base_url_must_be_http() {
        for bad in ["ftp://x.test", "x.test", "not a url", "file:///tmp"] {
            let err = load(&[("BASE_URL", bad), ("API_KEY", "abc")]).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { var: "PLAUSIBLE_BASE_URL", .. }),
                "{} should be rejected, got {:?}",
                bad,
                err
            );
        }
        assert!(load(&[("BASE_URL", "http://localhost:8000"), ("API_KEY", "abc")]).is_ok());
    }

    #[test]
    fn test_numeric_overrides() {
        let config = load(&[
            ("BASE_URL", "https://x.test"),
            ("API_KEY", "abc"),
            ("OUTPUT_DIR", "/tmp/stats"),
            ("PLAUSIBLE_TIMEOUT_SECS", "5"),
            ("PLAUSIBLE_MAX_RETRIES", "0"),
        ])
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/stats"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.client_options().retry.max_retries, 0);

        for (var, value) in [
            ("PLAUSIBLE_TIMEOUT_SECS", "0"),
            ("PLAUSIBLE_TIMEOUT_SECS", "soon"),
            ("PLAUSIBLE_MAX_RETRIES", "-1"),
        ] {
            let err = load(&[("BASE_URL", "https://x.test"), ("API_KEY", "abc"), (var, value)])
                .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }));
        }
    }

    #[test]
    fn test_masked_api_key() {
        let config = load(&[("BASE_URL", "https://x.test"), ("API_KEY", "sk_live_12345678")]).unwrap();
        assert_eq!(config.masked_api_key(), "****5678");
        let short = load(&[("BASE_URL", "https://x.test"), ("API_KEY", "abc")]).unwrap();
        assert_eq!(short.masked_api_key(), "****");
    }
}
