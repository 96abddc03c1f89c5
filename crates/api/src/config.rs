//! Client runtime configuration.
//!
//! The API base URL is resolved once at process startup and then passed
//! into the client, never re-read from the environment during request
//! handling. The binary loads `.env` via dotenvy before resolution.

use crate::{ApiError, ApiResult};

/// Default backend location for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: String,
}

impl ClientConfig {
    /// Creates a config for the given base URL.
    ///
    /// The URL must parse and use the `http` or `https` scheme; a trailing
    /// slash is stripped so endpoint paths can be appended uniformly.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` for unparseable URLs or other
    /// schemes.
    pub fn new(base_url: impl AsRef<str>) -> ApiResult<Self> {
        let cleaned = base_url.as_ref().trim().trim_end_matches('/');
        let parsed = url::Url::parse(cleaned)
            .map_err(|e| ApiError::InvalidUrl(format!("'{}': {}", cleaned, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }
        Ok(Self {
            base_url: cleaned.to_string(),
        })
    }

    /// Resolves the config from an optional override (CLI flag or the
    /// `LIS_API_URL` environment value); empty or missing falls back to
    /// [`DEFAULT_API_URL`].
    pub fn from_env_value(value: Option<String>) -> ApiResult<Self> {
        let value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Self::new(value.as_deref().unwrap_or(DEFAULT_API_URL))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slash() {
        let cfg = ClientConfig::new("http://lab.example:5000/api/").unwrap();
        assert_eq!(cfg.base_url(), "http://lab.example:5000/api");
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(ClientConfig::new("ftp://lab.example").is_err());
        assert!(ClientConfig::new("not a url").is_err());
    }

    #[test]
    fn falls_back_to_the_default() {
        let cfg = ClientConfig::from_env_value(None).unwrap();
        assert_eq!(cfg.base_url(), DEFAULT_API_URL);
        let cfg = ClientConfig::from_env_value(Some("  ".into())).unwrap();
        assert_eq!(cfg.base_url(), DEFAULT_API_URL);
    }
}
