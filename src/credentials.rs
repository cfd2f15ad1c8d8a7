//! Business-search credentials loaded once at startup.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::StartupConfigError;

/// OAuth 1.0a consumer and token pairs.
#[derive(Clone, Deserialize, PartialEq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("token", &self.token)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read and validate the JSON credential file.
    pub fn load(path: &Path) -> Result<Self, StartupConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| StartupConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let credentials: Credentials =
            serde_json::from_str(&contents).map_err(|e| StartupConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        credentials.validate()?;
        tracing::debug!("Loaded credentials from {}", path.display());
        Ok(credentials)
    }

    fn validate(&self) -> Result<(), StartupConfigError> {
        let fields = [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("token", &self.token),
            ("token_secret", &self.token_secret),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(StartupConfigError::Invalid(format!(
                    "credential '{}' is empty",
                    name
                )));
            }
        }
        Ok(())
    }
}
