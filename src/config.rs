use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::{ContextError, Result};

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub signature: SignatureConfig,
    pub identities: Vec<Identity>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    pub timeout_ms: u64,
}

/// A known agent: its webId, and where its keys live.
///
/// Key entries hold either a URL (or file path) of a JWK document, or the
/// JWK itself inline.
#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub name: String,
    pub web_id: String,
    pub private_key: Option<SecretString>,
    pub public_key: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self { timeout_ms: 2000 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SignatureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Read a TOML configuration file, or use the defaults when no path is
    /// given.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContextError::Config(format!("{}: {e}", path.display())))?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| ContextError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (index, identity) in self.identities.iter().enumerate() {
            if identity.web_id.is_empty() {
                return Err(ContextError::Config(format!(
                    "identity #{index} has no web_id"
                )));
            }
        }
        if self.signature.timeout_ms == 0 {
            return Err(ContextError::Config(
                "signature.timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Look an identity up by name or webId.
    pub fn identity(&self, name_or_web_id: &str) -> Option<&Identity> {
        self.identities
            .iter()
            .find(|i| i.name == name_or_web_id || i.web_id == name_or_web_id)
    }
}
