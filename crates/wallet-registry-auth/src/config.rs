//! Authentication configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Secret that ships in the default config files. Refused outside dev mode.
pub const PLACEHOLDER_SECRET: &str = "change-me-in-production";

/// JWT token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens (should be at least 256 bits)
    pub secret: String,
    /// Access token lifetime
    #[serde(with = "humantime_serde", default = "default_access_token_lifetime")]
    pub access_token_lifetime: Duration,
    /// Token issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Token audience claim
    #[serde(default = "default_audience")]
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(), // Must be set in production
            access_token_lifetime: default_access_token_lifetime(),
            issuer: default_issuer(),
            audience: default_audience(),
        }
    }
}

impl JwtConfig {
    /// Local development settings with a fixed, well-known secret
    pub fn development() -> Self {
        Self {
            secret: "wallet-registry-dev-secret-do-not-use-in-prod".to_string(),
            access_token_lifetime: Duration::from_secs(24 * 60 * 60),
            ..Self::default()
        }
    }

    /// Reject secrets that are empty, placeholder or too short.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("JWT secret is not set".to_string());
        }
        if self.secret == PLACEHOLDER_SECRET {
            return Err("JWT secret is still the placeholder value".to_string());
        }
        if self.secret.len() < 32 {
            return Err("JWT secret must be at least 32 bytes".to_string());
        }
        Ok(())
    }
}

fn default_access_token_lifetime() -> Duration {
    Duration::from_secs(15 * 60) // 15 minutes
}

fn default_issuer() -> String {
    "wallet-registry".to_string()
}

fn default_audience() -> String {
    "wallet-registry-api".to_string()
}
