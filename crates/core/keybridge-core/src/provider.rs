//! The closed set of supported OAuth providers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A third-party OAuth 2.0 identity provider.
///
/// Serialized as its lowercase name everywhere: routes, storage, and the
/// popup result message all use `"google"`, `"facebook"`, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Facebook,
    Linkedin,
    Microsoft,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Google,
        Provider::Facebook,
        Provider::Linkedin,
        Provider::Microsoft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
            Provider::Linkedin => "linkedin",
            Provider::Microsoft => "microsoft",
        }
    }

    /// Capitalized name for user-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::Facebook => "Facebook",
            Provider::Linkedin => "LinkedIn",
            Provider::Microsoft => "Microsoft",
        }
    }

    /// Facebook round-trips its own state parameter, so the broker-side
    /// CSRF state comparison is skipped for it.
    pub fn manages_own_state(&self) -> bool {
        matches!(self, Provider::Facebook)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unsupported OAuth provider: {0}")]
pub struct ParseProviderError(pub String);

impl FromStr for Provider {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            "linkedin" => Ok(Provider::Linkedin),
            "microsoft" => Ok(Provider::Microsoft),
            other => Err(ParseProviderError(other.to_string())),
        }
    }
}
