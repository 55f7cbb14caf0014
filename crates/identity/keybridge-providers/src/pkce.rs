//! PKCE pair and CSRF state generation (RFC 7636, S256 only).

use crate::error::{ProviderError, ProviderResult};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

/// A PKCE verifier/challenge pair.
///
/// The verifier stays in session state until the token exchange; the
/// challenge goes out with the authorization request.
#[derive(Debug, Clone)]
pub struct Pkce {
    /// 32 random bytes, base64url without padding (43 chars; RFC 7636
    /// requires 43-128).
    pub verifier: String,
    /// base64url(SHA-256(verifier)), no padding.
    pub challenge: String,
}

impl Pkce {
    pub const METHOD: &'static str = "S256";

    /// Generate a fresh pair from the OS random source.
    ///
    /// Fails with [`ProviderError::EntropyUnavailable`] if the source
    /// fails; there is no fallback generator.
    pub fn generate() -> ProviderResult<Self> {
        let verifier = random_urlsafe(32)?;
        let challenge = Self::challenge_for(&verifier);
        Ok(Self {
            verifier,
            challenge,
        })
    }

    /// S256 challenge for a given verifier.
    pub fn challenge_for(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

/// Random CSRF state token, independent of the PKCE verifier.
pub fn generate_state() -> ProviderResult<String> {
    random_urlsafe(16)
}

fn random_urlsafe(len: usize) -> ProviderResult<String> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| ProviderError::EntropyUnavailable(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
