//! Provider adapters for the keybridge OAuth broker.
//!
//! One adapter per supported provider (Google, Facebook, LinkedIn,
//! Microsoft), all behind the [`ProviderAdapter`] trait: authorization-URL
//! construction, authorization-code exchange (PKCE-aware), userinfo
//! fetching mapped into the canonical [`keybridge_core::UserInfo`] shape,
//! and refresh-token exchange where the provider supports it.
//!
//! Adapters talk to the network only through the [`HttpTransport`] trait,
//! so tests can point them at a mock server.

mod adapter;
mod config;
mod error;
mod facebook;
mod google;
mod linkedin;
mod microsoft;
mod pkce;
mod transport;
mod wire;

#[cfg(test)]
mod tests;

pub use adapter::{Endpoints, ProviderAdapter, ProviderRegistry};
pub use config::{
    FacebookSettings, GoogleSettings, LinkedinSettings, MicrosoftSettings, OAuthConfig,
    ProviderCredentials,
};
pub use error::{ProviderError, ProviderResult};
pub use facebook::FacebookAdapter;
pub use google::GoogleAdapter;
pub use linkedin::LinkedinAdapter;
pub use microsoft::MicrosoftAdapter;
pub use pkce::{Pkce, generate_state};
pub use transport::{HttpTransport, ReqwestTransport, TransportResponse};
