//! Core types and collaborator traits for the keybridge OAuth broker.
//!
//! This crate defines the shared vocabulary used by the provider adapters,
//! the authorization-flow orchestrator, and the HTTP surface: the closed set
//! of supported providers, the canonical user-info record, persisted models
//! (users and provider connections), and the async store traits that back
//! them. Concrete store implementations live with their consumers.

mod models;
mod provider;
mod session;
mod store;
mod types;

pub use models::{ConnectionSummary, NewConnection, NewUser, OAuthConnection, User};
pub use provider::{ParseProviderError, Provider};
pub use session::{FlowStateStore, PendingFlowState};
pub use store::{ConnectionStore, StoreError, StoreResult, UserStore};
pub use types::{TokenSet, UserInfo};
