//! Flow engine for the keybridge OAuth broker.
//!
//! Drives the redirect → callback state machine ([`Orchestrator`]),
//! reconciles provider identities against local users ([`Reconciler`]),
//! and keeps stored access tokens usable ([`TokenManager`]). All
//! flow-level failures terminate at the orchestrator boundary as an
//! [`Outcome`] with `success = false`; no internal error type leaks to
//! callers.

mod error;
mod memory;
mod orchestrator;
mod outcome;
mod reconcile;
mod state;
mod tokens;


pub use error::{FlowError, FlowResult};
pub use memory::{InMemoryConnectionStore, InMemoryUserStore};
pub use orchestrator::{CallbackQuery, FlowMode, Orchestrator, RedirectTarget};
pub use outcome::{FlowAction, Outcome, UserSummary};
pub use reconcile::{ReconcileResult, Reconciler};
pub use state::InMemoryFlowStateStore;
pub use tokens::TokenManager;
