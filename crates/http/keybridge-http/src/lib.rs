//! HTTP surface for the keybridge OAuth broker.
//!
//! Five endpoints on an axum [`Router`]: start a login
//! (`GET /oauth/{provider}`), receive the provider callback
//! (`GET /oauth/{provider}/callback`), start a link flow
//! (`GET /oauth/link/{provider}`), disconnect a provider
//! (`POST /oauth/disconnect/{provider}`), and list connections
//! (`GET /oauth/connections`). Callbacks deliver their outcome either
//! as a redirect or, for popup flows, as an HTML page that posts a
//! same-origin message to the opener.

mod popup;
mod routes;
mod session;

#[cfg(test)]
mod tests;

pub use popup::popup_page;
pub use routes::{AppState, router};
pub use session::{InMemorySessionAuth, SessionAuth};
