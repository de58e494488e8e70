//! ethereal-server: the HTTP service behind the ethereal secrets client
//!
//! - `session`: per-session secrets and the signed cookie that carries the session
//! - `remote`: split-key remote secrets with TTL bounds and an optional second factor
//! - `api`: axum router exposing both
//! - `metrics`: Prometheus counters plus health endpoints
//! - `daemon`: process lifecycle used by `etherealsd`

pub mod api;
pub mod daemon;
pub mod error;
pub mod metrics;
pub mod remote;
pub mod session;
pub mod state;

pub use api::router;
pub use remote::{RemoteSecretService, RetrievedSecret, StoredSecret};
pub use session::{SessionContext, SessionCookie, SessionSecretIssuer};
pub use state::AppState;
