//! Gateway collaborators: session validation and upstream forwarding.

pub mod session_client;
pub mod upstream;

pub use session_client::{mock::MockSessionAuthority, HttpSessionClient, SessionAuthority};
pub use upstream::{Upstream, UpstreamClient};
