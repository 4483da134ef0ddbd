//! Sign-in through GitHub and JWT-backed sessions.

pub mod github;
pub mod jwt;
pub mod routes;
pub mod session;

pub use session::AuthSession;
