// Library root: client-side session and draft state for the eightpack draft
// tracker. The CLI and the integration tests consume the crate through these
// modules.

pub mod alert;
pub mod auth;
pub mod config;
pub mod context;
pub mod draft;
pub mod error;
pub mod http;
pub mod protocol;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
