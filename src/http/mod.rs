//! HTTP facade
//!
//! One POST endpoint feeding the rendering pipeline and one liveness
//! endpoint backed by the resolver. Everything else in the crate is reached
//! through the state wired in here.

pub mod handlers;
pub mod server;

pub use handlers::{parse_options, AppState};
pub use server::{router, run, PATH_HEALTHZ, PATH_PDF};

#[cfg(test)]
mod tests;
