//! HTTP server for the cwquery document-query harness.
//!
//! Exposes the /api surface the form client talks to: query execution,
//! document download, assertion minting, patient registration, and the
//! query-history log. Handlers stay thin; the mediation work lives in
//! `cwquery-client` and `cwquery-auth`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod server;
pub mod state;

pub use config::AppConfig;
pub use server::{ServerBuilder, build_app};
pub use state::AppState;
