//! HTTP API
//!
//! Thin axum layer over the spin processor: accounts, spins, static game
//! data, VRF verification and metrics.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use handlers::AppState;
pub use server::{build_app, build_state, ApiServer};
