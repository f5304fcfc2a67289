//! HTTP API over the recommendation engine and skill store.

mod error;
mod handlers;
mod middleware;
mod router;
mod server;

pub use error::GatewayError;
pub use router::build_router;
pub use server::{AppState, GatewayServer};
