//! Gateway module
//!
//! HTTP surface for profile management and fan-out queries.

pub mod config;
pub mod handlers;
pub mod server;

pub use config::GatewayConfig;
pub use handlers::GatewayState;
pub use server::{build_router, start_server};
