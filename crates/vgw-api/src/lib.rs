//! Axum HTTP API server for the vision gateway.
//!
//! This crate provides:
//! - Object-detection start/cancel/status endpoints gated on the stored job status
//! - Configuration document CRUD with per-document unique field keys
//! - Hypermedia links on every successful response
//! - Security headers, request ids and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod services;
pub mod settings;
pub mod state;
pub mod store;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use response::{Envelope, LinkBuilder, Links};
pub use routes::create_router;
pub use server::serve;
pub use services::{DetectionGate, DetectionWorker, GateError};
pub use settings::GatewaySettings;
pub use state::AppState;
pub use store::{MemoryConnector, MemoryStore, StoreError, StoreHandle};
