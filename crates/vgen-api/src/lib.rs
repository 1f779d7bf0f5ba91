//! Axum HTTP API for the vgen backend.
//!
//! Exposes single generations, batch narration, the scene motion pipeline
//! and final renders over JSON, plus health and Prometheus metrics.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, MAX_BATCH_ITEMS};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
