//! HTTP services for lightkeeper.
//!
//! [`api::build_router`] assembles the axum router over an
//! [`api::ApiState`]; the `keeper serve` command binds it.

pub mod api;
pub mod error;

pub use api::{ApiState, GenerationError, InsightGenerator, build_router};
pub use error::ApiError;
