//! IO modules - external interfaces
//!
//! - `http` - Receipt API server (hyper)
//! - `prometheus` - Prometheus text formatting for `/metrics`

pub mod http;
pub mod prometheus;

// Re-export commonly used types
pub use http::{serve, start_server, AppState};
