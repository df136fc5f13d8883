//! Services - scoring and receipt state
//!
//! - `points` - Reward points rules
//! - `receipt_store` - Concurrent in-memory receipt store

pub mod points;
pub mod receipt_store;

// Re-export commonly used types
pub use points::PointsBreakdown;
pub use receipt_store::{ReceiptStore, ScoreRecord};
