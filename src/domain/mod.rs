//! Domain models - receipt types and request validation
//!
//! - `Receipt` / `Item` - the validated purchase receipt
//! - `ReceiptPayload` - wire shape before validation
//! - `ReceiptId` - opaque identifier issued by the store

pub mod receipt;

pub use receipt::{Item, Receipt, ReceiptError, ReceiptId, ReceiptPayload, ValidationError};
