//! Shared types for the procurement reconciliation ledger
//!
//! Wire and domain types consumed by the engine and by every collaborator
//! that renders, exports or notifies on ledger state.

pub mod procurement;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
