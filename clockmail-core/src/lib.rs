//! Clockmail Core - Coordination Data Model
//!
//! Domain types and pure coordination logic. All other crates depend on this.
//! Persistence and the command surface live elsewhere; this crate contains
//! the Lamport clock, the (epoch, round) partial order, the frontier
//! computation, and the entity structs they operate on.

mod clock;
mod config;
mod entities;
mod enums;
mod error;
mod frontier;
mod stamp;

// Re-export the Lamport clock and total order
pub use clock::*;

// Re-export configuration types
pub use config::*;

// Re-export entity structs
pub use entities::*;

// Re-export all enums
pub use enums::*;

// Re-export error types
pub use error::*;

// Re-export frontier computation
pub use frontier::*;

// Re-export structured timestamps
pub use stamp::*;

/// Wall-clock timestamp used on all persisted entities.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
