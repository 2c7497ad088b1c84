//! Domain model and core services for the Caravan traveler logistics system.
//!
//! Caravan tracks travelers arriving for a single event: operators import
//! and correct traveler records, process them in duplicate-guarded batches
//! for customs printing, group travelers behind a leader, and allocate
//! seats on transport units without oversubscribing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      HTTP layer (caravan-server)        │  ← axum, sessions, JSON
//! ├─────────────────────────────────────────┤
//! │      Services (this crate)              │
//! │  - Pipeline: process-once-per-operator  │  ← policy: thresholds,
//! │  - Allocator: capacity-bounded seats    │    retries, validation
//! │  - Groups: leader + members             │
//! ├─────────────────────────────────────────┤
//! │      Store traits (this crate)          │  ← semantic atomic ops
//! │  PostgreSQL impls in caravan-postgres,  │
//! │  in-memory impls behind `test-utils`    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Each store trait method is a single atomic operation: multi-row updates
//! (process, allocate, register-group) commit together or not at all, and
//! uniqueness invariants are backed by storage constraints rather than
//! read-then-write checks alone.

pub mod allocator;
pub mod error;
pub mod groups;
pub mod import;
pub mod pipeline;
pub mod stores;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod memory;

pub use allocator::Allocator;
pub use error::{Error, Result};
pub use groups::GroupRegistry;
pub use pipeline::Pipeline;
pub use stores::Stores;

#[cfg(feature = "test-utils")]
pub use memory::MemoryStores;
