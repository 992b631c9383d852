//! Off-thread index migration
//!
//! Rebuilds a collection's vectors into a new index family while the caller
//! keeps serving from the old one.
//!
//! ```text
//! PENDING ─▶ RUNNING ─┬─▶ COMPLETED   take_index() hands the index over once
//!                     ├─▶ FAILED      error_message says why
//!                     └─▶ CANCELLED   cancel() or dropping the handle
//! ```

mod builder;
mod controller;

pub use builder::{BuilderFactory, BuilderRegistry, IndexBuilder};
pub use controller::{Migration, MigrationInfo, MigrationOptions};
