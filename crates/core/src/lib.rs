//! Core types for stratavec
//!
//! This crate defines the foundational types shared by the engine:
//! - VectorId: identifier for a stored vector
//! - DistanceMetric: similarity function, normalized to "higher = more similar"
//! - IndexType: index family a migration can build
//! - MigrationStatus: migration lifecycle codes
//! - VectorError: error type for every fallible operation
//! - Limits: bounded message lengths

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod types;

pub use error::{VectorError, VectorResult};
pub use limits::{bounded_message, truncate_to, MAX_MESSAGE_BYTES};
pub use types::{DistanceMetric, IndexType, MigrationStatus, VectorId};
