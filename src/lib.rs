//! stratavec - query planning, tag filtering and index migration for vector search
//!
//! # Quick Start
//!
//! ```ignore
//! use stratavec::{CollectionStats, IndexType, Migration, QueryOptimizer};
//!
//! // Plan a query against the current collection shape
//! let optimizer = QueryOptimizer::new();
//! optimizer.update_stats(CollectionStats::new(250_000, 384, IndexType::Hnsw));
//! let plan = optimizer.plan(10, None);
//!
//! // Rebuild the collection as IVF-Flat in the background
//! let migration = Migration::start(Some(data), count, 384, IndexType::IvfFlat, config)?;
//! migration.wait()?;
//! let index = migration.take_index();
//! ```
//!
//! # Architecture
//!
//! Shared types and errors live in `stratavec-core`; the algorithms live in
//! `stratavec-engine`. Both are re-exported here.

pub use stratavec_core::*;
pub use stratavec_engine::*;
