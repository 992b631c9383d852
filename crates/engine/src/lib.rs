//! Vector search core for stratavec
//!
//! This crate holds the pieces a vector collection composes around:
//! - Quantization: sign-bit codes and Hamming distance (`quant`)
//! - Metadata: inverted `(key, value) → ids` index for filtering (`metadata`)
//! - Optimizer: cost-based query planning with latency/recall feedback (`optimizer`)
//! - Migration: off-thread index rebuilds with progress and cancel (`migration`)
//! - Indices: flat, HNSW, IVF-Flat and binary-flat (`index`)
//!
//! The collection itself (storage, persistence, transport) lives elsewhere;
//! it feeds stats into the optimizer, consults the metadata index when a plan
//! asks for it, and swaps in indices produced by migrations.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod index;
pub mod metadata;
pub mod migration;
pub mod optimizer;
pub mod quant;

pub use config::{
    BinaryConfig, HnswConfig, IndexConfig, IvfConfig, MigrationConfig, OptimizerConfig,
    StratavecConfig, CONFIG_FILE_NAME,
};
pub use index::{
    BinaryFlatIndex, FlatIndex, HnswIndex, IvfFlatIndex, SearchParams, VectorHeap, VectorIndex,
};
pub use metadata::{Metadata, MetadataIndex};
pub use migration::{BuilderRegistry, IndexBuilder, Migration, MigrationInfo, MigrationOptions};
pub use optimizer::{CollectionStats, FeedbackStats, PlanStrategy, QueryOptimizer, QueryPlan};
pub use quant::{hamming_distance, hamming_distance_fast, BinaryVector};
