//! Shared identifier and enum types
//!
//! These are the values that cross crate boundaries: vector identifiers,
//! distance metrics, index families and migration status codes. Each enum
//! carries a stable numeric code for callers that store or transmit it.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// VectorId
// ============================================================================

/// Internal identifier for a stored vector
///
/// Ids are assigned by the outer collection. Within an index they are unique;
/// a migration assigns ids `0..count` in buffer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VectorId(pub u64);

impl VectorId {
    /// Create a new VectorId
    pub fn new(id: u64) -> Self {
        VectorId(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VectorId({})", self.0)
    }
}

impl From<u64> for VectorId {
    fn from(id: u64) -> Self {
        VectorId(id)
    }
}

// ============================================================================
// DistanceMetric
// ============================================================================

/// Distance metric for similarity calculation
///
/// All metrics are normalized to "higher = more similar".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity: dot(a,b) / (||a|| * ||b||)
    /// Range: [-1, 1]
    #[default]
    Cosine,

    /// Euclidean similarity: 1 / (1 + l2_distance)
    /// Range: (0, 1]
    Euclidean,

    /// Raw dot product, unbounded
    DotProduct,
}

impl DistanceMetric {
    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dot_product",
        }
    }

    /// Parse from a name, accepting common aliases
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(DistanceMetric::Cosine),
            "euclidean" | "l2" => Some(DistanceMetric::Euclidean),
            "dot_product" | "dot" | "inner_product" => Some(DistanceMetric::DotProduct),
            _ => None,
        }
    }
}

// ============================================================================
// IndexType
// ============================================================================

/// Index family a migration can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    /// Exact brute-force scan
    Flat,
    /// Hierarchical navigable small world graph
    Hnsw,
    /// Inverted file over k-means partitions
    IvfFlat,
    /// Binary-quantized codes with exact rerank
    BinaryFlat,
}

impl IndexType {
    /// All index types, in code order
    pub const ALL: [IndexType; 4] = [
        IndexType::Flat,
        IndexType::Hnsw,
        IndexType::IvfFlat,
        IndexType::BinaryFlat,
    ];

    /// Stable numeric code
    pub fn as_code(&self) -> u8 {
        match self {
            IndexType::Flat => 0,
            IndexType::Hnsw => 1,
            IndexType::IvfFlat => 2,
            IndexType::BinaryFlat => 3,
        }
    }

    /// Look up an index type by its numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(IndexType::Flat),
            1 => Some(IndexType::Hnsw),
            2 => Some(IndexType::IvfFlat),
            3 => Some(IndexType::BinaryFlat),
            _ => None,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            IndexType::Flat => "flat",
            IndexType::Hnsw => "hnsw",
            IndexType::IvfFlat => "ivf_flat",
            IndexType::BinaryFlat => "binary_flat",
        }
    }

    /// Whether searches against this index are exact
    pub fn is_exact(&self) -> bool {
        matches!(self, IndexType::Flat)
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// MigrationStatus
// ============================================================================

/// Lifecycle status of an index migration
///
/// `Pending -> Running -> {Completed | Failed | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MigrationStatus {
    /// Created, worker not yet running
    #[default]
    Pending,
    /// Worker is inserting vectors
    Running,
    /// Index built and ready to take
    Completed,
    /// A builder error stopped the migration
    Failed,
    /// Cancelled before completion
    Cancelled,
}

impl MigrationStatus {
    /// Stable numeric code
    pub fn as_code(&self) -> u8 {
        match self {
            MigrationStatus::Pending => 0,
            MigrationStatus::Running => 1,
            MigrationStatus::Completed => 2,
            MigrationStatus::Failed => 3,
            MigrationStatus::Cancelled => 4,
        }
    }

    /// Look up a status by its numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MigrationStatus::Pending),
            1 => Some(MigrationStatus::Running),
            2 => Some(MigrationStatus::Completed),
            3 => Some(MigrationStatus::Failed),
            4 => Some(MigrationStatus::Cancelled),
            _ => None,
        }
    }

    /// True once no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MigrationStatus::Completed | MigrationStatus::Failed | MigrationStatus::Cancelled
        )
    }

    /// Upper-case name
    pub fn name(&self) -> &'static str {
        match self {
            MigrationStatus::Pending => "PENDING",
            MigrationStatus::Running => "RUNNING",
            MigrationStatus::Completed => "COMPLETED",
            MigrationStatus::Failed => "FAILED",
            MigrationStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
