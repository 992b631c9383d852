//! Engine configuration via `stratavec.toml`
//!
//! Every field has a default, so an empty file (or no file) gives a working
//! configuration. Sections:
//!
//! - `[optimizer]`: query planner thresholds, caps and EMA smoothing
//! - `[migration]`: worker batch size
//! - `[index]`: metric plus per-family build parameters

use serde::{Deserialize, Serialize};
use std::path::Path;
use stratavec_core::{DistanceMetric, VectorError, VectorResult};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "stratavec.toml";

// ============================================================================
// [optimizer]
// ============================================================================

/// Query planner tunables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizerConfig {
    /// Collections at or below this size are scanned exactly (default: 1000)
    #[serde(default = "default_exact_scan_threshold")]
    pub exact_scan_threshold: u64,
    /// Filters matching less than this fraction oversample and post-filter (default: 0.01)
    #[serde(default = "default_selective_filter_threshold")]
    pub selective_filter_threshold: f64,
    /// Weight of the newest sample in the latency/recall EMAs (default: 0.1)
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,
    /// Upper bound on the search breadth a plan may request (default: 500)
    #[serde(default = "default_ef_search_cap")]
    pub ef_search_cap: usize,
    /// Upper bound on the partition probe count a plan may request (default: 128)
    #[serde(default = "default_nprobe_cap")]
    pub nprobe_cap: usize,
}

fn default_exact_scan_threshold() -> u64 {
    1000
}
fn default_selective_filter_threshold() -> f64 {
    0.01
}
fn default_ema_alpha() -> f64 {
    0.1
}
fn default_ef_search_cap() -> usize {
    500
}
fn default_nprobe_cap() -> usize {
    128
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            exact_scan_threshold: default_exact_scan_threshold(),
            selective_filter_threshold: default_selective_filter_threshold(),
            ema_alpha: default_ema_alpha(),
            ef_search_cap: default_ef_search_cap(),
            nprobe_cap: default_nprobe_cap(),
        }
    }
}

// ============================================================================
// [migration]
// ============================================================================

/// Migration worker settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationConfig {
    /// Vectors inserted between progress publications (default: 100)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    100
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

// ============================================================================
// [index]
// ============================================================================

/// HNSW build parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HnswConfig {
    /// Max connections per node above layer 0; layer 0 allows 2*M (default: 16)
    #[serde(default = "default_hnsw_m")]
    pub m: usize,
    /// Build-time beam width (default: 200)
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    /// Search-time beam width when the caller does not supply one (default: 50)
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
}

fn default_hnsw_m() -> usize {
    16
}
fn default_ef_construction() -> usize {
    200
}
fn default_ef_search() -> usize {
    50
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: default_hnsw_m(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
        }
    }
}

impl HnswConfig {
    /// Level multiplier: 1/ln(M)
    pub fn ml(&self) -> f64 {
        1.0 / (self.m.max(2) as f64).ln()
    }

    /// Max connections for layer 0 (2*M)
    pub fn max_connections_layer0(&self) -> usize {
        self.m * 2
    }
}

/// IVF-Flat build parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IvfConfig {
    /// Partition count; 0 picks `sqrt(n)` at train time (default: 0)
    #[serde(default)]
    pub nlist: usize,
    /// Partitions probed when the caller does not supply a count (default: 8)
    #[serde(default = "default_ivf_nprobe")]
    pub nprobe: usize,
    /// k-means iteration limit (default: 25)
    #[serde(default = "default_kmeans_iterations")]
    pub kmeans_iterations: usize,
    /// Seed for centroid initialization (default: 42)
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_ivf_nprobe() -> usize {
    8
}
fn default_kmeans_iterations() -> usize {
    25
}
fn default_seed() -> u64 {
    42
}

impl Default for IvfConfig {
    fn default() -> Self {
        Self {
            nlist: 0,
            nprobe: default_ivf_nprobe(),
            kmeans_iterations: default_kmeans_iterations(),
            seed: default_seed(),
        }
    }
}

/// Binary-flat build parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BinaryConfig {
    /// Hamming candidates kept per requested result before exact rerank (default: 4)
    #[serde(default = "default_rerank_factor")]
    pub rerank_factor: usize,
}

fn default_rerank_factor() -> usize {
    4
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            rerank_factor: default_rerank_factor(),
        }
    }
}

/// Parameters for building an index
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    /// Similarity metric (default: cosine)
    #[serde(default)]
    pub metric: DistanceMetric,
    /// HNSW parameters
    #[serde(default)]
    pub hnsw: HnswConfig,
    /// IVF-Flat parameters
    #[serde(default)]
    pub ivf: IvfConfig,
    /// Binary-flat parameters
    #[serde(default)]
    pub binary: BinaryConfig,
}

impl IndexConfig {
    /// Default parameters with the given metric
    pub fn with_metric(metric: DistanceMetric) -> Self {
        Self {
            metric,
            ..Self::default()
        }
    }
}

// ============================================================================
// StratavecConfig
// ============================================================================

/// Engine configuration loaded from `stratavec.toml`
///
/// # Example
///
/// ```toml
/// [optimizer]
/// exact_scan_threshold = 1000
///
/// [index]
/// metric = "euclidean"
///
/// [index.hnsw]
/// m = 32
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StratavecConfig {
    /// Query planner settings
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Migration worker settings
    #[serde(default)]
    pub migration: MigrationConfig,
    /// Index build settings
    #[serde(default)]
    pub index: IndexConfig,
}

impl StratavecConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# stratavec configuration

[optimizer]
# Collections at or below this many vectors are scanned exactly.
exact_scan_threshold = 1000
# Filters matching fewer than this fraction of vectors switch to
# oversample + post-filter.
selective_filter_threshold = 0.01
# Weight of the newest latency/recall sample in the running averages.
ema_alpha = 0.1
ef_search_cap = 500
nprobe_cap = 128

[migration]
# Vectors inserted between progress updates.
batch_size = 100

[index]
# "cosine", "euclidean" or "dot_product"
metric = "cosine"

[index.hnsw]
m = 16
ef_construction = 200
ef_search = 50

[index.ivf]
# 0 = sqrt(number of vectors)
nlist = 0
nprobe = 8
kmeans_iterations = 25
seed = 42

[index.binary]
rerank_factor = 4
"#
    }

    /// Parse and validate a TOML string.
    ///
    /// # Errors
    ///
    /// `Config` if the text does not parse or fails [`validate`](Self::validate).
    pub fn from_toml_str(content: &str) -> VectorResult<Self> {
        let config: StratavecConfig = toml::from_str(content)
            .map_err(|e| VectorError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> VectorResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VectorError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: StratavecConfig = toml::from_str(&content).map_err(|e| {
            VectorError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> VectorResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                VectorError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> VectorResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VectorError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            VectorError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> VectorResult<()> {
        let opt = &self.optimizer;
        if !(opt.ema_alpha > 0.0 && opt.ema_alpha <= 1.0) {
            return Err(VectorError::config(format!(
                "optimizer.ema_alpha must be in (0, 1], got {}",
                opt.ema_alpha
            )));
        }
        if !(0.0..=1.0).contains(&opt.selective_filter_threshold) {
            return Err(VectorError::config(format!(
                "optimizer.selective_filter_threshold must be in [0, 1], got {}",
                opt.selective_filter_threshold
            )));
        }
        if opt.ef_search_cap == 0 || opt.nprobe_cap == 0 {
            return Err(VectorError::config(
                "optimizer.ef_search_cap and optimizer.nprobe_cap must be > 0",
            ));
        }
        if self.migration.batch_size == 0 {
            return Err(VectorError::config("migration.batch_size must be > 0"));
        }

        let idx = &self.index;
        if idx.hnsw.m < 2 {
            return Err(VectorError::config(format!(
                "index.hnsw.m must be >= 2, got {}",
                idx.hnsw.m
            )));
        }
        if idx.hnsw.ef_construction == 0 || idx.hnsw.ef_search == 0 {
            return Err(VectorError::config(
                "index.hnsw.ef_construction and index.hnsw.ef_search must be > 0",
            ));
        }
        if idx.ivf.nprobe == 0 || idx.ivf.kmeans_iterations == 0 {
            return Err(VectorError::config(
                "index.ivf.nprobe and index.ivf.kmeans_iterations must be > 0",
            ));
        }
        if idx.binary.rerank_factor == 0 {
            return Err(VectorError::config("index.binary.rerank_factor must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let config = StratavecConfig::default();
        config.validate().unwrap();
        assert_eq!(config.optimizer.exact_scan_threshold, 1000);
        assert_eq!(config.migration.batch_size, 100);
        assert_eq!(config.index.hnsw.m, 16);
        assert_eq!(config.index.metric, DistanceMetric::Cosine);
    }

    #[test]
    fn default_toml_matches_default() {
        let parsed = StratavecConfig::from_toml_str(StratavecConfig::default_toml()).unwrap();
        assert_eq!(parsed, StratavecConfig::default());
    }

    #[test]
    fn empty_string_uses_defaults() {
        let parsed = StratavecConfig::from_toml_str("").unwrap();
        assert_eq!(parsed, StratavecConfig::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let parsed = StratavecConfig::from_toml_str(
            r#"
[index]
metric = "euclidean"

[index.hnsw]
m = 32
"#,
        )
        .unwrap();
        assert_eq!(parsed.index.metric, DistanceMetric::Euclidean);
        assert_eq!(parsed.index.hnsw.m, 32);
        assert_eq!(parsed.index.hnsw.ef_construction, 200);
        assert_eq!(parsed.optimizer, OptimizerConfig::default());
    }

    #[test]
    fn invalid_values_rejected() {
        for bad in [
            "[optimizer]\nema_alpha = 0.0",
            "[optimizer]\nema_alpha = 1.5",
            "[optimizer]\nselective_filter_threshold = 2.0",
            "[optimizer]\nef_search_cap = 0",
            "[migration]\nbatch_size = 0",
            "[index.hnsw]\nm = 1",
            "[index.binary]\nrerank_factor = 0",
        ] {
            let err = StratavecConfig::from_toml_str(bad).unwrap_err();
            assert!(matches!(err, VectorError::Config { .. }), "{}", bad);
        }
    }

    #[test]
    fn unknown_metric_is_config_error() {
        let err = StratavecConfig::from_toml_str("[index]\nmetric = \"manhattan\"").unwrap_err();
        assert!(matches!(err, VectorError::Config { .. }));
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        StratavecConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());

        let config = StratavecConfig::from_file(&path).unwrap();
        assert_eq!(config, StratavecConfig::default());
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(&path, "[migration]\nbatch_size = 7\n").unwrap();
        StratavecConfig::write_default_if_missing(&path).unwrap();

        let config = StratavecConfig::from_file(&path).unwrap();
        assert_eq!(config.migration.batch_size, 7);
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = StratavecConfig::default();
        config.optimizer.ema_alpha = 0.25;
        config.index.metric = DistanceMetric::DotProduct;
        config.index.ivf.nlist = 64;
        config.write_to_file(&path).unwrap();

        let loaded = StratavecConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = StratavecConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, VectorError::Config { .. }));
    }

    #[test]
    fn hnsw_level_multiplier() {
        let hnsw = HnswConfig::default();
        assert!((hnsw.ml() - 1.0 / 16f64.ln()).abs() < 1e-12);
        assert_eq!(hnsw.max_connections_layer0(), 32);
    }
}
