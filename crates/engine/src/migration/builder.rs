//! Index builders and the type → builder registry
//!
//! A migration never names a concrete index type. It asks the registry for a
//! builder matching the target [`IndexType`], feeds it rows, and boxes the
//! result as a [`VectorIndex`].

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use stratavec_core::{IndexType, VectorError, VectorId, VectorResult};

use crate::config::IndexConfig;
use crate::index::{BinaryFlatIndex, FlatIndex, HnswIndex, IvfFlatIndex, VectorIndex};

/// Incrementally builds one index
pub trait IndexBuilder: Send {
    /// Whether [`train`](IndexBuilder::train) must see the data before inserts
    fn needs_training(&self) -> bool {
        false
    }

    /// Fit the index to the full row-major buffer
    fn train(&mut self, _data: &[f32]) -> VectorResult<()> {
        Ok(())
    }

    /// Add one vector
    fn insert(&mut self, id: VectorId, embedding: &[f32]) -> VectorResult<()>;

    /// Seal the builder into a searchable index
    fn finish(self: Box<Self>) -> VectorResult<Box<dyn VectorIndex>>;
}

impl IndexBuilder for FlatIndex {
    fn insert(&mut self, id: VectorId, embedding: &[f32]) -> VectorResult<()> {
        FlatIndex::insert(self, id, embedding)
    }

    fn finish(self: Box<Self>) -> VectorResult<Box<dyn VectorIndex>> {
        Ok(self)
    }
}

impl IndexBuilder for HnswIndex {
    fn insert(&mut self, id: VectorId, embedding: &[f32]) -> VectorResult<()> {
        HnswIndex::insert(self, id, embedding)
    }

    fn finish(self: Box<Self>) -> VectorResult<Box<dyn VectorIndex>> {
        Ok(self)
    }
}

impl IndexBuilder for IvfFlatIndex {
    fn needs_training(&self) -> bool {
        !self.is_trained()
    }

    fn train(&mut self, data: &[f32]) -> VectorResult<()> {
        IvfFlatIndex::train(self, data)
    }

    fn insert(&mut self, id: VectorId, embedding: &[f32]) -> VectorResult<()> {
        IvfFlatIndex::insert(self, id, embedding)
    }

    fn finish(self: Box<Self>) -> VectorResult<Box<dyn VectorIndex>> {
        Ok(self)
    }
}

impl IndexBuilder for BinaryFlatIndex {
    fn insert(&mut self, id: VectorId, embedding: &[f32]) -> VectorResult<()> {
        BinaryFlatIndex::insert(self, id, embedding)
    }

    fn finish(self: Box<Self>) -> VectorResult<Box<dyn VectorIndex>> {
        Ok(self)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Creates a builder for `(dimension, config)`
pub type BuilderFactory =
    Arc<dyn Fn(usize, &IndexConfig) -> Box<dyn IndexBuilder> + Send + Sync>;

/// Maps each [`IndexType`] to the factory that builds it
///
/// Cloning is cheap; factories are shared.
#[derive(Clone)]
pub struct BuilderRegistry {
    factories: FxHashMap<IndexType, BuilderFactory>,
}

impl BuilderRegistry {
    /// Registry with no builders at all
    pub fn empty() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// Register (or replace) the factory for `index_type`
    pub fn register<F>(&mut self, index_type: IndexType, factory: F)
    where
        F: Fn(usize, &IndexConfig) -> Box<dyn IndexBuilder> + Send + Sync + 'static,
    {
        self.factories.insert(index_type, Arc::new(factory));
    }

    /// Drop the factory for `index_type`
    pub fn unregister(&mut self, index_type: IndexType) -> bool {
        self.factories.remove(&index_type).is_some()
    }

    /// Check if `index_type` has a factory
    pub fn contains(&self, index_type: IndexType) -> bool {
        self.factories.contains_key(&index_type)
    }

    /// Registered types in code order
    pub fn types(&self) -> Vec<IndexType> {
        let mut types: Vec<IndexType> = self.factories.keys().copied().collect();
        types.sort();
        types
    }

    /// Instantiate a builder for `index_type`
    ///
    /// # Errors
    ///
    /// `BuildFailed` if nothing is registered for `index_type`.
    pub fn create(
        &self,
        index_type: IndexType,
        dimension: usize,
        config: &IndexConfig,
    ) -> VectorResult<Box<dyn IndexBuilder>> {
        let factory = self.factories.get(&index_type).ok_or_else(|| {
            VectorError::build_failed(format!(
                "no builder registered for index type {}",
                index_type.name()
            ))
        })?;
        Ok(factory(dimension, config))
    }
}

impl Default for BuilderRegistry {
    /// One builder per built-in index family
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(IndexType::Flat, |dim, config| {
            Box::new(FlatIndex::new(dim, config.metric))
        });
        registry.register(IndexType::Hnsw, |dim, config| {
            Box::new(HnswIndex::new(dim, config.metric, config.hnsw.clone()))
        });
        registry.register(IndexType::IvfFlat, |dim, config| {
            Box::new(IvfFlatIndex::new(dim, config.metric, config.ivf.clone()))
        });
        registry.register(IndexType::BinaryFlat, |dim, config| {
            Box::new(BinaryFlatIndex::new(dim, config.metric, config.binary.clone()))
        });
        registry
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("types", &self.types())
            .finish()
    }
}
