//! Tag metadata and the inverted tag index
//!
//! [`Metadata`] is the tag list attached to one vector; [`MetadataIndex`]
//! maps each `(key, value)` pair back to the vectors carrying it, for
//! pre-filtering and selectivity estimates.

mod inverted;
mod tags;

pub use inverted::{MetadataIndex, INITIAL_BUCKETS};
pub use tags::Metadata;
