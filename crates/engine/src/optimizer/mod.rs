//! Query optimizer
//!
//! Chooses between exact scan, index search and oversample-then-filter for
//! each query, and sizes the index knobs (`ef_search`, `nprobe`) from the
//! collection stats. Observed latency and recall are folded into running
//! averages for later tuning.

mod plan;
mod planner;
mod stats;

pub use plan::{PlanStrategy, QueryPlan};
pub use planner::QueryOptimizer;
pub use stats::{CollectionStats, FeedbackStats};
