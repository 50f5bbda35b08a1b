// crates/accord-reputation/src/lib.rs
//
// accord-reputation: Reputation summaries derived from an agent's own claims.
//
// Nothing here reads another agent's log. A summary carries only counts and
// averages over a period; raw claim fields never leave the aggregator.
// Recent claims can be weighted above old ones through a decay function.

pub mod aggregator;
pub mod decay;
pub mod summary;

pub use aggregator::ReputationAggregator;
pub use decay::{apply_decay, DecayFunction};
pub use summary::{MetricAverages, Period, ReputationSummary};
