//! Engine configuration.
//!
//! [`EngineConfig`] deserializes from JSON with every field optional, so a
//! config file only needs to name what it changes:
//!
//! ```json
//! { "fetch": { "adaptive": { "initial_factor": 2, "max_rounds": 6 } },
//!   "parallel": true,
//!   "time_budget_ms": 30000 }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Over-fetch multiplier used by the default fetch policy.
pub const DEFAULT_OVERFETCH_FACTOR: usize = 2;

/// How many box candidates a cone search pulls before exact filtering.
///
/// The bounding box is a superset of the cone, so some candidates are always
/// rejected. With a fixed multiplier a sparse cone inside a dense box can
/// come back short even though more true matches exist further down the
/// candidate stream; `Adaptive` and `Unbounded` trade work for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPolicy {
    /// Fetch `factor × wanted` candidates once.
    Fixed { factor: usize },
    /// Start at `initial_factor` and double until the page is full, the
    /// candidate stream is exhausted, or `max_rounds` fetches were made.
    Adaptive {
        initial_factor: usize,
        max_rounds: u32,
    },
    /// Fetch every candidate in the box.
    Unbounded,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy::Fixed {
            factor: DEFAULT_OVERFETCH_FACTOR,
        }
    }
}

/// Tunables shared by searches and cross-match runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Candidate fetch policy for cone searches.
    pub fetch: FetchPolicy,
    /// Enumerate cross-match neighbours on the rayon pool.
    pub parallel: bool,
    /// Entries per cross-match batch; the time budget is checked between batches.
    pub batch_size: usize,
    /// Wall-clock budget for a cross-match run, in milliseconds.
    pub time_budget_ms: Option<u64>,
    /// Ignore cross-match pairs whose entries share a source tag.
    pub require_distinct_sources: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchPolicy::default(),
            parallel: true,
            batch_size: 4096,
            time_budget_ms: None,
            require_distinct_sources: false,
        }
    }
}

impl EngineConfig {
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }
}
