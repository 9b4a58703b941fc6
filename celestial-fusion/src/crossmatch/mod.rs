//! Tolerance-radius cross-matching into fusion groups.
//!
//! Every entry runs a cone search of radius `tolerance` over the same
//! candidate index used for ordinary searches; each hit becomes an edge.
//! A [`DisjointSet`] over snapshot positions folds the edges into connected
//! components, and every component with two or more members becomes one
//! fusion group.
//!
//! Grouping is transitive: if A–B and B–C are within tolerance, A, B and C
//! share a group even when A–C is not.
//!
//! The run never touches the catalog. It returns a [`CrossMatchRun`]
//! holding the statistics and a [`GroupAssignments`] batch that the caller
//! commits with [`Catalog::apply_assignments`].
//!
//! # Incremental runs
//!
//! With `reset_existing = false`, existing group ids are kept and seeded
//! into the disjoint set, so entries already sharing a group stay together.
//! A component that contains existing groups takes the smallest of their
//! ids (bridged groups merge into it); a component with no existing id and
//! at least two members gets a fresh id above the current maximum. Grouped
//! entries are never ungrouped by an incremental run.

mod union_find;

pub use union_find::DisjointSet;

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{Catalog, GroupAssignments};
use crate::config::{EngineConfig, FetchPolicy};
use crate::entry::GroupId;
use crate::errors::{FusionError, FusionResult};
use crate::geometry::arcsec_to_deg;
use crate::index::CandidateIndex;
use crate::query::cone::{cone_hits, ConeQuery};
use crate::query::ensure_index_matches;

/// Parameters for a cross-match run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossMatchParams {
    /// Maximum pairwise separation for a match, in arcseconds.
    pub tolerance_arcsec: f64,
    /// Discard every existing group id before grouping.
    pub reset_existing: bool,
}

impl CrossMatchParams {
    pub fn new(tolerance_arcsec: f64, reset_existing: bool) -> Self {
        Self {
            tolerance_arcsec,
            reset_existing,
        }
    }
}

/// Summary of a cross-match run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrossMatchStats {
    pub total_entries: usize,
    /// Group ids minted by this run.
    pub groups_created: usize,
    /// Entries carrying a group id once the run is committed.
    pub entries_in_groups: usize,
    pub isolated_entries: usize,
}

impl fmt::Display for CrossMatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total entries: {}", self.total_entries)?;
        writeln!(f, "Groups created: {}", self.groups_created)?;
        writeln!(f, "Entries in groups: {}", self.entries_in_groups)?;
        write!(f, "Isolated entries: {}", self.isolated_entries)
    }
}

/// Outcome of [`perform_cross_match`]: statistics plus the batch to commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossMatchRun {
    pub stats: CrossMatchStats,
    pub assignments: GroupAssignments,
}

/// Group every entry with its neighbours within the tolerance radius.
///
/// # Errors
/// [`FusionError::InvalidRange`] for a negative or non-finite tolerance,
/// [`FusionError::IndexMismatch`] if `index` was not built from `catalog`,
/// [`FusionError::BudgetExceeded`] if `config.time_budget_ms` elapses before
/// neighbour enumeration finishes.
pub fn perform_cross_match<I: CandidateIndex + ?Sized>(
    catalog: &Catalog,
    index: &I,
    params: &CrossMatchParams,
    config: &EngineConfig,
) -> FusionResult<CrossMatchRun> {
    if !params.tolerance_arcsec.is_finite() || params.tolerance_arcsec < 0.0 {
        return Err(FusionError::invalid_range(
            "cross_match",
            &format!(
                "tolerance {} arcsec must be finite and non-negative",
                params.tolerance_arcsec
            ),
        ));
    }
    ensure_index_matches(catalog, index)?;

    let started = Instant::now();
    info!(
        entries = catalog.len(),
        tolerance_arcsec = params.tolerance_arcsec,
        reset = params.reset_existing,
        "cross-match started"
    );

    let tolerance_deg = arcsec_to_deg(params.tolerance_arcsec);
    let edges = enumerate_edges(catalog, index, tolerance_deg, config, started)?;

    let mut set = DisjointSet::new(catalog.len());
    for &(a, b) in &edges {
        set.union(a, b);
    }
    if !params.reset_existing {
        seed_existing_groups(catalog, &mut set);
    }
    let components = set.components();

    let run = if params.reset_existing {
        assign_fresh(catalog, &components)
    } else {
        assign_incremental(catalog, &components)
    };

    info!(
        edges = edges.len(),
        groups_created = run.stats.groups_created,
        entries_in_groups = run.stats.entries_in_groups,
        isolated = run.stats.isolated_entries,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "cross-match finished"
    );
    Ok(run)
}

/// Matched pairs `(i, j)` with `i < j`, found by a cone search around each entry.
fn enumerate_edges<I: CandidateIndex + ?Sized>(
    catalog: &Catalog,
    index: &I,
    tolerance_deg: f64,
    config: &EngineConfig,
    started: Instant,
) -> FusionResult<Vec<(usize, usize)>> {
    let total = catalog.len();
    let batch_size = config.batch_size.max(1);
    let budget = config.time_budget();

    let neighbours = |i: usize| -> FusionResult<Vec<(usize, usize)>> {
        let entry = catalog.entry_at(i);
        let query = ConeQuery::new(entry.ra_deg, entry.dec_deg, tolerance_deg).excluding(i);
        let hits = cone_hits(catalog, index, &query, FetchPolicy::Unbounded)?.hits;
        Ok(hits
            .into_iter()
            .filter(|hit| hit.position > i)
            .filter(|hit| {
                !config.require_distinct_sources
                    || catalog.entry_at(hit.position).source != entry.source
            })
            .map(|hit| (i, hit.position))
            .collect())
    };

    let mut edges = Vec::new();
    for start in (0..total).step_by(batch_size) {
        if let Some(budget) = budget {
            if started.elapsed() >= budget {
                return Err(FusionError::BudgetExceeded {
                    processed: start,
                    total,
                });
            }
        }
        let end = (start + batch_size).min(total);
        let batch: Vec<Vec<(usize, usize)>> = if config.parallel {
            (start..end)
                .into_par_iter()
                .map(&neighbours)
                .collect::<FusionResult<_>>()?
        } else {
            (start..end)
                .map(&neighbours)
                .collect::<FusionResult<_>>()?
        };
        edges.extend(batch.into_iter().flatten());
        debug!(processed = end, total, edges = edges.len(), "cross-match batch done");
    }
    Ok(edges)
}

/// Union every pair of entries already sharing a group id.
fn seed_existing_groups(catalog: &Catalog, set: &mut DisjointSet) {
    let mut first_member: HashMap<GroupId, usize> = HashMap::new();
    for (pos, entry) in catalog.entries().iter().enumerate() {
        if let Some(group) = entry.group {
            let first = *first_member.entry(group).or_insert(pos);
            set.union(first, pos);
        }
    }
}

fn assign_fresh(catalog: &Catalog, components: &[Vec<usize>]) -> CrossMatchRun {
    let mut assignments = GroupAssignments::new(true);
    let mut stats = CrossMatchStats {
        total_entries: catalog.len(),
        ..Default::default()
    };

    for members in components.iter().filter(|members| members.len() >= 2) {
        stats.groups_created += 1;
        let group = GroupId(stats.groups_created as u64);
        for &pos in members {
            assignments.push(catalog.entry_at(pos).id.clone(), group);
        }
        stats.entries_in_groups += members.len();
    }
    stats.isolated_entries = stats.total_entries - stats.entries_in_groups;

    CrossMatchRun { stats, assignments }
}

fn assign_incremental(catalog: &Catalog, components: &[Vec<usize>]) -> CrossMatchRun {
    let mut next_id = catalog
        .entries()
        .iter()
        .filter_map(|entry| entry.group)
        .map(|group| group.0)
        .max()
        .unwrap_or(0)
        + 1;

    let mut assignments = GroupAssignments::new(false);
    let mut stats = CrossMatchStats {
        total_entries: catalog.len(),
        ..Default::default()
    };

    for members in components {
        let existing = members
            .iter()
            .filter_map(|&pos| catalog.entry_at(pos).group)
            .min();
        let group = match existing {
            Some(group) => group,
            None if members.len() >= 2 => {
                let group = GroupId(next_id);
                next_id += 1;
                stats.groups_created += 1;
                group
            }
            None => continue,
        };

        stats.entries_in_groups += members.len();
        for &pos in members {
            let entry = catalog.entry_at(pos);
            if entry.group != Some(group) {
                assignments.push(entry.id.clone(), group);
            }
        }
    }
    stats.isolated_entries = stats.total_entries - stats.entries_in_groups;

    CrossMatchRun { stats, assignments }
}
