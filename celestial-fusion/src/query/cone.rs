//! Cone search.
//!
//! Given a sky position and radius, [`cone_search`] derives a bounding box
//! with [`bounding_box_for_radius`], pulls candidates from the index
//! according to a [`FetchPolicy`], filters them by exact angular distance
//! and optional magnitude ceiling, and returns results sorted by distance.
//!
//! With the default `Fixed { factor: 2 }` policy only twice as many box
//! candidates as the page needs are turned into results. The box is a
//! superset of the cone, so when true matches are sparse within it the page
//! can come back short. `total` still counts every exact match in the cone.

use serde::Serialize;
use tracing::debug;

use super::{ensure_finite, ensure_index_matches, Page, SearchResult};
use crate::catalog::Catalog;
use crate::config::FetchPolicy;
use crate::entry::CatalogEntry;
use crate::errors::{FusionError, FusionResult};
use crate::geometry::{angular_separation_deg, bounding_box_for_radius, normalize_ra};
use crate::index::CandidateIndex;

/// Parameters for a cone search.
#[derive(Debug, Clone, PartialEq)]
pub struct ConeQuery {
    /// Cone center right ascension, in degrees. Wrapped into `[0, 360)`.
    pub ra_deg: f64,
    /// Cone center declination, in degrees.
    pub dec_deg: f64,
    /// Search radius, in degrees.
    pub radius_deg: f64,
    /// If set, exclude entries fainter than this magnitude.
    pub max_mag: Option<f64>,
    pub page: Page,
    /// Snapshot position never returned (the query's own entry).
    pub(crate) exclude: Option<usize>,
}

impl ConeQuery {
    pub fn new(ra_deg: f64, dec_deg: f64, radius_deg: f64) -> Self {
        Self {
            ra_deg,
            dec_deg,
            radius_deg,
            max_mag: None,
            page: Page::all(),
            exclude: None,
        }
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    pub fn with_max_mag(mut self, max_mag: f64) -> Self {
        self.max_mag = Some(max_mag);
        self
    }

    pub(crate) fn excluding(mut self, position: usize) -> Self {
        self.exclude = Some(position);
        self
    }

    fn validate(&self) -> FusionResult<()> {
        ensure_finite(
            "cone_search",
            &[
                ("ra", self.ra_deg),
                ("dec", self.dec_deg),
                ("radius", self.radius_deg),
            ],
        )?;
        if !(-90.0..=90.0).contains(&self.dec_deg) {
            return Err(FusionError::invalid_range(
                "cone_search",
                &format!("dec {} outside [-90, 90]", self.dec_deg),
            ));
        }
        if self.radius_deg < 0.0 {
            return Err(FusionError::invalid_range(
                "cone_search",
                &format!("radius {} is negative", self.radius_deg),
            ));
        }
        if let Some(max_mag) = self.max_mag {
            ensure_finite("cone_search", &[("max_mag", max_mag)])?;
        }
        Ok(())
    }
}

/// A single entry returned from a cone search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConeMatch<'c> {
    pub entry: &'c CatalogEntry,
    /// Angular distance from the cone center, in degrees.
    pub distance_deg: f64,
}

/// Exact match before it is resolved to an entry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hit {
    pub position: usize,
    pub distance_deg: f64,
}

/// Search for entries within a cone, nearest first.
///
/// Ties in distance are broken by snapshot order, so results are
/// deterministic for a given snapshot.
///
/// # Arguments
/// * `catalog` - Snapshot the entries are resolved from
/// * `index` - Candidate index built from `catalog`
/// * `query` - Center, radius, magnitude ceiling and page window
/// * `policy` - How many box candidates become result items
///
/// # Returns
/// The page of matches plus `total`, the number of exact matches in the
/// cone. `total` does not depend on the page window or the fetch policy.
///
/// # Errors
/// [`FusionError::InvalidRange`] for a non-finite center or radius, a Dec
/// outside `[-90, 90]` or a negative radius; [`FusionError::IndexMismatch`]
/// if `index` was not built from `catalog`.
pub fn cone_search<'c, I: CandidateIndex + ?Sized>(
    catalog: &'c Catalog,
    index: &I,
    query: &ConeQuery,
    policy: FetchPolicy,
) -> FusionResult<SearchResult<ConeMatch<'c>>> {
    let ConeHits { hits, total } = cone_hits(catalog, index, query, policy)?;
    let items = query
        .page
        .window(hits)
        .into_iter()
        .map(|hit| ConeMatch {
            entry: catalog.entry_at(hit.position),
            distance_deg: hit.distance_deg,
        })
        .collect();
    Ok(SearchResult { total, items })
}

/// Exact hits from the fetched candidate prefix, plus the full match count.
pub(crate) struct ConeHits {
    /// Sorted by distance, then snapshot position.
    pub hits: Vec<Hit>,
    pub total: usize,
}

pub(crate) fn cone_hits<I: CandidateIndex + ?Sized>(
    catalog: &Catalog,
    index: &I,
    query: &ConeQuery,
    policy: FetchPolicy,
) -> FusionResult<ConeHits> {
    query.validate()?;
    ensure_index_matches(catalog, index)?;

    let ra = normalize_ra(query.ra_deg);
    let region = bounding_box_for_radius(ra, query.dec_deg, query.radius_deg);
    let filter = ExactFilter {
        catalog,
        ra,
        query,
    };
    let candidates = index.query_box(&region, None).positions;

    // The excluded entry sits inside its own cone; fetch one extra for it.
    let wanted = query
        .page
        .end()
        .map(|end| end.saturating_add(usize::from(query.exclude.is_some())));

    let fetched = match (policy, wanted) {
        (_, None) | (FetchPolicy::Unbounded, _) => candidates.len(),
        (FetchPolicy::Fixed { factor }, Some(wanted)) => wanted
            .saturating_mul(factor.max(1))
            .min(candidates.len()),
        (
            FetchPolicy::Adaptive {
                initial_factor,
                max_rounds,
            },
            Some(wanted),
        ) => adaptive_prefix(&candidates, &filter, wanted, initial_factor, max_rounds),
    };

    let (prefix, rest) = candidates.split_at(fetched);
    let mut hits = filter.apply(prefix);
    let total = hits.len() + filter.count(rest);
    if hits.len() < total {
        debug!(
            fetched,
            found = hits.len(),
            total,
            "cone fetch stopped before the last match"
        );
    }

    hits.sort_by(|a, b| {
        a.distance_deg
            .total_cmp(&b.distance_deg)
            .then(a.position.cmp(&b.position))
    });
    Ok(ConeHits { hits, total })
}

/// Length of the candidate prefix to materialise. The factor doubles each
/// round until the prefix holds `wanted` hits; `max_rounds` caps the rounds.
fn adaptive_prefix(
    candidates: &[usize],
    filter: &ExactFilter<'_>,
    wanted: usize,
    initial_factor: usize,
    max_rounds: u32,
) -> usize {
    let mut factor = initial_factor.max(1);
    let mut round = 1;
    loop {
        let fetched = wanted.saturating_mul(factor).min(candidates.len());
        let found = filter.count(&candidates[..fetched]);
        if found >= wanted || fetched == candidates.len() || round >= max_rounds.max(1) {
            return fetched;
        }
        debug!(round, factor, found, wanted, "cone under-filled, widening fetch");
        factor = factor.saturating_mul(2);
        round += 1;
    }
}

struct ExactFilter<'a> {
    catalog: &'a Catalog,
    ra: f64,
    query: &'a ConeQuery,
}

impl ExactFilter<'_> {
    fn hit(&self, pos: usize) -> Option<Hit> {
        if Some(pos) == self.query.exclude {
            return None;
        }
        let entry = self.catalog.entry_at(pos);
        if let Some(max_mag) = self.query.max_mag {
            if entry.mag > max_mag {
                return None;
            }
        }
        let distance_deg =
            angular_separation_deg(self.ra, self.query.dec_deg, entry.ra_deg, entry.dec_deg);
        (distance_deg <= self.query.radius_deg).then_some(Hit {
            position: pos,
            distance_deg,
        })
    }

    fn apply(&self, positions: &[usize]) -> Vec<Hit> {
        positions.iter().filter_map(|&pos| self.hit(pos)).collect()
    }

    fn count(&self, positions: &[usize]) -> usize {
        positions.iter().filter(|&&pos| self.hit(pos).is_some()).count()
    }
}
