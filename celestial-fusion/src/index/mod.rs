//! Candidate indexes: "which entries fall inside this RA/Dec rectangle".
//!
//! An index is built once from a [`Catalog`](crate::Catalog) snapshot and
//! keeps its own compact copy of the coordinates, so it can stand in for an
//! externally maintained index. Two implementations are provided:
//!
//! - [`SortedIndex`]: entries sorted by declination; a box query binary
//!   searches the Dec band and filters RA linearly. Good default.
//! - [`HealpixIndex`]: entries bucketed by nested HEALPix pixel; a box query
//!   only touches the pixels overlapping the box.
//!
//! Both return snapshot positions in ascending order, so a capped query is
//! the prefix of the uncapped one regardless of the index used.

mod healpix;
mod sorted;

pub use healpix::{ang2pix_nest, HealpixIndex};
pub use sorted::SortedIndex;

use crate::geometry::{SkyBox, FULL_CIRCLE_DEG};

/// Result of a candidate query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates {
    /// Number of entries inside the box, ignoring the cap.
    pub total: usize,
    /// Snapshot positions, ascending, at most `limit` of them.
    pub positions: Vec<usize>,
}

impl Candidates {
    /// Sort, count and cap a set of matching positions.
    pub(crate) fn from_unordered(mut positions: Vec<usize>, limit: Option<usize>) -> Self {
        positions.sort_unstable();
        let total = positions.len();
        if let Some(limit) = limit {
            positions.truncate(limit);
        }
        Self { total, positions }
    }
}

/// Spatial pre-filter over a catalog snapshot.
pub trait CandidateIndex: Send + Sync {
    /// Number of indexed entries. Must equal the snapshot's length.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positions of entries whose stored coordinates fall inside `region`.
    ///
    /// Dec is tested as a closed interval; RA follows [`RaFilter`]. At most
    /// `limit` positions are returned, lowest first.
    fn query_box(&self, region: &SkyBox, limit: Option<usize>) -> Candidates;
}

/// Compact copy of an entry's coordinates, tagged with its snapshot position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct IndexedPoint {
    pub ra: f64,
    pub dec: f64,
    pub position: usize,
}

/// RA membership rule for a box, chosen from its literal bounds.
///
/// Exactly one case applies per box:
///
/// | Case | Bounds | Matches |
/// |------|--------|---------|
/// | `WrapLow` | `ra_min < 0` | `ra >= ra_min + 360 \|\| ra <= ra_max` |
/// | `WrapHigh` | `ra_max > 360` | `ra >= ra_min \|\| ra <= ra_max - 360` |
/// | `Inverted` | `ra_min > ra_max` | `ra >= ra_min \|\| ra <= ra_max` |
/// | `Interval` | otherwise | `ra_min <= ra && ra <= ra_max` |
///
/// `WrapLow`/`WrapHigh` come from derived cone boxes; `Inverted` is how a
/// caller asks for a rectangle across the 0° seam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RaFilter {
    WrapLow { low: f64, high: f64 },
    WrapHigh { low: f64, high: f64 },
    Inverted { low: f64, high: f64 },
    Interval { min: f64, max: f64 },
}

impl RaFilter {
    pub fn from_bounds(ra_min: f64, ra_max: f64) -> Self {
        if ra_min < 0.0 {
            RaFilter::WrapLow {
                low: ra_min + FULL_CIRCLE_DEG,
                high: ra_max,
            }
        } else if ra_max > FULL_CIRCLE_DEG {
            RaFilter::WrapHigh {
                low: ra_min,
                high: ra_max - FULL_CIRCLE_DEG,
            }
        } else if ra_min > ra_max {
            RaFilter::Inverted {
                low: ra_min,
                high: ra_max,
            }
        } else {
            RaFilter::Interval {
                min: ra_min,
                max: ra_max,
            }
        }
    }

    #[inline]
    pub fn contains(&self, ra: f64) -> bool {
        match *self {
            RaFilter::WrapLow { low, high }
            | RaFilter::WrapHigh { low, high }
            | RaFilter::Inverted { low, high } => ra >= low || ra <= high,
            RaFilter::Interval { min, max } => ra >= min && ra <= max,
        }
    }
}

/// Exact box membership for a stored coordinate pair.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoxFilter {
    ra: RaFilter,
    dec_min: f64,
    dec_max: f64,
}

impl BoxFilter {
    pub fn new(region: &SkyBox) -> Self {
        Self {
            ra: RaFilter::from_bounds(region.ra_min, region.ra_max),
            dec_min: region.dec_min,
            dec_max: region.dec_max,
        }
    }

    #[inline]
    pub fn contains(&self, ra: f64, dec: f64) -> bool {
        dec >= self.dec_min && dec <= self.dec_max && self.ra.contains(ra)
    }
}
