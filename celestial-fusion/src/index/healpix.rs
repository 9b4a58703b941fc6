//! HEALPix-bucketed candidate index.
//!
//! Entries are grouped by nested HEALPix pixel (Gorski et al. 2005). A box
//! query samples the padded box on a quarter-pixel grid to collect every
//! pixel that can hold a matching entry, then filters those buckets exactly.
//! When the box is large enough that sampling would cost more than visiting
//! every occupied bucket, all buckets are scanned instead.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{BoxFilter, CandidateIndex, Candidates, IndexedPoint, RaFilter};
use crate::catalog::Catalog;
use crate::geometry::{normalize_ra, SkyBox, FULL_CIRCLE_DEG};

const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;
const HALF_PI: f64 = core::f64::consts::FRAC_PI_2;
const TWO_PI: f64 = core::f64::consts::TAU;

/// sqrt(4π sr in deg² / 12): pixel edge in degrees at nside = 1.
const PIXEL_SIZE_NSIDE1_DEG: f64 = 58.6;

/// Highest order whose pixel index fits the nested bit interleave in `u64`.
pub const MAX_ORDER: u32 = 29;

/// Candidate index bucketing entries by nested HEALPix pixel.
#[derive(Debug, Clone)]
pub struct HealpixIndex {
    order: u32,
    len: usize,
    buckets: HashMap<u64, Vec<IndexedPoint>>,
}

impl HealpixIndex {
    /// Bucket every catalog entry at the given order (`nside = 2^order`).
    ///
    /// Orders above [`MAX_ORDER`] are clamped.
    pub fn build(catalog: &Catalog, order: u32) -> Self {
        let order = order.min(MAX_ORDER);
        let mut buckets: HashMap<u64, Vec<IndexedPoint>> = HashMap::new();
        for (position, entry) in catalog.entries().iter().enumerate() {
            let pixel = ang2pix_nest(order, entry.ra_deg, entry.dec_deg);
            buckets.entry(pixel).or_default().push(IndexedPoint {
                ra: entry.ra_deg,
                dec: entry.dec_deg,
                position,
            });
        }
        debug!(
            order,
            entries = catalog.len(),
            occupied_pixels = buckets.len(),
            "healpix index built"
        );
        Self {
            order,
            len: catalog.len(),
            buckets,
        }
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn nside(&self) -> u64 {
        1u64 << self.order
    }

    pub fn occupied_pixels(&self) -> usize {
        self.buckets.len()
    }

    fn pixel_size_deg(&self) -> f64 {
        PIXEL_SIZE_NSIDE1_DEG / self.nside() as f64
    }

    /// Unwrapped RA interval to walk for a box, `(start, end)` with `start <= end`.
    ///
    /// Follows the box's [`RaFilter`] rather than its literal bounds: the
    /// seam cases match `[low, 360)` and `[0, high]`, which may be wider
    /// or narrower than `ra_min..ra_max` when both bounds lie past the seam.
    fn ra_walk(region: &SkyBox) -> (f64, f64) {
        if region.covers_all_ra() {
            return (0.0, FULL_CIRCLE_DEG);
        }
        let (start, end) = match RaFilter::from_bounds(region.ra_min, region.ra_max) {
            RaFilter::Interval { min, max } => (min, max),
            RaFilter::WrapLow { low, high }
            | RaFilter::WrapHigh { low, high }
            | RaFilter::Inverted { low, high } => {
                (low.min(FULL_CIRCLE_DEG), high.max(0.0) + FULL_CIRCLE_DEG)
            }
        };
        if end - start >= FULL_CIRCLE_DEG {
            (0.0, FULL_CIRCLE_DEG)
        } else {
            (start, end)
        }
    }

    /// Rough sample count for [`Self::pixels_overlapping`].
    fn estimated_samples(&self, region: &SkyBox) -> f64 {
        let pixel = self.pixel_size_deg();
        let step = pixel * 0.25;
        let (ra_start, ra_end) = Self::ra_walk(region);
        let rows = ((region.dec_max - region.dec_min).max(0.0) + 2.0 * pixel) / step + 1.0;
        let cols = ((ra_end - ra_start).min(FULL_CIRCLE_DEG) + 2.0 * pixel) / step + 1.0;
        rows * cols
    }

    /// Every pixel that may contain a point of `region`.
    ///
    /// Conservative: the box is padded by one pixel on every side and sampled
    /// at a quarter-pixel pitch, so pixels are never missed, only over-included.
    fn pixels_overlapping(&self, region: &SkyBox) -> HashSet<u64> {
        let pixel = self.pixel_size_deg();
        let step = pixel * 0.25;
        let dec_lo = (region.dec_min - pixel).max(-90.0);
        let dec_hi = (region.dec_max + pixel).min(90.0);
        let (ra_start, ra_end) = Self::ra_walk(region);

        let mut pixels = HashSet::new();
        for dec in sample_steps(dec_lo, dec_hi, step) {
            // RA pitch widens toward the poles; clamp to keep the row finite.
            let cos_dec = libm::cos(dec * DEG_TO_RAD).max(0.01);
            let pad = pixel / cos_dec;
            let (row_lo, row_hi) =
                if libm::fabs(dec) > 89.0 || (ra_end - ra_start) + 2.0 * pad >= FULL_CIRCLE_DEG {
                    (0.0, FULL_CIRCLE_DEG)
                } else {
                    (ra_start - pad, ra_end + pad)
                };

            for ra in sample_steps(row_lo, row_hi, step / cos_dec) {
                pixels.insert(ang2pix_nest(self.order, normalize_ra(ra), dec));
            }
        }
        pixels
    }
}

impl CandidateIndex for HealpixIndex {
    fn len(&self) -> usize {
        self.len
    }

    fn query_box(&self, region: &SkyBox, limit: Option<usize>) -> Candidates {
        if region.dec_min > region.dec_max {
            return Candidates::default();
        }
        let filter = BoxFilter::new(region);
        let scan = |bucket: &Vec<IndexedPoint>, out: &mut Vec<usize>| {
            out.extend(
                bucket
                    .iter()
                    .filter(|p| filter.contains(p.ra, p.dec))
                    .map(|p| p.position),
            );
        };

        let mut positions = Vec::new();
        if self.estimated_samples(region) > 4.0 * self.buckets.len() as f64 {
            for bucket in self.buckets.values() {
                scan(bucket, &mut positions);
            }
        } else {
            let pixels = self.pixels_overlapping(region);
            for pixel in &pixels {
                if let Some(bucket) = self.buckets.get(pixel) {
                    scan(bucket, &mut positions);
                }
            }
        }
        Candidates::from_unordered(positions, limit)
    }
}

/// `lo, lo + step, ...` up to and including `hi`.
fn sample_steps(lo: f64, hi: f64, step: f64) -> impl Iterator<Item = f64> {
    let count = if hi > lo {
        libm::ceil((hi - lo) / step) as usize
    } else {
        0
    };
    (0..=count).map(move |i| (lo + i as f64 * step).min(hi))
}

/// Convert (RA, Dec) in degrees to a nested HEALPix pixel index.
///
/// # Arguments
/// * `order` - HEALPix order, `nside = 2^order`, at most [`MAX_ORDER`]
/// * `ra_deg` - Right ascension in `[0, 360)`
/// * `dec_deg` - Declination in `[-90, 90]`
///
/// # Returns
/// Pixel index in `[0, 12 * nside²)`.
pub fn ang2pix_nest(order: u32, ra_deg: f64, dec_deg: f64) -> u64 {
    let phi = ra_deg * DEG_TO_RAD;
    let z = libm::sin(dec_deg * DEG_TO_RAD);
    let nside = 1u64 << order;
    let (face, ix, iy) = face_and_position(phi, z, nside);
    face as u64 * nside * nside + interleave_bits(ix, iy, order)
}

/// Base face (0..12) and the (ix, iy) position inside it.
fn face_and_position(phi: f64, z: f64, nside: u64) -> (u32, u64, u64) {
    let phi = if phi < 0.0 { phi + TWO_PI } else { phi };
    let tt = phi / HALF_PI;
    if libm::fabs(z) <= 2.0 / 3.0 {
        equatorial_face(tt, z, nside)
    } else {
        polar_face(tt, z, nside)
    }
}

fn equatorial_face(tt: f64, z: f64, nside: u64) -> (u32, u64, u64) {
    let n = nside as i64;
    let t1 = nside as f64 * (0.5 + tt);
    let t2 = nside as f64 * z * 0.75;
    let jp = (t1 - t2) as i64;
    let jm = (t1 + t2) as i64;
    let ifp = jp / n;
    let ifm = jm / n;

    // jp/jm past 4n wrap back to face 4 or the southern faces.
    let face = if ifp == ifm {
        (ifp | 4) as u32
    } else if ifp < ifm {
        ifp as u32
    } else {
        (ifm + 8) as u32
    };

    let ix = jm & (n - 1);
    let iy = n - (jp & (n - 1)) - 1;
    (face, ix as u64, iy as u64)
}

fn polar_face(tt: f64, z: f64, nside: u64) -> (u32, u64, u64) {
    let n = nside as i64;
    let ntt = libm::floor(tt).min(3.0);
    let tp = tt - ntt;
    let tmp = nside as f64 * libm::sqrt(3.0 * (1.0 - libm::fabs(z)));
    let jp = ((tp * tmp) as i64).min(n - 1);
    let jm = (((1.0 - tp) * tmp) as i64).min(n - 1);

    if z > 0.0 {
        (ntt as u32, (n - jm - 1) as u64, (n - jp - 1) as u64)
    } else {
        (ntt as u32 + 8, jp as u64, jm as u64)
    }
}

/// Z-order interleave of (ix, iy) into the in-face nested index.
fn interleave_bits(ix: u64, iy: u64, order: u32) -> u64 {
    (0..order).fold(0u64, |acc, i| {
        acc | (((ix >> i) & 1) << (2 * i)) | (((iy >> i) & 1) << (2 * i + 1))
    })
}
