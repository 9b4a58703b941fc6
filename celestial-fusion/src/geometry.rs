//! Spherical geometry kernel.
//!
//! Two primitives carry the whole engine:
//!
//! - [`angular_separation_deg`]: exact great-circle distance, used as the
//!   final filter for every cone and cross-match query;
//! - [`bounding_box_for_radius`]: a cheap RA/Dec rectangle guaranteed to
//!   contain a circle of the given radius, used as the pre-filter.
//!
//! Boxes returned by [`bounding_box_for_radius`] may carry `ra_min < 0` or
//! `ra_max > 360`. That is how a region crossing the RA=0°/360° seam is
//! expressed; [`crate::index::RaFilter`] turns it back into a membership test.

use serde::{Deserialize, Serialize};

pub const FULL_CIRCLE_DEG: f64 = 360.0;

/// Boxes whose Dec range comes this close to a pole cover every RA.
pub const POLE_MARGIN_DEG: f64 = 1.0;

/// Below this `cos(dec)` the RA expansion is not computed.
pub const MIN_COS_DEC: f64 = 1e-9;

pub const ARCSEC_PER_DEG: f64 = 3600.0;

const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / core::f64::consts::PI;

/// Rectangular RA/Dec region, in degrees.
///
/// Dec bounds are closed and ordered. RA bounds are taken literally: see
/// [`crate::index::RaFilter`] for how out-of-range or inverted RA bounds are
/// read as a wrap across the seam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyBox {
    pub ra_min: f64,
    pub ra_max: f64,
    pub dec_min: f64,
    pub dec_max: f64,
}

impl SkyBox {
    /// The whole sphere: `[0, 360] × [-90, 90]`.
    pub const FULL_SKY: SkyBox = SkyBox {
        ra_min: 0.0,
        ra_max: FULL_CIRCLE_DEG,
        dec_min: -90.0,
        dec_max: 90.0,
    };

    pub fn new(ra_min: f64, ra_max: f64, dec_min: f64, dec_max: f64) -> Self {
        Self {
            ra_min,
            ra_max,
            dec_min,
            dec_max,
        }
    }

    /// A Dec band spanning every right ascension.
    pub fn full_ra(dec_min: f64, dec_max: f64) -> Self {
        Self::new(0.0, FULL_CIRCLE_DEG, dec_min, dec_max)
    }

    /// True when the RA bounds cover the whole circle.
    pub fn covers_all_ra(&self) -> bool {
        self.ra_max - self.ra_min >= FULL_CIRCLE_DEG
    }

    /// RA extent in degrees, reading `ra_min > ra_max` as a seam crossing.
    pub fn ra_span(&self) -> f64 {
        if self.ra_min > self.ra_max {
            self.ra_max + FULL_CIRCLE_DEG - self.ra_min
        } else {
            (self.ra_max - self.ra_min).min(FULL_CIRCLE_DEG)
        }
    }
}

/// Great-circle distance between two sky positions, in degrees.
///
/// Uses the Vincenty form (`atan2` of the cross and dot terms), which stays
/// accurate for sub-arcsecond separations as well as near-antipodal ones.
/// The result is always in `[0, 180]`, `0` for identical positions and
/// `180` for antipodes.
pub fn angular_separation_deg(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    // Canonical argument order makes d(a, b) and d(b, a) bitwise equal.
    let ((ra1, dec1), (ra2, dec2)) = if (ra2_deg, dec2_deg) < (ra1_deg, dec1_deg) {
        ((ra2_deg, dec2_deg), (ra1_deg, dec1_deg))
    } else {
        ((ra1_deg, dec1_deg), (ra2_deg, dec2_deg))
    };

    let (sin_lat1, cos_lat1) = libm::sincos(dec1 * DEG_TO_RAD);
    let (sin_lat2, cos_lat2) = libm::sincos(dec2 * DEG_TO_RAD);
    let (sin_delta_lon, cos_delta_lon) = libm::sincos((ra2 - ra1) * DEG_TO_RAD);

    let num = libm::sqrt(
        (cos_lat2 * sin_delta_lon).powi(2)
            + (cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_delta_lon).powi(2),
    );
    let den = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_delta_lon;

    (libm::atan2(num, den) * RAD_TO_DEG).clamp(0.0, 180.0)
}

/// RA/Dec rectangle containing every point within `radius_deg` of the center.
///
/// Dec bounds are `clamp(dec ± radius, -90, 90)`. The RA half-width is
/// `radius / cos(dec)` evaluated at whichever Dec bound lies farther from the
/// equator, so the rectangle never under-covers the circle. Full RA coverage
/// is returned instead when a Dec bound is within [`POLE_MARGIN_DEG`] of a
/// pole, when `cos(dec)` falls below [`MIN_COS_DEC`], or when the half-width
/// reaches 180°.
///
/// # Arguments
/// * `ra_center_deg` - Center right ascension, in `[0, 360)`
/// * `dec_center_deg` - Center declination, in `[-90, 90]`
/// * `radius_deg` - Non-negative radius; callers validate it
///
/// # Returns
/// A [`SkyBox`] whose RA bounds may fall below 0 or above 360 when the
/// circle crosses the seam.
pub fn bounding_box_for_radius(ra_center_deg: f64, dec_center_deg: f64, radius_deg: f64) -> SkyBox {
    let dec_min = (dec_center_deg - radius_deg).clamp(-90.0, 90.0);
    let dec_max = (dec_center_deg + radius_deg).clamp(-90.0, 90.0);

    if dec_max >= 90.0 - POLE_MARGIN_DEG || dec_min <= -90.0 + POLE_MARGIN_DEG {
        return SkyBox::full_ra(dec_min, dec_max);
    }

    let dec_ref = libm::fabs(dec_min).max(libm::fabs(dec_max));
    let cos_dec = libm::cos(dec_ref * DEG_TO_RAD);
    if cos_dec < MIN_COS_DEC {
        return SkyBox::full_ra(dec_min, dec_max);
    }

    let half_width = radius_deg / cos_dec;
    if half_width >= 180.0 {
        return SkyBox::full_ra(dec_min, dec_max);
    }

    SkyBox::new(
        ra_center_deg - half_width,
        ra_center_deg + half_width,
        dec_min,
        dec_max,
    )
}

/// Wrap any finite RA into `[0, 360)`.
pub fn normalize_ra(ra_deg: f64) -> f64 {
    let wrapped = libm::fmod(ra_deg, FULL_CIRCLE_DEG);
    let wrapped = if wrapped < 0.0 {
        wrapped + FULL_CIRCLE_DEG
    } else {
        wrapped
    };
    if wrapped >= FULL_CIRCLE_DEG {
        0.0
    } else {
        wrapped
    }
}

#[inline]
pub fn arcsec_to_deg(arcsec: f64) -> f64 {
    arcsec / ARCSEC_PER_DEG
}

#[inline]
pub fn deg_to_arcsec(deg: f64) -> f64 {
    deg * ARCSEC_PER_DEG
}
