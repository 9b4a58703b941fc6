//! Rectangular RA/Dec search.
//!
//! Bounds are taken literally: no wraparound correction is applied here.
//! A caller who wants a rectangle across the 0° seam passes
//! `ra_min > ra_max` (e.g. `355..5`); a caller who wants a plain box must
//! keep `0 <= ra_min <= ra_max <= 360` themselves. Only the cone path derives
//! corrected bounds, in [`super::cone`].

use tracing::debug;

use super::{ensure_finite, ensure_index_matches, Page, SearchResult};
use crate::catalog::Catalog;
use crate::entry::CatalogEntry;
use crate::errors::{FusionError, FusionResult};
use crate::geometry::SkyBox;
use crate::index::CandidateIndex;

/// Entries whose coordinates fall inside the box, in snapshot order.
///
/// # Arguments
/// * `ra_min`, `ra_max` - RA bounds in degrees, read literally; see
///   [`RaFilter`](crate::index::RaFilter) for bounds past the seam
/// * `dec_min`, `dec_max` - Dec bounds in degrees, inclusive
/// * `page` - Offset and limit applied after matching
///
/// # Returns
/// The requested page, with `total` counting every match rather than just
/// the returned items.
///
/// # Errors
/// [`FusionError::InvalidRange`] if a bound is not finite or
/// `dec_min > dec_max`; [`FusionError::IndexMismatch`] if `index` was not
/// built from `catalog`.
pub fn search_box<'c, I: CandidateIndex + ?Sized>(
    catalog: &'c Catalog,
    index: &I,
    ra_min: f64,
    ra_max: f64,
    dec_min: f64,
    dec_max: f64,
    page: Page,
) -> FusionResult<SearchResult<&'c CatalogEntry>> {
    ensure_finite(
        "search_box",
        &[
            ("ra_min", ra_min),
            ("ra_max", ra_max),
            ("dec_min", dec_min),
            ("dec_max", dec_max),
        ],
    )?;
    if dec_min > dec_max {
        return Err(FusionError::invalid_range(
            "search_box",
            &format!("dec_min {} > dec_max {}", dec_min, dec_max),
        ));
    }
    ensure_index_matches(catalog, index)?;

    let region = SkyBox::new(ra_min, ra_max, dec_min, dec_max);
    let candidates = index.query_box(&region, page.end());
    debug!(
        total = candidates.total,
        fetched = candidates.positions.len(),
        "box search"
    );

    let items = page
        .window(candidates.positions)
        .into_iter()
        .map(|pos| catalog.entry_at(pos))
        .collect();

    Ok(SearchResult {
        total: candidates.total,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SortedIndex;

    fn fixture() -> (Catalog, SortedIndex) {
        let catalog = Catalog::from_entries(vec![
            CatalogEntry::new("seam-high", 359.0, 0.0, 8.0, "GAIA"),
            CatalogEntry::new("seam-low", 1.0, 0.5, 9.0, "GAIA"),
            CatalogEntry::new("far", 180.0, 0.0, 7.0, "TYCHO"),
            CatalogEntry::new("north", 10.0, 60.0, 6.0, "TYCHO"),
        ])
        .unwrap();
        let index = SortedIndex::build(&catalog);
        (catalog, index)
    }

    fn ids<'a>(result: &SearchResult<&'a CatalogEntry>) -> Vec<&'a str> {
        result.items.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_seam_box_literal_bounds() {
        let (catalog, index) = fixture();
        let result =
            search_box(&catalog, &index, 355.0, 5.0, -10.0, 10.0, Page::first(100)).unwrap();
        assert_eq!(ids(&result), vec!["seam-high", "seam-low"]);
        assert_eq!(result.total, 2);
    }

    #[test]
    fn test_full_sky_returns_everything() {
        let (catalog, index) = fixture();
        let result =
            search_box(&catalog, &index, 0.0, 360.0, -90.0, 90.0, Page::first(100)).unwrap();
        assert_eq!(result.total, 4);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_pagination_keeps_total() {
        let (catalog, index) = fixture();
        let result =
            search_box(&catalog, &index, 0.0, 360.0, -90.0, 90.0, Page::new(1, Some(2))).unwrap();
        assert_eq!(result.total, 4);
        assert_eq!(ids(&result), vec!["seam-low", "far"]);
    }

    #[test]
    fn test_rejects_inverted_dec() {
        let (catalog, index) = fixture();
        let err = search_box(&catalog, &index, 0.0, 10.0, 5.0, -5.0, Page::all()).unwrap_err();
        assert!(matches!(err, FusionError::InvalidRange { .. }));
        assert!(err.to_string().contains("dec_min 5 > dec_max -5"));
    }

    #[test]
    fn test_rejects_non_finite() {
        let (catalog, index) = fixture();
        let err = search_box(&catalog, &index, f64::NAN, 10.0, -5.0, 5.0, Page::all()).unwrap_err();
        assert!(err.to_string().contains("ra_min"));
    }

    #[test]
    fn test_empty_catalog_is_not_an_error() {
        let catalog = Catalog::new();
        let index = SortedIndex::build(&catalog);
        let result =
            search_box(&catalog, &index, 0.0, 360.0, -90.0, 90.0, Page::first(10)).unwrap();
        assert_eq!(result, SearchResult::empty());
    }

    #[test]
    fn test_index_mismatch() {
        let (catalog, _) = fixture();
        let stale = SortedIndex::build(&Catalog::new());
        let err = search_box(&catalog, &stale, 0.0, 360.0, -90.0, 90.0, Page::all()).unwrap_err();
        assert_eq!(
            err,
            FusionError::IndexMismatch {
                index: 0,
                catalog: 4
            }
        );
    }
}
