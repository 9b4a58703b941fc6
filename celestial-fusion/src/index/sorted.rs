//! Declination-sorted candidate index.

use super::{BoxFilter, CandidateIndex, Candidates, IndexedPoint};
use crate::catalog::Catalog;
use crate::geometry::SkyBox;

/// Entries sorted by declination (ties by snapshot position).
///
/// A box query finds the Dec band with two binary searches and applies the
/// RA rule to every entry inside it.
#[derive(Debug, Clone, Default)]
pub struct SortedIndex {
    points: Vec<IndexedPoint>,
}

impl SortedIndex {
    pub fn build(catalog: &Catalog) -> Self {
        let mut points: Vec<IndexedPoint> = catalog
            .entries()
            .iter()
            .enumerate()
            .map(|(position, entry)| IndexedPoint {
                ra: entry.ra_deg,
                dec: entry.dec_deg,
                position,
            })
            .collect();
        points.sort_by(|a, b| a.dec.total_cmp(&b.dec).then(a.position.cmp(&b.position)));
        Self { points }
    }

    fn dec_band(&self, dec_min: f64, dec_max: f64) -> &[IndexedPoint] {
        let start = self.points.partition_point(|p| p.dec < dec_min);
        let end = self.points.partition_point(|p| p.dec <= dec_max);
        if start >= end {
            return &[];
        }
        &self.points[start..end]
    }
}

impl CandidateIndex for SortedIndex {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn query_box(&self, region: &SkyBox, limit: Option<usize>) -> Candidates {
        let filter = BoxFilter::new(region);
        let positions = self
            .dec_band(region.dec_min, region.dec_max)
            .iter()
            .filter(|p| filter.contains(p.ra, p.dec))
            .map(|p| p.position)
            .collect();
        Candidates::from_unordered(positions, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CatalogEntry;

    fn catalog(coords: &[(f64, f64)]) -> Catalog {
        Catalog::from_entries(
            coords
                .iter()
                .enumerate()
                .map(|(i, &(ra, dec))| CatalogEntry::new(format!("e{}", i), ra, dec, 10.0, "T")),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_index() {
        let index = SortedIndex::build(&Catalog::new());
        assert!(index.is_empty());
        let c = index.query_box(&SkyBox::FULL_SKY, None);
        assert_eq!(c.total, 0);
        assert!(c.positions.is_empty());
    }

    #[test]
    fn test_dec_band_boundaries_inclusive() {
        let cat = catalog(&[(10.0, -5.0), (10.0, 0.0), (10.0, 5.0), (10.0, 5.0001)]);
        let index = SortedIndex::build(&cat);
        let c = index.query_box(&SkyBox::new(0.0, 20.0, -5.0, 5.0), None);
        assert_eq!(c.positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_seam_box() {
        let cat = catalog(&[(359.0, 0.0), (1.0, 0.0), (180.0, 0.0)]);
        let index = SortedIndex::build(&cat);
        let c = index.query_box(&SkyBox::new(355.0, 5.0, -1.0, 1.0), None);
        assert_eq!(c.positions, vec![0, 1]);
    }

    #[test]
    fn test_positions_in_snapshot_order_with_limit() {
        let cat = catalog(&[(10.0, 3.0), (10.0, -3.0), (10.0, 0.0), (10.0, 1.0)]);
        let index = SortedIndex::build(&cat);
        let c = index.query_box(&SkyBox::new(0.0, 20.0, -10.0, 10.0), Some(2));
        assert_eq!(c.total, 4);
        assert_eq!(c.positions, vec![0, 1]);
    }

    #[test]
    fn test_inverted_dec_band_is_empty() {
        let cat = catalog(&[(10.0, 0.0)]);
        let index = SortedIndex::build(&cat);
        let c = index.query_box(&SkyBox::new(0.0, 20.0, 5.0, -5.0), None);
        assert_eq!(c.total, 0);
    }
}
