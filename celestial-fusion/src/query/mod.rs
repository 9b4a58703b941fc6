//! Search interface over a catalog snapshot and a candidate index.
//!
//! - [`bbox`]: literal RA/Dec rectangle search with pagination
//! - [`cone`]: circular search, nearest first, with configurable over-fetch

pub mod bbox;
pub mod cone;

pub use bbox::search_box;
pub use cone::{cone_search, ConeMatch, ConeQuery};

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::errors::{FusionError, FusionResult};
use crate::index::CandidateIndex;

/// Pagination window: skip `offset` results, then return at most `limit`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    /// `None` returns every remaining result.
    pub limit: Option<usize>,
}

impl Page {
    pub fn new(offset: usize, limit: Option<usize>) -> Self {
        Self { offset, limit }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn first(limit: usize) -> Self {
        Self::new(0, Some(limit))
    }

    /// One past the last result index the page needs.
    pub fn end(&self) -> Option<usize> {
        self.limit.map(|limit| self.offset.saturating_add(limit))
    }

    pub(crate) fn window<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// One page of results plus the number of matches found overall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult<T> {
    /// Matches found, independent of the page window.
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> SearchResult<T> {
    pub fn empty() -> Self {
        Self {
            total: 0,
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub(crate) fn ensure_index_matches<I: CandidateIndex + ?Sized>(
    catalog: &Catalog,
    index: &I,
) -> FusionResult<()> {
    if index.len() != catalog.len() {
        return Err(FusionError::IndexMismatch {
            index: index.len(),
            catalog: catalog.len(),
        });
    }
    Ok(())
}

pub(crate) fn ensure_finite(operation: &str, values: &[(&str, f64)]) -> FusionResult<()> {
    for (name, value) in values {
        if !value.is_finite() {
            return Err(FusionError::invalid_range(
                operation,
                &format!("{} is not finite ({})", name, value),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_end() {
        assert_eq!(Page::all().end(), None);
        assert_eq!(Page::first(10).end(), Some(10));
        assert_eq!(Page::new(5, Some(10)).end(), Some(15));
        assert_eq!(Page::new(usize::MAX, Some(10)).end(), Some(usize::MAX));
    }

    #[test]
    fn test_page_window() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(Page::new(2, Some(3)).window(items.clone()), vec![2, 3, 4]);
        assert_eq!(Page::new(8, Some(5)).window(items.clone()), vec![8, 9]);
        assert_eq!(Page::new(3, None).window(items.clone()).len(), 7);
        assert!(Page::new(20, None).window(items).is_empty());
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite("op", &[("a", 1.0), ("b", -3.0)]).is_ok());
        let err = ensure_finite("op", &[("a", 1.0), ("b", f64::NAN)]).unwrap_err();
        assert!(err.to_string().contains("b is not finite"));
    }
}
