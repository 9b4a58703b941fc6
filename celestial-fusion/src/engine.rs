//! Query facade over a snapshot and its candidate index.
//!
//! [`SpatialEngine`] borrows everything and is read-only, so any number of
//! them may serve searches concurrently. [`CatalogService`] owns the
//! snapshot, and its cross-match computes a run through the engine and
//! commits the resulting assignments in one step.

use tracing::info;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::crossmatch::{perform_cross_match, CrossMatchParams, CrossMatchRun, CrossMatchStats};
use crate::entry::{CatalogEntry, EntryId, GroupId};
use crate::errors::{FusionError, FusionResult};
use crate::index::{CandidateIndex, SortedIndex};
use crate::query::{
    cone_search, ensure_index_matches, search_box, ConeMatch, ConeQuery, Page, SearchResult,
};

/// Read-only search and cross-match entry point.
pub struct SpatialEngine<'a, I: CandidateIndex + ?Sized> {
    catalog: &'a Catalog,
    index: &'a I,
    config: &'a EngineConfig,
}

impl<I: CandidateIndex + ?Sized> Clone for SpatialEngine<'_, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: CandidateIndex + ?Sized> Copy for SpatialEngine<'_, I> {}

impl<'a, I: CandidateIndex + ?Sized> SpatialEngine<'a, I> {
    /// # Errors
    /// [`FusionError::IndexMismatch`] if `index` was not built from `catalog`.
    pub fn new(catalog: &'a Catalog, index: &'a I, config: &'a EngineConfig) -> FusionResult<Self> {
        ensure_index_matches(catalog, index)?;
        Ok(Self {
            catalog,
            index,
            config,
        })
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    /// Entries inside a literal RA/Dec rectangle, in snapshot order.
    pub fn search_box(
        &self,
        ra_min: f64,
        ra_max: f64,
        dec_min: f64,
        dec_max: f64,
        page: Page,
    ) -> FusionResult<SearchResult<&'a CatalogEntry>> {
        search_box(self.catalog, self.index, ra_min, ra_max, dec_min, dec_max, page)
    }

    /// Entries within `radius_deg` of a point, nearest first.
    pub fn search_cone(
        &self,
        ra_deg: f64,
        dec_deg: f64,
        radius_deg: f64,
        page: Page,
    ) -> FusionResult<SearchResult<ConeMatch<'a>>> {
        self.search(&ConeQuery::new(ra_deg, dec_deg, radius_deg).with_page(page))
    }

    /// Cone search with every [`ConeQuery`] option (e.g. a magnitude ceiling).
    pub fn search(&self, query: &ConeQuery) -> FusionResult<SearchResult<ConeMatch<'a>>> {
        cone_search(self.catalog, self.index, query, self.config.fetch)
    }

    /// Entries within `radius_deg` of an existing entry, excluding the entry itself.
    ///
    /// # Errors
    /// [`FusionError::UnknownEntry`] if `id` is not in the snapshot.
    pub fn find_near(
        &self,
        id: &EntryId,
        radius_deg: f64,
        page: Page,
    ) -> FusionResult<SearchResult<ConeMatch<'a>>> {
        let position = self
            .catalog
            .position_of(id)
            .ok_or_else(|| FusionError::UnknownEntry(id.to_string()))?;
        let entry = self.catalog.entry_at(position);
        let query = ConeQuery::new(entry.ra_deg, entry.dec_deg, radius_deg)
            .with_page(page)
            .excluding(position);

        cone_search(self.catalog, self.index, &query, self.config.fetch)
    }

    /// Compute a grouping without committing it.
    pub fn cross_match(
        &self,
        tolerance_arcsec: f64,
        reset_existing: bool,
    ) -> FusionResult<CrossMatchRun> {
        perform_cross_match(
            self.catalog,
            self.index,
            &CrossMatchParams::new(tolerance_arcsec, reset_existing),
            self.config,
        )
    }
}

/// Owns a snapshot, its index and the engine configuration.
#[derive(Debug)]
pub struct CatalogService<I: CandidateIndex> {
    catalog: Catalog,
    index: I,
    config: EngineConfig,
}

impl CatalogService<SortedIndex> {
    /// Service over a freshly built [`SortedIndex`].
    pub fn with_sorted_index(catalog: Catalog, config: EngineConfig) -> Self {
        let index = SortedIndex::build(&catalog);
        Self {
            catalog,
            index,
            config,
        }
    }
}

impl<I: CandidateIndex> CatalogService<I> {
    /// # Errors
    /// [`FusionError::IndexMismatch`] if `index` was not built from `catalog`.
    pub fn new(catalog: Catalog, index: I, config: EngineConfig) -> FusionResult<Self> {
        ensure_index_matches(&catalog, &index)?;
        Ok(Self {
            catalog,
            index,
            config,
        })
    }

    pub fn engine(&self) -> SpatialEngine<'_, I> {
        SpatialEngine {
            catalog: &self.catalog,
            index: &self.index,
            config: &self.config,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a cross-match and commit its assignments.
    ///
    /// Nothing changes if the run fails; group ids only move once the
    /// complete grouping is known.
    pub fn cross_match(
        &mut self,
        tolerance_arcsec: f64,
        reset_existing: bool,
    ) -> FusionResult<CrossMatchStats> {
        let run = self.engine().cross_match(tolerance_arcsec, reset_existing)?;
        let applied = self.catalog.apply_assignments(&run.assignments)?;
        info!(
            applied,
            groups_created = run.stats.groups_created,
            "cross-match committed"
        );
        Ok(run.stats)
    }

    /// Current `(entry id, group id)` pairs, in snapshot order.
    pub fn group_assignments(&self) -> impl Iterator<Item = (&EntryId, GroupId)> + '_ {
        self.catalog.group_assignments()
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }
}
