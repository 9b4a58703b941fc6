//! Spherical spatial engine for multi-catalog point sources.
//!
//! Answers two kinds of question over an in-memory catalog snapshot:
//! "what lies near this point / inside this rectangle" on the celestial
//! sphere, with the RA = 0°/360° seam and the poles handled, and "which
//! observations from different catalogs are the same object", via
//! tolerance-radius matching and transitive grouping.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`geometry`] | [`angular_separation_deg`], [`bounding_box_for_radius`], [`SkyBox`] |
//! | [`entry`] | [`CatalogEntry`], [`EntryId`], [`GroupId`] |
//! | [`catalog`] | [`Catalog`] snapshot, [`GroupAssignments`], atomic group updates |
//! | [`index`] | [`CandidateIndex`] trait, [`SortedIndex`], [`HealpixIndex`], RA seam rules |
//! | [`query`] | [`search_box`], [`cone_search`], [`Page`], [`SearchResult`] |
//! | [`crossmatch`] | [`perform_cross_match`], [`DisjointSet`], [`CrossMatchStats`] |
//! | [`engine`] | [`SpatialEngine`] facade, [`CatalogService`] compute-then-commit |
//! | [`config`] | [`EngineConfig`], [`FetchPolicy`] |
//! | [`errors`] | [`FusionError`], [`FusionResult`] |
//!
//! # Quick Start
//!
//! ```
//! use celestial_fusion::{Catalog, CatalogEntry, CatalogService, EngineConfig, Page};
//!
//! let catalog = Catalog::from_entries(vec![
//!     CatalogEntry::new("gaia-1", 10.0, 45.0, 5.0, "GAIA"),
//!     CatalogEntry::new("hip-1", 10.0001, 45.0001, 5.2, "HIPPARCOS"),
//! ])?;
//! let mut service = CatalogService::with_sorted_index(catalog, EngineConfig::default());
//!
//! let near = service.engine().search_cone(10.0, 45.0, 0.01, Page::first(10))?;
//! assert_eq!(near.total, 2);
//!
//! let stats = service.cross_match(2.0, true)?;
//! assert_eq!(stats.groups_created, 1);
//! # Ok::<(), celestial_fusion::FusionError>(())
//! ```
//!
//! # Features
//!
//! - **`cli`**: Enables the `fusion` binary for loading CSV/JSON snapshots
//!   and running searches and cross-matches from the command line.

pub mod catalog;
pub mod config;
pub mod crossmatch;
pub mod engine;
pub mod entry;
pub mod errors;
pub mod geometry;
pub mod index;
pub mod query;

pub use catalog::{Catalog, CatalogSummary, GroupAssignments};
pub use config::{EngineConfig, FetchPolicy};
pub use crossmatch::{
    perform_cross_match, CrossMatchParams, CrossMatchRun, CrossMatchStats, DisjointSet,
};
pub use engine::{CatalogService, SpatialEngine};
pub use entry::{CatalogEntry, EntryId, GroupId};
pub use errors::{FusionError, FusionResult};
pub use geometry::{angular_separation_deg, bounding_box_for_radius, SkyBox};
pub use index::{CandidateIndex, HealpixIndex, SortedIndex};
pub use query::{cone_search, search_box, ConeMatch, ConeQuery, Page, SearchResult};
