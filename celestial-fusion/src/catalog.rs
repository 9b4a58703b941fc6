//! In-memory catalog snapshot.
//!
//! A [`Catalog`] owns the entries every query runs against. Entries are
//! range-checked and id-deduplicated on the way in and are never modified
//! afterwards, with one exception: fusion-group ids, which change only
//! through [`Catalog::apply_assignments`]. That call validates the whole
//! [`GroupAssignments`] batch before touching any entry, so a snapshot is
//! never observed half-updated.
//!
//! Entries are addressed internally by their *position* (insertion order).
//! Candidate indexes and the cross-match disjoint set work over positions;
//! ids are resolved once at the edges.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::entry::{CatalogEntry, EntryId, GroupId};
use crate::errors::{FusionError, FusionResult};

/// A batch of group-id assignments produced by a cross-match run.
///
/// When `reset` is set, every group id in the catalog is cleared before the
/// pairs are applied; otherwise only the listed entries change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupAssignments {
    reset: bool,
    pairs: Vec<(EntryId, GroupId)>,
}

impl GroupAssignments {
    pub fn new(reset: bool) -> Self {
        Self {
            reset,
            pairs: Vec::new(),
        }
    }

    pub fn push(&mut self, id: EntryId, group: GroupId) {
        self.pairs.push((id, group));
    }

    pub fn is_reset(&self) -> bool {
        self.reset
    }

    pub fn pairs(&self) -> &[(EntryId, GroupId)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Counts describing a snapshot, printable as a short report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSummary {
    pub total_entries: usize,
    /// Entry count per source tag.
    pub sources: BTreeMap<String, usize>,
    pub groups: usize,
    pub grouped_entries: usize,
    /// Brightest and faintest magnitude, if the catalog is non-empty.
    pub mag_range: Option<(f64, f64)>,
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Entries: {}", self.total_entries)?;
        let sources: Vec<String> = self
            .sources
            .iter()
            .map(|(name, count)| format!("{} ({})", name, count))
            .collect();
        writeln!(f, "Sources: {}", sources.join(", "))?;
        writeln!(
            f,
            "Groups: {} ({} grouped entries)",
            self.groups, self.grouped_entries
        )?;
        match self.mag_range {
            Some((bright, faint)) => write!(f, "Magnitude range: {:.2} .. {:.2}", bright, faint),
            None => write!(f, "Magnitude range: n/a"),
        }
    }
}

/// Snapshot of catalog entries addressed by id and by position.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    positions: HashMap<EntryId, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot, rejecting out-of-range coordinates and duplicate ids.
    ///
    /// # Errors
    /// [`FusionError::InvalidEntry`] for the first entry failing the range
    /// checks, [`FusionError::DuplicateEntry`] for the first repeated id.
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> FusionResult<Self> {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.push(entry)?;
        }
        debug!(entries = catalog.len(), "catalog snapshot built");
        Ok(catalog)
    }

    /// Append an entry and return its position.
    pub fn push(&mut self, entry: CatalogEntry) -> FusionResult<usize> {
        entry
            .check_ranges()
            .map_err(|reason| FusionError::invalid_entry(entry.id.as_str(), &reason))?;
        if self.positions.contains_key(&entry.id) {
            return Err(FusionError::DuplicateEntry(entry.id.to_string()));
        }
        let position = self.entries.len();
        self.positions.insert(entry.id.clone(), position);
        self.entries.push(entry);
        Ok(position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in snapshot order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, id: &EntryId) -> Option<&CatalogEntry> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn position_of(&self, id: &EntryId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Entry at a snapshot position. Positions come from this catalog's
    /// indexes, so an out-of-range position is a caller bug.
    pub(crate) fn entry_at(&self, position: usize) -> &CatalogEntry {
        &self.entries[position]
    }

    pub fn group_of(&self, id: &EntryId) -> Option<GroupId> {
        self.get(id).and_then(|entry| entry.group)
    }

    /// Every `(entry id, group id)` pair currently assigned, in snapshot order.
    pub fn group_assignments(&self) -> impl Iterator<Item = (&EntryId, GroupId)> + '_ {
        self.entries
            .iter()
            .filter_map(|entry| entry.group.map(|group| (&entry.id, group)))
    }

    /// Group members keyed by group id; members are listed in snapshot order.
    pub fn groups(&self) -> BTreeMap<GroupId, Vec<&EntryId>> {
        let mut groups: BTreeMap<GroupId, Vec<&EntryId>> = BTreeMap::new();
        for (id, group) in self.group_assignments() {
            groups.entry(group).or_default().push(id);
        }
        groups
    }

    /// Apply a batch of group assignments atomically.
    ///
    /// Every id is resolved before anything changes; on an unknown id the
    /// catalog is left untouched. Returns the number of pairs applied.
    pub fn apply_assignments(&mut self, batch: &GroupAssignments) -> FusionResult<usize> {
        let resolved = batch
            .pairs()
            .iter()
            .map(|(id, group)| {
                self.position_of(id)
                    .map(|pos| (pos, *group))
                    .ok_or_else(|| FusionError::UnknownEntry(id.to_string()))
            })
            .collect::<FusionResult<Vec<_>>>()?;

        if batch.is_reset() {
            self.clear_groups();
        }
        for (pos, group) in &resolved {
            self.entries[*pos].group = Some(*group);
        }

        info!(
            applied = resolved.len(),
            reset = batch.is_reset(),
            "group assignments committed"
        );
        Ok(resolved.len())
    }

    pub fn clear_groups(&mut self) {
        for entry in &mut self.entries {
            entry.group = None;
        }
    }

    pub fn summary(&self) -> CatalogSummary {
        let mut sources: BTreeMap<String, usize> = BTreeMap::new();
        let mut mag_range: Option<(f64, f64)> = None;
        for entry in &self.entries {
            *sources.entry(entry.source.clone()).or_default() += 1;
            mag_range = Some(match mag_range {
                Some((bright, faint)) => (bright.min(entry.mag), faint.max(entry.mag)),
                None => (entry.mag, entry.mag),
            });
        }
        let groups = self.groups();
        CatalogSummary {
            total_entries: self.len(),
            sources,
            groups: groups.len(),
            grouped_entries: groups.values().map(Vec::len).sum(),
            mag_range,
        }
    }
}
