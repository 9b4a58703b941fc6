//! Catalog entry records.
//!
//! A [`CatalogEntry`] is the fixed core every catalog adapter produces:
//! position, brightness, optional parallax, source tag and the optional
//! fusion-group id. Survey-specific columns travel in the open
//! [`CatalogEntry::metadata`] side-map so the geometry code stays strongly
//! typed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque, externally assigned entry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Opaque fusion-group identifier.
///
/// Ids minted by a reset cross-match run start at 1 and follow the snapshot
/// order of each group's first member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

/// A single point-source observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    /// Right ascension, in degrees, `[0, 360)`.
    pub ra_deg: f64,
    /// Declination, in degrees, `[-90, 90]`.
    pub dec_deg: f64,
    /// Apparent magnitude (lower is brighter).
    pub mag: f64,
    /// Trigonometric parallax, in milliarcseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallax_mas: Option<f64>,
    /// Tag of the catalog the observation came from (e.g. `"GAIA"`).
    pub source: String,
    /// Fusion group, absent until a cross-match assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
    /// Source-specific fields that have no place in the core record.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl CatalogEntry {
    pub fn new(
        id: impl Into<EntryId>,
        ra_deg: f64,
        dec_deg: f64,
        mag: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            ra_deg,
            dec_deg,
            mag,
            parallax_mas: None,
            source: source.into(),
            group: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_parallax(mut self, parallax_mas: f64) -> Self {
        self.parallax_mas = Some(parallax_mas);
        self
    }

    pub fn with_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Range-sanity check applied when an entry enters a snapshot.
    ///
    /// Only what the geometry depends on is checked: finite coordinates in
    /// their canonical ranges, a finite magnitude, and a finite parallax when
    /// one is given.
    pub(crate) fn check_ranges(&self) -> Result<(), String> {
        if !self.ra_deg.is_finite() || !(0.0..360.0).contains(&self.ra_deg) {
            return Err(format!("RA {} outside [0, 360)", self.ra_deg));
        }
        if !self.dec_deg.is_finite() || !(-90.0..=90.0).contains(&self.dec_deg) {
            return Err(format!("Dec {} outside [-90, 90]", self.dec_deg));
        }
        if !self.mag.is_finite() {
            return Err(format!("magnitude {} is not finite", self.mag));
        }
        if let Some(parallax) = self.parallax_mas {
            if !parallax.is_finite() {
                return Err(format!("parallax {} is not finite", parallax));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fields() {
        let entry = CatalogEntry::new("hip-32349", 101.287, -16.716, -1.46, "HIPPARCOS")
            .with_parallax(379.21)
            .with_metadata("name", "Sirius");

        assert_eq!(entry.id.as_str(), "hip-32349");
        assert_eq!(entry.parallax_mas, Some(379.21));
        assert_eq!(entry.metadata.get("name").map(String::as_str), Some("Sirius"));
        assert!(entry.group.is_none());
    }

    #[test]
    fn test_check_ranges() {
        assert!(CatalogEntry::new("a", 0.0, -90.0, 1.0, "X").check_ranges().is_ok());
        assert!(CatalogEntry::new("a", 359.999, 90.0, 1.0, "X").check_ranges().is_ok());

        let err = CatalogEntry::new("a", 360.0, 0.0, 1.0, "X").check_ranges().unwrap_err();
        assert!(err.contains("RA"));
        let err = CatalogEntry::new("a", 10.0, 90.5, 1.0, "X").check_ranges().unwrap_err();
        assert!(err.contains("Dec"));
        let err = CatalogEntry::new("a", f64::NAN, 0.0, 1.0, "X").check_ranges().unwrap_err();
        assert!(err.contains("RA"));
        let err = CatalogEntry::new("a", 1.0, 0.0, f64::INFINITY, "X")
            .check_ranges()
            .unwrap_err();
        assert!(err.contains("magnitude"));
        let err = CatalogEntry::new("a", 1.0, 0.0, 1.0, "X")
            .with_parallax(f64::NAN)
            .check_ranges()
            .unwrap_err();
        assert!(err.contains("parallax"));
    }

    #[test]
    fn test_json_shape() {
        let entry = CatalogEntry::new("g-1", 10.0, 45.0, 12.5, "GAIA").with_group(GroupId(7));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], "g-1");
        assert_eq!(json["group"], 7);
        assert!(json.get("parallax_mas").is_none());
        assert!(json.get("metadata").is_none());

        let back: CatalogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_display() {
        assert_eq!(EntryId::new("tyc-1").to_string(), "tyc-1");
        assert_eq!(GroupId(3).to_string(), "G3");
    }
}
