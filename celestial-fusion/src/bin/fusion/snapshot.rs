//! Snapshot readers and writers
//!
//! Formats are registered explicitly on a [`SnapshotRegistry`] and picked by
//! file extension. CSV files need `id,ra,dec,mag,source` columns; `parallax`
//! and `group` are optional, and any other column is kept as entry metadata.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use celestial_fusion::{Catalog, CatalogEntry, GroupId};
use tracing::info;

pub trait SnapshotFormat {
    fn name(&self) -> &'static str;

    /// Lowercase extensions, without the dot.
    fn extensions(&self) -> &'static [&'static str];

    fn read(&self, reader: &mut dyn BufRead) -> anyhow::Result<Vec<CatalogEntry>>;

    fn write(&self, entries: &[CatalogEntry], writer: &mut dyn Write) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct SnapshotRegistry {
    formats: Vec<Box<dyn SnapshotFormat>>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the CSV and JSON formats.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CsvSnapshot));
        registry.register(Box::new(JsonSnapshot));
        registry
    }

    pub fn register(&mut self, format: Box<dyn SnapshotFormat>) {
        self.formats.push(format);
    }

    pub fn detect(&self, path: &Path) -> anyhow::Result<&dyn SnapshotFormat> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| anyhow!("{} has no file extension", path.display()))?;
        self.formats
            .iter()
            .find(|format| format.extensions().iter().any(|known| *known == ext))
            .map(|format| &**format)
            .ok_or_else(|| {
                let known: Vec<&str> = self.formats.iter().map(|format| format.name()).collect();
                anyhow!(
                    "No snapshot format for .{} (known: {})",
                    ext,
                    known.join(", ")
                )
            })
    }

    pub fn load(&self, path: &Path) -> anyhow::Result<Catalog> {
        let format = self.detect(path)?;
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let entries = format
            .read(&mut reader)
            .with_context(|| format!("Failed to read {} as {}", path.display(), format.name()))?;
        let catalog = Catalog::from_entries(entries)
            .with_context(|| format!("Invalid snapshot {}", path.display()))?;
        info!(
            path = %path.display(),
            format = format.name(),
            entries = catalog.len(),
            "snapshot loaded"
        );
        Ok(catalog)
    }

    pub fn save(&self, catalog: &Catalog, path: &Path) -> anyhow::Result<()> {
        let format = self.detect(path)?;
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        format.write(catalog.entries(), &mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), entries = catalog.len(), "snapshot written");
        Ok(())
    }
}

const CORE_COLUMNS: [&str; 7] = ["id", "ra", "dec", "mag", "parallax", "source", "group"];

struct ColumnIndices {
    id: usize,
    ra: usize,
    dec: usize,
    mag: usize,
    source: usize,
    parallax: Option<usize>,
    group: Option<usize>,
    metadata: Vec<(String, usize)>,
}

impl ColumnIndices {
    fn from_header(header_line: &str) -> anyhow::Result<Self> {
        let mut col_map: HashMap<&str, usize> = HashMap::new();
        for (idx, col) in header_line.trim().split(',').enumerate() {
            col_map.insert(col.trim(), idx);
        }
        let metadata = col_map
            .iter()
            .filter(|(name, _)| !CORE_COLUMNS.iter().any(|core| *core == **name))
            .map(|(name, &idx)| (name.to_string(), idx))
            .collect();
        Ok(Self {
            id: require_column(&col_map, "id")?,
            ra: require_column(&col_map, "ra")?,
            dec: require_column(&col_map, "dec")?,
            mag: require_column(&col_map, "mag")?,
            source: require_column(&col_map, "source")?,
            parallax: col_map.get("parallax").copied(),
            group: col_map.get("group").copied(),
            metadata,
        })
    }
}

fn require_column(col_map: &HashMap<&str, usize>, name: &str) -> anyhow::Result<usize> {
    col_map
        .get(name)
        .copied()
        .ok_or_else(|| anyhow!("Missing column: {}", name))
}

/// Comma-separated values without quoting; `#` lines are comments.
pub struct CsvSnapshot;

impl CsvSnapshot {
    fn parse_row(
        indices: &ColumnIndices,
        line: &str,
        line_no: usize,
    ) -> anyhow::Result<CatalogEntry> {
        let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
        let field = |idx: usize| fields.get(idx).copied().unwrap_or("");
        let number = |idx: usize, name: &str| -> anyhow::Result<f64> {
            field(idx)
                .parse::<f64>()
                .map_err(|_| anyhow!("line {}: invalid {} '{}'", line_no, name, field(idx)))
        };

        let id = field(indices.id);
        if id.is_empty() {
            bail!("line {}: empty id", line_no);
        }
        let mut entry = CatalogEntry::new(
            id,
            number(indices.ra, "ra")?,
            number(indices.dec, "dec")?,
            number(indices.mag, "mag")?,
            field(indices.source),
        );
        if let Some(idx) = indices.parallax {
            if !field(idx).is_empty() {
                entry.parallax_mas = Some(number(idx, "parallax")?);
            }
        }
        if let Some(idx) = indices.group {
            let raw = field(idx);
            if !raw.is_empty() {
                entry.group = Some(parse_group(raw).ok_or_else(|| {
                    anyhow!("line {}: invalid group '{}'", line_no, raw)
                })?);
            }
        }
        for (name, idx) in &indices.metadata {
            let value = field(*idx);
            if !value.is_empty() {
                entry.metadata.insert(name.clone(), value.to_string());
            }
        }
        Ok(entry)
    }
}

/// Accepts `7` or `G7`.
fn parse_group(raw: &str) -> Option<GroupId> {
    raw.strip_prefix('G')
        .unwrap_or(raw)
        .parse::<u64>()
        .ok()
        .map(GroupId)
}

impl SnapshotFormat for CsvSnapshot {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn read(&self, reader: &mut dyn BufRead) -> anyhow::Result<Vec<CatalogEntry>> {
        let mut lines = reader
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line))
            .filter(|(_, line)| match line {
                Ok(text) => !text.starts_with('#') && !text.trim().is_empty(),
                Err(_) => true,
            });

        let indices = match lines.next() {
            Some((_, header)) => ColumnIndices::from_header(&header?)?,
            None => bail!("EOF before finding header"),
        };

        let mut entries = Vec::new();
        for (line_no, line) in lines {
            entries.push(Self::parse_row(&indices, &line?, line_no)?);
        }
        Ok(entries)
    }

    fn write(&self, entries: &[CatalogEntry], writer: &mut dyn Write) -> anyhow::Result<()> {
        let metadata_keys: BTreeSet<&str> = entries
            .iter()
            .flat_map(|entry| entry.metadata.keys().map(String::as_str))
            .collect();

        let mut header: Vec<&str> = CORE_COLUMNS.to_vec();
        header.extend(metadata_keys.iter().copied());
        writeln!(writer, "{}", header.join(","))?;

        for entry in entries {
            let mut row = vec![
                entry.id.to_string(),
                entry.ra_deg.to_string(),
                entry.dec_deg.to_string(),
                entry.mag.to_string(),
                entry.parallax_mas.map(|p| p.to_string()).unwrap_or_default(),
                entry.source.clone(),
                entry.group.map(|g| g.0.to_string()).unwrap_or_default(),
            ];
            row.extend(
                metadata_keys
                    .iter()
                    .map(|key| entry.metadata.get(*key).cloned().unwrap_or_default()),
            );
            if let Some(field) = row.iter().find(|field| field.contains(',')) {
                bail!("Entry {}: value '{}' contains a comma", entry.id, field);
            }
            writeln!(writer, "{}", row.join(","))?;
        }
        Ok(())
    }
}

/// A JSON array of entries.
pub struct JsonSnapshot;

impl SnapshotFormat for JsonSnapshot {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn read(&self, reader: &mut dyn BufRead) -> anyhow::Result<Vec<CatalogEntry>> {
        Ok(serde_json::from_reader(reader)?)
    }

    fn write(&self, entries: &[CatalogEntry], writer: &mut dyn Write) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, entries)?;
        writeln!(writer)?;
        Ok(())
    }
}
