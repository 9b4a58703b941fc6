//! Result printing in table, JSON and CSV form

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context};
use celestial_fusion::geometry::deg_to_arcsec;
use celestial_fusion::{Catalog, CatalogEntry, ConeMatch, CrossMatchStats, SearchResult};

use crate::cli::OutputFormat;

pub fn print_entries(
    result: &SearchResult<&CatalogEntry>,
    offset: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            for (i, entry) in result.items.iter().enumerate() {
                println!("{:4}: {}", offset + i + 1, entry_row(entry));
            }
            print_footer(result.len(), result.total);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => {
            println!("id,ra_deg,dec_deg,mag,source,group");
            for entry in &result.items {
                println!("{},{}", csv_row(entry)?, group_field(entry));
            }
        }
    }
    Ok(())
}

pub fn print_matches(
    result: &SearchResult<ConeMatch<'_>>,
    offset: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            for (i, m) in result.items.iter().enumerate() {
                println!(
                    "{:4}: {} Dist={:.3}\"",
                    offset + i + 1,
                    entry_row(m.entry),
                    deg_to_arcsec(m.distance_deg)
                );
            }
            print_footer(result.len(), result.total);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => {
            println!("id,ra_deg,dec_deg,mag,source,group,distance_deg");
            for m in &result.items {
                println!(
                    "{},{},{}",
                    csv_row(m.entry)?,
                    group_field(m.entry),
                    m.distance_deg
                );
            }
        }
    }
    Ok(())
}

pub fn print_stats(stats: &CrossMatchStats, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => println!("{}", stats),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stats)?),
        OutputFormat::Csv => {
            println!("total_entries,groups_created,entries_in_groups,isolated_entries");
            println!(
                "{},{},{},{}",
                stats.total_entries,
                stats.groups_created,
                stats.entries_in_groups,
                stats.isolated_entries
            );
        }
    }
    Ok(())
}

/// Write every current `entry_id,group_id` pair, in snapshot order.
pub fn write_assignments(catalog: &Catalog, path: &Path) -> anyhow::Result<usize> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "entry_id,group_id")?;
    let mut written = 0;
    for (id, group) in catalog.group_assignments() {
        writeln!(writer, "{},{}", csv_field(id.as_str())?, group.0)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

fn entry_row(entry: &CatalogEntry) -> String {
    let group = entry
        .group
        .map(|g| g.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:>20} RA={:.6}° Dec={:+.6}° Mag={:5.2} Source={} Group={}",
        entry.id, entry.ra_deg, entry.dec_deg, entry.mag, entry.source, group
    )
}

fn csv_row(entry: &CatalogEntry) -> anyhow::Result<String> {
    Ok(format!(
        "{},{},{},{},{}",
        csv_field(entry.id.as_str())?,
        entry.ra_deg,
        entry.dec_deg,
        entry.mag,
        csv_field(&entry.source)?
    ))
}

/// Fields are written unquoted, so a comma would shift every later column.
fn csv_field(value: &str) -> anyhow::Result<&str> {
    if value.contains(',') {
        bail!("value '{}' contains a comma and cannot be written as CSV", value);
    }
    Ok(value)
}

fn group_field(entry: &CatalogEntry) -> String {
    entry.group.map(|g| g.0.to_string()).unwrap_or_default()
}

fn print_footer(shown: usize, total: usize) {
    if total == 0 {
        println!("No entries found matching the search criteria.");
    } else {
        println!("\nShowing {} of {} results", shown, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use celestial_fusion::GroupId;

    #[test]
    fn test_csv_row() {
        let entry = CatalogEntry::new("gaia-1", 10.5, -3.25, 6.0, "GAIA");
        assert_eq!(csv_row(&entry).unwrap(), "gaia-1,10.5,-3.25,6,GAIA");
    }

    #[test]
    fn test_csv_row_rejects_commas() {
        let entry = CatalogEntry::new("gaia-1", 10.5, -3.25, 6.0, "GAIA,DR3");
        let err = csv_row(&entry).unwrap_err();
        assert!(err.to_string().contains("GAIA,DR3"));

        let entry = CatalogEntry::new("a,b", 10.5, -3.25, 6.0, "GAIA");
        assert!(csv_row(&entry).is_err());
    }

    #[test]
    fn test_write_assignments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.csv");
        let catalog = Catalog::from_entries(vec![
            CatalogEntry::new("a", 1.0, 1.0, 5.0, "X").with_group(GroupId(3)),
            CatalogEntry::new("b", 2.0, 2.0, 5.0, "Y"),
            CatalogEntry::new("c", 1.0, 1.0, 5.0, "Y").with_group(GroupId(3)),
        ])
        .unwrap();

        assert_eq!(write_assignments(&catalog, &path).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "entry_id,group_id\na,3\nc,3\n");
    }

    #[test]
    fn test_write_assignments_rejects_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.csv");
        let catalog = Catalog::from_entries(vec![
            CatalogEntry::new("2MASS J1,2", 1.0, 1.0, 5.0, "X").with_group(GroupId(1)),
        ])
        .unwrap();
        assert!(write_assignments(&catalog, &path).is_err());
    }
}
