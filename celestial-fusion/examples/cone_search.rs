use celestial_fusion::geometry::deg_to_arcsec;
use celestial_fusion::{Catalog, CatalogEntry, CatalogService, EngineConfig, Page};

fn main() -> anyhow::Result<()> {
    let catalog = Catalog::from_entries(vec![
        CatalogEntry::new("gaia-3017", 83.6331, -5.3911, 6.7, "GAIA"),
        CatalogEntry::new("hip-26221", 83.6332, -5.3910, 6.8, "HIPPARCOS"),
        CatalogEntry::new("gaia-3020", 83.8188, -5.3872, 5.1, "GAIA"),
        CatalogEntry::new("tyc-4774", 83.8188, -5.3871, 5.2, "TYCHO"),
        CatalogEntry::new("gaia-4410", 84.0533, -1.2019, 1.7, "GAIA"),
    ])?;
    let mut service = CatalogService::with_sorted_index(catalog, EngineConfig::default());
    println!("{}", service.catalog().summary());

    let (ra_deg, dec_deg, radius_deg) = (83.633, -5.375, 0.5);
    let results = service
        .engine()
        .search_cone(ra_deg, dec_deg, radius_deg, Page::first(20))?;
    println!(
        "\n{} entries within {:.1}° of ({:.3}, {:.3}):\n",
        results.total, radius_deg, ra_deg, dec_deg,
    );
    for m in &results.items {
        println!(
            "  {:>12}  RA {:.6}°  Dec {:+.6}°  mag {:.2}  dist {:.2}\"",
            m.entry.id,
            m.entry.ra_deg,
            m.entry.dec_deg,
            m.entry.mag,
            deg_to_arcsec(m.distance_deg),
        );
    }

    let stats = service.cross_match(2.0, true)?;
    println!("\n{}\n", stats);
    for (group, members) in service.catalog().groups() {
        let names: Vec<&str> = members.iter().map(|id| id.as_str()).collect();
        println!("  {}: {}", group, names.join(", "));
    }

    Ok(())
}
