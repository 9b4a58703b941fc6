use celestial_fusion::{
    angular_separation_deg, bounding_box_for_radius, Catalog, CatalogEntry, CatalogService,
    EngineConfig, EntryId, FetchPolicy, FusionError, GroupId, HealpixIndex, Page, SortedIndex,
};

struct XorShift(u64);

impl XorShift {
    fn next_f64(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Points clustered around a few centres (including the seam and a pole)
/// plus a uniform background.
fn scatter(count: usize, seed: u64) -> Catalog {
    let mut rng = XorShift(seed);
    let centres = [(0.2, 10.0), (359.7, -20.0), (123.0, 88.5), (250.0, -45.0)];
    let entries = (0..count).map(|i| {
        let (ra, dec) = if i % 2 == 0 {
            let (cra, cdec) = centres[i % centres.len()];
            let dec = (cdec + (rng.next_f64() - 0.5) * 3.0).clamp(-90.0, 90.0);
            let ra = (cra + (rng.next_f64() - 0.5) * 6.0).rem_euclid(360.0);
            (ra, dec)
        } else {
            let ra = rng.next_f64() * 360.0;
            let dec = (rng.next_f64() * 2.0 - 1.0).asin().to_degrees();
            (ra, dec)
        };
        let mag = 2.0 + rng.next_f64() * 14.0;
        let source = ["GAIA", "HIPPARCOS", "TYCHO"][i % 3];
        CatalogEntry::new(format!("s{}", i), ra % 360.0, dec, mag, source)
    });
    Catalog::from_entries(entries).unwrap()
}

fn ids_of<'a>(entries: impl Iterator<Item = &'a CatalogEntry>) -> Vec<String> {
    entries.map(|e| e.id.to_string()).collect()
}

#[test]
fn test_separation_symmetry_and_bounds() {
    let catalog = scatter(200, 0x9E37_79B9_7F4A_7C15);
    let entries = catalog.entries();
    for a in entries.iter().take(50) {
        assert_eq!(angular_separation_deg(a.ra_deg, a.dec_deg, a.ra_deg, a.dec_deg), 0.0);
        for b in entries.iter().skip(100) {
            let ab = angular_separation_deg(a.ra_deg, a.dec_deg, b.ra_deg, b.dec_deg);
            let ba = angular_separation_deg(b.ra_deg, b.dec_deg, a.ra_deg, a.dec_deg);
            assert_eq!(ab, ba);
            assert!((0.0..=180.0).contains(&ab));
        }
    }
    assert!((angular_separation_deg(30.0, 40.0, 210.0, -40.0) - 180.0).abs() < 1e-9);
}

#[test]
fn test_cone_matches_brute_force() {
    let catalog = scatter(4000, 42);
    let config = EngineConfig {
        fetch: FetchPolicy::Unbounded,
        ..Default::default()
    };
    let sorted = SortedIndex::build(&catalog);
    let healpix = HealpixIndex::build(&catalog, 6);
    let sorted_service = CatalogService::new(catalog.clone(), sorted, config.clone()).unwrap();
    let healpix_service = CatalogService::new(catalog.clone(), healpix, config).unwrap();

    let cones = [
        (0.0, 10.0, 2.5),
        (359.9, -20.0, 1.0),
        (123.0, 89.5, 2.0),
        (300.0, -89.9, 5.0),
        (250.0, -45.0, 0.5),
        (90.0, 0.0, 30.0),
    ];
    for &(ra, dec, radius) in &cones {
        let mut expected: Vec<(f64, usize)> = catalog
            .entries()
            .iter()
            .enumerate()
            .map(|(pos, e)| (angular_separation_deg(ra, dec, e.ra_deg, e.dec_deg), pos))
            .filter(|(d, _)| *d <= radius)
            .collect();
        expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let expected_ids: Vec<String> = expected
            .iter()
            .map(|(_, pos)| catalog.entries()[*pos].id.to_string())
            .collect();

        for result in [
            sorted_service.engine().search_cone(ra, dec, radius, Page::all()).unwrap(),
            healpix_service.engine().search_cone(ra, dec, radius, Page::all()).unwrap(),
        ] {
            assert_eq!(result.total, expected.len(), "cone ({}, {}, {})", ra, dec, radius);
            assert_eq!(ids_of(result.items.iter().map(|m| m.entry)), expected_ids);
            for pair in result.items.windows(2) {
                assert!(pair[0].distance_deg <= pair[1].distance_deg);
            }
            assert!(result.items.iter().all(|m| m.distance_deg <= radius));
        }
    }
}

#[test]
fn test_box_across_seam() {
    let catalog = Catalog::from_entries(vec![
        CatalogEntry::new("ra359", 359.0, 0.0, 5.0, "GAIA"),
        CatalogEntry::new("ra1", 1.0, 0.0, 5.0, "GAIA"),
        CatalogEntry::new("ra180", 180.0, 0.0, 5.0, "GAIA"),
    ])
    .unwrap();
    let service = CatalogService::with_sorted_index(catalog, EngineConfig::default());
    let result = service
        .engine()
        .search_box(355.0, 5.0, -10.0, 10.0, Page::all())
        .unwrap();
    assert_eq!(ids_of(result.items.iter().copied()), vec!["ra359", "ra1"]);
}

#[test]
fn test_boxes_past_the_seam_agree_across_indexes() {
    let entries = (0..36_000).map(|i| {
        let ra = (i % 3600) as f64 * 0.1;
        let dec = -0.9 + (i / 3600) as f64 * 0.2;
        CatalogEntry::new(format!("g{}", i), ra, dec, 10.0, "GRID")
    });
    let catalog = Catalog::from_entries(entries).unwrap();
    let sorted = CatalogService::with_sorted_index(catalog.clone(), EngineConfig::default());
    let index = HealpixIndex::build(&catalog, 8);
    let healpix = CatalogService::new(catalog, index, EngineConfig::default()).unwrap();

    for (ra_min, ra_max) in [(-10.0, -5.0), (362.0, 364.0), (-3.0, 4.0), (355.0, 5.0)] {
        let expected = sorted
            .engine()
            .search_box(ra_min, ra_max, -1.0, 1.0, Page::all())
            .unwrap();
        let actual = healpix
            .engine()
            .search_box(ra_min, ra_max, -1.0, 1.0, Page::all())
            .unwrap();
        assert_eq!(actual.total, expected.total, "box ({}, {})", ra_min, ra_max);
        assert_eq!(
            ids_of(actual.items.iter().copied()),
            ids_of(expected.items.iter().copied()),
            "box ({}, {})",
            ra_min,
            ra_max
        );
    }
}

#[test]
fn test_pole_bounding_box() {
    let region = bounding_box_for_radius(0.0, 89.0, 2.0);
    assert_eq!(region.ra_min, 0.0);
    assert_eq!(region.ra_max, 360.0);
    assert_eq!(region.dec_max, 90.0);
}

#[test]
fn test_full_sky_box_returns_everything() {
    let catalog = scatter(500, 7);
    let service = CatalogService::with_sorted_index(catalog, EngineConfig::default());
    let result = service
        .engine()
        .search_box(0.0, 360.0, -90.0, 90.0, Page::all())
        .unwrap();
    assert_eq!(result.total, 500);
    assert_eq!(result.len(), 500);
}

#[test]
fn test_inverted_dec_rejected() {
    let service = CatalogService::with_sorted_index(scatter(10, 3), EngineConfig::default());
    let err = service
        .engine()
        .search_box(0.0, 10.0, 20.0, -20.0, Page::all())
        .unwrap_err();
    assert!(matches!(err, FusionError::InvalidRange { .. }));
}

#[test]
fn test_default_overfetch_under_fills_sparse_cone() {
    let catalog = Catalog::from_entries(vec![
        CatalogEntry::new("corner-ne", 180.95, 0.95, 5.0, "GAIA"),
        CatalogEntry::new("corner-sw", 179.05, -0.95, 5.0, "GAIA"),
        CatalogEntry::new("center", 180.0, 0.0, 5.0, "GAIA"),
    ])
    .unwrap();

    let fixed = CatalogService::with_sorted_index(catalog.clone(), EngineConfig::default());
    let result = fixed.engine().search_cone(180.0, 0.0, 1.0, Page::first(1)).unwrap();
    assert!(result.is_empty());

    let adaptive = CatalogService::with_sorted_index(
        catalog,
        EngineConfig {
            fetch: FetchPolicy::Adaptive {
                initial_factor: 2,
                max_rounds: 8,
            },
            ..Default::default()
        },
    );
    let result = adaptive.engine().search_cone(180.0, 0.0, 1.0, Page::first(1)).unwrap();
    assert_eq!(result.items[0].entry.id.as_str(), "center");
}

fn four_entry_catalog() -> Catalog {
    Catalog::from_entries(vec![
        CatalogEntry::new("A", 10.0, 45.0, 5.0, "GAIA"),
        CatalogEntry::new("B", 10.0001, 45.0001, 5.1, "HIPPARCOS"),
        CatalogEntry::new("C", 200.0, -30.0, 8.0, "GAIA"),
        CatalogEntry::new("D", 200.0001, -30.0001, 8.1, "TYCHO"),
    ])
    .unwrap()
}

#[test]
fn test_four_entry_cross_match() {
    let mut service =
        CatalogService::with_sorted_index(four_entry_catalog(), EngineConfig::default());
    let stats = service.cross_match(2.0, true).unwrap();
    assert_eq!(stats.total_entries, 4);
    assert_eq!(stats.groups_created, 2);
    assert_eq!(stats.entries_in_groups, 4);
    assert_eq!(stats.isolated_entries, 0);

    let catalog = service.catalog();
    let group = |id: &str| catalog.group_of(&EntryId::new(id));
    assert_eq!(group("A"), group("B"));
    assert_eq!(group("C"), group("D"));
    assert_ne!(group("A"), group("C"));
}

#[test]
fn test_cross_match_is_idempotent() {
    let catalog = scatter(3000, 99);
    let mut service = CatalogService::with_sorted_index(catalog, EngineConfig::default());

    let first = service.cross_match(3600.0, true).unwrap();
    let first_groups: Vec<(String, GroupId)> = service
        .group_assignments()
        .map(|(id, g)| (id.to_string(), g))
        .collect();

    let second = service.cross_match(3600.0, true).unwrap();
    let second_groups: Vec<(String, GroupId)> = service
        .group_assignments()
        .map(|(id, g)| (id.to_string(), g))
        .collect();

    assert_eq!(first, second);
    assert_eq!(first_groups, second_groups);
    assert!(first.groups_created > 0);
}

#[test]
fn test_transitive_grouping_exceeds_tolerance() {
    let step = 1.5 / 3600.0;
    let catalog = Catalog::from_entries(vec![
        CatalogEntry::new("A", 75.0, -10.0, 5.0, "GAIA"),
        CatalogEntry::new("B", 75.0, -10.0 + step, 5.0, "HIPPARCOS"),
        CatalogEntry::new("C", 75.0, -10.0 + 2.0 * step, 5.0, "TYCHO"),
    ])
    .unwrap();
    let (a, c) = (&catalog.entries()[0], &catalog.entries()[2]);
    assert!(angular_separation_deg(a.ra_deg, a.dec_deg, c.ra_deg, c.dec_deg) > 2.0 / 3600.0);

    let mut service = CatalogService::with_sorted_index(catalog, EngineConfig::default());
    let stats = service.cross_match(2.0, true).unwrap();
    assert_eq!(stats.groups_created, 1);
    let groups = service.catalog().groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups.values().next().map(Vec::len), Some(3));
}

#[test]
fn test_every_grouped_member_has_a_close_partner() {
    let catalog = scatter(2000, 1234);
    let tolerance_arcsec = 1800.0;
    let mut service = CatalogService::with_sorted_index(catalog, EngineConfig::default());
    service.cross_match(tolerance_arcsec, true).unwrap();

    let catalog = service.catalog();
    for members in catalog.groups().values() {
        assert!(members.len() >= 2);
        for id in members {
            let entry = catalog.get(id).unwrap();
            let has_partner = members.iter().filter(|other| *other != id).any(|other| {
                let o = catalog.get(other).unwrap();
                angular_separation_deg(entry.ra_deg, entry.dec_deg, o.ra_deg, o.dec_deg)
                    <= tolerance_arcsec / 3600.0
            });
            assert!(has_partner, "{} has no partner within tolerance", id);
        }
    }
}

#[test]
fn test_incremental_run_keeps_existing_groups() {
    let mut service =
        CatalogService::with_sorted_index(four_entry_catalog(), EngineConfig::default());
    service.cross_match(2.0, true).unwrap();
    let before: Vec<(String, GroupId)> = service
        .group_assignments()
        .map(|(id, g)| (id.to_string(), g))
        .collect();

    let stats = service.cross_match(2.0, false).unwrap();
    assert_eq!(stats.groups_created, 0);
    let after: Vec<(String, GroupId)> = service
        .group_assignments()
        .map(|(id, g)| (id.to_string(), g))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn test_concurrent_searches_share_snapshot() {
    let catalog = scatter(2000, 5);
    let service = CatalogService::with_sorted_index(catalog, EngineConfig::default());
    let engine = service.engine();
    let baseline = engine.search_cone(0.0, 10.0, 3.0, Page::first(25)).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(move || engine.search_cone(0.0, 10.0, 3.0, Page::first(25))))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), baseline);
        }
    });
}
