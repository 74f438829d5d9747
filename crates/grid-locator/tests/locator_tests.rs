//! Property-style tests for the GLDAS grid locator.

use grid_locator::{grids, GeoPoint, GridIndex};

// ============================================================================
// Round-trip tests
// ============================================================================

#[test]
fn test_cell_center_within_half_resolution() {
    let grid = grids::gldas_0p25();

    // Sweep the full coverage with an irregular step so points land
    // everywhere inside cells, not only on centers or edges.
    let mut lat = -60.0;
    while lat <= 90.0 {
        let mut lon = -179.99;
        while lon <= 180.0 {
            let point = GeoPoint::new(lat, lon);
            let idx = grid.locate(point).unwrap();
            let center = grid.cell_center(idx);

            assert!(
                (center.lat - point.lat).abs() <= 0.125 + 1e-9,
                "lat {} -> center {}",
                point.lat,
                center.lat
            );
            assert!(
                (center.lon - point.lon).abs() <= 0.125 + 1e-9,
                "lon {} -> center {}",
                point.lon,
                center.lon
            );
            lon += 0.733;
        }
        lat += 0.377;
    }
}

#[test]
fn test_indices_stay_in_bounds() {
    let grid = grids::gldas_0p25();
    for &(lat, lon) in &[(-60.0, -180.0), (90.0, 180.0), (0.0, 0.0), (89.99, -0.01)] {
        let idx = grid.locate(GeoPoint::new(lat, lon)).unwrap();
        assert!(idx.lat_index <= 599);
        assert!(idx.lon_index <= 1439);
    }
}

#[test]
fn test_center_of_every_row_locates_back() {
    let grid = grids::gldas_0p25();
    for row in 0..grid.nlat {
        let idx = GridIndex::new(row, 720);
        assert_eq!(grid.locate(grid.cell_center(idx)).unwrap(), idx);
    }
}

// ============================================================================
// Window tests
// ============================================================================

#[test]
fn test_window_always_contains_target() {
    let grid = grids::gldas_0p25();
    for &(lat, lon) in &[(-59.9, -179.9), (89.9, 179.9), (40.0, -88.0)] {
        let idx = grid.locate(GeoPoint::new(lat, lon)).unwrap();
        let window = grid.window(idx, 1);
        assert!(window.contains(&idx));
        assert!(window.lat_count() <= 3 && window.lon_count() <= 3);
    }
}

#[test]
fn test_window_bbox_spans_cell_centers() {
    let grid = grids::gldas_0p25();
    let idx = grid.locate(GeoPoint::new(40.1, -88.2)).unwrap();
    let bbox = grid.window_bbox(&grid.window(idx, 1));
    assert!((bbox.width() - 0.5).abs() < 1e-9);
    assert!((bbox.height() - 0.5).abs() < 1e-9);
    assert!(bbox.contains_point(-88.2, 40.1));
}
