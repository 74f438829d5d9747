//! Grid specification and coordinate/index conversion.

use gldas_common::BoundingBox;
use serde::{Deserialize, Serialize};

use crate::error::{LocatorError, LocatorResult};

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point, normalizing longitude into (-180, 180].
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon: normalize_longitude(lon),
        }
    }
}

/// Wrap a longitude into (-180, 180].
pub fn normalize_longitude(lon: f64) -> f64 {
    if !lon.is_finite() {
        return lon;
    }
    let mut l = lon % 360.0;
    if l <= -180.0 {
        l += 360.0;
    } else if l > 180.0 {
        l -= 360.0;
    }
    l
}

/// Row/column of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridIndex {
    pub lat_index: usize,
    pub lon_index: usize,
}

impl GridIndex {
    pub fn new(lat_index: usize, lon_index: usize) -> Self {
        Self {
            lat_index,
            lon_index,
        }
    }

    /// Squared Euclidean distance in index space.
    pub fn distance_sq(&self, other: &GridIndex) -> usize {
        let dy = self.lat_index.abs_diff(other.lat_index);
        let dx = self.lon_index.abs_diff(other.lon_index);
        dy * dy + dx * dx
    }

    /// Combined (Manhattan) index distance.
    pub fn manhattan(&self, other: &GridIndex) -> usize {
        self.lat_index.abs_diff(other.lat_index) + self.lon_index.abs_diff(other.lon_index)
    }
}

/// Inclusive rectangular block of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridWindow {
    pub lat_start: usize,
    pub lat_end: usize,
    pub lon_start: usize,
    pub lon_end: usize,
}

impl GridWindow {
    pub fn lat_count(&self) -> usize {
        self.lat_end - self.lat_start + 1
    }

    pub fn lon_count(&self) -> usize {
        self.lon_end - self.lon_start + 1
    }

    pub fn contains(&self, index: &GridIndex) -> bool {
        (self.lat_start..=self.lat_end).contains(&index.lat_index)
            && (self.lon_start..=self.lon_end).contains(&index.lon_index)
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = GridIndex> + '_ {
        (self.lat_start..=self.lat_end).flat_map(move |lat| {
            (self.lon_start..=self.lon_end).map(move |lon| GridIndex::new(lat, lon))
        })
    }

    /// OPeNDAP hyperslab for the spatial dimensions, e.g. `[400:402][367:369]`.
    pub fn hyperslab(&self) -> String {
        format!(
            "[{}:{}][{}:{}]",
            self.lat_start, self.lat_end, self.lon_start, self.lon_end
        )
    }
}

/// Specification of a regular lat/lon grid.
///
/// Rows run south to north from `lat_origin`, columns west to east from
/// `lon_origin`. Origins are the centers of cell (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of rows (latitude)
    pub nlat: usize,
    /// Number of columns (longitude)
    pub nlon: usize,
    /// Cell size in degrees
    pub resolution: f64,
    /// Latitude of the first row's cell centers
    pub lat_origin: f64,
    /// Longitude of the first column's cell centers
    pub lon_origin: f64,
    /// Southern coverage limit
    pub min_lat: f64,
    /// Northern coverage limit
    pub max_lat: f64,
}

impl GridSpec {
    /// Nearest grid cell for a geographic point.
    ///
    /// Latitudes outside `[min_lat, max_lat]` fail with `OutOfCoverage`.
    /// Points on the outer half-cell of the grid clamp to the edge row/column.
    pub fn locate(&self, point: GeoPoint) -> LocatorResult<GridIndex> {
        let lon = normalize_longitude(point.lon);
        if !point.lat.is_finite()
            || !lon.is_finite()
            || point.lat < self.min_lat
            || point.lat > self.max_lat
        {
            return Err(LocatorError::OutOfCoverage {
                lat: point.lat,
                lon: point.lon,
            });
        }

        Ok(GridIndex {
            lat_index: self.lat_index_for(point.lat),
            lon_index: self.lon_index_for(lon),
        })
    }

    /// Nearest row for a latitude, clamped into the grid.
    pub fn lat_index_for(&self, lat: f64) -> usize {
        clamp_index((lat - self.lat_origin) / self.resolution, self.nlat)
    }

    /// Nearest column for a longitude, clamped into the grid.
    pub fn lon_index_for(&self, lon: f64) -> usize {
        clamp_index(
            (normalize_longitude(lon) - self.lon_origin) / self.resolution,
            self.nlon,
        )
    }

    /// Center of a grid cell.
    pub fn cell_center(&self, index: GridIndex) -> GeoPoint {
        GeoPoint {
            lat: self.lat_origin + index.lat_index as f64 * self.resolution,
            lon: self.lon_origin + index.lon_index as f64 * self.resolution,
        }
    }

    /// Neighborhood of `radius` cells around an index, clamped to the grid.
    ///
    /// There is no wraparound across the longitude seam: a point in the
    /// first column gets a window that starts at column 0.
    pub fn window(&self, index: GridIndex, radius: usize) -> GridWindow {
        GridWindow {
            lat_start: index.lat_index.saturating_sub(radius),
            lat_end: (index.lat_index + radius).min(self.nlat - 1),
            lon_start: index.lon_index.saturating_sub(radius),
            lon_end: (index.lon_index + radius).min(self.nlon - 1),
        }
    }

    /// Geographic extent of a window (cell centers).
    pub fn window_bbox(&self, window: &GridWindow) -> BoundingBox {
        let sw = self.cell_center(GridIndex::new(window.lat_start, window.lon_start));
        let ne = self.cell_center(GridIndex::new(window.lat_end, window.lon_end));
        BoundingBox::new(sw.lon, sw.lat, ne.lon, ne.lat)
    }
}

fn clamp_index(f: f64, n: usize) -> usize {
    let i = f.round();
    if i <= 0.0 {
        0
    } else if i >= (n - 1) as f64 {
        n - 1
    } else {
        i as usize
    }
}

/// Grid definitions.
pub mod grids {
    use super::*;

    /// GLDAS 0.25° land grid: 600 rows from 59.875°S, 1440 columns from 179.875°W.
    pub fn gldas_0p25() -> GridSpec {
        GridSpec {
            nlat: 600,
            nlon: 1440,
            resolution: 0.25,
            lat_origin: -59.875,
            lon_origin: -179.875,
            min_lat: -60.0,
            max_lat: 90.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_origin_cell() {
        let grid = grids::gldas_0p25();
        let idx = grid.locate(GeoPoint::new(-59.875, -179.875)).unwrap();
        assert_eq!(idx, GridIndex::new(0, 0));
    }

    #[test]
    fn test_locate_hand_computed() {
        let grid = grids::gldas_0p25();
        // (40.1 + 59.875) / 0.25 = 399.9 -> 400; (-88.2 + 179.875) / 0.25 = 366.7 -> 367
        let idx = grid.locate(GeoPoint::new(40.1, -88.2)).unwrap();
        assert_eq!(idx, GridIndex::new(400, 367));

        let center = grid.cell_center(idx);
        assert!((center.lat - 40.125).abs() < 1e-9);
        assert!((center.lon - (-88.125)).abs() < 1e-9);
    }

    #[test]
    fn test_locate_edges_clamp() {
        let grid = grids::gldas_0p25();
        assert_eq!(grid.locate(GeoPoint::new(90.0, 180.0)).unwrap(), GridIndex::new(599, 1439));
        assert_eq!(grid.locate(GeoPoint::new(-60.0, -179.99)).unwrap(), GridIndex::new(0, 0));
    }

    #[test]
    fn test_out_of_coverage() {
        let grid = grids::gldas_0p25();
        assert!(matches!(
            grid.locate(GeoPoint::new(-65.0, 10.0)),
            Err(LocatorError::OutOfCoverage { .. })
        ));
        assert!(grid.locate(GeoPoint::new(90.5, 10.0)).is_err());
        assert!(grid.locate(GeoPoint::new(f64::NAN, 10.0)).is_err());
    }

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(190.0), -170.0);
        assert_eq!(normalize_longitude(-180.0), 180.0);
        assert_eq!(normalize_longitude(540.0), 180.0);
        assert_eq!(normalize_longitude(-45.0), -45.0);
    }

    #[test]
    fn test_window_clamped_at_seam() {
        let grid = grids::gldas_0p25();
        let w = grid.window(GridIndex::new(0, 0), 1);
        assert_eq!((w.lat_start, w.lat_end, w.lon_start, w.lon_end), (0, 1, 0, 1));

        let w = grid.window(GridIndex::new(599, 1439), 1);
        assert_eq!((w.lat_start, w.lat_end, w.lon_start, w.lon_end), (598, 599, 1438, 1439));
        assert_eq!(w.cells().count(), 4);
    }

    #[test]
    fn test_window_interior_is_3x3() {
        let grid = grids::gldas_0p25();
        let w = grid.window(GridIndex::new(400, 367), 1);
        assert_eq!(w.lat_count(), 3);
        assert_eq!(w.lon_count(), 3);
        assert_eq!(w.hyperslab(), "[399:401][366:368]");
        assert!(w.contains(&GridIndex::new(401, 366)));
        assert!(!w.contains(&GridIndex::new(402, 366)));
    }
}
