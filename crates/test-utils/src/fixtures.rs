//! Common test fixtures for GLDAS tests.
//!
//! This module provides pre-defined test data that represents common
//! scenarios in point extraction.

/// Query locations used across the test suite.
pub mod locations {
    /// Central Illinois; nearest cell is (400, 367).
    pub const CHAMPAIGN: (f64, f64) = (40.1, -88.2);

    /// Cell centers of the 3×3 window around [`CHAMPAIGN`].
    pub const CHAMPAIGN_LATS: [f64; 3] = [39.875, 40.125, 40.375];
    pub const CHAMPAIGN_LONS: [f64; 3] = [-88.375, -88.125, -87.875];

    /// Southern edge of coverage.
    pub const SOUTHERN_LIMIT: (f64, f64) = (-60.0, 0.0);

    /// North pole; clamps to the last row.
    pub const NORTH_POLE: (f64, f64) = (90.0, 0.0);

    /// Below GLDAS coverage (Antarctica).
    pub const ANTARCTICA: (f64, f64) = (-75.0, 0.0);

    /// Date-line longitude written the eastern way.
    pub const DATELINE_EAST: (f64, f64) = (10.0, 180.0);
}

/// Sample OPeNDAP ASCII responses for the window around
/// [`locations::CHAMPAIGN`].
pub mod ascii {
    /// Hyrax Grid layout: one row per latitude, maps after the array.
    /// The center cell of `Tair_f_inst` is 271.2 K; one corner is fill.
    pub const HYRAX_GRID: &str = "\
Dataset: GLDAS_NOAH025_3H.A20230101.0000.021.nc4
Tair_f_inst.Tair_f_inst[0][0], 270.1, 270.2, 270.3
Tair_f_inst.Tair_f_inst[0][1], 271.1, 271.2, 271.3
Tair_f_inst.Tair_f_inst[0][2], 272.1, -9999, 272.3
Tair_f_inst.time, 22280
Tair_f_inst.lat, 39.875, 40.125, 40.375
Tair_f_inst.lon, -88.375, -88.125, -87.875
";

    /// Flat layout with axes declared first and values on the next line.
    pub const HYRAX_FLAT: &str = "\
lat, [3]
39.875, 40.125, 40.375
lon, [3]
-88.375, -88.125, -87.875
time, [1]
22280

Rainf_f_tavg[0][1][1], 0.0001
Rainf_f_tavg[0][1][0], 0.0002
Wind_f_inst[0][1][1], 4.5
";

    /// Valid lines mixed with noise the decoder must reject or skip.
    pub const NOISY: &str = "\
# comment line
lat, 40.125
lon, -88.125
-------------
Tair_f_inst[0][0][0], 280.0
Tair_f_inst[0][0][0] 281.0
Tair_f_inst, 282.0
garbage line without structure
Qair_f_inst[0][0][0], abc, 0.004
Psurf_f_inst[0][0][0], 9.96921e36
";

    /// Axes only; every value is fill.
    pub const ALL_FILL: &str = "\
lat, 40.125
lon, -88.125
Tair_f_inst[0][0][0], -9999
Rainf_f_tavg[0][0][0], -999
";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_shapes() {
        assert!(ascii::HYRAX_GRID.lines().count() >= 6);
        assert_eq!(locations::CHAMPAIGN_LATS.len(), 3);
        assert!(ascii::NOISY.contains("9.96921e36"));
    }
}
