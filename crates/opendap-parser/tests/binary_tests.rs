//! Binary decoding against synthetic NetCDF-4 and DODS buffers.

use chrono::{TimeZone, Timelike, Utc};
use opendap_parser::{ContentKind, DecodeError, DecodedPayload, PayloadDecoder, WireFormat};
use test_utils::fixtures::locations::{CHAMPAIGN_LATS, CHAMPAIGN_LONS};
use test_utils::{assert_approx_eq, DodsBuilder, DodsType, NcAttr, NcBuilder, NcType};

const CENTER: (usize, usize) = (400, 367);

fn values_at(payload: &DecodedPayload, variable: &str, cell: (usize, usize)) -> Vec<(usize, f64)> {
    let mut out: Vec<(usize, f64)> = payload
        .samples
        .iter()
        .filter(|s| s.variable == variable && (s.lat_index, s.lon_index) == cell)
        .map(|s| (s.time_index, s.raw_value))
        .collect();
    out.sort_by_key(|(t, _)| *t);
    out
}

/// Two timesteps, a Tair cube with one fill cell, and a static albedo field.
fn champaign_nc() -> Vec<u8> {
    let tair: Vec<f64> = (0..18)
        .map(|i| if i == 4 { -9999.0 } else { 270.0 + i as f64 })
        .collect();
    let albedo: Vec<f64> = (0..9).map(|i| 10.0 + i as f64).collect();

    NcBuilder::new()
        .dimension("time", 2)
        .dimension("lat", 3)
        .dimension("lon", 3)
        .global("title", NcAttr::Text("GLDAS Noah subset".to_string()))
        .variable("time", &["time"], NcType::Double, vec![0.0, 180.0])
        .attribute("units", NcAttr::Text("minutes since 2023-01-01 00:00:00".to_string()))
        .variable("lat", &["lat"], NcType::Float, CHAMPAIGN_LATS.to_vec())
        .variable("lon", &["lon"], NcType::Float, CHAMPAIGN_LONS.to_vec())
        .variable("Tair_f_inst", &["time", "lat", "lon"], NcType::Float, tair)
        .attribute("units", NcAttr::Text("K".to_string()))
        .attribute("_FillValue", NcAttr::Float(-9999.0))
        .variable("Albedo_inst", &["lat", "lon"], NcType::Float, albedo)
        .attribute("units", NcAttr::Text("%".to_string()))
        .build()
}

// ============================================================================
// NetCDF
// ============================================================================

#[test]
fn test_nc_cube_and_axes() {
    let bytes = champaign_nc();
    assert!(bytes.starts_with(b"\x89HDF"));
    let payload = PayloadDecoder::default()
        .decode(&bytes, ContentKind::Binary, None)
        .unwrap();

    assert_eq!(payload.format, WireFormat::NetCdf);
    assert_eq!(payload.title.as_deref(), Some("GLDAS Noah subset"));
    assert_eq!(payload.lat_axis, CHAMPAIGN_LATS.to_vec());
    assert_eq!(payload.time_axis, vec![0.0, 180.0]);
    assert_eq!(payload.units.get("Tair_f_inst").map(String::as_str), Some("K"));

    // center cell is local (1, 1) -> flat 4 (fill) at t=0, 13 at t=1
    assert_eq!(values_at(&payload, "Tair_f_inst", CENTER), vec![(1, 283.0)]);
    assert_eq!(
        values_at(&payload, "Tair_f_inst", (399, 366)),
        vec![(0, 270.0), (1, 279.0)]
    );

    let tair_count = payload
        .samples
        .iter()
        .filter(|s| s.variable == "Tair_f_inst")
        .count();
    assert_eq!(tair_count, 17);
}

#[test]
fn test_nc_static_field_replicated_per_timestep() {
    let payload = PayloadDecoder::default()
        .decode(&champaign_nc(), ContentKind::Binary, None)
        .unwrap();

    let albedo = values_at(&payload, "Albedo_inst", CENTER);
    assert_eq!(albedo, vec![(0, 14.0), (1, 14.0)]);
}

#[test]
fn test_nc_time_units_resolve_timestamps() {
    let payload = PayloadDecoder::default()
        .decode(&champaign_nc(), ContentKind::Binary, None)
        .unwrap();

    let t1 = payload.timestamp_for(1, None).unwrap();
    assert_eq!(t1, Utc.with_ymd_and_hms(2023, 1, 1, 3, 0, 0).unwrap());
}

#[test]
fn test_nc_packed_shorts() {
    let bytes = NcBuilder::new()
        .dimension("time", 1)
        .dimension("lat", 1)
        .dimension("lon", 2)
        .variable("lat", &["lat"], NcType::Float, vec![40.125])
        .variable("lon", &["lon"], NcType::Float, vec![-88.375, -88.125])
        .variable("Tair_f_inst", &["time", "lat", "lon"], NcType::Short, vec![-32767.0, 8515.0])
        .attribute("scale_factor", NcAttr::Float(0.01))
        .attribute("add_offset", NcAttr::Double(200.0))
        .attribute("_FillValue", NcAttr::Short(-32767))
        .build();

    let payload = PayloadDecoder::default()
        .decode(&bytes, ContentKind::Binary, None)
        .unwrap();

    assert_eq!(payload.samples.len(), 1);
    assert_eq!(payload.samples[0].lon_index, 367);
    assert_approx_eq!(payload.samples[0].raw_value, 285.15, 1e-4);
}

#[test]
fn test_nc_scalar_replicated_to_every_cell() {
    let bytes = NcBuilder::new()
        .dimension("lat", 2)
        .dimension("lon", 2)
        .variable("lat", &["lat"], NcType::Float, vec![40.125, 40.375])
        .variable("lon", &["lon"], NcType::Float, vec![-88.125, -87.875])
        .variable("Psurf_f_inst", &[], NcType::Float, vec![98_000.0])
        .build();

    let payload = PayloadDecoder::default()
        .decode(&bytes, ContentKind::Binary, None)
        .unwrap();

    assert_eq!(payload.samples.len(), 4);
    assert!(payload.samples.iter().all(|s| s.raw_value == 98_000.0));
}

#[test]
fn test_nc_without_axes_is_empty() {
    let bytes = NcBuilder::new()
        .dimension("x", 1)
        .variable("Tair_f_inst", &["x"], NcType::Float, vec![280.0])
        .build();

    let err = PayloadDecoder::default()
        .decode(&bytes, ContentKind::Binary, None)
        .unwrap_err();
    assert!(matches!(err, DecodeError::EmptyResponse(_)));
}

#[test]
fn test_nc_truncated_file_is_invalid() {
    let mut bytes = champaign_nc();
    bytes.truncate(bytes.len() / 2);

    let err = PayloadDecoder::default()
        .decode(&bytes, ContentKind::Binary, None)
        .unwrap_err();
    assert!(matches!(err, DecodeError::InvalidFormat(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_corrupt_classic_header_is_invalid() {
    // CDF-1 magic, then a dimension list claiming 2^31 - 1 entries
    let mut bytes = b"CDF\x01".to_vec();
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0x0Au32.to_be_bytes());
    bytes.extend_from_slice(&0x7FFF_FFFFu32.to_be_bytes());
    bytes.extend_from_slice(&[0u8; 16]);

    let err = PayloadDecoder::default()
        .decode(&bytes, ContentKind::Binary, None)
        .unwrap_err();
    assert!(matches!(err, DecodeError::InvalidFormat(_)));
}

// ============================================================================
// DODS
// ============================================================================

fn champaign_dods() -> Vec<u8> {
    let tair: Vec<f64> = (0..18).map(|i| 270.0 + i as f64).collect();
    let albedo: Vec<f64> = (0..9).map(|i| 10.0 + i as f64).collect();
    let time = [0.0, 3.0];

    DodsBuilder::new("GLDAS_NOAH025_3H.A20230101.0000.021.nc4")
        .grid(
            "Tair_f_inst",
            DodsType::Float32,
            &[("time", 2), ("lat", 3), ("lon", 3)],
            &tair,
            &[
                ("time", DodsType::Float64, &time[..]),
                ("lat", DodsType::Float32, &CHAMPAIGN_LATS[..]),
                ("lon", DodsType::Float32, &CHAMPAIGN_LONS[..]),
            ],
        )
        .grid(
            "Albedo_inst",
            DodsType::Float32,
            &[("lat", 3), ("lon", 3)],
            &albedo,
            &[
                ("lat", DodsType::Float32, &CHAMPAIGN_LATS[..]),
                ("lon", DodsType::Float32, &CHAMPAIGN_LONS[..]),
            ],
        )
        .build()
}

#[test]
fn test_dods_grid_cube() {
    let payload = PayloadDecoder::default()
        .decode(&champaign_dods(), ContentKind::Binary, None)
        .unwrap();

    assert_eq!(payload.format, WireFormat::Dods);
    assert_eq!(
        payload.title.as_deref(),
        Some("GLDAS_NOAH025_3H.A20230101.0000.021.nc4")
    );
    assert_eq!(
        values_at(&payload, "Tair_f_inst", CENTER),
        vec![(0, 274.0), (1, 283.0)]
    );
}

#[test]
fn test_dods_albedo_lat_lon_replicated_across_timesteps() {
    let payload = PayloadDecoder::default()
        .decode(&champaign_dods(), ContentKind::Binary, None)
        .unwrap();

    let albedo = values_at(&payload, "Albedo_inst", CENTER);
    assert_eq!(albedo.len(), 2);
    assert!(albedo.iter().all(|(_, v)| *v == 14.0));
}

#[test]
fn test_dods_without_time_units_uses_descriptor() {
    use grid_locator::{GeoPoint, RequestPlanner};

    let planner = RequestPlanner::default();
    let date = chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let requests = planner.plan(GeoPoint::new(40.1, -88.2), date, date).unwrap();

    let payload = PayloadDecoder::default()
        .decode(&champaign_dods(), ContentKind::Binary, Some(&requests[0]))
        .unwrap();

    assert!(payload.time_units.is_none());
    let t1 = payload.timestamp_for(1, Some(&requests[0])).unwrap();
    assert_eq!(t1.hour(), 3);
}

#[test]
fn test_dods_truncated_body_keeps_earlier_variables() {
    let mut bytes = champaign_dods();
    // Cut into the albedo grid's lon map
    bytes.truncate(bytes.len() - 6);

    let payload = PayloadDecoder::default()
        .decode(&bytes, ContentKind::Binary, None)
        .unwrap();

    assert!(payload.variables().contains("Tair_f_inst"));
    assert!(payload.variables().contains("Albedo_inst"));

    // Cut into the albedo array itself
    let mut bytes = champaign_dods();
    bytes.truncate(bytes.len() - 2 * (8 + 12) - 10);
    let payload = PayloadDecoder::default()
        .decode(&bytes, ContentKind::Binary, None)
        .unwrap();

    assert!(payload.failed_variables.contains(&"Albedo_inst".to_string()));
    assert!(payload.variables().contains("Tair_f_inst"));
}

#[test]
fn test_dods_int16_and_byte_arrays() {
    let bytes = DodsBuilder::new("d")
        .array("lat", DodsType::Float32, &[("lat", 1)], &[40.125])
        .array("lon", DodsType::Float32, &[("lon", 3)], &CHAMPAIGN_LONS)
        .array("SoilMoist_flag", DodsType::Byte, &[("lat", 1), ("lon", 3)], &[1.0, 2.0, 3.0])
        .array("Qs_acc", DodsType::Int16, &[("lat", 1), ("lon", 3)], &[-5.0, 0.0, 5.0])
        .build();

    let payload = PayloadDecoder::default()
        .decode(&bytes, ContentKind::Binary, None)
        .unwrap();

    assert_eq!(values_at(&payload, "SoilMoist_flag", CENTER), vec![(0, 2.0)]);
    assert_eq!(values_at(&payload, "Qs_acc", (400, 366)), vec![(0, -5.0)]);
}
