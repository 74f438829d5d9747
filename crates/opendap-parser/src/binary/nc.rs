//! NetCDF payloads (classic CDF-1/2/5 and NetCDF-4/HDF5) read through the
//! native netcdf library.
//!
//! libnetcdf needs a file path, so the payload is staged in a temp file
//! first. On Linux that file lives in `/dev/shm` when it is writable.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Once;

use netcdf::AttributeValue;
use tracing::{debug, warn};

use super::{AttrValue, Container, ContainerVariable, VarData};
use crate::error::{DecodeError, DecodeResult};
use crate::payload::WireFormat;

const HDF5_MAGIC: &[u8] = b"\x89HDF\r\n\x1a\n";

/// Whether the buffer starts with a NetCDF classic or HDF5 signature.
pub fn is_netcdf(data: &[u8]) -> bool {
    data.starts_with(b"CDF") || data.starts_with(HDF5_MAGIC)
}

/// Silence HDF5's automatic error printing to stderr.
///
/// Without this every failed open of a corrupt payload dumps an HDF5
/// diagnostic stack even though the error is handled. Safe to call
/// repeatedly.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 with null handlers only disables printing
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Parse a NetCDF buffer into a container.
///
/// Only an unopenable file is an error. Variables whose values cannot be
/// read are kept as [`VarData::Unreadable`].
pub fn read_container(data: &[u8]) -> DecodeResult<Container> {
    silence_hdf5_errors();

    // Declared before the netcdf handle so the handle closes first
    let mut staged = tempfile::Builder::new()
        .prefix("gldas_payload_")
        .suffix(".nc")
        .tempfile_in(optimal_temp_dir())
        .map_err(|e| DecodeError::IoError(format!("failed to create temp file: {}", e)))?;
    staged
        .write_all(data)
        .and_then(|_| staged.flush())
        .map_err(|e| DecodeError::IoError(format!("failed to stage payload: {}", e)))?;

    let file = netcdf::open(staged.path())
        .map_err(|e| DecodeError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;

    let title = file
        .attributes()
        .find(|a| a.name() == "title")
        .and_then(|a| attr_value(&a))
        .and_then(|v| v.as_text().map(str::to_string));

    let mut variables = Vec::new();
    for var in file.variables() {
        let name = var.name();
        let dims = var.dimensions();

        let attributes: HashMap<String, AttrValue> = var
            .attributes()
            .filter_map(|a| attr_value(&a).map(|v| (a.name().to_string(), v)))
            .collect();

        let values = match read_numeric(&var) {
            Ok(values) => VarData::Numeric(values),
            Err(e) => {
                warn!(variable = %name, error = %e, "NetCDF variable unreadable");
                VarData::Unreadable(e.to_string())
            }
        };

        variables.push(ContainerVariable {
            name,
            dim_names: dims.iter().map(|d| d.name()).collect(),
            shape: dims.iter().map(|d| d.len()).collect(),
            attributes,
            data: values,
        });
    }

    debug!(
        variables = variables.len(),
        bytes = data.len(),
        hdf5 = data.starts_with(HDF5_MAGIC),
        "Parsed NetCDF payload"
    );

    Ok(Container {
        format: WireFormat::NetCdf,
        title,
        variables,
    })
}

/// Read every value as f64, trying the numeric types in turn.
fn read_numeric(var: &netcdf::Variable) -> Result<Vec<f64>, netcdf::Error> {
    macro_rules! widened {
        ($t:ty) => {
            |_| -> Result<Vec<f64>, netcdf::Error> {
                let values: Vec<$t> = var.get_values(..)?;
                Ok(values.into_iter().map(|v| v as f64).collect())
            }
        };
    }

    let values: Result<Vec<f64>, netcdf::Error> = var.get_values(..);
    values
        .or_else(widened!(f32))
        .or_else(widened!(i32))
        .or_else(widened!(i16))
        .or_else(widened!(i8))
        .or_else(widened!(u8))
        .or_else(widened!(u16))
        .or_else(widened!(u32))
        .or_else(widened!(i64))
        .or_else(widened!(u64))
}

fn attr_value(attr: &netcdf::Attribute) -> Option<AttrValue> {
    let value = attr.value().ok()?;
    match value {
        AttributeValue::Str(s) => Some(AttrValue::Text(s)),
        AttributeValue::Strs(v) => v.into_iter().next().map(AttrValue::Text),
        AttributeValue::Doubles(v) => Some(AttrValue::Numbers(v)),
        AttributeValue::Floats(v) => Some(AttrValue::Numbers(
            v.into_iter().map(f64::from).collect(),
        )),
        other => f64::try_from(other)
            .ok()
            .map(|v| AttrValue::Numbers(vec![v])),
    }
}

/// Memory-backed tmpfs on Linux when writable, the system temp dir otherwise.
fn optimal_temp_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let shm = std::path::Path::new("/dev/shm");
        if shm.is_dir() {
            let test_path = shm.join(format!(".gldas_write_test_{}", std::process::id()));
            if std::fs::write(&test_path, b"ok").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return shm.to_path_buf();
            }
        }
    }

    std::env::temp_dir()
}
