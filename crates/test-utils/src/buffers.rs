//! Builders for synthetic binary payloads.
//!
//! These produce the same kind of bytes the archive sends for a small
//! subset, so decoder tests don't need network access or large sample files.

/// NetCDF variable types supported by [`NcBuilder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NcType {
    Byte,
    Short,
    Int,
    Float,
    Double,
}

/// Attribute value for [`NcBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub enum NcAttr {
    Text(String),
    Short(i16),
    Float(f32),
    Double(f64),
}

#[derive(Debug, Clone)]
struct NcVar {
    name: String,
    dims: Vec<String>,
    attrs: Vec<(String, NcAttr)>,
    nc_type: NcType,
    values: Vec<f64>,
}

/// Builds NetCDF-4 files through libnetcdf and returns their bytes.
///
/// ```no_run
/// use test_utils::{NcBuilder, NcType};
///
/// let bytes = NcBuilder::new()
///     .dimension("lat", 1)
///     .variable("lat", &["lat"], NcType::Float, vec![40.125])
///     .build();
/// assert_eq!(&bytes[..4], b"\x89HDF");
/// ```
#[derive(Debug, Clone, Default)]
pub struct NcBuilder {
    dims: Vec<(String, usize)>,
    globals: Vec<(String, NcAttr)>,
    vars: Vec<NcVar>,
}

impl NcBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimension(mut self, name: &str, len: usize) -> Self {
        self.dims.push((name.to_string(), len));
        self
    }

    pub fn global(mut self, name: &str, value: NcAttr) -> Self {
        self.globals.push((name.to_string(), value));
        self
    }

    /// Add a variable with values in row-major order.
    pub fn variable(mut self, name: &str, dims: &[&str], nc_type: NcType, values: Vec<f64>) -> Self {
        self.vars.push(NcVar {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            attrs: Vec::new(),
            nc_type,
            values,
        });
        self
    }

    /// Attach an attribute to the most recently added variable.
    pub fn attribute(mut self, name: &str, value: NcAttr) -> Self {
        if let Some(var) = self.vars.last_mut() {
            var.attrs.push((name.to_string(), value));
        }
        self
    }

    /// Write the file and read it back.
    ///
    /// # Panics
    ///
    /// Panics if libnetcdf rejects the layout (unknown dimension, value
    /// count not matching the shape, ...).
    pub fn build(&self) -> Vec<u8> {
        let dir = tempfile::tempdir().expect("failed to create fixture directory");
        let path = dir.path().join("fixture.nc4");
        self.write(&path)
            .unwrap_or_else(|e| panic!("failed to write NetCDF fixture: {}", e));
        std::fs::read(&path).expect("failed to read NetCDF fixture")
    }

    fn write(&self, path: &std::path::Path) -> Result<(), netcdf::Error> {
        let mut file = netcdf::create_with(path, netcdf::Options::NETCDF4)?;

        for (name, len) in &self.dims {
            file.add_dimension(name, *len)?;
        }
        for (name, value) in &self.globals {
            match value {
                NcAttr::Text(s) => file.add_attribute(name, s.as_str())?,
                NcAttr::Short(v) => file.add_attribute(name, *v)?,
                NcAttr::Float(v) => file.add_attribute(name, *v)?,
                NcAttr::Double(v) => file.add_attribute(name, *v)?,
            };
        }

        for var in &self.vars {
            let dims: Vec<&str> = var.dims.iter().map(String::as_str).collect();

            // Attributes go in before the data so _FillValue is accepted
            macro_rules! write_as {
                ($t:ty) => {{
                    let mut nc_var = file.add_variable::<$t>(&var.name, &dims)?;
                    for (name, value) in &var.attrs {
                        match value {
                            NcAttr::Text(s) => nc_var.put_attribute(name, s.as_str())?,
                            NcAttr::Short(v) => nc_var.put_attribute(name, *v)?,
                            NcAttr::Float(v) => nc_var.put_attribute(name, *v)?,
                            NcAttr::Double(v) => nc_var.put_attribute(name, *v)?,
                        };
                    }
                    let values: Vec<$t> = var.values.iter().map(|&v| v as $t).collect();
                    nc_var.put_values(values.as_slice(), ..)?;
                }};
            }

            match var.nc_type {
                NcType::Byte => write_as!(i8),
                NcType::Short => write_as!(i16),
                NcType::Int => write_as!(i32),
                NcType::Float => write_as!(f32),
                NcType::Double => write_as!(f64),
            }
        }

        // Closing flushes the HDF5 superblock
        drop(file);
        Ok(())
    }
}

fn pad_to4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// DAP2 atomic types supported by [`DodsBuilder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DodsType {
    Byte,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl DodsType {
    fn dds_name(&self) -> &'static str {
        match self {
            DodsType::Byte => "Byte",
            DodsType::Int16 => "Int16",
            DodsType::Int32 => "Int32",
            DodsType::Float32 => "Float32",
            DodsType::Float64 => "Float64",
        }
    }

    fn encode(&self, value: f64, out: &mut Vec<u8>) {
        match self {
            DodsType::Byte => out.push(value as u8),
            // 16-bit values travel as 32-bit XDR integers
            DodsType::Int16 | DodsType::Int32 => {
                out.extend_from_slice(&(value as i32).to_be_bytes())
            }
            DodsType::Float32 => out.extend_from_slice(&(value as f32).to_be_bytes()),
            DodsType::Float64 => out.extend_from_slice(&value.to_be_bytes()),
        }
    }
}

/// Builds `.dods` responses.
#[derive(Debug, Clone)]
pub struct DodsBuilder {
    dataset: String,
    dds: Vec<String>,
    body: Vec<u8>,
}

impl DodsBuilder {
    pub fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            dds: Vec::new(),
            body: Vec::new(),
        }
    }

    fn declaration(name: &str, ty: DodsType, dims: &[(&str, usize)]) -> String {
        let dims: String = dims
            .iter()
            .map(|(n, len)| format!("[{} = {}]", n, len))
            .collect();
        format!("{} {}{};", ty.dds_name(), name, dims)
    }

    fn put_array(&mut self, ty: DodsType, values: &[f64]) {
        put_u32(&mut self.body, values.len() as u32);
        put_u32(&mut self.body, values.len() as u32);
        for &v in values {
            ty.encode(v, &mut self.body);
        }
        pad_to4(&mut self.body);
    }

    /// A top-level array.
    pub fn array(mut self, name: &str, ty: DodsType, dims: &[(&str, usize)], values: &[f64]) -> Self {
        self.dds.push(format!("    {}", Self::declaration(name, ty, dims)));
        self.put_array(ty, values);
        self
    }

    /// A top-level scalar.
    pub fn scalar(mut self, name: &str, ty: DodsType, value: f64) -> Self {
        self.dds.push(format!("    {}", Self::declaration(name, ty, &[])));
        ty.encode(value, &mut self.body);
        pad_to4(&mut self.body);
        self
    }

    /// A Grid whose maps are 1-D arrays named after their dimension.
    pub fn grid(
        mut self,
        name: &str,
        ty: DodsType,
        dims: &[(&str, usize)],
        values: &[f64],
        maps: &[(&str, DodsType, &[f64])],
    ) -> Self {
        let mut dds = format!(
            "    Grid {{\n      ARRAY:\n        {}\n      MAPS:\n",
            Self::declaration(name, ty, dims)
        );
        for &(map_name, map_ty, map_values) in maps {
            dds.push_str(&format!(
                "        {}\n",
                Self::declaration(map_name, map_ty, &[(map_name, map_values.len())])
            ));
        }
        dds.push_str(&format!("    }} {};", name));
        self.dds.push(dds);

        self.put_array(ty, values);
        for &(_, map_ty, map_values) in maps {
            self.put_array(map_ty, map_values);
        }
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = format!("Dataset {{\n{}\n}} {};\nData:\n", self.dds.join("\n"), self.dataset)
            .into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nc_builder_writes_hdf5_container() {
        let bytes = NcBuilder::new()
            .dimension("x", 2)
            .variable("v", &["x"], NcType::Short, vec![1.0, 2.0])
            .attribute("units", NcAttr::Text("1".to_string()))
            .build();
        assert_eq!(&bytes[..4], b"\x89HDF");
    }

    #[test]
    fn test_dods_marker_and_body() {
        let bytes = DodsBuilder::new("d")
            .array("v", DodsType::Float32, &[("v", 1)], &[1.5])
            .build();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Float32 v[v = 1];"));
        assert!(text.contains("} d;\nData:\n"));
        assert_eq!(&bytes[bytes.len() - 4..], &1.5f32.to_be_bytes());
    }
}
