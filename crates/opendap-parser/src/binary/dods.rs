//! DAP2 `.dods` responses: a DDS text header, a `Data:` marker, then the
//! values in XDR encoding.
//!
//! ```text
//! Dataset {
//!     Grid {
//!       ARRAY:
//!         Float32 Tair_f_inst[time = 1][lat = 3][lon = 3];
//!       MAPS:
//!         Float64 time[time = 1];
//!         Float32 lat[lat = 3];
//!         Float32 lon[lon = 3];
//!     } Tair_f_inst;
//! } GLDAS_NOAH025_3H.A20200101.0000.021.nc4;
//!
//! Data:
//! <xdr>
//! ```
//!
//! Arrays carry their element count twice before the values; scalars carry
//! none. 16-bit integers occupy four bytes on the wire and byte arrays are
//! padded to a multiple of four.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{Container, ContainerVariable, VarData};
use crate::error::{DecodeError, DecodeResult};
use crate::payload::WireFormat;

const DATA_MARKER: &[u8] = b"\nData:\n";

/// Locate the DDS/body boundary.
///
/// Returns `(dds_end, body_start)`.
pub fn find_data_marker(data: &[u8]) -> Option<(usize, usize)> {
    data.windows(DATA_MARKER.len())
        .position(|w| w == DATA_MARKER)
        .map(|pos| (pos, pos + DATA_MARKER.len()))
}

/// DAP2 base types that can appear in a DDS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
    String,
}

impl BaseType {
    fn parse(word: &str) -> Option<Self> {
        let t = match word.to_ascii_lowercase().as_str() {
            "byte" => BaseType::Byte,
            "int16" => BaseType::Int16,
            "uint16" => BaseType::UInt16,
            "int32" => BaseType::Int32,
            "uint32" => BaseType::UInt32,
            "float32" => BaseType::Float32,
            "float64" => BaseType::Float64,
            "string" | "url" => BaseType::String,
            _ => return None,
        };
        Some(t)
    }

    /// Bytes one element occupies inside an XDR array.
    fn wire_size(&self) -> usize {
        match self {
            BaseType::Byte => 1,
            BaseType::Float64 => 8,
            BaseType::String => 0,
            _ => 4,
        }
    }

    fn read(&self, b: &[u8]) -> f64 {
        match self {
            BaseType::Byte => b[0] as f64,
            BaseType::Int16 => i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as i16 as f64,
            BaseType::UInt16 => u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u16 as f64,
            BaseType::Int32 => i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64,
            BaseType::UInt32 => u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64,
            BaseType::Float32 => f32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64,
            BaseType::Float64 => {
                f64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            }
            BaseType::String => f64::NAN,
        }
    }
}

/// One leaf declaration, in body order.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub base: BaseType,
    pub dims: Vec<(String, usize)>,
}

impl Declaration {
    /// Product of the dimension sizes, `None` on overflow.
    fn element_count(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, (_, n)| acc.checked_mul(*n))
    }
}

/// Parsed DDS: dataset name plus flattened leaf declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Dds {
    pub name: String,
    pub declarations: Vec<Declaration>,
}

fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        let is_punct = matches!(c, '{' | '}' | '[' | ']' | ';' | '=' | ':');
        if c.is_whitespace() || is_punct {
            if let Some(s) = start.take() {
                tokens.push(&text[s..i]);
            }
            if is_punct {
                tokens.push(&text[i..i + c.len_utf8()]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

struct DdsParser<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> DdsParser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> DecodeResult<&'a str> {
        let token = self
            .peek()
            .ok_or_else(|| DecodeError::InvalidFormat("unexpected end of DDS".to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, want: &str) -> DecodeResult<()> {
        let got = self.next()?;
        if got.eq_ignore_ascii_case(want) {
            Ok(())
        } else {
            Err(DecodeError::InvalidFormat(format!(
                "DDS: expected '{}', found '{}'",
                want, got
            )))
        }
    }

    fn dataset(&mut self) -> DecodeResult<Dds> {
        self.expect("Dataset")?;
        self.expect("{")?;
        let mut declarations = Vec::new();
        while self.peek() != Some("}") {
            self.declaration(&mut declarations)?;
        }
        self.expect("}")?;
        let name = self.next()?.to_string();
        self.expect(";")?;
        Ok(Dds { name, declarations })
    }

    fn declaration(&mut self, out: &mut Vec<Declaration>) -> DecodeResult<()> {
        let keyword = self.next()?;
        match keyword.to_ascii_lowercase().as_str() {
            "grid" => {
                self.expect("{")?;
                self.expect("ARRAY")?;
                self.expect(":")?;
                self.declaration(out)?;
                self.expect("MAPS")?;
                self.expect(":")?;
                while self.peek() != Some("}") {
                    self.declaration(out)?;
                }
                self.expect("}")?;
                self.next()?;
                self.expect(";")
            }
            "structure" => {
                // Members are flattened; the structure name is dropped
                self.expect("{")?;
                while self.peek() != Some("}") {
                    self.declaration(out)?;
                }
                self.expect("}")?;
                self.next()?;
                self.expect(";")
            }
            "sequence" => Err(DecodeError::UnsupportedFormat(
                "DAP2 Sequence types are not supported".to_string(),
            )),
            word => {
                let base = BaseType::parse(word).ok_or_else(|| {
                    DecodeError::InvalidFormat(format!("DDS: unknown type '{}'", keyword))
                })?;
                let name = self.next()?.to_string();
                let mut dims = Vec::new();
                while self.peek() == Some("[") {
                    self.next()?;
                    let first = self.next()?;
                    let (dim_name, size) = if self.peek() == Some("=") {
                        self.next()?;
                        (first.to_string(), self.next()?)
                    } else {
                        (String::new(), first)
                    };
                    let size: usize = size.parse().map_err(|_| {
                        DecodeError::InvalidFormat(format!("DDS: bad dimension size '{}'", size))
                    })?;
                    self.expect("]")?;
                    dims.push((dim_name, size));
                }
                self.expect(";")?;

                // `lat[3]` on a map names its own dimension
                if dims.len() == 1 && dims[0].0.is_empty() {
                    dims[0].0 = name.clone();
                }
                let decl = Declaration { name, base, dims };
                let bytes = decl
                    .element_count()
                    .and_then(|n| n.checked_mul(base.wire_size()));
                if bytes.is_none() {
                    return Err(DecodeError::InvalidFormat(format!(
                        "DDS: '{}' declares more elements than can be addressed",
                        decl.name
                    )));
                }
                out.push(decl);
                Ok(())
            }
        }
    }
}

/// Parse DDS text into flattened leaf declarations.
pub fn parse_dds(text: &str) -> DecodeResult<Dds> {
    let mut parser = DdsParser {
        tokens: tokenize(text),
        pos: 0,
    };
    parser.dataset()
}

/// XDR reader over the body. Errors carry only the failure reason since
/// the caller decides how truncation propagates.
struct XdrReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> XdrReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        match self.pos.checked_add(n).filter(|&e| e <= self.data.len()) {
            Some(end) => {
                let slice = &self.data[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(DecodeError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.data.len().saturating_sub(self.pos),
            }),
        }
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        self.take((4 - len % 4) % 4)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn scalar(&mut self, base: BaseType) -> Result<VarData, DecodeError> {
        match base {
            BaseType::String => {
                self.string()?;
                Ok(VarData::Text)
            }
            // Scalar bytes are still padded to a full XDR unit
            BaseType::Byte => Ok(VarData::Numeric(vec![self.take(4)?[0] as f64])),
            other => Ok(VarData::Numeric(vec![other.read(self.take(other.wire_size())?)])),
        }
    }

    fn array(&mut self, decl: &Declaration) -> Result<VarData, DecodeError> {
        let count = self.u32()? as usize;

        if decl.base == BaseType::String {
            for _ in 0..count {
                self.string()?;
            }
            return Ok(VarData::Text);
        }

        let repeated = self.u32()? as usize;
        if repeated != count {
            return Err(DecodeError::InvalidFormat(format!(
                "array '{}' length mismatch: {} vs {}",
                decl.name, count, repeated
            )));
        }

        let size = decl.base.wire_size();
        let len = count.checked_mul(size).ok_or_else(|| {
            DecodeError::InvalidFormat(format!(
                "array '{}' length {} overflows",
                decl.name, count
            ))
        })?;
        let raw = self.take(len)?;
        if decl.base == BaseType::Byte {
            self.take((4 - count % 4) % 4)?;
        }
        let values: Vec<f64> = raw.chunks_exact(size).map(|c| decl.base.read(c)).collect();

        match decl.element_count() {
            Some(declared) if declared != count => Ok(VarData::Unreadable(format!(
                "declared {} elements, received {}",
                declared, count
            ))),
            _ => Ok(VarData::Numeric(values)),
        }
    }
}

/// Parse a `.dods` buffer into a container.
pub fn read_container(data: &[u8]) -> DecodeResult<Container> {
    let (dds_end, body_start) = find_data_marker(data).ok_or_else(|| {
        DecodeError::InvalidFormat("DODS payload has no Data: marker".to_string())
    })?;
    let dds_text = String::from_utf8_lossy(&data[..dds_end]);
    let dds = parse_dds(&dds_text)?;

    let mut reader = XdrReader {
        data: &data[body_start..],
        pos: 0,
    };

    let mut variables = Vec::with_capacity(dds.declarations.len());
    let mut broken: Option<String> = None;

    for decl in &dds.declarations {
        let values = match &broken {
            // Once the stream is out of sync nothing after it can be trusted
            Some(reason) => VarData::Unreadable(reason.clone()),
            None => {
                let result = if decl.dims.is_empty() {
                    reader.scalar(decl.base)
                } else {
                    reader.array(decl)
                };
                match result {
                    Ok(values) => values,
                    Err(err) => {
                        warn!(variable = %decl.name, error = %err, "DODS body unreadable");
                        let reason = format!("after '{}': {}", decl.name, err);
                        broken = Some(reason.clone());
                        VarData::Unreadable(reason)
                    }
                }
            }
        };

        variables.push(ContainerVariable {
            name: decl.name.clone(),
            dim_names: decl.dims.iter().map(|(n, _)| n.clone()).collect(),
            shape: decl.dims.iter().map(|(_, s)| *s).collect(),
            attributes: HashMap::new(),
            data: values,
        });
    }

    debug!(
        dataset = %dds.name,
        variables = variables.len(),
        body_bytes = data.len() - body_start,
        "Parsed DODS response"
    );

    Ok(Container {
        format: WireFormat::Dods,
        title: Some(dds.name),
        variables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID_DDS: &str = "Dataset {
    Grid {
      ARRAY:
        Float32 Tair_f_inst[time = 1][lat = 2][lon = 2];
      MAPS:
        Float64 time[time = 1];
        Float32 lat[lat = 2];
        Float32 lon[lon = 2];
    } Tair_f_inst;
} GLDAS_NOAH025_3H.A20200101.0000.021.nc4;";

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Float32 lat[lat = 2];"),
            vec!["Float32", "lat", "[", "lat", "=", "2", "]", ";"]
        );
    }

    #[test]
    fn test_parse_grid_flattens_array_then_maps() {
        let dds = parse_dds(GRID_DDS).unwrap();
        assert_eq!(dds.name, "GLDAS_NOAH025_3H.A20200101.0000.021.nc4");
        let names: Vec<&str> = dds.declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Tair_f_inst", "time", "lat", "lon"]);
        assert_eq!(
            dds.declarations[0].dims,
            vec![
                ("time".to_string(), 1),
                ("lat".to_string(), 2),
                ("lon".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_parse_structure_and_unnamed_dims() {
        let dds = parse_dds("Dataset { Structure { Int32 n; Float32 lat[3]; } s; } d;").unwrap();
        assert_eq!(dds.declarations.len(), 2);
        assert!(dds.declarations[0].dims.is_empty());
        assert_eq!(dds.declarations[1].dims, vec![("lat".to_string(), 3)]);
    }

    #[test]
    fn test_sequence_unsupported() {
        let err = parse_dds("Dataset { Sequence { Int32 a; } s; } d;").unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_int16_occupies_four_bytes() {
        let mut buf = b"Dataset { Int16 v[v = 2]; } d;\nData:\n".to_vec();
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&(-3i32).to_be_bytes());
        buf.extend_from_slice(&7i32.to_be_bytes());
        let container = read_container(&buf).unwrap();
        assert_eq!(container.variables[0].data, VarData::Numeric(vec![-3.0, 7.0]));
    }

    #[test]
    fn test_truncation_poisons_later_items() {
        let mut buf = b"Dataset { Float32 a[a = 2]; Float32 b[b = 1]; } d;\nData:\n".to_vec();
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&1.0f32.to_be_bytes());
        let container = read_container(&buf).unwrap();
        assert!(matches!(container.variables[0].data, VarData::Unreadable(_)));
        assert!(matches!(container.variables[1].data, VarData::Unreadable(_)));
    }
    #[test]
    fn test_dimension_product_overflow_rejected() {
        let err = parse_dds("Dataset { Float32 v[a = 18446744073709551615][b = 2]; } d;")
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFormat(_)));

        let mut buf = b"Dataset { Float64 v[a = 4611686018427387904]; } d;\nData:\n".to_vec();
        buf.extend_from_slice(&1u32.to_be_bytes());
        assert!(read_container(&buf).is_err());
    }

    #[test]
    fn test_huge_wire_count_fails_without_allocating() {
        let mut buf = b"Dataset { Float64 v[v = 2]; } d;\nData:\n".to_vec();
        buf.extend_from_slice(&u32::MAX.to_be_bytes());
        buf.extend_from_slice(&u32::MAX.to_be_bytes());
        buf.extend_from_slice(&1.0f64.to_be_bytes());
        let container = read_container(&buf).unwrap();
        assert!(matches!(container.variables[0].data, VarData::Unreadable(_)));
    }
}
