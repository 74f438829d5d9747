//! Decoder for GLDAS point-subset responses.
//!
//! Three encodings arrive from the archive relay:
//!
//! - OPeNDAP `.ascii` text (several Hyrax layouts, see [`ascii`])
//! - DAP2 `.dods` binary (DDS header + XDR body, see [`binary::dods`])
//! - NetCDF files, classic or NetCDF-4/HDF5 (see [`binary::nc`])
//!
//! All of them decode into a [`DecodedPayload`]: samples at absolute grid
//! indices plus the coordinate axes and declared units. Values stay in the
//! archive's physical units; fill values never appear in the output.

pub mod ascii;
pub mod binary;
pub mod error;
pub mod fill;
pub mod payload;

use grid_locator::{grids, GridSpec, RequestDescriptor};
use serde::{Deserialize, Serialize};

pub use ascii::decode_ascii;
pub use binary::decode_binary;
pub use error::{DecodeError, DecodeResult};
pub use fill::FillPolicy;
pub use payload::{DecodedPayload, VariableSample, WireFormat};

/// How the relay delivered a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Ascii,
    Binary,
}

impl ContentKind {
    /// OPeNDAP response suffix for this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            ContentKind::Ascii => "ascii",
            ContentKind::Binary => "dods",
        }
    }
}

/// Entry point for decoding payloads against one grid.
#[derive(Debug, Clone)]
pub struct PayloadDecoder {
    grid: GridSpec,
}

impl Default for PayloadDecoder {
    fn default() -> Self {
        Self::new(grids::gldas_0p25())
    }
}

impl PayloadDecoder {
    pub fn new(grid: GridSpec) -> Self {
        Self { grid }
    }

    /// Decode one payload.
    ///
    /// `descriptor` supplies the window offset and nominal timestamp when the
    /// payload itself lacks coordinate values or CF time units.
    pub fn decode(
        &self,
        data: &[u8],
        kind: ContentKind,
        descriptor: Option<&RequestDescriptor>,
    ) -> DecodeResult<DecodedPayload> {
        if data.is_empty() {
            return Err(DecodeError::EmptyResponse("zero-length payload".to_string()));
        }

        match kind {
            ContentKind::Ascii => {
                let text = String::from_utf8_lossy(data);
                decode_ascii(&text, &self.grid, descriptor)
            }
            ContentKind::Binary => decode_binary(data, &self.grid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload() {
        let decoder = PayloadDecoder::default();
        for kind in [ContentKind::Ascii, ContentKind::Binary] {
            let err = decoder.decode(b"", kind, None).unwrap_err();
            assert!(matches!(err, DecodeError::EmptyResponse(_)));
        }
    }

    #[test]
    fn test_corrupt_netcdf_headers_invalid() {
        let decoder = PayloadDecoder::default();
        for bytes in [
            &b"\x89HDF\r\n\x1a\n\0\0\0\0"[..],
            &b"CDF\x01"[..],
            &b"CDF\x01\xff\xff\xff\xff\0\0\0\x0a\x7f\xff\xff\xff"[..],
        ] {
            let err = decoder.decode(bytes, ContentKind::Binary, None).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidFormat(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_unknown_binary() {
        let decoder = PayloadDecoder::default();
        let err = decoder
            .decode(b"<html>502 Bad Gateway</html>", ContentKind::Binary, None)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFormat(_)));
    }

    #[test]
    fn test_content_kind_extension() {
        assert_eq!(ContentKind::Ascii.extension(), "ascii");
        assert_eq!(ContentKind::Binary.extension(), "dods");
    }
}
