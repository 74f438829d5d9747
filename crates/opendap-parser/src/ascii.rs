//! OPeNDAP ASCII response decoding.
//!
//! Accepted shapes, one per line:
//!
//! ```text
//! lat, 40.125, 40.375, 40.625          coordinate axis inline
//! lat, [3]                             coordinate axis, values on the next line
//! Tair_f_inst.lat, 40.125, ...         Grid map (prefix is ignored)
//! Tair_f_inst[0][1][2], 285.4          one cell
//! Tair_f_inst.Tair_f_inst[0][1], a, b  one row along longitude
//! ```
//!
//! Anything else (headers, separators, `#` comments) is skipped. Lines that
//! look like data but don't parse are counted as rejected.

use grid_locator::{GridSpec, RequestDescriptor};
use tracing::{debug, warn};

use crate::error::{DecodeError, DecodeResult};
use crate::fill::FillPolicy;
use crate::payload::{DecodedPayload, VariableSample, WireFormat};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Lat,
    Lon,
    Time,
}

fn axis_of(name: &str) -> Option<Axis> {
    match name {
        "lat" | "latitude" => Some(Axis::Lat),
        "lon" | "longitude" => Some(Axis::Lon),
        "time" => Some(Axis::Time),
        _ => None,
    }
}

/// Variable name token split into base name and bracketed integers.
#[derive(Debug)]
struct NameToken<'a> {
    base: &'a str,
    indices: Vec<usize>,
}

fn parse_name_token(token: &str) -> Option<NameToken<'_>> {
    let (head, rest) = match token.find('[') {
        Some(pos) => token.split_at(pos),
        None => (token, ""),
    };

    // `Grid.member` -> `member`
    let base = head.rsplit('.').next().unwrap_or(head).trim();
    if base.is_empty() || !base.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let mut indices = Vec::new();
    let mut rest = rest.trim();
    while let Some(stripped) = rest.strip_prefix('[') {
        let end = stripped.find(']')?;
        indices.push(stripped[..end].trim().parse().ok()?);
        rest = stripped[end + 1..].trim_start();
    }
    if !rest.is_empty() {
        return None;
    }

    Some(NameToken { base, indices })
}

fn is_skippable(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("Dataset")
        || line.starts_with("---")
        || line.chars().all(|c| c == '-' || c == '=')
}

/// Parse comma-separated numbers, skipping tokens that are not numeric.
fn parse_numbers<'a>(tokens: impl Iterator<Item = &'a str>) -> (Vec<f64>, usize) {
    let mut values = Vec::new();
    let mut skipped = 0;
    for token in tokens {
        let token = token.trim();
        if token.is_empty() || (token.starts_with('[') && token.ends_with(']')) {
            continue;
        }
        match token.parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) => skipped += 1,
        }
    }
    (values, skipped)
}

/// Decode an ASCII payload.
pub fn decode_ascii(
    text: &str,
    grid: &GridSpec,
    descriptor: Option<&RequestDescriptor>,
) -> DecodeResult<DecodedPayload> {
    let mut payload = DecodedPayload::new(WireFormat::Ascii);
    let fill = FillPolicy::standard();
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    // Pass 1: coordinate axes. Data lines are remembered for pass 2 so
    // axes declared after the data are still honoured.
    let mut data_lines = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        i += 1;
        if is_skippable(line) {
            continue;
        }

        let mut parts = line.split(',');
        let name = parts.next().unwrap_or("").trim();
        let Some(token) = parse_name_token(name) else {
            // A bare row of numbers that no header claimed
            payload.rejected_lines += 1;
            continue;
        };

        let Some(axis) = axis_of(token.base) else {
            data_lines.push(line);
            continue;
        };

        let (mut values, _) = parse_numbers(parts);
        if values.is_empty() {
            // `lat, [3]` style: values follow on the next non-empty line
            while i < lines.len() && lines[i].is_empty() {
                i += 1;
            }
            if i < lines.len() {
                values = parse_numbers(lines[i].split(',')).0;
                i += 1;
            }
        }

        let target = match axis {
            Axis::Lat => &mut payload.lat_axis,
            Axis::Lon => &mut payload.lon_axis,
            Axis::Time => &mut payload.time_axis,
        };

        let single = match (token.indices.as_slice(), values.as_slice()) {
            ([k], [v]) => Some((*k, *v)),
            _ => None,
        };

        if let Some((k, v)) = single {
            // `lat[2], 40.625`: single element at an index
            if target.len() <= k {
                target.resize(k + 1, f64::NAN);
            }
            target[k] = v;
        } else if target.is_empty() {
            // Whole array; first declaration wins (Grid maps repeat it)
            *target = values;
        }
    }

    if payload.lat_axis.is_empty() && payload.lon_axis.is_empty() && payload.time_axis.is_empty() {
        return Err(DecodeError::EmptyResponse(
            "no coordinate arrays in ASCII payload".to_string(),
        ));
    }

    // Pass 2: data lines
    let mut skipped_values = 0;
    for line in data_lines {
        let mut parts = line.split(',');
        let name = parts.next().unwrap_or("").trim();
        let Some(token) = parse_name_token(name) else {
            payload.rejected_lines += 1;
            continue;
        };

        let (values, skipped) = parse_numbers(parts);
        skipped_values += skipped;

        let (t, lat_local, lon_start) = match token.indices.as_slice() {
            [t, lat, lon] => (*t, *lat, *lon),
            [t, lat] => (*t, *lat, 0),
            _ => {
                payload.rejected_lines += 1;
                continue;
            }
        };
        if values.is_empty() {
            payload.rejected_lines += 1;
            continue;
        }

        let Some(lat_index) = absolute_lat(&payload.lat_axis, lat_local, grid, descriptor) else {
            continue;
        };

        for (offset, &value) in values.iter().enumerate() {
            if fill.is_fill(value) {
                continue;
            }
            let lon_local = lon_start + offset;
            let Some(lon_index) = absolute_lon(&payload.lon_axis, lon_local, grid, descriptor)
            else {
                continue;
            };
            payload.samples.push(VariableSample {
                variable: token.base.to_string(),
                time_index: t,
                lat_index,
                lon_index,
                raw_value: value,
            });
        }
    }

    if skipped_values > 0 {
        debug!(skipped = skipped_values, "Skipped non-numeric ASCII values");
    }
    if payload.rejected_lines > 0 {
        warn!(rejected = payload.rejected_lines, "Rejected malformed ASCII lines");
    }

    if payload.samples.is_empty() {
        return Err(DecodeError::EmptyResponse(
            "no variable samples in ASCII payload".to_string(),
        ));
    }

    Ok(payload)
}

fn absolute_lat(
    axis: &[f64],
    local: usize,
    grid: &GridSpec,
    descriptor: Option<&RequestDescriptor>,
) -> Option<usize> {
    match axis.get(local) {
        Some(v) if v.is_finite() => Some(grid.lat_index_for(*v)),
        _ => descriptor.map(|d| d.window.lat_start + local),
    }
}

fn absolute_lon(
    axis: &[f64],
    local: usize,
    grid: &GridSpec,
    descriptor: Option<&RequestDescriptor>,
) -> Option<usize> {
    match axis.get(local) {
        Some(v) if v.is_finite() => Some(grid.lon_index_for(*v)),
        _ => descriptor.map(|d| d.window.lon_start + local),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_locator::grids;

    #[test]
    fn test_parse_name_token_forms() {
        let t = parse_name_token("Tair_f_inst[0][1][2]").unwrap();
        assert_eq!(t.base, "Tair_f_inst");
        assert_eq!(t.indices, vec![0, 1, 2]);

        let t = parse_name_token("Tair_f_inst.Tair_f_inst[0][1]").unwrap();
        assert_eq!(t.base, "Tair_f_inst");
        assert_eq!(t.indices, vec![0, 1]);

        let t = parse_name_token("Tair_f_inst.lat").unwrap();
        assert_eq!(t.base, "lat");
        assert!(t.indices.is_empty());

        assert!(parse_name_token("Tair f inst[0]").is_none());
        assert!(parse_name_token("Tair[0]junk").is_none());
        assert!(parse_name_token("Tair[x]").is_none());
    }

    #[test]
    fn test_next_line_axis_form() {
        let text = "lat, [2]\n40.125, 40.375\nlon, [1]\n-88.125\nTair_f_inst[0][1][0], 280.0\n";
        let payload = decode_ascii(text, &grids::gldas_0p25(), None).unwrap();
        assert_eq!(payload.lat_axis, vec![40.125, 40.375]);
        assert_eq!(payload.samples.len(), 1);
        assert_eq!(payload.samples[0].lat_index, 401);
        assert_eq!(payload.samples[0].lon_index, 367);
    }

    #[test]
    fn test_indexed_axis_elements() {
        let text = "lat[0], 40.125\nlat[1], 40.375\nlon, -88.125\nTair_f_inst[0][1][0], 280.0\n";
        let payload = decode_ascii(text, &grids::gldas_0p25(), None).unwrap();
        assert_eq!(payload.lat_axis, vec![40.125, 40.375]);
    }
}
