//! Item-memory CSV round-trip — spec §6.
//!
//! Format: an optional `# key=value,key=value,...` comment line, then one row
//! per hypervector: `D` comma-separated elements (`0`/`1` for Binary, `-1`/`1`
//! for Bipolar). For a precomputed item memory, rows are level-major:
//! `row_index = level*F + feature`.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use crate::error::IoError;
use crate::vsa::{Dimension, HyperVec, Mode};

/// Row encoding selected explicitly by the caller — never inferred from
/// content, per spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    /// One comma-separated element per component.
    Elementwise,
    /// `D` '0'/'1' characters per row, no separators. Logically identical
    /// bit order to `Elementwise` for our packed-bit `HyperVec::Binary`
    /// representation (itself MSB-first within each byte); the spec's
    /// "MSB-first within 32-bit words" note describes how a fixed-width
    /// integer array would pack these same bits, not a different bit order.
    PackedBitstring,
}

pub fn write_header<W: Write>(writer: &mut W, fields: &BTreeMap<String, String>) -> Result<(), IoError> {
    let joined = fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "# {joined}").map_err(|source| IoError::Io { source })
}

pub fn write_vectors<W: Write>(
    writer: &mut W,
    vectors: &[HyperVec],
    format: StoreFormat,
) -> Result<(), IoError> {
    for v in vectors {
        let dim = v.dim();
        let row = match format {
            StoreFormat::Elementwise => (0..dim)
                .map(|i| element_char(v, i))
                .collect::<Vec<_>>()
                .join(","),
            StoreFormat::PackedBitstring => (0..dim).map(|i| if v.get(i) { '1' } else { '0' }).collect(),
        };
        writeln!(writer, "{row}").map_err(|source| IoError::Io { source })?;
    }
    Ok(())
}

fn element_char(v: &HyperVec, index: usize) -> &'static str {
    match v {
        HyperVec::Binary { .. } => {
            if v.get(index) {
                "1"
            } else {
                "0"
            }
        }
        HyperVec::Bipolar { .. } => {
            if v.get(index) {
                "1"
            } else {
                "-1"
            }
        }
    }
}

/// Parse an optional `# key=value,...` header line. Returns `None` if the
/// first line isn't a comment (the caller should then re-feed that line as
/// the first data row).
pub fn parse_header(line: &str) -> Result<Option<BTreeMap<String, String>>, IoError> {
    let Some(rest) = line.strip_prefix('#') else {
        return Ok(None);
    };
    let mut fields = BTreeMap::new();
    for pair in rest.trim().split(',') {
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            return Err(IoError::MalformedHeader {
                message: format!("expected key=value, got {pair:?}"),
            });
        };
        fields.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(Some(fields))
}

pub fn read_vectors<R: BufRead>(
    reader: R,
    dim: Dimension,
    mode: Mode,
    format: StoreFormat,
) -> Result<(Option<BTreeMap<String, String>>, Vec<HyperVec>), IoError> {
    let mut lines = reader.lines();
    let mut header = None;
    let mut first_data_line = None;

    if let Some(first) = lines.next() {
        let first = first.map_err(|source| IoError::Io { source })?;
        match parse_header(&first)? {
            Some(fields) => header = Some(fields),
            None => first_data_line = Some(first),
        }
    }

    let mut vectors = Vec::new();
    let rows = first_data_line.into_iter().chain(lines.map(|l| l.map_err(|source| IoError::Io { source })).collect::<Result<Vec<_>, _>>()?);

    for (row_index, row) in rows.enumerate() {
        let row = row.trim();
        if row.is_empty() {
            continue;
        }
        let hv = parse_row(row, row_index, dim, mode, format)?;
        vectors.push(hv);
    }

    Ok((header, vectors))
}

fn parse_row(
    row: &str,
    row_index: usize,
    dim: Dimension,
    mode: Mode,
    format: StoreFormat,
) -> Result<HyperVec, IoError> {
    let mut hv = HyperVec::zero(dim, mode);
    match format {
        StoreFormat::Elementwise => {
            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() != dim.0 {
                return Err(IoError::ColumnCountMismatch {
                    row: row_index,
                    expected: dim.0,
                    actual: fields.len(),
                });
            }
            for (col, field) in fields.iter().enumerate() {
                let bit = parse_element(field, mode).ok_or_else(|| IoError::UnparsableElement {
                    row: row_index,
                    col,
                    value: field.to_string(),
                })?;
                hv.set_bit(col, bit);
            }
        }
        StoreFormat::PackedBitstring => {
            let chars: Vec<char> = row.chars().collect();
            if chars.len() != dim.0 {
                return Err(IoError::ColumnCountMismatch {
                    row: row_index,
                    expected: dim.0,
                    actual: chars.len(),
                });
            }
            for (col, &ch) in chars.iter().enumerate() {
                let bit = match ch {
                    '0' => false,
                    '1' => true,
                    other => {
                        return Err(IoError::UnparsableElement {
                            row: row_index,
                            col,
                            value: other.to_string(),
                        })
                    }
                };
                hv.set_bit(col, bit);
            }
        }
    }
    Ok(hv)
}

fn parse_element(field: &str, mode: Mode) -> Option<bool> {
    match (mode, field.trim()) {
        (Mode::Binary, "0") => Some(false),
        (Mode::Binary, "1") => Some(true),
        (Mode::Bipolar, "-1") => Some(false),
        (Mode::Bipolar, "1") => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_binary_elementwise() {
        let mut v1 = HyperVec::zero(Dimension(8), Mode::Binary);
        v1.set_bit(0, true);
        v1.set_bit(3, true);
        let mut v2 = HyperVec::zero(Dimension(8), Mode::Binary);
        v2.set_bit(7, true);

        let mut buf = Vec::new();
        write_vectors(&mut buf, &[v1.clone(), v2.clone()], StoreFormat::Elementwise).unwrap();
        let (header, vectors) =
            read_vectors(buf.as_slice(), Dimension(8), Mode::Binary, StoreFormat::Elementwise).unwrap();
        assert!(header.is_none());
        assert_eq!(vectors, vec![v1, v2]);
    }

    #[test]
    fn roundtrip_bipolar_elementwise_with_header() {
        let v = HyperVec::from_vals(4, vec![1, -1, 1, -1]);
        let mut fields = BTreeMap::new();
        fields.insert("dimension".to_string(), "4".to_string());
        fields.insert("num_vectors".to_string(), "1".to_string());

        let mut buf = Vec::new();
        write_header(&mut buf, &fields).unwrap();
        write_vectors(&mut buf, &[v.clone()], StoreFormat::Elementwise).unwrap();

        let (header, vectors) =
            read_vectors(buf.as_slice(), Dimension(4), Mode::Bipolar, StoreFormat::Elementwise).unwrap();
        assert_eq!(header.unwrap().get("dimension").unwrap(), "4");
        assert_eq!(vectors, vec![v]);
    }

    #[test]
    fn roundtrip_packed_bitstring() {
        let mut v = HyperVec::zero(Dimension(6), Mode::Binary);
        v.set_bit(1, true);
        v.set_bit(4, true);
        let mut buf = Vec::new();
        write_vectors(&mut buf, &[v.clone()], StoreFormat::PackedBitstring).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "010010\n");
        let (_, vectors) =
            read_vectors(buf.as_slice(), Dimension(6), Mode::Binary, StoreFormat::PackedBitstring).unwrap();
        assert_eq!(vectors, vec![v]);
    }

    #[test]
    fn column_count_mismatch_detected() {
        let data = "1,0,1\n";
        let result = read_vectors(data.as_bytes(), Dimension(4), Mode::Binary, StoreFormat::Elementwise);
        assert!(matches!(result, Err(IoError::ColumnCountMismatch { .. })));
    }

    #[test]
    fn unparsable_element_detected() {
        let data = "1,0,x,1\n";
        let result = read_vectors(data.as_bytes(), Dimension(4), Mode::Binary, StoreFormat::Elementwise);
        assert!(matches!(result, Err(IoError::UnparsableElement { .. })));
    }

    #[test]
    fn malformed_header_detected() {
        let result = parse_header("# dimension");
        assert!(matches!(result, Err(IoError::MalformedHeader { .. })));
    }
}
