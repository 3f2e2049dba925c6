//! Predicted-labels side channel (optional evaluator output) — spec §6.
//! One line per test row: `index,true_label,predicted_label`;
//! `predicted_label = -1` signals "no prediction" (e.g. rolling-encoder warm-up).

use std::io::{BufRead, Write};

use crate::error::IoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionRow {
    pub index: usize,
    pub true_label: i64,
    pub predicted_label: Option<i64>,
}

pub fn write_predictions<W: Write>(writer: &mut W, rows: &[PredictionRow]) -> Result<(), IoError> {
    for row in rows {
        let predicted = row.predicted_label.unwrap_or(-1);
        writeln!(writer, "{},{},{}", row.index, row.true_label, predicted)
            .map_err(|source| IoError::Io { source })?;
    }
    Ok(())
}

pub fn read_predictions<R: BufRead>(reader: R) -> Result<Vec<PredictionRow>, IoError> {
    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| IoError::Io { source })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 3 {
            return Err(IoError::ColumnCountMismatch {
                row: line_no,
                expected: 3,
                actual: fields.len(),
            });
        }
        let parse = |col: usize, value: &str| -> Result<i64, IoError> {
            value.parse().map_err(|_| IoError::UnparsableElement {
                row: line_no,
                col,
                value: value.to_string(),
            })
        };
        let index = parse(0, fields[0])? as usize;
        let true_label = parse(1, fields[1])?;
        let predicted = parse(2, fields[2])?;
        rows.push(PredictionRow {
            index,
            true_label,
            predicted_label: if predicted < 0 { None } else { Some(predicted) },
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_predictions() {
        let rows = vec![
            PredictionRow {
                index: 0,
                true_label: 1,
                predicted_label: Some(1),
            },
            PredictionRow {
                index: 1,
                true_label: 0,
                predicted_label: None,
            },
        ];
        let mut buf = Vec::new();
        write_predictions(&mut buf, &rows).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "0,1,1\n1,0,-1\n");
        let parsed = read_predictions(buf.as_slice()).unwrap();
        assert_eq!(parsed, rows);
    }
}
