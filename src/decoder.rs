use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

use crate::table::{RawCell, Table};

lazy_static! {
    static ref DATA_URL_REGEX: Regex = Regex::new(r"(?s)^data:([^;,]*)((?:;[^;,]*)*),(.*)$").unwrap();
}

/// A single uploaded file, consumed by [`decode`]
#[derive(Clone, Debug, PartialEq)]
pub struct UploadPayload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadPayload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        UploadPayload {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Builds a payload from a browser `data:<mime>;base64,<payload>` string.
    pub fn from_data_url(filename: impl Into<String>, contents: &str) -> Result<Self, DecodeError> {
        let caps = DATA_URL_REGEX
            .captures(contents.trim())
            .ok_or_else(|| DecodeError::Malformed("upload is not a data URL".to_string()))?;

        let params = caps.get(2).map_or("", |m| m.as_str());
        if !params.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
            return Err(DecodeError::Malformed(
                "data URL is not base64 encoded".to_string(),
            ));
        }

        let encoded = caps.get(3).map_or("", |m| m.as_str());
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DecodeError::Malformed(format!("invalid base64 payload: {}", e)))?;

        Ok(UploadPayload::new(filename, bytes))
    }
}

/// Why an upload could not be turned into a table
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("unsupported file format: {0:?}")]
    UnsupportedFormat(String),

    #[error("malformed upload: {0}")]
    Malformed(String),
}

/// Error kind without the underlying detail, as shown to the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorKind {
    UnsupportedFormat,
    Malformed,
}

impl DecodeError {
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            DecodeError::UnsupportedFormat(_) => DecodeErrorKind::UnsupportedFormat,
            DecodeError::Malformed(_) => DecodeErrorKind::Malformed,
        }
    }
}

/// Source format, chosen from the filename suffix
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Csv,
    Tsv,
    Excel,
}

impl Format {
    pub fn from_filename(filename: &str) -> Result<Self, DecodeError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(Format::Csv),
            Some("tsv") => Ok(Format::Tsv),
            Some("xls") | Some("xlsx") => Ok(Format::Excel),
            Some(ext) => Err(DecodeError::UnsupportedFormat(ext.to_string())),
            None => Err(DecodeError::UnsupportedFormat(String::new())),
        }
    }
}

/// Decode an uploaded file into a table
///
/// The format is taken from the filename suffix: `.csv` and `.tsv` are read
/// as UTF-8 delimited text, `.xls`/`.xlsx` as a workbook (first sheet only).
/// Every failure is returned as a [`DecodeError`]; nothing panics past here.
///
/// # Examples
/// ```
/// use dashboard::decoder::decode;
///
/// let table = decode("data.csv", b"a,b\n1,2\n3,4\n").unwrap();
/// assert_eq!(table.row_count(), 2);
/// assert_eq!(table.column_names(), vec!["a", "b"]);
/// ```
pub fn decode(filename: &str, bytes: &[u8]) -> Result<Table, DecodeError> {
    match Format::from_filename(filename)? {
        Format::Csv => from_delimited(bytes, b','),
        Format::Tsv => from_delimited(bytes, b'\t'),
        Format::Excel => from_excel(bytes),
    }
}

/// Decode a payload, see [`decode`]
pub fn decode_payload(payload: &UploadPayload) -> Result<Table, DecodeError> {
    decode(&payload.filename, &payload.bytes)
}

fn from_delimited(bytes: &[u8], delimiter: u8) -> Result<Table, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::Malformed(format!("file is not valid UTF-8: {}", e)))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader
        .records()
        .filter(|r| !matches!(r, Ok(record) if is_blank(record)));

    let header: Vec<String> = match records.next() {
        Some(record) => record
            .map_err(|e| DecodeError::Malformed(e.to_string()))?
            .iter()
            .map(String::from)
            .collect(),
        None => return Err(DecodeError::Malformed("no columns to parse".to_string())),
    };

    let mut rows = Vec::new();
    for (line, record) in records.enumerate() {
        let record = record.map_err(|e| DecodeError::Malformed(e.to_string()))?;
        if record.len() > header.len() {
            return Err(DecodeError::Malformed(format!(
                "expected {} fields in data row {}, saw {}",
                header.len(),
                line + 1,
                record.len()
            )));
        }
        rows.push(record.iter().map(RawCell::from_text).collect());
    }

    Ok(Table::from_rows(header, rows))
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.len() == 1 && record[0].trim().is_empty()
}

fn from_excel(bytes: &[u8]) -> Result<Table, DecodeError> {
    use calamine::{Data, Reader, open_workbook_auto_from_rs};

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    // Get the first worksheet
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DecodeError::Malformed("no sheets found in workbook".to_string()))?
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let header: Vec<String> = match sheet_rows.next() {
        Some(row) => row
            .iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                Data::Float(f) => crate::table::format_number(*f),
                other => other.to_string(),
            })
            .collect(),
        None => return Err(DecodeError::Malformed("first sheet is empty".to_string())),
    };

    let rows = sheet_rows
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Int(i) => RawCell::from_number(*i as f64),
                    Data::Float(f) => RawCell::from_number(*f),
                    Data::String(s) => RawCell::from_string(s),
                    Data::Empty => RawCell::Missing,
                    // Booleans, dates and cell errors are not numeric
                    other => RawCell::Text(other.to_string()),
                })
                .collect()
        })
        .collect();

    Ok(Table::from_rows(header, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellValue, ColumnKind};

    #[test]
    fn csv_header_and_cells() {
        let table = decode("data.csv", b"a,b\n1,2\n3,4\n").unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.row_count(), 2);
        let a = table.column("a").unwrap();
        assert_eq!(a.kind, ColumnKind::Numeric);
        assert_eq!(a.cells, vec![CellValue::Number(1.0), CellValue::Number(3.0)]);
    }

    #[test]
    fn tsv_uses_tabs() {
        let table = decode("data.tsv", b"name\tscore\nann\t7\nbob\t9\n").unwrap();
        assert_eq!(table.column_names(), vec!["name", "score"]);
        assert_eq!(table.column("name").unwrap().kind, ColumnKind::Text);
        assert_eq!(table.column("score").unwrap().kind, ColumnKind::Numeric);
    }

    #[test]
    fn header_names_are_kept_verbatim() {
        let table = decode("x.csv", b" padded ,\"quoted, name\"\n1,2\n").unwrap();
        assert_eq!(table.column_names(), vec![" padded ", "quoted, name"]);
    }

    #[test]
    fn suffix_is_case_insensitive() {
        assert_eq!(Format::from_filename("DATA.CSV").unwrap(), Format::Csv);
        assert_eq!(Format::from_filename("book.XLSX").unwrap(), Format::Excel);
    }

    #[test]
    fn unknown_suffix_is_unsupported() {
        let err = decode("data.json", b"{}").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::UnsupportedFormat);
        let err = decode("README", b"a,b").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::UnsupportedFormat);
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let err = decode("data.csv", &[0x61, 0x0a, 0xff, 0xfe, 0x0a]).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Malformed);
    }

    #[test]
    fn empty_file_is_malformed() {
        assert_eq!(
            decode("data.csv", b"").unwrap_err().kind(),
            DecodeErrorKind::Malformed
        );
        assert_eq!(
            decode("data.csv", b"\n\n").unwrap_err().kind(),
            DecodeErrorKind::Malformed
        );
    }

    #[test]
    fn overlong_row_is_malformed() {
        let err = decode("data.csv", b"a,b\n1,2,3\n").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Malformed);
    }

    #[test]
    fn blank_lines_and_bom_are_ignored() {
        let table = decode("data.csv", "\u{feff}a,b\n\n1,2\n\n3,4\n".as_bytes()).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn header_only_gives_zero_rows() {
        let table = decode("data.csv", b"a,b\n").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.numeric_columns().count(), 0);
    }

    #[test]
    fn corrupt_workbook_is_malformed() {
        let err = decode("book.xlsx", b"definitely not a zip archive").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Malformed);
    }

    #[test]
    fn data_url_is_base64_decoded() {
        let payload =
            UploadPayload::from_data_url("data.csv", "data:text/csv;base64,YSxiCjEsMgo=").unwrap();
        assert_eq!(payload.bytes, b"a,b\n1,2\n");
        assert_eq!(payload.filename, "data.csv");
    }

    #[test]
    fn bad_data_url_is_malformed() {
        let err = UploadPayload::from_data_url("data.csv", "not a data url").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Malformed);
        let err = UploadPayload::from_data_url("data.csv", "data:text/csv;base64,@@@").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Malformed);
        let err = UploadPayload::from_data_url("data.csv", "data:text/csv,a,b").unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Malformed);
    }
}
