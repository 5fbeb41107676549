//! Spreadsheet reading
//!
//! Every input format ends up as a list of [`RawRow`]s: cells bound to the
//! header text exactly as it appears in the sheet. There is no positional
//! column binding; field lookup by header synonym happens in `headers`.

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::NaiveDate;
use encoding_rs::ISO_8859_15;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ImportError;

/// One data row of a sheet, keyed by header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// 1-indexed row number in the source sheet (header row included)
    pub line: usize,
    cells: Vec<(String, Data)>,
}

impl RawRow {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            cells: Vec::new(),
        }
    }

    /// Builder used by tests and by the readers
    pub fn with(mut self, header: &str, value: impl Into<Data>) -> Self {
        self.push(header, value.into());
        self
    }

    pub fn push(&mut self, header: &str, value: Data) {
        self.cells.push((header.to_string(), value));
    }

    /// Cell under an exact header
    pub fn get(&self, header: &str) -> Option<&Data> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, value)| value)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    /// Headers whose cell holds something
    pub fn filled_headers(&self) -> impl Iterator<Item = &str> {
        self.cells
            .iter()
            .filter(|(_, value)| cell_text(value).is_some())
            .map(|(h, _)| h.as_str())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, value)| cell_text(value).is_none())
    }
}

/// Text content of a cell, trimmed; `None` for blank cells
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            // Period columns typed as dates by Excel come back as serials
            let date = excel_serial_to_date(dt.as_f64())?;
            date.format("%Y-%m").to_string()
        }
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let excel_epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    excel_epoch.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

/// Read the rows of a spreadsheet file (auto-detects the format by extension)
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    info!("Reading spreadsheet: {:?} (type: {})", path, extension);

    let rows = match extension.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook(path),
        "csv" | "txt" => read_csv(path),
        _ => return Err(ImportError::UnsupportedFormat(extension).into()),
    };

    rows.map_err(|e| {
        ImportError::UnreadableSheet {
            path: path.display().to_string(),
            reason: format!("{:#}", e),
        }
        .into()
    })
}

fn read_workbook(path: &Path) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path).context("Failed to open workbook")?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("No sheets found in workbook"))?;
    debug!("Using sheet: {}", sheet_name);

    let range = workbook
        .worksheet_range(&sheet_name)
        .context("Failed to read worksheet")?;

    let mut rows_iter = range.rows().enumerate();

    // Header row: first row with any text in it
    let (header_idx, headers) = loop {
        match rows_iter.next() {
            Some((idx, row)) => {
                if row.iter().any(|cell| !cell.is_empty()) {
                    let headers: Vec<Option<String>> = row.iter().map(cell_text).collect();
                    break (idx, headers);
                }
            }
            None => return Err(anyhow!("Could not find a header row")),
        }
    };
    debug!("Header row {}: {:?}", header_idx + 1, headers);

    let mut rows = Vec::new();
    for (idx, row) in rows_iter {
        let mut raw = RawRow::new(idx + 1);
        for (col, header) in headers.iter().enumerate() {
            if let Some(header) = header {
                let value = row.get(col).cloned().unwrap_or(Data::Empty);
                raw.push(header, value);
            }
        }
        if !raw.is_blank() {
            rows.push(raw);
        }
    }

    info!("Read {} data rows from sheet '{}'", rows.len(), sheet_name);
    Ok(rows)
}

fn read_csv(path: &Path) -> Result<Vec<RawRow>> {
    let bytes = std::fs::read(path).context("Failed to read CSV file")?;

    // Spreadsheets saved by Brazilian Excel installs are often Latin-1
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let (decoded, _, _) = ISO_8859_15.decode(e.as_bytes());
            decoded.into_owned()
        }
    };
    let content = content.trim_start_matches('\u{feff}');

    let first_line = content.lines().next().unwrap_or_default();
    let delimiter = if first_line.matches(';').count() >= first_line.matches(',').count() {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(anyhow!("Could not find a header row"));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.context("Failed to read CSV record")?;
        let mut raw = RawRow::new(idx + 2);
        for (col, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = match record.get(col).map(str::trim) {
                Some(field) if !field.is_empty() => Data::String(field.to_string()),
                _ => Data::Empty,
            };
            raw.push(header, value);
        }
        if !raw.is_blank() {
            rows.push(raw);
        }
    }

    info!("Read {} data rows from CSV", rows.len());
    Ok(rows)
}
