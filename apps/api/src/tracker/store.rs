//! Record Store: whole-file persistence of one partition's tracker.
//!
//! The engine only talks to [`RecordStore`]; `XlsxStore` is the spreadsheet
//! implementation. Every call reads or rewrites the entire file.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::debug;

use crate::tracker::schema::NUMERIC_COLUMNS;
use crate::tracker::table::{Row, Table};
use crate::tracker::TrackerError;

const SHEET_NAME: &str = "Sheet1";

pub trait RecordStore: Send + Sync {
    /// Reads the whole table. A file that does not exist is an empty table;
    /// a file that exists but cannot be parsed is `StoreUnreadable`.
    fn load(&self, path: &Path) -> Result<Table, TrackerError>;

    /// Replaces the file with `table`.
    fn persist(&self, path: &Path, table: &Table) -> Result<(), TrackerError>;
}

/// Single-sheet `.xlsx` tracker with one header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxStore;

impl RecordStore for XlsxStore {
    fn load(&self, path: &Path) -> Result<Table, TrackerError> {
        if !path.exists() {
            return Ok(Table::default());
        }

        let unreadable = |reason: String| TrackerError::StoreUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| unreadable("workbook has no sheets".to_string()))?
            .map_err(|e| unreadable(e.to_string()))?;

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(Table::default());
        };

        // Blank header cells have no column to live in; their data is dropped.
        let mut headers: Vec<Option<String>> = Vec::with_capacity(header.len());
        let mut columns: Vec<String> = Vec::new();
        for cell in header {
            let name = cell_text(cell).trim().to_string();
            if name.is_empty() || columns.contains(&name) {
                headers.push(None);
            } else {
                columns.push(name.clone());
                headers.push(Some(name));
            }
        }

        let mut table = Table::new(columns);
        for cells in rows {
            if cells.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }
            let row: Row = headers
                .iter()
                .zip(cells)
                .filter_map(|(name, cell)| name.as_ref().map(|n| (n.clone(), cell_text(cell))))
                .collect();
            table.push_row(row);
        }

        debug!(
            "Loaded {} tracker rows from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    fn persist(&self, path: &Path, table: &Table) -> Result<(), TrackerError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| TrackerError::io(dir, e))?;

        let write_err = |reason: String| TrackerError::Write {
            path: path.to_path_buf(),
            reason,
        };

        let mut workbook = Workbook::new();
        {
            let sheet = workbook
                .add_worksheet()
                .set_name(SHEET_NAME)
                .map_err(|e| write_err(e.to_string()))?;
            write_sheet(sheet, table).map_err(write_err)?;
        }

        // Write beside the target and rename over it so a failed save leaves
        // the previous tracker intact.
        let staging = tempfile::Builder::new()
            .prefix(".tracker-")
            .suffix(".xlsx")
            .tempfile_in(dir)
            .map_err(|e| TrackerError::io(dir, e))?;
        workbook
            .save(staging.path())
            .map_err(|e| write_err(e.to_string()))?;
        staging
            .persist(path)
            .map_err(|e| TrackerError::io(path, e.error))?;

        debug!("Persisted {} tracker rows to {}", table.len(), path.display());
        Ok(())
    }
}

fn write_sheet(sheet: &mut Worksheet, table: &Table) -> Result<(), String> {
    let columns = table.columns();
    for (c, name) in columns.iter().enumerate() {
        let col = col_num(c)?;
        sheet.write_string(0, col, name).map_err(|e| e.to_string())?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let row_num = u32::try_from(r + 1).map_err(|_| "too many rows".to_string())?;
        for (c, name) in columns.iter().enumerate() {
            let col = col_num(c)?;
            let value = row.get(name);
            if value.is_empty() {
                continue;
            }
            let number = NUMERIC_COLUMNS
                .contains(&name.as_str())
                .then(|| value.trim().parse::<f64>().ok())
                .flatten();
            match number {
                Some(n) => sheet.write_number(row_num, col, n),
                None => sheet.write_string(row_num, col, value),
            }
            .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

fn col_num(index: usize) -> Result<u16, String> {
    u16::try_from(index).map_err(|_| format!("column index {index} out of range"))
}

/// Cell text as the engine sees it. Whole floats lose their `.0`, Excel
/// date serials become `YYYY-MM-DD`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{e:?}"),
    }
}

/// 1900 date system; serial 1 is 1900-01-01 with the Lotus leap-year quirk
/// absorbed by the 1899-12-30 epoch.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.floor() as i64))
}
