//! Spreadsheet loading.
//!
//! Reads the credential table from a workbook. The first row is the header;
//! `project`, `hostname`, `user` and `password` columns are found by name.
//! Blank `project`/`hostname` cells repeat the value above them, which is
//! how merged cells come out of a workbook.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::debug;

use crate::error::SyncError;
use crate::record::RawRow;

const COLUMNS: [&str; 4] = ["project", "hostname", "user", "password"];

/// Read `sheet` from the workbook at `path` into raw rows.
pub fn load(path: &Path, sheet: &str) -> Result<Vec<RawRow>, SyncError> {
    if !path.exists() {
        return Err(SyncError::Spreadsheet(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| SyncError::Spreadsheet(format!("{}: {}", path.display(), e)))?;

    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(SyncError::Spreadsheet(format!(
            "Sheet '{}' not found in {}",
            sheet,
            path.display()
        )));
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| SyncError::Spreadsheet(format!("Failed to read sheet '{}': {}", sheet, e)))?;

    rows_from_range(&range)
}

fn rows_from_range(range: &Range<Data>) -> Result<Vec<RawRow>, SyncError> {
    // Row numbers are reported as the user sees them in the sheet.
    let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| SyncError::Spreadsheet("Sheet is empty".into()))?;
    let [project_col, hostname_col, user_col, password_col] = locate_columns(header)?;

    let mut out = Vec::new();
    let mut last_project: Option<String> = None;
    let mut last_hostname: Option<String> = None;

    for (offset, cells) in rows.enumerate() {
        let line = first_line + offset + 1;
        if cells.iter().all(|c| cell_text(c).is_none()) {
            debug!(line, "skipping blank row");
            continue;
        }

        let project = cell_at(cells, project_col).or_else(|| last_project.clone());
        let hostname = cell_at(cells, hostname_col).or_else(|| last_hostname.clone());
        last_project = project.clone();
        last_hostname = hostname.clone();

        out.push(RawRow {
            line,
            project,
            hostname,
            user: cell_at(cells, user_col),
            password: cell_at(cells, password_col),
        });
    }

    debug!(rows = out.len(), "loaded sheet");
    Ok(out)
}

fn locate_columns(header: &[Data]) -> Result<[usize; 4], SyncError> {
    let names: Vec<String> = header
        .iter()
        .map(|c| cell_text(c).unwrap_or_default().to_lowercase())
        .collect();

    let mut found = [0usize; 4];
    for (slot, column) in found.iter_mut().zip(COLUMNS) {
        *slot = names.iter().position(|n| n == column).ok_or_else(|| {
            SyncError::Spreadsheet(format!("Header row has no '{}' column", column))
        })?;
    }
    Ok(found)
}

fn cell_at(cells: &[Data], col: usize) -> Option<String> {
    cells.get(col).and_then(cell_text)
}

/// Render a cell as text; `None` for blank or error cells.
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (*f as i64).to_string()
        }
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    };
    (!text.is_empty()).then_some(text)
}
