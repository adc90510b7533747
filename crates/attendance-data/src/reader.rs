//! Workbook discovery and loading.
//!
//! Opens spreadsheets with calamine, reads the first worksheet and converts
//! it into rows of [`CellValue`] for the classifier.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use attendance_core::error::{AttendanceError, Result};
use attendance_core::models::{CellValue, Row};
use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use tracing::{debug, warn};

/// File extensions calamine can open.
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

// ── Discovery ─────────────────────────────────────────────────────────────────

/// `true` when the path has a workbook extension (case-insensitive).
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            WORKBOOK_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Find all workbook files recursively under `dir`, sorted by path.
///
/// Office lock files (`~$name.xlsx`) are skipped.
pub fn find_workbooks(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Data path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && is_workbook(entry.path())
                && !entry.file_name().to_string_lossy().starts_with("~$")
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Resolve a configured path to one workbook file.
///
/// A file is returned as-is; a directory yields its most recently modified
/// workbook.
pub fn resolve_workbook(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(AttendanceError::DataPathNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }

    let newest = find_workbooks(path)
        .into_iter()
        .filter_map(|p| modified_time(&p).map(|t| (t, p)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, p)| p);

    match newest {
        Some(p) => {
            debug!("Resolved {} to {}", path.display(), p.display());
            Ok(p)
        }
        None => Err(AttendanceError::DataPathNotFound(path.to_path_buf())),
    }
}

/// Last modification time of `path`, if the filesystem reports one.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Read the first worksheet of a workbook into rows.
///
/// Column indices are absolute: a sheet whose used range starts at column C
/// still puts that cell at index 2.
pub fn read_first_sheet(path: &Path) -> Result<Vec<Row>> {
    std::fs::metadata(path).map_err(|source| AttendanceError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    if !is_workbook(path) {
        return Err(AttendanceError::UnsupportedFormat(path.to_path_buf()));
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| AttendanceError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => {
            return Err(AttendanceError::Workbook {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
        None => return Err(AttendanceError::EmptyWorkbook(path.to_path_buf())),
    };

    let rows = range_to_rows(&range);
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Convert a calamine range into rows anchored at cell A1.
pub fn range_to_rows(range: &Range<Data>) -> Vec<Row> {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Row> = vec![Vec::new(); row_offset];
    for source in range.rows() {
        let mut row: Row = vec![CellValue::Empty; col_offset];
        row.extend(source.iter().map(convert_cell));
        rows.push(row);
    }
    rows
}

/// Map one calamine cell onto [`CellValue`].
pub fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_date() {
            Some(date) => CellValue::Date(date),
            None => CellValue::Text(cell.to_string()),
        },
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
