//! Main analysis pipeline for the attendance report.
//!
//! Loads a workbook, classifies its rows, builds the department hierarchy and
//! aggregates statistics, returning an [`AnalysisResult`] ready for rendering.
//! A hierarchy exported as JSON can be loaded in place of a workbook.

use std::path::Path;

use attendance_core::models::{AttendanceRecord, Department, Row};
use chrono::Utc;
use tracing::{debug, warn};

use crate::aggregator::{AggregateOptions, AttendanceStats, StatsAggregator};
use crate::export::load_hierarchy;
use crate::hierarchy::{flatten, parse_sheet};
use crate::reader::read_first_sheet;

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Workbook the rows came from, if any.
    pub source: Option<String>,
    /// Number of spreadsheet rows read.
    pub rows_read: usize,
    /// Number of attendance records emitted by the classifier.
    pub records_parsed: usize,
    /// Number of departments in the hierarchy.
    pub departments_found: usize,
    /// Wall-clock seconds spent reading the workbook.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent classifying and aggregating.
    pub parse_time_seconds: f64,
    /// Why loading failed; `None` on success.
    pub load_error: Option<String>,
}

/// The complete output of one load.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisResult {
    pub departments: Vec<Department>,
    pub records: Vec<AttendanceRecord>,
    /// `None` when the sheet held no attendance.
    pub statistics: Option<AttendanceStats>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// `true` when nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run classification and aggregation over rows already in memory.
pub fn analyze_rows(rows: &[Row], source: Option<&Path>, options: &AggregateOptions) -> AnalysisResult {
    let parse_start = std::time::Instant::now();
    let parsed = parse_sheet(rows);
    let statistics = StatsAggregator::aggregate(&parsed.departments, options);
    let parse_time = parse_start.elapsed().as_secs_f64();

    debug!(
        "Parsed {} rows into {} records across {} departments",
        rows.len(),
        parsed.records.len(),
        parsed.departments.len()
    );

    AnalysisResult {
        metadata: AnalysisMetadata {
            generated_at: Utc::now().to_rfc3339(),
            source: source.map(|p| p.display().to_string()),
            rows_read: rows.len(),
            records_parsed: parsed.records.len(),
            departments_found: parsed.departments.len(),
            load_time_seconds: 0.0,
            parse_time_seconds: parse_time,
            load_error: None,
        },
        departments: parsed.departments,
        records: parsed.records,
        statistics,
    }
}

/// Run the full pipeline against a workbook file.
///
/// 1. Read the first worksheet.
/// 2. Classify rows and build the hierarchy.
/// 3. Aggregate statistics.
///
/// A read failure is not propagated: it is logged, recorded in
/// [`AnalysisMetadata::load_error`], and an empty result is returned.
pub fn analyze_workbook(path: &Path, options: &AggregateOptions) -> AnalysisResult {
    // ── Step 1: Load rows ─────────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let loaded = read_first_sheet(path);
    let load_time = load_start.elapsed().as_secs_f64();

    let (rows, load_error) = match loaded {
        Ok(rows) => (rows, None),
        Err(e) => {
            warn!("Could not load attendance from {}: {}", path.display(), e);
            (Vec::new(), Some(e.to_string()))
        }
    };

    // ── Steps 2-3: Parse and aggregate ────────────────────────────────────────
    let mut result = analyze_rows(&rows, Some(path), options);
    result.metadata.load_time_seconds = load_time;
    result.metadata.load_error = load_error;
    result
}

/// Load an exported hierarchy (`.json`) instead of a workbook.
///
/// Failures follow [`analyze_workbook`]: logged, recorded in
/// [`AnalysisMetadata::load_error`], empty result.
pub fn analyze_export(path: &Path, options: &AggregateOptions) -> AnalysisResult {
    let load_start = std::time::Instant::now();
    let (departments, load_error) = match load_hierarchy(path) {
        Ok(departments) => (departments, None),
        Err(e) => {
            warn!("Could not load attendance from {}: {}", path.display(), e);
            (Vec::new(), Some(e.to_string()))
        }
    };
    let load_time = load_start.elapsed().as_secs_f64();

    let parse_start = std::time::Instant::now();
    let records = flatten(&departments);
    let statistics = StatsAggregator::aggregate(&departments, options);
    let parse_time = parse_start.elapsed().as_secs_f64();

    AnalysisResult {
        metadata: AnalysisMetadata {
            generated_at: Utc::now().to_rfc3339(),
            source: Some(path.display().to_string()),
            rows_read: 0,
            records_parsed: records.len(),
            departments_found: departments.len(),
            load_time_seconds: load_time,
            parse_time_seconds: parse_time,
            load_error,
        },
        departments,
        records,
        statistics,
    }
}

/// `true` for files [`analyze_path`] reads as an exported hierarchy.
pub fn is_export(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Dispatch on the file type: `.json` exports go through
/// [`analyze_export`], everything else through [`analyze_workbook`].
pub fn analyze_path(path: &Path, options: &AggregateOptions) -> AnalysisResult {
    if is_export(path) {
        analyze_export(path, options)
    } else {
        analyze_workbook(path, options)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::models::CellValue;
    use tempfile::TempDir;

    fn cells(values: &[&str]) -> Row {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::from(*v)
                }
            })
            .collect()
    }

    fn sample_rows() -> Vec<Row> {
        vec![
            cells(&["Отделение информационных технологий"]),
            cells(&["21-ИС-1"]),
            cells(&["Иванов Иван Иванович"]),
            cells(&["01.09.2024", "", "", "", "", "3"]),
            cells(&["02.09.2024", "", "", "", "", "0"]),
        ]
    }

    // ── analyze_rows ──────────────────────────────────────────────────────────

    #[test]
    fn test_analyze_rows_populates_everything() {
        let result = analyze_rows(&sample_rows(), None, &AggregateOptions::default());

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.departments.len(), 1);
        assert_eq!(result.metadata.rows_read, 5);
        assert_eq!(result.metadata.records_parsed, 1);
        assert_eq!(result.metadata.departments_found, 1);
        assert!(result.metadata.load_error.is_none());

        let stats = result.statistics.expect("statistics for a populated sheet");
        assert_eq!(stats.total_missed, 3);
        assert_eq!(stats.total_students, 1);
    }

    #[test]
    fn test_analyze_rows_is_idempotent() {
        let a = analyze_rows(&sample_rows(), None, &AggregateOptions::default());
        let b = analyze_rows(&sample_rows(), None, &AggregateOptions::default());
        assert_eq!(a.records, b.records);
        assert_eq!(a.departments, b.departments);
        assert_eq!(a.statistics, b.statistics);
    }

    #[test]
    fn test_analyze_rows_empty() {
        let result = analyze_rows(&[], None, &AggregateOptions::default());
        assert!(result.is_empty());
        assert!(result.statistics.is_none());
    }

    // ── analyze_workbook ──────────────────────────────────────────────────────

    #[test]
    fn test_analyze_workbook_missing_file_is_empty_result() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attendance.xlsx");
        let result = analyze_workbook(&path, &AggregateOptions::default());

        assert!(result.is_empty());
        assert!(result.statistics.is_none());
        assert!(result.metadata.load_error.is_some());
        assert_eq!(result.metadata.source.as_deref(), Some(path.display().to_string().as_str()));
    }

    #[test]
    fn test_analyze_workbook_unsupported_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attendance.txt");
        std::fs::write(&path, "Отделение ИТ").unwrap();
        let result = analyze_workbook(&path, &AggregateOptions::default());

        assert!(result.is_empty());
        let err = result.metadata.load_error.unwrap();
        assert!(err.contains("Unsupported workbook format"), "got: {err}");
    }

    // ── exported hierarchy ────────────────────────────────────────────────────

    #[test]
    fn test_analyze_path_reads_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attendance.json");
        let from_rows = analyze_rows(&sample_rows(), None, &AggregateOptions::default());
        crate::export::export_hierarchy(&from_rows.departments, &path).unwrap();

        let result = analyze_path(&path, &AggregateOptions::default());
        assert!(result.metadata.load_error.is_none());
        assert_eq!(result.records, from_rows.records);
        assert_eq!(result.departments, from_rows.departments);
        assert_eq!(result.statistics, from_rows.statistics);
        assert_eq!(result.metadata.records_parsed, 1);
        assert_eq!(result.metadata.rows_read, 0);
    }

    #[test]
    fn test_analyze_path_bad_export_is_empty_result() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attendance.JSON");
        std::fs::write(&path, "{ not json").unwrap();

        let result = analyze_path(&path, &AggregateOptions::default());
        assert!(result.is_empty());
        assert!(result.statistics.is_none());
        assert!(result.metadata.load_error.unwrap().contains("JSON error"));
    }

    #[test]
    fn test_analyze_path_sends_workbooks_to_reader() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attendance.xlsx");
        let result = analyze_path(&path, &AggregateOptions::default());
        assert!(result.metadata.load_error.unwrap().contains("Failed to read file"));
    }
}
