//! Heuristic row classification for attendance spreadsheets.
//!
//! The sheet has no header row and no schema. Each row is recognised by the
//! shape of its first cell and by what came before it:
//!
//! 1. `Отделение …` opens a department.
//! 2. A short code starting with a digit and containing a letter
//!    (`21-ИС-1`) opens a group.
//! 3. Exactly three name tokens (`Иванов Иван Иванович`) select a student.
//! 4. A `D.M.YYYY` / `D/M/YYYY` date is a data row; the missed hours are read
//!    from [`HOURS_COLUMN`].
//!
//! [`Context`] carries the current department/group/student between rows.
//! Rows that fit none of the shapes are skipped without touching it.

use std::sync::OnceLock;

use attendance_core::dates::parse_sheet_date;
use attendance_core::models::{normalize_group_name, AttendanceRecord, CellValue};
use regex::Regex;

/// Zero-based column holding the classification cell.
pub const LABEL_COLUMN: usize = 0;

/// Zero-based column holding the missed-hours value of a data row.
pub const HOURS_COLUMN: usize = 5;

/// Literal that opens a department row.
pub const DEPARTMENT_MARKER: &str = "Отделение";

/// Group codes longer than this (in characters) are not groups.
const MAX_GROUP_CODE_CHARS: usize = 10;

// ── RowKind ───────────────────────────────────────────────────────────────────

/// What a row's first cell looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Department,
    Group,
    Student,
    /// Anything else; only rows starting with a date carry data.
    Data,
}

fn group_letter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{Cyrillic}A-Za-z]").expect("valid group letter regex"))
}

/// Classify a trimmed, non-empty first cell.
///
/// The rules are checked in order; the first that matches wins.
pub fn classify(cell: &str) -> RowKind {
    if is_department(cell) {
        RowKind::Department
    } else if is_group_code(cell) {
        RowKind::Group
    } else if is_student_name(cell) {
        RowKind::Student
    } else {
        RowKind::Data
    }
}

fn is_department(cell: &str) -> bool {
    cell.starts_with(DEPARTMENT_MARKER)
}

fn is_group_code(cell: &str) -> bool {
    cell.chars().count() <= MAX_GROUP_CODE_CHARS
        && cell.chars().next().is_some_and(|c| c.is_ascii_digit())
        && group_letter_regex().is_match(cell)
}

fn is_student_name(cell: &str) -> bool {
    cell.split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .count()
        == 3
}

// ── Hours coercion ────────────────────────────────────────────────────────────

/// Coerce a missed-hours cell to a non-negative integer.
///
/// Numbers are truncated toward zero; text contributes its leading run of
/// digits (`"4 ч"` → 4). Empty, negative and non-numeric cells give `None`.
pub fn coerce_hours(cell: &CellValue) -> Option<u32> {
    match cell {
        CellValue::Empty | CellValue::Date(_) => None,
        CellValue::Number(n) => {
            if n.is_finite() && *n >= 0.0 && *n < f64::from(u32::MAX) {
                Some(n.trunc() as u32)
            } else {
                None
            }
        }
        CellValue::Text(s) => {
            let trimmed = s.trim();
            let end = trimmed
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(trimmed.len());
            trimmed[..end].parse().ok()
        }
    }
}

// ── Context ───────────────────────────────────────────────────────────────────

/// What a single row did to the parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEvent {
    /// A department header; group and student were cleared.
    Department(String),
    /// A group header (lower-cased); student was cleared.
    Group(String),
    /// A student header.
    Student(String),
    /// A data row that produced a record.
    Record(AttendanceRecord),
}

/// The department/group/student selected by the rows read so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    department: Option<String>,
    group: Option<String>,
    student: Option<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn student(&self) -> Option<&str> {
        self.student.as_deref()
    }

    /// Classify one row and update the context.
    ///
    /// Returns `None` for rows that change nothing: a blank first cell, a
    /// non-date data row, empty or unusable hours, or incomplete context.
    pub fn step(&mut self, row: &[CellValue]) -> Option<RowEvent> {
        let first = row.get(LABEL_COLUMN)?;
        if first.is_blank() {
            return None;
        }
        let text = first.as_text();
        let cell = text.trim();

        match classify(cell) {
            RowKind::Department => {
                self.department = Some(cell.to_string());
                self.group = None;
                self.student = None;
                Some(RowEvent::Department(cell.to_string()))
            }
            RowKind::Group => {
                let group = normalize_group_name(cell);
                self.group = Some(group.clone());
                self.student = None;
                Some(RowEvent::Group(group))
            }
            RowKind::Student => {
                self.student = Some(cell.to_string());
                Some(RowEvent::Student(cell.to_string()))
            }
            RowKind::Data => self.data_record(cell, row).map(RowEvent::Record),
        }
    }

    fn data_record(&self, cell: &str, row: &[CellValue]) -> Option<AttendanceRecord> {
        let date = parse_sheet_date(cell)?;

        let hours_cell = row.get(HOURS_COLUMN)?;
        if hours_cell.is_blank() {
            return None;
        }
        // Zero hours is not an absence.
        let missed = coerce_hours(hours_cell).filter(|&h| h > 0)?;

        Some(AttendanceRecord {
            department: self.department.clone()?,
            group: self.group.clone()?,
            student: self.student.clone()?,
            date,
            missed,
        })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse a sheet into flat attendance records, in row order.
///
/// Never fails: rows that cannot be classified are skipped.
pub fn parse_rows(rows: &[Vec<CellValue>]) -> Vec<AttendanceRecord> {
    let mut ctx = Context::new();
    rows.iter()
        .filter_map(|row| match ctx.step(row) {
            Some(RowEvent::Record(record)) => Some(record),
            _ => None,
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells
            .iter()
            .map(|c| {
                if c.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::from(*c)
                }
            })
            .collect()
    }

    fn data_row(date: &str, hours: &str) -> Vec<CellValue> {
        row(&[date, "", "", "", "", hours])
    }

    fn header_rows() -> Vec<Vec<CellValue>> {
        vec![
            row(&["Отделение информационных технологий"]),
            row(&["21-ИС-1"]),
            row(&["Иванов Иван Иванович"]),
        ]
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── classify ──────────────────────────────────────────────────────────────

    #[test]
    fn test_classify_department() {
        assert_eq!(classify("Отделение экономики и права"), RowKind::Department);
    }

    #[test]
    fn test_classify_group_codes() {
        assert_eq!(classify("21-ИС-1"), RowKind::Group);
        assert_eq!(classify("1ПК"), RowKind::Group);
        assert_eq!(classify("22-it-3"), RowKind::Group);
    }

    #[test]
    fn test_classify_group_requires_letter() {
        // Digits only: a date or a number, not a group.
        assert_eq!(classify("21-22"), RowKind::Data);
        assert_eq!(classify("01.09.2024"), RowKind::Data);
    }

    #[test]
    fn test_classify_group_length_limit() {
        assert_eq!(classify("21-ИС-1-доп"), RowKind::Data);
        assert_eq!(classify("21-ИС-1доп"), RowKind::Group);
    }

    #[test]
    fn test_classify_group_must_start_with_digit() {
        assert_eq!(classify("ИС-21"), RowKind::Data);
    }

    #[test]
    fn test_classify_student_three_tokens() {
        assert_eq!(classify("Иванов Иван Иванович"), RowKind::Student);
        assert_eq!(classify("Петров  Пётр   Петрович"), RowKind::Student);
    }

    #[test]
    fn test_classify_student_ignores_single_char_tokens() {
        // "И." is two characters and still counts; a bare "И" does not.
        assert_eq!(classify("Иванов И. Иванович"), RowKind::Student);
        assert_eq!(classify("Иванов И И"), RowKind::Data);
        assert_eq!(classify("Иванов Иван Иванович оглы"), RowKind::Data);
    }

    #[test]
    fn test_classify_department_beats_student() {
        assert_eq!(classify("Отделение связи транспорта"), RowKind::Department);
    }

    // ── coerce_hours ──────────────────────────────────────────────────────────

    #[test]
    fn test_coerce_hours_text() {
        assert_eq!(coerce_hours(&CellValue::from("3")), Some(3));
        assert_eq!(coerce_hours(&CellValue::from(" 12 ")), Some(12));
        assert_eq!(coerce_hours(&CellValue::from("4 ч")), Some(4));
        assert_eq!(coerce_hours(&CellValue::from("2.5")), Some(2));
    }

    #[test]
    fn test_coerce_hours_number() {
        assert_eq!(coerce_hours(&CellValue::Number(6.0)), Some(6));
        assert_eq!(coerce_hours(&CellValue::Number(1.9)), Some(1));
        assert_eq!(coerce_hours(&CellValue::Number(-2.0)), None);
        assert_eq!(coerce_hours(&CellValue::Number(f64::NAN)), None);
    }

    #[test]
    fn test_coerce_hours_rejects_unparseable() {
        assert_eq!(coerce_hours(&CellValue::Empty), None);
        assert_eq!(coerce_hours(&CellValue::from("")), None);
        assert_eq!(coerce_hours(&CellValue::from("н/я")), None);
        assert_eq!(coerce_hours(&CellValue::from("-3")), None);
        assert_eq!(coerce_hours(&CellValue::Date(date(2024, 9, 1))), None);
    }

    // ── Context::step ─────────────────────────────────────────────────────────

    #[test]
    fn test_department_resets_group_and_student() {
        let mut ctx = Context::new();
        for r in header_rows() {
            ctx.step(&r);
        }
        assert_eq!(ctx.student(), Some("Иванов Иван Иванович"));

        let event = ctx.step(&row(&["Отделение экономики"]));
        assert_eq!(
            event,
            Some(RowEvent::Department("Отделение экономики".to_string()))
        );
        assert_eq!(ctx.department(), Some("Отделение экономики"));
        assert_eq!(ctx.group(), None);
        assert_eq!(ctx.student(), None);
    }

    #[test]
    fn test_group_resets_student_and_lowercases() {
        let mut ctx = Context::new();
        for r in header_rows() {
            ctx.step(&r);
        }
        let event = ctx.step(&row(&["22-ПК-2"]));
        assert_eq!(event, Some(RowEvent::Group("22-пк-2".to_string())));
        assert_eq!(ctx.department(), Some("Отделение информационных технологий"));
        assert_eq!(ctx.group(), Some("22-пк-2"));
        assert_eq!(ctx.student(), None);
    }

    #[test]
    fn test_student_keeps_department_and_group() {
        let mut ctx = Context::new();
        for r in header_rows() {
            ctx.step(&r);
        }
        ctx.step(&row(&["Петров Пётр Петрович"]));
        assert_eq!(ctx.group(), Some("21-ис-1"));
        assert_eq!(ctx.student(), Some("Петров Пётр Петрович"));
    }

    #[test]
    fn test_blank_first_cell_is_skipped() {
        let mut ctx = Context::new();
        for r in header_rows() {
            ctx.step(&r);
        }
        let before = ctx.clone();
        assert_eq!(ctx.step(&row(&["", "x", "", "", "", "5"])), None);
        assert_eq!(ctx.step(&[]), None);
        assert_eq!(ctx.step(&row(&["   "])), None);
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_unmatched_row_leaves_context_alone() {
        let mut ctx = Context::new();
        for r in header_rows() {
            ctx.step(&r);
        }
        let before = ctx.clone();
        assert_eq!(ctx.step(&row(&["Итого", "", "", "", "", "40"])), None);
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_data_row_without_context_is_dropped() {
        let mut ctx = Context::new();
        ctx.step(&row(&["Отделение ИТ"]));
        ctx.step(&row(&["21-ИС-1"]));
        // No student selected yet.
        assert_eq!(ctx.step(&data_row("01.09.2024", "3")), None);
    }

    #[test]
    fn test_data_row_hours_column_missing() {
        let mut ctx = Context::new();
        for r in header_rows() {
            ctx.step(&r);
        }
        assert_eq!(ctx.step(&row(&["01.09.2024", "", "3"])), None);
    }

    #[test]
    fn test_data_row_accepts_numeric_and_date_cells() {
        let mut ctx = Context::new();
        for r in header_rows() {
            ctx.step(&r);
        }
        let r = vec![
            CellValue::Date(date(2024, 9, 3)),
            CellValue::Empty,
            CellValue::Empty,
            CellValue::Empty,
            CellValue::Empty,
            CellValue::Number(4.0),
        ];
        match ctx.step(&r) {
            Some(RowEvent::Record(rec)) => {
                assert_eq!(rec.date, date(2024, 9, 3));
                assert_eq!(rec.missed, 4);
            }
            other => panic!("expected a record, got {:?}", other),
        }
    }

    // ── parse_rows ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_rows_reference_sheet() {
        let mut rows = header_rows();
        rows.push(data_row("01.09.2024", "3"));
        rows.push(data_row("02.09.2024", "0"));

        let records = parse_rows(&rows);
        assert_eq!(
            records,
            vec![AttendanceRecord {
                department: "Отделение информационных технологий".to_string(),
                group: "21-ис-1".to_string(),
                student: "Иванов Иван Иванович".to_string(),
                date: date(2024, 9, 1),
                missed: 3,
            }]
        );
    }

    #[test]
    fn test_parse_rows_empty_hours_not_zero_record() {
        let mut rows = header_rows();
        rows.push(data_row("01.09.2024", ""));
        rows.push(data_row("02.09.2024", "   "));
        assert!(parse_rows(&rows).is_empty());
    }

    #[test]
    fn test_parse_rows_idempotent() {
        let mut rows = header_rows();
        rows.push(data_row("01.09.2024", "3"));
        rows.push(row(&["Петров Пётр Петрович"]));
        rows.push(data_row("5/9/2024", "2"));

        let first = parse_rows(&rows);
        let second = parse_rows(&rows);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].student, "Петров Пётр Петрович");
        assert_eq!(first[1].date, date(2024, 9, 5));
    }

    #[test]
    fn test_parse_rows_context_resets_across_departments() {
        let mut rows = header_rows();
        rows.push(row(&["Отделение экономики"]));
        // Group and student were cleared; this row has no owner.
        rows.push(data_row("01.09.2024", "3"));
        assert!(parse_rows(&rows).is_empty());
    }

    #[test]
    fn test_parse_rows_empty_input() {
        assert!(parse_rows(&[]).is_empty());
    }
}
