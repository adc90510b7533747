//! Plain-text and JSON rendering of the report views.

use anyhow::{bail, Result};
use attendance_core::dates::{format_iso, format_short};
use attendance_core::formatting::{format_number, percentage};
use attendance_core::models::{AttendanceRecord, Department, FlatStudent};
use attendance_data::aggregator::{AggregateOptions, AttendanceStats, StatsAggregator};
use attendance_data::alerts::check_alerts;
use attendance_data::analysis::AnalysisResult;
use attendance_data::drill::{drill_departments, drill_groups, drill_students, summary};
use attendance_data::hierarchy::group_report;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

const NO_DATA: &str = "No attendance data.";

// ── Text tables ───────────────────────────────────────────────────────────────

/// A fixed-column text table padded by display width.
#[derive(Debug, Default)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// Columns aligned to the right (numbers).
    numeric: Vec<bool>,
}

impl TextTable {
    pub fn new(headers: &[(&str, bool)]) -> Self {
        Self {
            headers: headers.iter().map(|(h, _)| h.to_string()).collect(),
            rows: Vec::new(),
            numeric: headers.iter().map(|(_, n)| *n).collect(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let mut out = String::new();
        out.push_str(&self.format_row(&self.headers, &widths));
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&self.format_row(row, &widths));
            out.push('\n');
        }
        out
    }

    fn format_row(&self, cells: &[String], widths: &[usize]) -> String {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let fill = " ".repeat(w.saturating_sub(cell.width()));
                if self.numeric.get(i).copied().unwrap_or(false) {
                    format!("{fill}{cell}")
                } else {
                    format!("{cell}{fill}")
                }
            })
            .collect();
        padded.join("  ").trim_end().to_string()
    }
}

// ── View context ──────────────────────────────────────────────────────────────

/// Everything a view needs: the loaded data plus the CLI selections.
pub struct ViewContext<'a> {
    pub analysis: &'a AnalysisResult,
    /// Records left after the filter flags.
    pub filtered: &'a [AttendanceRecord],
    /// `true` when any filter flag was given.
    pub filter_active: bool,
    pub options: AggregateOptions,
    pub group: Option<&'a str>,
    pub department: Option<&'a str>,
    pub alert_threshold: u32,
}

impl ViewContext<'_> {
    /// Statistics for the current selection: the loaded bundle when nothing
    /// is filtered, otherwise recomputed from the filtered records.
    pub fn statistics(&self) -> Option<AttendanceStats> {
        if self.filter_active {
            StatsAggregator::aggregate_records(self.filtered, &self.options)
        } else {
            self.analysis.statistics.clone()
        }
    }
}

/// Render one view as text or pretty JSON.
pub fn render_view(view: &str, ctx: &ViewContext<'_>, json: bool) -> Result<String> {
    let departments = &ctx.analysis.departments;

    match view {
        "summary" => {
            let stats = ctx.statistics();
            let headline = summary(departments, ctx.filtered);
            if json {
                return to_json(&serde_json::json!({
                    "statistics": stats,
                    "summary": headline,
                }));
            }
            let Some(stats) = stats else {
                return Ok(NO_DATA.to_string());
            };
            let mut out = String::new();
            out.push_str(&format!(
                "Students with absences: {}\nTotal missed hours:     {}\nOn roster:              {} ({} absent, {} present)\n\n",
                format_number(stats.total_students as u64),
                format_number(stats.total_missed),
                format_number(headline.total_students as u64),
                format_number(headline.absent as u64),
                format_number(headline.present as u64),
            ));
            out.push_str("Top offenders\n");
            out.push_str(&students_table(&stats.top_offenders, stats.total_missed).render());
            Ok(out)
        }

        "students" => with_stats(ctx, json, |s| &s.all_students, |s| {
            students_table(&s.all_students, s.total_missed).render()
        }),

        "dates" => with_stats(ctx, json, |s| &s.date_data, |s| {
            let mut table = TextTable::new(&[("Day", false), ("Date", false), ("Missed", true)]);
            for point in &s.date_data {
                table.push(vec![
                    format_short(point.date),
                    format_iso(point.date),
                    format_number(point.missed),
                ]);
            }
            table.render()
        }),

        "groups" => with_stats(ctx, json, |s| &s.group_data, |s| {
            let mut table = TextTable::new(&[("Group", false), ("Missed", true), ("Share", true)]);
            for point in &s.group_data {
                table.push(vec![
                    point.group.clone(),
                    format_number(point.missed),
                    format!("{:.1}%", percentage(point.missed, s.total_missed, 1)),
                ]);
            }
            table.render()
        }),

        "departments" => with_stats(ctx, json, |s| &s.dept_data, |s| {
            let mut table = TextTable::new(&[("Department", false), ("Missed", true)]);
            for point in &s.dept_data {
                table.push(vec![point.label.clone(), format_number(point.missed)]);
            }
            table.render()
        }),

        "group" => {
            let Some(name) = ctx.group else {
                bail!("--view group requires --group <NAME>");
            };
            let report = group_report(departments, name);
            if json {
                return to_json(&report);
            }
            let Some(report) = report else {
                return Ok(format!("Group \"{}\" not found.", name));
            };
            let mut out = format!(
                "Group {} ({})\nTotal missed hours: {}\n\n",
                report.group_name,
                report.department_name,
                format_number(report.total_missed)
            );
            out.push_str(&students_table(&report.students, report.total_missed).render());
            Ok(out)
        }

        "drill" => render_drill(ctx, json),

        "alerts" => {
            let alerts = check_alerts(ctx.filtered, ctx.alert_threshold);
            if json {
                return to_json(&alerts);
            }
            if alerts.is_empty() {
                return Ok(format!(
                    "No group averages {} or more missed hours per student.",
                    ctx.alert_threshold
                ));
            }
            let mut table = TextTable::new(&[
                ("Group", false),
                ("Average", true),
                ("Students", true),
                ("Missed", true),
            ]);
            for alert in &alerts {
                table.push(vec![
                    alert.group.clone(),
                    format_number(alert.average),
                    format_number(alert.students as u64),
                    format_number(alert.missed),
                ]);
            }
            Ok(table.render())
        }

        "records" => {
            if json {
                return to_json(&ctx.filtered);
            }
            if ctx.filtered.is_empty() {
                return Ok(NO_DATA.to_string());
            }
            let mut table = TextTable::new(&[
                ("Date", false),
                ("Department", false),
                ("Group", false),
                ("Student", false),
                ("Missed", true),
            ]);
            for rec in ctx.filtered {
                table.push(vec![
                    format_iso(rec.date),
                    rec.department.clone(),
                    rec.group.clone(),
                    rec.student.clone(),
                    format_number(u64::from(rec.missed)),
                ]);
            }
            Ok(table.render())
        }

        "hierarchy" => {
            if json {
                return to_json(departments);
            }
            if departments.is_empty() {
                return Ok(NO_DATA.to_string());
            }
            Ok(render_tree(departments))
        }

        other => bail!("Unknown view: {}", other),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Shared shape for views that show one slice of the statistics bundle.
fn with_stats<T, P, F>(ctx: &ViewContext<'_>, json: bool, pick: P, text: F) -> Result<String>
where
    T: Serialize + ?Sized,
    P: Fn(&AttendanceStats) -> &T,
    F: Fn(&AttendanceStats) -> String,
{
    let stats = ctx.statistics();
    match (stats, json) {
        (Some(s), true) => to_json(pick(&s)),
        (None, true) => to_json(&serde_json::Value::Null),
        (Some(s), false) => Ok(text(&s)),
        (None, false) => Ok(NO_DATA.to_string()),
    }
}

fn render_drill(ctx: &ViewContext<'_>, json: bool) -> Result<String> {
    let departments = &ctx.analysis.departments;

    match (ctx.department, ctx.group) {
        (Some(dept), Some(group)) => {
            let items = drill_students(ctx.filtered, dept, group);
            if json {
                return to_json(&items);
            }
            let mut table = TextTable::new(&[
                ("Student", false),
                ("Missed", true),
                ("Records", true),
                ("Dates", false),
            ]);
            for item in &items {
                let dates: Vec<String> = item.dates.iter().map(|d| format_short(*d)).collect();
                table.push(vec![
                    item.student.clone(),
                    format_number(item.missed_total),
                    format_number(item.records as u64),
                    dates.join(", "),
                ]);
            }
            Ok(table.render())
        }
        (Some(dept), None) => {
            let items = drill_groups(departments, ctx.filtered, dept);
            if json {
                return to_json(&items);
            }
            if items.is_empty() {
                return Ok(format!("Department \"{}\" not found.", dept));
            }
            let mut table = TextTable::new(&[
                ("Group", false),
                ("Total", true),
                ("Absent", true),
                ("Missed", true),
            ]);
            for item in &items {
                table.push(vec![
                    item.group.clone(),
                    format_number(item.total as u64),
                    format_number(item.absent as u64),
                    format_number(item.missed_total),
                ]);
            }
            Ok(table.render())
        }
        (None, Some(_)) => bail!("--view drill with --group also requires --department"),
        (None, None) => {
            let items = drill_departments(departments, ctx.filtered);
            if json {
                return to_json(&items);
            }
            let mut table = TextTable::new(&[
                ("Department", false),
                ("Total", true),
                ("Absent", true),
                ("Missed", true),
            ]);
            for item in &items {
                table.push(vec![
                    item.department.clone(),
                    format_number(item.total as u64),
                    format_number(item.absent as u64),
                    format_number(item.missed_total),
                ]);
            }
            Ok(table.render())
        }
    }
}

fn students_table(students: &[FlatStudent], total_missed: u64) -> TextTable {
    let mut table = TextTable::new(&[
        ("Student", false),
        ("Group", false),
        ("Department", false),
        ("Missed", true),
        ("Share", true),
    ]);
    for s in students {
        table.push(vec![
            s.name.clone(),
            s.group.clone(),
            s.department.clone(),
            format_number(s.total_missed),
            format!("{:.1}%", percentage(s.total_missed, total_missed, 1)),
        ]);
    }
    table
}

/// Indented department → group → student outline with totals.
fn render_tree(departments: &[Department]) -> String {
    let mut out = String::new();
    for dept in departments {
        out.push_str(&format!(
            "{} [{}]\n",
            dept.department,
            format_number(dept.total_missed())
        ));
        for group in &dept.groups {
            out.push_str(&format!(
                "  {} [{}]\n",
                group.group,
                format_number(group.total_missed())
            ));
            for student in &group.students {
                out.push_str(&format!(
                    "    {} [{}]\n",
                    student.student,
                    format_number(student.total_missed())
                ));
            }
        }
    }
    out
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
