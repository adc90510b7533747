//! Drill-down views: department → group → student, and the headline summary.
//!
//! Totals come from the hierarchy (students on the roster); absences and
//! hours come from a filtered record set. Output follows hierarchy order.

use std::collections::{HashMap, HashSet};

use attendance_core::models::{normalize_group_name, AttendanceRecord, Department};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Output types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeptDrillItem {
    pub department: String,
    /// Students on the roster.
    pub total: usize,
    /// Distinct students with at least one filtered record.
    pub absent: usize,
    pub missed_total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDrillItem {
    pub group: String,
    pub total: usize,
    pub absent: usize,
    pub missed_total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDrillItem {
    pub student: String,
    pub missed_total: u64,
    /// Number of filtered records for this student.
    pub records: usize,
    pub dates: Vec<NaiveDate>,
}

/// Headline numbers for the current filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_students: usize,
    pub present: usize,
    pub absent: usize,
    pub by_department: Vec<DeptDrillItem>,
}

// ── Department level ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Tally<'a> {
    absent: HashSet<(&'a str, &'a str)>,
    missed: u64,
}

/// Per-department totals for the filtered records.
///
/// When `filtered` is non-empty only departments it touches are listed;
/// otherwise every department with at least one student is.
pub fn drill_departments(
    departments: &[Department],
    filtered: &[AttendanceRecord],
) -> Vec<DeptDrillItem> {
    let mut tallies: HashMap<&str, Tally<'_>> = HashMap::new();
    for rec in filtered {
        let tally = tallies.entry(rec.department.as_str()).or_default();
        tally.absent.insert((rec.group.as_str(), rec.student.as_str()));
        tally.missed += u64::from(rec.missed);
    }

    departments
        .iter()
        .filter(|d| d.student_count() > 0)
        .filter(|d| filtered.is_empty() || tallies.contains_key(d.department.as_str()))
        .map(|d| {
            let tally = tallies.get(d.department.as_str());
            DeptDrillItem {
                department: d.department.clone(),
                total: d.student_count(),
                absent: tally.map_or(0, |t| t.absent.len()),
                missed_total: tally.map_or(0, |t| t.missed),
            }
        })
        .collect()
}

/// Headline summary: roster size, absentees, and the per-department split.
pub fn summary(departments: &[Department], filtered: &[AttendanceRecord]) -> Summary {
    let by_department = drill_departments(departments, filtered);
    let total_students: usize = by_department.iter().map(|d| d.total).sum();
    let absent: usize = by_department.iter().map(|d| d.absent).sum();

    Summary {
        total_students,
        present: total_students.saturating_sub(absent),
        absent,
        by_department,
    }
}

// ── Group level ───────────────────────────────────────────────────────────────

/// Per-group totals inside one department. Unknown departments yield nothing.
pub fn drill_groups(
    departments: &[Department],
    filtered: &[AttendanceRecord],
    department: &str,
) -> Vec<GroupDrillItem> {
    let Some(dept) = departments.iter().find(|d| d.department == department) else {
        return Vec::new();
    };

    let mut tallies: HashMap<&str, (HashSet<&str>, u64)> = HashMap::new();
    for rec in filtered.iter().filter(|r| r.department == department) {
        let (students, missed) = tallies.entry(rec.group.as_str()).or_default();
        students.insert(rec.student.as_str());
        *missed += u64::from(rec.missed);
    }

    dept.groups
        .iter()
        .map(|g| {
            let tally = tallies.get(g.group.as_str());
            GroupDrillItem {
                group: g.group.clone(),
                total: g.students.len(),
                absent: tally.map_or(0, |(s, _)| s.len()),
                missed_total: tally.map_or(0, |(_, m)| *m),
            }
        })
        .collect()
}

// ── Student level ─────────────────────────────────────────────────────────────

/// Per-student totals and dates inside one group, in first-seen order.
pub fn drill_students(
    filtered: &[AttendanceRecord],
    department: &str,
    group: &str,
) -> Vec<StudentDrillItem> {
    let group = normalize_group_name(group);
    let mut out: Vec<StudentDrillItem> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for rec in filtered
        .iter()
        .filter(|r| r.department == department && r.group == group)
    {
        let i = *index.entry(rec.student.as_str()).or_insert_with(|| {
            out.push(StudentDrillItem {
                student: rec.student.clone(),
                missed_total: 0,
                records: 0,
                dates: Vec::new(),
            });
            out.len() - 1
        });
        let item = &mut out[i];
        item.missed_total += u64::from(rec.missed);
        item.records += 1;
        item.dates.push(rec.date);
    }

    out
}
