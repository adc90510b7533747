//! Department → group → student → attendance containment.
//!
//! Containers are unique by name within their parent and keep first-seen
//! order. Nothing is sorted here.

use std::collections::HashMap;

use attendance_core::models::{
    normalize_group_name, AttendanceEntry, AttendanceRecord, CellValue, Department, FlatStudent,
    Group, Student,
};
use serde::{Deserialize, Serialize};

use crate::classifier::{Context, RowEvent};

// ── HierarchyBuilder ──────────────────────────────────────────────────────────

/// Incrementally builds the nested hierarchy with index maps for lookups.
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    departments: Vec<Department>,
    dept_index: HashMap<String, usize>,
    group_index: HashMap<(usize, String), usize>,
    student_index: HashMap<(usize, usize, String), usize>,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` if unseen and return its position.
    pub fn ensure_department(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.dept_index.get(name) {
            return idx;
        }
        let idx = self.departments.len();
        self.departments.push(Department::new(name));
        self.dept_index.insert(name.to_string(), idx);
        idx
    }

    /// Register `group` under `department` (both created if unseen).
    pub fn ensure_group(&mut self, department: &str, group: &str) -> (usize, usize) {
        let d = self.ensure_department(department);
        let key = (d, group.to_string());
        if let Some(&g) = self.group_index.get(&key) {
            return (d, g);
        }
        let groups = &mut self.departments[d].groups;
        let g = groups.len();
        groups.push(Group::new(group));
        self.group_index.insert(key, g);
        (d, g)
    }

    /// File `record` under its triple, creating containers as needed.
    pub fn push_record(&mut self, record: &AttendanceRecord) {
        let (d, g) = self.ensure_group(&record.department, &record.group);
        let key = (d, g, record.student.clone());
        let students = &mut self.departments[d].groups[g].students;
        let s = match self.student_index.get(&key) {
            Some(&s) => s,
            None => {
                let s = students.len();
                students.push(Student::new(record.student.clone()));
                self.student_index.insert(key, s);
                s
            }
        };
        students[s].attendance.push(AttendanceEntry {
            date: record.date,
            missed: record.missed,
        });
    }

    pub fn finish(self) -> Vec<Department> {
        self.departments
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Flat records plus the hierarchy built from the same pass over a sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSheet {
    pub records: Vec<AttendanceRecord>,
    pub departments: Vec<Department>,
}

/// Classify every row and build both outputs in one pass.
///
/// Department and group headers create their containers immediately, so a
/// group with no qualifying data rows still shows up (with no students).
/// Students appear once their first record arrives.
pub fn parse_sheet(rows: &[Vec<CellValue>]) -> ParsedSheet {
    let mut ctx = Context::new();
    let mut builder = HierarchyBuilder::new();
    let mut records = Vec::new();

    for row in rows {
        match ctx.step(row) {
            Some(RowEvent::Department(name)) => {
                builder.ensure_department(&name);
            }
            Some(RowEvent::Group(name)) => {
                if let Some(department) = ctx.department() {
                    builder.ensure_group(department, &name);
                }
            }
            Some(RowEvent::Record(record)) => {
                builder.push_record(&record);
                records.push(record);
            }
            Some(RowEvent::Student(_)) | None => {}
        }
    }

    ParsedSheet {
        records,
        departments: builder.finish(),
    }
}

/// Build the hierarchy from flat records alone.
pub fn build_hierarchy(records: &[AttendanceRecord]) -> Vec<Department> {
    let mut builder = HierarchyBuilder::new();
    for record in records {
        builder.push_record(record);
    }
    builder.finish()
}

/// Flatten the hierarchy back into records, depth-first.
pub fn flatten(departments: &[Department]) -> Vec<AttendanceRecord> {
    let mut out = Vec::new();
    for d in departments {
        for g in &d.groups {
            for s in &g.students {
                for a in &s.attendance {
                    out.push(AttendanceRecord {
                        department: d.department.clone(),
                        group: g.group.clone(),
                        student: s.student.clone(),
                        date: a.date,
                        missed: a.missed,
                    });
                }
            }
        }
    }
    out
}

// ── Group lookup ──────────────────────────────────────────────────────────────

/// First group whose normalised name matches `name`, with its department.
pub fn find_group<'a>(
    departments: &'a [Department],
    name: &str,
) -> Option<(&'a Department, &'a Group)> {
    let wanted = normalize_group_name(name);
    departments.iter().find_map(|d| {
        d.groups
            .iter()
            .find(|g| g.group == wanted)
            .map(|g| (d, g))
    })
}

/// Students of one group that missed at least one hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub group_name: String,
    pub department_name: String,
    /// Sorted by `total_missed` descending; ties keep sheet order.
    pub students: Vec<FlatStudent>,
    pub total_missed: u64,
}

/// Look up a group by name and rank its students.
pub fn group_report(departments: &[Department], name: &str) -> Option<GroupReport> {
    let (dept, group) = find_group(departments, name)?;

    let mut students: Vec<FlatStudent> = group
        .students
        .iter()
        .map(|s| FlatStudent {
            name: s.student.clone(),
            group: group.group.clone(),
            department: dept.department.clone(),
            total_missed: s.total_missed(),
            attendance: s.attendance.clone(),
        })
        .filter(|s| s.total_missed > 0)
        .collect();
    students.sort_by(|a, b| b.total_missed.cmp(&a.total_missed));

    let total_missed = students.iter().map(|s| s.total_missed).sum();

    Some(GroupReport {
        group_name: group.group.clone(),
        department_name: dept.department.clone(),
        students,
        total_missed,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
