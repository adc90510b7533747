//! Statistics over the department hierarchy.
//!
//! One pass over departments → groups → students builds running totals keyed
//! by department, group and date, plus the flat student list. Rankings are
//! sorted afterwards with stable sorts so equal totals keep sheet order.

use std::collections::{BTreeMap, HashMap};

use attendance_core::formatting::{truncate_label, DEPARTMENT_LABEL_WIDTH};
use attendance_core::models::{AttendanceRecord, Department, FlatStudent};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::hierarchy::build_hierarchy;

/// Default length of the top-offender ranking.
pub const TOP_OFFENDERS: usize = 10;

/// Default length of the group ranking.
pub const TOP_GROUPS: usize = 10;

// ── Options ───────────────────────────────────────────────────────────────────

/// Ranking sizes and label width used by [`StatsAggregator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    pub top_offenders: usize,
    pub top_groups: usize,
    /// Department labels longer than this many characters are cut.
    pub label_width: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            top_offenders: TOP_OFFENDERS,
            top_groups: TOP_GROUPS,
            label_width: DEPARTMENT_LABEL_WIDTH,
        }
    }
}

impl AggregateOptions {
    /// Defaults with both rankings resized to `top`.
    pub fn with_top(top: usize) -> Self {
        Self {
            top_offenders: top,
            top_groups: top,
            ..Self::default()
        }
    }
}

// ── Output types ──────────────────────────────────────────────────────────────

/// Missed hours on one calendar day, across every student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePoint {
    pub date: NaiveDate,
    pub missed: u64,
}

/// Missed hours for one group code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPoint {
    pub group: String,
    pub missed: u64,
}

/// Missed hours for one department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeptPoint {
    /// Canonical department name.
    pub department: String,
    /// Display copy, cut to the label width.
    pub label: String,
    pub missed: u64,
}

/// Everything a report needs from one loaded sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    /// Distinct (department, group, student) triples with attendance.
    pub total_students: usize,
    pub total_missed: u64,
    /// Highest totals first; never longer than the configured size.
    pub top_offenders: Vec<FlatStudent>,
    /// Ascending by calendar date.
    pub date_data: Vec<DatePoint>,
    /// Highest totals first; never longer than the configured size.
    pub group_data: Vec<GroupPoint>,
    /// Every department in sheet order, including those with zero hours.
    pub dept_data: Vec<DeptPoint>,
    /// Every student in sheet order.
    pub all_students: Vec<FlatStudent>,
}

// ── Running totals ────────────────────────────────────────────────────────────

/// Insertion-ordered `String → u64` accumulator.
#[derive(Debug, Default)]
struct OrderedTotals {
    keys: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl OrderedTotals {
    fn add(&mut self, key: &str, amount: u64) {
        match self.index.get(key) {
            Some(&i) => self.keys[i].1 += amount,
            None => {
                self.index.insert(key.to_string(), self.keys.len());
                self.keys.push((key.to_string(), amount));
            }
        }
    }

    fn into_vec(self) -> Vec<(String, u64)> {
        self.keys
    }
}

// ── StatsAggregator ───────────────────────────────────────────────────────────

/// Stateless helper that folds the hierarchy into [`AttendanceStats`].
pub struct StatsAggregator;

impl StatsAggregator {
    /// Aggregate the hierarchy.
    ///
    /// Returns `None` when there is no attendance at all, so callers can tell
    /// "nothing loaded" apart from a sheet whose totals are zero.
    pub fn aggregate(
        departments: &[Department],
        options: &AggregateOptions,
    ) -> Option<AttendanceStats> {
        let mut all_students: Vec<FlatStudent> = Vec::new();
        let mut by_dept = OrderedTotals::default();
        let mut by_group = OrderedTotals::default();
        let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();

        for dept in departments {
            by_dept.add(&dept.department, 0);

            for group in &dept.groups {
                for student in &group.students {
                    if student.attendance.is_empty() {
                        continue;
                    }

                    let total_missed = student.total_missed();
                    by_dept.add(&dept.department, total_missed);
                    by_group.add(&group.group, total_missed);
                    for entry in &student.attendance {
                        *by_date.entry(entry.date).or_insert(0) += u64::from(entry.missed);
                    }

                    all_students.push(FlatStudent {
                        name: student.student.clone(),
                        group: group.group.clone(),
                        department: dept.department.clone(),
                        total_missed,
                        attendance: student.attendance.clone(),
                    });
                }
            }
        }

        if all_students.is_empty() {
            return None;
        }

        let total_missed = all_students.iter().map(|s| s.total_missed).sum();

        let mut top_offenders = all_students.clone();
        top_offenders.sort_by(|a, b| b.total_missed.cmp(&a.total_missed));
        top_offenders.truncate(options.top_offenders);

        let date_data = by_date
            .into_iter()
            .map(|(date, missed)| DatePoint { date, missed })
            .collect();

        let mut group_data: Vec<GroupPoint> = by_group
            .into_vec()
            .into_iter()
            .map(|(group, missed)| GroupPoint { group, missed })
            .collect();
        group_data.sort_by(|a, b| b.missed.cmp(&a.missed));
        group_data.truncate(options.top_groups);

        let dept_data = by_dept
            .into_vec()
            .into_iter()
            .map(|(department, missed)| DeptPoint {
                label: truncate_label(&department, options.label_width),
                department,
                missed,
            })
            .collect();

        Some(AttendanceStats {
            total_students: all_students.len(),
            total_missed,
            top_offenders,
            date_data,
            group_data,
            dept_data,
            all_students,
        })
    }

    /// Build the hierarchy from flat records, then aggregate it.
    pub fn aggregate_records(
        records: &[AttendanceRecord],
        options: &AggregateOptions,
    ) -> Option<AttendanceStats> {
        Self::aggregate(&build_hierarchy(records), options)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
