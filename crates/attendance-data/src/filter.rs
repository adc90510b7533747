//! Record filters shared by the report views and drill-downs.

use attendance_core::dates::{parse_iso_date, period_window};
use attendance_core::models::{normalize_group_name, AttendanceRecord};
use attendance_core::settings::Settings;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which days a filter keeps once relative periods and ranges are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelection {
    /// No date constraint.
    Any,
    /// Inclusive bounds; either side may be open.
    Range(Option<NaiveDate>, Option<NaiveDate>),
    /// One calendar day.
    Day(NaiveDate),
    /// An exact day that could not be parsed; nothing matches.
    Nothing,
}

/// Filter criteria over flat attendance records.
///
/// Every criterion is optional; an all-`None` value keeps every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    pub department: Option<String>,
    pub group: Option<String>,
    pub student: Option<String>,
    /// Exact day as `YYYY-MM-DD` or `today`. Ignored when a range is set.
    pub date: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// `7d`, `30d` or `90d`; overrides `date_from` / `date_to`.
    pub period: Option<String>,
    pub search: Option<String>,
    pub missed_min: Option<u32>,
}

impl FilterParams {
    /// Collect the filter flags from parsed CLI settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            department: settings.department.clone(),
            group: settings.group.clone(),
            student: settings.student.clone(),
            date: settings.date.clone(),
            date_from: settings.date_from,
            date_to: settings.date_to,
            period: settings.period.clone(),
            search: settings
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            missed_min: settings.missed_min,
        }
    }

    /// `true` when no criterion is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Resolve the date criteria against `today`.
    pub fn date_selection(&self, today: NaiveDate) -> DateSelection {
        if let Some((from, to)) = self.period.as_deref().and_then(|p| period_window(p, today)) {
            return DateSelection::Range(Some(from), Some(to));
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            return DateSelection::Range(self.date_from, self.date_to);
        }
        match self.date.as_deref().map(str::trim) {
            None | Some("") => DateSelection::Any,
            Some("today") => DateSelection::Day(today),
            Some(s) => match parse_iso_date(s) {
                Some(day) => DateSelection::Day(day),
                None => {
                    debug!("Date filter \"{}\" is not YYYY-MM-DD; nothing matches", s);
                    DateSelection::Nothing
                }
            },
        }
    }

    /// Check one record against every criterion.
    pub fn matches(&self, record: &AttendanceRecord, dates: DateSelection) -> bool {
        if let Some(dept) = &self.department {
            if record.department != *dept {
                return false;
            }
        }
        if let Some(group) = &self.group {
            if record.group != normalize_group_name(group) {
                return false;
            }
        }
        if let Some(student) = &self.student {
            if record.student != *student {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = record.department.to_lowercase().contains(&needle)
                || record.group.to_lowercase().contains(&needle)
                || record.student.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if let Some(min) = self.missed_min {
            if record.missed < min {
                return false;
            }
        }

        match dates {
            DateSelection::Any => true,
            DateSelection::Range(from, to) => {
                from.map_or(true, |f| record.date >= f) && to.map_or(true, |t| record.date <= t)
            }
            DateSelection::Day(day) => record.date == day,
            DateSelection::Nothing => false,
        }
    }

    /// Keep the records that pass every criterion, in input order.
    pub fn apply(&self, records: &[AttendanceRecord], today: NaiveDate) -> Vec<AttendanceRecord> {
        let dates = self.date_selection(today);
        let kept: Vec<AttendanceRecord> = records
            .iter()
            .filter(|r| self.matches(r, dates))
            .cloned()
            .collect();
        debug!("Filter kept {} of {} records", kept.len(), records.len());
        kept
    }
}
