use std::collections::{HashMap, HashSet};

use attendance_core::models::AttendanceRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Average missed hours per student that raises an alert by default.
pub const DEFAULT_ALERT_THRESHOLD: u32 = 10;

/// A group whose average missed hours per student reached the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAlert {
    pub group: String,
    /// Integer average: `missed / students`, rounded down.
    pub average: u64,
    pub students: usize,
    pub missed: u64,
}

/// Clamp a configured threshold to `1..=100`, falling back to the default.
pub fn normalize_threshold(threshold: u32) -> u32 {
    if (1..=100).contains(&threshold) {
        threshold
    } else {
        DEFAULT_ALERT_THRESHOLD
    }
}

/// Find groups whose average missed hours per distinct student is at least
/// `threshold`, highest average first. Each alert is logged at `WARN`.
pub fn check_alerts(records: &[AttendanceRecord], threshold: u32) -> Vec<GroupAlert> {
    let threshold = normalize_threshold(threshold);

    let mut order: Vec<&str> = Vec::new();
    let mut per_group: HashMap<&str, (HashSet<&str>, u64)> = HashMap::new();
    for rec in records {
        let entry = per_group.entry(rec.group.as_str()).or_insert_with(|| {
            order.push(rec.group.as_str());
            (HashSet::new(), 0)
        });
        entry.0.insert(rec.student.as_str());
        entry.1 += u64::from(rec.missed);
    }

    let mut alerts: Vec<GroupAlert> = order
        .into_iter()
        .filter_map(|group| {
            let (students, missed) = per_group.get(group)?;
            if students.is_empty() {
                return None;
            }
            let average = missed / students.len() as u64;
            (average >= u64::from(threshold)).then(|| GroupAlert {
                group: group.to_string(),
                average,
                students: students.len(),
                missed: *missed,
            })
        })
        .collect();
    alerts.sort_by(|a, b| b.average.cmp(&a.average));

    for alert in &alerts {
        warn!(
            "Group {} exceeded the absence threshold: {} hours per student on average (threshold: {})",
            alert.group, alert.average, threshold
        );
    }
    debug!("{} of {} groups over threshold {}", alerts.len(), per_group.len(), threshold);

    alerts
}
