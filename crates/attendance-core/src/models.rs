use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single spreadsheet cell as delivered by the workbook reader.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    /// Missing or blank cell.
    #[default]
    Empty,
    /// Text content, kept verbatim.
    Text(String),
    /// Numeric content (integers arrive as whole floats).
    Number(f64),
    /// A cell the workbook stores as a calendar date.
    Date(NaiveDate),
}

impl CellValue {
    /// Render the cell the way a spreadsheet displays it.
    ///
    /// Whole numbers lose their fractional part (`3.0` → `"3"`) and dates use
    /// the `DD.MM.YYYY` form found in attendance sheets.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Date(d) => d.format("%d.%m.%Y").to_string(),
        }
    }

    /// `true` for empty cells and text made only of whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Date(_) => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// One spreadsheet row, read left to right.
pub type Row = Vec<CellValue>;

/// One attendance fact tied to a (department, group, student) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Department name, verbatim.
    pub department: String,
    /// Group code, lower-cased.
    pub group: String,
    /// Student full name, verbatim.
    pub student: String,
    /// Calendar day of the absence (serialises as `YYYY-MM-DD`).
    pub date: NaiveDate,
    /// Hours missed on that day.
    pub missed: u32,
}

/// A `(date, missed)` pair stored under a [`Student`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub date: NaiveDate,
    pub missed: u32,
}

/// A student and their attendance entries in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student: String,
    #[serde(default)]
    pub attendance: Vec<AttendanceEntry>,
}

impl Student {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            student: name.into(),
            attendance: Vec::new(),
        }
    }

    /// Sum of missed hours across all entries.
    pub fn total_missed(&self) -> u64 {
        self.attendance.iter().map(|a| u64::from(a.missed)).sum()
    }
}

/// A group and its students in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group: String,
    #[serde(default)]
    pub students: Vec<Student>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            group: name.into(),
            students: Vec::new(),
        }
    }

    /// Sum of missed hours across every student in the group.
    pub fn total_missed(&self) -> u64 {
        self.students.iter().map(Student::total_missed).sum()
    }
}

/// A department and its groups in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub department: String,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Department {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            department: name.into(),
            groups: Vec::new(),
        }
    }

    /// Sum of missed hours across every group in the department.
    pub fn total_missed(&self) -> u64 {
        self.groups.iter().map(Group::total_missed).sum()
    }

    /// Number of students registered under this department.
    pub fn student_count(&self) -> usize {
        self.groups.iter().map(|g| g.students.len()).sum()
    }
}

/// Consumer-facing view of one student with its running total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatStudent {
    pub name: String,
    pub group: String,
    pub department: String,
    pub total_missed: u64,
    pub attendance: Vec<AttendanceEntry>,
}

/// Normalise a group code for identity comparisons.
pub fn normalize_group_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── CellValue ─────────────────────────────────────────────────────────────

    #[test]
    fn test_cell_as_text_whole_number_drops_fraction() {
        assert_eq!(CellValue::Number(3.0).as_text(), "3");
        assert_eq!(CellValue::Number(2.5).as_text(), "2.5");
    }

    #[test]
    fn test_cell_as_text_date_uses_dotted_form() {
        assert_eq!(CellValue::Date(date(2024, 9, 1)).as_text(), "01.09.2024");
    }

    #[test]
    fn test_cell_is_blank() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::from("   ").is_blank());
        assert!(!CellValue::from("x").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    // ── totals ────────────────────────────────────────────────────────────────

    #[test]
    fn test_totals_roll_up() {
        let mut student = Student::new("Иванов Иван Иванович");
        student.attendance.push(AttendanceEntry {
            date: date(2024, 9, 1),
            missed: 3,
        });
        student.attendance.push(AttendanceEntry {
            date: date(2024, 9, 2),
            missed: 4,
        });
        let mut group = Group::new("21-ис-1");
        group.students.push(student);
        group.students.push(Student::new("Петров Пётр Петрович"));
        let mut dept = Department::new("Отделение ИТ");
        dept.groups.push(group);
        dept.groups.push(Group::new("22-ис-2"));

        assert_eq!(dept.groups[0].students[0].total_missed(), 7);
        assert_eq!(dept.groups[0].total_missed(), 7);
        assert_eq!(dept.total_missed(), 7);
        assert_eq!(dept.student_count(), 2);
    }

    // ── serde ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_record_serialises_iso_date() {
        let rec = AttendanceRecord {
            department: "Отделение ИТ".to_string(),
            group: "21-ис-1".to_string(),
            student: "Иванов Иван Иванович".to_string(),
            date: date(2024, 9, 1),
            missed: 3,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["date"], "2024-09-01");
        assert_eq!(json["missed"], 3);
        assert_eq!(json["group"], "21-ис-1");
    }

    #[test]
    fn test_flat_student_uses_camel_case() {
        let s = FlatStudent {
            name: "Иванов Иван Иванович".to_string(),
            group: "21-ис-1".to_string(),
            department: "Отделение ИТ".to_string(),
            total_missed: 5,
            attendance: vec![],
        };
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["totalMissed"], 5);
        assert!(json.get("total_missed").is_none());
    }

    #[test]
    fn test_department_deserialises_without_groups() {
        let dept: Department =
            serde_json::from_str(r#"{"department": "Отделение ИТ"}"#).unwrap();
        assert!(dept.groups.is_empty());
    }

    #[test]
    fn test_normalize_group_name() {
        assert_eq!(normalize_group_name(" 21-ИС-1 "), "21-ис-1");
    }
}
