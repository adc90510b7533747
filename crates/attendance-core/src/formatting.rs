/// Maximum display width (in characters) for department labels.
pub const DEPARTMENT_LABEL_WIDTH: usize = 30;

/// Suffix appended to labels that were cut short.
pub const ELLIPSIS: &str = "...";

/// Format a whole number with thousands separators.
///
/// # Examples
///
/// ```
/// use attendance_core::formatting::format_number;
///
/// assert_eq!(format_number(0), "0");
/// assert_eq!(format_number(1234), "1,234");
/// assert_eq!(format_number(1234567), "1,234,567");
/// ```
pub fn format_number(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Cut `label` to at most `max_chars` characters, appending `"..."` when
/// anything was removed.
///
/// Counting is by `char`, so Cyrillic names are never split mid-codepoint.
/// The ellipsis is not counted toward `max_chars`.
///
/// # Examples
///
/// ```
/// use attendance_core::formatting::truncate_label;
///
/// assert_eq!(truncate_label("short", 30), "short");
/// assert_eq!(truncate_label("abcdef", 3), "abc...");
/// ```
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let mut cut: String = label.chars().take(max_chars).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use attendance_core::formatting::percentage;
///
/// assert!((percentage(50, 200, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0, 0, 2), 0.0);
/// ```
pub fn percentage(part: u64, whole: u64, decimal_places: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = (part as f64 / whole as f64) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
