use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Workbook names looked up in the working directory, in order.
pub const DATA_FILE_CANDIDATES: &[&str] = &[
    "Посещаемость.xlsx",
    "attendance.xlsx",
    "public/attendance.xlsx",
];

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure `~/.attendance-report/` and its `logs/` subdirectory exist.
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    ensure_directories_in(&home)
}

/// Same as [`ensure_directories`], rooted at `home`.
pub fn ensure_directories_in(home: &Path) -> anyhow::Result<PathBuf> {
    let app_dir = home.join(".attendance-report");
    std::fs::create_dir_all(app_dir.join("logs"))?;
    Ok(app_dir)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` value onto an `EnvFilter` directive.
pub fn level_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr so JSON output on stdout stays clean. When `log_file`
/// is given, the same events are appended to it without ANSI colours.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ── Data-path discovery ────────────────────────────────────────────────────────

/// Find the attendance workbook under `base`.
///
/// Checks [`DATA_FILE_CANDIDATES`] in order and returns the first that
/// exists, or `None`.
pub fn discover_data_path(base: &Path) -> Option<PathBuf> {
    DATA_FILE_CANDIDATES
        .iter()
        .map(|name| base.join(name))
        .find(|p| p.exists())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── ensure_directories ────────────────────────────────────────────────────

    #[test]
    fn test_ensure_directories_in() {
        let tmp = TempDir::new().expect("tempdir");
        let app_dir = ensure_directories_in(tmp.path()).expect("ensure_directories_in");

        assert_eq!(app_dir, tmp.path().join(".attendance-report"));
        assert!(app_dir.is_dir());
        assert!(app_dir.join("logs").is_dir(), "logs subdir must exist");
    }

    #[test]
    fn test_ensure_directories_idempotent() {
        let tmp = TempDir::new().expect("tempdir");
        ensure_directories_in(tmp.path()).unwrap();
        ensure_directories_in(tmp.path()).unwrap();
    }

    // ── level_directive ───────────────────────────────────────────────────────

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("ERROR"), "error");
        assert_eq!(level_directive("bogus"), "info");
    }

    // ── discover_data_path ────────────────────────────────────────────────────

    #[test]
    fn test_discover_returns_none_when_absent() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(discover_data_path(tmp.path()).is_none());
    }

    #[test]
    fn test_discover_prefers_russian_name() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::write(tmp.path().join("attendance.xlsx"), b"").unwrap();
        std::fs::write(tmp.path().join("Посещаемость.xlsx"), b"").unwrap();

        assert_eq!(
            discover_data_path(tmp.path()),
            Some(tmp.path().join("Посещаемость.xlsx"))
        );
    }

    #[test]
    fn test_discover_falls_back_to_public() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(tmp.path().join("public")).unwrap();
        std::fs::write(tmp.path().join("public/attendance.xlsx"), b"").unwrap();

        assert_eq!(
            discover_data_path(tmp.path()),
            Some(tmp.path().join("public/attendance.xlsx"))
        );
    }
}
