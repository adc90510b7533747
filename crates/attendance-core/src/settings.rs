use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dates::parse_iso_date;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Attendance statistics from department/group/student spreadsheets
#[derive(Parser, Debug, Clone)]
#[command(
    name = "attendance-report",
    about = "Attendance statistics from department/group/student spreadsheets",
    version
)]
pub struct Settings {
    /// Workbook file, exported JSON hierarchy, or a directory to pick the
    /// newest workbook from
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Report view
    #[arg(long, default_value = "summary", value_parser = [
        "summary", "students", "dates", "groups", "departments",
        "group", "drill", "alerts", "records", "hierarchy",
    ])]
    pub view: String,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Group code (for `--view group`, drill-downs and filtering)
    #[arg(long)]
    pub group: Option<String>,

    /// Department name (for drill-downs and filtering)
    #[arg(long)]
    pub department: Option<String>,

    /// Only records of this student
    #[arg(long)]
    pub student: Option<String>,

    /// Case-insensitive search across department, group and student
    #[arg(long)]
    pub search: Option<String>,

    /// Exact day (YYYY-MM-DD or "today"), used when no range is given
    #[arg(long)]
    pub date: Option<String>,

    /// Range start (YYYY-MM-DD, inclusive)
    #[arg(long, value_parser = parse_date_arg)]
    pub date_from: Option<NaiveDate>,

    /// Range end (YYYY-MM-DD, inclusive)
    #[arg(long, value_parser = parse_date_arg)]
    pub date_to: Option<NaiveDate>,

    /// Relative period ending today
    #[arg(long, value_parser = ["7d", "30d", "90d"])]
    pub period: Option<String>,

    /// Only records with at least this many missed hours
    #[arg(long)]
    pub missed_min: Option<u32>,

    /// Size of the top-offender and group rankings (1-100)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub top: u32,

    /// Average missed hours per student that raises a group alert (1-100)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub alert_threshold: u32,

    /// Write the department hierarchy as JSON to this path
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Keep running and reprint whenever the workbook changes
    #[arg(long)]
    pub watch: bool,

    /// Seconds between workbook checks in watch mode (1-3600)
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=3600))]
    pub refresh_rate: u32,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_iso_date(s).ok_or_else(|| format!("expected YYYY-MM-DD, got \"{}\"", s))
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.attendance-report/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_threshold: Option<u32>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".attendance-report").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::debug!(error = %e, "could not clear last-used params");
            }
            return Self::resolve_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if settings.file.is_none() {
            settings.file = last.file;
        }
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                if settings.can_render(&v) {
                    settings.view = v;
                } else {
                    tracing::debug!(view = %v, "ignoring saved view");
                }
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top") {
            if let Some(v) = last.top {
                settings.top = v;
            }
        }
        // NOTE: clap stores the arg id using the field name (underscores).
        if !is_arg_explicitly_set(&matches, "alert_threshold") {
            if let Some(v) = last.alert_threshold {
                settings.alert_threshold = v;
            }
        }

        settings = Self::resolve_values(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::debug!(error = %e, "could not persist last-used params");
        }

        settings
    }

    /// `true` when JSON output was requested.
    pub fn wants_json(&self) -> bool {
        self.format == "json"
    }

    /// `true` when `view` is a `--view` value and the current flags carry
    /// what it needs: `group` needs `--group`, and `drill` with `--group`
    /// needs `--department`.
    pub fn can_render(&self, view: &str) -> bool {
        if !is_view_name(view) {
            return false;
        }
        match view {
            "group" => self.group.is_some(),
            "drill" => self.group.is_none() || self.department.is_some(),
            _ => true,
        }
    }

    /// Apply the `--debug` flag.
    fn resolve_values(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            file: s.file.clone(),
            view: Some(s.view.clone()),
            format: Some(s.format.clone()),
            top: Some(s.top),
            alert_threshold: Some(s.alert_threshold),
        }
    }
}

fn is_view_name(view: &str) -> bool {
    Settings::command()
        .get_arguments()
        .find(|arg| arg.get_id() == "view")
        .is_some_and(|arg| arg.get_possible_values().iter().any(|v| v.matches(view, false)))
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
