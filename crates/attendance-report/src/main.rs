mod bootstrap;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use attendance_core::error::AttendanceError;
use attendance_core::settings::Settings;
use attendance_data::aggregator::AggregateOptions;
use attendance_data::analysis::{analyze_path, AnalysisResult};
use attendance_data::export::export_hierarchy;
use attendance_data::filter::FilterParams;
use attendance_data::reader::resolve_workbook;
use attendance_runtime::orchestrator::WatchOrchestrator;
use chrono::Local;

use crate::render::{render_view, ViewContext};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Attendance Report v{} starting", env!("CARGO_PKG_VERSION"));

    let data_path = resolve_data_path(&settings)?;
    tracing::info!("Data: {}, View: {}", data_path.display(), settings.view);

    let options = AggregateOptions::with_top(settings.top as usize);

    if settings.watch {
        return run_watch(&settings, data_path, options).await;
    }

    let workbook = resolve_workbook(&data_path).unwrap_or(data_path);
    let analysis = analyze_path(&workbook, &options);
    report(&settings, &analysis, options)
}

/// `--file`, then last-used, then the well-known names in the working
/// directory.
fn resolve_data_path(settings: &Settings) -> Result<PathBuf> {
    if let Some(path) = &settings.file {
        return Ok(path.clone());
    }
    let cwd = std::env::current_dir().context("cannot read the working directory")?;
    bootstrap::discover_data_path(&cwd)
        .ok_or_else(|| AttendanceError::DataPathNotFound(cwd).into())
}

/// Export (when asked) and print the selected view.
fn report(settings: &Settings, analysis: &AnalysisResult, options: AggregateOptions) -> Result<()> {
    if let Some(path) = &settings.export {
        export_hierarchy(&analysis.departments, path)?;
    }

    let params = FilterParams::from_settings(settings);
    let filtered = params.apply(&analysis.records, Local::now().date_naive());

    let ctx = ViewContext {
        analysis,
        filtered: &filtered,
        filter_active: !params.is_empty(),
        options,
        group: settings.group.as_deref(),
        department: settings.department.as_deref(),
        alert_threshold: settings.alert_threshold,
    };

    println!("{}", render_view(&settings.view, &ctx, settings.wants_json())?);
    Ok(())
}

/// Reprint the report every time the workbook changes, until Ctrl+C.
async fn run_watch(settings: &Settings, data_path: PathBuf, options: AggregateOptions) -> Result<()> {
    tracing::info!("Watching {} every {}s", data_path.display(), settings.refresh_rate);

    let orchestrator = WatchOrchestrator::new(u64::from(settings.refresh_rate), data_path, options);
    let (mut rx, handle) = orchestrator.start();

    loop {
        tokio::select! {
            snapshot = rx.recv() => {
                let Some(snapshot) = snapshot else {
                    break;
                };
                if !settings.wants_json() {
                    println!(
                        "── revision {} · {} ──",
                        snapshot.revision,
                        snapshot.loaded_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                    );
                }
                if let Err(e) = report(settings, &snapshot.analysis, options) {
                    tracing::error!("{:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; stopping watch");
                break;
            }
        }
    }

    handle.abort();
    Ok(())
}
