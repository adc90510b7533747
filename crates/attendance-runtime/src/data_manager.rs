//! Change-aware cached data manager.
//!
//! Wraps [`analyze_path`] with a cache keyed on the source file's path and
//! modification time. Callers use [`DataManager::get_data`] to obtain the
//! current [`AnalysisResult`]; the sheet is only re-read when the file changed
//! (or, for a directory, when a newer workbook appeared).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use attendance_data::aggregator::AggregateOptions;
use attendance_data::analysis::{analyze_path, AnalysisResult};
use attendance_data::reader::{modified_time, resolve_workbook};

// ── DataManager ───────────────────────────────────────────────────────────────

/// Cached wrapper around the analysis pipeline.
///
/// # Example
/// ```no_run
/// use attendance_data::aggregator::AggregateOptions;
/// use attendance_runtime::data_manager::DataManager;
///
/// let mut mgr = DataManager::new("Посещаемость.xlsx", AggregateOptions::default());
/// let result = mgr.get_data(false);
/// println!("records: {}", result.records.len());
/// ```
pub struct DataManager {
    /// Workbook file, or a directory holding workbooks.
    data_path: PathBuf,
    options: AggregateOptions,
    /// Most recently loaded analysis result.
    cache: Option<AnalysisResult>,
    /// When the cache was last populated.
    cache_timestamp: Option<Instant>,
    /// Workbook the cache was built from.
    source: Option<PathBuf>,
    /// Modification time of `source` at load.
    source_mtime: Option<SystemTime>,
    /// Number of loads performed so far.
    revision: u64,
    /// Human-readable description of the last error encountered.
    last_error: Option<String>,
}

impl DataManager {
    pub fn new(data_path: impl Into<PathBuf>, options: AggregateOptions) -> Self {
        Self {
            data_path: data_path.into(),
            options,
            cache: None,
            cache_timestamp: None,
            source: None,
            source_mtime: None,
            revision: 0,
            last_error: None,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return analysis data, re-reading the workbook only when it changed.
    ///
    /// When `force_refresh` is `true` the workbook is always re-read. A read
    /// failure yields an empty result with [`last_error`](Self::last_error)
    /// set; it never panics or propagates.
    pub fn get_data(&mut self, force_refresh: bool) -> &AnalysisResult {
        let target = self.resolve_target();

        let result = match self.cache.take() {
            Some(cached) if !force_refresh && self.is_current(&target) => {
                tracing::debug!("returning cached analysis result");
                cached
            }
            _ => self.load(target),
        };
        self.cache.insert(result)
    }

    /// The current cache without checking the workbook.
    pub fn cached(&self) -> Option<&AnalysisResult> {
        self.cache.as_ref()
    }

    /// `true` when the next [`get_data`](Self::get_data) would re-read.
    pub fn is_stale(&self) -> bool {
        let target = self.resolve_target();
        self.needs_reload(&target)
    }

    /// Discard the current cache, forcing the next call to re-read.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
        self.cache_timestamp = None;
        self.source = None;
        self.source_mtime = None;
        tracing::debug!("cache invalidated");
    }

    /// Age of the current cache entry, or `None` if nothing was loaded.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache_timestamp.map(|ts| ts.elapsed())
    }

    /// Number of loads performed; increases by one per re-read.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Workbook the current cache was read from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Human-readable description of the last load error, or `None`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    /// The concrete file to read: the configured path, or the newest
    /// workbook when it is a directory.
    fn resolve_target(&self) -> PathBuf {
        resolve_workbook(&self.data_path).unwrap_or_else(|_| self.data_path.clone())
    }

    fn needs_reload(&self, target: &Path) -> bool {
        self.cache.is_none() || !self.is_current(target)
    }

    /// `true` when the last load read `target` at its current mtime.
    fn is_current(&self, target: &Path) -> bool {
        self.source.as_deref() == Some(target) && modified_time(target) == self.source_mtime
    }

    fn load(&mut self, target: PathBuf) -> AnalysisResult {
        let mtime = modified_time(&target);
        let result = analyze_path(&target, &self.options);

        self.last_error = result.metadata.load_error.clone();
        match &self.last_error {
            Some(e) => tracing::warn!(error = %e, path = %target.display(), "workbook load failed"),
            None => tracing::debug!(
                records = result.records.len(),
                departments = result.departments.len(),
                "analysis cache updated"
            ),
        }

        self.cache_timestamp = Some(Instant::now());
        self.source = Some(target);
        self.source_mtime = mtime;
        self.revision += 1;
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, secs_ago: u64) {
        let when = SystemTime::now() - Duration::from_secs(secs_ago);
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(when)
            .unwrap();
    }

    // ── first load ────────────────────────────────────────────────────────

    #[test]
    fn test_nothing_cached_initially() {
        let dir = TempDir::new().unwrap();
        let mgr = DataManager::new(dir.path(), AggregateOptions::default());
        assert!(mgr.cache_age().is_none());
        assert!(mgr.last_error().is_none());
        assert_eq!(mgr.revision(), 0);
        assert!(mgr.is_stale());
    }

    #[test]
    fn test_missing_workbook_gives_empty_result_and_error() {
        let dir = TempDir::new().unwrap();
        let mut mgr = DataManager::new(dir.path().join("attendance.xlsx"), AggregateOptions::default());

        let result = mgr.get_data(false);
        assert!(result.is_empty());
        assert!(result.statistics.is_none());
        assert!(mgr.last_error().is_some());
        assert_eq!(mgr.revision(), 1);
    }

    // ── caching ───────────────────────────────────────────────────────────

    #[test]
    fn test_unchanged_file_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("attendance.xlsx");
        fs::write(&file, b"not a workbook").unwrap();
        set_mtime(&file, 60);

        let mut mgr = DataManager::new(&file, AggregateOptions::default());
        mgr.get_data(false);
        mgr.get_data(false);

        assert_eq!(mgr.revision(), 1);
        assert!(mgr.cached().is_some());
        assert!(!mgr.is_stale());
        assert_eq!(mgr.source(), Some(file.as_path()));
    }

    #[test]
    fn test_cached_result_matches_resolved_source() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("september.xlsx");
        fs::write(&file, b"not a workbook").unwrap();
        set_mtime(&file, 60);

        let mut mgr = DataManager::new(dir.path(), AggregateOptions::default());
        let first = mgr.get_data(false).clone();
        let second = mgr.get_data(false).clone();

        let source = file.display().to_string();
        assert_eq!(first.metadata.source.as_deref(), Some(source.as_str()));
        assert_eq!(second, first);
        assert_eq!(mgr.revision(), 1);
    }

    #[test]
    fn test_changed_mtime_triggers_reload() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("attendance.xlsx");
        fs::write(&file, b"not a workbook").unwrap();
        set_mtime(&file, 120);

        let mut mgr = DataManager::new(&file, AggregateOptions::default());
        mgr.get_data(false);
        set_mtime(&file, 10);

        assert!(mgr.is_stale());
        mgr.get_data(false);
        assert_eq!(mgr.revision(), 2);
    }

    #[test]
    fn test_file_appearing_triggers_reload() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("attendance.xlsx");
        let mut mgr = DataManager::new(&file, AggregateOptions::default());
        mgr.get_data(false);
        assert!(!mgr.is_stale());

        fs::write(&file, b"not a workbook").unwrap();
        assert!(mgr.is_stale());
        mgr.get_data(false);
        assert_eq!(mgr.revision(), 2);
    }

    #[test]
    fn test_newer_workbook_in_directory_triggers_reload() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("september.xlsx");
        fs::write(&old, b"").unwrap();
        set_mtime(&old, 3600);

        let mut mgr = DataManager::new(dir.path(), AggregateOptions::default());
        mgr.get_data(false);
        assert_eq!(mgr.source(), Some(old.as_path()));

        let new = dir.path().join("october.xlsx");
        fs::write(&new, b"").unwrap();
        mgr.get_data(false);
        assert_eq!(mgr.source(), Some(new.as_path()));
        assert_eq!(mgr.revision(), 2);
    }

    // ── force / invalidate ────────────────────────────────────────────────

    #[test]
    fn test_force_refresh_bypasses_cache() {
        let dir = TempDir::new().unwrap();
        let mut mgr = DataManager::new(dir.path().join("a.xlsx"), AggregateOptions::default());
        mgr.get_data(false);
        mgr.get_data(true);
        assert_eq!(mgr.revision(), 2);
    }

    #[test]
    fn test_invalidate_cache() {
        let dir = TempDir::new().unwrap();
        let mut mgr = DataManager::new(dir.path().join("a.xlsx"), AggregateOptions::default());
        mgr.get_data(false);
        assert!(mgr.cache_age().is_some());

        mgr.invalidate_cache();
        assert!(mgr.cache_age().is_none());
        assert!(mgr.source().is_none());
        assert!(mgr.is_stale());
    }
}
