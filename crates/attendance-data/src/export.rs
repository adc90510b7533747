use std::fs;
use std::path::Path;

use attendance_core::error::{AttendanceError, Result};
use attendance_core::models::Department;
use tracing::info;

/// Write the hierarchy as pretty-printed JSON.
///
/// The file is written next to `path` first and renamed into place, so a
/// reader never sees a half-written export.
pub fn export_hierarchy(departments: &[Department], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(departments)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);

    fs::write(tmp, json)?;
    fs::rename(tmp, path)?;

    info!("Exported {} departments to {}", departments.len(), path.display());
    Ok(())
}

/// Read a hierarchy previously written by [`export_hierarchy`].
pub fn load_hierarchy(path: &Path) -> Result<Vec<Department>> {
    let raw = fs::read_to_string(path).map_err(|source| AttendanceError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}
