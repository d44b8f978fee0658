//! Output path helpers

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Append `.suffix` to a path without touching any existing extension.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Whether `name` can be used as a file name stem inside an output directory:
/// non-empty, no path separators, and not a `.` / `..` component.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\', '\0'])
        && name != "."
        && name != ".."
}

/// Staging location for an artifact that is renamed into place when complete.
pub fn partial_path(path: &Path) -> PathBuf {
    with_suffix(path, "partial")
}
