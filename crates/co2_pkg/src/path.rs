//! Entry path normalization
//!
//! Index keys are lowercase, use `/` as separator and are never absolute.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Returns true if the path starts with either separator
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\')
}

/// Normalizes a path into an index key
///
/// Returns [`None`] for absolute paths, which never name an entry.
pub fn normalize(path: &str) -> Option<String> {
    if is_absolute(path) {
        return None;
    }
    Some(path.to_lowercase().replace('\\', "/"))
}

/// Resolves an index key below `root`
///
/// Returns [`None`] if the key would escape `root` or carries a root or drive prefix.
pub fn resolve_below(root: &Path, key: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;
    for part in key.split('/') {
        match Path::new(part).components().next() {
            None | Some(Component::CurDir) => {}
            Some(Component::Normal(name)) if Path::new(part).components().count() == 1 => {
                resolved.push(name);
                depth += 1;
            }
            _ => return None,
        }
    }
    (depth > 0).then_some(resolved)
}

/// Path of the payload file that belongs to the index at `index`
///
/// The extension is replaced by `tpd`, keeping an uppercase `TPI` uppercase.
pub fn companion_path(index: &Path) -> PathBuf {
    let upper = index
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "TPI");
    index.with_extension(if upper { "TPD" } else { "tpd" })
}

/// Path of the index file for a package named `base`
///
/// `.tpi` is appended unless `base` already carries it.
pub fn index_path_for(base: &Path) -> PathBuf {
    let has_extension = base
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("tpi"));
    if has_extension {
        return base.to_path_buf();
    }
    let mut name = OsString::from(base.as_os_str());
    name.push(".tpi");
    PathBuf::from(name)
}

/// Sibling path a file is written to before it is renamed into place
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}
