//! Extension and index-file resolution for module paths.
//!
//! Extensions are appended, not substituted: `./lib/a.min` tries
//! `lib/a.min`, then `lib/a.min.js`, then `lib/a.min/index.js`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// `base` with `.ext` appended to its final component.
pub fn with_appended_extension(base: &Path, ext: &str) -> PathBuf {
    let mut raw = OsString::from(base.as_os_str());
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

/// Try the path as-is, then with each extension appended.
pub async fn try_extensions(
    base: &Path,
    extensions: &[String],
    runtime: &dyn Runtime,
) -> Option<PathBuf> {
    if runtime.is_file(base).await {
        return Some(base.to_path_buf());
    }

    for ext in extensions {
        let candidate = with_appended_extension(base, ext);
        if runtime.is_file(&candidate).await {
            return Some(candidate);
        }
    }

    None
}

/// Try `dir/index.<ext>` for each extension.
pub async fn try_index_files(
    dir: &Path,
    extensions: &[String],
    runtime: &dyn Runtime,
) -> Option<PathBuf> {
    if !runtime.is_dir(dir).await {
        return None;
    }

    for ext in extensions {
        let index = dir.join(format!("index.{ext}"));
        if runtime.is_file(&index).await {
            return Some(index);
        }
    }

    None
}

/// Resolve a file path with extension and index-file fallbacks.
pub async fn resolve_file(
    base: &Path,
    extensions: &[String],
    runtime: &dyn Runtime,
) -> Option<PathBuf> {
    if let Some(found) = try_extensions(base, extensions, runtime).await {
        return Some(found);
    }
    try_index_files(base, extensions, runtime).await
}
