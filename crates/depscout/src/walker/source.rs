use std::path::Path;

use crate::config::MAX_FILE_SIZE;
use crate::error::{AnalyzeError, Result};
use crate::runtime::Runtime;

/// Read a module's source, enforcing [`MAX_FILE_SIZE`] and UTF-8.
pub async fn read_module(path: &Path, runtime: &dyn Runtime) -> Result<String> {
    if let Ok(metadata) = runtime.metadata(path).await {
        if metadata.size > MAX_FILE_SIZE {
            return Err(AnalyzeError::ModuleParse {
                path: path.to_path_buf(),
                reason: format!(
                    "file size {} exceeds maximum of {} bytes",
                    metadata.size, MAX_FILE_SIZE
                ),
            });
        }
    }

    let bytes = runtime
        .read_file(path)
        .await
        .map_err(|e| AnalyzeError::ModuleParse {
            path: path.to_path_buf(),
            reason: format!("cannot read file: {e}"),
        })?;

    String::from_utf8(bytes).map_err(|e| AnalyzeError::ModuleParse {
        path: path.to_path_buf(),
        reason: format!("invalid UTF-8: {e}"),
    })
}
