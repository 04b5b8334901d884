//! Reading command-line inputs into assets.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use ferry_transform::Asset;
use std::path::{Path, PathBuf};

/// Absolute form of `path`. Lexical only; the file need not exist.
fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).or_raise(|| ErrorKind::Read(path.to_path_buf()))
}

async fn read_one(path: &Path) -> Result<Option<Asset>> {
    let path = absolute(path)?;
    let metadata = tokio::fs::metadata(&path).await.or_raise(|| ErrorKind::Read(path.clone()))?;
    if metadata.is_dir() {
        tracing::warn!(path = %path.display(), "is a directory, skipped");
        return Ok(None);
    }
    let contents = tokio::fs::read(&path).await.or_raise(|| ErrorKind::Read(path.clone()))?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(Some(Asset::new(path, base, contents)))
}

/// Read every input. Directories and unreadable files are logged and left
/// out.
///
/// With `concat`, all readable inputs are joined with newlines into one asset
/// called `name`, placed beside the first input.
#[tracing::instrument(skip_all, fields(inputs = paths.len(), concat))]
pub async fn read_inputs(paths: &[PathBuf], concat: bool, name: Option<&str>) -> Vec<Asset> {
    let mut assets = Vec::with_capacity(paths.len());
    for path in paths {
        match read_one(path).await {
            Ok(Some(asset)) => assets.push(asset),
            Ok(None) => {},
            Err(err) => tracing::error!(path = %path.display(), error = ?err, "could not read input"),
        }
    }
    if !concat || assets.is_empty() {
        return assets;
    }

    let base = assets[0].base.clone();
    let name = name.map(str::to_string).unwrap_or_else(|| assets[0].file_name());
    let mut contents = Vec::new();
    for (index, asset) in assets.iter().enumerate() {
        if index > 0 {
            contents.push(b'\n');
        }
        contents.extend_from_slice(&asset.contents);
    }
    tracing::debug!(files = assets.len(), %name, "concatenated inputs");
    vec![Asset::new(base.join(name), base, contents)]
}
