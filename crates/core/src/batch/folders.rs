//! Input listing and output folder housekeeping.

use std::path::Path;
use tokio::fs;

use super::types::MediaFile;

/// Lowercases extensions and strips a leading dot, dropping blanks.
pub fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// Case-insensitive extension check against an already normalized allow-list.
pub fn has_allowed_extension(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| allowed.iter().any(|a| *a == ext))
}

/// Lists the regular files in `input_dir` whose extension is allowed.
///
/// Only the top level is scanned. Results are sorted by file name so a given
/// folder always yields the same order.
pub async fn list_media_files(
    input_dir: &Path,
    output_dir: &Path,
    allowed: &[String],
) -> std::io::Result<Vec<MediaFile>> {
    let mut entries = fs::read_dir(input_dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // Follows symlinks, so a linked clip counts as a file
        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(_) => continue,
        };
        if !metadata.is_file() || !has_allowed_extension(&path, allowed) {
            continue;
        }
        if let Some(file) = MediaFile::new(path, output_dir) {
            files.push(file);
        }
    }

    files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(files)
}

/// Whether `dir` contains anything at all.
pub async fn dir_has_entries(dir: &Path) -> std::io::Result<bool> {
    let mut entries = fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_some())
}

/// Deletes the regular files at the top level of `dir`, returning how many were removed.
///
/// Subfolders are left alone.
pub async fn clear_output_dir(dir: &Path) -> std::io::Result<usize> {
    let mut entries = fs::read_dir(dir).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if file_type.is_file() || file_type.is_symlink() {
            fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }

    Ok(removed)
}
