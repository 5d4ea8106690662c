//! Byte-for-byte file copy for files that need no re-encoding.

use std::fs::FileTimes;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Copies `src` to `dst` and carries over the source's access and modification times.
///
/// Timestamp transfer is best effort; the copy itself is what can fail.
pub async fn copy_preserving_times(src: &Path, dst: &Path) -> std::io::Result<u64> {
    let bytes = fs::copy(src, dst).await?;

    if let Err(e) = transfer_times(src, dst).await {
        debug!(dst = ?dst, error = %e, "Could not preserve timestamps");
    }

    Ok(bytes)
}

async fn transfer_times(src: &Path, dst: &Path) -> std::io::Result<()> {
    let metadata = fs::metadata(src).await?;
    let mut times = FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }

    let file = fs::OpenOptions::new().write(true).open(dst).await?;
    let file = file.into_std().await;
    tokio::task::spawn_blocking(move || file.set_times(times))
        .await
        .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.mp4");
        let dst = dir.path().join("dst.mp4");
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        std::fs::write(&src, &payload).unwrap();

        let bytes = copy_preserving_times(&src, &dst).await.unwrap();
        assert_eq!(bytes, payload.len() as u64);
        assert_eq!(std::fs::read(&dst).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_copy_preserves_modified_time() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.mov");
        let dst = dir.path().join("dst.mov");
        std::fs::write(&src, b"proxy").unwrap();

        let past = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let file = std::fs::OpenOptions::new().write(true).open(&src).unwrap();
        file.set_modified(past).unwrap();
        drop(file);

        copy_preserving_times(&src, &dst).await.unwrap();
        let copied = std::fs::metadata(&dst).unwrap().modified().unwrap();
        assert_eq!(copied, past);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_read_only_copy_still_succeeds() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let src = dir.path().join("locked.mp4");
        let dst = dir.path().join("out.mp4");
        std::fs::write(&src, b"locked proxy").unwrap();
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o444)).unwrap();

        // The copy inherits read-only permissions, so reopening it for
        // timestamps may fail; the copy must still count
        let bytes = copy_preserving_times(&src, &dst).await.unwrap();
        assert_eq!(bytes, 12);
        assert_eq!(std::fs::read(&dst).unwrap(), b"locked proxy");
    }

    #[tokio::test]
    async fn test_copy_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result =
            copy_preserving_times(&dir.path().join("missing.mp4"), &dir.path().join("out.mp4"))
                .await;
        assert!(result.is_err());
    }
}
