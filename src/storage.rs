use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use uuid::Uuid;

/// Uploaded photos are capped at 2 MB.
pub const MAX_PHOTO_BYTES: usize = 2 * 1024 * 1024;

pub const ALLOWED_PHOTO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub const USER_PHOTO_DIR: &str = "user_photos";

/// Lowercased extension of an uploaded file name.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub fn is_allowed_photo_extension(ext: &str) -> bool {
    ALLOWED_PHOTO_EXTENSIONS.contains(&ext)
}

/// Write uploaded bytes under `root/subdir` with a generated name and
/// return the media-relative path stored on the owning record.
pub async fn store(root: &str, subdir: &str, ext: &str, bytes: &[u8]) -> Result<String> {
    let dir = Path::new(root).join(subdir);
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("failed to create media directory {}", dir.display()))?;

    let name = format!("{}.{}", Uuid::new_v4(), ext);
    let path = dir.join(&name);
    fs::write(&path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(format!("{}/{}", subdir, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of("Photo.JPG"), Some("jpg".into()));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".into()));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn photo_extension_allow_list() {
        assert!(is_allowed_photo_extension("jpg"));
        assert!(is_allowed_photo_extension("jpeg"));
        assert!(is_allowed_photo_extension("png"));
        assert!(!is_allowed_photo_extension("gif"));
        assert!(!is_allowed_photo_extension("svg"));
    }

    #[tokio::test]
    async fn stores_bytes_under_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let rel = store(root, USER_PHOTO_DIR, "png", b"not really a png")
            .await
            .unwrap();

        assert!(rel.starts_with("user_photos/"));
        assert!(rel.ends_with(".png"));
        let on_disk = dir.path().join(&rel);
        assert_eq!(fs::read(&on_disk).await.unwrap(), b"not really a png");
    }
}
