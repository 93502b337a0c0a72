use std::io;
use std::path::PathBuf;

use geowatch_core::token::{photo_suffix, ChannelToken};

/// Photo files on disk, named `{token}_{hit}_{suffix}.{ext}`.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes `bytes` and returns the generated file name.
    pub async fn save(
        &self,
        token: &ChannelToken,
        hit_id: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = format!(
            "{}_{}_{}.{}",
            token,
            hit_id,
            photo_suffix(),
            extension_for(content_type)
        );
        tokio::fs::write(self.dir.join(&filename), bytes).await?;
        Ok(filename)
    }

    /// `Ok(None)` for unknown or unsafe names.
    pub async fn read(&self, filename: &str) -> io::Result<Option<Vec<u8>>> {
        if !is_safe_filename(filename) {
            return Ok(None);
        }
        match tokio::fs::read(self.dir.join(filename)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        _ => "jpg",
    }
}

pub fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// A bare file name: no separators, no leading dot, no `..`.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(Some("image/png")), "png");
        assert_eq!(extension_for(Some("IMAGE/WEBP")), "webp");
        assert_eq!(extension_for(Some("image/jpeg; q=1")), "jpg");
        assert_eq!(extension_for(Some("application/pdf")), "jpg");
        assert_eq!(extension_for(None), "jpg");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a_b_c.png"), "image/png");
        assert_eq!(content_type_for("a_b_c.jpg"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_safe_filename() {
        assert!(is_safe_filename("abc_1234abcd_00ff00ff.jpg"));
        assert!(!is_safe_filename("../store.json"));
        assert!(!is_safe_filename("a/b.jpg"));
        assert!(!is_safe_filename(".hidden"));
        assert!(!is_safe_filename("a..jpg"));
        assert!(!is_safe_filename(""));
    }

    #[tokio::test]
    async fn test_save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let photos = PhotoStore::new(dir.path().join("uploads"));
        let token = ChannelToken::parse("cam").unwrap();

        let name = photos
            .save(&token, "1234abcd", Some("image/png"), b"\x89PNG")
            .await
            .unwrap();

        assert!(name.starts_with("cam_1234abcd_"));
        assert!(name.ends_with(".png"));
        assert_eq!(photos.read(&name).await.unwrap().unwrap(), b"\x89PNG");
        assert_eq!(photos.read("missing.jpg").await.unwrap(), None);
        assert_eq!(photos.read("../x").await.unwrap(), None);
    }
}
