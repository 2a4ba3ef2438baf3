//! Result storage.
//!
//! Every successful request writes one PNG named `<uuid-v4>.png` into the
//! results directory. Files are never cleaned up here. Lookups only accept
//! names of that exact shape, so a name can never address anything outside
//! the directory.

use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::TilemarkError;

/// URL prefix results are served under.
pub const RESULTS_URL_PREFIX: &str = "/static/results";

/// A directory of generated results.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, TilemarkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            TilemarkError::Persist(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `image` as PNG under a fresh name and return the name.
    pub fn save(&self, image: &RgbaImage) -> Result<String, TilemarkError> {
        let name = format!("{}.png", Uuid::new_v4());
        let path = self.dir.join(&name);
        image.save_with_format(&path, ImageFormat::Png).map_err(|e| {
            TilemarkError::Persist(format!("Failed to write {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "stored watermarked image");
        Ok(name)
    }

    /// Filesystem path of a stored result, if `name` is a valid result name.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        is_result_name(name).then(|| self.dir.join(name))
    }

    /// Public URL of a stored result.
    pub fn url_for(name: &str) -> String {
        format!("{}/{}", RESULTS_URL_PREFIX, name)
    }
}

/// True for `<hyphenated-uuid>.png`.
pub fn is_result_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".png") else {
        return false;
    };
    match Uuid::try_parse(stem) {
        Ok(id) => id.hyphenated().to_string() == stem.to_ascii_lowercase(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_save_and_locate() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path().join("results")).unwrap();

        let img = RgbaImage::from_pixel(3, 2, Rgba([9, 8, 7, 255]));
        let name = store.save(&img).unwrap();
        assert!(is_result_name(&name));

        let path = store.path_for(&name).unwrap();
        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(reloaded, img);
        assert_eq!(ResultStore::url_for(&name), format!("/static/results/{}", name));
    }

    #[test]
    fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let img = RgbaImage::new(1, 1);
        assert_ne!(store.save(&img).unwrap(), store.save(&img).unwrap());
    }

    #[test]
    fn test_rejects_foreign_names() {
        assert!(is_result_name("67e55044-10b1-426f-9247-bb680e5fe0c8.png"));
        assert!(!is_result_name("67e55044-10b1-426f-9247-bb680e5fe0c8.jpg"));
        assert!(!is_result_name("67e5504410b1426f9247bb680e5fe0c8.png"));
        assert!(!is_result_name("../secret.png"));
        assert!(!is_result_name("..%2F..%2Fetc%2Fpasswd"));
        assert!(!is_result_name(".png"));

        let store = ResultStore { dir: PathBuf::from("/results") };
        assert!(store.path_for("../../etc/passwd").is_none());
    }

    #[test]
    fn test_unwritable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let store = ResultStore { dir: file };
        let err = store.save(&RgbaImage::new(1, 1)).err().unwrap();
        assert!(matches!(err, TilemarkError::Persist(_)));
    }
}
