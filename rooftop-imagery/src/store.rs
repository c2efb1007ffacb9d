use crate::{Coordinate, ImageryError, Result, RooftopImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions probed, in order, when looking up a cached image
pub const KNOWN_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Flat directory of images named `{lat}_{lon}.{ext}`
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an image with the given extension would have for this coordinate
    pub fn path_for(&self, coordinate: &Coordinate, extension: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", coordinate.cache_key(), extension))
    }

    /// Locate a cached image file for the coordinate, if any
    pub fn find(&self, coordinate: &Coordinate) -> Option<PathBuf> {
        KNOWN_EXTENSIONS
            .iter()
            .map(|ext| self.path_for(coordinate, ext))
            .find(|path| path.is_file())
    }

    /// Load the cached image for a coordinate. `Ok(None)` means nothing is cached.
    pub fn load(&self, coordinate: &Coordinate) -> Result<Option<RooftopImage>> {
        let Some(path) = self.find(coordinate) else {
            return Ok(None);
        };

        debug!("Loading cached image {}", path.display());
        let bytes = fs::read(&path)?;
        let image = RooftopImage::from_bytes(*coordinate, bytes).map_err(|e| {
            ImageryError::unavailable(
                coordinate,
                format!("cached file {} is unreadable: {}", path.display(), e),
            )
        })?;

        Ok(Some(image))
    }

    /// Persist an image under its coordinate's key. Writes to a temporary
    /// file first so a partially written image is never picked up by `find`.
    pub fn save(&self, image: &RooftopImage) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let path = self.path_for(&image.coordinate(), image.extension());
        let tmp_path = path.with_extension(format!("{}.part", image.extension()));

        fs::write(&tmp_path, image.bytes())?;
        fs::rename(&tmp_path, &path)?;

        debug!("Stored image {}", path.display());
        Ok(path)
    }

    /// All coordinates that currently have an image in the store, sorted by key
    pub fn list(&self) -> Result<Vec<Coordinate>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut coordinates: Vec<Coordinate> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| KNOWN_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(Coordinate::from_cache_key)
            })
            .collect();

        coordinates.sort_by_key(|c| c.cache_key());
        coordinates.dedup_by(|a, b| a.same_location(b));
        Ok(coordinates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use image::ImageFormat;

    #[test]
    fn test_missing_image_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());
        let coord = Coordinate::new(10.0, 20.0).unwrap();

        assert!(store.find(&coord).is_none());
        assert!(store.load(&coord).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path().join("images"));
        let coord = Coordinate::new(27.7778, 78.8667).unwrap();
        let image = RooftopImage::from_bytes(coord, png_bytes(8, 8)).unwrap();

        let path = store.save(&image).unwrap();
        assert_eq!(path.file_name().unwrap(), "27.7778_78.8667.png");

        let loaded = store.load(&coord).unwrap().unwrap();
        assert_eq!(loaded.bytes(), image.bytes());
        assert_eq!(loaded.coordinate(), coord);
    }

    #[test]
    fn test_jpeg_keeps_its_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());
        let coord = Coordinate::new(1.5, 2.5).unwrap();
        let image =
            RooftopImage::from_bytes(coord, encoded(8, 8, ImageFormat::Jpeg)).unwrap();

        let path = store.save(&image).unwrap();
        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(store.find(&coord), Some(path));
    }

    #[test]
    fn test_corrupt_cached_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());
        let coord = Coordinate::new(3.0, 4.0).unwrap();
        fs::write(store.path_for(&coord, "png"), b"garbage").unwrap();

        let err = store.load(&coord).unwrap_err();
        assert!(matches!(err, ImageryError::Unavailable { .. }));
    }

    #[test]
    fn test_list_cached_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());

        for (lat, lon) in [(5.0, 6.0), (-1.25, 100.5)] {
            let coord = Coordinate::new(lat, lon).unwrap();
            store
                .save(&RooftopImage::from_bytes(coord, png_bytes(4, 4)).unwrap())
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("sample.png"), png_bytes(4, 4)).unwrap();

        let listed = store.list().unwrap();
        let keys: Vec<String> = listed.iter().map(|c| c.cache_key()).collect();
        assert_eq!(keys, vec!["-1.2500_100.5000", "5.0000_6.0000"]);
    }

    #[test]
    fn test_list_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path().join("does-not-exist"));
        assert!(store.list().unwrap().is_empty());
    }
}
