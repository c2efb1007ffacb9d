use crate::{Coordinate, ImageryError, ImagerySource, LocalImageStore, Result, RooftopImage};
use tracing::{debug, info, warn};

/// Image resolved for a request, noting whether a different location was substituted
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub image: RooftopImage,
    /// The coordinate originally asked for, when `image` belongs to a fallback location
    pub substituted_for: Option<Coordinate>,
}

/// Resolves coordinates to images: local store first, then the optional
/// remote source with write-through into the store.
pub struct ImageProvider {
    store: LocalImageStore,
    remote: Option<Box<dyn ImagerySource>>,
}

impl ImageProvider {
    pub fn new(store: LocalImageStore) -> Self {
        Self {
            store,
            remote: None,
        }
    }

    pub fn with_remote(mut self, source: Box<dyn ImagerySource>) -> Self {
        info!("Remote imagery source configured: {}", source.describe());
        self.remote = Some(source);
        self
    }

    pub fn store(&self) -> &LocalImageStore {
        &self.store
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Resolve the image for a coordinate.
    ///
    /// Fails with [`ImageryError::Unavailable`] when the store has no image for the
    /// coordinate's key and the remote source is absent or fails.
    pub async fn resolve(&self, coordinate: &Coordinate) -> Result<RooftopImage> {
        let key = coordinate.cache_key();

        if let Some(image) = self.store.load(coordinate)? {
            debug!("Image cache hit for {}", key);
            return Ok(image);
        }

        let Some(remote) = &self.remote else {
            info!("Image cache miss for {} and no remote source configured", key);
            return Err(ImageryError::unavailable(
                coordinate,
                format!(
                    "no image in {} and no remote imagery source configured",
                    self.store.root().display()
                ),
            ));
        };

        info!("Image cache miss for {}, fetching from remote source", key);
        let bytes = remote.fetch(coordinate).await?;
        let image = RooftopImage::from_bytes(*coordinate, bytes).map_err(|e| {
            ImageryError::unavailable(coordinate, format!("remote payload rejected: {}", e))
        })?;

        match self.store.save(&image) {
            Ok(path) => info!("Cached remote image at {}", path.display()),
            Err(e) => warn!("Failed to cache image for {}: {}", key, e),
        }

        Ok(image)
    }

    /// Resolve `requested`, substituting `fallback` only if the requested
    /// location has no image. The substitution is logged and reported back.
    pub async fn resolve_or_substitute(
        &self,
        requested: &Coordinate,
        fallback: &Coordinate,
    ) -> Result<ResolvedImage> {
        match self.resolve(requested).await {
            Ok(image) => Ok(ResolvedImage {
                image,
                substituted_for: None,
            }),
            Err(ImageryError::Unavailable { key, reason }) => {
                if fallback.same_location(requested) {
                    return Err(ImageryError::Unavailable { key, reason });
                }

                warn!(
                    "No image for requested location {} ({}); substituting fallback location {}",
                    requested, reason, fallback
                );

                let image = self.resolve(fallback).await?;
                Ok(ResolvedImage {
                    image,
                    substituted_for: Some(*requested),
                })
            }
            Err(e) => Err(e),
        }
    }
}
