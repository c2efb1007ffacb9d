use base64::{engine::general_purpose, Engine as _};
use image::{ImageFormat, ImageReader};
use serde::Serialize;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;

pub mod provider;
pub mod remote;
pub mod store;

pub use provider::{ImageProvider, ResolvedImage};
pub use remote::{HttpImagerySource, ImagerySource};
pub use store::LocalImageStore;

/// Decimal places used when turning a coordinate into a cache key
pub const CACHE_KEY_PRECISION: usize = 4;

/// Error types for image acquisition
#[derive(Debug, thiserror::Error)]
pub enum ImageryError {
    #[error("Invalid coordinate ({latitude}, {longitude}): latitude must be within [-90, 90] and longitude within [-180, 180]")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("No image available for {key}: {reason}")]
    Unavailable { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),
}

impl ImageryError {
    pub fn unavailable(coordinate: &Coordinate, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            key: coordinate.cache_key(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImageryError>;

/// A validated (latitude, longitude) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(ImageryError::InvalidCoordinate { latitude, longitude });
        }

        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Fixed-precision key (`{lat}_{lon}`) naming this coordinate in the image store
    pub fn cache_key(&self) -> String {
        format!(
            "{}_{}",
            fixed_precision(self.latitude),
            fixed_precision(self.longitude)
        )
    }

    /// Two coordinates are the same location when their cache keys match
    pub fn same_location(&self, other: &Coordinate) -> bool {
        self.cache_key() == other.cache_key()
    }

    /// Parse a cache key (file stem) back into a coordinate
    pub fn from_cache_key(key: &str) -> Option<Self> {
        let (lat, lon) = key.split_once('_')?;
        Self::new(lat.parse().ok()?, lon.parse().ok()?).ok()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}",
            fixed_precision(self.latitude),
            fixed_precision(self.longitude)
        )
    }
}

/// Round to the key precision; values that round to zero never carry a sign
fn fixed_precision(value: f64) -> String {
    let formatted = format!("{:.prec$}", value, prec = CACHE_KEY_PRECISION);
    match formatted.strip_prefix('-') {
        Some(unsigned) if unsigned.bytes().all(|b| b == b'0' || b == b'.') => unsigned.to_string(),
        _ => formatted,
    }
}

impl FromStr for Coordinate {
    type Err = ImageryError;

    /// Parses `"lat,lon"`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ImageryError::InvalidCoordinate {
            latitude: f64::NAN,
            longitude: f64::NAN,
        };

        let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
        let latitude: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let longitude: f64 = lon.trim().parse().map_err(|_| invalid())?;
        Self::new(latitude, longitude)
    }
}

/// Image payload resolved for a coordinate. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct RooftopImage {
    coordinate: Coordinate,
    bytes: Arc<[u8]>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl RooftopImage {
    /// Wrap raw bytes, checking that they carry a decodable image header
    pub fn from_bytes(coordinate: Coordinate, bytes: Vec<u8>) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format()?;
        let format = reader.format().ok_or_else(|| {
            ImageryError::unavailable(&coordinate, "payload is not a recognised image format")
        })?;
        let (width, height) = reader.into_dimensions()?;

        Ok(Self {
            coordinate,
            bytes: bytes.into(),
            format,
            width,
            height,
        })
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Preferred file extension for this image's format
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}
