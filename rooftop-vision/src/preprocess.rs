use crate::EstimationError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, ImageFormat};
use rooftop_imagery::RooftopImage;
use std::io::Cursor;

/// Side length of the square image sent to the vision model
pub const INFERENCE_SIZE: u32 = 640;

/// Decode, resize to `INFERENCE_SIZE`², and re-encode as a PNG data URL.
///
/// The prompt tells the model to assume roughly 1 m per pixel, so every
/// image is presented at the same fixed size regardless of its source.
pub fn prepare_for_inference(image: &RooftopImage) -> Result<String, EstimationError> {
    let decoded = image::load_from_memory_with_format(image.bytes(), image.format())?;

    let resized = decoded.resize_exact(INFERENCE_SIZE, INFERENCE_SIZE, FilterType::Lanczos3);

    let mut png_bytes = Vec::new();
    resized.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;

    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png_bytes)))
}
