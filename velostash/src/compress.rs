//! Best-effort image compression for uploaded photos.
//!
//! Images are stored inline as data URLs, which makes them the largest values in the
//! store. Compression never blocks a save: any failure hands back the original upload.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, RgbImage, codecs::jpeg::JpegEncoder, imageops::FilterType};
use tracing::{debug, warn};

use crate::CompressionSettings;

/// An uploaded image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    /// Declared media type, e.g. `image/png`.
    pub mime: String,
}

impl ImageInput {
    pub fn new(bytes: impl Into<Vec<u8>>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    /// The upload as a `data:` URL, the form images are stored in.
    pub fn to_data_url(&self) -> String {
        data_url(&self.mime, &self.bytes)
    }
}

/// Why the original upload was kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    Decode(String),
    Encode(String),
    /// Re-encoding did not make the image smaller.
    NotSmaller,
    /// The blocking worker panicked or was cancelled.
    TaskFailed(String),
}

/// Result of [`compress_image`]. Both variants carry a usable data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compression {
    Compressed { data_url: String },
    Original { data_url: String, reason: FallbackReason },
}

impl Compression {
    pub fn data_url(&self) -> &str {
        match self {
            Self::Compressed { data_url } | Self::Original { data_url, .. } => data_url,
        }
    }

    pub fn into_data_url(self) -> String {
        match self {
            Self::Compressed { data_url } | Self::Original { data_url, .. } => data_url,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed { .. })
    }
}

fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Scales an image down to fit `settings.max_dimension` and re-encodes it as JPEG.
///
/// If the encoded data URL is still longer than `settings.size_threshold`, it is encoded
/// once more at [`CompressionSettings::retry_quality`]. The shorter of the result and the
/// original is returned, so the output is never longer than the input's data URL. Decode
/// and encode failures fall back to the original.
///
/// Decoding and encoding run on the blocking thread pool, so this must be awaited inside a
/// Tokio runtime.
pub async fn compress_image(input: ImageInput, settings: &CompressionSettings) -> Compression {
    let original = input.to_data_url();
    let settings = settings.clone();
    let bytes = input.bytes;

    let outcome = tokio::task::spawn_blocking(move || reencode(&bytes, &settings))
        .await
        .unwrap_or_else(|err| Err(FallbackReason::TaskFailed(err.to_string())));

    match outcome {
        Ok(compressed) if compressed.len() < original.len() => {
            debug!(
                original = original.len(),
                compressed = compressed.len(),
                "image compressed"
            );
            Compression::Compressed {
                data_url: compressed,
            }
        }
        Ok(_) => Compression::Original {
            data_url: original,
            reason: FallbackReason::NotSmaller,
        },
        Err(reason) => {
            warn!(?reason, "failed to compress image, using original");
            Compression::Original {
                data_url: original,
                reason,
            }
        }
    }
}

/// Compresses several uploads in order.
pub async fn compress_images(
    inputs: Vec<ImageInput>,
    settings: &CompressionSettings,
) -> Vec<Compression> {
    let mut results = Vec::with_capacity(inputs.len());
    for input in inputs {
        results.push(compress_image(input, settings).await);
    }
    results
}

fn reencode(bytes: &[u8], settings: &CompressionSettings) -> Result<String, FallbackReason> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| FallbackReason::Decode(e.to_string()))?;
    let rgb = fit_within(decoded, settings.max_dimension).to_rgb8();

    let first = encode_jpeg(&rgb, settings.quality)?;
    if first.len() <= settings.size_threshold {
        return Ok(first);
    }
    encode_jpeg(&rgb, settings.retry_quality())
}

/// Scales proportionally so the largest side is at most `max_dimension`, never below 1px.
fn fit_within(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let largest = width.max(height);
    if largest <= max_dimension {
        return image;
    }
    let scale = f64::from(max_dimension) / f64::from(largest);
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    image.resize_exact(scaled(width), scaled(height), FilterType::Triangle)
}

fn encode_jpeg(rgb: &RgbImage, quality: f32) -> Result<String, FallbackReason> {
    let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(rgb)
        .map_err(|e| FallbackReason::Encode(e.to_string()))?;
    Ok(data_url("image/jpeg", &buffer))
}
