//! Image signature sniffing and optional downscaling

use super::{ClassifyError, ClassifyResult, ImageInput};

/// Image formats accepted for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Detect a format from the leading bytes of a file
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"\xFF\xD8\xFF") {
            Some(ImageFormat::Jpeg)
        } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

/// Check that `data` looks like an image we can forward
pub fn validate_image_data(data: &[u8]) -> ClassifyResult<ImageFormat> {
    if data.len() < 8 {
        return Err(ClassifyError::InvalidImageData(
            "Image data too short".to_string(),
        ));
    }

    ImageFormat::detect(data)
        .ok_or_else(|| ClassifyError::InvalidImageData("Unrecognized image format".to_string()))
}

/// Options for shrinking large uploads before they are sent upstream
#[derive(Debug, Clone, PartialEq)]
pub struct DownscaleOptions {
    /// Images are scaled down to at most this width (aspect ratio kept)
    pub max_width: u32,
    /// Images smaller than this are passed through untouched
    pub min_bytes: usize,
    /// JPEG quality for the re-encoded image (1-100)
    pub jpeg_quality: u8,
}

impl Default for DownscaleOptions {
    fn default() -> Self {
        Self {
            max_width: 1200,
            min_bytes: 500 * 1024,
            jpeg_quality: 80,
        }
    }
}

/// Shrink a large image and re-encode it as JPEG.
///
/// Best effort: undecodable input, or a re-encode that saves nothing
/// without resizing, returns the input unchanged.
#[cfg(feature = "downscale")]
pub fn downscale(input: ImageInput, options: &DownscaleOptions) -> ImageInput {
    use ::image::codecs::jpeg::JpegEncoder;
    use ::image::imageops::FilterType;

    if input.data.len() < options.min_bytes {
        return input;
    }

    let decoded = match ::image::load_from_memory(&input.data) {
        Ok(img) => img,
        Err(e) => {
            tracing::debug!(error = %e, "could not decode image for downscaling, sending as is");
            return input;
        }
    };

    let (width, height) = (decoded.width(), decoded.height());
    let ratio = (f64::from(options.max_width) / f64::from(width.max(1))).min(1.0);
    let resized = if ratio < 1.0 {
        let new_width = ((f64::from(width) * ratio).round() as u32).max(1);
        let new_height = ((f64::from(height) * ratio).round() as u32).max(1);
        decoded.resize_exact(new_width, new_height, FilterType::Triangle)
    } else {
        decoded
    };

    let rgb = resized.to_rgb8();
    let mut encoded = Vec::new();
    let encoded_result =
        JpegEncoder::new_with_quality(&mut encoded, options.jpeg_quality).encode_image(&rgb);
    if let Err(e) = encoded_result {
        tracing::warn!(error = %e, "JPEG re-encode failed, sending original image");
        return input;
    }

    if ratio >= 1.0 && encoded.len() >= input.data.len() {
        return input;
    }

    tracing::debug!(
        from_bytes = input.data.len(),
        to_bytes = encoded.len(),
        width = rgb.width(),
        height = rgb.height(),
        "downscaled upload"
    );

    ImageInput {
        data: encoded,
        mime_type: ImageFormat::Jpeg.mime_type().to_string(),
        filename: input.filename,
    }
}

/// Without the `downscale` feature images are forwarded as uploaded
#[cfg(not(feature = "downscale"))]
pub fn downscale(input: ImageInput, _options: &DownscaleOptions) -> ImageInput {
    input
}
