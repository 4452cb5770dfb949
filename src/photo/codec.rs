use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{
    DynamicImage, ExtendedColorType, GenericImageView, ImageDecoder, ImageEncoder, ImageError,
    ImageFormat, ImageReader,
};
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::debug;

use super::file::ImageFile;
use crate::error::{CatalogError, Result};

/// Default long-edge target in pixels
pub const DEFAULT_MAX_WIDTH: u32 = 800;

/// Default lossy quality (0.0 - 1.0)
pub const DEFAULT_QUALITY: f32 = 0.8;

/// Uploads above this size are rejected (10 MiB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Media types accepted by default. `image/jpg` is a common non-standard alias.
pub const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Resize and re-encode parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressOptions {
    /// Images wider than this are scaled down, keeping aspect ratio
    pub max_width: u32,
    /// JPEG quality factor. PNG and WebP are written lossless and ignore it.
    pub quality: f32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        CompressOptions {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
        }
    }
}

/// Codec limits and defaults, usually taken from the catalog config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub max_width: u32,
    pub quality: f32,
    pub max_file_size: u64,
    pub allowed_types: Vec<String>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        ImageSettings {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
            max_file_size: MAX_FILE_SIZE,
            allowed_types: ALLOWED_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl ImageSettings {
    pub fn compress_options(&self) -> CompressOptions {
        CompressOptions {
            max_width: self.max_width,
            quality: self.quality,
        }
    }
}

/// Turns user-selected image files into size-bounded data URIs
#[derive(Debug, Clone, Default)]
pub struct ImageCodec {
    settings: ImageSettings,
}

impl ImageCodec {
    pub fn new(settings: ImageSettings) -> Self {
        ImageCodec { settings }
    }

    pub fn settings(&self) -> &ImageSettings {
        &self.settings
    }

    /// Check the declared media type and size. Does not look at the bytes.
    pub fn validate(&self, file: &ImageFile) -> Result<()> {
        let declared = normalize(&file.media_type);
        if !self.settings.allowed_types.iter().any(|t| normalize(t) == declared) {
            return Err(CatalogError::UnsupportedFormat {
                media_type: file.media_type.clone(),
            });
        }

        let size = file.size();
        if size > self.settings.max_file_size {
            return Err(CatalogError::FileTooLarge {
                size,
                limit: self.settings.max_file_size,
            });
        }
        Ok(())
    }

    /// Decode, shrink to `options.max_width` if wider, and re-encode in the
    /// declared media type. Name and media type are kept.
    pub async fn compress(&self, file: ImageFile, options: CompressOptions) -> Result<ImageFile> {
        // Spawn blocking because decoding and resampling are CPU-bound
        let name = file.name.clone();
        task::spawn_blocking(move || compress_blocking(file, options))
            .await
            .map_err(|e| CatalogError::read(format!("compress {name}"), e))?
    }

    /// Validate, compress with the configured options and encode to a data URI.
    pub async fn prepare(&self, file: ImageFile) -> Result<String> {
        self.validate(&file)?;
        let compressed = self.compress(file, self.settings.compress_options()).await?;
        Ok(encode_to_data_uri(&compressed))
    }
}

/// `data:<media type>;base64,<payload>`, usable directly as an image source
pub fn encode_to_data_uri(file: &ImageFile) -> String {
    format!("data:{};base64,{}", file.media_type, STANDARD.encode(&file.data))
}

/// Split a base64 data URI back into media type and bytes
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (media_type, payload) = rest.split_once(";base64,")?;
    let data = STANDARD.decode(payload).ok()?;
    Some((media_type.to_string(), data))
}

fn normalize(media_type: &str) -> String {
    media_type.trim().to_ascii_lowercase()
}

fn output_format(media_type: &str) -> Option<ImageFormat> {
    match normalize(media_type).as_str() {
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

fn compress_blocking(file: ImageFile, options: CompressOptions) -> Result<ImageFile> {
    let decode_error = |source| CatalogError::DecodeError {
        name: file.name.clone(),
        source,
    };

    let format = output_format(&file.media_type).ok_or_else(|| CatalogError::UnsupportedFormat {
        media_type: file.media_type.clone(),
    })?;

    // Sniff the real format from the bytes; only the output follows the declared type
    let mut decoder = ImageReader::new(Cursor::new(&file.data))
        .with_guessed_format()
        .map_err(|e| decode_error(ImageError::IoError(e)))?
        .into_decoder()
        .map_err(decode_error)?;

    // The encoders write no EXIF, so the stored pixels must already be upright
    let orientation = decoder.orientation().map_err(decode_error)?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
    img.apply_orientation(orientation);
    let (width, height) = img.dimensions();

    let img = if width > options.max_width && options.max_width > 0 {
        let new_height = scaled_height(width, height, options.max_width);
        debug!(
            "Resizing {} from {}x{} to {}x{}",
            file.name, width, height, options.max_width, new_height
        );
        img.resize_exact(options.max_width, new_height, FilterType::Lanczos3)
    } else {
        img
    };

    let data = encode(&img, format, options.quality).map_err(decode_error)?;
    debug!("Compressed {}: {} -> {} bytes", file.name, file.data.len(), data.len());

    Ok(ImageFile {
        data,
        ..file
    })
}

/// Height that keeps the aspect ratio at the new width, never below 1
fn scaled_height(width: u32, height: u32, new_width: u32) -> u32 {
    let scaled = (f64::from(height) * f64::from(new_width) / f64::from(width)).round();
    (scaled as u32).max(1)
}

fn encode(img: &DynamicImage, format: ImageFormat, quality: f32) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    let (width, height) = img.dimensions();

    match format {
        ImageFormat::Jpeg => {
            let rgb = img.to_rgb8();
            let quality = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
            JpegEncoder::new_with_quality(&mut buf, quality).encode(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
        ImageFormat::WebP => {
            let rgba = img.to_rgba8();
            WebPEncoder::new_lossless(&mut buf).write_image(
                rgba.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )?;
        }
        _ => {
            let rgba = img.to_rgba8();
            PngEncoder::new(&mut buf).write_image(
                rgba.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )?;
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn jpeg(width: u32, height: u32) -> ImageFile {
        ImageFile::new("shirt.jpg", "image/jpeg", image_bytes(width, height, ImageFormat::Jpeg))
    }

    #[test]
    fn test_validate_accepts_allowed_types() {
        let codec = ImageCodec::default();
        for media_type in ["image/jpeg", "image/jpg", "image/png", "image/webp", "IMAGE/PNG"] {
            let file = ImageFile::new("a", media_type, vec![0; 16]);
            assert!(codec.validate(&file).is_ok(), "{media_type}");
        }
    }

    #[test]
    fn test_validate_rejects_text() {
        let codec = ImageCodec::default();
        let file = ImageFile::new("notes.txt", "text/plain", b"hello".to_vec());
        assert_eq!(codec.validate(&file).unwrap_err().kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_validate_size_ceiling() {
        let codec = ImageCodec::default();

        let big = ImageFile::new("big.jpg", "image/jpeg", vec![0; 15 * 1024 * 1024]);
        assert_eq!(codec.validate(&big).unwrap_err().kind(), ErrorKind::FileTooLarge);

        let exact = ImageFile::new("edge.jpg", "image/jpeg", vec![0; MAX_FILE_SIZE as usize]);
        assert!(codec.validate(&exact).is_ok());
    }

    #[tokio::test]
    async fn test_compress_scales_down_wide_image() {
        let codec = ImageCodec::default();
        let out = codec
            .compress(jpeg(2000, 1000), CompressOptions::default())
            .await
            .unwrap();

        assert_eq!(out.name, "shirt.jpg");
        assert_eq!(out.media_type, "image/jpeg");
        assert_eq!(out.dimensions().unwrap(), (800, 400));
    }

    /// Insert an APP1 Exif segment carrying only an Orientation tag after SOI
    fn with_orientation(jpeg: &[u8], orientation: u8) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\x00\x2A\x00\x00\x00\x08");
        tiff.extend_from_slice(&[0x00, 0x01]);
        tiff.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        tiff.extend_from_slice(&[0x00, orientation, 0x00, 0x00]);
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);
        let length = (payload.len() + 2) as u16;

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[tokio::test]
    async fn test_compress_applies_exif_rotation() {
        let codec = ImageCodec::default();
        let rotated = with_orientation(&image_bytes(2000, 1500, ImageFormat::Jpeg), 6);
        let file = ImageFile::new("portrait.jpg", "image/jpeg", rotated);

        let out = codec.compress(file, CompressOptions::default()).await.unwrap();
        assert_eq!(out.dimensions().unwrap(), (800, 1067));
    }

    #[tokio::test]
    async fn test_compress_keeps_narrow_image_size() {
        let codec = ImageCodec::default();
        let file = ImageFile::new("pants.png", "image/png", image_bytes(320, 240, ImageFormat::Png));
        let out = codec.compress(file, CompressOptions::default()).await.unwrap();

        assert_eq!(out.dimensions().unwrap(), (320, 240));
        assert_eq!(image::guess_format(&out.data).unwrap(), ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_compress_webp_stays_webp() {
        let codec = ImageCodec::default();
        let file = ImageFile::new("hat.webp", "image/webp", image_bytes(1200, 600, ImageFormat::Png));
        let out = codec.compress(file, CompressOptions::default()).await.unwrap();

        assert_eq!(image::guess_format(&out.data).unwrap(), ImageFormat::WebP);
        assert_eq!(out.dimensions().unwrap(), (800, 400));
    }

    #[tokio::test]
    async fn test_compress_garbage_is_decode_error() {
        let codec = ImageCodec::default();
        let file = ImageFile::new("broken.jpg", "image/jpeg", b"definitely not a jpeg".to_vec());
        let err = codec.compress(file, CompressOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }

    #[tokio::test]
    async fn test_lower_quality_gives_smaller_jpeg() {
        let codec = ImageCodec::default();
        let high = codec
            .compress(jpeg(640, 480), CompressOptions { max_width: 800, quality: 0.95 })
            .await
            .unwrap();
        let low = codec
            .compress(jpeg(640, 480), CompressOptions { max_width: 800, quality: 0.2 })
            .await
            .unwrap();
        assert!(low.size() < high.size());
    }

    #[tokio::test]
    async fn test_prepare_produces_data_uri() {
        let codec = ImageCodec::default();
        let uri = codec.prepare(jpeg(1000, 500)).await.unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));

        let (media_type, data) = decode_data_uri(&uri).unwrap();
        assert_eq!(media_type, "image/jpeg");
        let (w, h) = image::load_from_memory(&data).unwrap().dimensions();
        assert_eq!((w, h), (800, 400));
    }

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(2000, 1000, 800), 400);
        assert_eq!(scaled_height(3000, 2000, 800), 533);
        assert_eq!(scaled_height(5000, 1, 800), 1);
    }

    #[test]
    fn test_decode_data_uri_rejects_plain_url() {
        assert!(decode_data_uri("https://example.com/a.jpg").is_none());
    }
}
