//! In-memory image file as handed over by the presentation layer

use std::io::Cursor;
use std::path::Path;

use tracing::debug;

use crate::error::{CatalogError, Result};

/// An image file: name, declared media type and the raw bytes.
///
/// The declared media type is what the codec validates against; the bytes
/// are only inspected when the image is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        ImageFile {
            name: name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    /// Read a file from disk fully into memory.
    ///
    /// The media type is derived from the file extension, the way a browser
    /// file picker declares it. Unknown extensions get
    /// `application/octet-stream` and are rejected later by validation.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| CatalogError::read(format!("read image {}", path.display()), e))?;

        let media_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        debug!("Loaded {} ({}, {} bytes)", name, media_type, data.len());
        Ok(ImageFile::new(name, media_type, data))
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Pixel width and height, read from the header without a full decode
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        let decode_error = |source| CatalogError::DecodeError {
            name: self.name.clone(),
            source,
        };

        image::ImageReader::new(Cursor::new(&self.data))
            .with_guessed_format()
            .map_err(|e| decode_error(image::ImageError::IoError(e)))?
            .into_dimensions()
            .map_err(decode_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn test_open_declares_type_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jacket.png");
        std::fs::write(&path, png_bytes(4, 3)).unwrap();

        let file = ImageFile::open(&path).await.unwrap();
        assert_eq!(file.name, "jacket.png");
        assert_eq!(file.media_type, "image/png");
        assert_eq!(file.dimensions().unwrap(), (4, 3));
    }

    #[tokio::test]
    async fn test_open_missing_file_is_read_error() {
        let err = ImageFile::open("/nonexistent/coat.jpg").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadError);
    }

    #[test]
    fn test_dimensions_of_garbage() {
        let file = ImageFile::new("x.png", "image/png", b"not an image".to_vec());
        assert_eq!(file.dimensions().unwrap_err().kind(), ErrorKind::DecodeError);
    }
}
