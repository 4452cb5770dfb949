//! Image ingestion module
//!
//! This module handles:
//! - Loading user-selected image files (file.rs)
//! - Validating, downsampling and re-encoding them (codec.rs)
//! - Embedding the result as a data URI inside garment records

pub mod codec;
pub mod file;

pub use codec::{decode_data_uri, encode_to_data_uri, CompressOptions, ImageCodec, ImageSettings};
pub use file::ImageFile;
