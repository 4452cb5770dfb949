//! On-device wardrobe catalog.
//!
//! Garments are stored with their photo embedded as a data URI, plus an
//! ordered list of outfit ("coordinate") photos. [`Catalog`] is the entry
//! point; it composes the SQLite [`RecordStore`], the [`CoordinateManager`]
//! and the [`ImageCodec`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod photo;
pub mod state;
pub mod vocab;

pub use catalog::{Catalog, PhotoSource};
pub use config::CatalogConfig;
pub use error::{CatalogError, ErrorKind, Result};
pub use photo::{CompressOptions, ImageCodec, ImageFile, ImageSettings};
pub use state::coordinates::CoordinateManager;
pub use state::data::{
    CoordinateEntry, GarmentFields, GarmentPatch, GarmentRecord, NewCoordinate, NewGarment,
};
pub use state::library::{RecordStore, StoreLocation};
