//! The catalog facade
//!
//! The single entry point for presentation code. It wires the record store,
//! the coordinate manager and the image codec together and passes their
//! errors through untouched.

use tracing::info;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::photo::{ImageCodec, ImageFile};
use crate::state::coordinates::CoordinateManager;
use crate::state::data::{
    CoordinateEntry, GarmentFields, GarmentPatch, GarmentRecord, NewCoordinate, NewGarment,
};
use crate::state::library::{RecordStore, StoreLocation};

/// Photo for a coordinate: a local file to ingest, or a URL kept as-is
#[derive(Debug, Clone)]
pub enum PhotoSource {
    File(ImageFile),
    Url(String),
}

#[derive(Debug, Clone)]
pub struct Catalog {
    store: RecordStore,
    coordinates: CoordinateManager,
    codec: ImageCodec,
}

impl Catalog {
    pub fn new(store: RecordStore, codec: ImageCodec) -> Self {
        Catalog {
            coordinates: CoordinateManager::new(store.clone()),
            store,
            codec,
        }
    }

    /// Build a catalog on the database named by the config
    pub fn from_config(config: &CatalogConfig) -> Self {
        let store = RecordStore::new(StoreLocation::File(config.database_path.clone()));
        Self::new(store, ImageCodec::new(config.image.clone()))
    }

    /// Open the underlying store up front instead of on first use
    pub async fn open(&self) -> Result<()> {
        self.store.open().await
    }

    /// Release the database connection. An in-memory catalog discards its
    /// records and refuses further calls until reopened.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn codec(&self) -> &ImageCodec {
        &self.codec
    }

    /// Validate, compress and embed `image`, then store a new garment with
    /// no coordinates. Returns the new id.
    pub async fn add_garment(&self, fields: GarmentFields, image: ImageFile) -> Result<String> {
        let image_url = self.codec.prepare(image).await?;
        self.store
            .create(NewGarment {
                fields,
                image_url,
                coordinates: Vec::new(),
            })
            .await
    }

    pub async fn list_garments(&self) -> Result<Vec<GarmentRecord>> {
        self.store.get_all().await
    }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<GarmentRecord>> {
        self.store.get_by_category(category).await
    }

    pub async fn list_recent(&self, limit: usize) -> Result<Vec<GarmentRecord>> {
        self.store.get_recent(limit).await
    }

    pub async fn get_garment(&self, id: &str) -> Result<Option<GarmentRecord>> {
        self.store.get_by_id(id).await
    }

    pub async fn update_garment(&self, id: &str, patch: GarmentPatch) -> Result<GarmentRecord> {
        self.store.update(id, patch).await
    }

    /// Swap the primary photo. The new image goes through the same pipeline as on creation.
    pub async fn replace_garment_image(&self, id: &str, image: ImageFile) -> Result<GarmentRecord> {
        let image_url = self.codec.prepare(image).await?;
        self.store
            .update(
                id,
                GarmentPatch {
                    image_url: Some(image_url),
                    ..GarmentPatch::default()
                },
            )
            .await
    }

    /// Callers are expected to have confirmed the delete with the user.
    pub async fn delete_garment(&self, id: &str) -> Result<()> {
        self.store.delete(id).await
    }

    /// Attach an outfit photo. Files are ingested like garment photos; URLs are stored verbatim.
    pub async fn add_coordinate_photo(
        &self,
        garment_id: &str,
        photo: PhotoSource,
        date: impl Into<String>,
        description: Option<String>,
    ) -> Result<CoordinateEntry> {
        let photo_url = match photo {
            PhotoSource::File(file) => self.codec.prepare(file).await?,
            PhotoSource::Url(url) => url,
        };

        self.coordinates
            .add_coordinate(
                garment_id,
                NewCoordinate {
                    photo_url,
                    date: date.into(),
                    description,
                },
            )
            .await
    }

    pub async fn remove_coordinate_photo(&self, garment_id: &str, entry_id: &str) -> Result<()> {
        self.coordinates.delete_coordinate(garment_id, entry_id).await
    }

    /// The whole catalog as one pretty-printed JSON array
    pub async fn export_json(&self) -> Result<String> {
        let mut records = self.store.get_all().await?;
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        serde_json::to_string_pretty(&records)
            .map_err(|e| CatalogError::read("serialize catalog export", e))
    }

    /// Insert every record of an export verbatim. Existing ids abort the import.
    pub async fn import_json(&self, json: &str) -> Result<usize> {
        let records: Vec<GarmentRecord> = serde_json::from_str(json)
            .map_err(|e| CatalogError::read("parse catalog export", e))?;
        let count = self.store.import(records).await?;
        info!("Imported {} garments into the catalog", count);
        Ok(count)
    }
}
