//! Outfit photos embedded in each garment record
//!
//! Coordinates have no storage of their own; every change is a full
//! read-modify-write of the parent record through [`RecordStore::modify`].

use tracing::{debug, warn};
use uuid::Uuid;

use super::data::{CoordinateEntry, GarmentRecord, NewCoordinate};
use super::library::RecordStore;
use crate::error::{CatalogError, Result};

#[derive(Debug, Clone)]
pub struct CoordinateManager {
    store: RecordStore,
}

impl CoordinateManager {
    pub fn new(store: RecordStore) -> Self {
        CoordinateManager { store }
    }

    /// Append a coordinate to the garment and return the stored entry.
    ///
    /// Earlier entries keep their order. Fails with `NotFound` if the garment
    /// does not exist.
    pub async fn add_coordinate(
        &self,
        garment_id: &str,
        coordinate: NewCoordinate,
    ) -> Result<CoordinateEntry> {
        let record = self
            .store
            .modify(garment_id, move |record| {
                let entry = CoordinateEntry {
                    id: fresh_entry_id(record),
                    photo_url: coordinate.photo_url,
                    date: coordinate.date,
                    description: coordinate.description,
                };
                record.coordinates.push(entry);
                Ok(())
            })
            .await?;

        // modify hands back the record as written, so the new entry is last
        let entry = record
            .coordinates
            .last()
            .cloned()
            .ok_or_else(|| CatalogError::not_found(garment_id))?;
        debug!("Added coordinate {} to garment {}", entry.id, garment_id);
        Ok(entry)
    }

    /// Remove the coordinate with `entry_id`. An unknown entry is a no-op.
    pub async fn delete_coordinate(&self, garment_id: &str, entry_id: &str) -> Result<()> {
        let target = entry_id.to_string();
        let garment = garment_id.to_string();
        self.store
            .modify(garment_id, move |record| {
                let before = record.coordinates.len();
                record.coordinates.retain(|c| c.id != target);
                if record.coordinates.len() == before {
                    warn!("Coordinate {} not found on garment {}", target, garment);
                }
                Ok(())
            })
            .await?;
        Ok(())
    }
}

/// UUID that does not clash with any entry already on the record
fn fresh_entry_id(record: &GarmentRecord) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if record.coordinates.iter().all(|c| c.id != id) {
            return id;
        }
    }
}
