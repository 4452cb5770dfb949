//! Shared data structures for the catalog
//!
//! These structs represent the data model that flows between
//! the database layer and the presentation layer. They serialize with
//! camelCase names so an exported catalog keeps the familiar JSON shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One catalogued clothing item
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GarmentRecord {
    /// Unique UUID, assigned at creation and never changed
    pub id: String,
    #[serde(flatten)]
    pub fields: GarmentFields,
    /// Primary photo as a data URI
    pub image_url: String,
    /// Outfit photos, in the order they were added
    #[serde(default)]
    pub coordinates: Vec<CoordinateEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Descriptive fields supplied by the presentation layer
///
/// Enumerated values (category, size, color...) arrive already validated;
/// the core stores them as-is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GarmentFields {
    pub category: String,
    pub size: String,
    pub color: String,
    pub buy_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub washing: Option<String>,
}

/// Everything needed to create a record; id and timestamps are assigned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewGarment {
    pub fields: GarmentFields,
    pub image_url: String,
    pub coordinates: Vec<CoordinateEntry>,
}

/// An outfit photo attached to a garment
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateEntry {
    /// Unique within the parent garment
    pub id: String,
    /// Data URI or external URL
    pub photo_url: String,
    /// ISO date/time supplied by the caller
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCoordinate {
    pub photo_url: String,
    pub date: String,
    pub description: Option<String>,
}

/// Explicit set of overridable fields for `update`
///
/// `None` leaves a field untouched. The optional descriptive fields use
/// `Some(None)` to clear a value, so clearing is always deliberate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GarmentPatch {
    pub category: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub buy_date: Option<String>,
    pub shop: Option<Option<String>>,
    pub material: Option<Option<String>>,
    pub washing: Option<Option<String>>,
    pub image_url: Option<String>,
    pub coordinates: Option<Vec<CoordinateEntry>>,
}

impl GarmentPatch {
    pub fn coordinates(coordinates: Vec<CoordinateEntry>) -> Self {
        Self {
            coordinates: Some(coordinates),
            ..Self::default()
        }
    }

    /// True when applying the patch would change no field
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the patch over a record. Timestamps are the store's job.
    pub fn apply(self, record: &mut GarmentRecord) {
        let fields = &mut record.fields;
        if let Some(category) = self.category {
            fields.category = category;
        }
        if let Some(size) = self.size {
            fields.size = size;
        }
        if let Some(color) = self.color {
            fields.color = color;
        }
        if let Some(buy_date) = self.buy_date {
            fields.buy_date = buy_date;
        }
        if let Some(shop) = self.shop {
            fields.shop = shop;
        }
        if let Some(material) = self.material {
            fields.material = material;
        }
        if let Some(washing) = self.washing {
            fields.washing = washing;
        }
        if let Some(image_url) = self.image_url {
            record.image_url = image_url;
        }
        if let Some(coordinates) = self.coordinates {
            record.coordinates = coordinates;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GarmentRecord {
        let now = Utc::now();
        GarmentRecord {
            id: "g1".to_string(),
            fields: GarmentFields {
                category: "shirts".to_string(),
                size: "M".to_string(),
                color: "화이트".to_string(),
                buy_date: "2024-01-01".to_string(),
                shop: Some("Market".to_string()),
                material: None,
                washing: None,
            },
            image_url: "data:image/png;base64,AAAA".to_string(),
            coordinates: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_json_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["buyDate"], "2024-01-01");
        assert_eq!(json["imageUrl"], "data:image/png;base64,AAAA");
        assert_eq!(json["category"], "shirts");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("material").is_none());
    }

    #[test]
    fn test_patch_only_touches_named_fields() {
        let mut record = sample();
        let before = record.clone();

        GarmentPatch {
            color: Some("블랙".to_string()),
            ..Default::default()
        }
        .apply(&mut record);

        assert_eq!(record.fields.color, "블랙");
        assert_eq!(record.fields.shop, before.fields.shop);
        assert_eq!(record.fields.size, before.fields.size);
        assert_eq!(record.image_url, before.image_url);
    }

    #[test]
    fn test_patch_clears_optional_field_explicitly() {
        let mut record = sample();
        GarmentPatch {
            shop: Some(None),
            ..Default::default()
        }
        .apply(&mut record);
        assert_eq!(record.fields.shop, None);
    }

    #[test]
    fn test_empty_patch() {
        assert!(GarmentPatch::default().is_empty());
        assert!(!GarmentPatch::coordinates(vec![]).is_empty());
    }
}
