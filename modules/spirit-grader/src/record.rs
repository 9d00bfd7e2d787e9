use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GradingError;

/// A generated spirit as exported from the document store.
///
/// Every field is optional in the source document; absent or null text
/// defaults to empty and absent or null stats to zero. Fractional stats are
/// truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpiritRecord {
    #[serde(deserialize_with = "text")]
    pub id: String,
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub description: String,
    #[serde(deserialize_with = "text")]
    pub primary_type: String,
    #[serde(deserialize_with = "text")]
    pub secondary_type: String,
    #[serde(rename = "originalImageDownloadUrl", deserialize_with = "text")]
    pub original_image_url: String,
    #[serde(rename = "generatedImageDownloadUrl", deserialize_with = "text")]
    pub generated_image_url: String,

    #[serde(deserialize_with = "stat")]
    pub agility: i64,
    #[serde(deserialize_with = "stat")]
    pub arcana: i64,
    #[serde(deserialize_with = "stat")]
    pub aura: i64,
    #[serde(deserialize_with = "stat")]
    pub charisma: i64,
    #[serde(deserialize_with = "stat")]
    pub endurance: i64,
    #[serde(deserialize_with = "stat")]
    pub height: i64,
    #[serde(deserialize_with = "stat")]
    pub weight: i64,
    #[serde(deserialize_with = "stat")]
    pub intimidation: i64,
    #[serde(deserialize_with = "stat")]
    pub luck: i64,
    #[serde(deserialize_with = "stat")]
    pub strength: i64,
    #[serde(deserialize_with = "stat")]
    pub toughness: i64,
    #[serde(deserialize_with = "stat")]
    pub hit_points: i64,
}

impl SpiritRecord {
    pub fn from_json(json: &str) -> Result<Self, GradingError> {
        serde_json::from_str(json).map_err(|e| GradingError::InvalidRecord(e.to_string()))
    }

    pub async fn load(path: &Path) -> Result<Self, GradingError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GradingError::InvalidRecord(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Name for report headings.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unnamed"
        } else {
            &self.name
        }
    }
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn stat<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(number
        .and_then(|n| n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)))
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_export() {
        let record = SpiritRecord::from_json(
            r#"{
                "id": "sp-1",
                "name": "Shutterbeak",
                "description": "It never forgets a face.",
                "primaryType": "Tech",
                "secondaryType": "Air",
                "originalImageDownloadUrl": "https://img.test/camera.jpg",
                "generatedImageDownloadUrl": "https://img.test/owl.webp",
                "height": 40,
                "weight": 3,
                "hitPoints": 55,
                "someFutureField": true
            }"#,
        )
        .unwrap();

        assert_eq!(record.name, "Shutterbeak");
        assert_eq!(record.primary_type, "Tech");
        assert_eq!(record.original_image_url, "https://img.test/camera.jpg");
        assert_eq!(record.generated_image_url, "https://img.test/owl.webp");
        assert_eq!(record.hit_points, 55);
        assert_eq!(record.luck, 0);
    }

    #[test]
    fn missing_fields_default() {
        let record = SpiritRecord::from_json("{}").unwrap();
        assert_eq!(record, SpiritRecord::default());
        assert_eq!(record.display_name(), "Unnamed");
    }

    #[test]
    fn null_and_fractional_values_are_tolerated() {
        let record =
            SpiritRecord::from_json(r#"{"name": null, "height": 12.7, "weight": null}"#).unwrap();
        assert_eq!(record.name, "");
        assert_eq!(record.height, 12);
        assert_eq!(record.weight, 0);
    }

    #[test]
    fn malformed_document_is_invalid_record() {
        let err = SpiritRecord::from_json("{\"name\": ").unwrap_err();
        assert!(matches!(err, GradingError::InvalidRecord(_)));
        assert_eq!(err.kind(), "RecordError");
    }
}
