use serde::{Deserialize, Serialize};

use crate::record_store::{Record, Timestamps};

use super::encoded_url::encode_url;

pub const COLLECTION_NAME: &str = "notes";

/// Stored name of the derived key field, used for lookups
pub const ENCODED_URL_FIELD: &str = "EncodedURL";

/// A research note attached to a URL
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Note {
    #[serde(rename = "URL")]
    pub url: String,

    /// Derived from `url` on every write; ignored on input
    #[serde(rename = "EncodedURL", default)]
    pub encoded_url: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub priority: i32,

    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Note {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Record for Note {
    const COLLECTION: &'static str = COLLECTION_NAME;

    fn id(&self) -> String {
        encode_url(&self.url)
    }

    fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn normalize(&mut self) {
        self.encoded_url = self.id();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_wire_format() {
        let mut note = Note::new("https://example.com/paper");
        note.title = "Paper".to_string();
        note.tags = vec!["ml".to_string()];
        note.normalize();

        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["URL"], "https://example.com/paper");
        assert_eq!(value["EncodedURL"], json!(note.id()));
        assert_eq!(value["Title"], "Paper");
        assert_eq!(value["Tags"], json!(["ml"]));
        assert!(value.get("CreatedDate").is_none());
    }

    #[test]
    fn test_note_decodes_with_defaults() {
        let note: Note = serde_json::from_value(json!({
            "URL": "https://example.com",
            "CreatedDate": "2024-03-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(note.title, "");
        assert!(note.tags.is_empty());
        assert!(note.timestamps.created_date.is_some());
        assert!(note.timestamps.last_update.is_none());
    }

    #[test]
    fn test_id_ignores_supplied_encoded_url() {
        let mut note = Note::new("https://example.com/a");
        note.encoded_url = "forged".to_string();

        assert_eq!(note.id(), encode_url("https://example.com/a"));
        note.normalize();
        assert_eq!(note.encoded_url, note.id());
    }

    #[test]
    fn test_missing_url_means_empty_id() {
        let note: Note = serde_json::from_value(json!({"URL": "", "Title": "t"})).unwrap();
        assert!(note.id().is_empty());
    }
}
