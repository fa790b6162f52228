use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single fact about a place.
///
/// `id` is always generated locally; any identifier in model output is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    #[serde(skip_deserializing, default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Fact {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            image_url: None,
            url: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Map pin coordinates, when the model supplied both.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// Response envelope requested from the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FactBatch {
    pub location: String,
    pub facts: Vec<Fact>,
}
