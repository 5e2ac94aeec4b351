use serde::{Deserialize, Serialize};

/// One row of a search result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub cook_time_minutes: u32,
    #[serde(default)]
    pub calories: u32,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub main_image_url: String,
}
