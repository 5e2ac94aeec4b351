use serde::{Deserialize, Serialize};

/// One ingredient line in the local cart.
///
/// The item name doubles as the dedup key so the same ingredient added from
/// two different recipes accumulates into a single line. The unit price is
/// resolved later against a store's catalog, not at merge time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub key: String,
    pub name: String,
    pub quantity: u32,
    pub source_recipe: String,
    #[serde(default)]
    pub image_ref: String,
    #[serde(default)]
    pub unit_price: Option<f64>,
}

impl CartItem {
    pub fn new(name: impl Into<String>, quantity: u32, source_recipe: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            name,
            quantity,
            source_recipe: source_recipe.into(),
            image_ref: String::new(),
            unit_price: None,
        }
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = image_ref.into();
        self
    }
}
