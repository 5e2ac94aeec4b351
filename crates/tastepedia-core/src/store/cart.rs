//! Disk-backed ingredient cart.
//!
//! The cart has no remote authority: every operation is synchronous, merges
//! in memory first, then rewrites the cart file atomically
//! (write-to-temp-then-rename, so an unexpected shutdown mid-write never
//! corrupts it). A persistence failure is surfaced to the caller while the
//! in-memory view keeps the merge, so a retry can persist it later.
//!
//! # File invalidation
//! The file is silently discarded (cart starts empty) when:
//! - `CART_SCHEMA_VERSION` does not match
//! - the file is missing or undecodable

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::constants::CART_FILE;
use crate::error::CoreError;
use crate::models::CartItem;

/// Bump when `CartEnvelope` or `CartItem` changes shape incompatibly.
pub const CART_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope around the ordered item list.
#[derive(Serialize, Deserialize)]
struct CartEnvelope {
    schema_version: u32,
    /// Unix seconds when this cart was written.
    saved_at: u64,
    items: Vec<CartItem>,
}

pub struct CartStore {
    items: Vec<CartItem>,
    path: PathBuf,
}

impl CartStore {
    /// Open the cart in `data_dir`, loading whatever was persisted there.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CART_FILE);
        let items = read_cart_file(&path).unwrap_or_default();
        Self { items, path }
    }

    /// Merge `new_items` into the cart, then persist.
    ///
    /// An item whose key already exists accumulates quantity; its
    /// descriptive fields (name, source recipe, image) keep the values of
    /// the first insertion. Unknown keys append in arrival order.
    pub fn add_items(&mut self, new_items: Vec<CartItem>) -> Result<(), CoreError> {
        for item in new_items {
            match self.items.iter_mut().find(|i| i.key == item.key) {
                Some(existing) => existing.quantity += item.quantity,
                None => self.items.push(item),
            }
        }
        self.persist()
    }

    /// Set the quantity of `key`; zero removes the line.
    pub fn set_quantity(&mut self, key: &str, quantity: u32) -> Result<(), CoreError> {
        if quantity == 0 {
            self.items.retain(|i| i.key != key);
        } else if let Some(item) = self.items.iter_mut().find(|i| i.key == key) {
            item.quantity = quantity;
        }
        self.persist()
    }

    /// Resolve the unit price of `key` (e.g. once a store is chosen).
    pub fn set_unit_price(&mut self, key: &str, unit_price: f64) -> Result<(), CoreError> {
        if let Some(item) = self.items.iter_mut().find(|i| i.key == key) {
            item.unit_price = Some(unit_price);
        }
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> Result<(), CoreError> {
        self.items.retain(|i| i.key != key);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), CoreError> {
        self.items.clear();
        self.persist()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Sum over lines with a resolved unit price; unresolved lines count 0.
    pub fn subtotal(&self) -> f64 {
        self.items
            .iter()
            .filter_map(|i| i.unit_price.map(|p| p * f64::from(i.quantity)))
            .sum()
    }

    fn persist(&self) -> Result<(), CoreError> {
        write_cart_file(&self.path, &self.items).map_err(|e| {
            tracing::warn!("cart: persist failed, in-memory view kept: {e}");
            CoreError::Persistence(e.to_string())
        })
    }
}

fn read_cart_file(path: &Path) -> Option<Vec<CartItem>> {
    let bytes = std::fs::read(path).ok()?;
    let envelope: CartEnvelope = match serde_json::from_slice(&bytes) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::info!("cart: discarding undecodable cart file: {e}");
            return None;
        }
    };
    if envelope.schema_version != CART_SCHEMA_VERSION {
        tracing::info!(
            "cart: schema version mismatch (stored={} current={}), starting empty",
            envelope.schema_version,
            CART_SCHEMA_VERSION
        );
        return None;
    }
    Some(envelope.items)
}

fn write_cart_file(path: &Path, items: &[CartItem]) -> Result<(), Box<dyn std::error::Error>> {
    let saved_at = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let envelope = CartEnvelope {
        schema_version: CART_SCHEMA_VERSION,
        saved_at,
        items: items.to_vec(),
    };
    let bytes = serde_json::to_vec_pretty(&envelope)?;

    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, &bytes)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, quantity: u32, recipe: &str) -> CartItem {
        CartItem::new(name, quantity, recipe)
    }

    #[test]
    fn test_merge_accumulates_quantity_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut cart = CartStore::load(dir.path());

        cart.add_items(vec![item("egg", 1, "Bun Cha")]).unwrap();
        cart.add_items(vec![item("egg", 2, "Pho"), item("flour", 1, "Pho")])
            .unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].key, "egg");
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.items()[1].key, "flour");
        assert_eq!(cart.items()[1].quantity, 1);
        assert_eq!(cart.total_items(), 4);
    }

    #[test]
    fn test_descriptive_fields_are_first_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut cart = CartStore::load(dir.path());

        cart.add_items(vec![item("egg", 1, "Bun Cha").with_image("a.jpg")])
            .unwrap();
        cart.add_items(vec![item("egg", 1, "Pho").with_image("b.jpg")])
            .unwrap();

        let egg = &cart.items()[0];
        assert_eq!(egg.source_recipe, "Bun Cha");
        assert_eq!(egg.image_ref, "a.jpg");
        assert_eq!(egg.quantity, 2);
    }

    #[test]
    fn test_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut cart = CartStore::load(dir.path());
            cart.add_items(vec![item("egg", 3, "Pho")]).unwrap();
        }
        let cart = CartStore::load(dir.path());
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CART_FILE), b"not json").unwrap();
        let cart = CartStore::load(dir.path());
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_schema_version_mismatch_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let stale = serde_json::json!({
            "schema_version": CART_SCHEMA_VERSION + 1,
            "saved_at": 0,
            "items": [{"key": "egg", "name": "egg", "quantity": 1, "sourceRecipe": "Pho"}]
        });
        std::fs::write(dir.path().join(CART_FILE), stale.to_string()).unwrap();
        let cart = CartStore::load(dir.path());
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_persistence_failure_keeps_in_memory_merge() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir");
        let mut cart = CartStore::load(&missing);

        let result = cart.add_items(vec![item("egg", 2, "Pho")]);
        assert!(matches!(result, Err(CoreError::Persistence(_))));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_quantity_and_removal_operations() {
        let dir = tempfile::tempdir().unwrap();
        let mut cart = CartStore::load(dir.path());
        cart.add_items(vec![item("egg", 2, "Pho"), item("flour", 1, "Pho")])
            .unwrap();

        cart.set_quantity("egg", 5).unwrap();
        assert_eq!(cart.items()[0].quantity, 5);

        cart.set_quantity("flour", 0).unwrap();
        assert_eq!(cart.items().len(), 1);

        cart.set_unit_price("egg", 0.5).unwrap();
        assert!((cart.subtotal() - 2.5).abs() < f64::EPSILON);

        cart.clear().unwrap();
        assert!(cart.items().is_empty());
        assert_eq!(cart.total_items(), 0);
    }
}
