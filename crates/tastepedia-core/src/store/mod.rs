mod cart;
mod entity;

pub use cart::{CartStore, CART_SCHEMA_VERSION};
pub use entity::{EntityStateStore, OptimisticEntry};
