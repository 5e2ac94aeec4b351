pub mod cart_item;
pub mod entity;
pub mod filter;
pub mod post;
pub mod recipe;

pub use cart_item::CartItem;
pub use entity::{EntityKey, EntityValue, FavoriteState, LikeState, PollOption, PollState};
pub use filter::{FilterState, PriceTier, SearchQuery};
pub use post::{NewPoll, NewPost, PostRecord};
pub use recipe::RecipeSummary;
