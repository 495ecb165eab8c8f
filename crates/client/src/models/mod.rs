//! Domain models exchanged with the remote REST API.
//!
//! These types mirror the JSON the API returns, tolerating the optional and
//! dual-shape fields the backend is known to produce, and expose small
//! derived accessors used by the stores.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{Cart, CartLineItem, CartPayload, CartProduct};
pub use catalog::{City, Listing, Place, PlaceImage, Product, Review, ReviewRequest};
pub use order::{OrderItem, OrderRecord, OrderRequest, OrderResponse};
pub use session::{AuthResponse, LoginRequest, PersistedSession, RegisterRequest, Session, keys};
pub use user::User;
