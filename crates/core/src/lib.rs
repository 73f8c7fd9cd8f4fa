//! Foodie core: the restaurant's menu, the guest's cart, and the deterministic
//! services the ordering assistant relies on.
//!
//! Nothing in this crate talks to the network. Prices, stock and cart
//! mutations are decided here; the language model only proposes intents.

pub mod config;
pub mod domain;
pub mod errors;
pub mod ordering;

pub use domain::conversation::{ConversationHistory, ConversationTurn, Role};
pub use domain::menu::{DietaryTag, ItemId, MenuDocument, MenuItem, Promotion};
pub use domain::order::{LedgerChange, OrderLedger, OrderLine, PlacedOrder};
pub use errors::{ApplicationError, DomainError};
pub use ordering::availability::{AvailabilityService, StaticInventory};
pub use ordering::catalog::MenuCatalog;
pub use ordering::pricing::OrderTotals;
pub use ordering::recommendation::{AnchorRecommendation, RecommendationService};
pub use ordering::Storefront;
