//! Business operations behind the HTTP handlers. Each service owns a
//! [`Database`](crate::store::Database) handle and is cheap to clone.

pub mod accounts;
pub mod addresses;
pub mod cart;
pub mod catalog;

pub use accounts::{AccountService, SignupOutcome};
pub use addresses::AddressService;
pub use cart::{CartService, CartSummary};
pub use catalog::CatalogService;
