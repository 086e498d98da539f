//! Documents persisted in the store and the views returned over HTTP.

pub mod address;
pub mod order;
pub mod product;
pub mod user;

pub use address::{Address, AddressBook, AddressFields, AddressKind, AddressView};
pub use order::{Order, OrderView, PaymentMethod};
pub use product::{total_price, LineItem, LineItemView, NewProduct, Product, ProductView};
pub use user::{normalize_email, Credentials, NewUser, User};
