//! Data models
//!
//! Request / response payloads shared between the order server and its
//! clients. Record ids are `"table:key"` strings on the wire.

pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use order::*;
pub use product::*;
pub use user::*;
