//! Identity storage for Keyward
//!
//! Currently supports a SQLite backend.

pub mod repository;
pub mod traits;

pub use repository::IdentityStore;
pub use traits::*;
