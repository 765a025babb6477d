//! Core types for Keyward

mod directory;
mod identity;

pub use directory::*;
pub use identity::*;
