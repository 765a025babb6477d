//! Cryptography utilities for Keyward

pub mod hash;

pub use hash::*;
