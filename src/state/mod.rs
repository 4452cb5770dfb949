//! State management module
//!
//! This module handles all persistent catalog state:
//! - Shared data structures (data.rs)
//! - The SQLite record store (library.rs)
//! - Outfit coordinates embedded in garment records (coordinates.rs)

pub mod coordinates;
pub mod data;
pub mod library;
