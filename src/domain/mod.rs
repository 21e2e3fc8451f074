//! # Domain Layer
//!
//! Entities and the repository traits that make up the persistence contract
//! of the hub. No dependencies on the infrastructure or presentation layers.

pub mod entities;

pub use entities::*;
