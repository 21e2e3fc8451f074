//! Application Layer
//!
//! Services that sit between the hub protocol and the persistence store.

pub mod services;
