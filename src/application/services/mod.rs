//! Application Services
//!
//! Business services used by the presentation layer.

pub mod identity_service;

pub use identity_service::{AuthError, Claims, IdentityValidator, JwtIdentityValidator};

#[cfg(test)]
pub use identity_service::MockIdentityValidator;
