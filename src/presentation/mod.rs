//! Presentation Layer
//!
//! HTTP routes and WebSocket hub handlers.

pub mod http;
pub mod middleware;
pub mod websocket;
