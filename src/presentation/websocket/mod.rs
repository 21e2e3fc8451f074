//! WebSocket Hub
//!
//! Real-time channel subscriptions and message fan-out over WebSocket
//! connections.

pub mod dispatcher;
pub mod gateway;
pub mod handler;
pub mod messages;
pub mod registry;
pub mod session;
pub mod subscriptions;

pub use dispatcher::{BroadcastReport, DeliveryError};
pub use gateway::{ConnectionGone, Gateway};
pub use handler::ws_handler;
pub use messages::{ClientFrame, ServerFrame};
pub use registry::ConnectionId;
pub use session::{Session, SessionContext, SessionState};
