//! # Channel Hub
//!
//! Real-time message hub for channel-based chat:
//! - WebSocket connections authenticate with a bearer token
//! - Clients subscribe to any number of channels
//! - Posted messages are persisted, then fanned out to every subscriber
//! - PostgreSQL for durable message storage
//!
//! ## Architecture
//!
//! - **Domain Layer**: Entities and repository traits
//! - **Application Layer**: Token validation
//! - **Infrastructure Layer**: Database, repositories and metrics
//! - **Presentation Layer**: HTTP probes and the WebSocket hub
//!
//! ## Module Structure
//!
//! ```text
//! channel_hub/
//! +-- config/         Configuration management
//! +-- domain/         Users, channels, messages and repository traits
//! +-- application/    Identity validation
//! +-- infrastructure/ PostgreSQL repositories and Prometheus metrics
//! +-- presentation/   HTTP routes and the WebSocket hub
//! +-- shared/         Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
