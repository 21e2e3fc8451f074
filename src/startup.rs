//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::JwtIdentityValidator;
use crate::config::Settings;
use crate::infrastructure::database;
use crate::infrastructure::repositories::{
    PgChannelRepository, PgMessageRepository, PgUserRepository,
};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::{Gateway, SessionContext};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub sessions: SessionContext,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        database::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");

        let snowflake = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id,
            settings.snowflake.epoch,
        ));

        let users = Arc::new(PgUserRepository::new(db.clone()));
        let sessions = SessionContext {
            gateway: Arc::new(Gateway::new(settings.websocket.outbound_queue_capacity)),
            identity: Arc::new(JwtIdentityValidator::new(users, &settings.jwt)),
            messages: Arc::new(PgMessageRepository::new(db.clone(), snowflake)),
            channels: Arc::new(PgChannelRepository::new(db.clone())),
            max_content_length: settings.websocket.max_content_length,
        };

        Self::with_state(AppState {
            db,
            sessions,
            settings: Arc::new(settings),
        })
        .await
    }

    /// Bind the router over an already assembled state
    pub async fn with_state(state: AppState) -> Result<Self> {
        health::init_server_start();

        let settings = state.settings.clone();
        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        let listener = TcpListener::bind(settings.server_addr()).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The router with all middleware applied
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
