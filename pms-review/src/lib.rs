//! pms-review library interface
//!
//! Review-workflow coordination for performance records: the sign-off state
//! machine, deduplicated notifications with live (SSE) delivery, best-effort
//! email, and deadline reminders.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, WorkflowError};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use services::{
    BestEffortMailer, ConnectionRegistry, DeliveryRouter, IdentityResolver, NotificationStore,
    ReminderSweeper, SessionIdentityResolver, SideChannelGateway, SweeperConfig, WorkflowEngine,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Open live channels per user
    pub registry: Arc<ConnectionRegistry>,
    pub router: DeliveryRouter,
    pub notifications: NotificationStore,
    pub engine: WorkflowEngine,
    pub sweeper: Arc<ReminderSweeper>,
    /// Resolves stream bearer tokens
    pub identity: Arc<dyn IdentityResolver>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire every service around one pool and one email gateway
    pub fn new(
        db: SqlitePool,
        gateway: Arc<dyn SideChannelGateway>,
        from_address: impl Into<String>,
        sweeper_config: SweeperConfig,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = DeliveryRouter::new(registry.clone());
        let notifications = NotificationStore::new(db.clone());
        let mailer = BestEffortMailer::new(gateway, from_address);
        let engine = WorkflowEngine::new(
            db.clone(),
            notifications.clone(),
            router.clone(),
            mailer.clone(),
        );
        let sweeper = Arc::new(ReminderSweeper::new(db.clone(), mailer, sweeper_config));
        let identity: Arc<dyn IdentityResolver> =
            Arc::new(SessionIdentityResolver::new(db.clone()));

        Self {
            db,
            registry,
            router,
            notifications,
            engine,
            sweeper,
            identity,
            startup_time: Utc::now(),
        }
    }

    /// Replace the stream identity resolver
    pub fn with_identity(mut self, identity: Arc<dyn IdentityResolver>) -> Self {
        self.identity = identity;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::workflow_routes())
        .merge(api::notification_routes())
        .route("/notifications/stream", get(api::notification_stream))
        .merge(api::reminder_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
