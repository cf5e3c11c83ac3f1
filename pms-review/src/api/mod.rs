//! HTTP API handlers for pms-review

pub mod health;
pub mod notifications;
pub mod reminders;
pub mod sse;
pub mod workflow;

pub use health::health_routes;
pub use notifications::notification_routes;
pub use reminders::reminder_routes;
pub use sse::notification_stream;
pub use workflow::workflow_routes;
