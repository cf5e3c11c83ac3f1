//! Service layer: workflow coordination, notification storage and delivery,
//! email, reminders

pub mod connection_registry;
pub mod delivery_router;
pub mod identity;
pub mod messages;
pub mod notification_store;
pub mod reminder_sweeper;
pub mod side_channel;
pub mod workflow_engine;

pub use connection_registry::{ChannelGuard, ChannelId, ConnectionRegistry};
pub use delivery_router::DeliveryRouter;
pub use identity::{IdentityResolver, SessionIdentityResolver};
pub use notification_store::NotificationStore;
pub use reminder_sweeper::{ReminderSweeper, SweeperConfig};
pub use side_channel::{
    BestEffortMailer, HttpMailGateway, LogOnlyGateway, OutboundMessage, SideChannelError,
    SideChannelGateway,
};
pub use workflow_engine::{TransitionOutcome, WorkflowEngine, WorkflowRequest};
