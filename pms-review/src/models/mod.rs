//! Domain models for the review service

pub mod notification;
pub mod performance;
pub mod reminder;
pub mod review_state;
pub mod user;

pub use notification::{Notification, NotificationKey, NotificationKind, NotificationView};
pub use performance::{PerformanceRecord, QuarterlyTarget, TargetRef, DEFAULT_QUARTERS};
pub use reminder::{PendingFeedback, PendingObligation, ReminderWindow, SweepReport, TeamLead};
pub use review_state::{
    CommitteeReview, CommitteeReviewStatus, DocumentStatus, ReviewAction, ReviewState,
    StoredReviewColumns, SubWorkflow, TransitionError,
};
pub use user::User;
