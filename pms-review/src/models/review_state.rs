//! Sign-off state machine for one sub-workflow of a quarterly target
//!
//! Lifecycle: `Draft → Submitted → {Approved | SendBack | CommitteeSendBack}`.
//! SendBack and CommitteeSendBack return to Submitted on re-submission;
//! recall and reopen return to Draft. There is no `Draft → Approved` edge.
//!
//! Storage keeps the legacy column group (status, review status, committee
//! flag, committee message, send-back message). In memory the group is a
//! single [`ReviewState`] whose variants admit only legal combinations:
//! `Reviewed` exists only under `Approved` and never alongside an
//! outstanding committee send-back, and `CommitteeSendBack` is always
//! not-reviewed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::NotificationKind;

/// Which sign-off sub-workflow of a quarterly target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubWorkflow {
    Agreement,
    Assessment,
}

impl SubWorkflow {
    /// Stable name, also the stored column prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            SubWorkflow::Agreement => "agreement",
            SubWorkflow::Assessment => "assessment",
        }
    }

    /// Notification kind addressed to the approver on submission
    pub fn request_kind(&self) -> NotificationKind {
        match self {
            SubWorkflow::Agreement => NotificationKind::Agreement,
            SubWorkflow::Assessment => NotificationKind::Assessment,
        }
    }

    /// Notification kind addressed to the owner on send-back
    pub fn resolve_kind(&self) -> NotificationKind {
        match self {
            SubWorkflow::Agreement => NotificationKind::ResolveAgreement,
            SubWorkflow::Assessment => NotificationKind::ResolveAssessment,
        }
    }
}

impl fmt::Display for SubWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubWorkflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agreement" => Ok(SubWorkflow::Agreement),
            "assessment" => Ok(SubWorkflow::Assessment),
            other => Err(format!("unknown sub-workflow '{}'", other)),
        }
    }
}

/// Document lifecycle status as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Draft,
    Submitted,
    Approved,
    SendBack,
    CommitteeSendBack,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "Draft",
            DocumentStatus::Submitted => "Submitted",
            DocumentStatus::Approved => "Approved",
            DocumentStatus::SendBack => "SendBack",
            DocumentStatus::CommitteeSendBack => "CommitteeSendBack",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(DocumentStatus::Draft),
            "Submitted" => Ok(DocumentStatus::Submitted),
            "Approved" => Ok(DocumentStatus::Approved),
            "SendBack" => Ok(DocumentStatus::SendBack),
            "CommitteeSendBack" => Ok(DocumentStatus::CommitteeSendBack),
            other => Err(format!("unknown document status '{}'", other)),
        }
    }
}

/// Whether the committee has looked at the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitteeReviewStatus {
    NotReviewed,
    Reviewed,
}

impl CommitteeReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitteeReviewStatus::NotReviewed => "NotReviewed",
            CommitteeReviewStatus::Reviewed => "Reviewed",
        }
    }
}

impl FromStr for CommitteeReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotReviewed" => Ok(CommitteeReviewStatus::NotReviewed),
            "Reviewed" => Ok(CommitteeReviewStatus::Reviewed),
            other => Err(format!("unknown review status '{}'", other)),
        }
    }
}

/// Committee outcome on an approved document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitteeReview {
    /// Not yet reviewed; may still carry an earlier committee send-back note
    Pending { committee_note: Option<String> },
    Reviewed,
}

/// Legal state of one sub-workflow
///
/// `committee_note` is the committee send-back message that stays visible
/// through re-submission until the committee accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewState {
    Draft { committee_note: Option<String> },
    Submitted { committee_note: Option<String> },
    Approved { review: CommitteeReview },
    SendBack { reason: String, committee_note: Option<String> },
    CommitteeSendBack { reason: String },
}

impl Default for ReviewState {
    fn default() -> Self {
        ReviewState::Draft {
            committee_note: None,
        }
    }
}

/// Requested transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    Submit,
    Recall,
    Approve,
    SendBack { reason: String },
    CommitteeAccept,
    CommitteeUnaccept,
    CommitteeSendBack { reason: String },
    Reopen,
}

impl ReviewAction {
    /// Route segment and log name of the action
    pub fn name(&self) -> &'static str {
        match self {
            ReviewAction::Submit => "submit",
            ReviewAction::Recall => "recall",
            ReviewAction::Approve => "approve",
            ReviewAction::SendBack { .. } => "send-back",
            ReviewAction::CommitteeAccept => "committee-accept",
            ReviewAction::CommitteeUnaccept => "committee-unaccept",
            ReviewAction::CommitteeSendBack { .. } => "committee-send-back",
            ReviewAction::Reopen => "reopen",
        }
    }

    /// Accept or unaccept by the committee (not committee send-back)
    pub fn is_committee_review(&self) -> bool {
        matches!(
            self,
            ReviewAction::CommitteeAccept | ReviewAction::CommitteeUnaccept
        )
    }

    /// Parse an action name plus the optional free-text message
    pub fn parse(name: &str, message: Option<String>) -> Result<Self, TransitionError> {
        let reason = || message.clone().unwrap_or_default();
        match name {
            "submit" => Ok(ReviewAction::Submit),
            "recall" => Ok(ReviewAction::Recall),
            "approve" => Ok(ReviewAction::Approve),
            "send-back" | "sendBack" => Ok(ReviewAction::SendBack { reason: reason() }),
            "committee-accept" | "committeeAccept" => Ok(ReviewAction::CommitteeAccept),
            "committee-unaccept" | "committeeUnaccept" => Ok(ReviewAction::CommitteeUnaccept),
            "committee-send-back" | "committeeSendBack" => {
                Ok(ReviewAction::CommitteeSendBack { reason: reason() })
            }
            "reopen" => Ok(ReviewAction::Reopen),
            other => Err(TransitionError::UnknownAction(other.to_string())),
        }
    }
}

/// Rejected transition; nothing has been mutated when this is returned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} while status is {from}")]
    IllegalSource {
        action: &'static str,
        from: DocumentStatus,
    },

    #[error("cannot {action}: committee has already reviewed this document")]
    AlreadyReviewed { action: &'static str },

    #[error("a message is required to {action}")]
    MissingReason { action: &'static str },

    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

/// Stored column group of one sub-workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReviewColumns {
    pub status: DocumentStatus,
    pub review_status: CommitteeReviewStatus,
    pub committee_send_back: bool,
    pub committee_message: Option<String>,
    pub send_back_message: Option<String>,
}

impl ReviewState {
    pub fn status(&self) -> DocumentStatus {
        match self {
            ReviewState::Draft { .. } => DocumentStatus::Draft,
            ReviewState::Submitted { .. } => DocumentStatus::Submitted,
            ReviewState::Approved { .. } => DocumentStatus::Approved,
            ReviewState::SendBack { .. } => DocumentStatus::SendBack,
            ReviewState::CommitteeSendBack { .. } => DocumentStatus::CommitteeSendBack,
        }
    }

    pub fn review_status(&self) -> CommitteeReviewStatus {
        match self {
            ReviewState::Approved {
                review: CommitteeReview::Reviewed,
            } => CommitteeReviewStatus::Reviewed,
            _ => CommitteeReviewStatus::NotReviewed,
        }
    }

    pub fn is_committee_send_back(&self) -> bool {
        self.committee_send_back_message().is_some()
    }

    pub fn committee_send_back_message(&self) -> Option<&str> {
        match self {
            ReviewState::Draft { committee_note }
            | ReviewState::Submitted { committee_note }
            | ReviewState::SendBack { committee_note, .. }
            | ReviewState::Approved {
                review: CommitteeReview::Pending { committee_note },
            } => committee_note.as_deref(),
            ReviewState::CommitteeSendBack { reason } => Some(reason.as_str()),
            ReviewState::Approved {
                review: CommitteeReview::Reviewed,
            } => None,
        }
    }

    pub fn send_back_message(&self) -> Option<&str> {
        match self {
            ReviewState::SendBack { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Compute the next state without mutating anything
    pub fn apply(&self, action: &ReviewAction) -> Result<ReviewState, TransitionError> {
        let illegal = || TransitionError::IllegalSource {
            action: action.name(),
            from: self.status(),
        };

        match action {
            ReviewAction::Submit => match self {
                ReviewState::Draft { committee_note }
                | ReviewState::Submitted { committee_note }
                | ReviewState::SendBack { committee_note, .. } => Ok(ReviewState::Submitted {
                    committee_note: committee_note.clone(),
                }),
                ReviewState::CommitteeSendBack { reason } => Ok(ReviewState::Submitted {
                    committee_note: Some(reason.clone()),
                }),
                ReviewState::Approved { .. } => Err(illegal()),
            },

            ReviewAction::Recall => match self {
                ReviewState::Submitted { committee_note } => Ok(ReviewState::Draft {
                    committee_note: committee_note.clone(),
                }),
                _ => Err(illegal()),
            },

            ReviewAction::Approve => match self {
                ReviewState::Submitted { committee_note } => Ok(ReviewState::Approved {
                    review: CommitteeReview::Pending {
                        committee_note: committee_note.clone(),
                    },
                }),
                _ => Err(illegal()),
            },

            ReviewAction::SendBack { reason } => {
                let reason = required_reason(action, reason)?;
                match self {
                    ReviewState::Submitted { committee_note } => Ok(ReviewState::SendBack {
                        reason,
                        committee_note: committee_note.clone(),
                    }),
                    _ => Err(illegal()),
                }
            }

            ReviewAction::CommitteeAccept => match self {
                ReviewState::Approved { .. } => Ok(ReviewState::Approved {
                    review: CommitteeReview::Reviewed,
                }),
                _ => Err(illegal()),
            },

            ReviewAction::CommitteeUnaccept => match self {
                ReviewState::Approved {
                    review: CommitteeReview::Reviewed,
                } => Ok(ReviewState::Approved {
                    review: CommitteeReview::Pending {
                        committee_note: None,
                    },
                }),
                ReviewState::Approved { .. } => Ok(self.clone()),
                _ => Err(illegal()),
            },

            ReviewAction::CommitteeSendBack { reason } => {
                let reason = required_reason(action, reason)?;
                match self {
                    ReviewState::Submitted { .. } | ReviewState::Approved { .. } => {
                        Ok(ReviewState::CommitteeSendBack { reason })
                    }
                    _ => Err(illegal()),
                }
            }

            ReviewAction::Reopen => match self {
                ReviewState::Approved {
                    review: CommitteeReview::Pending { committee_note },
                } => Ok(ReviewState::Draft {
                    committee_note: committee_note.clone(),
                }),
                ReviewState::Approved {
                    review: CommitteeReview::Reviewed,
                } => Err(TransitionError::AlreadyReviewed {
                    action: action.name(),
                }),
                _ => Err(illegal()),
            },
        }
    }

    /// Flatten into the stored column group
    pub fn to_columns(&self) -> StoredReviewColumns {
        StoredReviewColumns {
            status: self.status(),
            review_status: self.review_status(),
            committee_send_back: self.is_committee_send_back(),
            committee_message: self.committee_send_back_message().map(str::to_string),
            send_back_message: self.send_back_message().map(str::to_string),
        }
    }

    /// Rebuild from stored columns, rejecting combinations that cannot occur
    pub fn from_columns(columns: StoredReviewColumns) -> Result<Self, String> {
        let StoredReviewColumns {
            status,
            review_status,
            committee_send_back,
            committee_message,
            send_back_message,
        } = columns;

        let reviewed = review_status == CommitteeReviewStatus::Reviewed;
        if reviewed && status != DocumentStatus::Approved {
            return Err(format!("review status Reviewed is illegal with status {}", status));
        }
        if reviewed && committee_send_back {
            return Err("Reviewed document cannot carry a committee send-back".to_string());
        }
        if status == DocumentStatus::CommitteeSendBack && !committee_send_back {
            return Err("CommitteeSendBack status without committee flag".to_string());
        }

        let committee_note = if committee_send_back {
            Some(committee_message.unwrap_or_default())
        } else {
            None
        };

        Ok(match status {
            DocumentStatus::Draft => ReviewState::Draft { committee_note },
            DocumentStatus::Submitted => ReviewState::Submitted { committee_note },
            DocumentStatus::Approved if reviewed => ReviewState::Approved {
                review: CommitteeReview::Reviewed,
            },
            DocumentStatus::Approved => ReviewState::Approved {
                review: CommitteeReview::Pending { committee_note },
            },
            DocumentStatus::SendBack => ReviewState::SendBack {
                reason: send_back_message.unwrap_or_default(),
                committee_note,
            },
            DocumentStatus::CommitteeSendBack => ReviewState::CommitteeSendBack {
                reason: committee_note.unwrap_or_default(),
            },
        })
    }
}

fn required_reason(action: &ReviewAction, reason: &str) -> Result<String, TransitionError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        Err(TransitionError::MissingReason {
            action: action.name(),
        })
    } else {
        Ok(trimmed.to_string())
    }
}
