//! Review workflow coordination
//!
//! Every operation follows the same sequence:
//! 1. Load the record and the addressed quarter; compute the next state
//!    (illegal transitions fail here with nothing changed).
//! 2. Resolve everything the side effects need, including addresses that
//!    must be known before mutating (approve, send-back).
//! 3. Write the new state with a compare-and-swap on the observed state.
//! 4. Update notifications, then push and email concurrently.
//!
//! Push and email are best-effort. Once step 3 has succeeded the
//! operation succeeds regardless of delivery.

use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use super::delivery_router::DeliveryRouter;
use super::messages::{self, WorkflowMailContext};
use super::notification_store::NotificationStore;
use super::side_channel::BestEffortMailer;
use crate::db::{performance, users};
use crate::error::WorkflowError;
use crate::models::{
    NotificationKey, PerformanceRecord, QuarterlyTarget, ReviewAction, ReviewState, SubWorkflow,
    TargetRef, User,
};

/// Addressed sub-workflow and the acting user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRequest {
    pub performance_id: Uuid,
    pub quarter: String,
    pub workflow: SubWorkflow,
    pub actor_id: Uuid,
    /// Approver for submit/recall; defaults to the quarter's supervisor
    pub recipient_id: Option<Uuid>,
}

/// Result of a successful operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub previous: ReviewState,
    pub current: ReviewState,
}

impl TransitionOutcome {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Side effects resolved before the state write
enum EffectPlan {
    Submit {
        recipient_id: Uuid,
        recipient_email: Option<String>,
    },
    Recall {
        recipient_id: Uuid,
        recipient_email: Option<String>,
    },
    Approve {
        owner_email: String,
    },
    SendBack {
        reason: String,
        owner_email: String,
        actor_email: String,
        committee: bool,
    },
    CommitteeAccept,
    Reopen,
    /// State unchanged by a committee decision; nothing to announce
    Nothing,
}

/// Coordinates state changes, notifications, push and email
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    db: SqlitePool,
    notifications: NotificationStore,
    router: DeliveryRouter,
    mailer: BestEffortMailer,
}

impl WorkflowEngine {
    pub fn new(
        db: SqlitePool,
        notifications: NotificationStore,
        router: DeliveryRouter,
        mailer: BestEffortMailer,
    ) -> Self {
        Self {
            db,
            notifications,
            router,
            mailer,
        }
    }

    pub async fn submit(&self, request: &WorkflowRequest) -> Result<TransitionOutcome, WorkflowError> {
        self.execute(request, ReviewAction::Submit).await
    }

    pub async fn recall(&self, request: &WorkflowRequest) -> Result<TransitionOutcome, WorkflowError> {
        self.execute(request, ReviewAction::Recall).await
    }

    pub async fn approve(&self, request: &WorkflowRequest) -> Result<TransitionOutcome, WorkflowError> {
        self.execute(request, ReviewAction::Approve).await
    }

    pub async fn send_back(
        &self,
        request: &WorkflowRequest,
        reason: impl Into<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.execute(
            request,
            ReviewAction::SendBack {
                reason: reason.into(),
            },
        )
        .await
    }

    pub async fn committee_accept(
        &self,
        request: &WorkflowRequest,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.execute(request, ReviewAction::CommitteeAccept).await
    }

    pub async fn committee_unaccept(
        &self,
        request: &WorkflowRequest,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.execute(request, ReviewAction::CommitteeUnaccept).await
    }

    pub async fn committee_send_back(
        &self,
        request: &WorkflowRequest,
        reason: impl Into<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        self.execute(
            request,
            ReviewAction::CommitteeSendBack {
                reason: reason.into(),
            },
        )
        .await
    }

    pub async fn reopen(&self, request: &WorkflowRequest) -> Result<TransitionOutcome, WorkflowError> {
        self.execute(request, ReviewAction::Reopen).await
    }

    /// Run one action against one sub-workflow
    pub async fn execute(
        &self,
        request: &WorkflowRequest,
        action: ReviewAction,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let record = performance::load_record(&self.db, request.performance_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::NotFound(format!("performance record {}", request.performance_id))
            })?;

        let target = record.target(&request.quarter).ok_or_else(|| {
            WorkflowError::NotFound(format!(
                "quarter {} of performance record {}",
                request.quarter, record.id
            ))
        })?;

        let previous = target.state(request.workflow).clone();
        let next = previous.apply(&action)?;

        let owner = self.require_user(record.user_id).await?;
        let actor = users::get_user(&self.db, request.actor_id).await?;
        let plan = if next == previous && action.is_committee_review() {
            EffectPlan::Nothing
        } else {
            self.plan(request, &action, &next, target, &owner, actor.as_ref())
                .await?
        };

        if next != previous {
            let target_ref =
                TargetRef::new(record.id, request.quarter.clone(), request.workflow);
            let written =
                performance::compare_and_swap_state(&self.db, &target_ref, &previous, &next)
                    .await?;
            if !written {
                warn!(
                    performance_id = %record.id,
                    quarter = %request.quarter,
                    workflow = %request.workflow,
                    action = action.name(),
                    "Concurrent transition detected, nothing written"
                );
                return Err(WorkflowError::Conflict(format!(
                    "{} {} of performance record {} was changed concurrently",
                    request.quarter, request.workflow, record.id
                )));
            }
        }

        info!(
            performance_id = %record.id,
            quarter = %request.quarter,
            workflow = %request.workflow,
            actor_id = %request.actor_id,
            "{}: {} -> {}",
            action.name(),
            previous.status(),
            next.status()
        );

        let actor_name = actor
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or("A reviewer");
        let ctx = WorkflowMailContext {
            workflow: request.workflow,
            owner_name: &owner.name,
            actor_name,
            quarter: &request.quarter,
            cycle: record.cycle,
        };

        self.run_effects(plan, request, &record, &owner, &ctx).await?;

        Ok(TransitionOutcome {
            previous,
            current: next,
        })
    }

    async fn plan(
        &self,
        request: &WorkflowRequest,
        action: &ReviewAction,
        next: &ReviewState,
        target: &QuarterlyTarget,
        owner: &User,
        actor: Option<&User>,
    ) -> Result<EffectPlan, WorkflowError> {
        Ok(match action {
            ReviewAction::Submit | ReviewAction::Recall => {
                let recipient_id = request
                    .recipient_id
                    .or(target.supervisor_id)
                    .ok_or_else(|| {
                        WorkflowError::Validation(format!(
                            "no recipient given and quarter {} has no supervisor",
                            request.quarter
                        ))
                    })?;
                let recipient_email = users::get_user(&self.db, recipient_id)
                    .await?
                    .and_then(|u| u.email);

                if matches!(action, ReviewAction::Submit) {
                    EffectPlan::Submit {
                        recipient_id,
                        recipient_email,
                    }
                } else {
                    EffectPlan::Recall {
                        recipient_id,
                        recipient_email,
                    }
                }
            }
            ReviewAction::Approve => EffectPlan::Approve {
                owner_email: require_email(owner)?,
            },
            ReviewAction::SendBack { .. } | ReviewAction::CommitteeSendBack { .. } => {
                let committee = matches!(action, ReviewAction::CommitteeSendBack { .. });
                let stored_reason = if committee {
                    next.committee_send_back_message()
                } else {
                    next.send_back_message()
                };
                let reason = stored_reason.unwrap_or_default().to_string();

                let actor = actor.ok_or_else(|| {
                    WorkflowError::NotFound(format!("user {}", request.actor_id))
                })?;

                EffectPlan::SendBack {
                    reason,
                    owner_email: require_email(owner)?,
                    actor_email: require_email(actor)?,
                    committee,
                }
            }
            ReviewAction::CommitteeAccept => EffectPlan::CommitteeAccept,
            ReviewAction::CommitteeUnaccept => EffectPlan::Nothing,
            ReviewAction::Reopen => EffectPlan::Reopen,
        })
    }

    async fn run_effects(
        &self,
        plan: EffectPlan,
        request: &WorkflowRequest,
        record: &PerformanceRecord,
        owner: &User,
        ctx: &WorkflowMailContext<'_>,
    ) -> Result<(), WorkflowError> {
        let tenant = owner.tenant_id.as_str();
        let request_kind = request.workflow.request_kind();
        let resolve_kind = request.workflow.resolve_kind();

        match plan {
            EffectPlan::Submit {
                recipient_id,
                recipient_email,
            } => {
                let key = NotificationKey::new(
                    request.actor_id,
                    recipient_id,
                    record.id,
                    request.quarter.clone(),
                    request_kind,
                );
                let notification = self.notifications.upsert(&key).await?;
                self.notifications
                    .delete_by_subject(
                        Some(request.actor_id),
                        record.id,
                        &request.quarter,
                        resolve_kind,
                    )
                    .await?;

                let payload = serde_json::to_value(&notification).unwrap_or(Value::Null);
                tokio::join!(
                    async { self.router.notify(recipient_id, payload) },
                    self.mailer
                        .deliver(tenant, recipient_email.as_deref(), messages::submitted(ctx)),
                );
            }

            EffectPlan::Recall {
                recipient_id,
                recipient_email,
            } => {
                let key = NotificationKey::new(
                    request.actor_id,
                    recipient_id,
                    record.id,
                    request.quarter.clone(),
                    request_kind,
                );
                self.notifications.resolve(&key).await?;

                tokio::join!(
                    async { self.router.notify(recipient_id, Value::Null) },
                    self.mailer
                        .deliver(tenant, recipient_email.as_deref(), messages::recalled(ctx)),
                );
            }

            EffectPlan::Approve { owner_email } => {
                self.notifications
                    .delete_by_subject(None, record.id, &request.quarter, request_kind)
                    .await?;

                tokio::join!(
                    async { self.router.notify(owner.id, Value::Null) },
                    self.mailer
                        .deliver(tenant, Some(&owner_email), messages::approved(ctx)),
                );
            }

            EffectPlan::SendBack {
                reason,
                owner_email,
                actor_email,
                committee,
            } => {
                self.notifications
                    .delete_by_subject(None, record.id, &request.quarter, request_kind)
                    .await?;
                let key = NotificationKey::new(
                    request.actor_id,
                    owner.id,
                    record.id,
                    request.quarter.clone(),
                    resolve_kind,
                );
                let notification = self.notifications.upsert(&key).await?;

                let owner_mail = if committee {
                    messages::committee_sent_back(ctx, &reason)
                } else {
                    messages::sent_back(ctx, &reason)
                };
                let payload = serde_json::to_value(&notification).unwrap_or(Value::Null);

                tokio::join!(
                    async {
                        self.router.notify(owner.id, payload);
                        self.router.notify(request.actor_id, Value::Null);
                    },
                    self.mailer.deliver(tenant, Some(&owner_email), owner_mail),
                    self.mailer.deliver(
                        tenant,
                        Some(&actor_email),
                        messages::send_back_confirmation(ctx, &reason)
                    ),
                );
            }

            EffectPlan::CommitteeAccept => {
                tokio::join!(
                    async { self.router.notify(owner.id, Value::Null) },
                    self.mailer.deliver(
                        tenant,
                        owner.email.as_deref(),
                        messages::committee_accepted(ctx)
                    ),
                );
            }

            EffectPlan::Reopen => {
                tokio::join!(
                    async { self.router.notify(owner.id, Value::Null) },
                    self.mailer
                        .deliver(tenant, owner.email.as_deref(), messages::reopened(ctx)),
                );
            }

            EffectPlan::Nothing => {}
        }

        Ok(())
    }

    async fn require_user(&self, id: Uuid) -> Result<User, WorkflowError> {
        users::get_user(&self.db, id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("user {}", id)))
    }
}

fn require_email(user: &User) -> Result<String, WorkflowError> {
    user.email
        .clone()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| WorkflowError::NotFound(format!("email address of user {}", user.id)))
}
