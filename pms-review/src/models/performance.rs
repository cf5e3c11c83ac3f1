//! Performance records and their quarterly targets

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ReviewState, SubWorkflow};

/// Quarter labels created with every new record, in position order
pub const DEFAULT_QUARTERS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

/// One employee's performance record for one review cycle
#[derive(Debug, Clone)]
pub struct PerformanceRecord {
    pub id: Uuid,
    /// Record owner; the submitter of every sub-workflow on it
    pub user_id: Uuid,
    pub cycle: i64,
    pub created_at: DateTime<Utc>,
    pub targets: Vec<QuarterlyTarget>,
}

impl PerformanceRecord {
    pub fn target(&self, quarter: &str) -> Option<&QuarterlyTarget> {
        self.targets.iter().find(|t| t.quarter == quarter)
    }
}

/// Per-quarter entry holding both sign-off sub-workflows
#[derive(Debug, Clone)]
pub struct QuarterlyTarget {
    pub performance_id: Uuid,
    pub quarter: String,
    pub position: i64,
    /// Default approver when a submission names no recipient
    pub supervisor_id: Option<Uuid>,
    pub agreement: ReviewState,
    pub assessment: ReviewState,
}

impl QuarterlyTarget {
    pub fn state(&self, workflow: SubWorkflow) -> &ReviewState {
        match workflow {
            SubWorkflow::Agreement => &self.agreement,
            SubWorkflow::Assessment => &self.assessment,
        }
    }
}

/// Address of one sub-workflow: (record, quarter, kind)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRef {
    pub performance_id: Uuid,
    pub quarter: String,
    pub workflow: SubWorkflow,
}

impl TargetRef {
    pub fn new(performance_id: Uuid, quarter: impl Into<String>, workflow: SubWorkflow) -> Self {
        Self {
            performance_id,
            quarter: quarter.into(),
            workflow,
        }
    }
}
