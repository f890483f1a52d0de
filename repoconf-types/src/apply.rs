use crate::change::{ChangeDomain, ChangeOp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of applying a confirmed change list, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRecord {
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub dry_run: bool,

    #[serde(default)]
    pub results: Vec<ApplyResult>,

    pub summary: ApplySummary,
}

impl ApplyRecord {
    pub fn new(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            ended_at: None,
            dry_run,
            results: vec![],
            summary: ApplySummary::default(),
        }
    }

    /// The change that stopped the run, if any.
    pub fn failure(&self) -> Option<&ApplyResult> {
        self.results
            .iter()
            .find(|r| r.status == ApplyStatus::Failed)
    }

    pub fn applied(&self) -> impl Iterator<Item = &ApplyResult> {
        self.results
            .iter()
            .filter(|r| r.status == ApplyStatus::Applied)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Position in the confirmed change list.
    pub index: usize,
    pub domain: ChangeDomain,
    pub op: ChangeOp,
    pub headline: String,
    pub status: ApplyStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Applied,
    Failed,
    /// Not attempted: dry run, or an earlier change failed.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub attempted: u64,
    pub applied: u64,
    pub failed: u64,
    pub skipped: u64,
}
