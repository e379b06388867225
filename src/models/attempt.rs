use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::condition::ConditionKind;
use super::survey::Demographics;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AbandonReason {
    Timeout,
    Manual,
}

impl AbandonReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbandonReason::Timeout => "timeout",
            AbandonReason::Manual => "manual",
        }
    }
}

/// One presented grid and how it was resolved.
///
/// Everything above the backfill marker is fixed at append time. The
/// remaining fields start unset and are patched after the block survey and
/// the final survey.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub attempt_id: u64,
    pub session_id: Uuid,
    /// 1-based.
    pub block_number: usize,
    pub condition: ConditionKind,
    /// `None` marks an abandoned attempt.
    pub user_guess: Option<i64>,
    pub actual_zero_count: u32,
    pub is_correct: bool,
    pub elapsed_secs: f64,
    pub tab_switch_count: u32,
    pub tab_switch_history: String,
    pub earnings_before: u64,
    pub abandonment: Option<AbandonReason>,
    pub timestamp: DateTime<Utc>,

    // backfilled
    pub satisfaction: Option<u8>,
    pub boredom: Option<u8>,
    pub recall_guess: Option<u32>,
    pub block_duration_secs: Option<f64>,
    pub demographics: Option<Demographics>,
    pub total_earnings: Option<u64>,
}

impl AttemptRecord {
    pub fn is_abandoned(&self) -> bool {
        self.user_guess.is_none()
    }

    /// Applies the post-block survey fields. Returns true if any of them had
    /// already been set.
    pub fn apply_block_patch(&mut self, patch: &BlockPatch) -> bool {
        let overwrote = self.satisfaction.is_some()
            || self.boredom.is_some()
            || self.block_duration_secs.is_some();
        self.satisfaction = Some(patch.satisfaction);
        self.boredom = Some(patch.boredom);
        self.recall_guess = patch.recall_guess;
        self.block_duration_secs = Some(patch.block_duration_secs);
        overwrote
    }

    /// Applies the session-level fields. Returns true if they had already been set.
    pub fn apply_session_patch(&mut self, patch: &SessionPatch) -> bool {
        let overwrote = self.demographics.is_some() || self.total_earnings.is_some();
        self.demographics = Some(patch.demographics.clone());
        self.total_earnings = Some(patch.total_earnings);
        overwrote
    }
}

/// Fields written onto every record of one block once its survey is in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockPatch {
    pub satisfaction: u8,
    pub boredom: u8,
    pub recall_guess: Option<u32>,
    pub block_duration_secs: f64,
}

/// Fields written onto every record of the session at the end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    pub demographics: Demographics,
    pub total_earnings: u64,
}
