use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::models::{AbandonReason, AttemptRecord, BlockPatch, ConditionKind, SessionPatch};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Creation-time fields of an attempt. The recorder assigns the id.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub session_id: Uuid,
    pub block_number: usize,
    pub condition: ConditionKind,
    pub user_guess: Option<i64>,
    pub actual_zero_count: u32,
    pub elapsed_secs: f64,
    pub tab_switch_count: u32,
    pub tab_switch_history: String,
    pub earnings_before: u64,
    pub abandonment: Option<AbandonReason>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only attempt log with post-hoc backfill.
#[derive(Debug, Clone, Default)]
pub struct AttemptRecorder {
    records: Vec<AttemptRecord>,
    counter: u64,
}

impl AttemptRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its id. Ids are session-global and
    /// increase by one per call, answered or abandoned.
    pub fn append(&mut self, attempt: NewAttempt) -> u64 {
        self.counter += 1;
        let is_correct = attempt
            .user_guess
            .is_some_and(|guess| guess == i64::from(attempt.actual_zero_count));

        self.records.push(AttemptRecord {
            attempt_id: self.counter,
            session_id: attempt.session_id,
            block_number: attempt.block_number,
            condition: attempt.condition,
            user_guess: attempt.user_guess,
            actual_zero_count: attempt.actual_zero_count,
            is_correct,
            elapsed_secs: attempt.elapsed_secs.max(0.0),
            tab_switch_count: attempt.tab_switch_count,
            tab_switch_history: attempt.tab_switch_history,
            earnings_before: attempt.earnings_before,
            abandonment: attempt.abandonment,
            timestamp: attempt.timestamp,
            satisfaction: None,
            boredom: None,
            recall_guess: None,
            block_duration_secs: None,
            demographics: None,
            total_earnings: None,
        });
        self.counter
    }

    /// Patches every record of `block_number` (1-based). Returns how many
    /// records were touched.
    pub fn backfill_block(&mut self, block_number: usize, patch: &BlockPatch) -> usize {
        let mut patched = 0;
        for record in self
            .records
            .iter_mut()
            .filter(|r| r.block_number == block_number)
        {
            if record.apply_block_patch(patch) {
                log_warn!(
                    "attempt {} already had block survey fields; overwriting",
                    record.attempt_id
                );
            }
            patched += 1;
        }
        patched
    }

    /// Patches every record in the log regardless of block.
    pub fn backfill_all(&mut self, patch: &SessionPatch) -> usize {
        for record in self.records.iter_mut() {
            if record.apply_session_patch(patch) {
                log_warn!(
                    "attempt {} already had session fields; overwriting",
                    record.attempt_id
                );
            }
        }
        self.records.len()
    }

    /// All records in append order. Empty logs are an error the caller may
    /// choose to treat as a no-op.
    pub fn export_all(&self) -> SessionResult<&[AttemptRecord]> {
        if self.is_empty() {
            return Err(SessionError::EmptyExport);
        }
        Ok(&self.records)
    }

    pub fn records(&self) -> &[AttemptRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.counter = 0;
    }
}
