//! Flat projections of the attempt log for download.
//!
//! The CSV writer takes an ordered column list so a deployment can drop or
//! reorder columns without touching the record type. Unset backfill fields
//! render as `N/A`; abandoned guesses render as `ABANDONED`.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::SecondsFormat;

use crate::error::{SessionError, SessionResult};
use crate::models::AttemptRecord;

pub const DEFAULT_FILE_NAME: &str = "experiment_data_final.csv";
pub const MISSING: &str = "N/A";
pub const ABANDONED: &str = "ABANDONED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    AttemptId,
    SessionId,
    Block,
    Condition,
    IsCorrect,
    UserGuess,
    ActualAnswer,
    TimeSpentSec,
    SwitchCount,
    SwitchHistory,
    EarningsBefore,
    BlockDurationSec,
    Abandonment,
    Satisfaction,
    Boredom,
    PeerRecallGuess,
    Timestamp,
    ImportanceBest,
    DistractionLevel,
    Age,
    Gender,
    Major,
    YearStudy,
    TotalEarnings,
}

impl Column {
    pub const DEFAULT: &'static [Column] = &[
        Column::AttemptId,
        Column::SessionId,
        Column::Block,
        Column::Condition,
        Column::IsCorrect,
        Column::UserGuess,
        Column::ActualAnswer,
        Column::TimeSpentSec,
        Column::SwitchCount,
        Column::SwitchHistory,
        Column::EarningsBefore,
        Column::BlockDurationSec,
        Column::Abandonment,
        Column::Satisfaction,
        Column::Boredom,
        Column::PeerRecallGuess,
        Column::Timestamp,
        Column::ImportanceBest,
        Column::DistractionLevel,
        Column::Age,
        Column::Gender,
        Column::Major,
        Column::YearStudy,
        Column::TotalEarnings,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Column::AttemptId => "Attempt_ID",
            Column::SessionId => "Session_ID",
            Column::Block => "Block",
            Column::Condition => "Condition",
            Column::IsCorrect => "Is_Correct",
            Column::UserGuess => "User_Guess",
            Column::ActualAnswer => "Actual_Answer",
            Column::TimeSpentSec => "Time_Spent_Sec",
            Column::SwitchCount => "Switch_Count",
            Column::SwitchHistory => "Switch_History",
            Column::EarningsBefore => "Earnings_Before",
            Column::BlockDurationSec => "Block_Duration_Sec",
            Column::Abandonment => "Abandonment",
            Column::Satisfaction => "Satisfaction",
            Column::Boredom => "Boredom",
            Column::PeerRecallGuess => "Peer_Recall_Guess",
            Column::Timestamp => "Timestamp",
            Column::ImportanceBest => "Importance_Best",
            Column::DistractionLevel => "Distraction_Level",
            Column::Age => "Age",
            Column::Gender => "Gender",
            Column::Major => "Major",
            Column::YearStudy => "Year_Study",
            Column::TotalEarnings => "Total_Earnings",
        }
    }

    pub fn value(&self, record: &AttemptRecord) -> String {
        let demographics = record.demographics.as_ref();
        match self {
            Column::AttemptId => record.attempt_id.to_string(),
            Column::SessionId => record.session_id.to_string(),
            Column::Block => record.block_number.to_string(),
            Column::Condition => record.condition.to_string(),
            Column::IsCorrect => record.is_correct.to_string(),
            Column::UserGuess => record
                .user_guess
                .map_or_else(|| ABANDONED.to_string(), |g| g.to_string()),
            Column::ActualAnswer => record.actual_zero_count.to_string(),
            Column::TimeSpentSec => format!("{:.3}", record.elapsed_secs),
            Column::SwitchCount => record.tab_switch_count.to_string(),
            Column::SwitchHistory => record.tab_switch_history.clone(),
            Column::EarningsBefore => record.earnings_before.to_string(),
            Column::BlockDurationSec => or_missing(record.block_duration_secs.map(|d| format!("{d:.3}"))),
            Column::Abandonment => or_missing(record.abandonment.map(|r| r.as_str().to_string())),
            Column::Satisfaction => or_missing(record.satisfaction),
            Column::Boredom => or_missing(record.boredom),
            Column::PeerRecallGuess => or_missing(record.recall_guess),
            Column::Timestamp => record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            Column::ImportanceBest => or_missing(demographics.map(|d| d.importance)),
            Column::DistractionLevel => or_missing(demographics.map(|d| d.distraction)),
            Column::Age => or_missing(demographics.map(|d| d.age)),
            Column::Gender => or_missing(demographics.map(|d| d.gender.clone())),
            Column::Major => or_missing(demographics.map(|d| d.major.clone())),
            Column::YearStudy => or_missing(demographics.map(|d| d.year_of_study.clone())),
            Column::TotalEarnings => or_missing(record.total_earnings),
        }
    }
}

fn or_missing<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// Quotes a field when it contains a separator, quote, or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_line<I: IntoIterator<Item = String>>(fields: I) -> String {
    fields
        .into_iter()
        .map(|f| escape_field(&f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders `records` as CSV with a header row, one line per record.
pub fn to_csv(records: &[AttemptRecord], columns: &[Column]) -> SessionResult<String> {
    if records.is_empty() {
        return Err(SessionError::EmptyExport);
    }

    let mut out = csv_line(columns.iter().map(|c| c.header().to_string()));
    for record in records {
        out.push('\n');
        out.push_str(&csv_line(columns.iter().map(|c| c.value(record))));
    }
    out.push('\n');
    Ok(out)
}

pub fn to_json(records: &[AttemptRecord]) -> Result<String> {
    if records.is_empty() {
        return Err(SessionError::EmptyExport.into());
    }
    serde_json::to_string_pretty(records).context("Failed to serialize attempt log")
}

pub fn write_csv(
    path: impl AsRef<Path>,
    records: &[AttemptRecord],
    columns: &[Column],
) -> Result<()> {
    let path = path.as_ref();
    let contents = to_csv(records, columns)?;
    fs::write(path, contents)
        .with_context(|| format!("Failed to write export to {}", path.display()))
}
