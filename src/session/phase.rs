use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::models::{BlockSurvey, FinalSurvey};

use super::tab_tracker::Direction;

/// Where the session is. `block` is the 0-based block index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum Phase {
    #[default]
    NotStarted,
    BlockIntro { block: usize },
    TaskActive { block: usize },
    PostBlockSurvey { block: usize },
    FinalSurvey,
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::NotStarted => f.write_str("NotStarted"),
            Phase::BlockIntro { block } => write!(f, "BlockIntro({block})"),
            Phase::TaskActive { block } => write!(f, "TaskActive({block})"),
            Phase::PostBlockSurvey { block } => write!(f, "PostBlockSurvey({block})"),
            Phase::FinalSurvey => f.write_str("FinalSurvey"),
            Phase::Complete => f.write_str("Complete"),
        }
    }
}

/// Inbound events from the presentation layer and the ticker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Event {
    Start { consent: bool },
    BeginBlock,
    /// Raw text from the answer field; parsed by the session.
    SubmitAnswer { input: String },
    Tick,
    /// Caller must have confirmed with the participant already.
    StopEarly,
    Visibility { direction: Direction },
    SubmitBlockSurvey { survey: BlockSurvey },
    SubmitFinalSurvey { survey: FinalSurvey },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start { .. } => "start",
            Event::BeginBlock => "begin a block",
            Event::SubmitAnswer { .. } => "submit an answer",
            Event::Tick => "tick",
            Event::StopEarly => "stop early",
            Event::Visibility { .. } => "record a visibility change",
            Event::SubmitBlockSurvey { .. } => "submit the block survey",
            Event::SubmitFinalSurvey { .. } => "submit the final survey",
        }
    }
}

/// Instructions for the presentation layer and the timer driver.
/// `block_number` fields are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Effect {
    ShowBlockIntro {
        block_number: usize,
        comparison_text: Option<String>,
    },
    ShowTask {
        block_number: usize,
    },
    RenderGrid {
        grid: Grid,
    },
    EarningsChanged {
        block_earnings: u64,
    },
    ArmTimer {
        secs: u32,
    },
    CancelTimer,
    TimerUpdated {
        remaining_secs: u32,
    },
    TimeUp,
    ShowBlockSurvey {
        block_number: usize,
        recall_required: bool,
    },
    ShowFinalSurvey,
    ShowComplete {
        total_earnings: u64,
    },
}
