use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::ExperimentConfig;
use crate::error::{SessionError, SessionResult};
use crate::grid::{Grid, GridSource};
use crate::models::{
    AbandonReason, AttemptRecord, BlockPatch, BlockSurvey, Condition, FinalSurvey, SessionPatch,
};
use crate::timer::{BlockTimer, Tick};
use crate::utils::{elapsed_secs, Clock};

use super::conditions::{assign_conditions, ConditionShuffler};
use super::phase::{Effect, Event, Phase};
use super::recorder::{AttemptRecorder, NewAttempt};
use super::tab_tracker::{Direction, TabTracker};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Per-block scratch state. Replaced wholesale at each block start.
#[derive(Debug, Clone)]
struct BlockState {
    earnings: u64,
    started_at: DateTime<Utc>,
    duration_secs: Option<f64>,
    grid: Option<Grid>,
    grid_presented_at: DateTime<Utc>,
    tabs: TabTracker,
}

impl BlockState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            earnings: 0,
            started_at: now,
            duration_secs: None,
            grid: None,
            grid_presented_at: now,
            tabs: TabTracker::new(),
        }
    }
}

/// Single-participant experiment session.
///
/// All mutation goes through [`Session::handle`]: an event that is not valid
/// for the current phase is rejected with
/// [`SessionError::InvalidTransition`] and leaves the session untouched. The
/// returned effects tell the presentation layer what to show and tell the
/// timer driver when to start or stop ticking.
pub struct Session {
    id: Uuid,
    config: ExperimentConfig,
    phase: Phase,
    conditions: Vec<Condition>,
    recorder: AttemptRecorder,
    timer: BlockTimer<AbandonReason>,
    block: BlockState,
    total_earnings: u64,
    shuffler: Box<dyn ConditionShuffler>,
    grids: Box<dyn GridSource>,
    clock: Box<dyn Clock>,
}

impl Session {
    /// Fails if `config` does not pass [`ExperimentConfig::validate`].
    pub fn new(
        config: ExperimentConfig,
        shuffler: Box<dyn ConditionShuffler>,
        grids: Box<dyn GridSource>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let now = clock.now();
        Ok(Self {
            id: Uuid::new_v4(),
            config,
            phase: Phase::NotStarted,
            conditions: Vec::new(),
            recorder: AttemptRecorder::new(),
            timer: BlockTimer::new(),
            block: BlockState::new(now),
            total_earnings: 0,
            shuffler,
            grids,
            clock,
        })
    }

    pub fn handle(&mut self, event: Event) -> SessionResult<Vec<Effect>> {
        match (self.phase, event) {
            (Phase::NotStarted | Phase::Complete, Event::Start { consent }) => {
                self.on_start(consent)
            }
            (Phase::BlockIntro { block }, Event::BeginBlock) => Ok(self.on_begin_block(block)),
            (Phase::TaskActive { block }, Event::SubmitAnswer { input }) => {
                self.on_submit_answer(block, &input)
            }
            (Phase::TaskActive { block }, Event::StopEarly) => {
                Ok(self.force_end_block(block, AbandonReason::Manual))
            }
            (Phase::TaskActive { .. }, Event::Visibility { direction }) => {
                self.on_visibility(direction);
                Ok(Vec::new())
            }
            (phase, Event::Visibility { direction }) => {
                log_debug!("ignoring visibility {} during {}", direction, phase);
                Ok(Vec::new())
            }
            (_, Event::Tick) => Ok(self.on_tick()),
            (Phase::PostBlockSurvey { block }, Event::SubmitBlockSurvey { survey }) => {
                self.on_block_survey(block, survey)
            }
            (Phase::FinalSurvey, Event::SubmitFinalSurvey { survey }) => {
                self.on_final_survey(survey)
            }
            (phase, event) => Err(SessionError::InvalidTransition {
                event: event.name().to_string(),
                phase: phase.to_string(),
            }),
        }
    }

    pub fn start(&mut self, consent: bool) -> SessionResult<Vec<Effect>> {
        self.handle(Event::Start { consent })
    }

    pub fn begin_block(&mut self) -> SessionResult<Vec<Effect>> {
        self.handle(Event::BeginBlock)
    }

    pub fn submit_answer(&mut self, input: &str) -> SessionResult<Vec<Effect>> {
        self.handle(Event::SubmitAnswer {
            input: input.to_string(),
        })
    }

    pub fn tick(&mut self) -> SessionResult<Vec<Effect>> {
        self.handle(Event::Tick)
    }

    pub fn stop_early(&mut self) -> SessionResult<Vec<Effect>> {
        self.handle(Event::StopEarly)
    }

    pub fn visibility(&mut self, direction: Direction) -> SessionResult<Vec<Effect>> {
        self.handle(Event::Visibility { direction })
    }

    pub fn submit_block_survey(&mut self, survey: BlockSurvey) -> SessionResult<Vec<Effect>> {
        self.handle(Event::SubmitBlockSurvey { survey })
    }

    pub fn submit_final_survey(&mut self, survey: FinalSurvey) -> SessionResult<Vec<Effect>> {
        self.handle(Event::SubmitFinalSurvey { survey })
    }

    pub fn session_id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn records(&self) -> &[AttemptRecord] {
        self.recorder.records()
    }

    pub fn export_all(&self) -> SessionResult<&[AttemptRecord]> {
        self.recorder.export_all()
    }

    pub fn block_earnings(&self) -> u64 {
        self.block.earnings
    }

    pub fn total_earnings(&self) -> u64 {
        self.total_earnings
    }

    pub fn remaining_secs(&self) -> u32 {
        self.timer.remaining_secs()
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn tab_switch_count(&self) -> u32 {
        self.block.tabs.leave_count()
    }

    fn on_start(&mut self, consent: bool) -> SessionResult<Vec<Effect>> {
        if self.config.require_consent && !consent {
            return Err(SessionError::ConsentRequired);
        }

        self.id = Uuid::new_v4();
        self.timer.cancel();
        self.recorder.clear();
        self.total_earnings = 0;
        self.conditions = assign_conditions(&self.config.conditions, self.shuffler.as_mut());
        self.reset_block_state();

        let order: Vec<&str> = self.conditions.iter().map(|c| c.kind.as_str()).collect();
        log_info!("session {} started; condition order {:?}", self.id, order);

        Ok(self.enter_block_intro(0))
    }

    fn on_begin_block(&mut self, block: usize) -> Vec<Effect> {
        self.reset_block_state();
        let duration = self.config.block_duration_secs;
        self.timer.arm(duration, AbandonReason::Timeout);
        self.phase = Phase::TaskActive { block };

        log_info!(
            "session {} block {} started ({}s, {})",
            self.id,
            block + 1,
            duration,
            self.conditions[block].kind
        );

        vec![
            Effect::ShowTask {
                block_number: block + 1,
            },
            Effect::ArmTimer { secs: duration },
            Effect::TimerUpdated {
                remaining_secs: duration,
            },
            Effect::EarningsChanged { block_earnings: 0 },
            self.present_grid(),
        ]
    }

    fn on_submit_answer(&mut self, block: usize, input: &str) -> SessionResult<Vec<Effect>> {
        let guess = parse_guess(input)?;

        let attempt_id = self.log_attempt(block, Some(guess), None);
        let mut effects = Vec::with_capacity(2);
        if self.recorder.records().last().is_some_and(|r| r.is_correct) {
            self.block.earnings += self.config.payout_per_correct;
            effects.push(Effect::EarningsChanged {
                block_earnings: self.block.earnings,
            });
        }
        log_debug!(
            "attempt {} guess {} -> block earnings {}",
            attempt_id,
            guess,
            self.block.earnings
        );

        effects.push(self.present_grid());
        Ok(effects)
    }

    fn on_visibility(&mut self, direction: Direction) {
        let now = self.clock.now();
        if self.block.tabs.record(direction, now) {
            log_debug!(
                "tab {} (count {})",
                direction,
                self.block.tabs.leave_count()
            );
        }
    }

    fn on_tick(&mut self) -> Vec<Effect> {
        match self.timer.tick() {
            Tick::Inert => Vec::new(),
            Tick::Running { remaining_secs } => vec![Effect::TimerUpdated { remaining_secs }],
            Tick::Expired(reason) => match self.phase {
                Phase::TaskActive { block } => {
                    let mut effects = vec![Effect::TimerUpdated { remaining_secs: 0 }];
                    effects.extend(self.force_end_block(block, reason));
                    effects
                }
                _ => Vec::new(),
            },
        }
    }

    /// Ends the running block on timeout or manual stop: logs the grid in
    /// progress as abandoned and moves to the block survey.
    fn force_end_block(&mut self, block: usize, reason: AbandonReason) -> Vec<Effect> {
        self.timer.cancel();
        let attempt_id = self.log_attempt(block, None, Some(reason));
        self.block.tabs.deactivate();
        self.block.grid = None;

        let duration = elapsed_secs(self.block.started_at, self.clock.now());
        self.block.duration_secs = Some(duration);
        self.phase = Phase::PostBlockSurvey { block };

        log_info!(
            "session {} block {} ended ({}) after {:.1}s; abandoned attempt {}",
            self.id,
            block + 1,
            reason.as_str(),
            duration,
            attempt_id
        );

        let mut effects = vec![Effect::CancelTimer];
        if reason == AbandonReason::Timeout {
            effects.push(Effect::TimeUp);
        }
        effects.push(Effect::ShowBlockSurvey {
            block_number: block + 1,
            recall_required: self.conditions[block].kind.requires_recall(),
        });
        effects
    }

    fn on_block_survey(
        &mut self,
        block: usize,
        survey: BlockSurvey,
    ) -> SessionResult<Vec<Effect>> {
        let kind = self.conditions[block].kind;
        let survey = survey.validated(kind, self.config.likert_max)?;

        self.total_earnings += self.block.earnings;
        let patch = BlockPatch {
            satisfaction: survey.satisfaction,
            boredom: survey.boredom,
            recall_guess: survey.recall,
            block_duration_secs: self.block.duration_secs.unwrap_or_default(),
        };
        let patched = self.recorder.backfill_block(block + 1, &patch);
        log_info!(
            "session {} block {} survey in; {} records patched, total earnings {}",
            self.id,
            block + 1,
            patched,
            self.total_earnings
        );

        let next = block + 1;
        if next >= self.config.total_blocks {
            self.phase = Phase::FinalSurvey;
            Ok(vec![Effect::ShowFinalSurvey])
        } else {
            Ok(self.enter_block_intro(next))
        }
    }

    fn on_final_survey(&mut self, survey: FinalSurvey) -> SessionResult<Vec<Effect>> {
        let demographics = survey.into_demographics(self.config.likert_max)?;
        let patch = SessionPatch {
            demographics,
            total_earnings: self.total_earnings,
        };
        let patched = self.recorder.backfill_all(&patch);
        self.phase = Phase::Complete;

        log_info!(
            "session {} complete; {} records, total earnings {}",
            self.id,
            patched,
            self.total_earnings
        );

        Ok(vec![Effect::ShowComplete {
            total_earnings: self.total_earnings,
        }])
    }

    fn enter_block_intro(&mut self, block: usize) -> Vec<Effect> {
        self.phase = Phase::BlockIntro { block };
        vec![Effect::ShowBlockIntro {
            block_number: block + 1,
            comparison_text: self.conditions[block]
                .comparison_text()
                .map(str::to_string),
        }]
    }

    fn reset_block_state(&mut self) {
        self.block = BlockState::new(self.clock.now());
    }

    /// Shows a new grid and restarts per-grid telemetry. The block countdown
    /// is left alone.
    fn present_grid(&mut self) -> Effect {
        let grid = self.grids.generate(self.config.grid_side);
        self.block.grid_presented_at = self.clock.now();
        self.block.tabs.reset();
        self.block.grid = Some(grid.clone());
        Effect::RenderGrid { grid }
    }

    fn log_attempt(
        &mut self,
        block: usize,
        user_guess: Option<i64>,
        abandonment: Option<AbandonReason>,
    ) -> u64 {
        let now = self.clock.now();
        let actual_zero_count = self.block.grid.as_ref().map_or(0, |g| g.zero_count);
        self.recorder.append(NewAttempt {
            session_id: self.id,
            block_number: block + 1,
            condition: self.conditions[block].kind,
            user_guess,
            actual_zero_count,
            elapsed_secs: elapsed_secs(self.block.grid_presented_at, now),
            tab_switch_count: self.block.tabs.leave_count(),
            tab_switch_history: self.block.tabs.flatten(),
            earnings_before: self.block.earnings,
            abandonment,
            timestamp: now,
        })
    }
}

fn parse_guess(input: &str) -> SessionResult<i64> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| SessionError::InvalidAnswer {
            input: input.to_string(),
        })
}
