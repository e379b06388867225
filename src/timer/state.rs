use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Expired,
}

/// Result of advancing the countdown by one second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick<E> {
    /// Not armed, cancelled, or already fired.
    Inert,
    Running { remaining_secs: u32 },
    /// Reached zero on this tick; carries the payload given to `arm`.
    Expired(E),
}

/// Single-shot countdown driven by external one-second ticks.
///
/// The expiry payload is handed back exactly once, from the tick that reaches
/// zero. After that, or after `cancel`, the timer is inert until re-armed.
#[derive(Debug, Clone)]
pub struct BlockTimer<E> {
    status: TimerStatus,
    remaining_secs: u32,
    on_expire: Option<E>,
}

impl<E> Default for BlockTimer<E> {
    fn default() -> Self {
        Self {
            status: TimerStatus::Idle,
            remaining_secs: 0,
            on_expire: None,
        }
    }
}

impl<E> BlockTimer<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a countdown, superseding any countdown already in progress.
    pub fn arm(&mut self, duration_secs: u32, on_expire: E) {
        *self = Self {
            status: TimerStatus::Running,
            remaining_secs: duration_secs,
            on_expire: Some(on_expire),
        };
    }

    pub fn tick(&mut self) -> Tick<E> {
        if self.status != TimerStatus::Running {
            return Tick::Inert;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Tick::Running {
                remaining_secs: self.remaining_secs,
            };
        }

        self.status = TimerStatus::Expired;
        match self.on_expire.take() {
            Some(payload) => Tick::Expired(payload),
            None => Tick::Inert,
        }
    }

    /// Stops the countdown and drops the pending payload. No-op when idle or
    /// already expired.
    pub fn cancel(&mut self) {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Idle;
        }
        self.on_expire = None;
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn remaining_secs(&self) -> u32 {
        match self.status {
            TimerStatus::Running => self.remaining_secs,
            TimerStatus::Idle | TimerStatus::Expired => 0,
        }
    }
}
