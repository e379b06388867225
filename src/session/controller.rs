use std::{ops::ControlFlow, path::Path, sync::Arc};

use anyhow::Result;
use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    time::Duration,
};
use uuid::Uuid;

use crate::error::SessionResult;
use crate::export;
use crate::models::AttemptRecord;
use crate::timer::Ticker;

use super::machine::Session;
use super::phase::{Effect, Event, Phase};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub block_earnings: u64,
    pub total_earnings: u64,
    pub remaining_secs: u32,
    pub attempts_logged: usize,
}

/// Owns a [`Session`] behind a mutex and drives its countdown with a real
/// one-second ticker. Every effect, whether produced by a dispatched event or
/// by a tick, is also pushed to the effect channel returned from `new`.
#[derive(Clone)]
pub struct SessionController {
    session: Arc<Mutex<Session>>,
    ticker: Arc<Mutex<Ticker>>,
    effects_tx: mpsc::UnboundedSender<Effect>,
}

impl SessionController {
    pub fn new(session: Session) -> (Self, mpsc::UnboundedReceiver<Effect>) {
        Self::with_tick_interval(session, Duration::from_secs(1))
    }

    pub fn with_tick_interval(
        session: Session,
        tick_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Effect>) {
        let (effects_tx, effects_rx) = mpsc::unbounded_channel();
        let controller = Self {
            session: Arc::new(Mutex::new(session)),
            ticker: Arc::new(Mutex::new(Ticker::new(tick_interval))),
            effects_tx,
        };
        (controller, effects_rx)
    }

    /// Applies one event. Rejected events change nothing and emit nothing.
    ///
    /// The session stays locked until the ticker is updated and the effects
    /// are on the channel, so channel order always matches transition order.
    pub async fn dispatch(&self, event: Event) -> SessionResult<Vec<Effect>> {
        let mut session = self.session.lock().await;
        let effects = session.handle(event)?;

        for effect in &effects {
            match effect {
                Effect::ArmTimer { .. } => self.spawn_ticker().await,
                Effect::CancelTimer => self.ticker.lock().await.stop(),
                _ => {}
            }
        }
        self.forward(&effects);
        drop(session);

        Ok(effects)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock().await;
        SessionSnapshot {
            session_id: session.session_id(),
            phase: session.phase(),
            block_earnings: session.block_earnings(),
            total_earnings: session.total_earnings(),
            remaining_secs: session.remaining_secs(),
            attempts_logged: session.records().len(),
        }
    }

    pub async fn phase(&self) -> Phase {
        self.session.lock().await.phase()
    }

    pub async fn records(&self) -> Vec<AttemptRecord> {
        self.session.lock().await.records().to_vec()
    }

    /// Writes the full attempt log as CSV with the default columns.
    pub async fn export_csv(&self, path: impl AsRef<Path>) -> Result<usize> {
        let session = self.session.lock().await;
        let records = session.export_all()?;
        export::write_csv(path, records, export::Column::DEFAULT)?;
        Ok(records.len())
    }

    /// Stops the ticker and waits for it to exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.ticker.lock().await.shutdown().await
    }

    async fn spawn_ticker(&self) {
        let session = self.session.clone();
        let effects_tx = self.effects_tx.clone();

        self.ticker.lock().await.start(move |cancel_token| {
            let session = session.clone();
            let effects_tx = effects_tx.clone();
            async move {
                // A tick that is still waiting for the lock when the ticker is
                // stopped must not run against the next block.
                let mut guard = tokio::select! {
                    guard = session.lock() => guard,
                    _ = cancel_token.cancelled() => return ControlFlow::Break(()),
                };
                if cancel_token.is_cancelled() {
                    return ControlFlow::Break(());
                }
                let effects = match guard.tick() {
                    Ok(effects) => effects,
                    Err(err) => {
                        log_error!("tick rejected: {err}");
                        return ControlFlow::Break(());
                    }
                };

                if effects.contains(&Effect::TimeUp) {
                    log_info!("block countdown reached zero");
                }
                for effect in effects {
                    let _ = effects_tx.send(effect);
                }

                if guard.timer_running() {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            }
        });
    }

    fn forward(&self, effects: &[Effect]) {
        for effect in effects {
            if self.effects_tx.send(effect.clone()).is_err() {
                break;
            }
        }
    }
}
