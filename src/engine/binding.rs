use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::{error, info};

use super::progress::ProgressReporter;
use super::{LogSink, MediaEngine, ProgressFn};
use crate::error::{ReelcastError, Result};
use crate::media::MediaCommand;

/// Load state of the shared engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

/// Owns the engine's lifecycle and serializes access to it.
///
/// Construct once and share through `Arc`; there is no global instance.
pub struct EngineBinding {
    engine: Arc<dyn MediaEngine>,
    state: Mutex<EngineState>,
    load_lock: AsyncMutex<()>,
    in_flight: AsyncMutex<()>,
}

impl EngineBinding {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine,
            state: Mutex::new(EngineState::Unloaded),
            load_lock: AsyncMutex::new(()),
            in_flight: AsyncMutex::new(()),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_state(&self, state: EngineState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn is_ready(&self) -> bool {
        self.state() == EngineState::Ready
    }

    /// Load the engine once. Later calls return immediately.
    ///
    /// A failed load is recorded and reported; it is only retried when
    /// the caller calls this again.
    pub async fn ensure_ready(&self, log: LogSink) -> Result<()> {
        let _loading = self.load_lock.lock().await;
        if self.is_ready() {
            log("Media engine is already loaded.");
            return Ok(());
        }

        self.set_state(EngineState::Loading);
        log("Loading media engine...");
        match self.engine.load(log.clone()).await {
            Ok(()) => {
                self.set_state(EngineState::Ready);
                log("Media engine loaded successfully.");
                info!("Media engine ready");
                Ok(())
            }
            Err(e) => {
                let reason = match e {
                    ReelcastError::EngineLoad(msg) => msg,
                    other => other.to_string(),
                };
                error!(reason = %reason, "Media engine failed to load");
                self.set_state(EngineState::Failed(reason.clone()));
                Err(ReelcastError::EngineLoad(reason))
            }
        }
    }

    /// Take the single in-flight slot.
    ///
    /// Fails without touching the engine when it is not ready or when
    /// another operation still holds a lease.
    pub fn acquire(&self) -> Result<EngineLease<'_>> {
        match self.state() {
            EngineState::Ready => {}
            EngineState::Failed(reason) => return Err(ReelcastError::EngineLoad(reason)),
            EngineState::Unloaded | EngineState::Loading => return Err(ReelcastError::EngineNotReady),
        }
        let guard = self
            .in_flight
            .try_lock()
            .map_err(|_| ReelcastError::EngineBusy)?;
        Ok(EngineLease {
            engine: self.engine.as_ref(),
            _guard: guard,
        })
    }
}

/// Exclusive use of the engine for one operation.
pub struct EngineLease<'a> {
    engine: &'a dyn MediaEngine,
    _guard: AsyncMutexGuard<'a, ()>,
}

impl<'a> EngineLease<'a> {
    pub fn engine(&self) -> &'a dyn MediaEngine {
        self.engine
    }

    /// Run a command, reporting integer percent that never decreases.
    pub async fn run(&self, command: &MediaCommand, on_progress: ProgressFn<'_>) -> Result<()> {
        let reporter = ProgressReporter::new(on_progress);
        reporter.start();
        let on_fraction = |fraction: f64| reporter.report_fraction(fraction);
        self.engine.exec(command, &on_fraction).await?;
        reporter.finish();
        Ok(())
    }
}
