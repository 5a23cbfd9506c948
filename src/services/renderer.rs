use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::RenderError;
use crate::services::engine::{Engine, EngineLauncher, Surface};

/// Lifecycle of the shared renderer process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Starting,
    Ready,
    ShuttingDown,
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Starting => "starting",
            LifecycleState::Ready => "ready",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Closed => "closed",
        };
        f.write_str(name)
    }
}

enum Slot {
    Idle(LifecycleState),
    Ready(Arc<dyn Engine>),
}

impl Slot {
    fn state(&self) -> LifecycleState {
        match self {
            Slot::Idle(state) => *state,
            Slot::Ready(_) => LifecycleState::Ready,
        }
    }
}

/// Process-wide handle to the one browser process.
///
/// Requests only take the lock long enough to clone the engine out, so
/// surface work never serializes on the handle.
pub struct RendererHandle {
    launcher: Box<dyn EngineLauncher>,
    slot: RwLock<Slot>,
}

impl RendererHandle {
    pub fn new(launcher: impl EngineLauncher + 'static) -> Self {
        Self {
            launcher: Box::new(launcher),
            slot: RwLock::new(Slot::Idle(LifecycleState::Uninitialized)),
        }
    }

    pub async fn state(&self) -> LifecycleState {
        self.slot.read().await.state()
    }

    pub async fn is_ready(&self) -> bool {
        self.state().await == LifecycleState::Ready
    }

    /// Launch the browser process. Only valid from `uninitialized`.
    pub async fn start(&self) -> Result<(), RenderError> {
        {
            let mut slot = self.slot.write().await;
            match slot.state() {
                LifecycleState::Uninitialized => *slot = Slot::Idle(LifecycleState::Starting),
                other => return Err(RenderError::Unavailable(other)),
            }
        }

        tracing::info!("Starting renderer process");
        let launched = self.launcher.launch().await;

        let mut slot = self.slot.write().await;
        match launched {
            Ok(engine) if slot.state() == LifecycleState::Starting => {
                *slot = Slot::Ready(engine);
                tracing::info!("Renderer ready");
                Ok(())
            }
            Ok(engine) => {
                // Shutdown was requested while the process was booting.
                let state = slot.state();
                *slot = Slot::Idle(LifecycleState::Closed);
                drop(slot);
                if let Err(e) = engine.close().await {
                    tracing::warn!(%e, "Failed to close renderer launched during shutdown");
                }
                Err(RenderError::Unavailable(state))
            }
            Err(e) => {
                *slot = Slot::Idle(LifecycleState::Closed);
                tracing::error!(%e, "Renderer failed to start");
                Err(e)
            }
        }
    }

    /// Open a fresh surface, failing fast unless the handle is ready.
    pub async fn new_surface(&self) -> Result<Box<dyn Surface>, RenderError> {
        let engine = match &*self.slot.read().await {
            Slot::Ready(engine) => engine.clone(),
            Slot::Idle(state) => return Err(RenderError::Unavailable(*state)),
        };
        engine.open_surface().await
    }

    /// Terminate the browser process. Idempotent.
    pub async fn shutdown(&self) {
        let engine = {
            let mut slot = self.slot.write().await;
            match std::mem::replace(&mut *slot, Slot::Idle(LifecycleState::ShuttingDown)) {
                Slot::Ready(engine) => Some(engine),
                Slot::Idle(LifecycleState::Starting) => {
                    // start() notices and closes the engine it launches.
                    None
                }
                Slot::Idle(_) => {
                    *slot = Slot::Idle(LifecycleState::Closed);
                    return;
                }
            }
        };

        if let Some(engine) = engine {
            tracing::info!("Closing renderer process");
            match engine.close().await {
                Ok(()) => tracing::info!("Renderer closed"),
                Err(e) => tracing::warn!(%e, "Error while closing renderer"),
            }
            *self.slot.write().await = Slot::Idle(LifecycleState::Closed);
        }
    }
}
