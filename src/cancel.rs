//! Per-pipeline cancellation tied to the interrupt signal.
//!
//! Each pipeline gets its own [`InterruptGuard`]. While the guard is alive an
//! interrupt (SIGINT, usually Ctrl-C) marks the guard's [`CancellationToken`] as
//! cancelled; every [`Stage`](crate::process::Stage) of the pipeline holds a clone of
//! that token and terminates its process once it observes the flag. Dropping
//! the guard unsubscribes from the signal, so an interrupt arriving between
//! pipelines never reaches a stale token.

use crate::error::Result;
use signal_hook::SigId;
use signal_hook::consts::SIGINT;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag telling the stages of one pipeline to stop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Keeps the interrupt signal subscribed to one token for as long as it lives.
#[derive(Debug)]
pub struct InterruptGuard {
    token: CancellationToken,
    id: SigId,
}

impl InterruptGuard {
    /// Creates a fresh token and routes SIGINT to it.
    pub fn install() -> Result<Self> {
        let token = CancellationToken::new();
        let id = signal_hook::flag::register(SIGINT, Arc::clone(&token.cancelled))?;
        log::trace!("interrupt subscription installed");
        Ok(Self { token, id })
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        signal_hook::low_level::unregister(self.id);
        log::trace!("interrupt subscription removed");
    }
}
