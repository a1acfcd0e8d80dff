//! Process-wide tracer instance.
//!
//! `init` must run before any other call and `shutdown` tears everything
//! down, dropping every session (and closing their CSV files) in order.

use std::sync::{Mutex, MutexGuard};

use tracing::info;

use crate::error::TraceError;
use crate::lifecycle::{handle_host_event, HostEvent};
use crate::recorder::manager::SessionManager;
use crate::settings::TracerSettings;

static TRACER: Mutex<Option<SessionManager>> = Mutex::new(None);

fn lock() -> MutexGuard<'static, Option<SessionManager>> {
    TRACER.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn init(settings: TracerSettings) -> Result<(), TraceError> {
    let mut slot = lock();
    if slot.is_some() {
        return Err(TraceError::AlreadyInitialized);
    }
    *slot = Some(SessionManager::new(settings));
    info!("Tracer initialized");
    Ok(())
}

/// Hands back the manager, if there was one. Dropping it ends all recording.
pub fn shutdown() -> Option<SessionManager> {
    let manager = lock().take();
    if manager.is_some() {
        info!("Tracer shut down");
    }
    manager
}

pub fn is_initialized() -> bool {
    lock().is_some()
}

/// Runs `f` against the manager; `None` before `init` or after `shutdown`.
pub fn with_manager<R>(f: impl FnOnce(&mut SessionManager) -> R) -> Option<R> {
    lock().as_mut().map(f)
}

pub fn dispatch(event: HostEvent) -> Result<Option<u32>, TraceError> {
    with_manager(|m| handle_host_event(m, event)).ok_or(TraceError::NotInitialized)
}
