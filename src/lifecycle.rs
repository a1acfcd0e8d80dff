//! Host lifecycle glue.
//!
//! The host decides when recording episodes begin and end; it reports those
//! moments as [`HostEvent`]s and the manager reacts.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::recorder::manager::SessionManager;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HostEvent {
    /// A play session is about to begin: open a new tracer session.
    PreBeginPlay,
    /// The play world is live: start the active session.
    PostBeginPlay,
    EndPlay,
    Pause,
    Resume,
    /// Host advanced one frame while paused; samples regardless of gates.
    SingleStep { delta_seconds: f32 },
    /// Regular per-frame update.
    Tick { delta_seconds: f32 },
    RemoveSession { id: u32 },
}

/// Applies one host event. `PreBeginPlay` returns the new session id.
pub fn handle_host_event(manager: &mut SessionManager, event: HostEvent) -> Option<u32> {
    match event {
        HostEvent::PreBeginPlay => {
            let id = manager.initialize_new_session();
            for evicted in manager.enforce_session_capacity() {
                info!("Session capacity reached, evicted session {}", evicted);
            }
            return Some(id);
        }
        HostEvent::PostBeginPlay => manager.start_active_session(),
        HostEvent::EndPlay => manager.end_active_session(),
        HostEvent::Pause => manager.pause_active_session(),
        HostEvent::Resume => manager.resume_active_session(),
        HostEvent::SingleStep { delta_seconds } => manager.update_active_session(delta_seconds, true),
        HostEvent::Tick { delta_seconds } => manager.update_active_session(delta_seconds, false),
        HostEvent::RemoveSession { id } => {
            manager.remove_session(id);
        }
    }
    None
}
