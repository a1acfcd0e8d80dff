use std::sync::Mutex;

use statstrace::error::TraceError;
use statstrace::field::{TracedEntity, TracedField};
use statstrace::global;
use statstrace::lifecycle::{handle_host_event, HostEvent};
use statstrace::recorder::{DataSource, RepositoryState, SessionManager, SessionState};
use statstrace::settings::TracerSettings;

// The tracer instance is process-wide; tests touching it take turns.
static GLOBAL: Mutex<()> = Mutex::new(());

fn settings(session_capacity: u32) -> TracerSettings {
    TracerSettings {
        session_capacity,
        csv_output_dir: std::env::temp_dir().join("statstrace-lifecycle-tests"),
        ..TracerSettings::default()
    }
}

#[test]
fn test_play_session_runs_through_all_states() {
    let mut manager = SessionManager::new(settings(10));
    let id = handle_host_event(&mut manager, HostEvent::PreBeginPlay).unwrap();

    let entity = TracedEntity::new("Hero");
    let hp = TracedField::new(100);
    let handle = manager.create_repository("Hero", "", &entity, false, true).unwrap();
    manager.add_data_source(handle, DataSource::new(&hp, "HP", 512)).unwrap();

    assert_eq!(handle_host_event(&mut manager, HostEvent::PostBeginPlay), None);
    handle_host_event(&mut manager, HostEvent::Tick { delta_seconds: 0.5 });
    handle_host_event(&mut manager, HostEvent::Pause);
    handle_host_event(&mut manager, HostEvent::Tick { delta_seconds: 0.5 });
    handle_host_event(&mut manager, HostEvent::SingleStep { delta_seconds: 0.5 });
    handle_host_event(&mut manager, HostEvent::Resume);
    handle_host_event(&mut manager, HostEvent::Tick { delta_seconds: 0.5 });
    handle_host_event(&mut manager, HostEvent::EndPlay);

    let session = manager.session(id).unwrap();
    assert_eq!(session.state(), SessionState::Complete);
    assert_eq!(session.frame(), 4);
    let repo = manager.repository(handle).unwrap();
    assert_eq!(repo.state(), RepositoryState::Complete);
    assert_eq!(repo.sources().next().unwrap().sample_count(), 3);
}

#[test]
fn test_begin_play_evicts_beyond_capacity() {
    let mut manager = SessionManager::new(settings(2));
    for _ in 0..3 {
        handle_host_event(&mut manager, HostEvent::PreBeginPlay);
    }
    assert_eq!(manager.session_count(), 2);
    assert_eq!(manager.oldest_session().unwrap().id(), 1);

    handle_host_event(&mut manager, HostEvent::RemoveSession { id: 1 });
    assert_eq!(manager.session_count(), 1);
}

#[test]
fn test_global_requires_init() {
    let _guard = GLOBAL.lock().unwrap_or_else(|e| e.into_inner());
    global::shutdown();

    assert_eq!(global::dispatch(HostEvent::PreBeginPlay), Err(TraceError::NotInitialized));
    assert!(global::with_manager(|m| m.session_count()).is_none());
    assert!(!global::is_initialized());
}

#[test]
fn test_global_init_dispatch_shutdown() {
    let _guard = GLOBAL.lock().unwrap_or_else(|e| e.into_inner());
    global::shutdown();

    global::init(settings(10)).unwrap();
    assert_eq!(global::init(settings(10)), Err(TraceError::AlreadyInitialized));

    let id = global::dispatch(HostEvent::PreBeginPlay).unwrap().unwrap();
    global::dispatch(HostEvent::PostBeginPlay).unwrap();
    global::dispatch(HostEvent::Tick { delta_seconds: 0.1 }).unwrap();
    assert_eq!(global::with_manager(|m| m.active_session().map(|s| s.id())), Some(Some(id)));

    let manager = global::shutdown().unwrap();
    assert_eq!(manager.session_count(), 1);
    assert!(global::shutdown().is_none());
}
