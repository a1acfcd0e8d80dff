use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use statstrace::error::TraceError;
use statstrace::field::{TracedEntity, TracedField};
use statstrace::recorder::budget::BYTES_PER_MEGABYTE;
use statstrace::recorder::{DataSource, MemoryBudget, RepositoryState, SessionManager, SessionState, DEFAULT_GROUP};
use statstrace::settings::TracerSettings;
use statstrace::value::{Transform, Vec3};

/// Collects formatted log output so tests can assert on warnings.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn manager_with_budget(memory_limit_mb: u32, csv_root: &Path) -> SessionManager {
    SessionManager::new(TracerSettings {
        memory_limit_mb,
        csv_output_dir: csv_root.to_path_buf(),
        ..TracerSettings::default()
    })
}

#[test]
fn test_same_field_is_only_traced_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_budget(16, dir.path());
    manager.initialize_new_session();

    let entity = TracedEntity::new("Walker");
    let speed = TracedField::new(0.0f32);
    let handle = manager.create_repository("Walker", "", &entity, false, true).unwrap();

    manager.add_data_source(handle, DataSource::new(&speed, "Speed", 512)).unwrap();
    let err = manager
        .add_data_source(handle, DataSource::new(&speed, "Velocity", 512))
        .unwrap_err();

    assert!(matches!(err, TraceError::DuplicateField { .. }));
    assert_eq!(manager.repository(handle).unwrap().source_count(), 1);
}

#[test]
fn test_same_name_in_same_group_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_budget(16, dir.path());
    manager.initialize_new_session();

    let entity = TracedEntity::new("Walker");
    let a = TracedField::new(0);
    let b = TracedField::new(0);
    let c = TracedField::new(0);
    let handle = manager.create_repository("Walker", "", &entity, false, true).unwrap();

    manager.add_data_source(handle, DataSource::new(&a, "Ammo", 512)).unwrap();
    let err = manager.add_data_source(handle, DataSource::new(&b, "Ammo", 512)).unwrap_err();
    assert_eq!(
        err,
        TraceError::DuplicateName {
            name: "Ammo".to_string(),
            group: DEFAULT_GROUP.to_string()
        }
    );

    // Same name in a different group is fine.
    manager
        .add_data_source(handle, DataSource::new(&c, "Ammo", 512).with_group("Weapon"))
        .unwrap();
    let repo = manager.repository(handle).unwrap();
    assert_eq!(repo.source_count(), 2);
    assert!(repo.find_source("Weapon", "Ammo").is_some());
}

#[test]
fn test_source_over_budget_is_rejected_and_not_charged() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_budget(1, dir.path());
    manager.initialize_new_session();

    let entity = TracedEntity::new("Crate");
    let transform = TracedField::new(Transform::IDENTITY);
    let handle = manager.create_repository("Crate", "", &entity, false, true).unwrap();

    // 36 bytes per transform sample, 65536 samples: well over one megabyte.
    let err = manager
        .add_data_source(handle, DataSource::new(&transform, "Transform", 65536))
        .unwrap_err();

    match err {
        TraceError::MemoryBudgetExceeded { required, available, .. } => {
            assert_eq!(required, 36 * 65536);
            assert_eq!(available, BYTES_PER_MEGABYTE);
        }
        other => panic!("unexpected error {:?}", other),
    }
    let repo = manager.repository(handle).unwrap();
    assert!(repo.groups().is_empty());
    assert_eq!(manager.total_physical_memory(), 0);
}

#[test]
fn test_accepted_source_reserves_its_window() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_budget(4, dir.path());
    manager.initialize_new_session();

    let entity = TracedEntity::new("Walker");
    let location = TracedField::new(Vec3::ZERO);
    let handle = manager.create_repository("Walker", "", &entity, false, true).unwrap();
    manager.add_data_source(handle, DataSource::new(&location, "Location", 1024)).unwrap();

    assert_eq!(manager.total_physical_memory(), 12 * 1024);
    assert_eq!(manager.available_physical_memory(), 4 * BYTES_PER_MEGABYTE - 12 * 1024);

    // Composite sources without a group get one named after themselves.
    let repo = manager.repository(handle).unwrap();
    assert_eq!(repo.groups()[0].name, "Location");
    assert!(!repo.groups()[0].sources[0].color().is_transparent());
}

#[test]
fn test_no_sources_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_budget(16, dir.path());
    manager.initialize_new_session();

    let entity = TracedEntity::new("Walker");
    let speed = TracedField::new(1.0f32);
    let handle = manager.create_repository("Walker", "", &entity, false, true).unwrap();
    manager.start_active_session();

    let err = manager.add_data_source(handle, DataSource::new(&speed, "Speed", 512)).unwrap_err();
    assert_eq!(
        err,
        TraceError::RepositoryNotInitialized {
            state: RepositoryState::Tracing
        }
    );
}

#[test]
fn test_states_only_move_forward_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_budget(16, dir.path());
    manager.initialize_new_session();

    let entity = TracedEntity::new("Walker");
    let handle = manager.create_repository("Walker", "", &entity, false, false).unwrap();
    let state = |m: &SessionManager| m.repository(handle).unwrap().state();

    manager.pause_repository(handle);
    assert_eq!(state(&manager), RepositoryState::Initialized);

    assert!(manager.start_repository(handle));
    assert_eq!(state(&manager), RepositoryState::Tracing);
    manager.pause_repository(handle);
    assert_eq!(state(&manager), RepositoryState::Paused);
    manager.resume_repository(handle);
    assert_eq!(state(&manager), RepositoryState::Tracing);

    manager.stop_repository(handle);
    manager.resume_repository(handle);
    manager.start_repository(handle);
    assert_eq!(state(&manager), RepositoryState::Stopped);

    manager.end_active_session();
    assert_eq!(state(&manager), RepositoryState::Complete);
    assert_eq!(manager.active_session().unwrap().state(), SessionState::Complete);
}

#[test]
fn test_destroyed_entity_stops_repository() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_budget(16, dir.path());
    manager.initialize_new_session();

    let entity = TracedEntity::new("Projectile");
    let speed = TracedField::new(1.0f32);
    let handle = manager.create_repository("Projectile", "", &entity, false, true).unwrap();
    manager.add_data_source(handle, DataSource::new(&speed, "Speed", 512)).unwrap();
    manager.start_active_session();

    manager.update_active_session(0.016, false);
    entity.destroy();
    manager.update_active_session(0.016, false);

    let repo = manager.repository(handle).unwrap();
    assert_eq!(repo.state(), RepositoryState::Stopped);
    assert!(!repo.has_traced_entity());
    assert_eq!(repo.sources().next().unwrap().sample_count(), 1);
}

#[test]
fn test_budget_rejection_refreshes_only() {
    let mut budget = MemoryBudget::from_megabytes(1);
    budget.consume(BYTES_PER_MEGABYTE / 2);
    assert!(!budget.can_fit(BYTES_PER_MEGABYTE));
    budget.consume(0);
    assert_eq!(budget.total_bytes(), BYTES_PER_MEGABYTE / 2);
    assert!((budget.used_ratio() - 0.5).abs() < f32::EPSILON);
}

#[test]
fn test_budget_rejection_logs_warning() {
    let dir = tempfile::tempdir().unwrap();
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut manager = manager_with_budget(1, dir.path());
        manager.initialize_new_session();
        let entity = TracedEntity::new("Crate");
        let transform = TracedField::new(Transform::IDENTITY);
        let handle = manager.create_repository("Crate", "", &entity, false, true).unwrap();
        assert!(manager
            .add_data_source(handle, DataSource::new(&transform, "Transform", 65536))
            .is_err());
    });

    let logs = capture.contents();
    assert!(logs.contains("WARN"), "no warning in {:?}", logs);
    assert!(logs.contains("memory limit"), "no memory-limit warning in {:?}", logs);
    assert!(logs.contains("'Transform' will not be traced"));
}
