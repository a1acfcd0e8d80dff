//! Owner of every session and of the global memory budget.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::TraceError;
use crate::field::{EntityResolver, TracedEntity};
use crate::recorder::budget::MemoryBudget;
use crate::recorder::repository::Repository;
use crate::recorder::session::{RepositoryHandle, Session};
use crate::recorder::source::DataSource;
use crate::recorder::stats::{compute_summary, TracerSummary};
use crate::settings::TracerSettings;

/// Ordered list of sessions; the last one is the active session.
#[derive(Debug)]
pub struct SessionManager {
    sessions: Vec<Session>,
    budget: MemoryBudget,
    settings: TracerSettings,
    next_session_id: u32,
    resolver: Option<Box<dyn EntityResolver>>,
}

impl SessionManager {
    pub fn new(settings: TracerSettings) -> Self {
        Self {
            sessions: Vec::new(),
            budget: MemoryBudget::from_megabytes(settings.memory_limit_mb),
            settings,
            next_session_id: 0,
            resolver: None,
        }
    }

    /// Installs the lookup used to re-link entities when a session ends.
    pub fn set_entity_resolver(&mut self, resolver: Box<dyn EntityResolver>) {
        self.resolver = Some(resolver);
    }

    /// Appends a fresh session, which becomes the active one. Returns its id.
    pub fn initialize_new_session(&mut self) -> u32 {
        self.update_physical_memory_usage();

        let id = self.next_session_id;
        self.next_session_id += 1;
        self.sessions.push(Session::new(
            id,
            self.settings.sample_frequency,
            self.settings.csv_output_dir.clone(),
        ));
        info!("Tracer session {} created ({} stored)", id, self.sessions.len());
        id
    }

    /// Drops the oldest sessions until the configured capacity holds.
    /// A capacity of zero means unlimited. Returns the evicted ids.
    pub fn enforce_session_capacity(&mut self) -> Vec<u32> {
        let capacity = self.settings.session_capacity as usize;
        let mut evicted = Vec::new();
        if capacity == 0 {
            return evicted;
        }
        while self.sessions.len() > capacity {
            let id = self.sessions[0].id();
            self.remove_session(id);
            evicted.push(id);
        }
        evicted
    }

    pub fn start_active_session(&mut self) {
        if let Some(session) = self.sessions.last_mut() {
            session.start();
        }
    }

    pub fn pause_active_session(&mut self) {
        if let Some(session) = self.sessions.last_mut() {
            session.pause();
        }
    }

    pub fn resume_active_session(&mut self) {
        if let Some(session) = self.sessions.last_mut() {
            session.resume();
        }
    }

    pub fn update_active_session(&mut self, delta_seconds: f32, force_update: bool) {
        if let Some(session) = self.sessions.last_mut() {
            session.update(delta_seconds, force_update);
        }
    }

    pub fn stop_active_session(&mut self) {
        if let Some(session) = self.sessions.last_mut() {
            session.stop();
        }
    }

    pub fn end_active_session(&mut self) {
        let resolver = self.resolver.as_deref();
        if let Some(session) = self.sessions.last_mut() {
            session.end(resolver);
        }
    }

    /// Creates (or returns the existing) repository for `entity` in the active
    /// session. Fails when there is no session or it is already stopped.
    pub fn create_repository(
        &mut self,
        name: &str,
        description: &str,
        entity: &Arc<TracedEntity>,
        stream_to_csv: bool,
        autostart: bool,
    ) -> Result<RepositoryHandle, TraceError> {
        let Some(session) = self.sessions.last_mut() else {
            warn!("Unable to create tracer for '{}'. No tracer session exists.", entity.name());
            return Err(TraceError::NoActiveSession);
        };
        session.create_repository(name, description, entity, stream_to_csv, autostart)
    }

    /// Routes `source` to the repository behind `handle`, charging the budget.
    pub fn add_data_source(&mut self, handle: RepositoryHandle, source: DataSource) -> Result<(), TraceError> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id() == handle.session_id)
            .ok_or(TraceError::UnknownSession { id: handle.session_id })?;
        let repo = session
            .repository_mut(handle.repository_id)
            .ok_or(TraceError::UnknownRepository { id: handle.repository_id })?;
        repo.add_data_source(source, &mut self.budget)
    }

    /// Starts a repository that was created without autostart.
    pub fn start_repository(&mut self, handle: RepositoryHandle) -> bool {
        self.session_mut(handle.session_id)
            .map(|s| s.start_repository(handle.repository_id))
            .unwrap_or(false)
    }

    pub fn pause_repository(&mut self, handle: RepositoryHandle) {
        if let Some(repo) = self.repository_mut(handle) {
            repo.pause();
        }
    }

    pub fn resume_repository(&mut self, handle: RepositoryHandle) {
        if let Some(repo) = self.repository_mut(handle) {
            repo.resume();
        }
    }

    pub fn stop_repository(&mut self, handle: RepositoryHandle) {
        if let Some(repo) = self.repository_mut(handle) {
            repo.stop();
        }
    }

    /// Removes a repository and re-syncs memory usage.
    pub fn delete_repository(&mut self, handle: RepositoryHandle) -> bool {
        let removed = self
            .session_mut(handle.session_id)
            .map(|s| s.delete_repository(handle.repository_id))
            .unwrap_or(false);
        if removed {
            self.update_physical_memory_usage();
        }
        removed
    }

    pub fn remove_session(&mut self, session_id: u32) -> bool {
        let Some(index) = self.sessions.iter().position(|s| s.id() == session_id) else {
            return false;
        };
        self.sessions.remove(index);
        self.update_physical_memory_usage();
        info!("Tracer session {} removed", session_id);
        true
    }

    pub fn clear_all_sessions(&mut self) {
        self.sessions.clear();
        self.update_physical_memory_usage();
    }

    /// Optimistic reservation; see [`MemoryBudget::consume`].
    pub fn consume_physical_memory(&mut self, bytes: u64) {
        self.budget.consume(bytes);
    }

    /// Recomputes usage from every live session's data sources.
    pub fn update_physical_memory_usage(&mut self) {
        let total = self.sessions.iter().map(Session::physical_memory_size).sum();
        self.budget.reconcile(total);
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.sessions.last()
    }

    pub fn active_session_mut(&mut self) -> Option<&mut Session> {
        self.sessions.last_mut()
    }

    /// Same as [`Self::active_session`]: the most recently created session.
    pub fn latest_session(&self) -> Option<&Session> {
        self.sessions.last()
    }

    pub fn oldest_session(&self) -> Option<&Session> {
        self.sessions.first()
    }

    pub fn session(&self, session_id: u32) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id() == session_id)
    }

    pub fn session_mut(&mut self, session_id: u32) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id() == session_id)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn repository(&self, handle: RepositoryHandle) -> Option<&Repository> {
        self.session(handle.session_id)?.repository(handle.repository_id)
    }

    pub fn repository_mut(&mut self, handle: RepositoryHandle) -> Option<&mut Repository> {
        self.session_mut(handle.session_id)?.repository_mut(handle.repository_id)
    }

    pub fn budget(&self) -> &MemoryBudget {
        &self.budget
    }

    pub fn total_physical_memory(&self) -> u64 {
        self.budget.total_bytes()
    }

    pub fn available_physical_memory(&self) -> u64 {
        self.budget.available_bytes()
    }

    pub fn used_ratio(&self) -> f32 {
        self.budget.used_ratio()
    }

    pub fn settings(&self) -> &TracerSettings {
        &self.settings
    }

    /// Sample window size new data sources should be created with.
    pub fn sample_window_size(&self) -> usize {
        self.settings.sample_window_size as usize
    }

    pub fn csv_output_dir(&self) -> &PathBuf {
        &self.settings.csv_output_dir
    }

    pub fn summary(&self) -> TracerSummary {
        compute_summary(self)
    }
}
