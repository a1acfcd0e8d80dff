//! A bounded recording episode owning one repository per traced entity.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TraceError;
use crate::field::{EntityResolver, TracedEntity};
use crate::recorder::repository::Repository;
use crate::time::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Tracing,
    Paused,
    Stopped,
    Complete,
}

/// Weak handle to a repository: resolving it fails quietly once the
/// repository or its session is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryHandle {
    pub session_id: u32,
    pub repository_id: u32,
}

/// `Session-DDMMYYYY-HHMMSSmmm`, the per-session CSV directory.
pub fn csv_directory_name(start: DateTime<Utc>) -> String {
    start.format("Session-%d%m%Y-%H%M%S%3f").to_string()
}

#[derive(Debug)]
pub struct Session {
    id: u32,
    alias: String,
    sample_frequency: u32,
    state: SessionState,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    tick: Tick,
    elapsed_time: f32,
    repositories: BTreeMap<u32, Repository>,
    csv_root: PathBuf,
}

impl Session {
    pub fn new(id: u32, sample_frequency: u32, csv_root: impl Into<PathBuf>) -> Self {
        Self {
            id,
            alias: format!("Session #{}", id),
            sample_frequency: sample_frequency.max(1),
            state: SessionState::Tracing,
            start_time: Utc::now(),
            end_time: None,
            tick: Tick::new(),
            elapsed_time: 0.0,
            repositories: BTreeMap::new(),
            csv_root: csv_root.into(),
        }
    }

    /// Returns the repository already tracing `entity`, or registers a new one.
    /// Stopped sessions accept no new repositories.
    pub fn create_repository(
        &mut self,
        name: &str,
        description: &str,
        entity: &Arc<TracedEntity>,
        stream_to_csv: bool,
        autostart: bool,
    ) -> Result<RepositoryHandle, TraceError> {
        if !self.is_active() {
            warn!("Unable to create tracer for '{}'. Current session is inactive.", entity.name());
            return Err(TraceError::SessionNotActive { id: self.id });
        }
        let session_id = self.id;
        self.repositories.entry(entity.id()).or_insert_with(|| {
            debug!("Session {} created repository '{}' for entity {}", session_id, name, entity.id());
            Repository::new(name, description, entity, session_id, stream_to_csv, autostart)
        });
        Ok(RepositoryHandle {
            session_id,
            repository_id: entity.id(),
        })
    }

    /// Removes and drops a repository. Only reachable through the manager,
    /// which re-syncs the budget afterwards.
    pub(crate) fn delete_repository(&mut self, repository_id: u32) -> bool {
        self.repositories.remove(&repository_id).is_some()
    }

    /// Stamps the start time and starts every autostart repository.
    pub fn start(&mut self) {
        if self.state >= SessionState::Stopped {
            return;
        }
        self.start_time = Utc::now();
        let start = self.start_time;
        let root = self.csv_root.clone();
        for repo in self.repositories.values_mut().filter(|r| r.autostart()) {
            repo.start(start, &root);
        }
    }

    /// Starts a single repository against this session's start time.
    pub fn start_repository(&mut self, repository_id: u32) -> bool {
        if !self.is_active() {
            return false;
        }
        let start = self.start_time;
        match self.repositories.get_mut(&repository_id) {
            Some(repo) => {
                repo.start(start, &self.csv_root);
                true
            }
            None => false,
        }
    }

    pub fn pause(&mut self) {
        if self.state >= SessionState::Paused {
            return;
        }
        self.state = SessionState::Paused;
        for repo in self.repositories.values_mut() {
            repo.pause();
        }
    }

    pub fn resume(&mut self) {
        if self.state != SessionState::Paused {
            return;
        }
        self.state = SessionState::Tracing;
        for repo in self.repositories.values_mut() {
            repo.resume();
        }
    }

    /// Advances session time by one tick. Repositories are only updated on
    /// frames matching the sample frequency, unless `force_update` is set.
    pub fn update(&mut self, delta_seconds: f32, force_update: bool) {
        self.elapsed_time += delta_seconds;

        if force_update || self.tick.is_sample_frame(self.sample_frequency) {
            let (frame, elapsed, state) = (self.tick.frame, self.elapsed_time, self.state);
            for repo in self.repositories.values_mut() {
                repo.update(frame, elapsed, force_update, state);
            }
        }

        self.tick = self.tick.next();
    }

    pub fn stop(&mut self) {
        if self.state >= SessionState::Stopped {
            return;
        }
        self.end_time = Some(Utc::now());
        for repo in self.repositories.values_mut() {
            repo.stop();
        }
        self.state = SessionState::Stopped;
    }

    /// Stops, then completes every repository, re-linking entities through
    /// `resolver` when one is given.
    pub fn end(&mut self, resolver: Option<&dyn EntityResolver>) {
        if self.state == SessionState::Complete {
            return;
        }
        self.stop();
        for repo in self.repositories.values_mut() {
            repo.complete(resolver);
        }
        self.state = SessionState::Complete;
    }

    pub fn physical_memory_size(&self) -> u64 {
        self.repositories.values().map(Repository::physical_memory_size).sum()
    }

    pub fn repository(&self, repository_id: u32) -> Option<&Repository> {
        self.repositories.get(&repository_id)
    }

    pub fn repository_mut(&mut self, repository_id: u32) -> Option<&mut Repository> {
        self.repositories.get_mut(&repository_id)
    }

    pub fn repositories(&self) -> impl Iterator<Item = &Repository> + '_ {
        self.repositories.values()
    }

    pub fn repository_count(&self) -> usize {
        self.repositories.len()
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = alias.into();
    }

    pub fn sample_frequency(&self) -> u32 {
        self.sample_frequency
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Accepts new repositories and recording while not yet stopped.
    pub fn is_active(&self) -> bool {
        self.state < SessionState::Stopped
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn frame(&self) -> u64 {
        self.tick.frame
    }

    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    pub fn csv_root(&self) -> &Path {
        &self.csv_root
    }

    pub fn csv_directory_name(&self) -> String {
        csv_directory_name(self.start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_csv_directory_name_format() {
        let start = Utc.with_ymd_and_hms(2018, 3, 7, 9, 5, 4).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(csv_directory_name(start), "Session-07032018-090504042");
    }

    #[test]
    fn test_default_alias() {
        let session = Session::new(3, 1, "/tmp");
        assert_eq!(session.alias(), "Session #3");
        assert!(session.is_active());
    }
}
