//! Read-only statistics for inspection collaborators.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::recorder::manager::SessionManager;
use crate::recorder::repository::{Repository, RepositoryState};
use crate::recorder::session::{Session, SessionState};
use crate::value::ValueType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TracerSummary {
    pub memory: MemoryStats,
    pub sessions: Vec<SessionStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub limit_bytes: u64,
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub id: u32,
    pub alias: String,
    pub state: SessionState,
    pub sample_frequency: u32,
    pub frame: u64,
    pub elapsed_time: f32,
    pub physical_memory_bytes: u64,
    pub repositories: Vec<RepositoryStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub id: u32,
    pub name: String,
    pub state: RepositoryState,
    pub has_traced_entity: bool,
    pub physical_memory_bytes: u64,
    pub csv_path: Option<PathBuf>,
    pub sources: Vec<SourceStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    pub group: String,
    pub name: String,
    pub value_type: ValueType,
    pub sample_count: usize,
    pub window_size: usize,
    pub observing: bool,
    /// Per-channel (min, max) over the retained window.
    pub range: Option<Vec<(f32, f32)>>,
}

pub fn compute_summary(manager: &SessionManager) -> TracerSummary {
    let budget = manager.budget();
    TracerSummary {
        memory: MemoryStats {
            limit_bytes: budget.limit_bytes(),
            total_bytes: budget.total_bytes(),
            available_bytes: budget.available_bytes(),
            used_ratio: budget.used_ratio(),
        },
        sessions: manager.sessions().iter().map(session_stats).collect(),
    }
}

pub fn session_stats(session: &Session) -> SessionStats {
    SessionStats {
        id: session.id(),
        alias: session.alias().to_string(),
        state: session.state(),
        sample_frequency: session.sample_frequency(),
        frame: session.frame(),
        elapsed_time: session.elapsed_time(),
        physical_memory_bytes: session.physical_memory_size(),
        repositories: session.repositories().map(repository_stats).collect(),
    }
}

pub fn repository_stats(repo: &Repository) -> RepositoryStats {
    RepositoryStats {
        id: repo.id(),
        name: repo.name().to_string(),
        state: repo.state(),
        has_traced_entity: repo.has_traced_entity(),
        physical_memory_bytes: repo.physical_memory_size(),
        csv_path: repo.csv_path().map(|p| p.to_path_buf()),
        sources: repo
            .sources()
            .map(|s| SourceStats {
                group: s.group().to_string(),
                name: s.name().to_string(),
                value_type: s.value_type(),
                sample_count: s.sample_count(),
                window_size: s.window_size(),
                observing: s.is_observing(),
                range: s.value_range(),
            })
            .collect(),
    }
}
