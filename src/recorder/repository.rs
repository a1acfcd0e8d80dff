//! All data sources tracing one entity within one session.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::TraceError;
use crate::field::{EntityRef, EntityResolver, TracedEntity};
use crate::recorder::budget::MemoryBudget;
use crate::recorder::csv::CsvSink;
use crate::recorder::session::{csv_directory_name, SessionState};
use crate::recorder::source::DataSource;
use crate::value::Color;

pub const DEFAULT_GROUP: &str = "Default";

const COLOR_HUE_STEP: f32 = 33.33;
const COLOR_HUE_JITTER: f32 = 16.67;

/// `Paused` and `Tracing` flip back and forth; every other transition only
/// moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RepositoryState {
    Initialized,
    Tracing,
    Paused,
    Stopped,
    Complete,
}

/// Named, ordered collection of data sources.
#[derive(Debug, Clone)]
pub struct DataGroup {
    pub name: String,
    pub sources: Vec<DataSource>,
}

#[derive(Debug)]
pub struct Repository {
    id: u32,
    name: String,
    description: String,
    entity: EntityRef,
    entity_name: String,
    session_id: u32,
    groups: Vec<DataGroup>,
    state: RepositoryState,
    stream_to_csv: bool,
    autostart: bool,
    csv: Option<CsvSink>,
    next_color_hue: f32,
}

impl Repository {
    pub(crate) fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        entity: &Arc<TracedEntity>,
        session_id: u32,
        stream_to_csv: bool,
        autostart: bool,
    ) -> Self {
        Self {
            id: entity.id(),
            name: name.into(),
            description: description.into(),
            entity: EntityRef::new(entity),
            entity_name: entity.name().to_string(),
            session_id,
            groups: Vec::new(),
            state: RepositoryState::Initialized,
            stream_to_csv,
            autostart,
            csv: None,
            next_color_hue: 0.0,
        }
    }

    /// Registers a data source.
    ///
    /// Rejected with a warning when the repository already started, when the
    /// field is already observed, when its group already holds a source of the
    /// same name, or when the budget cannot fit its window. Accepted sources
    /// reserve their full window size against `budget`.
    pub fn add_data_source(&mut self, mut source: DataSource, budget: &mut MemoryBudget) -> Result<(), TraceError> {
        if self.state > RepositoryState::Initialized {
            warn!("Tracer repository '{}' is already active, no more data sources can be added.", self.name);
            return Err(TraceError::RepositoryNotInitialized { state: self.state });
        }

        let field_id = source.field_id();
        if let Some(existing) = self.sources().find(|s| s.field_id() == field_id) {
            warn!(
                "Data sources '{}' and '{}' are tracing the same field. Ignoring duplicate data source.",
                existing.name(),
                source.name()
            );
            return Err(TraceError::DuplicateField {
                existing: existing.name().to_string(),
                rejected: source.name().to_string(),
            });
        }

        let group = normalize_group(&source);
        if self.find_source(&group, source.name()).is_some() {
            warn!("Data source '{}' already exists in group '{}'. Data source will be ignored.", source.name(), group);
            return Err(TraceError::DuplicateName {
                name: source.name().to_string(),
                group,
            });
        }

        let required = source.physical_memory_size();
        if !budget.can_fit(required) {
            warn!("Tracer reached its memory limit. '{}' will not be traced.", source.name());
            budget.consume(0);
            return Err(TraceError::MemoryBudgetExceeded {
                name: source.name().to_string(),
                required,
                available: budget.available_bytes(),
            });
        }
        budget.consume(required);

        if source.color().is_transparent() {
            source.set_color(self.next_default_color());
        }
        source.set_group(group.clone());

        match self.groups.iter_mut().find(|g| g.name == group) {
            Some(existing) => existing.sources.push(source),
            None => self.groups.push(DataGroup {
                name: group,
                sources: vec![source],
            }),
        }
        Ok(())
    }

    /// Starts tracing and, when streaming, opens the CSV file and writes its header.
    pub fn start(&mut self, session_start: DateTime<Utc>, csv_root: &Path) {
        if self.state != RepositoryState::Initialized {
            return;
        }
        self.state = RepositoryState::Tracing;

        if self.stream_to_csv && !self.groups.is_empty() {
            let mut sink = CsvSink::create(
                csv_root,
                &csv_directory_name(session_start),
                &format!("{}-{}", self.name, self.id),
            );
            self.write_header(&mut sink);
            self.csv = Some(sink);
        }
        debug!("Tracer repository '{}' ({}) started", self.name, self.id);
    }

    fn write_header(&self, sink: &mut CsvSink) {
        for source in self.sources().filter(|s| s.streams_to_csv()) {
            let column = header_name(source.name());
            for suffix in source.value_type().column_suffixes() {
                sink.push_field(&format!("{}{}", column, suffix));
            }
        }
        sink.end_row();
    }

    /// Samples every data source when tracing, or on any forced update. Stops
    /// the repository instead when the traced entity is gone.
    pub fn update(&mut self, frame: u64, elapsed_time: f32, force_update: bool, session_state: SessionState) {
        if self.state >= RepositoryState::Stopped {
            return;
        }

        if !self.entity.is_valid() {
            info!("Traced entity of repository '{}' is gone, stopping.", self.name);
            self.stop();
            return;
        }

        // Forced updates sample even before start; there is no CSV sink yet,
        // so only the ring buffers fill.
        let tracing = self.state == RepositoryState::Tracing && session_state == SessionState::Tracing;
        if !(force_update || tracing) {
            return;
        }

        let mut csv = if self.stream_to_csv { self.csv.as_mut() } else { None };
        for group in self.groups.iter_mut() {
            for source in group.sources.iter_mut() {
                source.sample(frame, elapsed_time, csv.as_deref_mut());
            }
        }
        if let Some(sink) = csv {
            sink.end_row();
        }
    }

    pub fn pause(&mut self) {
        if self.state != RepositoryState::Tracing {
            return;
        }
        self.state = RepositoryState::Paused;
    }

    pub fn resume(&mut self) {
        if self.state != RepositoryState::Paused {
            return;
        }
        self.state = RepositoryState::Tracing;
    }

    /// Final for recording; closes the CSV file if one is open.
    pub fn stop(&mut self) {
        if self.state >= RepositoryState::Stopped {
            return;
        }
        if let Some(sink) = self.csv.as_mut() {
            sink.close();
        }
        self.state = RepositoryState::Stopped;
    }

    /// Moves to `Complete` and tries to re-link the traced entity through
    /// `resolver` by name. Returns whether a re-link happened.
    ///
    /// The match is a heuristic: two entities sharing a name are
    /// indistinguishable, and a miss simply leaves the repository detached.
    pub fn complete(&mut self, resolver: Option<&dyn EntityResolver>) -> bool {
        if self.state == RepositoryState::Complete {
            return false;
        }
        self.stop();

        self.entity = EntityRef::detached();
        let relinked = match resolver.and_then(|r| r.resolve(&self.entity_name)) {
            Some(entity) => {
                self.entity = EntityRef::new(&entity);
                true
            }
            None => false,
        };

        self.state = RepositoryState::Complete;
        relinked
    }

    /// Forgets every recorded sample; registrations stay.
    pub fn clear(&mut self) {
        for group in self.groups.iter_mut() {
            for source in group.sources.iter_mut() {
                source.clear();
            }
        }
    }

    /// Hue-stepped label color for sources registered without one.
    pub fn next_default_color(&mut self) -> Color {
        // deterministic jitter so consecutive hues never collide
        let jitter = COLOR_HUE_JITTER * (((self.source_count() as f32) * 0.618_034) % 1.0);
        self.next_color_hue = (self.next_color_hue + COLOR_HUE_STEP + jitter) % 360.0;
        Color::from_hue(self.next_color_hue)
    }

    pub fn physical_memory_size(&self) -> u64 {
        self.sources().map(DataSource::physical_memory_size).sum()
    }

    pub fn sources(&self) -> impl Iterator<Item = &DataSource> + '_ {
        self.groups.iter().flat_map(|g| g.sources.iter())
    }

    pub fn find_source(&self, group: &str, name: &str) -> Option<&DataSource> {
        self.groups
            .iter()
            .find(|g| g.name == group)
            .and_then(|g| g.sources.iter().find(|s| s.name() == name))
    }

    pub fn source_count(&self) -> usize {
        self.groups.iter().map(|g| g.sources.len()).sum()
    }

    pub fn groups(&self) -> &[DataGroup] {
        &self.groups
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn state(&self) -> RepositoryState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state < RepositoryState::Stopped
    }

    pub fn has_traced_entity(&self) -> bool {
        self.entity.is_valid()
    }

    pub fn traced_entity(&self) -> Option<Arc<TracedEntity>> {
        self.entity.upgrade()
    }

    pub fn streams_to_csv(&self) -> bool {
        self.stream_to_csv
    }

    pub fn autostart(&self) -> bool {
        self.autostart
    }

    pub fn csv_path(&self) -> Option<&Path> {
        self.csv.as_ref().and_then(CsvSink::path)
    }
}

/// Blank groups map to [`DEFAULT_GROUP`]; composite values without a group
/// get a group of their own named after the source.
fn normalize_group(source: &DataSource) -> String {
    let group = source.group().trim();
    if !group.is_empty() {
        return group.to_string();
    }
    if source.value_type().is_composite() {
        source.name().to_string()
    } else {
        DEFAULT_GROUP.to_string()
    }
}

fn header_name(name: &str) -> String {
    name.replace('\t', " ").trim().replace(' ', "_")
}
