//! Recording engine.
//!
//! Ownership runs strictly downward: the [`manager::SessionManager`] owns
//! sessions, a session owns its repositories, a repository owns its data
//! sources and CSV sink. Upward links (repository to session, callers to
//! repositories) are plain ids resolved on use.
//!
//! Everything here runs synchronously on the host's tick.

pub mod budget;
pub mod csv;
pub mod manager;
pub mod repository;
pub mod ring_buffer;
pub mod session;
pub mod source;
pub mod stats;

pub use budget::MemoryBudget;
pub use csv::CsvSink;
pub use manager::SessionManager;
pub use repository::{DataGroup, Repository, RepositoryState, DEFAULT_GROUP};
pub use ring_buffer::{RingBuffer, Sample};
pub use session::{RepositoryHandle, Session, SessionState};
pub use source::DataSource;
pub use stats::{compute_summary, TracerSummary};
