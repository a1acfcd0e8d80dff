pub mod error;
pub mod field;
pub mod global;
pub mod lifecycle;
pub mod recorder;
pub mod settings;
pub mod time;
pub mod value;

pub use error::{ConfigError, TraceError};
pub use field::{EntityResolver, FieldRef, TracedEntity, TracedField};
pub use lifecycle::{handle_host_event, HostEvent};
pub use recorder::{DataSource, RepositoryHandle, SessionManager};
pub use settings::TracerSettings;
pub use value::{Color, Rotator, TraceValue, Transform, ValueType, Vec3};
