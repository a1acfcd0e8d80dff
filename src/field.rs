//! Observation handles.
//!
//! The host owns every field and entity it wants traced. The engine only ever
//! holds weak references and checks them before each read, so a host object
//! disappearing mid-session is an ordinary, recoverable event.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::value::Traceable;

/// A host-owned field value the engine can observe.
#[derive(Debug, Default)]
pub struct TracedField<T> {
    cell: Arc<RwLock<T>>,
}

impl<T> Clone for TracedField<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Traceable> TracedField<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Arc::new(RwLock::new(value)),
        }
    }

    pub fn get(&self) -> T {
        match self.cell.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set(&self, value: T) {
        match self.cell.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    pub fn downgrade(&self) -> FieldRef<T> {
        FieldRef {
            cell: Arc::downgrade(&self.cell),
        }
    }

    pub fn id(&self) -> FieldId {
        FieldId(Arc::as_ptr(&self.cell) as *const () as usize)
    }
}

/// Identity of an observed field: the address of its storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

/// Weak observation of a [`TracedField`].
#[derive(Debug)]
pub struct FieldRef<T> {
    cell: Weak<RwLock<T>>,
}

impl<T> Clone for FieldRef<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Weak::clone(&self.cell),
        }
    }
}

impl<T: Traceable> FieldRef<T> {
    /// Current value, or `None` once the host dropped the field.
    pub fn read(&self) -> Option<T> {
        let cell = self.cell.upgrade()?;
        let value = match cell.read() {
            Ok(guard) => *guard,
            Err(_) => return None,
        };
        Some(value)
    }

    pub fn is_valid(&self) -> bool {
        self.cell.strong_count() > 0
    }

    /// Stays stable after the field is dropped, as long as this reference lives.
    pub fn id(&self) -> FieldId {
        FieldId(self.cell.as_ptr() as *const () as usize)
    }
}

static NEXT_ENTITY_ID: AtomicU32 = AtomicU32::new(1);

/// A host object whose fields are traced. One repository per entity per session.
#[derive(Debug)]
pub struct TracedEntity {
    id: u32,
    name: String,
    destroyed: AtomicBool,
}

impl TracedEntity {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_id(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed), name)
    }

    /// Hosts with their own object ids can keep them.
    pub fn with_id(id: u32, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Marks the entity as pending destruction. Repositories tracing it stop on
    /// their next update even if the host still holds the `Arc`.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        !self.destroyed.load(Ordering::Acquire)
    }
}

/// Weak observation of a [`TracedEntity`].
#[derive(Debug, Clone)]
pub struct EntityRef {
    entity: Weak<TracedEntity>,
}

impl EntityRef {
    pub fn new(entity: &Arc<TracedEntity>) -> Self {
        Self {
            entity: Arc::downgrade(entity),
        }
    }

    pub fn detached() -> Self {
        Self { entity: Weak::new() }
    }

    pub fn upgrade(&self) -> Option<Arc<TracedEntity>> {
        self.entity.upgrade().filter(|e| e.is_alive())
    }

    pub fn is_valid(&self) -> bool {
        self.upgrade().is_some()
    }
}

/// Looks up an entity by name in a second object graph.
///
/// Used once a session ends to re-link repositories to the source-world copy of
/// the entity they traced. Matching is by name only; a miss leaves the
/// repository detached.
pub trait EntityResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<TracedEntity>>;
}

impl<F> EntityResolver for F
where
    F: Fn(&str) -> Option<Arc<TracedEntity>> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Option<Arc<TracedEntity>> {
        self(name)
    }
}

impl fmt::Debug for dyn EntityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EntityResolver")
    }
}
