//!
//! Handle Registry
//!
//! Maps opaque integer handles to native resources so scripts can refer to
//! connections, statements or buffers without ever seeing a pointer.
//!
//! - Handles start at 1 and increase by one per allocation; a released handle
//!   is never handed out again.
//! - Every operation takes the table lock for the map access only. Resources
//!   are stored behind `Arc`, so `lookup` hands out a clone and the caller
//!   works on the resource after the lock is gone.
//! - `release` removes the entry first; the resource is destroyed when the
//!   last clone drops, so a lookup racing a release never sees a freed value.
//!
//! Registries are meant to live in statics, one per resource kind:
//!
//! ```ignore
//! static FILES: LazyLock<HandleRegistry<File>> = LazyLock::new(HandleRegistry::new);
//! ```
//!

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Opaque handle returned to scripts; valid handles are always positive
pub type Handle = i64;

struct Table<T> {
    entries: HashMap<Handle, Arc<T>>,
    next_id: Handle,
}

pub struct HandleRegistry<T> {
    table: Mutex<Table<T>>,
}

impl<T> HandleRegistry<T> {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                entries: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Store `resource` and return its new handle
    pub fn allocate(&self, resource: T) -> Handle {
        self.allocate_shared(resource).0
    }

    /// Like `allocate`, also returning a reference taken under the same lock,
    /// so the caller can use the resource even if the handle is released
    /// concurrently.
    pub fn allocate_shared(&self, resource: T) -> (Handle, Arc<T>) {
        let resource = Arc::new(resource);
        let mut table = self.table();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.insert(id, Arc::clone(&resource));
        (id, resource)
    }

    pub fn lookup(&self, handle: Handle) -> Option<Arc<T>> {
        self.table().entries.get(&handle).cloned()
    }

    /// Remove the entry for `handle`.
    ///
    /// Dropping the returned value destroys the resource unless a concurrent
    /// lookup still holds it, in which case that holder drops it last.
    pub fn release(&self, handle: Handle) -> Option<Arc<T>> {
        self.table().entries.remove(&handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.table().entries.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.table().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().entries.is_empty()
    }

    // Map mutations cannot panic halfway, so a poisoned table is still consistent.
    fn table(&self) -> MutexGuard<'_, Table<T>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
