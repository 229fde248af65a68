use std::{
    collections::HashMap,
    sync::{Arc, RwLock, Weak},
};

use log::warn;

use crate::types::SharedObjectId;

/// Maps shared object ids carried by edits to live objects
pub trait SharedObjectResolver<T>: Send + Sync {
    fn resolve(&self, id: SharedObjectId) -> Option<Arc<T>>;
}

/// Registry of shared objects referenced by edits. Holds weak references:
/// an object disappears from the table once its last owner drops it.
pub struct SharedObjectTable<T> {
    objects: RwLock<HashMap<SharedObjectId, Weak<T>>>,
}

impl<T> SharedObjectTable<T> {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Register an object under `id`, replacing any previous registration
    pub fn register(&self, id: SharedObjectId, object: &Arc<T>) {
        match self.objects.write() {
            Ok(mut objects) => {
                objects.insert(id, Arc::downgrade(object));
            }
            Err(_) => warn!("shared object table lock poisoned, {} not registered", id),
        }
    }

    pub fn unregister(&self, id: SharedObjectId) {
        if let Ok(mut objects) = self.objects.write() {
            objects.remove(&id);
        }
    }

    /// Drop entries whose objects no longer exist
    pub fn purge(&self) {
        if let Ok(mut objects) = self.objects.write() {
            objects.retain(|_, object| object.strong_count() > 0);
        }
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for SharedObjectTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync> SharedObjectResolver<T> for SharedObjectTable<T> {
    fn resolve(&self, id: SharedObjectId) -> Option<Arc<T>> {
        let objects = self.objects.read().ok()?;
        objects.get(&id).and_then(Weak::upgrade)
    }
}
