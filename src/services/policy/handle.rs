//! Shared reference to the current policy snapshot.
//!
//! Readers clone the inner `Arc` and decide against that snapshot for the whole request.
//! Reload replaces the `Arc` wholesale; a store is never modified in place.

use std::sync::{Arc, RwLock};

use super::store::PolicyStore;

#[derive(Debug, Clone)]
pub struct PolicyHandle {
    current: Arc<RwLock<Arc<PolicyStore>>>,
}

impl PolicyHandle {
    pub fn new(store: PolicyStore) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(store))),
        }
    }

    pub fn snapshot(&self) -> Arc<PolicyStore> {
        // The lock only guards an Arc swap, so a poisoned lock still holds a valid store.
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Swap in a fully built store. Returns the previous snapshot.
    pub fn replace(&self, store: PolicyStore) -> Arc<PolicyStore> {
        let next = Arc::new(store);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}
