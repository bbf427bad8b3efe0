use std::{collections::HashMap, sync::Arc};

use crate::{
    Result,
    mutex::{RwLock, read, write},
};

/// A concurrent map from ID key to a shared, lazily created value.
///
/// Lookups take a shared lock. Creation re-checks under the exclusive lock,
/// so racing creators for the same key all receive the single value that was
/// inserted first. Neither lock is held once a method returns.
#[derive(Debug)]
pub(crate) struct Registry<V> {
    entries: RwLock<HashMap<String, Arc<V>>>,
}

impl<V> Registry<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<Arc<V>>> {
        Ok(read(&self.entries)?.get(key).cloned())
    }

    /// Returns the value for `key`, creating it with `make` if absent, and
    /// whether this call created it.
    pub(crate) fn get_or_insert_with(
        &self,
        key: &str,
        make: impl FnOnce() -> V,
    ) -> Result<(Arc<V>, bool)> {
        if let Some(value) = self.get(key)? {
            return Ok((value, false));
        }

        let mut entries = write(&self.entries)?;
        if let Some(value) = entries.get(key) {
            return Ok((Arc::clone(value), false));
        }
        let value = Arc::new(make());
        entries.insert(key.to_owned(), Arc::clone(&value));
        Ok((value, true))
    }

    pub(crate) fn len(&self) -> Result<usize> {
        Ok(read(&self.entries)?.len())
    }
}
