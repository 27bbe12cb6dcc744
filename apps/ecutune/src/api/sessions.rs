//! Bounded session map.
//!
//! Sessions are ordered by their last upload. Loading a file into a new
//! session while the store is full drops the session whose file was loaded
//! longest ago.

use std::collections::BTreeMap;

use ecutune_core::{LoadedFile, Session};

#[derive(Debug)]
struct Entry {
    session: Session,
    loaded_at: u64,
}

/// Sessions keyed by id, capped at a fixed capacity.
#[derive(Debug)]
pub struct SessionStore {
    entries: BTreeMap<String, Entry>,
    /// Load tick -> session id, oldest first.
    by_age: BTreeMap<u64, String>,
    clock: u64,
    capacity: usize,
}

impl SessionStore {
    /// Empty store. A capacity of 0 is treated as 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            by_age: BTreeMap::new(),
            clock: 0,
            capacity: capacity.max(1),
        }
    }

    /// Look up a session.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.entries.get(id).map(|entry| &entry.session)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a file into session `id`, creating the session if needed.
    ///
    /// Returns the loaded file and the id of the session evicted to make
    /// room, if any.
    pub fn load(
        &mut self,
        id: &str,
        bytes: &[u8],
        name: impl Into<String>,
    ) -> (&LoadedFile, Option<String>) {
        self.clock = self.clock.saturating_add(1);

        let evicted = match self.entries.get(id) {
            Some(entry) => {
                self.by_age.remove(&entry.loaded_at);
                None
            }
            None if self.entries.len() >= self.capacity => self.evict_oldest(),
            None => None,
        };

        self.by_age.insert(self.clock, id.to_string());
        let entry = self.entries.entry(id.to_string()).or_insert_with(|| Entry {
            session: Session::new(),
            loaded_at: 0,
        });
        entry.loaded_at = self.clock;
        (entry.session.load(bytes, name), evicted)
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, id) = self.by_age.pop_first()?;
        self.entries.remove(&id);
        Some(id)
    }
}
