use std::collections::HashMap;

use crate::AudioSession;

/// A single-field change applied after a successful backend command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionField {
    Volume(u8),
    Muted(bool),
}

/// Current snapshot of sessions keyed by id, in backend order.
///
/// Owned by exactly one driver and only touched from its task, so there is
/// no locking here. Poll results replace the whole snapshot; commands patch
/// one field of one record.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Vec<AudioSession>,
    index: HashMap<String, usize>,
    generation: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every record with the output of poll `generation`.
    ///
    /// Returns false, leaving the store untouched, when a newer poll has
    /// already been applied. Duplicate ids keep their first position and the
    /// last record seen.
    pub fn replace(&mut self, generation: u64, records: Vec<AudioSession>) -> bool {
        if generation < self.generation {
            return false;
        }

        let mut sessions: Vec<AudioSession> = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        for record in records {
            match index.get(&record.id) {
                Some(&pos) => sessions[pos] = record,
                None => {
                    index.insert(record.id.clone(), sessions.len());
                    sessions.push(record);
                }
            }
        }

        self.sessions = sessions;
        self.index = index;
        self.generation = generation;
        true
    }

    /// Patch one record in place. Returns false when no record has this id.
    pub fn apply_mutation(&mut self, session_id: &str, field: SessionField) -> bool {
        let Some(&pos) = self.index.get(session_id) else {
            return false;
        };

        let session = &mut self.sessions[pos];
        match field {
            SessionField::Volume(volume) => session.volume = volume.min(100),
            SessionField::Muted(muted) => session.is_muted = muted,
        }
        true
    }

    pub fn get(&self, session_id: &str) -> Option<&AudioSession> {
        self.index.get(session_id).map(|&pos| &self.sessions[pos])
    }

    pub fn snapshot(&self) -> Vec<AudioSession> {
        self.sessions.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
        self.index.clear();
    }
}
