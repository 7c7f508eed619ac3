use chrono::Utc;

use crate::{error::StoreError, state::ControlState};

/// Holder of the singleton [`ControlState`].
///
/// Every mutation is a full read-modify-write: `get`, change fields in memory,
/// `put` the whole record back. Implementations do not coordinate concurrent
/// cycles; callers that share a store across tasks must hold their own lock
/// around the complete cycle.
pub trait StateStore {
    /// Current record. Creates and persists a default one on first access.
    fn get(&mut self) -> Result<ControlState, StoreError>;

    /// Overwrites the record.
    fn put(&mut self, state: &ControlState) -> Result<(), StoreError>;
}

/// Volatile store, used by tests and by tooling that needs no persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Option<ControlState>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ControlState) -> Self {
        Self {
            state: Some(state),
            writes: 0,
        }
    }

    /// Number of `put` calls, including the lazy first-access write.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl StateStore for MemoryStore {
    fn get(&mut self) -> Result<ControlState, StoreError> {
        if let Some(state) = &self.state {
            return Ok(state.clone());
        }
        let state = ControlState::new(Utc::now());
        self.put(&state)?;
        Ok(state)
    }

    fn put(&mut self, state: &ControlState) -> Result<(), StoreError> {
        self.state = Some(state.clone());
        self.writes += 1;
        Ok(())
    }
}
