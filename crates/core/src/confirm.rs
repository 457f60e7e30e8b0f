use std::collections::HashMap;

use crate::types::RecordId;

/// Result of pressing the delete button on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// The row entered its confirm window; the generation identifies this arming.
    Armed(u64),
    /// The press landed inside the confirm window: the caller must delete the row.
    Confirmed,
    /// A delete for the row is already in flight.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Confirming(u64),
    Deleting,
}

/// Per-row delete confirmation state.
///
/// Timing lives with the caller: it arms a timer on [`PressOutcome::Armed`]
/// and calls [`ConfirmBoard::expire`] with the same generation when it fires.
#[derive(Debug, Default)]
pub struct ConfirmBoard {
    rows: HashMap<RecordId, RowState>,
    next_generation: u64,
}

impl ConfirmBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, id: RecordId) -> PressOutcome {
        match self.rows.get(&id) {
            None => {
                self.next_generation += 1;
                let generation = self.next_generation;
                self.rows.insert(id, RowState::Confirming(generation));
                PressOutcome::Armed(generation)
            }
            Some(RowState::Confirming(_)) => {
                self.rows.insert(id, RowState::Deleting);
                PressOutcome::Confirmed
            }
            Some(RowState::Deleting) => PressOutcome::Ignored,
        }
    }

    /// Reverts an armed row when its window elapses.
    ///
    /// Returns `false` when the row was confirmed or re-armed in the meantime.
    pub fn expire(&mut self, id: RecordId, generation: u64) -> bool {
        if self.rows.get(&id) == Some(&RowState::Confirming(generation)) {
            self.rows.remove(&id);
            true
        } else {
            false
        }
    }

    /// Clears a row after its delete request settled, successfully or not.
    pub fn finish(&mut self, id: RecordId) {
        if self.rows.get(&id) == Some(&RowState::Deleting) {
            self.rows.remove(&id);
        }
    }

    pub fn state(&self, id: RecordId) -> Option<RowState> {
        self.rows.get(&id).copied()
    }

    pub fn is_confirming(&self, id: RecordId) -> bool {
        matches!(self.rows.get(&id), Some(RowState::Confirming(_)))
    }

    pub fn rows(&self) -> impl Iterator<Item = (RecordId, RowState)> + '_ {
        self.rows.iter().map(|(id, state)| (*id, *state))
    }
}
