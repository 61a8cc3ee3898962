use serde::{Serialize, Serializer, ser::SerializeMap};

pub const SLOTS_PER_DAY: usize = 24;

/// Power state of one hourly slot.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    /// Power is on for the whole hour.
    #[default]
    Yes,
    /// Power is off for the whole hour.
    No,
    /// Power is off during the first half-hour only.
    First,
    /// Power is off during the second half-hour only.
    Second,
}

impl SlotState {
    /// State of a slot given which of its halves an outage covers.
    /// Returns `None` when neither half is covered.
    pub(crate) fn from_halves(first: bool, second: bool) -> Option<Self> {
        match (first, second) {
            (true, true) => Some(SlotState::No),
            (true, false) => Some(SlotState::First),
            (false, true) => Some(SlotState::Second),
            (false, false) => None,
        }
    }
}

/// The 24 slots of a feeder for one day. Slot `N` (1-based) covers
/// `[N-1:00, N:00)` local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotRow([SlotState; SLOTS_PER_DAY]);

impl SlotRow {
    /// Returns the state of the 1-based `slot`, or `None` outside `1..=24`.
    pub fn get(&self, slot: usize) -> Option<SlotState> {
        slot.checked_sub(1).and_then(|i| self.0.get(i)).copied()
    }

    pub fn states(&self) -> &[SlotState; SLOTS_PER_DAY] {
        &self.0
    }

    pub(crate) fn set_index(&mut self, index: usize, state: SlotState) {
        self.0[index] = state;
    }

    pub fn is_all_yes(&self) -> bool {
        self.0.iter().all(|state| *state == SlotState::Yes)
    }
}

// Serialized as { "1": .., "2": .., .., "24": .. }
impl Serialize for SlotRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SLOTS_PER_DAY))?;
        for (index, state) in self.0.iter().enumerate() {
            map.serialize_entry(&(index + 1).to_string(), state)?;
        }
        map.end()
    }
}
