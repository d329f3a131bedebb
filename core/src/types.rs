//! Shared primitive types used across the entire simulation.

/// Fractional game-day counter. One whole game day = one in-game month.
pub type GameDay = f64;

/// A whole game day, as stamped on ledger rows and schedule cursors.
pub type Day = i64;

/// Row identifier for every stored entity.
pub type EntityId = i64;

/// The user that owns a set of save slots.
pub type OwnerId = i64;

/// A save slot number, unique per owner.
pub type SlotId = i64;

/// Addresses one account ("bank state"): every core operation is scoped by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub owner_id: OwnerId,
    pub slot_id: SlotId,
}

impl SlotKey {
    pub fn new(owner_id: OwnerId, slot_id: SlotId) -> Self {
        Self { owner_id, slot_id }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.slot_id)
    }
}

/// Whole day containing a fractional game day.
pub fn whole_day(day: GameDay) -> Day {
    day.floor() as Day
}
