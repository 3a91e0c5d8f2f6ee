//! Per-slot upgrade records and pending respawns
//!
//! An agent slot keeps its upgrades across deaths. The roster holds a slot's
//! record while the slot is empty; a live agent holds its own copy and hands it
//! back on death.

use serde::{Deserialize, Serialize};

use crate::game::constants::{agent, upgrades};
use crate::game::state::UpgradeKind;

/// Upgrades earned by whoever occupies a slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotRecord {
    /// Seconds shaved off every weapon cooldown
    pub fire_rate_bonus: f32,
    pub health_pickups: u32,
}

impl SlotRecord {
    pub fn apply(&mut self, kind: UpgradeKind) {
        match kind {
            UpgradeKind::FireRate => self.fire_rate_bonus += upgrades::FIRE_RATE_STEP,
            UpgradeKind::Health => self.health_pickups += 1,
        }
    }

    /// Health after collecting a health pickup
    pub fn restored_health(current: f32) -> f32 {
        (current + upgrades::HEALTH_RESTORE).min(agent::MAX_HEALTH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingRespawn {
    slot: usize,
    at: f32,
}

/// Slot records and the respawn queue
#[derive(Debug, Clone, Default)]
pub struct RespawnRoster {
    records: Vec<SlotRecord>,
    pending: Vec<PendingRespawn>,
}

impl RespawnRoster {
    pub fn new(slots: usize) -> Self {
        Self {
            records: vec![SlotRecord::default(); slots],
            pending: Vec::new(),
        }
    }

    pub fn slots(&self) -> usize {
        self.records.len()
    }

    /// Record handed to the next occupant of `slot`
    pub fn record(&self, slot: usize) -> SlotRecord {
        self.records.get(slot).copied().unwrap_or_default()
    }

    /// Store the record a dying agent hands back
    pub fn store(&mut self, slot: usize, record: SlotRecord) {
        if slot >= self.records.len() {
            self.records.resize(slot + 1, SlotRecord::default());
        }
        self.records[slot] = record;
    }

    pub fn schedule(&mut self, slot: usize, at: f32) {
        if !self.is_pending(slot) {
            self.pending.push(PendingRespawn { slot, at });
        }
    }

    pub fn is_pending(&self, slot: usize) -> bool {
        self.pending.iter().any(|p| p.slot == slot)
    }

    /// Slots whose respawn time has come, in scheduling order
    pub fn take_due(&mut self, now: f32) -> Vec<usize> {
        let mut due = Vec::new();
        self.pending.retain(|p| {
            if p.at <= now {
                due.push(p.slot);
                false
            } else {
                true
            }
        });
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_survives_respawn() {
        let mut roster = RespawnRoster::new(3);
        let mut record = roster.record(1);
        record.apply(UpgradeKind::FireRate);
        record.apply(UpgradeKind::FireRate);
        record.apply(UpgradeKind::Health);
        roster.store(1, record);

        let next_life = roster.record(1);
        assert!((next_life.fire_rate_bonus - 0.2).abs() < 1e-5);
        assert_eq!(next_life.health_pickups, 1);
        assert_eq!(roster.record(0), SlotRecord::default());
    }

    #[test]
    fn test_unknown_slot_gets_fresh_record() {
        let mut roster = RespawnRoster::new(1);
        assert_eq!(roster.record(9), SlotRecord::default());
        roster.store(4, SlotRecord { fire_rate_bonus: 0.1, health_pickups: 0 });
        assert_eq!(roster.slots(), 5);
    }

    #[test]
    fn test_respawn_queue() {
        let mut roster = RespawnRoster::new(3);
        roster.schedule(2, 5.0);
        roster.schedule(0, 3.0);
        roster.schedule(2, 9.0);

        assert!(roster.take_due(2.0).is_empty());
        assert_eq!(roster.take_due(5.0), vec![2, 0]);
        assert!(!roster.is_pending(2));
    }

    #[test]
    fn test_health_restore_capped() {
        assert_eq!(SlotRecord::restored_health(10.0), 30.0);
        assert_eq!(SlotRecord::restored_health(45.0), agent::MAX_HEALTH);
    }
}
