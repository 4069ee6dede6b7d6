use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::error::SlotError;
use crate::{Fingerprint, Snapshot, SnapshotSource, SnapshotTarget};

pub const SLOT_RANGE: RangeInclusive<u8> = 1..=10;

/// Numbered in-memory save slots. Saving to an occupied slot replaces its snapshot.
#[derive(Debug, Default)]
pub struct SnapshotSlots {
    slots: BTreeMap<u8, Snapshot>,
}

impl SnapshotSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save<S: SnapshotSource + ?Sized>(
        &mut self,
        slot: u8,
        source: &S,
    ) -> Result<Fingerprint, SlotError> {
        check_slot(slot)?;
        let snapshot = Snapshot::capture(source)?;
        let fingerprint = snapshot.fingerprint()?;
        self.slots.insert(slot, snapshot);
        tracing::info!(slot, %fingerprint, "state saved");
        Ok(fingerprint)
    }

    /// Restores `slot` into `target`. An empty slot leaves `target` untouched.
    pub fn load<T: SnapshotTarget + ?Sized>(
        &self,
        slot: u8,
        target: &mut T,
    ) -> Result<Fingerprint, SlotError> {
        let snapshot = self.get(slot)?;
        let fingerprint = snapshot.fingerprint()?;
        snapshot.restore_into(target)?;
        tracing::info!(slot, %fingerprint, "state loaded");
        Ok(fingerprint)
    }

    pub fn get(&self, slot: u8) -> Result<&Snapshot, SlotError> {
        check_slot(slot)?;
        self.slots.get(&slot).ok_or(SlotError::NotFound { slot })
    }

    pub fn insert(&mut self, slot: u8, snapshot: Snapshot) -> Result<(), SlotError> {
        check_slot(slot)?;
        self.slots.insert(slot, snapshot);
        Ok(())
    }

    pub fn occupied(&self) -> impl Iterator<Item = u8> + '_ {
        self.slots.keys().copied()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

fn check_slot(slot: u8) -> Result<(), SlotError> {
    if SLOT_RANGE.contains(&slot) {
        Ok(())
    } else {
        Err(SlotError::OutOfRange { slot })
    }
}
