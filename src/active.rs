use std::collections::{BTreeMap, BTreeSet};

/// Keys currently held down, split by who is holding them.
///
/// Playback and manual input each own a layer, so releasing a key by hand
/// never cuts off a scheduled note's highlight and vice versa. The renderer
/// sees the union.
///
/// The manual layer counts presses per key: mouse, computer keyboard and a
/// hardware keyboard can hold the same key, and it stays lit until the last
/// of them lets go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveNotes {
    manual: BTreeMap<u8, u32>,
    scheduled: BTreeSet<u8>,
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: u8) -> bool {
        self.manual.contains_key(&key) || self.scheduled.contains(&key)
    }

    /// Every lit key in ascending order, without duplicates.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        let mut keys = self.scheduled.clone();
        keys.extend(self.manual.keys().copied());
        keys.into_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.manual.is_empty() && self.scheduled.is_empty()
    }

    /// Returns `true` if the key was not already held by hand.
    pub fn press(&mut self, key: u8) -> bool {
        let holders = self.manual.entry(key).or_insert(0);
        *holders += 1;
        *holders == 1
    }

    /// Returns `true` when the last hand holding `key` lets go.
    pub fn release(&mut self, key: u8) -> bool {
        let Some(holders) = self.manual.get_mut(&key) else {
            return false;
        };
        *holders -= 1;
        if *holders == 0 {
            self.manual.remove(&key);
            true
        } else {
            false
        }
    }

    pub fn note_on(&mut self, key: u8) {
        self.scheduled.insert(key);
    }

    pub fn note_off(&mut self, key: u8) {
        self.scheduled.remove(&key);
    }

    pub fn clear_scheduled(&mut self) {
        self.scheduled.clear();
    }
}
