use crate::events::NoteEvent;

/// The contiguous block of MIDI notes the on-screen piano can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    base_note: u8,
    len: u8,
}

impl KeyRange {
    /// `octaves * 12` keys starting at `base_note`, cut short at MIDI note 127.
    pub fn new(base_note: u8, octaves: u8) -> Self {
        let base_note = base_note.min(127);
        let wanted = octaves as u16 * 12;
        let available = 128 - base_note as u16;
        Self {
            base_note,
            len: wanted.min(available) as u8,
        }
    }

    pub fn base_note(&self) -> u8 {
        self.base_note
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maps a MIDI note to a key index. Notes outside the range are not
    /// clamped, they simply have no key.
    pub fn key_for(&self, note: u8) -> Option<u8> {
        let key = note.checked_sub(self.base_note)?;
        (key < self.len).then_some(key)
    }

    pub fn note_for(&self, key: u8) -> Option<u8> {
        (key < self.len).then(|| self.base_note + key)
    }

    pub fn contains_key(&self, key: u8) -> bool {
        key < self.len
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::new(60, 2)
    }
}

/// A fully resolved, time-sorted sequence of note events.
///
/// Only ever replaced wholesale; there is no way to edit one in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    events: Vec<NoteEvent>,
    total_duration_ms: u64,
}

impl Timeline {
    /// Sorts `events` by time (stable, so ties keep their original order) and
    /// derives the total duration from the last one.
    pub fn new(mut events: Vec<NoteEvent>) -> Self {
        events.sort_by_key(|e| e.time_ms);
        let total_duration_ms = events.last().map_or(0, |e| e.time_ms);
        Self {
            events,
            total_duration_ms,
        }
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }
}
