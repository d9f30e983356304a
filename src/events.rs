/// One entry of an imported timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    /// Milliseconds from the start of the timeline.
    pub time_ms: u64,
    /// Index into the playable key range.
    pub key: u8,
    pub kind: NoteKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    On { velocity: u8 },
    Off,
}

impl NoteEvent {
    pub fn note_on(time_ms: u64, key: u8, velocity: u8) -> Self {
        Self {
            time_ms,
            key,
            kind: NoteKind::On { velocity },
        }
    }

    pub fn note_off(time_ms: u64, key: u8) -> Self {
        Self {
            time_ms,
            key,
            kind: NoteKind::Off,
        }
    }
}

/// Emitted by the scheduler for every consumed event, plus once when the
/// cursor runs off the end of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8 },
    Finished,
}

impl From<&NoteEvent> for Transition {
    fn from(event: &NoteEvent) -> Self {
        match event.kind {
            NoteKind::On { velocity } => Transition::NoteOn {
                key: event.key,
                velocity,
            },
            NoteKind::Off => Transition::NoteOff { key: event.key },
        }
    }
}
