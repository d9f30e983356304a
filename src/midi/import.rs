use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::decode::{DecodedMessage, Message, decode};
use crate::error::{DecodeError, ImportError};
use crate::events::NoteEvent;
use crate::timing::{KeyRange, Timeline};

/// Reads a MIDI file from disk and builds a timeline for `range`.
pub fn import(path: &Path, range: &KeyRange) -> Result<Timeline, ImportError> {
    let bytes = fs::read(path).map_err(DecodeError::from)?;
    let timeline = import_bytes(&bytes, range)?;
    info!(
        path = %path.display(),
        events = timeline.len(),
        duration_ms = timeline.total_duration_ms(),
        "imported MIDI file"
    );
    Ok(timeline)
}

pub fn import_bytes(bytes: &[u8], range: &KeyRange) -> Result<Timeline, ImportError> {
    let messages = decode(bytes)?;
    let timeline = timeline_from_messages(&messages, range);
    if timeline.is_empty() {
        return Err(ImportError::NoPlayableNotes);
    }
    Ok(timeline)
}

/// Remaps decoded note messages onto `range`, dropping anything outside it.
///
/// Time is accumulated in seconds and truncated to whole milliseconds per
/// event, so rounding never drifts over a long file.
pub fn timeline_from_messages(messages: &[DecodedMessage], range: &KeyRange) -> Timeline {
    let mut now_secs = 0.0_f64;
    let mut events = Vec::new();
    let mut dropped = 0usize;

    for decoded in messages {
        now_secs += decoded.delta_secs;
        let time_ms = (now_secs * 1000.0) as u64;

        let (note, event) = match decoded.message {
            Message::NoteOn { note, velocity } => (note, Some(velocity)),
            Message::NoteOff { note } => (note, None),
            Message::Other => continue,
        };

        let Some(key) = range.key_for(note) else {
            dropped += 1;
            continue;
        };

        events.push(match event {
            Some(velocity) => NoteEvent::note_on(time_ms, key, velocity),
            None => NoteEvent::note_off(time_ms, key),
        });
    }

    if dropped > 0 {
        debug!(dropped, "dropped notes outside the key range");
    }

    Timeline::new(events)
}

/// Whether a dropped or picked file looks like a MIDI file.
pub fn is_midi_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
}
