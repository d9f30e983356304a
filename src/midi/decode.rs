use midly::{Fps, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::error::DecodeError;

const DEFAULT_TEMPO_US: f64 = 500_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    Other,
}

/// A message from the merged stream, timed relative to the one before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedMessage {
    pub delta_secs: f64,
    pub message: Message,
}

struct RawEvent {
    abs_tick: u64,
    message: Message,
    tempo_us: Option<u32>,
}

/// Parses a standard MIDI file and flattens every track into one
/// chronological stream with deltas in seconds.
///
/// Tracks are merged by absolute tick with a stable sort, so simultaneous
/// messages keep track order and then in-track order. Set Tempo events are
/// applied in merged order.
pub fn decode(bytes: &[u8]) -> Result<Vec<DecodedMessage>, DecodeError> {
    let smf = Smf::parse(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let mut raw_events = Vec::new();
    for track in &smf.tracks {
        let mut abs_tick = 0u64;
        for event in track {
            abs_tick += event.delta.as_int() as u64;
            let (message, tempo_us) = match event.kind {
                TrackEventKind::Midi { message, .. } => (note_message(message), None),
                TrackEventKind::Meta(MetaMessage::Tempo(t)) => (Message::Other, Some(t.as_int())),
                _ => (Message::Other, None),
            };
            raw_events.push(RawEvent {
                abs_tick,
                message,
                tempo_us,
            });
        }
    }
    raw_events.sort_by_key(|e| e.abs_tick);

    let mut clock = TickClock::new(smf.header.timing);
    let mut last_tick = 0;
    let mut decoded = Vec::with_capacity(raw_events.len());
    for event in raw_events {
        let delta_secs = clock.seconds(event.abs_tick - last_tick);
        last_tick = event.abs_tick;
        if let Some(tempo_us) = event.tempo_us {
            clock.set_tempo(tempo_us);
        }
        decoded.push(DecodedMessage {
            delta_secs,
            message: event.message,
        });
    }

    Ok(decoded)
}

fn note_message(message: MidiMessage) -> Message {
    match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => Message::NoteOn {
            note: key.as_int(),
            velocity: vel.as_int(),
        },
        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => Message::NoteOff {
            note: key.as_int(),
        },
        _ => Message::Other,
    }
}

enum TickClock {
    Metrical { ticks_per_beat: f64, tempo_us: f64 },
    Timecode { ticks_per_second: f64 },
}

impl TickClock {
    fn new(timing: Timing) -> Self {
        match timing {
            Timing::Metrical(tpb) => TickClock::Metrical {
                ticks_per_beat: (tpb.as_int() as f64).max(1.0),
                tempo_us: DEFAULT_TEMPO_US,
            },
            Timing::Timecode(fps, subframes) => {
                let frames_per_second = match fps {
                    Fps::Fps24 => 24.0,
                    Fps::Fps25 => 25.0,
                    Fps::Fps29 => 29.97,
                    Fps::Fps30 => 30.0,
                };
                TickClock::Timecode {
                    ticks_per_second: (frames_per_second * subframes as f64).max(1.0),
                }
            }
        }
    }

    fn set_tempo(&mut self, us_per_beat: u32) {
        if let TickClock::Metrical { tempo_us, .. } = self {
            *tempo_us = us_per_beat as f64;
        }
    }

    fn seconds(&self, ticks: u64) -> f64 {
        match self {
            TickClock::Metrical {
                ticks_per_beat,
                tempo_us,
            } => ticks as f64 / ticks_per_beat * tempo_us / 1_000_000.0,
            TickClock::Timecode { ticks_per_second } => ticks as f64 / ticks_per_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use midly::num::{u4, u7, u15, u24, u28};
    use midly::{Format, Header, TrackEvent};

    fn note(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOn {
                    key: u7::new(key),
                    vel: u7::new(vel),
                },
            },
        }
    }

    fn tempo(delta: u32, us: u32) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(us))),
        }
    }

    fn end() -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        }
    }

    fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOff {
                    key: u7::new(key),
                    vel: u7::new(64),
                },
            },
        }
    }

    fn encode(format: Format, tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        encode_timed(format, Timing::Metrical(u15::new(480)), tracks)
    }

    fn encode_timed(format: Format, timing: Timing, tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        let mut smf = Smf::new(Header::new(format, timing));
        smf.tracks = tracks;
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        bytes
    }

    fn absolute(decoded: &[DecodedMessage]) -> Vec<(f64, Message)> {
        let mut now = 0.0;
        decoded
            .iter()
            .map(|m| {
                now += m.delta_secs;
                (now, m.message)
            })
            .collect()
    }

    #[test]
    fn default_tempo_is_120_bpm() {
        let bytes = encode(Format::SingleTrack, vec![vec![note(0, 60, 100), note(480, 60, 0), end()]]);
        let decoded = absolute(&decode(&bytes).unwrap());

        assert_eq!(decoded[0].1, Message::NoteOn { note: 60, velocity: 100 });
        assert_approx_eq!(decoded[1].0, 0.5);
        assert_eq!(decoded[1].1, Message::NoteOff { note: 60 });
    }

    #[test]
    fn tempo_changes_apply_from_their_tick() {
        let bytes = encode(
            Format::SingleTrack,
            vec![vec![
                tempo(0, 1_000_000),
                note(480, 60, 100),
                tempo(0, 250_000),
                note(480, 60, 0),
                end(),
            ]],
        );
        let decoded = absolute(&decode(&bytes).unwrap());
        let notes: Vec<f64> = decoded
            .iter()
            .filter(|(_, m)| *m != Message::Other)
            .map(|(t, _)| *t)
            .collect();

        assert_approx_eq!(notes[0], 1.0);
        assert_approx_eq!(notes[1], 1.25);
    }

    #[test]
    fn tracks_are_merged_chronologically() {
        let bytes = encode(
            Format::Parallel,
            vec![
                vec![note(240, 62, 90), end()],
                vec![note(0, 60, 80), note(480, 64, 70), end()],
            ],
        );
        let notes: Vec<(f64, Message)> = absolute(&decode(&bytes).unwrap())
            .into_iter()
            .filter(|(_, m)| *m != Message::Other)
            .collect();

        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].1, Message::NoteOn { note: 60, velocity: 80 });
        assert_approx_eq!(notes[1].0, 0.25);
        assert_eq!(notes[1].1, Message::NoteOn { note: 62, velocity: 90 });
        assert_approx_eq!(notes[2].0, 0.5);
    }

    #[test]
    fn timecode_ticks_are_frame_subdivisions() {
        // 25 fps × 40 subframes = 1000 ticks per second.
        let bytes = encode_timed(
            Format::SingleTrack,
            Timing::Timecode(Fps::Fps25, 40),
            vec![vec![note(0, 60, 100), note(500, 60, 0), end()]],
        );
        let decoded = absolute(&decode(&bytes).unwrap());

        assert_approx_eq!(decoded[1].0, 0.5);
        assert_eq!(decoded[1].1, Message::NoteOff { note: 60 });
    }

    #[test]
    fn note_off_status_is_a_release() {
        let bytes = encode(
            Format::SingleTrack,
            vec![vec![note(0, 64, 100), note_off(240, 64), end()]],
        );
        let decoded = absolute(&decode(&bytes).unwrap());

        assert_approx_eq!(decoded[1].0, 0.25);
        assert_eq!(decoded[1].1, Message::NoteOff { note: 64 });
    }

    #[test]
    fn tempo_track_retimes_other_tracks() {
        let bytes = encode(
            Format::Parallel,
            vec![
                vec![tempo(0, 1_000_000), end()],
                vec![note(0, 60, 100), note_off(480, 60), end()],
            ],
        );
        let notes: Vec<(f64, Message)> = absolute(&decode(&bytes).unwrap())
            .into_iter()
            .filter(|(_, m)| *m != Message::Other)
            .collect();

        assert_eq!(
            notes[0],
            (0.0, Message::NoteOn { note: 60, velocity: 100 })
        );
        assert_approx_eq!(notes[1].0, 1.0);
        assert_eq!(notes[1].1, Message::NoteOff { note: 60 });
    }

    #[test]
    fn garbage_is_malformed() {
        let err = decode(b"definitely not midi").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}
