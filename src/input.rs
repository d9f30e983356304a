use crossbeam::channel::{Receiver, Sender};
use midir::{MidiInput, MidiInputConnection};
use tracing::{debug, info};

use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMessage {
    Down { note: u8, velocity: u8 },
    Up { note: u8 },
}

/// A hardware MIDI keyboard feeding the manual key path.
///
/// Dropping it closes the port.
pub struct LiveInput {
    pub port_name: String,
    pub messages: Receiver<KeyMessage>,
    _connection: MidiInputConnection<()>,
}

impl LiveInput {
    /// Connects to the first input port whose name contains `filter`, or the
    /// first port at all when there is no filter.
    pub fn connect(filter: Option<&str>) -> Result<Self, InputError> {
        let midi_in = MidiInput::new("pianola").map_err(|e| InputError::Init(e.to_string()))?;

        let ports = midi_in.ports();
        let port = ports
            .iter()
            .find(|p| match filter {
                Some(filter) => midi_in.port_name(p).unwrap_or_default().contains(filter),
                None => true,
            })
            .ok_or(InputError::NoPort)?;
        let port_name = midi_in.port_name(port).unwrap_or_default();

        let (tx, messages): (Sender<KeyMessage>, Receiver<KeyMessage>) =
            crossbeam::channel::unbounded();
        let connection = midi_in
            .connect(
                port,
                "pianola-input",
                move |_, bytes, _| {
                    if let Some(message) = parse_key_message(bytes) {
                        let _ = tx.send(message);
                    } else {
                        debug!(?bytes, "ignored MIDI input");
                    }
                },
                (),
            )
            .map_err(|e| InputError::Connect(e.to_string()))?;

        info!(port = %port_name, "listening for MIDI input");
        Ok(Self {
            port_name,
            messages,
            _connection: connection,
        })
    }
}

/// Decodes a raw channel message. Note-on with velocity 0 is a release.
pub fn parse_key_message(bytes: &[u8]) -> Option<KeyMessage> {
    let [status, note, velocity, ..] = *bytes else {
        return None;
    };
    match status & 0xF0 {
        0x90 if velocity > 0 => Some(KeyMessage::Down { note, velocity }),
        0x80 | 0x90 => Some(KeyMessage::Up { note }),
        _ => None,
    }
}
