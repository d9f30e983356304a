use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a standard MIDI file: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unreadable MIDI file: {0}")]
    Unreadable(#[from] DecodeError),

    #[error("no notes fall inside the playable key range")]
    NoPlayableNotes,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device")]
    NoOutputDevice,

    #[error("audio stream: {0}")]
    Stream(String),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot open MIDI input: {0}")]
    Init(String),

    #[error("no MIDI input port available")]
    NoPort,

    #[error("cannot connect to MIDI input: {0}")]
    Connect(String),
}
