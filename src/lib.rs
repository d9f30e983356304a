pub mod active;
pub mod audio;
pub mod config;
pub mod controls;
pub mod engine;
pub mod error;
pub mod events;
pub mod input;
pub mod midi;
pub mod timing;
pub mod ui;

pub use active::ActiveNotes;
pub use config::Config;
pub use controls::Controls;
pub use engine::{Command, Engine, EngineUpdate};
pub use error::{AudioError, ConfigError, DecodeError, ImportError, InputError};
pub use events::{NoteEvent, NoteKind, Transition};
pub use ui::PianoApp;
