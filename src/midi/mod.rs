mod decode;
mod import;

pub use decode::{DecodedMessage, Message, decode};
pub use import::{import, import_bytes, is_midi_path, timeline_from_messages};
