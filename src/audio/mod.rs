mod synth;
mod voice;

pub use synth::{Synth, Trigger};
pub use voice::{ADSRConfig, EnvelopeState, Voice};

pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Fire-and-forget "play this key" primitive. There is no matching stop:
/// struck notes ring out on their own.
pub trait SoundSink {
    fn play(&mut self, key: u8, volume: f32);
}

/// Sink used when no audio device could be opened.
#[derive(Debug, Default)]
pub struct Mute;

impl SoundSink for Mute {
    fn play(&mut self, _key: u8, _volume: f32) {}
}
