use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Producer, Split},
};
use tracing::{error, info, warn};

use super::{ADSRConfig, SoundSink, Voice};
use crate::error::AudioError;
use crate::timing::KeyRange;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    pub note: u8,
    pub volume: f32,
}

/// Sound sink backed by the default cpal output device.
///
/// Triggers travel to the audio callback through a lock-free queue; the
/// callback owns every voice.
pub struct Synth {
    producer: HeapProd<Trigger>,
    range: KeyRange,
    _stream: cpal::Stream,
}

impl Synth {
    pub fn start(range: KeyRange, adsr: ADSRConfig, capacity: usize) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Stream(e.to_string()))?;
        let stream_config: cpal::StreamConfig = config.into();

        let num_channels = stream_config.channels as usize;
        let sample_rate = stream_config.sample_rate as f32;
        info!(channels = num_channels, sample_rate, "audio output ready");

        let (producer, consumer) = HeapRb::<Trigger>::new(capacity.max(1)).split();
        let mut state = AudioState {
            consumer,
            voices: Vec::with_capacity(64),
            adsr,
            sample_rate,
            num_channels: num_channels.max(1),
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    audio_callback(data, &mut state);
                },
                |err| error!(error = %err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;
        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        Ok(Self {
            producer,
            range,
            _stream: stream,
        })
    }
}

impl SoundSink for Synth {
    fn play(&mut self, key: u8, volume: f32) {
        let Some(note) = self.range.note_for(key) else {
            warn!(key, "no note for key");
            return;
        };
        if self.producer.try_push(Trigger { note, volume }).is_err() {
            warn!(note, "trigger queue full, dropping note");
        }
    }
}

struct AudioState {
    consumer: HeapCons<Trigger>,
    voices: Vec<Voice>,
    adsr: ADSRConfig,
    sample_rate: f32,
    num_channels: usize,
}

fn audio_callback(data: &mut [f32], state: &mut AudioState) {
    while let Some(trigger) = state.consumer.try_pop() {
        state.voices.push(Voice::new(trigger.note, trigger.volume));
    }

    render(data, &mut state.voices, &state.adsr, state.sample_rate, state.num_channels);
}

fn render(
    data: &mut [f32],
    voices: &mut Vec<Voice>,
    adsr: &ADSRConfig,
    sample_rate: f32,
    num_channels: usize,
) {
    for frame in data.chunks_mut(num_channels) {
        let mut sample = 0.0_f32;
        for voice in voices.iter_mut() {
            sample += voice.render_sample(adsr, sample_rate);
        }
        let sample = sample.clamp(-1.0, 1.0);
        frame.fill(sample);
    }

    voices.retain(|voice| !voice.is_done());
}
