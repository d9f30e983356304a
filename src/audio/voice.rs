use serde::{Deserialize, Serialize};

use super::midi_to_freq;

/// Harmonic weights of a voice, fundamental first.
const PARTIALS: [f32; 4] = [1.0, 0.45, 0.2, 0.08];
const SILENCE: f32 = 1.0e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ADSRConfig {
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub decay: f32,
    /// 0.0 -> 1.0
    pub sustain: f32,
    /// Seconds
    pub release: f32,
}

impl Default for ADSRConfig {
    fn default() -> Self {
        Self {
            attack: 0.005,
            decay: 0.4,
            sustain: 0.35,
            release: 1.2,
        }
    }
}

/// Triggered voices never receive a note-off, so the sustain stage is
/// skipped: once decay reaches the sustain level the release starts.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeState {
    Attack { time: f32 },
    Decay { time: f32 },
    Release { time: f32 },
    Done,
}

/// One struck key ringing out.
#[derive(Debug, Clone)]
pub struct Voice {
    freq: f32,
    gain: f32,
    phase: f32,
    envelope_state: EnvelopeState,
    envelope_level: f32,
}

impl Voice {
    pub fn new(note: u8, gain: f32) -> Self {
        Self {
            freq: midi_to_freq(note),
            gain,
            phase: 0.0,
            envelope_state: EnvelopeState::Attack { time: 0.0 },
            envelope_level: 0.0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.envelope_state == EnvelopeState::Done
    }

    pub fn render_sample(&mut self, adsr: &ADSRConfig, sample_rate: f32) -> f32 {
        if self.is_done() {
            return 0.0;
        }

        let mut sample = 0.0_f32;
        for (i, weight) in PARTIALS.iter().enumerate() {
            let harmonic_phase = self.phase * (i + 1) as f32;
            sample += (harmonic_phase * 2.0 * std::f32::consts::PI).sin() * weight;
        }
        let norm: f32 = PARTIALS.iter().sum();
        let out = sample / norm * self.envelope_level * self.gain;

        self.phase += self.freq / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        advance_envelope(self, adsr, 1.0 / sample_rate);

        out
    }
}

pub fn calculate_envelope(state: &EnvelopeState, adsr: &ADSRConfig) -> f32 {
    match state {
        EnvelopeState::Attack { time } => {
            if adsr.attack == 0.0 {
                1.0
            } else {
                (time / adsr.attack).min(1.0)
            }
        }
        EnvelopeState::Decay { time } => {
            let decay_progress = if adsr.decay == 0.0 {
                1.0
            } else {
                (time / adsr.decay).min(1.0)
            };
            1.0 - (1.0 - adsr.sustain) * decay_progress
        }
        EnvelopeState::Release { time } => {
            let release_progress = if adsr.release == 0.0 {
                1.0
            } else {
                (time / adsr.release).min(1.0)
            };
            adsr.sustain * (1.0 - release_progress)
        }
        EnvelopeState::Done => 0.0,
    }
}

pub fn advance_envelope(voice: &mut Voice, adsr: &ADSRConfig, dt: f32) {
    match &mut voice.envelope_state {
        EnvelopeState::Attack { time } => {
            *time += dt;
            if *time >= adsr.attack {
                voice.envelope_state = EnvelopeState::Decay { time: 0.0 };
                voice.envelope_level = 1.0;
                return;
            }
        }
        EnvelopeState::Decay { time } => {
            *time += dt;
            if *time >= adsr.decay {
                voice.envelope_state = EnvelopeState::Release { time: 0.0 };
                voice.envelope_level = adsr.sustain;
                return;
            }
        }
        EnvelopeState::Release { time } => {
            *time += dt;
            if *time >= adsr.release {
                voice.envelope_state = EnvelopeState::Done;
                voice.envelope_level = 0.0;
                return;
            }
        }
        EnvelopeState::Done => return,
    }

    voice.envelope_level = calculate_envelope(&voice.envelope_state, adsr);
    if voice.envelope_level < SILENCE && matches!(voice.envelope_state, EnvelopeState::Release { .. })
    {
        voice.envelope_state = EnvelopeState::Done;
        voice.envelope_level = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn adsr() -> ADSRConfig {
        ADSRConfig {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.5,
            release: 0.2,
        }
    }

    #[test]
    fn envelope_shape() {
        let adsr = adsr();
        assert_approx_eq!(calculate_envelope(&EnvelopeState::Attack { time: 0.005 }, &adsr), 0.5);
        assert_approx_eq!(calculate_envelope(&EnvelopeState::Decay { time: 0.05 }, &adsr), 0.75);
        assert_approx_eq!(calculate_envelope(&EnvelopeState::Release { time: 0.1 }, &adsr), 0.25);
        assert_approx_eq!(calculate_envelope(&EnvelopeState::Done, &adsr), 0.0);
    }

    #[test]
    fn zero_length_stages_do_not_divide_by_zero() {
        let adsr = ADSRConfig {
            attack: 0.0,
            decay: 0.0,
            sustain: 0.5,
            release: 0.0,
        };
        assert_approx_eq!(calculate_envelope(&EnvelopeState::Attack { time: 0.0 }, &adsr), 1.0);
        assert_approx_eq!(calculate_envelope(&EnvelopeState::Release { time: 0.0 }, &adsr), 0.0);
    }

    #[test]
    fn voice_rings_out_and_finishes() {
        let adsr = adsr();
        let sample_rate = 1000.0;
        let mut voice = Voice::new(69, 1.0);

        let mut peak: f32 = 0.0;
        for _ in 0..400 {
            peak = peak.max(voice.render_sample(&adsr, sample_rate).abs());
        }
        assert!(peak > 0.0);
        assert!(voice.is_done());
        assert_approx_eq!(voice.render_sample(&adsr, sample_rate), 0.0);
    }

    #[test]
    fn gain_scales_output() {
        let adsr = adsr();
        let mut loud = Voice::new(60, 1.0);
        let mut quiet = Voice::new(60, 0.25);
        for _ in 0..20 {
            let a = loud.render_sample(&adsr, 44_100.0);
            let b = quiet.render_sample(&adsr, 44_100.0);
            assert_approx_eq!(a * 0.25, b);
        }
    }
}
