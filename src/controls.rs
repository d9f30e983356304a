pub const MIN_TEMPO_BPM: u32 = 30;
pub const MAX_TEMPO_BPM: u32 = 240;

/// Live tempo and volume, always kept inside their legal ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    tempo_bpm: u32,
    volume: f32,
}

impl Controls {
    pub fn new(tempo_bpm: u32, volume: f32) -> Self {
        let mut controls = Self {
            tempo_bpm: MIN_TEMPO_BPM,
            volume: 0.0,
        };
        controls.set_tempo_bpm(tempo_bpm);
        controls.set_volume(volume);
        controls
    }

    pub fn tempo_bpm(&self) -> u32 {
        self.tempo_bpm
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_tempo_bpm(&mut self, bpm: u32) {
        self.tempo_bpm = bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
    }

    /// Slider position in `0..=1` to BPM.
    pub fn set_tempo_position(&mut self, position: f32) {
        let position = clamp_position(position);
        let span = (MAX_TEMPO_BPM - MIN_TEMPO_BPM) as f32;
        self.set_tempo_bpm(MIN_TEMPO_BPM + (position * span).round() as u32);
    }

    pub fn tempo_position(&self) -> f32 {
        (self.tempo_bpm - MIN_TEMPO_BPM) as f32 / (MAX_TEMPO_BPM - MIN_TEMPO_BPM) as f32
    }

    pub fn set_volume_position(&mut self, position: f32) {
        self.set_volume(clamp_position(position));
    }

    /// Timeline speed relative to the tempo the file is assumed to be written at.
    pub fn rate(&self, reference_bpm: u32) -> f64 {
        self.tempo_bpm as f64 / reference_bpm.max(1) as f64
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new(120, 0.8)
    }
}

fn clamp_position(position: f32) -> f32 {
    if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn values_are_clamped() {
        let mut controls = Controls::new(500, 3.0);
        assert_eq!(controls.tempo_bpm(), 240);
        assert_approx_eq!(controls.volume(), 1.0);

        controls.set_tempo_bpm(1);
        controls.set_volume(-0.5);
        assert_eq!(controls.tempo_bpm(), 30);
        assert_approx_eq!(controls.volume(), 0.0);
    }

    #[test]
    fn slider_positions_map_onto_ranges() {
        let mut controls = Controls::default();
        controls.set_tempo_position(0.0);
        assert_eq!(controls.tempo_bpm(), 30);
        controls.set_tempo_position(1.0);
        assert_eq!(controls.tempo_bpm(), 240);
        controls.set_tempo_position(0.5);
        assert_eq!(controls.tempo_bpm(), 135);
        assert_approx_eq!(controls.tempo_position(), 0.5);

        controls.set_volume_position(1.7);
        assert_approx_eq!(controls.volume(), 1.0);
        controls.set_volume_position(f32::NAN);
        assert_approx_eq!(controls.volume(), 0.0);
    }

    #[test]
    fn rate_is_relative_to_reference() {
        let controls = Controls::new(180, 1.0);
        assert_approx_eq!(controls.rate(120), 1.5);
        assert_approx_eq!(controls.rate(0), 180.0);
    }
}
