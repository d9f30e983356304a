use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Where playback is on the timeline and how that maps to the wall clock.
///
/// While playing, elapsed time is always derived from `anchor` rather than
/// accumulated per frame:
///
/// `elapsed_ms = anchor_elapsed_ms + (now - anchor) * rate`
///
/// Every change of status or rate re-anchors, so elapsed time stays
/// continuous across pause/resume and tempo changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub status: Status,
    /// Index of the next unconsumed event.
    pub cursor: usize,
    pub elapsed_ms: f64,
    anchor: Option<Instant>,
    anchor_elapsed_ms: f64,
    rate: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            status: Status::Stopped,
            cursor: 0,
            elapsed_ms: 0.0,
            anchor: None,
            anchor_elapsed_ms: 0.0,
            rate: 1.0,
        }
    }
}

impl PlaybackState {
    pub fn with_rate(rate: f64) -> Self {
        Self {
            rate: sanitize_rate(rate),
            ..Self::default()
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Timeline position at `now`. Frozen unless playing.
    pub fn elapsed_at(&self, now: Instant) -> f64 {
        match (self.status, self.anchor) {
            (Status::Playing, Some(anchor)) => {
                let wall_ms = now.saturating_duration_since(anchor).as_secs_f64() * 1000.0;
                self.anchor_elapsed_ms + wall_ms * self.rate
            }
            _ => self.elapsed_ms,
        }
    }

    /// Stopped starts from the top, Paused resumes where it left off and
    /// Playing is left alone.
    pub fn start(self, now: Instant) -> Self {
        match self.status {
            Status::Stopped => Self {
                status: Status::Playing,
                cursor: 0,
                elapsed_ms: 0.0,
                anchor: Some(now),
                anchor_elapsed_ms: 0.0,
                rate: self.rate,
            },
            Status::Paused => Self {
                status: Status::Playing,
                anchor: Some(now),
                anchor_elapsed_ms: self.elapsed_ms,
                ..self
            },
            Status::Playing => self,
        }
    }

    pub fn pause(self, now: Instant) -> Self {
        if self.status != Status::Playing {
            return self;
        }
        Self {
            status: Status::Paused,
            elapsed_ms: self.elapsed_at(now),
            anchor: None,
            anchor_elapsed_ms: 0.0,
            ..self
        }
    }

    pub fn stop(self) -> Self {
        Self {
            rate: self.rate,
            ..Self::default()
        }
    }

    /// End of timeline. Cursor and position are kept so the last frame can
    /// still draw a full progress bar; the next start begins from the top.
    pub fn finish(self) -> Self {
        Self {
            status: Status::Stopped,
            anchor: None,
            anchor_elapsed_ms: 0.0,
            ..self
        }
    }

    /// Changes the playback rate without moving the current position.
    pub fn set_rate(self, rate: f64, now: Instant) -> Self {
        let rate = sanitize_rate(rate);
        match self.status {
            Status::Playing => {
                let elapsed_ms = self.elapsed_at(now);
                Self {
                    elapsed_ms,
                    anchor: Some(now),
                    anchor_elapsed_ms: elapsed_ms,
                    rate,
                    ..self
                }
            }
            _ => Self { rate, ..self },
        }
    }

    /// Discards the wall-clock interval between `before` and `after`, such as
    /// the time a modal file dialog held the frame loop.
    pub fn reanchor(self, before: Instant, after: Instant) -> Self {
        if self.status != Status::Playing {
            return self;
        }
        let elapsed_ms = self.elapsed_at(before);
        Self {
            elapsed_ms,
            anchor: Some(after),
            anchor_elapsed_ms: elapsed_ms,
            ..self
        }
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        1.0
    }
}

/// Fill fraction for a progress bar, `0.0` when there is nothing loaded.
pub fn progress(elapsed_ms: f64, total_duration_ms: u64) -> f32 {
    if total_duration_ms == 0 {
        return 0.0;
    }
    (elapsed_ms / total_duration_ms as f64).clamp(0.0, 1.0) as f32
}
