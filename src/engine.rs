use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::active::ActiveNotes;
use crate::audio::SoundSink;
use crate::config::Config;
use crate::controls::Controls;
use crate::error::ImportError;
use crate::events::Transition;
use crate::midi;
use crate::timing::{self, KeyRange, PlaybackState, Status, Timeline};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Import(PathBuf),
    Start,
    Pause,
    Stop,
    /// Slider position in `0..=1`.
    SetTempo(f32),
    /// Slider position in `0..=1`.
    SetVolume(f32),
    KeyDown(u8),
    KeyUp(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    KeyDown { key: u8 },
    KeyUp { key: u8 },
    Status(Status),
    Loaded { events: usize, duration_ms: u64 },
    Error { message: String },
}

/// Everything the piano needs between frames: the loaded timeline, the
/// playback position, the lit keys, and the live controls.
///
/// Single-threaded by construction. The frame loop calls [`Engine::tick`]
/// once per frame and [`Engine::handle`] for each user intent.
pub struct Engine {
    range: KeyRange,
    reference_bpm: u32,
    timeline: Timeline,
    state: PlaybackState,
    active: ActiveNotes,
    controls: Controls,
    sound: Box<dyn SoundSink>,
}

impl Engine {
    pub fn new(config: &Config, sound: Box<dyn SoundSink>) -> Self {
        let controls = Controls::new(config.tempo_bpm, config.volume);
        Self {
            range: config.key_range(),
            reference_bpm: config.reference_bpm,
            timeline: Timeline::default(),
            state: PlaybackState::with_rate(controls.rate(config.reference_bpm)),
            active: ActiveNotes::new(),
            controls,
            sound,
        }
    }

    pub fn handle(&mut self, command: Command, now: Instant) -> Vec<EngineUpdate> {
        match command {
            Command::Import(path) => match self.import(&path, now) {
                Ok(()) => vec![
                    EngineUpdate::Loaded {
                        events: self.timeline.len(),
                        duration_ms: self.timeline.total_duration_ms(),
                    },
                    EngineUpdate::Status(self.state.status),
                ],
                Err(e) => vec![
                    EngineUpdate::Error {
                        message: format!("{}: {}", path.display(), e),
                    },
                    EngineUpdate::Status(self.state.status),
                ],
            },
            Command::Start => self.start(now).into_iter().collect(),
            Command::Pause => self.pause(now).into_iter().collect(),
            Command::Stop => self.stop().into_iter().collect(),
            Command::SetTempo(position) => {
                self.set_tempo_position(position, now);
                Vec::new()
            }
            Command::SetVolume(position) => {
                self.controls.set_volume_position(position);
                Vec::new()
            }
            Command::KeyDown(key) => self.key_down(key).into_iter().collect(),
            Command::KeyUp(key) => self.key_up(key).into_iter().collect(),
        }
    }

    /// Replaces the timeline and starts playing it from the top.
    ///
    /// On any failure the previous timeline is discarded as well and the
    /// engine is left stopped.
    pub fn import(&mut self, path: &Path, now: Instant) -> Result<(), ImportError> {
        let result = midi::import(path, &self.range);
        self.load(result, now)
    }

    pub fn import_bytes(&mut self, bytes: &[u8], now: Instant) -> Result<(), ImportError> {
        let result = midi::import_bytes(bytes, &self.range);
        self.load(result, now)
    }

    fn load(&mut self, result: Result<Timeline, ImportError>, now: Instant) -> Result<(), ImportError> {
        self.active.clear_scheduled();
        self.state = self.state.stop();
        match result {
            Ok(timeline) => {
                self.timeline = timeline;
                self.state = self.state.start(now);
                info!(events = self.timeline.len(), "playback started");
                Ok(())
            }
            Err(e) => {
                self.timeline = Timeline::default();
                warn!(error = %e, "import failed, playback stopped");
                Err(e)
            }
        }
    }

    pub fn start(&mut self, now: Instant) -> Option<EngineUpdate> {
        if self.timeline.is_empty() {
            info!("nothing loaded, start ignored");
            return None;
        }
        let previous = self.state.status;
        if previous == Status::Playing {
            return None;
        }
        if previous == Status::Stopped {
            self.active.clear_scheduled();
        }
        self.state = self.state.start(now);
        debug!(?previous, "playback started");
        Some(EngineUpdate::Status(self.state.status))
    }

    pub fn pause(&mut self, now: Instant) -> Option<EngineUpdate> {
        if self.state.status != Status::Playing {
            return None;
        }
        self.state = self.state.pause(now);
        debug!(elapsed_ms = self.state.elapsed_ms, "playback paused");
        Some(EngineUpdate::Status(self.state.status))
    }

    /// Rewinds to the top. A finished timeline is rewound too, but since the
    /// status does not change no update is reported.
    pub fn stop(&mut self) -> Option<EngineUpdate> {
        let was_stopped = self.state.status == Status::Stopped;
        self.state = self.state.stop();
        self.active.clear_scheduled();
        if was_stopped {
            return None;
        }
        debug!("playback stopped");
        Some(EngineUpdate::Status(self.state.status))
    }

    pub fn tick(&mut self, now: Instant) -> Vec<EngineUpdate> {
        let (state, transitions) = timing::tick(self.state, &self.timeline, now);
        self.state = state;

        let mut updates = Vec::with_capacity(transitions.len());
        for transition in transitions {
            match transition {
                Transition::NoteOn { key, .. } => {
                    self.active.note_on(key);
                    self.sound.play(key, self.controls.volume());
                    updates.push(EngineUpdate::KeyDown { key });
                }
                Transition::NoteOff { key } => {
                    self.active.note_off(key);
                    updates.push(EngineUpdate::KeyUp { key });
                }
                Transition::Finished => {
                    self.active.clear_scheduled();
                    info!("playback finished");
                    updates.push(EngineUpdate::Status(self.state.status));
                }
            }
        }
        updates
    }

    /// Manual press. Plays regardless of playback status, but only when the
    /// key was not already held by another input.
    pub fn key_down(&mut self, key: u8) -> Option<EngineUpdate> {
        if !self.range.contains_key(key) {
            return None;
        }
        if !self.active.press(key) {
            return None;
        }
        self.sound.play(key, self.controls.volume());
        Some(EngineUpdate::KeyDown { key })
    }

    pub fn key_up(&mut self, key: u8) -> Option<EngineUpdate> {
        self.active
            .release(key)
            .then_some(EngineUpdate::KeyUp { key })
    }

    pub fn set_tempo_position(&mut self, position: f32, now: Instant) {
        self.controls.set_tempo_position(position);
        self.apply_tempo(now);
    }

    pub fn set_tempo_bpm(&mut self, bpm: u32, now: Instant) {
        self.controls.set_tempo_bpm(bpm);
        self.apply_tempo(now);
    }

    fn apply_tempo(&mut self, now: Instant) {
        let rate = self.controls.rate(self.reference_bpm);
        self.state = self.state.set_rate(rate, now);
    }

    /// Runs a blocking call (a modal file dialog) without letting the blocked
    /// time count as playback.
    pub fn modal<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let before = Instant::now();
        let result = f();
        self.reanchor(before, Instant::now());
        result
    }

    pub fn reanchor(&mut self, before: Instant, after: Instant) {
        self.state = self.state.reanchor(before, after);
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.state
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn active(&self) -> &ActiveNotes {
        &self.active
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn key_range(&self) -> KeyRange {
        self.range
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.state.elapsed_ms
    }

    pub fn progress(&self) -> f32 {
        timing::progress(self.state.elapsed_ms, self.timeline.total_duration_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<(u8, f32)>>>);

    impl SoundSink for Recorder {
        fn play(&mut self, key: u8, volume: f32) {
            self.0.borrow_mut().push((key, volume));
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn engine() -> (Engine, Recorder) {
        let recorder = Recorder::default();
        let config = Config {
            volume: 0.5,
            ..Config::default()
        };
        (Engine::new(&config, Box::new(recorder.clone())), recorder)
    }

    fn load(engine: &mut Engine, events: Vec<crate::events::NoteEvent>, now: Instant) {
        engine.load(Ok(Timeline::new(events)), now).unwrap();
    }

    fn song() -> Vec<crate::events::NoteEvent> {
        use crate::events::NoteEvent;
        vec![
            NoteEvent::note_on(0, 0, 100),
            NoteEvent::note_on(5, 7, 100),
            NoteEvent::note_off(500, 0),
            NoteEvent::note_off(800, 7),
        ]
    }

    #[test]
    fn load_starts_playing() {
        let (mut engine, _) = engine();
        let t0 = Instant::now();
        load(&mut engine, song(), t0);
        assert_eq!(engine.status(), Status::Playing);
        assert_eq!(engine.playback().cursor, 0);
        assert!(engine.active().is_empty());
    }

    #[test]
    fn start_without_timeline_is_noop() {
        let (mut engine, _) = engine();
        assert_eq!(engine.handle(Command::Start, Instant::now()), vec![]);
        assert_eq!(engine.status(), Status::Stopped);
    }

    #[test]
    fn tick_lights_keys_and_plays_sounds() {
        let (mut engine, recorder) = engine();
        let t0 = Instant::now();
        load(&mut engine, song(), t0);

        let updates = engine.tick(t0 + ms(10));
        assert_eq!(
            updates,
            vec![EngineUpdate::KeyDown { key: 0 }, EngineUpdate::KeyDown { key: 7 }]
        );
        assert!(engine.active().contains(0) && engine.active().contains(7));
        assert_eq!(*recorder.0.borrow(), vec![(0, 0.5), (7, 0.5)]);

        engine.tick(t0 + ms(600));
        assert!(!engine.active().contains(0));
        assert_eq!(recorder.0.borrow().len(), 2);
    }

    #[test]
    fn finishing_leaves_nothing_lit() {
        use crate::events::NoteEvent;
        let (mut engine, _) = engine();
        let t0 = Instant::now();
        load(
            &mut engine,
            vec![NoteEvent::note_on(0, 3, 90), NoteEvent::note_on(50, 4, 90)],
            t0,
        );

        let updates = engine.tick(t0 + ms(60));
        assert_eq!(updates.last(), Some(&EngineUpdate::Status(Status::Stopped)));
        assert_eq!(engine.status(), Status::Stopped);
        assert!(engine.active().is_empty());
        assert_eq!(engine.playback().cursor, engine.timeline().len());
        assert_eq!(engine.progress(), 1.0);
    }

    #[test]
    fn pause_resume_and_stop() {
        let (mut engine, _) = engine();
        let t0 = Instant::now();
        load(&mut engine, song(), t0);
        engine.tick(t0 + ms(100));

        assert_eq!(
            engine.handle(Command::Pause, t0 + ms(100)),
            vec![EngineUpdate::Status(Status::Paused)]
        );
        assert!(engine.tick(t0 + ms(5_000)).is_empty());
        assert!(engine.active().contains(0));

        engine.handle(Command::Start, t0 + ms(5_000));
        engine.tick(t0 + ms(5_010));
        assert!((engine.elapsed_ms() - 110.0).abs() < 1.0);

        assert_eq!(
            engine.handle(Command::Stop, t0 + ms(5_020)),
            vec![EngineUpdate::Status(Status::Stopped)]
        );
        assert_eq!(engine.playback().cursor, 0);
        assert_eq!(engine.elapsed_ms(), 0.0);
        assert!(engine.active().is_empty());
        assert_eq!(engine.handle(Command::Stop, t0 + ms(5_030)), vec![]);
    }

    #[test]
    fn restart_after_stop_clears_and_rewinds() {
        let (mut engine, recorder) = engine();
        let t0 = Instant::now();
        load(&mut engine, song(), t0);
        engine.tick(t0 + ms(900));
        assert_eq!(engine.status(), Status::Stopped);

        engine.handle(Command::Start, t0 + ms(1_000));
        engine.tick(t0 + ms(1_000));
        assert_eq!(engine.playback().cursor, 1);
        assert_eq!(recorder.0.borrow().len(), 3);
    }

    #[test]
    fn manual_keys_survive_playback() {
        let (mut engine, recorder) = engine();
        let t0 = Instant::now();

        assert_eq!(engine.key_down(7), Some(EngineUpdate::KeyDown { key: 7 }));
        assert_eq!(engine.key_down(7), None);
        assert_eq!(engine.key_down(200), None);

        load(&mut engine, song(), t0);
        engine.tick(t0 + ms(900));
        assert!(engine.active().contains(7));

        assert_eq!(engine.key_up(7), None);
        assert!(engine.active().contains(7));
        assert_eq!(engine.key_up(7), Some(EngineUpdate::KeyUp { key: 7 }));
        assert!(engine.active().is_empty());
        assert_eq!(recorder.0.borrow()[0], (7, 0.5));
    }

    #[test]
    fn key_stays_lit_until_every_input_releases_it() {
        let (mut engine, recorder) = engine();
        let now = Instant::now();

        engine.handle(Command::KeyDown(0), now);
        assert_eq!(engine.handle(Command::KeyDown(0), now), vec![]);
        assert_eq!(recorder.0.borrow().len(), 1);

        assert_eq!(engine.handle(Command::KeyUp(0), now), vec![]);
        assert!(engine.active().contains(0));
        assert_eq!(
            engine.handle(Command::KeyUp(0), now),
            vec![EngineUpdate::KeyUp { key: 0 }]
        );
        assert!(engine.active().is_empty());
    }

    #[test]
    fn stop_after_finish_rewinds_quietly() {
        let (mut engine, _) = engine();
        let t0 = Instant::now();
        load(&mut engine, song(), t0);
        engine.tick(t0 + ms(900));
        assert_eq!(engine.status(), Status::Stopped);
        assert_eq!(engine.playback().cursor, 4);

        assert_eq!(engine.handle(Command::Stop, t0 + ms(1_000)), vec![]);
        assert_eq!(engine.playback().cursor, 0);
        assert_eq!(engine.elapsed_ms(), 0.0);
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn failed_import_clears_previous_timeline() {
        let (mut engine, _) = engine();
        let t0 = Instant::now();
        load(&mut engine, song(), t0);
        engine.tick(t0 + ms(10));

        let err = engine.import_bytes(b"nope", t0 + ms(20)).unwrap_err();
        assert!(matches!(err, ImportError::Unreadable(_)));
        assert!(engine.timeline().is_empty());
        assert_eq!(engine.status(), Status::Stopped);
        assert!(engine.active().is_empty());
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn import_command_reports_errors() {
        let (mut engine, _) = engine();
        let updates = engine.handle(
            Command::Import(PathBuf::from("/nonexistent/file.mid")),
            Instant::now(),
        );
        assert!(matches!(updates[0], EngineUpdate::Error { .. }));
        assert_eq!(updates[1], EngineUpdate::Status(Status::Stopped));
    }

    #[test]
    fn tempo_scales_playback() {
        let (mut engine, _) = engine();
        let t0 = Instant::now();
        load(&mut engine, song(), t0);

        engine.handle(Command::SetTempo(1.0), t0);
        assert_eq!(engine.controls().tempo_bpm(), 240);
        engine.tick(t0 + ms(251));
        assert!(!engine.active().contains(0));

        engine.set_tempo_bpm(120, t0 + ms(300));
        engine.tick(t0 + ms(300));
        assert!((engine.elapsed_ms() - 600.0).abs() < 1.0);
    }

    #[test]
    fn volume_applies_to_new_triggers() {
        let (mut engine, recorder) = engine();
        engine.handle(Command::SetVolume(0.25), Instant::now());
        engine.handle(Command::KeyDown(1), Instant::now());
        assert_eq!(*recorder.0.borrow(), vec![(1, 0.25)]);
    }

    #[test]
    fn modal_time_is_not_played() {
        let (mut engine, _) = engine();
        let t0 = Instant::now();
        load(&mut engine, song(), t0);
        engine.tick(t0 + ms(2));

        engine.reanchor(t0 + ms(2), t0 + ms(60_000));
        engine.tick(t0 + ms(60_001));
        assert_eq!(engine.playback().cursor, 1);
        assert!((engine.elapsed_ms() - 3.0).abs() < 0.5);
    }
}
