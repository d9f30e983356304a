mod keyboard;

use std::collections::HashMap;
use std::time::Instant;

use eframe::egui;
use keyboard::{Keyboard, Ripple};
use tracing::warn;

use crate::input::{KeyMessage, LiveInput};
use crate::midi::is_midi_path;
use crate::timing::Status;
use crate::{Command, Engine, EngineUpdate};

pub struct PianoApp {
    engine: Engine,
    live_input: Option<LiveInput>,
    error_message: Option<String>,
    loaded: Option<String>,
    held_inputs: HashMap<egui::Key, u8>,
    mouse_key: Option<u8>,
    ripples: Vec<Ripple>,
    tempo_position: f32,
    volume_position: f32,
}

impl PianoApp {
    pub fn new(engine: Engine, live_input: Option<LiveInput>) -> Self {
        let tempo_position = engine.controls().tempo_position();
        let volume_position = engine.controls().volume();
        Self {
            engine,
            live_input,
            error_message: None,
            loaded: None,
            held_inputs: HashMap::new(),
            mouse_key: None,
            ripples: Vec::new(),
            tempo_position,
            volume_position,
        }
    }

    fn send(&mut self, command: Command) {
        let updates = self.engine.handle(command, Instant::now());
        self.process_engine_updates(updates);
    }

    fn process_engine_updates(&mut self, updates: Vec<EngineUpdate>) {
        let now = Instant::now();
        for update in updates {
            match update {
                EngineUpdate::KeyDown { key } => self.ripples.push(Ripple { key, started: now }),
                EngineUpdate::KeyUp { .. } | EngineUpdate::Status(_) => {}
                EngineUpdate::Loaded {
                    events,
                    duration_ms,
                } => {
                    self.error_message = None;
                    self.loaded = Some(format!(
                        "{} events, {:.1}s",
                        events,
                        duration_ms as f64 / 1000.0
                    ));
                }
                EngineUpdate::Error { message } => {
                    self.loaded = None;
                    self.error_message = Some(message);
                }
            }
        }
    }

    fn open_file_dialog(&mut self) {
        let picked = self.engine.modal(|| {
            rfd::FileDialog::new()
                .set_title("Open MIDI File")
                .add_filter("MIDI", &["mid", "midi"])
                .pick_file()
        });
        if let Some(path) = picked {
            self.send(Command::Import(path));
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            let Some(path) = file.path else {
                warn!(name = %file.name, "dropped item has no path");
                continue;
            };
            if is_midi_path(&path) {
                self.send(Command::Import(path));
            } else {
                warn!(path = %path.display(), "ignoring dropped non-MIDI file");
                self.error_message = Some(format!("Not a MIDI file: {}", path.display()));
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (pressed, released): (Vec<(egui::Key, u8)>, Vec<(egui::Key, u8)>) = ctx.input(|i| {
            let pressed = keyboard::mapped_inputs()
                .filter(|(k, _)| i.key_pressed(*k))
                .collect();
            let released = keyboard::mapped_inputs()
                .filter(|(k, _)| i.key_released(*k))
                .collect();
            (pressed, released)
        });

        for (input, key) in pressed {
            if self.held_inputs.insert(input, key).is_none() {
                self.send(Command::KeyDown(key));
            }
        }
        for (input, key) in released {
            if self.held_inputs.remove(&input).is_some() {
                self.send(Command::KeyUp(key));
            }
        }
    }

    fn handle_live_input(&mut self) {
        let Some(live) = &self.live_input else {
            return;
        };
        let range = self.engine.key_range();
        let messages: Vec<KeyMessage> = live.messages.try_iter().collect();
        for message in messages {
            match message {
                KeyMessage::Down { note, .. } => {
                    if let Some(key) = range.key_for(note) {
                        self.send(Command::KeyDown(key));
                    }
                }
                KeyMessage::Up { note } => {
                    if let Some(key) = range.key_for(note) {
                        self.send(Command::KeyUp(key));
                    }
                }
            }
        }
    }

    fn handle_mouse(&mut self, pressed: Option<u8>) {
        if pressed == self.mouse_key {
            return;
        }
        if let Some(key) = self.mouse_key.take() {
            self.send(Command::KeyUp(key));
        }
        if let Some(key) = pressed {
            self.mouse_key = Some(key);
            self.send(Command::KeyDown(key));
        }
    }

    fn transport_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("📂 Load MIDI…").clicked() {
                self.open_file_dialog();
            }

            ui.separator();

            let status = self.engine.status();
            if status == Status::Playing {
                if ui.button("⏸ Pause").clicked() {
                    self.send(Command::Pause);
                }
            } else {
                let label = if status == Status::Paused {
                    "▶ Resume"
                } else {
                    "▶ Start"
                };
                if ui.button(label).clicked() {
                    self.send(Command::Start);
                }
            }

            if ui.button("⏹ Stop").clicked() {
                self.send(Command::Stop);
            }

            ui.separator();

            let tempo_label = format!("Tempo {} BPM", self.engine.controls().tempo_bpm());
            let tempo = ui.add(
                egui::Slider::new(&mut self.tempo_position, 0.0..=1.0)
                    .show_value(false)
                    .text(tempo_label),
            );
            if tempo.changed() {
                self.send(Command::SetTempo(self.tempo_position));
            }

            let volume_label = format!("Volume {:.0}%", self.engine.controls().volume() * 100.0);
            let volume = ui.add(
                egui::Slider::new(&mut self.volume_position, 0.0..=1.0)
                    .show_value(false)
                    .text(volume_label),
            );
            if volume.changed() {
                self.send(Command::SetVolume(self.volume_position));
            }
        });
    }

    fn progress_bar(&self, ui: &mut egui::Ui) {
        let total_ms = self.engine.timeline().total_duration_ms();
        let elapsed_ms = self.engine.elapsed_ms().min(total_ms as f64);
        let text = format!(
            "{:.1}s / {:.1}s",
            elapsed_ms / 1000.0,
            total_ms as f64 / 1000.0
        );
        ui.add(egui::ProgressBar::new(self.engine.progress()).text(text));
    }
}

impl eframe::App for PianoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.handle_keys(ctx);
        self.handle_live_input();

        let now = Instant::now();
        let updates = self.engine.tick(now);
        self.process_engine_updates(updates);
        self.ripples.retain(|r| keyboard::ripple_alive(r, now));

        egui::TopBottomPanel::top("transport").show(ctx, |ui| {
            self.transport_controls(ui);
            self.progress_bar(ui);
            if let Some(live) = &self.live_input {
                ui.label(format!("MIDI in: {}", live.port_name));
            }
            match (&self.error_message, &self.loaded) {
                (Some(error), _) => {
                    ui.colored_label(egui::Color32::RED, error);
                }
                (None, Some(loaded)) => {
                    ui.label(loaded);
                }
                (None, None) => {
                    ui.label("Drop a .mid file here or use Load MIDI… Play with Z–M and Q–U.");
                }
            }
        });

        let mut pressed = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = Keyboard::new(
                self.engine.key_range(),
                self.engine.active(),
                &self.ripples,
            )
            .show(ui, now);
            pressed = response.pressed;
        });
        self.handle_mouse(pressed);

        ctx.request_repaint();
    }
}
