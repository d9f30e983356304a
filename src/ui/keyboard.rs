use std::time::{Duration, Instant};

use eframe::egui;

use crate::active::ActiveNotes;
use crate::timing::KeyRange;

const BLACK_KEY_WIDTH: f32 = 0.6;
const BLACK_KEY_HEIGHT: f32 = 0.6;
const RIPPLE_LIFETIME: Duration = Duration::from_millis(600);

/// Two tracker-style rows: bottom row plays the first octave, top row the
/// second. Index in the table is the key index.
const KEY_MAP: [egui::Key; 24] = [
    egui::Key::Z,
    egui::Key::S,
    egui::Key::X,
    egui::Key::D,
    egui::Key::C,
    egui::Key::V,
    egui::Key::G,
    egui::Key::B,
    egui::Key::H,
    egui::Key::N,
    egui::Key::J,
    egui::Key::M,
    egui::Key::Q,
    egui::Key::Num2,
    egui::Key::W,
    egui::Key::Num3,
    egui::Key::E,
    egui::Key::R,
    egui::Key::Num5,
    egui::Key::T,
    egui::Key::Num6,
    egui::Key::Y,
    egui::Key::Num7,
    egui::Key::U,
];

pub fn mapped_inputs() -> impl Iterator<Item = (egui::Key, u8)> {
    KEY_MAP.iter().enumerate().map(|(i, k)| (*k, i as u8))
}

pub fn is_black(note: u8) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}

/// Screen placement of every key in `range` inside `rect`. White keys come
/// first so black keys paint, and hit-test, on top.
pub fn layout(range: &KeyRange, rect: egui::Rect) -> Vec<(u8, egui::Rect, bool)> {
    let notes = (0..range.len()).filter_map(|key| range.note_for(key).map(|note| (key, note)));
    let white_count = notes.clone().filter(|(_, note)| !is_black(*note)).count().max(1);
    let white_width = rect.width() / white_count as f32;

    let mut whites = Vec::new();
    let mut blacks = Vec::new();
    let mut white_index = 0;
    for (key, note) in notes {
        if is_black(note) {
            let x = rect.left() + white_index as f32 * white_width - white_width * BLACK_KEY_WIDTH / 2.0;
            let key_rect = egui::Rect::from_min_size(
                egui::Pos2::new(x, rect.top()),
                egui::Vec2::new(white_width * BLACK_KEY_WIDTH, rect.height() * BLACK_KEY_HEIGHT),
            );
            blacks.push((key, key_rect, true));
        } else {
            let key_rect = egui::Rect::from_min_size(
                egui::Pos2::new(rect.left() + white_index as f32 * white_width, rect.top()),
                egui::Vec2::new(white_width, rect.height()),
            );
            whites.push((key, key_rect, false));
            white_index += 1;
        }
    }

    whites.extend(blacks);
    whites
}

pub fn hit_test(keys: &[(u8, egui::Rect, bool)], pos: egui::Pos2) -> Option<u8> {
    keys.iter()
        .rev()
        .find(|(_, rect, _)| rect.contains(pos))
        .map(|(key, _, _)| *key)
}

/// Expanding ring drawn over a key when it goes down.
pub struct Ripple {
    pub key: u8,
    pub started: Instant,
}

pub struct Keyboard<'a> {
    range: KeyRange,
    active: &'a ActiveNotes,
    ripples: &'a [Ripple],
}

pub struct KeyboardResponse {
    /// Key under a held primary button, if any.
    pub pressed: Option<u8>,
}

impl<'a> Keyboard<'a> {
    pub fn new(range: KeyRange, active: &'a ActiveNotes, ripples: &'a [Ripple]) -> Self {
        Self {
            range,
            active,
            ripples,
        }
    }

    pub fn show(self, ui: &mut egui::Ui, now: Instant) -> KeyboardResponse {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        let keys = layout(&self.range, rect);

        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(30, 30, 30));

        for (key, key_rect, black) in &keys {
            let lit = self.active.contains(*key);
            let key_color = match (black, lit) {
                (_, true) => egui::Color32::from_rgb(100, 200, 255),
                (true, false) => egui::Color32::from_rgb(20, 20, 20),
                (false, false) => egui::Color32::from_rgb(235, 235, 235),
            };

            painter.rect_filled(*key_rect, 2.0, key_color);
            painter.rect_stroke(
                *key_rect,
                2.0,
                egui::Stroke::new(1.0, egui::Color32::from_rgb(100, 100, 100)),
                egui::StrokeKind::Inside,
            );

            if let Some(note) = self.range.note_for(*key) {
                if note % 12 == 0 {
                    let octave = (note / 12) as i32 - 1;
                    painter.text(
                        egui::Pos2::new(key_rect.center().x, key_rect.bottom() - 12.0),
                        egui::Align2::CENTER_CENTER,
                        format!("C{}", octave),
                        egui::FontId::proportional(11.0),
                        egui::Color32::DARK_GRAY,
                    );
                }
            }
        }

        for ripple in self.ripples {
            let Some((_, key_rect, _)) = keys.iter().find(|(k, _, _)| *k == ripple.key) else {
                continue;
            };
            let age = now.saturating_duration_since(ripple.started).as_secs_f32()
                / RIPPLE_LIFETIME.as_secs_f32();
            if age >= 1.0 {
                continue;
            }
            let alpha = ((1.0 - age) * 200.0) as u8;
            painter.circle_stroke(
                egui::Pos2::new(key_rect.center().x, key_rect.top()),
                key_rect.width() * (0.5 + age * 2.0),
                egui::Stroke::new(
                    3.0 * (1.0 - age),
                    egui::Color32::from_rgba_unmultiplied(120, 210, 255, alpha),
                ),
            );
        }

        let pressed = if response.is_pointer_button_down_on() {
            response
                .interact_pointer_pos()
                .and_then(|pos| hit_test(&keys, pos))
        } else {
            None
        };

        KeyboardResponse { pressed }
    }
}

pub fn ripple_alive(ripple: &Ripple, now: Instant) -> bool {
    now.saturating_duration_since(ripple.started) < RIPPLE_LIFETIME
}
