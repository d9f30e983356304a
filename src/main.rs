use pianola::audio::{Mute, SoundSink, Synth};
use pianola::input::LiveInput;
use pianola::{Config, Engine, PianoApp};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pianola=info")),
        )
        .init();

    let config = Config::load_or_default(&Config::default_path());

    let sound: Box<dyn SoundSink> = match Synth::start(
        config.key_range(),
        config.envelope.clone(),
        config.trigger_capacity,
    ) {
        Ok(synth) => Box::new(synth),
        Err(e) => {
            warn!(error = %e, "audio unavailable, running silent");
            Box::new(Mute)
        }
    };

    let live_input = match LiveInput::connect(config.midi_input.as_deref()) {
        Ok(input) => Some(input),
        Err(e) => {
            info!(error = %e, "no live MIDI input");
            None
        }
    };

    let engine = Engine::new(&config, sound);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 360.0])
            .with_title("Pianola"),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "Pianola",
        options,
        Box::new(|_cc| Ok(Box::new(PianoApp::new(engine, live_input)))),
    ) {
        error!(error = %e, "window closed with an error");
    }
}
