use std::time::Instant;

use super::{PlaybackState, Status, Timeline};
use crate::events::Transition;

/// Advances `state` to `now`, consuming every event whose time has passed.
///
/// A late frame catches up by consuming all due events in one call, in
/// timeline order, so nothing is ever skipped. Reaching the end of the
/// timeline stops playback and emits `Transition::Finished`.
pub fn tick(
    state: PlaybackState,
    timeline: &Timeline,
    now: Instant,
) -> (PlaybackState, Vec<Transition>) {
    if state.status != Status::Playing {
        return (state, Vec::new());
    }

    let mut state = state;
    state.elapsed_ms = state.elapsed_at(now);

    let events = timeline.events();
    let mut transitions = Vec::new();

    while let Some(event) = events.get(state.cursor) {
        if event.time_ms as f64 > state.elapsed_ms {
            break;
        }
        transitions.push(Transition::from(event));
        state.cursor += 1;
    }

    if state.cursor >= events.len() {
        state = state.finish();
        transitions.push(Transition::Finished);
    }

    (state, transitions)
}
