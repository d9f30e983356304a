mod scheduler;
mod sequence;
mod state_machine;

pub use scheduler::tick;
pub use sequence::{KeyRange, Timeline};
pub use state_machine::{PlaybackState, Status, progress};
