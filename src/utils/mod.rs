mod progress;

pub use progress::{ProgressBarNew, ProgressStyleTemplate};
