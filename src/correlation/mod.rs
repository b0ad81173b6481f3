//! Issue-key correlation between source control and the issue tracker.

mod engine;
mod keys;
pub mod model;

pub use engine::CorrelationEngine;
pub use keys::issue_keys;
pub use model::*;
