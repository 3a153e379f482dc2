//! CLI command implementations.

mod config;
mod notes;
mod publish;
mod queue;

pub use config::run_config;
pub use notes::run_notes;
pub use publish::run_publish;
pub use queue::run_queue;
