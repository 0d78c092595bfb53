// Library surface for the binary, headless integration tests and reuse.
// The binary only adds the CLI and terminal setup on top of this.
pub mod animal_quiz;
pub mod app;
pub mod app_dirs;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod responses;
pub mod runtime;
pub mod sequencer;
pub mod session;
pub mod ui;
pub mod voice;

pub use app::{App, AppSettings, AppState, Flow};
pub use catalog::Catalog;
