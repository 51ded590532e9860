//! Core state shared across the pipeline and watch loops.

mod state;

pub use state::{Phase, phase, register_shutdown, set_phase, setup_shutdown_handler};
