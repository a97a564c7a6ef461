pub mod config;
pub mod dispatcher;
pub mod generator;
pub mod main_lib;

pub use main_lib::{build_state, build_state_with_generator, init_tracing, AppState};
