mod runner;

pub use runner::{run_viewer, AppError, ViewerConfig};
