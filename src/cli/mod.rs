//! Command-line front end for the headless renderer.

pub mod args;
pub mod render;

pub use args::{CliError, RenderArgs};
pub use render::{fit_bounds, run_render_cli};
