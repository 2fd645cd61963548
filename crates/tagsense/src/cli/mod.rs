//! Subcommand implementations.

pub mod config;
pub mod extract;
pub mod predict;
pub mod preprocess;
pub mod server;
pub mod suggest;
pub mod train;

use std::path::{Path, PathBuf};

/// Expand `~` in a user-supplied path.
pub(crate) fn expand_path(path: &Path) -> PathBuf {
    tagsense_core::config::expand(path)
}

/// Spinner for commands without per-item progress.
pub(crate) fn spinner(message: impl Into<String>) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}
