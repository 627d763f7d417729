//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`fs`] - atomic writes and working directory management
//! - [`progress`] - progress bars and spinners for the CLI

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, clear_directory_content, default_working_dir, ensure_dir};
pub use progress::ProgressBar;
