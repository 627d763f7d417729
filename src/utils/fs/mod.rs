//! File system helpers
//!
//! - [`atomic`] - temp-and-rename writes for documents that must never be truncated
//! - [`dirs`] - working directory creation and purging

pub mod atomic;
pub mod dirs;

pub use atomic::atomic_write;
pub use dirs::{clear_directory_content, default_working_dir, ensure_dir};
