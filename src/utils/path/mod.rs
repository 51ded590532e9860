//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects.

pub mod fs;

pub use fs::{file_stem, has_extension, normalize_path, same_file_name};
