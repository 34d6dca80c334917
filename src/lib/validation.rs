//! Input validation utilities.
//!
//! Early checks for command-line inputs, producing the same typed errors the
//! pipeline would hit later but with clearer messages and before any output
//! file has been created.

use std::io;
use std::path::Path;

use crate::errors::{BinnieError, Result};

/// Validates that an input file exists.
///
/// # Errors
///
/// Returns [`BinnieError::InputOpen`] naming the file when it does not exist.
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(BinnieError::InputOpen {
            path: path.display().to_string(),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                format!("{description} does not exist"),
            ),
        });
    }
    Ok(())
}

/// Validates that several input files exist, failing on the first missing.
///
/// # Errors
///
/// As [`validate_file_exists`].
pub fn validate_files_exist<P: AsRef<Path>>(files: &[(P, &str)]) -> Result<()> {
    for (path, description) in files {
        validate_file_exists(path, description)?;
    }
    Ok(())
}
