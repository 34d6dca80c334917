//! Command trait definition for CLI commands.
//!
//! This module defines the [`Command`] trait that all bridgebuilder CLI
//! commands implement. The trait uses `enum_dispatch` for efficient dynamic
//! dispatch across command variants.

use anyhow::Result;
use enum_dispatch::enum_dispatch;

/// Trait implemented by all bridgebuilder CLI commands.
///
/// Each command provides an `execute` method that runs the command's main
/// logic. Typed pipeline errors inside the returned error chain are mapped to
/// stable process exit codes by `main`.
#[enum_dispatch]
pub trait Command {
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self) -> Result<()>;
}
