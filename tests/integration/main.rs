//! Integration tests for bridgebuilder.
//!
//! These tests drive the compiled binary end-to-end over generated SAM/BAM
//! fixtures, asserting sink contents and the stable process exit codes.

mod helpers;
mod test_binnie_command;
mod test_liftover_command;
