//! Error types for the binning pipeline.
//!
//! Every failure the pipeline can produce is a member of one closed enum so
//! that the process-level shim can map it onto the stable exit-code table that
//! downstream scripts depend on. Nothing inside the pipeline catches and
//! recovers; errors bubble to `main`, which logs the diagnostic and exits.

use std::io;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, BinnieError>;

/// Error type for the binning pipeline.
///
/// The variants fall into three categories: fatal data-integrity errors
/// (the inputs violate a contract the pipeline cannot paper over), fatal I/O
/// errors, and internal invariant violations (`Null`, `NotNull`,
/// `BufferNotEmpty`, `InvalidBin`, `BufferRemove`) which indicate a bug if
/// they ever fire in production.
#[derive(Error, Debug)]
pub enum BinnieError {
    /// Invalid command-line arguments
    #[error("invalid arguments: {reason}")]
    Args {
        /// Explanation of what was wrong
        reason: String,
    },

    /// An input file could not be opened
    #[error("could not open input file '{path}': {source}")]
    InputOpen {
        /// Path to the file
        path: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An output file could not be opened
    #[error("could not open output file '{path}': {source}")]
    OutputOpen {
        /// Path to the file
        path: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A template identity could not be formed for a read
    #[error("could not form template identity for read with empty name (rg=[{read_group}])")]
    Uid {
        /// Read group of the offending read
        read_group: String,
    },

    /// A record could not be read from the original input stream
    #[error("error reading from original input file at read [{read_count}]: {source}")]
    ReadOriginal {
        /// Number of original records successfully read so far
        read_count: u64,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A record could not be read from the bridge input stream
    #[error("error reading from bridge input file at read [{read_count}]: {source}")]
    ReadBridge {
        /// Number of bridge records successfully read so far
        read_count: u64,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// READ1 and READ2 were both set with no FI/TC tag to disambiguate
    #[error(
        "READ1 and READ2 were set, but no FI tag found for read rg=[{read_group}] qname=[{qname}]"
    )]
    SegmentIndex {
        /// Read group of the offending read
        read_group: String,
        /// Query name of the offending read
        qname: String,
    },

    /// The original stream finished while bridge records remained
    #[error(
        "original finished but bridge read(s) remain at bridge read [{read_count}] qname=[{qname}]"
    )]
    OrigTruncated {
        /// Number of bridge records read so far
        read_count: u64,
        /// Query name of the first leftover bridge record
        qname: String,
    },

    /// A mate arrived for a template that declared it had none
    #[error("mate found for read but expected mate count was 0: rg=[{read_group}] qname=[{qname}]")]
    UnexpectedMates {
        /// Read group of the offending read
        read_group: String,
        /// Query name of the offending read
        qname: String,
    },

    /// Internal: a value was missing where one is required
    #[error("internal error: missing value where one is required ({context})")]
    Null {
        /// Which invariant was violated
        context: String,
    },

    /// Internal: a value was present where none is allowed
    #[error("internal error: unexpected value where none is allowed ({context})")]
    NotNull {
        /// Which invariant was violated
        context: String,
    },

    /// The buffer still held reads after the input was fully consumed
    #[error("output buffer was not empty at end of processing ({remaining} reads remained)")]
    BufferNotEmpty {
        /// Number of reads left in the buffer
        remaining: usize,
    },

    /// The original input violated the coordinate sort order
    #[error("sort error: {message} at original read [{read_count}] qname=[{qname}]")]
    BamUnsorted {
        /// Which sort invariant was violated
        message: String,
        /// Number of original records read so far
        read_count: u64,
        /// Query name of the offending read
        qname: String,
    },

    /// Internal: a buffered read carried an unrecognised bin
    #[error("invalid bin for buffered read rg=[{read_group}] qname=[{qname}]")]
    InvalidBin {
        /// Read group of the offending read
        read_group: String,
        /// Query name of the offending read
        qname: String,
    },

    /// A record could not be written to an output sink
    #[error("could not write to {bin} bin out file: {source}")]
    Write {
        /// Name of the destination bin
        bin: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Internal: removing the head read from the buffer failed
    #[error("internal error: failure removing read from buffer ({context})")]
    BufferRemove {
        /// Which operation failed
        context: String,
    },

    /// The bridge input violated its expected ordering
    #[error("bridge sort error: {message}")]
    BridgeSort {
        /// Which ordering invariant was violated
        message: String,
    },
}

impl BinnieError {
    /// Returns the stable process exit code for this error.
    ///
    /// The mapping is part of the tool's contract; downstream scripts switch
    /// on these values.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            BinnieError::Args { .. } => 1,
            BinnieError::InputOpen { .. } => 2,
            BinnieError::OutputOpen { .. } => 3,
            BinnieError::Uid { .. } => 4,
            BinnieError::ReadOriginal { .. } => 5,
            BinnieError::ReadBridge { .. } => 6,
            BinnieError::SegmentIndex { .. } => 7,
            BinnieError::OrigTruncated { .. } => 8,
            BinnieError::UnexpectedMates { .. } => 9,
            BinnieError::Null { .. } => 10,
            BinnieError::NotNull { .. } => 11,
            BinnieError::BufferNotEmpty { .. } => 12,
            BinnieError::BamUnsorted { .. } => 13,
            BinnieError::InvalidBin { .. } => 14,
            BinnieError::Write { .. } => 15,
            BinnieError::BufferRemove { .. } => 16,
            BinnieError::BridgeSort { .. } => 17,
        }
    }
}
