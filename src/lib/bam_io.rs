//! Alignment file I/O.
//!
//! Readers and writers for the binning pipeline's inputs and outputs. The
//! on-disk format is chosen by file extension, `.bam` (BGZF-compressed) or
//! `.sam` (plain text), case-insensitive; anything else is an open error.
//! Headers are read on open and written before the first record.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write as _};
use std::path::Path;

use noodles::bam;
use noodles::sam;
use noodles::sam::Header;
use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::record_buf::RecordBuf;

use crate::errors::{BinnieError, Result};

/// On-disk alignment format, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Bam,
    Sam,
}

fn detect_format(path: &Path) -> Option<Format> {
    let extension = path.extension()?.to_str()?;
    if extension.eq_ignore_ascii_case("bam") {
        Some(Format::Bam)
    } else if extension.eq_ignore_ascii_case("sam") {
        Some(Format::Sam)
    } else {
        None
    }
}

fn unsupported(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("filename '{}' does not end in .bam or .sam", path.display()),
    )
}

/// Reader over a SAM or BAM file.
pub enum AlignmentReader {
    /// BGZF-compressed BAM input
    Bam(bam::io::Reader<noodles::bgzf::Reader<File>>),
    /// Plain-text SAM input
    Sam(sam::io::Reader<BufReader<File>>),
}

impl fmt::Debug for AlignmentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentReader::Bam(_) => f.write_str("AlignmentReader::Bam(..)"),
            AlignmentReader::Sam(_) => f.write_str("AlignmentReader::Sam(..)"),
        }
    }
}

impl AlignmentReader {
    /// Opens an alignment file and reads its header.
    ///
    /// # Errors
    ///
    /// Returns [`BinnieError::InputOpen`] when the file cannot be opened, has
    /// an unsupported extension, or its header cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(Self, Header)> {
        let path = path.as_ref();
        let open_err = |source: io::Error| BinnieError::InputOpen {
            path: path.display().to_string(),
            source,
        };

        let format = detect_format(path).ok_or_else(|| open_err(unsupported(path)))?;
        let file = File::open(path).map_err(open_err)?;

        match format {
            Format::Bam => {
                let mut reader = bam::io::Reader::new(file);
                let header = reader.read_header().map_err(open_err)?;
                Ok((AlignmentReader::Bam(reader), header))
            }
            Format::Sam => {
                let mut reader = sam::io::Reader::new(BufReader::new(file));
                let header = reader.read_header().map_err(open_err)?;
                Ok((AlignmentReader::Sam(reader), header))
            }
        }
    }

    /// Iterates over the records of the file.
    pub fn records<'a>(
        &'a mut self,
        header: &'a Header,
    ) -> Box<dyn Iterator<Item = io::Result<RecordBuf>> + 'a> {
        match self {
            AlignmentReader::Bam(reader) => Box::new(reader.record_bufs(header)),
            AlignmentReader::Sam(reader) => Box::new(reader.record_bufs(header)),
        }
    }
}

/// Writer to a SAM or BAM file.
pub enum AlignmentWriter {
    /// BGZF-compressed BAM output
    Bam(bam::io::Writer<noodles::bgzf::Writer<File>>),
    /// Plain-text SAM output
    Sam(sam::io::Writer<BufWriter<File>>),
}

impl fmt::Debug for AlignmentWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentWriter::Bam(_) => f.write_str("AlignmentWriter::Bam(..)"),
            AlignmentWriter::Sam(_) => f.write_str("AlignmentWriter::Sam(..)"),
        }
    }
}

impl AlignmentWriter {
    /// Creates an alignment file and writes the header.
    ///
    /// # Errors
    ///
    /// Returns [`BinnieError::OutputOpen`] when the file cannot be created,
    /// has an unsupported extension, or the header cannot be written.
    pub fn create<P: AsRef<Path>>(path: P, header: &Header) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |source: io::Error| BinnieError::OutputOpen {
            path: path.display().to_string(),
            source,
        };

        let format = detect_format(path).ok_or_else(|| open_err(unsupported(path)))?;
        let file = File::create(path).map_err(open_err)?;

        match format {
            Format::Bam => {
                let mut writer = bam::io::Writer::new(file);
                writer.write_header(header).map_err(open_err)?;
                Ok(AlignmentWriter::Bam(writer))
            }
            Format::Sam => {
                let mut writer = sam::io::Writer::new(BufWriter::new(file));
                writer.write_header(header).map_err(open_err)?;
                Ok(AlignmentWriter::Sam(writer))
            }
        }
    }

    /// Writes one record.
    ///
    /// # Errors
    ///
    /// Propagates the underlying I/O failure.
    pub fn write_record(&mut self, header: &Header, record: &RecordBuf) -> io::Result<()> {
        match self {
            AlignmentWriter::Bam(writer) => writer.write_alignment_record(header, record),
            AlignmentWriter::Sam(writer) => writer.write_alignment_record(header, record),
        }
    }

    /// Flushes and finalises the output (BAM gets its EOF block).
    ///
    /// # Errors
    ///
    /// Propagates the underlying I/O failure.
    pub fn finish(self, header: &Header) -> io::Result<()> {
        match self {
            AlignmentWriter::Bam(mut writer) => writer.finish(header),
            AlignmentWriter::Sam(writer) => writer.into_inner().flush(),
        }
    }
}
