//! `binnie`: partition reads between an original and a bridge reference
//!
//! Reads two co-ordered alignment streams in lock-step: the *original* file
//! (reads aligned to the full original reference, coordinate sorted) and the
//! *bridge* file (the same reads re-aligned to the smaller bridge reference,
//! in the same read order, possibly with records missing). Each original read
//! is matched to at most one bridge read by template identity and routed to
//! one of three output files:
//!
//! - **unchanged** - the original alignment stands
//! - **bridged** - the bridge alignment replaces the original
//! - **remap** - the read must be re-aligned against the merged reference
//!
//! All reads of one template leave through the same bin; mates that disagree
//! are promoted to remap together. Output order follows the original's
//! coordinate order, maintained through a bounded buffer (`--buffer_size`
//! reads / `--max_buffer_bases` bases).

use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};

use bridgebuilder_lib::bam_io::{AlignmentReader, AlignmentWriter};
use bridgebuilder_lib::binner::Bin;
use bridgebuilder_lib::errors::BinnieError;
use bridgebuilder_lib::logging::{OperationTimer, format_count};
use bridgebuilder_lib::pipeline::{self, BinSink, BinnieConfig};
use bridgebuilder_lib::validation::validate_files_exist;
use noodles::sam::Header;
use noodles::sam::alignment::record_buf::RecordBuf;

/// Command-line arguments for `binnie`
#[derive(Parser, Debug)]
#[command(
    name = "binnie",
    about = "Partition reads into unchanged/bridged/remap bins",
    long_about = "\
Partitions reads from an original-reference alignment into three output files
depending on how each read fared when re-aligned to the bridge reference.

Both inputs must be coordinate sorted with unmapped reads at the end, and the
bridge must contain the original's reads in the same order (records may be
missing where a read did not map to the bridge). Reads sharing a template
always land in the same output file."
)]
pub struct Binnie {
    /// Input original-reference alignment file (.bam or .sam)
    pub original: PathBuf,

    /// Input bridge-reference alignment file (.bam or .sam)
    pub bridge: PathBuf,

    /// Output file for unchanged reads (default: <original>_unchanged.bam)
    #[arg(long = "unchanged_out")]
    pub unchanged_out: Option<PathBuf>,

    /// Output file for bridged reads (default: <original>_bridged.bam)
    #[arg(long = "bridged_out")]
    pub bridged_out: Option<PathBuf>,

    /// Output file for reads to remap (default: <original>_remap.bam)
    #[arg(long = "remap_out")]
    pub remap_out: Option<PathBuf>,

    /// Flush the buffer once it holds this many reads (0 disables)
    #[arg(long = "buffer_size", default_value_t = pipeline::DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,

    /// Flush the buffer once it spans this many bases (0 disables)
    #[arg(long = "max_buffer_bases", default_value_t = pipeline::DEFAULT_BUFFER_BASES)]
    pub max_buffer_bases: i32,

    /// Match reads by qname alone, ignoring RG tags (for bridge files that
    /// lost their read groups)
    #[arg(long = "ignore_rg")]
    pub ignore_rg: bool,

    /// Treat unmapped reads placed at their mate's coordinates as sorted
    #[arg(long = "allow_sorted_unmapped")]
    pub allow_sorted_unmapped: bool,
}

/// The three output sinks with the headers they inherit.
///
/// Unchanged and remap carry original-reference records and inherit the
/// original's header; bridged carries bridge-reference records and inherits
/// the bridge's header. Headers are written on creation, before any record.
struct BinSinks {
    unchanged: AlignmentWriter,
    bridged: AlignmentWriter,
    remap: AlignmentWriter,
    original_header: Header,
    bridge_header: Header,
}

impl BinSinks {
    fn create(
        unchanged_path: &Path,
        bridged_path: &Path,
        remap_path: &Path,
        original_header: Header,
        bridge_header: Header,
    ) -> Result<Self, BinnieError> {
        Ok(Self {
            unchanged: AlignmentWriter::create(unchanged_path, &original_header)?,
            bridged: AlignmentWriter::create(bridged_path, &bridge_header)?,
            remap: AlignmentWriter::create(remap_path, &original_header)?,
            original_header,
            bridge_header,
        })
    }

    fn finish(self) -> Result<(), BinnieError> {
        let close = |bin: Bin, writer: AlignmentWriter, header: &Header| {
            writer.finish(header).map_err(|source| BinnieError::Write {
                bin: bin.name().to_string(),
                source,
            })
        };
        close(Bin::Unchanged, self.unchanged, &self.original_header)?;
        close(Bin::Bridged, self.bridged, &self.bridge_header)?;
        close(Bin::Remap, self.remap, &self.original_header)?;
        Ok(())
    }
}

impl BinSink for BinSinks {
    fn write(&mut self, bin: Bin, record: &RecordBuf) -> Result<(), BinnieError> {
        let result = match bin {
            Bin::Unchanged => self.unchanged.write_record(&self.original_header, record),
            Bin::Bridged => self.bridged.write_record(&self.bridge_header, record),
            Bin::Remap => self.remap.write_record(&self.original_header, record),
        };
        result.map_err(|source| BinnieError::Write { bin: bin.name().to_string(), source })
    }
}

/// Default output path: the given suffix appended to the original path.
fn default_output(original: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{suffix}", original.display()))
}

impl crate::commands::command::Command for Binnie {
    fn execute(&self) -> Result<()> {
        validate_files_exist(&[
            (self.original.as_path(), "Original alignment file"),
            (self.bridge.as_path(), "Bridge alignment file"),
        ])?;

        let (mut original_reader, original_header) = AlignmentReader::open(&self.original)?;
        let (mut bridge_reader, bridge_header) = AlignmentReader::open(&self.bridge)?;
        info!(
            "original has {} targets, bridge has {} targets",
            original_header.reference_sequences().len(),
            bridge_header.reference_sequences().len()
        );

        let unchanged_path = self
            .unchanged_out
            .clone()
            .unwrap_or_else(|| default_output(&self.original, "_unchanged.bam"));
        let bridged_path = self
            .bridged_out
            .clone()
            .unwrap_or_else(|| default_output(&self.original, "_bridged.bam"));
        let remap_path =
            self.remap_out.clone().unwrap_or_else(|| default_output(&self.original, "_remap.bam"));

        // All sinks are opened (and headers written) before processing begins
        let mut sinks = BinSinks::create(
            &unchanged_path,
            &bridged_path,
            &remap_path,
            original_header.clone(),
            bridge_header.clone(),
        )?;

        let config = BinnieConfig {
            buffer_size: self.buffer_size,
            max_buffer_bases: self.max_buffer_bases,
            ignore_rg: self.ignore_rg,
            allow_sorted_unmapped: self.allow_sorted_unmapped,
        };

        let timer = OperationTimer::new("Binning reads");
        let stats = {
            let originals =
                original_reader.records(&original_header).enumerate().map(|(i, result)| {
                    result.map_err(|source| BinnieError::ReadOriginal {
                        read_count: i as u64,
                        source,
                    })
                });
            let bridges = bridge_reader.records(&bridge_header).enumerate().map(|(i, result)| {
                result.map_err(|source| BinnieError::ReadBridge { read_count: i as u64, source })
            });
            pipeline::run(&config, originals, bridges, &mut sinks)?
        };
        sinks.finish()?;
        timer.log_completion(stats.original_reads);

        info!(
            "read {} original and {} bridge records",
            format_count(stats.original_reads),
            format_count(stats.bridge_reads)
        );
        info!("  unchanged: {} -> {}", format_count(stats.unchanged), unchanged_path.display());
        info!("  bridged:   {} -> {}", format_count(stats.bridged), bridged_path.display());
        info!("  remap:     {} -> {}", format_count(stats.remap), remap_path.display());
        if stats.discarded > 0 {
            info!("  discarded {} secondary alignments", format_count(stats.discarded));
        }

        Ok(())
    }
}
