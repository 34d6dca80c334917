//! The binning pipeline: lock-step consumption of the original and bridge
//! streams, per-read binning, template-aware buffering, and the bounded
//! buffered-flush protocol (component C4 driving C1–C3).
//!
//! The pipeline is a one-shot, single-threaded pass. All mutable state (the
//! buffer, its chain index, the sort-order trackers, the bridge look-ahead)
//! is owned by the pipeline value; the three output sinks are written
//! sequentially in flush order.

use log::{debug, info, warn};
use noodles::sam::alignment::record_buf::RecordBuf;

use crate::binner::{Bin, Binner};
use crate::buffer::TemplateBuffer;
use crate::errors::{BinnieError, Result};
use crate::pair_reader::PairedStreamReader;
use crate::progress::ProgressTracker;

/// Default buffer capacity in reads.
pub const DEFAULT_BUFFER_SIZE: usize = 1_000_000;

/// Default buffer span in bases.
pub const DEFAULT_BUFFER_BASES: i32 = 10_000;

/// Configuration for a binning run.
///
/// An explicit record passed into the pipeline constructor; no process-wide
/// mutable state is involved.
#[derive(Debug, Clone)]
pub struct BinnieConfig {
    /// Flush when the buffer holds at least this many reads (0 disables)
    pub buffer_size: usize,
    /// Flush when the buffered position span reaches this many bases
    /// (0 disables)
    pub max_buffer_bases: i32,
    /// Match originals to bridge records by qname alone, ignoring RG
    pub ignore_rg: bool,
    /// Let unmapped reads report their placed coordinates for sort checking
    pub allow_sorted_unmapped: bool,
}

impl Default for BinnieConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_buffer_bases: DEFAULT_BUFFER_BASES,
            ignore_rg: false,
            allow_sorted_unmapped: false,
        }
    }
}

/// Destination for binned records.
///
/// The pipeline does not know how records are serialised; the caller supplies
/// a sink that routes each record to the out file for its bin.
pub trait BinSink {
    /// Writes one record to the sink for `bin`.
    ///
    /// # Errors
    ///
    /// Returns [`BinnieError::Write`] when the underlying write fails.
    fn write(&mut self, bin: Bin, record: &RecordBuf) -> Result<()>;
}

/// Counters reported after a completed run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    /// Records read from the original stream
    pub original_reads: u64,
    /// Records read from the bridge stream
    pub bridge_reads: u64,
    /// Records written to the unchanged bin
    pub unchanged: u64,
    /// Records written to the bridged bin
    pub bridged: u64,
    /// Records written to the remap bin
    pub remap: u64,
    /// Mapped secondary alignments discarded
    pub discarded: u64,
    /// Largest number of reads buffered at once (while on mapped reads)
    pub max_buffered: usize,
}

impl PipelineStats {
    /// Total records written across the three sinks.
    #[must_use]
    pub fn total_written(&self) -> u64 {
        self.unchanged + self.bridged + self.remap
    }
}

/// Runs the binning pipeline over two record streams.
///
/// # Errors
///
/// Propagates every fatal condition of the pipeline contract: read and write
/// failures, sort-order violations, truncated originals, contradictory mate
/// expectations, and internal invariant violations.
pub fn run<O, B, S>(
    config: &BinnieConfig,
    originals: O,
    bridges: B,
    sink: &mut S,
) -> Result<PipelineStats>
where
    O: Iterator<Item = Result<RecordBuf>>,
    B: Iterator<Item = Result<RecordBuf>>,
    S: BinSink,
{
    run_with_binner(
        config,
        Binner::new(config.ignore_rg, config.allow_sorted_unmapped),
        originals,
        bridges,
        sink,
    )
}

/// Runs the pipeline with a caller-configured [`Binner`] (used to install a
/// coordinates-deleted predicate).
///
/// # Errors
///
/// As [`run`].
pub fn run_with_binner<O, B, S>(
    config: &BinnieConfig,
    binner: Binner,
    originals: O,
    bridges: B,
    sink: &mut S,
) -> Result<PipelineStats>
where
    O: Iterator<Item = Result<RecordBuf>>,
    B: Iterator<Item = Result<RecordBuf>>,
    S: BinSink,
{
    let mut reader = PairedStreamReader::new(originals, bridges, config.ignore_rg);
    let mut pipeline = Pipeline::new(config, binner, sink);
    let progress = ProgressTracker::new("processed original reads").with_interval(1_000_000);

    while let Some((original, bridge)) = reader.next_pair()? {
        pipeline.process(original, bridge)?;
        progress.log_if_needed(1);
    }
    progress.log_final();

    pipeline.drain()?;
    reader.finish()?;
    pipeline.check_empty()?;

    let mut stats = pipeline.into_stats();
    stats.bridge_reads = reader.bridge_count();

    info!(
        "finished processing reads. had a maximum of {} reads in buffer (not counting unmapped reads).",
        stats.max_buffered
    );
    if config.buffer_size > 0
        && config.max_buffer_bases > 0
        && stats.max_buffered >= config.buffer_size
    {
        warn!("buffer was limited by size ({} reads) rather than bases", stats.max_buffered);
    }

    Ok(stats)
}

/// Pipeline state: the binner, the template buffer, the sort-order trackers,
/// and the flush bookkeeping.
struct Pipeline<'a, S> {
    config: BinnieConfig,
    binner: Binner,
    buffer: TemplateBuffer,
    sink: &'a mut S,
    stats: PipelineStats,
    last_refid: i32,
    last_pos: i32,
    buffer_first_pos: i32,
    buffer_last_pos: i32,
    new_refid: bool,
    first_read: bool,
}

impl<'a, S: BinSink> Pipeline<'a, S> {
    fn new(config: &BinnieConfig, binner: Binner, sink: &'a mut S) -> Self {
        Self {
            config: config.clone(),
            binner,
            buffer: TemplateBuffer::new(),
            sink,
            stats: PipelineStats::default(),
            last_refid: 0,
            last_pos: 0,
            buffer_first_pos: 0,
            buffer_last_pos: 0,
            new_refid: false,
            first_read: false,
        }
    }

    /// Processes one original read (with its optional bridge match): bin,
    /// verify sort order, buffer, and run the flush loop.
    fn process(&mut self, original: RecordBuf, bridge: Option<RecordBuf>) -> Result<()> {
        self.stats.original_reads += 1;

        let Some(binned) = self.binner.bin(original, bridge)? else {
            self.stats.discarded += 1;
            return Ok(());
        };

        let refid = binned.original_refid;
        let pos = binned.original_pos;
        self.check_sort_order(refid, pos, &binned.template_id.qname_lossy())?;

        if self.new_refid || !self.first_read {
            if refid >= 0 {
                info!("processing original reads mapped to reference id [{refid}]");
            } else {
                info!("processing original unmapped reads");
            }
            self.first_read = true;
        }

        debug!(
            "buffering read qname=[{}] refid=[{refid}] pos=[{pos}] bin=[{}]",
            binned.template_id.qname_lossy(),
            binned.bin.name()
        );

        let was_empty = self.buffer.is_empty();
        self.buffer.enqueue(binned)?;
        self.buffer_last_pos = pos;
        if was_empty {
            self.buffer_first_pos = self.buffer_last_pos;
        }
        if refid >= 0 && self.buffer.len() > self.stats.max_buffered {
            self.stats.max_buffered = self.buffer.len();
        }

        self.flush(false)
    }

    /// Verifies the input's (refid, pos) sort order against the previous
    /// read, updating the trackers and the `new_refid` one-shot flag.
    ///
    /// Unmapped coordinates (−1) sort after all mapped values, so a −1 never
    /// counts as a decrease but a transition away from −1 does.
    fn check_sort_order(&mut self, refid: i32, pos: i32, qname: &str) -> Result<()> {
        let read_count = self.stats.original_reads;

        if refid < self.last_refid && refid != -1 && self.last_refid != -1 {
            return Err(BinnieError::BamUnsorted {
                message: format!(
                    "current refid [{refid}] was less than the last one [{}]",
                    self.last_refid
                ),
                read_count,
                qname: qname.to_string(),
            });
        }
        if self.last_refid == -1 && refid != -1 {
            return Err(BinnieError::BamUnsorted {
                message: format!("current refid [{refid}] was set but last refid was unmapped"),
                read_count,
                qname: qname.to_string(),
            });
        }

        if refid != self.last_refid && read_count > 1 {
            debug!("reference id now [{refid}]");
            self.new_refid = true;
            self.last_pos = if refid == -1 { -1 } else { 0 };
        } else {
            self.new_refid = false;
        }

        if pos < self.last_pos && pos != -1 && self.last_pos != -1 {
            return Err(BinnieError::BamUnsorted {
                message: format!(
                    "current pos [{pos}] was less than the last one [{}]",
                    self.last_pos
                ),
                read_count,
                qname: qname.to_string(),
            });
        }
        if self.last_pos == -1 && pos != -1 {
            return Err(BinnieError::BamUnsorted {
                message: format!("current pos [{pos}] was set but last pos was unmapped"),
                read_count,
                qname: qname.to_string(),
            });
        }

        self.last_refid = refid;
        self.last_pos = pos;
        Ok(())
    }

    /// The buffered-flush protocol. Emits from the head of the buffer while
    /// any trigger holds: input exhausted (`drain`), a reference change, the
    /// read-count limit, or the position-span limit.
    fn flush(&mut self, drain: bool) -> Result<()> {
        while (drain && !self.buffer.is_empty())
            || (self.new_refid && !self.buffer.is_empty())
            || (self.config.buffer_size > 0 && self.buffer.len() >= self.config.buffer_size)
            || (self.config.max_buffer_bases > 0
                && (self.buffer_last_pos - self.buffer_first_pos) >= self.config.max_buffer_bases)
        {
            let read = self.buffer.pop_front()?.ok_or_else(|| BinnieError::BufferRemove {
                context: "flush trigger held but buffer was empty".into(),
            })?;

            debug!(
                "writing read qname=[{}] to {} output bin (mate_count=[{}] expected=[{}])",
                read.template_id.qname_lossy(),
                read.bin.name(),
                read.observed_mate_count,
                read.expected_mate_count
            );

            self.sink.write(read.bin, &read.record)?;
            match read.bin {
                Bin::Unchanged => self.stats.unchanged += 1,
                Bin::Bridged => self.stats.bridged += 1,
                Bin::Remap => self.stats.remap += 1,
            }

            match self.buffer.peek_front() {
                Some(head) => self.buffer_first_pos = head.original_pos,
                None => {
                    self.buffer_first_pos = 0;
                    self.buffer_last_pos = 0;
                }
            }
        }
        Ok(())
    }

    /// Drains the buffer once the input stream is exhausted.
    fn drain(&mut self) -> Result<()> {
        self.flush(true)
    }

    /// Post-condition: nothing may remain buffered after the final drain.
    fn check_empty(&self) -> Result<()> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(BinnieError::BufferNotEmpty { remaining: self.buffer.len() })
        }
    }

    fn into_stats(self) -> PipelineStats {
        self.stats
    }
}
