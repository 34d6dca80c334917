//! Lock-step reader over the original and bridge streams.
//!
//! The bridge stream is produced by re-aligning the original's reads against
//! the bridge reference, so bridge records appear in the same stream order as
//! the originals they correspond to; the bridge may omit records (reads that
//! were not mappable onto the bridge) but must never run past the originals.
//!
//! Matching uses a single-record look-ahead on the bridge side: each original
//! is compared against the pending bridge record by template identity and
//! paired with it on a match, or yielded alone otherwise.

use noodles::sam::alignment::record_buf::RecordBuf;

use crate::errors::{BinnieError, Result};
use crate::sam::record_utils::{self, TemplateId};

/// Synchronised reader over the original and bridge record streams
/// (component C1).
pub struct PairedStreamReader<O, B> {
    originals: O,
    bridges: B,
    lookahead: Option<RecordBuf>,
    bridge_done: bool,
    ignore_rg: bool,
    bridge_count: u64,
}

impl<O, B> PairedStreamReader<O, B>
where
    O: Iterator<Item = Result<RecordBuf>>,
    B: Iterator<Item = Result<RecordBuf>>,
{
    /// Creates a paired reader over two record streams.
    pub fn new(originals: O, bridges: B, ignore_rg: bool) -> Self {
        Self { originals, bridges, lookahead: None, bridge_done: false, ignore_rg, bridge_count: 0 }
    }

    /// Number of bridge records pulled so far.
    #[must_use]
    pub fn bridge_count(&self) -> u64 {
        self.bridge_count
    }

    /// Yields the next original together with its bridge match, if any.
    ///
    /// Returns `Ok(None)` once the original stream is exhausted; call
    /// [`finish`](Self::finish) afterwards to run the end-of-input checks.
    ///
    /// # Errors
    ///
    /// Propagates read failures from either stream and identity-formation
    /// failures from malformed records.
    pub fn next_pair(&mut self) -> Result<Option<(RecordBuf, Option<RecordBuf>)>> {
        let original = self.originals.next().transpose()?;

        if self.lookahead.is_none() && !self.bridge_done {
            match self.bridges.next().transpose()? {
                Some(bridge) => {
                    self.bridge_count += 1;
                    self.lookahead = Some(bridge);
                }
                None => self.bridge_done = true,
            }
        }

        let Some(original) = original else {
            return Ok(None);
        };

        let matched = match &self.lookahead {
            Some(bridge) => {
                TemplateId::from_record(&original, self.ignore_rg)?
                    == TemplateId::from_record(bridge, self.ignore_rg)?
            }
            None => false,
        };

        let bridge = if matched { self.lookahead.take() } else { None };
        Ok(Some((original, bridge)))
    }

    /// End-of-input protocol: the bridge look-ahead and tail must both be
    /// empty once the originals are exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`BinnieError::OrigTruncated`] when bridge records remain.
    pub fn finish(&mut self) -> Result<()> {
        if self.lookahead.is_none() && !self.bridge_done {
            match self.bridges.next().transpose()? {
                Some(bridge) => {
                    self.bridge_count += 1;
                    self.lookahead = Some(bridge);
                }
                None => self.bridge_done = true,
            }
        }

        if let Some(bridge) = &self.lookahead {
            return Err(BinnieError::OrigTruncated {
                read_count: self.bridge_count,
                qname: String::from_utf8_lossy(record_utils::qname(bridge)).into_owned(),
            });
        }
        Ok(())
    }
}
