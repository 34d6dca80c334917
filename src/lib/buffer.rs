//! Template-aware output buffer.
//!
//! Binned reads wait here until the flush controller releases them, so that
//! all reads of one template can be forced to agree on a destination bin.
//! Reads live in an owning arena and are addressed by small integer handles;
//! reads sharing a template identity are linked into a doubly-linked mate
//! chain in insertion order, and a hash index maps each template identity to
//! the head of its chain.
//!
//! Invariants:
//!
//! - at most one chain exists per template identity, and membership is
//!   testable in expected constant time;
//! - chain links are mutually consistent (`prev.next == self`,
//!   `next.prev == self`), with no `prev` on the head and no `next` on the
//!   tail;
//! - all links of a chain carry the same bin, restored lazily by rewriting
//!   the whole chain to Remap whenever a newly attached link disagrees;
//! - emission order equals insertion order.

use std::collections::{HashMap, VecDeque};

use crate::binner::{Bin, BinnedRead};
use crate::errors::{BinnieError, Result};
use crate::sam::TemplateId;

/// Handle of a buffered read within the arena.
pub type ReadHandle = usize;

/// Append-only FIFO of binned reads indexed by template identity
/// (component C3).
#[derive(Debug, Default)]
pub struct TemplateBuffer {
    /// Arena of buffered reads; `None` slots are free for reuse
    slots: Vec<Option<BinnedRead>>,
    /// Free slot handles available for reuse
    free: Vec<ReadHandle>,
    /// Emission order
    fifo: VecDeque<ReadHandle>,
    /// Template identity to the head handle of its mate chain
    chains: HashMap<TemplateId, ReadHandle>,
}

impl TemplateBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered reads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    /// True when no reads are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fifo.is_empty()
    }

    /// True when a chain exists for the given template identity.
    #[must_use]
    pub fn contains(&self, template_id: &TemplateId) -> bool {
        self.chains.contains_key(template_id)
    }

    /// Inserts a read, linking it to any buffered mates.
    ///
    /// When mates are present, every existing link's observed mate count is
    /// incremented (and the new link's count ends up equal to the prior chain
    /// length), known expected mate counts are propagated over unknown ones
    /// in both directions, and if any link's bin disagrees with the new one
    /// the entire chain is rewritten to Remap.
    ///
    /// # Errors
    ///
    /// Returns [`BinnieError::UnexpectedMates`] when a mate arrives for a
    /// template that declared it had none, and internal invariant errors if
    /// the chain links are inconsistent.
    pub fn enqueue(&mut self, mut read: BinnedRead) -> Result<()> {
        match self.chains.get(&read.template_id).copied() {
            None => {
                let template_id = read.template_id.clone();
                let handle = self.insert_slot(read);
                self.chains.insert(template_id, handle);
                self.fifo.push_back(handle);
            }
            Some(head) => {
                let chain = self.chain_handles(head)?;

                // A mate arrived for a template that declared it had none
                let head_expected = self.get(head)?.expected_mate_count;
                if read.expected_mate_count == 0 || head_expected == 0 {
                    return Err(BinnieError::UnexpectedMates {
                        read_group: read.template_id.read_group_lossy(),
                        qname: read.template_id.qname_lossy(),
                    });
                }

                let mut all_bins_agree = true;
                for &handle in &chain {
                    let known_expected = read.expected_mate_count;
                    let link = self.get_mut(handle)?;
                    link.observed_mate_count += 1;
                    read.observed_mate_count += 1;
                    if link.expected_mate_count < 0 && known_expected >= 0 {
                        link.expected_mate_count = known_expected;
                    } else if read.expected_mate_count < 0 && link.expected_mate_count >= 0 {
                        read.expected_mate_count = link.expected_mate_count;
                    }
                    if link.bin != read.bin {
                        all_bins_agree = false;
                    }
                }

                let tail = *chain.last().ok_or_else(|| BinnieError::Null {
                    context: "mate chain for registered template was empty".into(),
                })?;
                if self.get(tail)?.next_mate.is_some() {
                    return Err(BinnieError::NotNull {
                        context: "expected end of mate chain but next_mate was set".into(),
                    });
                }

                read.prev_mate = Some(tail);
                let handle = self.insert_slot(read);
                self.get_mut(tail)?.next_mate = Some(handle);
                self.fifo.push_back(handle);

                if !all_bins_agree {
                    for handle in chain.into_iter().chain([handle]) {
                        self.get_mut(handle)?.bin = Bin::Remap;
                    }
                }
            }
        }
        Ok(())
    }

    /// The read at the front of the FIFO, if any.
    #[must_use]
    pub fn peek_front(&self) -> Option<&BinnedRead> {
        let &handle = self.fifo.front()?;
        self.slots.get(handle).and_then(Option::as_ref)
    }

    /// Removes and returns the read at the front of the FIFO.
    ///
    /// The popped read is always the head of its mate chain (chains grow at
    /// the tail in insertion order); the chain index is re-pointed at the
    /// next link, or dropped when the chain is exhausted.
    ///
    /// # Errors
    ///
    /// Returns internal invariant errors when the FIFO, arena, and chain
    /// index disagree.
    pub fn pop_front(&mut self) -> Result<Option<BinnedRead>> {
        let Some(handle) = self.fifo.pop_front() else {
            return Ok(None);
        };
        let read = self
            .slots
            .get_mut(handle)
            .and_then(Option::take)
            .ok_or_else(|| BinnieError::BufferRemove {
                context: format!("buffered read handle {handle} had no backing slot"),
            })?;
        self.free.push(handle);

        if read.prev_mate.is_some() {
            return Err(BinnieError::NotNull {
                context: "front of buffer was not the head of its mate chain".into(),
            });
        }

        match read.next_mate {
            Some(next) => {
                self.get_mut(next)?.prev_mate = None;
                self.chains.insert(read.template_id.clone(), next);
            }
            None => {
                self.chains.remove(&read.template_id);
            }
        }

        Ok(Some(read))
    }

    /// Collects the handles of a chain from its head to its tail.
    fn chain_handles(&self, head: ReadHandle) -> Result<Vec<ReadHandle>> {
        let mut handles = Vec::new();
        let mut cursor = Some(head);
        while let Some(handle) = cursor {
            handles.push(handle);
            cursor = self.get(handle)?.next_mate;
        }
        Ok(handles)
    }

    fn insert_slot(&mut self, read: BinnedRead) -> ReadHandle {
        match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = Some(read);
                handle
            }
            None => {
                self.slots.push(Some(read));
                self.slots.len() - 1
            }
        }
    }

    fn get(&self, handle: ReadHandle) -> Result<&BinnedRead> {
        self.slots.get(handle).and_then(Option::as_ref).ok_or_else(|| BinnieError::Null {
            context: format!("mate chain referenced missing read handle {handle}"),
        })
    }

    fn get_mut(&mut self, handle: ReadHandle) -> Result<&mut BinnedRead> {
        self.slots.get_mut(handle).and_then(Option::as_mut).ok_or_else(|| BinnieError::Null {
            context: format!("mate chain referenced missing read handle {handle}"),
        })
    }
}
