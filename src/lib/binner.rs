//! Per-read binning decision.
//!
//! The [`Binner`] examines an original read and its optional bridge-mapped
//! counterpart and decides which output bin the read belongs to:
//!
//! ```text
//! --------------------------------------
//! Original  Bridge    Bin
//! --------------------------------------
//! Unmapped  Unmapped  Unchanged
//! Unmapped  MAPQ >= 0 Bridged
//! MAPQ == 0 Unmapped  Unchanged
//! MAPQ == 0 MAPQ == 0 Unchanged
//! MAPQ == 0 MAPQ > 0  Remap
//! MAPQ > 0  Unmapped  Unchanged
//! MAPQ > 0  MAPQ == 0 Remap
//! MAPQ > 0  MAPQ > 0  Remap
//! Deleted   (any)     Remap
//! Secondary (any)     (discard)
//! --------------------------------------
//! ```
//!
//! A missing bridge read counts as Unmapped. Bridged is the only bin where
//! the bridge's alignment becomes the output record; before wrapping it the
//! pairing flags and the `FI` tag (and `RG` when read-group matching is off)
//! are carried over from the original.

use log::warn;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::alignment::record_buf::data::field::Value;

use crate::errors::Result;
use crate::sam::record_utils::{
    self, MappingQuality, SEGMENT_INDEX_TAG, TemplateId, read_group, segment_count,
};

/// Output destination for a binned read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bin {
    /// The original alignment stands
    Unchanged,
    /// The bridge alignment replaces the original
    Bridged,
    /// The read must be re-aligned to the merged reference
    Remap,
}

impl Bin {
    /// Human-readable bin name for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Bin::Unchanged => "UNCHANGED",
            Bin::Bridged => "BRIDGED",
            Bin::Remap => "REMAP",
        }
    }
}

/// A read that has been assigned a tentative bin.
///
/// Holds the record that will eventually be written (the bridge's for
/// Bridged, the original's otherwise) along with the original coordinates
/// used for sort-order bookkeeping and the mate-count state maintained by the
/// template buffer. `prev_mate`/`next_mate` are handles into the buffer's
/// arena, linking all buffered reads of the same template in insertion order.
#[derive(Debug)]
pub struct BinnedRead {
    /// Identity of the template this read belongs to
    pub template_id: TemplateId,
    /// The alignment record destined for the output
    pub record: RecordBuf,
    /// Tentative output bin; may be rewritten to Remap by the buffer
    pub bin: Bin,
    /// Reference id of the original alignment
    pub original_refid: i32,
    /// 0-based position of the original alignment
    pub original_pos: i32,
    /// Number of mates expected for this template, −1 when unknown
    pub expected_mate_count: i32,
    /// Number of mates seen in the buffer so far
    pub observed_mate_count: i32,
    /// Handle of the previous read in this template's mate chain
    pub(crate) prev_mate: Option<usize>,
    /// Handle of the next read in this template's mate chain
    pub(crate) next_mate: Option<usize>,
}

/// Predicate deciding whether a read's original coordinates were deleted by
/// the bridge construction. Supplied by the caller; the pipeline itself has
/// no way to evaluate this.
pub type CoordDeletedFn = Box<dyn Fn(&RecordBuf) -> bool>;

/// Pure per-read binning decision (component C2).
pub struct Binner {
    ignore_rg: bool,
    allow_sorted_unmapped: bool,
    coord_deleted: Option<CoordDeletedFn>,
}

impl Binner {
    /// Creates a binner.
    #[must_use]
    pub fn new(ignore_rg: bool, allow_sorted_unmapped: bool) -> Self {
        Self { ignore_rg, allow_sorted_unmapped, coord_deleted: None }
    }

    /// Installs a predicate for the "original coordinates deleted" check.
    ///
    /// Without one the Deleted row of the decision table is unreachable.
    #[must_use]
    pub fn with_coord_deleted(mut self, predicate: CoordDeletedFn) -> Self {
        self.coord_deleted = Some(predicate);
        self
    }

    /// Decides the bin for one original read and its optional bridge match.
    ///
    /// Returns `None` when the read is discarded (mapped secondary
    /// alignments); both records are dropped in that case.
    ///
    /// # Errors
    ///
    /// Fails when the template identity cannot be formed or the segment count
    /// is contradictory (see [`segment_count`]).
    pub fn bin(&self, original: RecordBuf, bridge: Option<RecordBuf>) -> Result<Option<BinnedRead>> {
        let flags = original.flags();
        if !flags.is_unmapped() && flags.is_secondary() {
            return Ok(None);
        }

        if !self.ignore_rg && original.data().get(&Tag::READ_GROUP).is_none() {
            warn!(
                "read qname=[{}] has no RG tag; using empty read group for template identity",
                String::from_utf8_lossy(record_utils::qname(&original)),
            );
        }

        if self.coord_deleted.as_ref().is_some_and(|deleted| deleted(&original)) {
            return self.binned(original, None, Bin::Remap).map(Some);
        }

        let original_mq = MappingQuality::from_record(&original);
        let bridge_mq = bridge.as_ref().map(MappingQuality::from_record);

        let binned = match (original_mq, bridge_mq) {
            // No bridge record, or bridge unmapped: the original stands
            (_, None) | (_, Some(MappingQuality::Unmapped)) => {
                self.binned(original, None, Bin::Unchanged)?
            }
            // Only an unmapped original adopts the bridge's alignment
            (MappingQuality::Unmapped, Some(_)) => {
                let mut bridge = bridge.expect("bridge present in matched arm");
                fixup_bridge_from_original(&mut bridge, &original, self.ignore_rg);
                self.binned(bridge, Some(&original), Bin::Bridged)?
            }
            (MappingQuality::Zero, Some(MappingQuality::Zero)) => {
                self.binned(original, None, Bin::Unchanged)?
            }
            (MappingQuality::Zero, Some(MappingQuality::Positive(_)))
            | (MappingQuality::Positive(_), Some(_)) => self.binned(original, None, Bin::Remap)?,
        };

        Ok(Some(binned))
    }

    /// Wraps a record into a [`BinnedRead`], recording the original's
    /// coordinates (`coord_source` is the original when the bridge record was
    /// chosen) and the expected mate count derived from the chosen record.
    fn binned(
        &self,
        record: RecordBuf,
        coord_source: Option<&RecordBuf>,
        bin: Bin,
    ) -> Result<BinnedRead> {
        let coords = coord_source.unwrap_or(&record);
        let template_id = TemplateId::from_record(&record, self.ignore_rg)?;
        let expected_mate_count = segment_count(&record)? - 1;
        Ok(BinnedRead {
            template_id,
            bin,
            original_refid: record_utils::refid(coords, self.allow_sorted_unmapped),
            original_pos: record_utils::pos(coords, self.allow_sorted_unmapped),
            expected_mate_count,
            observed_mate_count: 0,
            prev_mate: None,
            next_mate: None,
            record,
        })
    }
}

/// Carries pairing state from the original read over to the bridge read
/// before the bridge alignment is emitted in its place.
///
/// The PAIRED/READ1/READ2 flags are OR-ed in where the original has them set;
/// the `FI` tag replaces any bridge `FI`; `RG` is copied only when read-group
/// matching is off (otherwise the two are already known to agree).
fn fixup_bridge_from_original(bridge: &mut RecordBuf, original: &RecordBuf, ignore_rg: bool) {
    let original_flags = original.flags();
    let mut flags = bridge.flags();
    for flag in [Flags::SEGMENTED, Flags::FIRST_SEGMENT, Flags::LAST_SEGMENT] {
        if original_flags.contains(flag) {
            flags.insert(flag);
        }
    }
    *bridge.flags_mut() = flags;

    if let Some(fi) = record_utils::tag_int(original, SEGMENT_INDEX_TAG) {
        bridge.data_mut().insert(SEGMENT_INDEX_TAG, Value::from(fi as i32));
    }

    if ignore_rg {
        let rg = read_group(original);
        if !rg.is_empty() {
            bridge.data_mut().insert(Tag::READ_GROUP, Value::String(rg.into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sam::builder::RecordBuilder;

    fn binner() -> Binner {
        Binner::new(false, false)
    }

    #[test]
    fn test_unmapped_original_with_mapped_bridge_is_bridged() {
        // Scenario: original unmapped, bridge maps with positive quality
        let original = RecordBuilder::new()
            .name("r1")
            .paired(true)
            .first_segment(true)
            .unmapped(true)
            .mapq(0)
            .build();
        let bridge = RecordBuilder::new().name("r1").refid(0).start(100).mapq(30).build();

        let binned = binner().bin(original, Some(bridge)).unwrap().unwrap();
        assert_eq!(binned.bin, Bin::Bridged);
        // The bridge's alignment is the output record
        assert_eq!(binned.record.reference_sequence_id(), Some(0));
        // ... but the sort-order coordinates come from the original
        assert_eq!(binned.original_refid, -1);
        assert_eq!(binned.original_pos, -1);
    }

    #[test]
    fn test_bridge_mapq_zero_still_bridges_unmapped_original() {
        let original = RecordBuilder::new().name("r1").unmapped(true).build();
        let bridge = RecordBuilder::new().name("r1").refid(0).start(50).mapq(0).build();

        let binned = binner().bin(original, Some(bridge)).unwrap().unwrap();
        assert_eq!(binned.bin, Bin::Bridged);
    }

    #[test]
    fn test_zero_original_with_positive_bridge_is_remap() {
        let original = RecordBuilder::new().name("r2").refid(0).start(200).mapq(0).build();
        let bridge = RecordBuilder::new().name("r2").refid(1).start(50).mapq(20).build();

        let binned = binner().bin(original, Some(bridge)).unwrap().unwrap();
        assert_eq!(binned.bin, Bin::Remap);
        // Remap keeps the original record
        assert_eq!(binned.record.reference_sequence_id(), Some(0));
        assert_eq!(binned.original_pos, 200);
    }

    #[test]
    fn test_no_bridge_record_is_unchanged() {
        let original = RecordBuilder::new().name("r3").refid(0).start(300).mapq(30).build();
        let binned = binner().bin(original, None).unwrap().unwrap();
        assert_eq!(binned.bin, Bin::Unchanged);
    }

    #[test]
    fn test_unmapped_bridge_is_unchanged_for_all_original_states() {
        for mapq in [0, 30] {
            let original = RecordBuilder::new().name("r").refid(0).start(10).mapq(mapq).build();
            let bridge = RecordBuilder::new().name("r").unmapped(true).build();
            let binned = binner().bin(original, Some(bridge)).unwrap().unwrap();
            assert_eq!(binned.bin, Bin::Unchanged);
        }

        let original = RecordBuilder::new().name("r").unmapped(true).build();
        let bridge = RecordBuilder::new().name("r").unmapped(true).build();
        let binned = binner().bin(original, Some(bridge)).unwrap().unwrap();
        assert_eq!(binned.bin, Bin::Unchanged);
    }

    #[test]
    fn test_zero_zero_is_unchanged() {
        let original = RecordBuilder::new().name("r").refid(0).start(10).mapq(0).build();
        let bridge = RecordBuilder::new().name("r").refid(0).start(20).mapq(0).build();
        let binned = binner().bin(original, Some(bridge)).unwrap().unwrap();
        assert_eq!(binned.bin, Bin::Unchanged);
    }

    #[test]
    fn test_positive_original_with_mapped_bridge_is_remap() {
        for bridge_mapq in [0, 20] {
            let original = RecordBuilder::new().name("r").refid(0).start(10).mapq(30).build();
            let bridge =
                RecordBuilder::new().name("r").refid(0).start(20).mapq(bridge_mapq).build();
            let binned = binner().bin(original, Some(bridge)).unwrap().unwrap();
            assert_eq!(binned.bin, Bin::Remap);
        }
    }

    #[test]
    fn test_mapq_255_counts_as_unmapped() {
        // Original with unavailable mapq and a well-mapped bridge: Bridged
        let original = RecordBuilder::new().name("r").refid(0).start(10).build();
        let bridge = RecordBuilder::new().name("r").refid(0).start(20).mapq(30).build();
        let binned = binner().bin(original, Some(bridge)).unwrap().unwrap();
        assert_eq!(binned.bin, Bin::Bridged);
    }

    #[test]
    fn test_secondary_alignment_is_discarded() {
        let original =
            RecordBuilder::new().name("r4").refid(0).start(400).mapq(30).secondary(true).build();
        let bridge = RecordBuilder::new().name("r4").refid(0).start(10).mapq(10).build();
        assert!(binner().bin(original, Some(bridge)).unwrap().is_none());
    }

    #[test]
    fn test_unmapped_secondary_is_not_discarded() {
        // The discard rule requires the read to be mapped
        let original = RecordBuilder::new().name("r").unmapped(true).secondary(true).build();
        let binned = binner().bin(original, None).unwrap().unwrap();
        assert_eq!(binned.bin, Bin::Unchanged);
    }

    #[test]
    fn test_coord_deleted_predicate_forces_remap() {
        let binner = binner().with_coord_deleted(Box::new(|_| true));
        let original = RecordBuilder::new().name("r").refid(0).start(10).mapq(30).build();
        let bridge = RecordBuilder::new().name("r").refid(0).start(20).mapq(30).build();
        let binned = binner.bin(original, Some(bridge)).unwrap().unwrap();
        assert_eq!(binned.bin, Bin::Remap);
    }

    #[test]
    fn test_fixup_copies_pair_flags_and_fi() {
        let original = RecordBuilder::new()
            .name("r1")
            .paired(true)
            .last_segment(true)
            .unmapped(true)
            .fi(2)
            .build();
        let bridge = RecordBuilder::new().name("r1").refid(0).start(100).mapq(30).fi(9).build();

        let binned = binner().bin(original, Some(bridge)).unwrap().unwrap();
        let flags = binned.record.flags();
        assert!(flags.is_segmented());
        assert!(flags.is_last_segment());
        assert!(!flags.is_first_segment());
        // The original's FI replaces the bridge's
        assert_eq!(record_utils::tag_int(&binned.record, SEGMENT_INDEX_TAG), Some(2));
    }

    #[test]
    fn test_fixup_copies_rg_only_when_ignoring_read_groups() {
        let original =
            RecordBuilder::new().name("r1").unmapped(true).read_group("orig_rg").build();
        let bridge = RecordBuilder::new().name("r1").refid(0).start(100).mapq(30).build();
        let binned = Binner::new(true, false).bin(original, Some(bridge)).unwrap().unwrap();
        assert_eq!(read_group(&binned.record), b"orig_rg");
    }

    #[test]
    fn test_expected_mate_count_from_chosen_record() {
        // Paired original: one mate expected
        let original = RecordBuilder::new()
            .name("r1")
            .paired(true)
            .first_segment(true)
            .refid(0)
            .start(10)
            .mapq(30)
            .build();
        let binned = binner().bin(original, None).unwrap().unwrap();
        assert_eq!(binned.expected_mate_count, 1);

        // Unpaired original: no mates
        let original = RecordBuilder::new().name("r2").refid(0).start(10).mapq(30).build();
        let binned = binner().bin(original, None).unwrap().unwrap();
        assert_eq!(binned.expected_mate_count, 0);

        // TC tag wins over flags
        let original = RecordBuilder::new()
            .name("r3")
            .paired(true)
            .first_segment(true)
            .refid(0)
            .start(10)
            .mapq(30)
            .tc(4)
            .build();
        let binned = binner().bin(original, None).unwrap().unwrap();
        assert_eq!(binned.expected_mate_count, 3);
    }
}
