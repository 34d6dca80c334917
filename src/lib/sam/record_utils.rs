//! Accessors over alignment records as the binning pipeline sees them.
//!
//! The pipeline reads a deliberately small slice of each record: reference id
//! and position (normalised so that unmapped reads report −1), a three-state
//! mapping quality, the template identity formed from the `RG` tag and the
//! query name, and the segment bookkeeping tags `FI`/`TC`.

use crate::errors::{BinnieError, Result};
use log::warn;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::alignment::record_buf::data::field::Value;

/// The `FI` tag: one-based index of this segment within its template.
pub const SEGMENT_INDEX_TAG: Tag = Tag::new(b'F', b'I');

/// The `TC` tag: total number of segments in this read's template.
pub const TOTAL_SEGMENTS_TAG: Tag = Tag::new(b'T', b'C');

/// Normalised mapping-quality state used by the binning decision.
///
/// A reported mapq of 255 means "unavailable" and is coerced to `Unmapped`
/// (noodles already represents it as a missing mapping quality).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingQuality {
    /// The `UNMAP` flag is set, or the reported mapq is unavailable
    Unmapped,
    /// Mapped with a reported mapq of zero
    Zero,
    /// Mapped with a reported mapq in 1..=254
    Positive(u8),
}

impl MappingQuality {
    /// Derives the normalised mapping quality from a record.
    #[must_use]
    pub fn from_record(record: &RecordBuf) -> Self {
        if record.flags().is_unmapped() {
            return MappingQuality::Unmapped;
        }
        match record.mapping_quality() {
            None => MappingQuality::Unmapped,
            Some(mapq) => match u8::from(mapq) {
                0 => MappingQuality::Zero,
                q => MappingQuality::Positive(q),
            },
        }
    }

    /// True if the state represents an unmapped or unavailable quality.
    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        matches!(self, MappingQuality::Unmapped)
    }
}

/// Identity of the template a read belongs to: (read group, query name).
///
/// The read group is the `RG` tag value, or empty when the tag is missing or
/// when matching is configured to ignore read groups. Membership tests in the
/// buffer and original/bridge matching both go through this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateId {
    read_group: Vec<u8>,
    qname: Vec<u8>,
}

impl TemplateId {
    /// Builds the template identity for a record.
    ///
    /// # Errors
    ///
    /// Returns [`BinnieError::Uid`] if the record has no query name; the input
    /// contract requires a non-empty printable qname on every record.
    pub fn from_record(record: &RecordBuf, ignore_rg: bool) -> Result<Self> {
        let qname = qname(record);
        if qname.is_empty() {
            return Err(BinnieError::Uid {
                read_group: String::from_utf8_lossy(read_group(record)).into_owned(),
            });
        }
        let read_group = if ignore_rg { Vec::new() } else { read_group(record).to_vec() };
        Ok(TemplateId { read_group, qname: qname.to_vec() })
    }

    /// The read-group half of the identity, lossily decoded for diagnostics.
    #[must_use]
    pub fn read_group_lossy(&self) -> String {
        String::from_utf8_lossy(&self.read_group).into_owned()
    }

    /// The query-name half of the identity, lossily decoded for diagnostics.
    #[must_use]
    pub fn qname_lossy(&self) -> String {
        String::from_utf8_lossy(&self.qname).into_owned()
    }
}

/// Returns the reference id of a record, or −1 when unmapped.
///
/// With `allow_sorted_unmapped` set, unmapped records report their stored
/// reference id (the convention where unmapped mates are placed at their
/// partner's coordinates and sorted along with them).
#[must_use]
pub fn refid(record: &RecordBuf, allow_sorted_unmapped: bool) -> i32 {
    if allow_sorted_unmapped || !record.flags().is_unmapped() {
        record.reference_sequence_id().map_or(-1, |id| id as i32)
    } else {
        -1
    }
}

/// Returns the 0-based position of a record, or −1 when unmapped.
///
/// The same `allow_sorted_unmapped` convention as [`refid`] applies.
#[must_use]
pub fn pos(record: &RecordBuf, allow_sorted_unmapped: bool) -> i32 {
    if allow_sorted_unmapped || !record.flags().is_unmapped() {
        record.alignment_start().map_or(-1, |p| (usize::from(p) - 1) as i32)
    } else {
        -1
    }
}

/// Returns the `RG` tag value, or an empty slice when the tag is missing.
#[must_use]
pub fn read_group(record: &RecordBuf) -> &[u8] {
    match record.data().get(&Tag::READ_GROUP) {
        Some(Value::String(rg)) => rg.as_ref(),
        _ => b"",
    }
}

/// Returns the query name, or an empty slice when the record has none.
#[must_use]
pub fn qname(record: &RecordBuf) -> &[u8] {
    record.name().map_or(b"", |name| name.as_ref())
}

/// Extracts an integer tag value of any SAM integer width.
#[must_use]
pub fn tag_int(record: &RecordBuf, tag: Tag) -> Option<i64> {
    match record.data().get(&tag)? {
        Value::Int8(v) => Some(i64::from(*v)),
        Value::UInt8(v) => Some(i64::from(*v)),
        Value::Int16(v) => Some(i64::from(*v)),
        Value::UInt16(v) => Some(i64::from(*v)),
        Value::Int32(v) => Some(i64::from(*v)),
        Value::UInt32(v) => Some(i64::from(*v)),
        _ => None,
    }
}

/// Determines the number of segments in a record's template.
///
/// Uses the `TC` tag when present; otherwise falls back on the flag bits:
/// 1 for unpaired reads, 2 when exactly one of READ1/READ2 is set, and −1
/// (unknown, with a warning) when neither is set or when both are set on a
/// non-linear template carrying an `FI` tag.
///
/// # Errors
///
/// Both READ1 and READ2 set with neither `FI` nor `TC` present indicates a
/// malformed input and returns [`BinnieError::SegmentIndex`].
pub fn segment_count(record: &RecordBuf) -> Result<i32> {
    if let Some(tc) = tag_int(record, TOTAL_SEGMENTS_TAG) {
        return Ok(tc as i32);
    }

    let flags = record.flags();
    if !flags.is_segmented() {
        return Ok(1);
    }

    match (flags.is_first_segment(), flags.is_last_segment()) {
        (true, false) | (false, true) => Ok(2),
        (true, true) => {
            if tag_int(record, SEGMENT_INDEX_TAG).is_some() {
                warn!(
                    "unknown number of segments for read rg=[{}] qname=[{}] which is neither the first nor last segment",
                    String::from_utf8_lossy(read_group(record)),
                    String::from_utf8_lossy(qname(record)),
                );
                Ok(-1)
            } else {
                Err(BinnieError::SegmentIndex {
                    read_group: String::from_utf8_lossy(read_group(record)).into_owned(),
                    qname: String::from_utf8_lossy(qname(record)).into_owned(),
                })
            }
        }
        (false, false) => {
            warn!(
                "unknown number of segments for read rg=[{}] qname=[{}]",
                String::from_utf8_lossy(read_group(record)),
                String::from_utf8_lossy(qname(record)),
            );
            Ok(-1)
        }
    }
}
