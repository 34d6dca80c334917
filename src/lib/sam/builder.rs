//! Builder for creating test SAM/BAM records.
//!
//! Provides a fluent API for constructing alignment records for tests,
//! covering the small slice of record state the binning pipeline reads:
//! name, flags, coordinates, mapping quality, and the `RG`/`FI`/`TC` tags.
//!
//! ```
//! use bridgebuilder_lib::sam::builder::RecordBuilder;
//!
//! let record = RecordBuilder::new()
//!     .name("read1")
//!     .paired(true)
//!     .first_segment(true)
//!     .refid(0)
//!     .start(100)
//!     .mapq(30)
//!     .read_group("rgA")
//!     .build();
//! ```

use bstr::BString;
use noodles::core::Position;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::MappingQuality;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::alignment::record_buf::data::field::Value;

use super::record_utils::{SEGMENT_INDEX_TAG, TOTAL_SEGMENTS_TAG};

/// Fluent builder for a single alignment record.
///
/// Flags default to empty (a mapped, unpaired record with no name and no
/// coordinates); set only what the test cares about. Positions are 0-based,
/// matching the coordinates the pipeline reports.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    name: Option<String>,
    flags: Flags,
    refid: Option<usize>,
    start: Option<usize>,
    mapq: Option<u8>,
    read_group: Option<String>,
    fi: Option<i32>,
    tc: Option<i32>,
}

impl RecordBuilder {
    /// Creates a builder with all fields unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Sets or clears the PAIRED flag.
    #[must_use]
    pub fn paired(mut self, paired: bool) -> Self {
        self.flags.set(Flags::SEGMENTED, paired);
        self
    }

    /// Sets or clears the READ1 flag.
    #[must_use]
    pub fn first_segment(mut self, first: bool) -> Self {
        self.flags.set(Flags::FIRST_SEGMENT, first);
        self
    }

    /// Sets or clears the READ2 flag.
    #[must_use]
    pub fn last_segment(mut self, last: bool) -> Self {
        self.flags.set(Flags::LAST_SEGMENT, last);
        self
    }

    /// Sets or clears the UNMAP flag.
    #[must_use]
    pub fn unmapped(mut self, unmapped: bool) -> Self {
        self.flags.set(Flags::UNMAPPED, unmapped);
        self
    }

    /// Sets or clears the SECONDARY flag.
    #[must_use]
    pub fn secondary(mut self, secondary: bool) -> Self {
        self.flags.set(Flags::SECONDARY, secondary);
        self
    }

    /// Sets the reference sequence id.
    #[must_use]
    pub fn refid(mut self, refid: usize) -> Self {
        self.refid = Some(refid);
        self
    }

    /// Sets the 0-based alignment start position.
    #[must_use]
    pub fn start(mut self, start: usize) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets the mapping quality (leave unset for "unavailable", i.e. 255).
    #[must_use]
    pub fn mapq(mut self, mapq: u8) -> Self {
        self.mapq = Some(mapq);
        self
    }

    /// Sets the `RG` tag.
    #[must_use]
    pub fn read_group(mut self, read_group: &str) -> Self {
        self.read_group = Some(read_group.to_string());
        self
    }

    /// Sets the `FI` tag.
    #[must_use]
    pub fn fi(mut self, fi: i32) -> Self {
        self.fi = Some(fi);
        self
    }

    /// Sets the `TC` tag.
    #[must_use]
    pub fn tc(mut self, tc: i32) -> Self {
        self.tc = Some(tc);
        self
    }

    /// Builds the record.
    ///
    /// # Panics
    ///
    /// Panics if the configured mapping quality or start position is out of
    /// range; test inputs are expected to be valid.
    #[must_use]
    pub fn build(self) -> RecordBuf {
        let mut record = RecordBuf::default();
        *record.flags_mut() = self.flags;

        if let Some(name) = self.name {
            *record.name_mut() = Some(BString::from(name));
        }
        if let Some(refid) = self.refid {
            *record.reference_sequence_id_mut() = Some(refid);
        }
        if let Some(start) = self.start {
            *record.alignment_start_mut() =
                Some(Position::try_from(start + 1).expect("valid 0-based start"));
        }
        if let Some(mapq) = self.mapq {
            *record.mapping_quality_mut() =
                Some(MappingQuality::try_from(mapq).expect("valid mapping quality"));
        }
        if let Some(rg) = self.read_group {
            record.data_mut().insert(Tag::READ_GROUP, Value::from(rg));
        }
        if let Some(fi) = self.fi {
            record.data_mut().insert(SEGMENT_INDEX_TAG, Value::from(fi));
        }
        if let Some(tc) = self.tc {
            record.data_mut().insert(TOTAL_SEGMENTS_TAG, Value::from(tc));
        }
        record
    }
}
