//! SAM/BAM record utilities.
//!
//! The [`record_utils`] module holds the accessors the binning pipeline uses
//! to inspect alignment records; [`builder`] provides a fluent record builder
//! for tests.

pub mod builder;
pub mod record_utils;

pub use record_utils::{
    MappingQuality, SEGMENT_INDEX_TAG, TOTAL_SEGMENTS_TAG, TemplateId, pos, qname, read_group,
    refid, segment_count, tag_int,
};
