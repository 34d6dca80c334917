//! Shared fixtures for the integration tests.

use bstr::BString;
use noodles::sam::Header;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::ReferenceSequence;
use std::num::NonZeroUsize;
use std::path::Path;

use bridgebuilder_lib::bam_io::{AlignmentReader, AlignmentWriter};

/// A header with the given reference sequence names (10 kb each).
pub fn header_with_refs(names: &[&str]) -> Header {
    let mut builder = Header::builder();
    for name in names {
        builder = builder.add_reference_sequence(
            BString::from(*name),
            Map::<ReferenceSequence>::new(NonZeroUsize::new(10_000).unwrap()),
        );
    }
    builder.build()
}

/// Writes records to a SAM or BAM file (by extension).
pub fn write_alignment_file(path: &Path, header: &Header, records: &[RecordBuf]) {
    let mut writer = AlignmentWriter::create(path, header).expect("create alignment file");
    for record in records {
        writer.write_record(header, record).expect("write record");
    }
    writer.finish(header).expect("finish alignment file");
}

/// Reads all records back from a SAM or BAM file.
pub fn read_alignment_file(path: &Path) -> Vec<RecordBuf> {
    let (mut reader, header) = AlignmentReader::open(path).expect("open alignment file");
    reader.records(&header).collect::<std::io::Result<_>>().expect("read records")
}

/// Query names of a slice of records.
pub fn qnames(records: &[RecordBuf]) -> Vec<String> {
    records
        .iter()
        .map(|r| {
            String::from_utf8_lossy(r.name().map_or(&[][..], <_ as AsRef<[u8]>>::as_ref))
                .into_owned()
        })
        .collect()
}
