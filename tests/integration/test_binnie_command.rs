//! End-to-end tests for the `binnie` subcommand.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use bridgebuilder_lib::sam::builder::RecordBuilder;
use noodles::sam::alignment::record_buf::RecordBuf;

use crate::helpers::{header_with_refs, qnames, read_alignment_file, write_alignment_file};

struct Outputs {
    unchanged: PathBuf,
    bridged: PathBuf,
    remap: PathBuf,
}

/// Runs `bridgebuilder binnie` over the given inputs, returning the exit
/// code and the output paths.
fn run_binnie(
    dir: &Path,
    originals: &[RecordBuf],
    bridges: &[RecordBuf],
    extra_args: &[&str],
) -> (Option<i32>, Outputs) {
    let original_path = dir.join("original.bam");
    let bridge_path = dir.join("bridge.bam");
    write_alignment_file(&original_path, &header_with_refs(&["chr1", "chr2"]), originals);
    write_alignment_file(&bridge_path, &header_with_refs(&["bridge1"]), bridges);

    let outputs = Outputs {
        unchanged: dir.join("out_unchanged.bam"),
        bridged: dir.join("out_bridged.bam"),
        remap: dir.join("out_remap.bam"),
    };

    let status = Command::new(env!("CARGO_BIN_EXE_bridgebuilder"))
        .arg("binnie")
        .arg(&original_path)
        .arg(&bridge_path)
        .arg("--unchanged_out")
        .arg(&outputs.unchanged)
        .arg("--bridged_out")
        .arg(&outputs.bridged)
        .arg("--remap_out")
        .arg(&outputs.remap)
        .args(extra_args)
        .status()
        .expect("run bridgebuilder binnie");

    (status.code(), outputs)
}

fn frag(name: &str, refid: usize, pos: usize, mapq: u8) -> RecordBuf {
    RecordBuilder::new().name(name).refid(refid).start(pos).mapq(mapq).build()
}

#[test]
fn test_three_way_binning() {
    let dir = TempDir::new().unwrap();

    // r_unch: well-mapped, no bridge record -> unchanged
    // r_remap: mapq 0, bridge maps well -> remap
    // r_bridge: unmapped, bridge maps well -> bridged
    // r_sec: mapped secondary -> discarded
    let originals = vec![
        frag("r_remap", 0, 100, 0),
        frag("r_unch", 0, 200, 30),
        RecordBuilder::new().name("r_sec").refid(0).start(300).mapq(30).secondary(true).build(),
        RecordBuilder::new().name("r_bridge").unmapped(true).build(),
    ];
    let bridges = vec![frag("r_remap", 0, 10, 20), frag("r_bridge", 0, 50, 30)];

    let (code, outputs) = run_binnie(dir.path(), &originals, &bridges, &[]);
    assert_eq!(code, Some(0));

    assert_eq!(qnames(&read_alignment_file(&outputs.unchanged)), ["r_unch"]);
    assert_eq!(qnames(&read_alignment_file(&outputs.bridged)), ["r_bridge"]);
    assert_eq!(qnames(&read_alignment_file(&outputs.remap)), ["r_remap"]);
}

#[test]
fn test_bridged_record_carries_bridge_alignment() {
    let dir = TempDir::new().unwrap();

    let originals = vec![
        RecordBuilder::new()
            .name("r1")
            .paired(true)
            .first_segment(true)
            .unmapped(true)
            .build(),
    ];
    let bridges = vec![frag("r1", 0, 50, 30)];

    let (code, outputs) = run_binnie(dir.path(), &originals, &bridges, &[]);
    assert_eq!(code, Some(0));

    let bridged = read_alignment_file(&outputs.bridged);
    assert_eq!(bridged.len(), 1);
    // The record in the bridged bin is the bridge's alignment...
    assert_eq!(bridged[0].reference_sequence_id(), Some(0));
    assert_eq!(bridged[0].alignment_start().map(usize::from), Some(51));
    // ... with the original's pairing flags carried over
    assert!(bridged[0].flags().is_segmented());
    assert!(bridged[0].flags().is_first_segment());
}

#[test]
fn test_mate_disagreement_promotes_template_to_remap() {
    let dir = TempDir::new().unwrap();

    let originals = vec![
        RecordBuilder::new()
            .name("pair")
            .paired(true)
            .first_segment(true)
            .refid(0)
            .start(100)
            .mapq(30)
            .build(),
        RecordBuilder::new()
            .name("pair")
            .paired(true)
            .last_segment(true)
            .unmapped(true)
            .build(),
    ];
    // The bridge record matches the template and maps well; it pairs with the
    // first original, yielding remap, while the unmapped mate stays unchanged
    // until the chain rewrite promotes it too.
    let bridges = vec![
        RecordBuilder::new()
            .name("pair")
            .paired(true)
            .first_segment(true)
            .refid(0)
            .start(10)
            .mapq(30)
            .build(),
    ];

    let (code, outputs) = run_binnie(dir.path(), &originals, &bridges, &[]);
    assert_eq!(code, Some(0));

    assert!(read_alignment_file(&outputs.unchanged).is_empty());
    assert!(read_alignment_file(&outputs.bridged).is_empty());
    assert_eq!(qnames(&read_alignment_file(&outputs.remap)), ["pair", "pair"]);
}

#[test]
fn test_unsorted_input_exits_13() {
    let dir = TempDir::new().unwrap();
    let originals = vec![frag("a", 0, 100, 30), frag("b", 0, 90, 30)];
    let (code, _) = run_binnie(dir.path(), &originals, &[], &[]);
    assert_eq!(code, Some(13));
}

#[test]
fn test_overlong_bridge_exits_8() {
    let dir = TempDir::new().unwrap();
    let originals = vec![frag("a", 0, 100, 30)];
    let bridges = vec![frag("a", 0, 10, 30), frag("stray", 0, 20, 30)];
    let (code, _) = run_binnie(dir.path(), &originals, &bridges, &[]);
    assert_eq!(code, Some(8));
}

#[test]
fn test_missing_input_exits_2() {
    let dir = TempDir::new().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_bridgebuilder"))
        .arg("binnie")
        .arg(dir.path().join("missing.bam"))
        .arg(dir.path().join("also_missing.bam"))
        .status()
        .expect("run bridgebuilder binnie");
    assert_eq!(status.code(), Some(2));
}

#[test]
fn test_unwritable_output_exits_3() {
    let dir = TempDir::new().unwrap();
    let originals = vec![frag("a", 0, 100, 30)];
    let original_path = dir.path().join("original.bam");
    let bridge_path = dir.path().join("bridge.bam");
    write_alignment_file(&original_path, &header_with_refs(&["chr1"]), &originals);
    write_alignment_file(&bridge_path, &header_with_refs(&["bridge1"]), &[]);

    let status = Command::new(env!("CARGO_BIN_EXE_bridgebuilder"))
        .arg("binnie")
        .arg(&original_path)
        .arg(&bridge_path)
        .arg("--unchanged_out")
        .arg(dir.path().join("no_such_dir").join("out.bam"))
        .status()
        .expect("run bridgebuilder binnie");
    assert_eq!(status.code(), Some(3));
}

#[test]
fn test_bad_arguments_exit_1() {
    let status = Command::new(env!("CARGO_BIN_EXE_bridgebuilder"))
        .arg("binnie")
        .arg("--no_such_option")
        .status()
        .expect("run bridgebuilder binnie");
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_default_output_paths_append_suffixes() {
    let dir = TempDir::new().unwrap();
    let original_path = dir.path().join("sample.bam");
    let bridge_path = dir.path().join("bridge.bam");
    write_alignment_file(
        &original_path,
        &header_with_refs(&["chr1"]),
        &[frag("a", 0, 100, 30)],
    );
    write_alignment_file(&bridge_path, &header_with_refs(&["bridge1"]), &[]);

    let status = Command::new(env!("CARGO_BIN_EXE_bridgebuilder"))
        .arg("binnie")
        .arg(&original_path)
        .arg(&bridge_path)
        .status()
        .expect("run bridgebuilder binnie");
    assert_eq!(status.code(), Some(0));

    assert!(dir.path().join("sample.bam_unchanged.bam").exists());
    assert!(dir.path().join("sample.bam_bridged.bam").exists());
    assert!(dir.path().join("sample.bam_remap.bam").exists());
}

#[test]
fn test_sam_inputs_and_outputs() {
    let dir = TempDir::new().unwrap();
    let original_path = dir.path().join("original.sam");
    let bridge_path = dir.path().join("bridge.sam");
    write_alignment_file(
        &original_path,
        &header_with_refs(&["chr1"]),
        &[frag("a", 0, 100, 30)],
    );
    write_alignment_file(&bridge_path, &header_with_refs(&["bridge1"]), &[]);

    let unchanged = dir.path().join("unchanged.sam");
    let status = Command::new(env!("CARGO_BIN_EXE_bridgebuilder"))
        .arg("binnie")
        .arg(&original_path)
        .arg(&bridge_path)
        .arg("--unchanged_out")
        .arg(&unchanged)
        .arg("--bridged_out")
        .arg(dir.path().join("bridged.sam"))
        .arg("--remap_out")
        .arg(dir.path().join("remap.sam"))
        .status()
        .expect("run bridgebuilder binnie");
    assert_eq!(status.code(), Some(0));
    assert_eq!(qnames(&read_alignment_file(&unchanged)), ["a"]);
}

#[test]
fn test_headers_propagate_to_the_right_sinks() {
    let dir = TempDir::new().unwrap();
    let (code, outputs) = run_binnie(dir.path(), &[frag("a", 0, 100, 30)], &[], &[]);
    assert_eq!(code, Some(0));

    // unchanged and remap inherit the original's header
    let (_, header) = bridgebuilder_lib::bam_io::AlignmentReader::open(&outputs.unchanged).unwrap();
    assert!(header.reference_sequences().contains_key(&bstr::BString::from("chr1")));
    let (_, header) = bridgebuilder_lib::bam_io::AlignmentReader::open(&outputs.remap).unwrap();
    assert!(header.reference_sequences().contains_key(&bstr::BString::from("chr1")));

    // bridged inherits the bridge's header
    let (_, header) = bridgebuilder_lib::bam_io::AlignmentReader::open(&outputs.bridged).unwrap();
    assert!(header.reference_sequences().contains_key(&bstr::BString::from("bridge1")));
}

#[test]
fn test_small_buffer_still_bins_correctly() {
    let dir = TempDir::new().unwrap();
    let originals: Vec<RecordBuf> =
        (0..50).map(|i| frag(&format!("r{i:02}"), 0, 100 + i, 30)).collect();
    let (code, outputs) =
        run_binnie(dir.path(), &originals, &[], &["--buffer_size", "4", "--max_buffer_bases", "8"]);
    assert_eq!(code, Some(0));

    let unchanged = read_alignment_file(&outputs.unchanged);
    assert_eq!(unchanged.len(), 50);
    // Output preserves the input's coordinate order
    let names = qnames(&unchanged);
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}
