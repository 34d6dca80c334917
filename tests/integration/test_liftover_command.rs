//! End-to-end tests for the `liftover` subcommand.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn run_liftover(dir: &Path, map: &str, input: &str) -> (Option<i32>, String) {
    let map_path = dir.join("map.tsv");
    let input_path = dir.join("points.tsv");
    let output_path = dir.join("out.tsv");
    fs::write(&map_path, map).unwrap();
    fs::write(&input_path, input).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_bridgebuilder"))
        .arg("liftover")
        .arg(&input_path)
        .arg(&map_path)
        .arg(&output_path)
        .status()
        .expect("run bridgebuilder liftover");

    let output = fs::read_to_string(&output_path).unwrap_or_default();
    (status.code(), output)
}

const MAP: &str = "\
from_chrom\tfrom_start\tfrom_end\tto_chrom\tto_start\tto_end
chr1\t0\t999\tbridge1\t5000\t5999
chr2\t100\t199\tbridge2\t900\t800
";

#[test]
fn test_points_are_translated() {
    let dir = TempDir::new().unwrap();
    // Input positions are 1-based; chr1:1 sits at map offset 0
    let (code, output) = run_liftover(dir.path(), MAP, "chr1\t1\nchr1\t500\n");
    assert_eq!(code, Some(0));
    assert_eq!(output, "bridge1\t5001\nbridge1\t5500\n");
}

#[test]
fn test_reversed_target_ranges_are_swapped() {
    let dir = TempDir::new().unwrap();
    let (code, output) = run_liftover(dir.path(), MAP, "chr2\t101\n");
    assert_eq!(code, Some(0));
    // to_start > to_end: bounds swap, offset measured from the lower bound
    assert_eq!(output, "bridge2\t801\n");
}

#[test]
fn test_unmapped_points_write_dots() {
    let dir = TempDir::new().unwrap();
    let (code, output) = run_liftover(dir.path(), MAP, "chr1\t5000\nchrX\t10\nchr1\t2\n");
    assert_eq!(code, Some(0));
    assert_eq!(output, ".\t.\n.\t.\nbridge1\t5002\n");
}

#[test]
fn test_output_to_stdout_when_omitted() {
    let dir = TempDir::new().unwrap();
    let map_path = dir.path().join("map.tsv");
    let input_path = dir.path().join("points.tsv");
    fs::write(&map_path, MAP).unwrap();
    fs::write(&input_path, "chr1\t1\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_bridgebuilder"))
        .arg("liftover")
        .arg(&input_path)
        .arg(&map_path)
        .output()
        .expect("run bridgebuilder liftover");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "bridge1\t5001\n");
}

#[test]
fn test_missing_map_exits_2() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("points.tsv");
    fs::write(&input_path, "chr1\t1\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_bridgebuilder"))
        .arg("liftover")
        .arg(&input_path)
        .arg(dir.path().join("missing_map.tsv"))
        .status()
        .expect("run bridgebuilder liftover");
    assert_eq!(status.code(), Some(2));
}

#[test]
fn test_malformed_input_line_exits_1() {
    let dir = TempDir::new().unwrap();
    let (code, _) = run_liftover(dir.path(), MAP, "chr1 not-tab-separated\n");
    assert_eq!(code, Some(1));
}
