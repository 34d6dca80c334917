//! `liftover`: standalone coordinate liftover
//!
//! Reads `chrom<TAB>position` lines (1-based positions), translates each
//! point through a liftover map, and writes `chrom<TAB>position` lines for
//! points with a mapping and `.<TAB>.` for points without one.
//!
//! The map file is tab-separated with a header line:
//!
//! ```text
//! from_chrom  from_start  from_end  to_chrom  to_start  to_end
//! ```

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use bridgebuilder_lib::coordmap::CoordMap;
use bridgebuilder_lib::errors::BinnieError;
use bridgebuilder_lib::validation::validate_files_exist;

/// Command-line arguments for `liftover`
#[derive(Parser, Debug)]
#[command(
    name = "liftover",
    about = "Translate chrom/position points through a liftover map",
    long_about = "\
Translates coordinate points through a liftover map built from regions that
differ between two references.

Input lines are 'chrom<TAB>position' with 1-based positions; each output line
is the translated 'chrom<TAB>position', or '.<TAB>.' when the point has no
mapping. Output goes to the given file, or to stdout when omitted."
)]
pub struct Liftover {
    /// Input file of chrom<TAB>position lines
    pub input: PathBuf,

    /// Liftover map file
    pub map: PathBuf,

    /// Output file (stdout when omitted)
    pub output: Option<PathBuf>,
}

impl crate::commands::command::Command for Liftover {
    fn execute(&self) -> Result<()> {
        validate_files_exist(&[
            (self.input.as_path(), "Input file"),
            (self.map.as_path(), "Liftover map"),
        ])?;

        let map = CoordMap::from_path(&self.map)?;
        info!("liftover map covers {} chromosomes", map.chrom_count());

        let input = File::open(&self.input).map_err(|source| BinnieError::InputOpen {
            path: self.input.display().to_string(),
            source,
        })?;

        let mut output: Box<dyn Write> = match &self.output {
            Some(path) => {
                let file = File::create(path).map_err(|source| BinnieError::OutputOpen {
                    path: path.display().to_string(),
                    source,
                })?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(io::stdout().lock()),
        };

        let mut mapped = 0u64;
        let mut unmapped = 0u64;
        for (index, line) in BufReader::new(input).lines().enumerate() {
            let line = line.with_context(|| format!("read failure at line {}", index + 1))?;
            if line.is_empty() {
                continue;
            }

            let (chrom, pos) = parse_point(&line)
                .with_context(|| format!("bad input at line {}: '{line}'", index + 1))?;

            // Queries are 1-based on the wire, 0-based in the map
            match map.map_point(chrom, pos - 1) {
                Some(point) => {
                    writeln!(output, "{}\t{}", point.chrom, point.pos + 1)?;
                    mapped += 1;
                }
                None => {
                    writeln!(output, ".\t.")?;
                    unmapped += 1;
                }
            }
        }
        output.flush()?;

        info!("translated {mapped} points, {unmapped} had no mapping");
        Ok(())
    }
}

/// Parses a `chrom<TAB>position` line.
fn parse_point(line: &str) -> Result<(&str, i64)> {
    let Some((chrom, pos)) = line.split_once('\t') else {
        bail!("expected 'chrom<TAB>position'");
    };
    if chrom.is_empty() {
        bail!("empty chromosome name");
    }
    let pos: i64 = pos.trim_end().parse().context("position is not an integer")?;
    Ok((chrom, pos))
}
