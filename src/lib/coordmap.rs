//! Coordinate liftover map.
//!
//! A keyed collection of balanced interval trees answering "given a point in
//! reference A, return the mapped point in reference B". One AVL tree per
//! source chromosome holds closed intervals `[from_start, from_end]`, each
//! carrying a target range; intervals are assumed non-overlapping within a
//! chromosome.
//!
//! The map is built once from a tab-separated file and is read-only
//! afterwards; lookups are pure.
//!
//! # File format
//!
//! One mapping per line, tab-separated:
//!
//! ```text
//! from_chrom  from_start  from_end  to_chrom  to_start  to_end
//! ```
//!
//! The first line is a header and is skipped.

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A target range a source interval maps onto.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TargetRange {
    chrom: String,
    start: i64,
    end: i64,
}

/// A point translated through the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPoint {
    /// Target chromosome name
    pub chrom: String,
    /// Target position (same basis as the query position)
    pub pos: i64,
}

/// Arena-allocated AVL tree node.
#[derive(Debug)]
struct Node {
    start: i64,
    end: i64,
    target: TargetRange,
    /// Height difference right − left; always in −1..=1 between insertions
    balance: i8,
    left: Option<usize>,
    right: Option<usize>,
}

/// Balanced binary tree of non-overlapping closed intervals, ordered by
/// interval start. Nodes live in an arena and reference each other by index.
#[derive(Debug, Default)]
struct IntervalTree {
    nodes: Vec<Node>,
    root: Option<usize>,
}

/// Which child of a node the insertion walk descended into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Left,
    Right,
}

impl IntervalTree {
    /// Inserts an interval with its target range.
    ///
    /// Records the root-to-leaf path, attaches a new leaf, then walks the
    /// path back toward the root updating balance factors; the walk stops at
    /// the first rebalance or when a balance reaches zero.
    fn insert(&mut self, start: i64, end: i64, target: TargetRange) {
        let leaf = self.nodes.len();
        self.nodes.push(Node { start, end, target, balance: 0, left: None, right: None });

        let Some(root) = self.root else {
            self.root = Some(leaf);
            return;
        };

        // Walk down, remembering the path
        let mut path: Vec<(usize, Dir)> = Vec::new();
        let mut current = root;
        loop {
            let dir = if start > self.nodes[current].start { Dir::Right } else { Dir::Left };
            path.push((current, dir));
            match self.child(current, dir) {
                Some(next) => current = next,
                None => break,
            }
        }
        let &(parent, dir) = path.last().expect("non-empty path to insertion point");
        self.set_child(parent, dir, Some(leaf));

        // Walk back up, adjusting balances
        for i in (0..path.len()).rev() {
            let (node, dir) = path[i];
            self.nodes[node].balance += match dir {
                Dir::Left => -1,
                Dir::Right => 1,
            };

            match self.nodes[node].balance {
                0 => break,
                -1 | 1 => continue,
                _ => {
                    let new_subtree = self.rebalance(node);
                    match i.checked_sub(1) {
                        Some(j) => {
                            let (parent, parent_dir) = path[j];
                            self.set_child(parent, parent_dir, Some(new_subtree));
                        }
                        None => self.root = Some(new_subtree),
                    }
                    break;
                }
            }
        }
    }

    /// Finds the node whose interval contains `pos`, descending left when
    /// `pos < start` and right when `pos > end`.
    fn lookup(&self, pos: i64) -> Option<&Node> {
        let mut cursor = self.root;
        while let Some(index) = cursor {
            let node = &self.nodes[index];
            if pos < node.start {
                cursor = node.left;
            } else if pos > node.end {
                cursor = node.right;
            } else {
                return Some(node);
            }
        }
        None
    }

    /// Restores balance at a node whose balance factor reached ±2, applying
    /// a single rotation, or a double rotation when the deeper child's
    /// balance sign disagrees with the imbalance direction. Returns the new
    /// subtree root.
    fn rebalance(&mut self, node: usize) -> usize {
        if self.nodes[node].balance > 1 {
            let right = self.nodes[node].right.expect("right-heavy node has a right child");
            if self.nodes[right].balance < 0 {
                let new_right = self.rotate_right(right);
                self.nodes[node].right = Some(new_right);
                self.rotate_left_double(node)
            } else {
                self.rotate_left_single(node)
            }
        } else {
            let left = self.nodes[node].left.expect("left-heavy node has a left child");
            if self.nodes[left].balance > 0 {
                let new_left = self.rotate_left(left);
                self.nodes[node].left = Some(new_left);
                self.rotate_right_double(node)
            } else {
                self.rotate_right_single(node)
            }
        }
    }

    /// Left rotation for the simple (single-rotation) case: the pivot's
    /// balance is non-negative before the rotation.
    fn rotate_left_single(&mut self, node: usize) -> usize {
        let pivot = self.rotate_left(node);
        // Insertion-only trees rebalance with the pivot at ±1
        self.nodes[node].balance = 0;
        self.nodes[pivot].balance = 0;
        pivot
    }

    fn rotate_right_single(&mut self, node: usize) -> usize {
        let pivot = self.rotate_right(node);
        self.nodes[node].balance = 0;
        self.nodes[pivot].balance = 0;
        pivot
    }

    /// Completes a right-left double rotation; `node.right` has already been
    /// rotated right, so the grandchild is now the direct right child.
    fn rotate_left_double(&mut self, node: usize) -> usize {
        let old_grandchild_balance =
            self.nodes[self.nodes[node].right.expect("double rotation pivot")].balance;
        let pivot = self.rotate_left(node);
        let right = self.nodes[pivot].right.expect("double rotation right child");
        match old_grandchild_balance {
            1 => {
                self.nodes[node].balance = -1;
                self.nodes[right].balance = 0;
            }
            -1 => {
                self.nodes[node].balance = 0;
                self.nodes[right].balance = 1;
            }
            _ => {
                self.nodes[node].balance = 0;
                self.nodes[right].balance = 0;
            }
        }
        self.nodes[pivot].balance = 0;
        pivot
    }

    fn rotate_right_double(&mut self, node: usize) -> usize {
        let old_grandchild_balance =
            self.nodes[self.nodes[node].left.expect("double rotation pivot")].balance;
        let pivot = self.rotate_right(node);
        let left = self.nodes[pivot].left.expect("double rotation left child");
        match old_grandchild_balance {
            -1 => {
                self.nodes[node].balance = 1;
                self.nodes[left].balance = 0;
            }
            1 => {
                self.nodes[node].balance = 0;
                self.nodes[left].balance = -1;
            }
            _ => {
                self.nodes[node].balance = 0;
                self.nodes[left].balance = 0;
            }
        }
        self.nodes[pivot].balance = 0;
        pivot
    }

    /// Structural left rotation; balance factors are the caller's concern.
    fn rotate_left(&mut self, node: usize) -> usize {
        let pivot = self.nodes[node].right.expect("left rotation requires a right child");
        self.nodes[node].right = self.nodes[pivot].left;
        self.nodes[pivot].left = Some(node);
        pivot
    }

    fn rotate_right(&mut self, node: usize) -> usize {
        let pivot = self.nodes[node].left.expect("right rotation requires a left child");
        self.nodes[node].left = self.nodes[pivot].right;
        self.nodes[pivot].right = Some(node);
        pivot
    }

    fn child(&self, node: usize, dir: Dir) -> Option<usize> {
        match dir {
            Dir::Left => self.nodes[node].left,
            Dir::Right => self.nodes[node].right,
        }
    }

    fn set_child(&mut self, node: usize, dir: Dir, child: Option<usize>) {
        match dir {
            Dir::Left => self.nodes[node].left = child,
            Dir::Right => self.nodes[node].right = child,
        }
    }

    #[cfg(test)]
    fn height(&self, node: Option<usize>) -> usize {
        match node {
            None => 0,
            Some(index) => {
                1 + self.height(self.nodes[index].left).max(self.height(self.nodes[index].right))
            }
        }
    }
}

/// Point-to-point coordinate translation map (component C5).
#[derive(Debug, Default)]
pub struct CoordMap {
    trees: HashMap<String, IntervalTree>,
}

impl CoordMap {
    /// Reads a map from a tab-separated file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or a line cannot be parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("could not open liftover map '{}'", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("could not parse liftover map '{}'", path.display()))
    }

    /// Reads a map from any reader. The first line is a header and is
    /// skipped.
    ///
    /// # Errors
    ///
    /// Fails when a line does not hold six tab-separated fields with numeric
    /// coordinates.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let reader = BufReader::new(reader);
        let mut map = CoordMap::default();

        for (index, line) in reader.lines().enumerate().skip(1) {
            let line = line.with_context(|| format!("read failure at line {}", index + 1))?;
            if line.is_empty() {
                continue;
            }
            map.insert_line(&line).with_context(|| format!("bad mapping at line {}", index + 1))?;
        }

        Ok(map)
    }

    fn insert_line(&mut self, line: &str) -> Result<()> {
        let fields: Vec<&str> = line.split('\t').collect();
        let [from_chrom, from_start, from_end, to_chrom, to_start, to_end] = fields[..] else {
            bail!("expected 6 tab-separated fields, found {}", fields.len());
        };

        let from_start: i64 = from_start.parse().context("from_start is not an integer")?;
        let from_end: i64 = from_end.parse().context("from_end is not an integer")?;
        let target = TargetRange {
            chrom: to_chrom.to_string(),
            start: to_start.parse().context("to_start is not an integer")?,
            end: to_end.parse().context("to_end is not an integer")?,
        };

        self.trees.entry(from_chrom.to_string()).or_default().insert(from_start, from_end, target);
        Ok(())
    }

    /// Translates a point, or returns `None` when no interval contains it.
    ///
    /// When the target range is reversed (`to_start > to_end`) its bounds are
    /// swapped first; the transformation is a translation preserving the
    /// offset from the swapped start, not an inversion.
    #[must_use]
    pub fn map_point(&self, chrom: &str, pos: i64) -> Option<MappedPoint> {
        let node = self.trees.get(chrom)?.lookup(pos)?;
        let to_start = node.target.start.min(node.target.end);
        Some(MappedPoint { chrom: node.target.chrom.clone(), pos: to_start + (pos - node.start) })
    }

    /// Number of source chromosomes with at least one mapping.
    #[must_use]
    pub fn chrom_count(&self) -> usize {
        self.trees.len()
    }
}
