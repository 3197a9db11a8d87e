//! Go `-coverprofile` parsing and the mapping of profile blocks onto source
//! bytes.
//!
//! ```text
//! mode: set|count|atomic
//! <file>:<startLine>.<startCol>,<endLine>.<endCol> <numStatements> <count>
//! ```
//!
//! Blocks keep their exact line/column ranges so the annotator can wrap the
//! covered bytes of each file.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use log::warn;
use regex::Regex;

use crate::error::{CovtreeError, Result};
use crate::model::rate;

/// Counting mode declared on the first line of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Set,
    Count,
    Atomic,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Set => "set",
            Mode::Count => "count",
            Mode::Atomic => "atomic",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "set" => Ok(Mode::Set),
            "count" => Ok(Mode::Count),
            "atomic" => Ok(Mode::Atomic),
            other => Err(format!(
                "unknown mode '{other}'. Supported: set, count, atomic"
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single block from the profile. Lines and columns are 1-based; columns
/// count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileBlock {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub num_stmt: u64,
    pub count: u64,
}

/// All blocks recorded for one source file, ordered by start position.
#[derive(Debug, Clone)]
pub struct Profile {
    pub file_name: String,
    pub mode: Mode,
    pub blocks: Vec<ProfileBlock>,
}

/// A start or end marker at a byte offset of the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub offset: usize,
    pub start: bool,
    /// Hit count of the block; only meaningful on start boundaries.
    pub count: u64,
    /// Count normalised to [0, 1] across the file; only set on start
    /// boundaries with a non-zero count.
    pub norm: f64,
}

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+):([0-9]+)\.([0-9]+),([0-9]+)\.([0-9]+) ([0-9]+) ([0-9]+)$")
            .expect("block pattern is valid")
    })
}

/// Parse a complete profile. Profiles come back sorted by file name; empty
/// input yields no profiles.
pub fn parse(input: &str) -> Result<Vec<Profile>> {
    let mut mode: Option<Mode> = None;
    let mut files: BTreeMap<String, Vec<ProfileBlock>> = BTreeMap::new();

    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = idx + 1;
        if raw_line.trim().is_empty() {
            continue;
        }

        if mode.is_none() {
            mode = Some(parse_mode_line(raw_line, line_no)?);
            continue;
        }

        let (file, block) = parse_block_line(raw_line, line_no)?;
        files.entry(file.to_string()).or_default().push(block);
    }

    let Some(mode) = mode else {
        return Ok(Vec::new());
    };

    files
        .into_iter()
        .map(|(file_name, blocks)| {
            let blocks = merge_blocks(&file_name, mode, blocks)?;
            Ok(Profile {
                file_name,
                mode,
                blocks,
            })
        })
        .collect()
}

fn parse_mode_line(line: &str, line_no: usize) -> Result<Mode> {
    let mode = line
        .strip_prefix("mode: ")
        .ok_or_else(|| CovtreeError::Parse {
            line: line_no,
            message: format!("bad mode line: {line:?}"),
        })?;
    mode.trim().parse().map_err(|message| CovtreeError::Parse {
        line: line_no,
        message,
    })
}

/// Parse a single block line, returning (file_path, block).
fn parse_block_line(line: &str, line_no: usize) -> Result<(&str, ProfileBlock)> {
    let malformed = || CovtreeError::Parse {
        line: line_no,
        message: format!("line {line:?} doesn't match expected format"),
    };

    let caps = block_regex().captures(line).ok_or_else(malformed)?;
    let num = |i: usize| -> Result<u64> {
        caps[i].parse::<u64>().map_err(|_| CovtreeError::Parse {
            line: line_no,
            message: format!("number out of range in {line:?}"),
        })
    };
    let small = |i: usize| -> Result<u32> {
        u32::try_from(num(i)?).map_err(|_| CovtreeError::Parse {
            line: line_no,
            message: format!("position out of range in {line:?}"),
        })
    };

    let file = caps.get(1).ok_or_else(malformed)?.as_str();
    let block = ProfileBlock {
        start_line: small(2)?,
        start_col: small(3)?,
        end_line: small(4)?,
        end_col: small(5)?,
        num_stmt: num(6)?,
        count: num(7)?,
    };
    Ok((file, block))
}

/// Sort blocks by position and fold repeated samples of the same range into
/// one block. `set` profiles OR the counts, the other modes add them.
fn merge_blocks(
    file_name: &str,
    mode: Mode,
    mut blocks: Vec<ProfileBlock>,
) -> Result<Vec<ProfileBlock>> {
    blocks.sort_by_key(|b| (b.start_line, b.start_col, b.end_line, b.end_col));

    let mut merged: Vec<ProfileBlock> = Vec::with_capacity(blocks.len());
    for block in blocks {
        match merged.last_mut() {
            Some(last)
                if (last.start_line, last.start_col, last.end_line, last.end_col)
                    == (block.start_line, block.start_col, block.end_line, block.end_col) =>
            {
                if last.num_stmt != block.num_stmt {
                    return Err(CovtreeError::Parse {
                        line: 0,
                        message: format!(
                            "inconsistent statement count for {}:{}.{}: changed from {} to {}",
                            file_name, block.start_line, block.start_col, last.num_stmt, block.num_stmt
                        ),
                    });
                }
                last.count = match mode {
                    Mode::Set => u64::from(last.count > 0 || block.count > 0),
                    Mode::Count | Mode::Atomic => last.count.saturating_add(block.count),
                };
            }
            _ => merged.push(block),
        }
    }
    Ok(merged)
}

impl Profile {
    /// Covered and total statement counts for the file.
    #[must_use]
    pub fn statements(&self) -> (u64, u64) {
        self.blocks.iter().fold((0, 0), |(covered, total), b| {
            let covered = if b.count > 0 {
                covered.saturating_add(b.num_stmt)
            } else {
                covered
            };
            (covered, total.saturating_add(b.num_stmt))
        })
    }

    /// Statement coverage in percent, 0 when the file has no statements.
    #[must_use]
    pub fn percent_covered(&self) -> f64 {
        let (covered, total) = self.statements();
        rate(covered, total) * 100.0
    }

    /// Map the blocks onto `src`, producing start/end boundaries ordered by
    /// byte offset. Every emitted start has a matching end; a block still open
    /// at the end of the source is closed at `src.len()`.
    #[must_use]
    pub fn boundaries(&self, src: &[u8]) -> Vec<Boundary> {
        let max = self.blocks.iter().map(|b| b.count).max().unwrap_or(0);
        let divisor = (max as f64).ln();
        let boundary = |offset: usize, start: bool, count: u64| {
            let norm = if !start || count == 0 {
                0.0
            } else if max <= 1 {
                // set mode: no gradient to show, use a fixed bright bucket
                0.8
            } else {
                (count as f64).ln() / divisor
            };
            Boundary {
                offset,
                start,
                count,
                norm,
            }
        };

        let mut boundaries = Vec::with_capacity(self.blocks.len() * 2);
        let (mut line, mut col) = (1u32, 1u32);
        let (mut si, mut bi) = (0usize, 0usize);
        let mut open = false;

        while si < src.len() && bi < self.blocks.len() {
            let b = &self.blocks[bi];
            if !open && b.start_line == line && b.start_col == col {
                boundaries.push(boundary(si, true, b.count));
                open = true;
            }
            if (b.end_line == line && b.end_col == col) || line > b.end_line {
                if open {
                    boundaries.push(boundary(si, false, 0));
                    open = false;
                } else {
                    warn!(
                        "{}: block {}.{},{}.{} does not start inside the source, skipping",
                        self.file_name, b.start_line, b.start_col, b.end_line, b.end_col
                    );
                }
                bi += 1;
                // the next block may start at this same offset
                continue;
            }
            if src[si] == b'\n' {
                line += 1;
                col = 0;
            }
            col += 1;
            si += 1;
        }
        if open {
            boundaries.push(boundary(src.len(), false, 0));
        }

        boundaries.sort_by_key(|b| b.offset);
        boundaries
    }
}
