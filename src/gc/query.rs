use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use log::debug;

use super::{quant, GcHeader};
use crate::{block::BlockReader, error::ReadError, nuc, Result};

/// One output block of a GC profile (1-based, inclusive bounds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcBlock {
    pub start: u64,
    pub end: u64,
    pub gc_fraction: f64,
}
impl GcBlock {
    /// Number of bases covered by the block
    #[must_use]
    pub fn base_count(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Pyramid level chosen for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSelection {
    pub level: usize,

    /// Bases covered by one cell of the level
    pub cell_span: u64,
}

/// Selects the coarsest level whose cell span does not exceed `1 / scale`
///
/// Returns `None` when the requested resolution is finer than level 0.
#[must_use]
pub fn select_level(step: u64, level_count: usize, scale: f64) -> Option<LevelSelection> {
    let stride = block_width(scale);
    if stride < step {
        return None;
    }
    let mut selection = LevelSelection {
        level: 0,
        cell_span: step,
    };
    while selection.level + 1 < level_count {
        match selection.cell_span.checked_mul(step) {
            Some(span) if span <= stride => {
                selection.level += 1;
                selection.cell_span = span;
            }
            _ => break,
        }
    }
    Some(selection)
}

/// Width in bases of one output block at `scale`
fn block_width(scale: f64) -> u64 {
    ((1.0 / scale).round() as u64).max(1)
}

fn validate_query(start: u64, end: u64, scale: f64) -> Result<()> {
    if start == 0 || end < start || !scale.is_finite() || scale <= 0.0 {
        return Err(ReadError::InvalidRange { start, end }.into());
    }
    Ok(())
}

/// Source of the values a profile averages over
#[derive(Debug, Clone)]
enum Source {
    /// Decoded pyramid cells; cell `i` covers 0-based `[first + i*span, first + (i+1)*span)`
    Cells {
        values: Vec<f64>,
        first: u64,
        span: u64,
        total_bases: u64,
    },

    /// Prefix sums of GC bases from 1-based position `start` on
    Bases { prefix: Vec<u64> },
}

/// GC-content profile of a base range
///
/// The blocks partition `[start, end]` into runs of `round(1 / scale)` bases,
/// the last block holding the remainder. Blocks are computed on iteration and
/// the profile can be iterated any number of times.
#[derive(Debug, Clone)]
pub struct GcProfile {
    start: u64,
    end: u64,
    width: u64,
    source: Source,
}
impl GcProfile {
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of blocks
    #[must_use]
    pub fn len(&self) -> usize {
        (self.end - self.start + 1).div_ceil(self.width) as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn iter(&self) -> GcBlocks<'_> {
        GcBlocks {
            profile: self,
            next: 0,
        }
    }

    fn block(&self, idx: usize) -> GcBlock {
        let start = self.start + idx as u64 * self.width;
        let end = start.saturating_add(self.width - 1).min(self.end);
        let gc_fraction = match &self.source {
            Source::Cells {
                values,
                first,
                span,
                total_bases,
            } => weighted_mean(values, *first, *span, *total_bases, start - 1, end),
            Source::Bases { prefix } => {
                let lo = (start - self.start) as usize;
                let hi = (end - self.start + 1) as usize;
                (prefix[hi] - prefix[lo]) as f64 / (hi - lo) as f64
            }
        };
        GcBlock {
            start,
            end,
            gc_fraction,
        }
    }
}

/// Overlap-weighted mean of the cells intersecting 0-based `[begin, end)`
///
/// Cell spans are half-open, so a boundary base belongs to exactly one cell.
fn weighted_mean(
    values: &[f64],
    first: u64,
    span: u64,
    total_bases: u64,
    begin: u64,
    end: u64,
) -> f64 {
    let lo = ((begin - first) / span) as usize;
    let hi = (((end - 1) - first) / span) as usize;
    let mut sum = 0.0;
    let mut weight = 0u64;
    for (idx, value) in values.iter().enumerate().take(hi + 1).skip(lo) {
        let cell_begin = first + idx as u64 * span;
        let cell_end = (cell_begin + span).min(total_bases);
        let overlap = cell_end.min(end).saturating_sub(cell_begin.max(begin));
        sum += value * overlap as f64;
        weight += overlap;
    }
    if weight == 0 {
        0.0
    } else {
        sum / weight as f64
    }
}

/// Iterator over the blocks of a [`GcProfile`]
pub struct GcBlocks<'a> {
    profile: &'a GcProfile,
    next: usize,
}
impl Iterator for GcBlocks<'_> {
    type Item = GcBlock;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.profile.len() {
            return None;
        }
        let block = self.profile.block(self.next);
        self.next += 1;
        Some(block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.profile.len() - self.next;
        (remaining, Some(remaining))
    }
}
impl ExactSizeIterator for GcBlocks<'_> {}

impl<'a> IntoIterator for &'a GcProfile {
    type Item = GcBlock;
    type IntoIter = GcBlocks<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Whether a base, given as ASCII symbol or 4-bit code, is G or C
fn is_gc(base: u8) -> bool {
    if base <= nuc::LOW_NIBBLE_MASK {
        nuc::is_gc_code(base)
    } else {
        nuc::is_gc_symbol(base)
    }
}

/// Computes a profile directly from the bases of `[start, end]`
///
/// `bases` holds exactly the bases of the range, as ASCII symbols or 4-bit codes.
pub fn exact_profile(bases: &[u8], start: u64, end: u64, scale: f64) -> Result<GcProfile> {
    validate_query(start, end, scale)?;
    if bases.len() as u64 != end - start + 1 {
        return Err(ReadError::RangeExceedsStream {
            requested: end,
            available: start - 1 + bases.len() as u64,
        }
        .into());
    }
    let mut prefix = Vec::with_capacity(bases.len() + 1);
    let mut running = 0u64;
    prefix.push(0);
    for &base in bases {
        running += u64::from(is_gc(base));
        prefix.push(running);
    }
    Ok(GcProfile {
        start,
        end,
        width: block_width(scale),
        source: Source::Bases { prefix },
    })
}

/// Query engine over a GC pyramid stream
pub struct GcPyramidReader<R: Read + Seek, I: Read + Seek> {
    stream: BlockReader<R>,
    index: I,
    header: GcHeader,

    /// Reusable cell buffer
    cbuf: Vec<u8>,
}
impl<R: Read + Seek, I: Read + Seek> GcPyramidReader<R, I> {
    pub fn new(inner: R, index: I) -> Result<Self> {
        let mut stream = BlockReader::new(inner)?;
        let header = GcHeader::from_reader(&mut stream)?;
        Ok(Self {
            stream,
            index,
            header,
            cbuf: Vec::new(),
        })
    }

    #[must_use]
    pub fn header(&self) -> &GcHeader {
        &self.header
    }

    #[must_use]
    pub fn total_bases(&self) -> u64 {
        u64::from(self.header.total_bases)
    }

    /// Level the pyramid would serve `scale` from
    #[must_use]
    pub fn select_level(&self, scale: f64) -> Option<LevelSelection> {
        select_level(
            u64::from(self.header.step_factor),
            self.header.level_count(),
            scale,
        )
    }

    /// GC profile of `[start, end]` (1-based, inclusive) at `scale`
    ///
    /// Returns `Ok(None)` when `1 / scale` is finer than a level-0 cell and the
    /// profile has to be computed from the bases instead.
    pub fn query(&mut self, start: u64, end: u64, scale: f64) -> Result<Option<GcProfile>> {
        validate_query(start, end, scale)?;
        if end > self.total_bases() {
            return Err(ReadError::RangeExceedsStream {
                requested: end,
                available: self.total_bases(),
            }
            .into());
        }
        let Some(selection) = self.select_level(scale) else {
            return Ok(None);
        };
        let span = selection.cell_span;
        let first_cell = (start - 1) / span;
        let last_cell = (end - 1) / span;
        let count = (last_cell - first_cell + 1) as usize;
        let target = self.header.level_offset(selection.level) + first_cell;
        debug!(
            "gc query {start}-{end} at scale {scale} reads {count} cells of level {} at {target}",
            selection.level
        );

        self.index.seek(SeekFrom::Start(0))?;
        self.stream.seek_with_index(&mut self.index, target)?;
        self.cbuf.resize(count, 0);
        self.stream.read_fully(&mut self.cbuf)?;

        let cells: &[i8] = bytemuck::cast_slice(self.cbuf.as_slice());
        Ok(Some(GcProfile {
            start,
            end,
            width: block_width(scale),
            source: Source::Cells {
                values: cells.iter().map(|&cell| quant::decode(cell)).collect(),
                first: first_cell * span,
                span,
                total_bases: self.total_bases(),
            },
        }))
    }
}

impl GcPyramidReader<BufReader<File>, BufReader<File>> {
    /// Opens a GC pyramid and its checkpoint stream from disk
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(path: P, index_path: Q) -> Result<Self> {
        let inner = File::open(path).map(BufReader::new)?;
        let index = File::open(index_path).map(BufReader::new)?;
        Self::new(inner, index)
    }
}
