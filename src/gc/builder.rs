use std::io::Write;

use log::debug;

use super::{quant, GcHeader};
use crate::{
    block::{BlockConfig, BlockWriter},
    error::WriteError,
    nuc, Result, DEFAULT_MIN_LEVEL_CELLS, GC_STEP_FACTOR, MAX_PYRAMID_LEVELS,
};

/// Shape of a GC pyramid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidConfig {
    /// A coarser level is only built while the finer level holds at least
    /// this many full cells
    pub min_level_cells: u64,

    /// Maximum number of levels, level 0 included
    pub max_levels: usize,
}
impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            min_level_cells: DEFAULT_MIN_LEVEL_CELLS,
            max_levels: MAX_PYRAMID_LEVELS,
        }
    }
}
impl PyramidConfig {
    #[must_use]
    pub fn min_level_cells(mut self, cells: u64) -> Self {
        self.min_level_cells = cells.max(1);
        self
    }

    #[must_use]
    pub fn max_levels(mut self, levels: usize) -> Self {
        self.max_levels = levels.clamp(1, MAX_PYRAMID_LEVELS);
        self
    }

    /// Number of cells on every level for a sequence of `total_bases`
    ///
    /// Level 0 always exists. Level `k` holds `ceil(total_bases / step^(k+1))`
    /// cells.
    #[must_use]
    pub fn level_sizes(&self, total_bases: u64) -> Vec<u64> {
        let step = u64::from(GC_STEP_FACTOR);
        let mut sizes = vec![total_bases.div_ceil(step)];
        let mut finer_span = step;
        while sizes.len() < self.max_levels {
            if total_bases / finer_span < self.min_level_cells {
                break;
            }
            let Some(span) = finer_span.checked_mul(step) else {
                break;
            };
            sizes.push(total_bases.div_ceil(span));
            finer_span = span;
        }
        sizes
    }
}

/// Running mean of one coarse level
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: i64,
    count: u32,
}

/// Online builder of a GC pyramid
///
/// Level-0 cells are streamed to the output as soon as they are complete.
/// Coarser levels are kept in memory and appended after level 0 by
/// [`GcPyramidWriter::finish`]. Each coarse cell is the rounded mean of the
/// `step` finer cells below it.
pub struct GcPyramidWriter<W: Write, I: Write> {
    inner: BlockWriter<W, I>,
    header: GcHeader,

    /// Bases received so far
    seen: u64,

    /// Bases and GC bases in the open level-0 cell
    cell_bases: u32,
    cell_gc: u32,

    /// Open cells of levels 1..
    accumulators: Vec<Accumulator>,

    /// Completed cells of levels 1..
    trailer: Vec<Vec<i8>>,
}
impl<W: Write, I: Write> GcPyramidWriter<W, I> {
    /// Creates a builder for exactly `total_bases` bases and writes the header
    pub fn new(
        inner: W,
        index: I,
        total_bases: u64,
        config: PyramidConfig,
        block: BlockConfig,
    ) -> Result<Self> {
        let sizes = config.level_sizes(total_bases);
        let header = GcHeader::new(total_bases, GC_STEP_FACTOR, &sizes)?;
        let mut inner = BlockWriter::new(inner, index, block)?;
        header.write_bytes(&mut inner)?;

        let coarse = sizes.len() - 1;
        let trailer = sizes[1..]
            .iter()
            .map(|&size| Vec::with_capacity(size as usize))
            .collect();
        debug!("gc pyramid for {total_bases} bases with level sizes {sizes:?}");
        Ok(Self {
            inner,
            header,
            seen: 0,
            cell_bases: 0,
            cell_gc: 0,
            accumulators: vec![Accumulator::default(); coarse],
            trailer,
        })
    }

    #[must_use]
    pub fn header(&self) -> &GcHeader {
        &self.header
    }

    /// Adds one base (ASCII symbol)
    pub fn push(&mut self, base: u8) -> Result<()> {
        self.seen += 1;
        self.cell_bases += 1;
        if nuc::is_gc_symbol(base) {
            self.cell_gc += 1;
        }
        if self.cell_bases == self.header.step_factor {
            self.close_cell()?;
        }
        Ok(())
    }

    pub fn push_slice(&mut self, bases: &[u8]) -> Result<()> {
        for &base in bases {
            self.push(base)?;
        }
        Ok(())
    }

    /// Emits the open level-0 cell and folds it into the coarser levels
    fn close_cell(&mut self) -> Result<()> {
        let cell = quant::quantize_count(self.cell_gc, self.cell_bases);
        self.inner.write_all(&[cell as u8])?;
        self.cell_bases = 0;
        self.cell_gc = 0;
        self.fold(0, cell);
        Ok(())
    }

    /// Adds `cell` to the accumulator of `level`, cascading completed cells upward
    ///
    /// Accumulators are indexed from level 1, so `level` 0 feeds index 0.
    fn fold(&mut self, level: usize, cell: i8) {
        let mut carry = cell;
        for idx in level..self.accumulators.len() {
            let acc = &mut self.accumulators[idx];
            acc.sum += i64::from(carry);
            acc.count += 1;
            if acc.count < self.header.step_factor {
                return;
            }
            carry = quant::mean_cell(acc.sum, acc.count);
            *acc = Accumulator::default();
            self.trailer[idx].push(carry);
        }
    }

    /// Flushes partial cells bottom-up, writes the coarse levels and returns
    /// the inner writers
    pub fn finish(mut self) -> Result<(W, I)> {
        let expected = u64::from(self.header.total_bases);
        if self.seen != expected {
            return Err(WriteError::BaseCountMismatch {
                expected,
                found: self.seen,
            }
            .into());
        }
        if self.cell_bases > 0 {
            self.close_cell()?;
        }
        for idx in 0..self.accumulators.len() {
            let acc = self.accumulators[idx];
            if acc.count == 0 {
                continue;
            }
            let cell = quant::mean_cell(acc.sum, acc.count);
            self.accumulators[idx] = Accumulator::default();
            self.trailer[idx].push(cell);
            self.fold(idx + 1, cell);
        }
        for (idx, cells) in self.trailer.iter().enumerate() {
            debug_assert_eq!(cells.len() as u32, self.header.level_sizes[idx + 1]);
            self.inner.write_all(bytemuck::cast_slice(cells.as_slice()))?;
        }
        self.inner.finish()
    }
}
