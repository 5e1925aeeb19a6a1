//! Quantization of GC fractions into single signed bytes
//!
//! The table maps a GC count of `0..=GC_STEP_FACTOR` bases onto the full `i8`
//! range with both extremes pinned and interior steps evenly spaced.

use crate::GC_STEP_FACTOR;

const STEP: usize = GC_STEP_FACTOR as usize;

/// Width of the representable cell range
pub const QUANT_RANGE: f64 = (i8::MAX as i16 - i8::MIN as i16) as f64;

/// GC count of a full level-0 cell to its quantized value
pub static GC_QUANT: [i8; STEP + 1] = build_table();

const fn build_table() -> [i8; STEP + 1] {
    let mut table = [0i8; STEP + 1];
    let range = (i8::MAX as i32) - (i8::MIN as i32);
    let mut i = 0;
    while i <= STEP {
        // integer rounding of i * range / STEP
        let offset = (range * i as i32 + (STEP as i32) / 2) / STEP as i32;
        table[i] = (i8::MIN as i32 + offset) as i8;
        i += 1;
    }
    table
}

/// Quantizes `gc` GC bases out of `total` bases
///
/// Partial cells are rescaled to the table resolution first.
#[must_use]
pub fn quantize_count(gc: u32, total: u32) -> i8 {
    debug_assert!(gc <= total && total > 0);
    let step = GC_STEP_FACTOR;
    let idx = if total == step {
        gc
    } else {
        (2 * gc * step + total) / (2 * total)
    };
    GC_QUANT[idx as usize]
}

/// Rounded mean of `count` cell values summing to `sum`
#[must_use]
pub fn mean_cell(sum: i64, count: u32) -> i8 {
    let mean = (sum as f64 / f64::from(count)).round();
    mean.clamp(f64::from(i8::MIN), f64::from(i8::MAX)) as i8
}

/// Decodes a cell into a GC fraction in `[0.0, 1.0]`
#[inline]
#[must_use]
pub fn decode(cell: i8) -> f64 {
    (f64::from(cell) - f64::from(i8::MIN)) / QUANT_RANGE
}
