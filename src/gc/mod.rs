//! # GC-content pyramid
//!
//! A multi-resolution summary of GC content. Level 0 holds one cell per
//! `step` bases; every coarser level holds one cell per `step` cells of the
//! level below, so level `k` cells cover `step^(k+1)` bases.
//!
//! ```text
//! [header][level 0 cells][level 1 cells]...[level n cells]
//! ```
//!
//! Level 0 is streamed while the bases are consumed. The coarser levels are
//! buffered by the builder and appended when it finishes. Since the header
//! records every level's cell count, a reader can seek straight to any level
//! through the block container's checkpoint stream.
//!
//! Queries pick the coarsest level whose cells are not wider than the output
//! blocks and average the overlapping cells, weighted by the number of shared
//! bases.

mod builder;
mod header;
pub mod quant;
mod query;

pub use builder::{GcPyramidWriter, PyramidConfig};
pub use header::{GcHeader, SIZE_GC_HEADER_FIXED};
pub use query::{
    exact_profile, select_level, GcBlock, GcBlocks, GcProfile, GcPyramidReader, LevelSelection,
};
