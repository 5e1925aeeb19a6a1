//! # refseq
//!
//! Random-access storage for reference genomes.
//!
//! A reference is registered once and read many times. Registration turns a
//! FASTA file into three immutable artifact families per chromosome:
//!
//! * a tab-separated contig index ([`fasta::ContigIndexTable`]) that lets the
//!   raw FASTA be read at arbitrary base ranges,
//! * a Nib stream ([`nib`]) packing two 4-bit nucleotide codes per byte,
//! * a GC-content pyramid ([`gc`]) holding multi-resolution GC summaries.
//!
//! Nib and GC artifacts live in a block-compressed container ([`block`]) with a
//! paired checkpoint stream for bounded forward seeking.
//!
//! ```no_run
//! use refseq::{Reference, Result};
//!
//! fn main() -> Result<()> {
//!     let reference = Reference::open("genome.fa", "genome.refseq")?;
//!     if let Some(bases) = reference.get_subsequence("chr1", 10_001, 10_100)? {
//!         println!("{}", String::from_utf8_lossy(&bases));
//!     }
//!     if let Some(profile) = reference.query_gc("chr1", 1, 1_000_000, 0.001)? {
//!         for block in &profile {
//!             println!("{}\t{}\t{:.3}", block.start, block.end, block.gc_fraction);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod block;
pub mod error;
pub mod fasta;
pub mod gc;
pub mod nib;
pub mod nuc;
pub mod reference;
pub mod register;

#[cfg(test)]
mod test_utils;

pub use block::{BlockConfig, DEFAULT_BLOCK_SIZE, DEFAULT_COMPRESSION_LEVEL};
pub use error::{Error, IntoRefseqError, Result};
pub use fasta::{ContigIndexTable, ContigIndexer, ContigLayoutEntry, FastaReader};
pub use gc::{GcBlock, GcProfile, GcPyramidReader, GcPyramidWriter, PyramidConfig};
pub use nib::{NibHeader, NibReader, NibWriter};
pub use reference::{
    ArtifactPaths, ChromosomeDescriptor, Reference, ReferenceSequence, ReferenceSequenceAdapter,
    ReferenceSequenceFile, SequenceDictionaryEntry,
};
pub use register::{RegisterConfig, Registrar};

/// Signature of a Nib stream ("NIB1")
pub const NIB_MAGIC: u32 = 0x4E49_4231;

/// Signature of a GC pyramid stream ("GCP1")
pub const GC_MAGIC: u32 = 0x4743_5031;

/// Fan-out between consecutive pyramid levels
pub const GC_STEP_FACTOR: u32 = 10;

/// Minimum number of finer-level cells required before a coarser level is built
pub const DEFAULT_MIN_LEVEL_CELLS: u64 = 100;

/// Upper bound on the number of pyramid levels (including level 0)
pub const MAX_PYRAMID_LEVELS: usize = 16;
