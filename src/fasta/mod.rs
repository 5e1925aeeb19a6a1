//! # FASTA indexing and random access
//!
//! A FASTA file is indexed once into a tab-separated sidecar with one row per
//! contig:
//!
//! ```text
//! name \t total_bases \t byte_offset \t bases_per_line \t bytes_per_line
//! ```
//!
//! Given the uniform line width of a contig, the physical offset of any base is
//! computed directly, so a base range is read as one contiguous byte span from
//! which the line terminators are dropped.

mod indexer;
mod layout;
mod reader;

pub use indexer::{ContigIndexer, HEADER_MARKER, TOLERATED_INCONSISTENT_LINES};
pub use layout::{ContigIndexTable, ContigLayoutEntry, NUM_COLUMNS};
pub use reader::{content_length, index_path, FastaReader};

/// Extension of the sidecar index written next to a FASTA file
pub const INDEX_EXTENSION: &str = "fai";
