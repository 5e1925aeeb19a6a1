//! # Nib format
//!
//! Packs two 4-bit nucleotide codes per byte, first base in the high nibble.
//! A trailing odd base occupies the high nibble of the final byte.
//!
//! ```text
//! [u32 magic][u32 total_bases][ceil(total_bases / 2) packed bytes]
//! ```
//!
//! The stream is stored in the block container (see [`crate::block`]), so a
//! range read walks the checkpoint stream to the closest preceding block and
//! decompresses forward to the first packed byte it needs.

mod header;
mod reader;
mod writer;

pub use header::{NibHeader, SIZE_NIB_HEADER};
pub use reader::NibReader;
pub use writer::{pack_into, NibWriter};
