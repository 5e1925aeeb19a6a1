//! # Block-compressed container
//!
//! Nib and GC artifacts are stored as a logical byte stream cut into blocks of at
//! most [`BlockConfig::block_size`] bytes. Each block is compressed into an
//! independent ZSTD frame and the frames are written back to back.
//!
//! A paired checkpoint stream records where every frame starts, both in the
//! logical (decompressed) stream and in the physical file:
//!
//! ```text
//! data:        [frame 0][frame 1][frame 2]...
//! checkpoints: [i64 logical][i64 physical] [i64 logical][i64 physical] ...
//! ```
//!
//! Frames can only be decompressed forward, so a reader locates the last
//! checkpoint at or before its target, jumps to that frame and then consumes the
//! remaining bytes sequentially (see [`BlockReader::seek_with_index`]).

mod checkpoint;
mod reader;
mod writer;

pub use checkpoint::{Checkpoint, CheckpointReader, SIZE_CHECKPOINT};
pub use reader::BlockReader;
pub use writer::BlockWriter;

/// The default number of logical bytes per compressed block.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// The default compression level (ZSTD default).
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 0;

/// Configuration of a [`BlockWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockConfig {
    /// Maximum number of logical bytes per block
    pub block_size: usize,

    /// ZSTD compression level
    pub compression_level: i32,
}
impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}
impl BlockConfig {
    #[must_use]
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    #[must_use]
    pub fn compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }
}
