use std::io;

use zstd::zstd_safe;

use super::{BlockConfig, Checkpoint};
use crate::Result;

/// Writes a logical byte stream as a sequence of ZSTD-compressed blocks
///
/// Every flushed block appends one [`Checkpoint`] to the paired index writer.
/// The writer buffers at most one block in memory.
pub struct BlockWriter<W: io::Write, I: io::Write> {
    /// Destination of the compressed frames
    inner: W,

    /// Destination of the checkpoint stream
    index: I,

    /// Uncompressed bytes of the current block
    buffer: Vec<u8>,

    /// Reusable compression buffer
    z_buffer: Vec<u8>,

    config: BlockConfig,

    /// Compression context for the writer
    cctx: zstd_safe::CCtx<'static>,

    /// Logical offset of the first byte in `buffer`
    logical_offset: u64,

    /// Number of compressed bytes written so far
    physical_offset: u64,
}
impl<W: io::Write, I: io::Write> BlockWriter<W, I> {
    pub fn new(inner: W, index: I, config: BlockConfig) -> Result<Self> {
        Ok(Self {
            inner,
            index,
            buffer: Vec::with_capacity(config.block_size),
            z_buffer: Vec::default(),
            config,
            cctx: zstd_safe::CCtx::create(),
            logical_offset: 0,
            physical_offset: 0,
        })
    }

    /// Number of logical bytes accepted so far
    #[must_use]
    pub fn position(&self) -> u64 {
        self.logical_offset + self.buffer.len() as u64
    }

    /// Compresses and writes the current block, recording its checkpoint
    fn flush_block(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        sized_compress(
            &mut self.z_buffer,
            &self.buffer,
            self.config.compression_level,
            &mut self.cctx,
        )?;
        self.inner.write_all(&self.z_buffer)?;
        Checkpoint::new(self.logical_offset, self.physical_offset).write(&mut self.index)?;

        self.logical_offset += self.buffer.len() as u64;
        self.physical_offset += self.z_buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }

    /// Flushes the final block and returns the inner writers
    pub fn finish(mut self) -> Result<(W, I)> {
        self.flush_block()?;
        self.inner.flush()?;
        self.index.flush()?;
        Ok((self.inner, self.index))
    }
}

impl<W: io::Write, I: io::Write> io::Write for BlockWriter<W, I> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.config.block_size - self.buffer.len();
        let n = room.min(buf.len());
        self.buffer.extend_from_slice(&buf[..n]);
        if self.buffer.len() == self.config.block_size {
            self.flush_block().map_err(io::Error::other)?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_block().map_err(io::Error::other)?;
        self.inner.flush()?;
        self.index.flush()
    }
}

fn sized_compress(
    dst: &mut Vec<u8>,
    src: &[u8],
    level: i32,
    cctx: &mut zstd_safe::CCtx,
) -> Result<()> {
    // determine the maximum compressed size
    let max_z_size = zstd_safe::compress_bound(src.len());

    // Note: this uses uninitialized memory, but is safe because we immediately
    // follow it with a call to `compress` which overwrites the buffer.
    resize_uninit(dst, max_z_size);

    let true_size = cctx
        .compress(dst, src, level)
        .map_err(|e| io::Error::other(zstd_safe::get_error_name(e)))?;

    // clip all remaining uninitialized memory
    dst.truncate(true_size);

    Ok(())
}

/// Resize a vector to the target length without initializing new elements.
///
/// # Safety
/// The caller must ensure that all elements in the range [old_len..new_len]
/// are initialized before reading them.
#[inline]
fn resize_uninit<T>(vec: &mut Vec<T>, new_len: usize) {
    match new_len.cmp(&vec.len()) {
        std::cmp::Ordering::Greater => {
            vec.reserve(new_len - vec.len());
            unsafe {
                vec.set_len(new_len);
            }
        }
        std::cmp::Ordering::Less => {
            vec.truncate(new_len);
        }
        std::cmp::Ordering::Equal => {}
    }
}
