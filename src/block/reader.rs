use std::io::{self, BufReader, Read, Seek, SeekFrom};

use log::trace;
use zstd::stream::read::Decoder;

use super::CheckpointReader;
use crate::{
    error::{Error, ReadError},
    Result,
};

/// Sequential reader over a block-compressed stream
///
/// Decompression always moves forward. Repositioning goes through the paired
/// checkpoint stream, see [`BlockReader::seek_with_index`].
pub struct BlockReader<R: Read + Seek> {
    /// Active decoder; only empty while it is being rebuilt
    decoder: Option<Decoder<'static, BufReader<R>>>,

    /// Current offset in the logical stream
    position: u64,
}
impl<R: Read + Seek> BlockReader<R> {
    /// Creates a reader positioned at the start of the logical stream
    pub fn new(mut inner: R) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            decoder: Some(Decoder::new(inner)?),
            position: 0,
        })
    }

    /// Current offset in the logical stream
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Restarts decompression at the frame beginning at `physical_offset`
    fn reposition(&mut self, logical_offset: u64, physical_offset: u64) -> Result<()> {
        let decoder = self
            .decoder
            .take()
            .ok_or_else(|| io::Error::other("block decoder unavailable"))?;
        let mut inner = decoder.finish().into_inner();
        inner.seek(SeekFrom::Start(physical_offset))?;
        self.decoder = Some(Decoder::new(inner)?);
        self.position = logical_offset;
        Ok(())
    }

    /// Consumes `n` logical bytes
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let skipped = io::copy(&mut self.by_ref().take(n), &mut io::sink())?;
        if skipped < n {
            return Err(ReadError::TruncatedStream {
                expected: n as usize,
                found: skipped as usize,
            }
            .into());
        }
        Ok(())
    }

    /// Positions the reader at logical offset `target`
    ///
    /// Walks the checkpoint stream `index` to the last block starting at or
    /// before `target`. If the reader already sits between that block and the
    /// target it continues forward instead of restarting the frame.
    pub fn seek_with_index<I: Read>(&mut self, index: I, target: u64) -> Result<()> {
        let checkpoint = CheckpointReader::new(index).walk(target)?;
        if self.position < checkpoint.logical_offset || self.position > target {
            trace!(
                "restarting block decoder at logical {} (physical {})",
                checkpoint.logical_offset,
                checkpoint.physical_offset
            );
            self.reposition(checkpoint.logical_offset, checkpoint.physical_offset)?;
        }
        self.skip(target - self.position)
    }

    /// Fills `buf` completely or fails with [`ReadError::TruncatedStream`]
    pub fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::from(e)),
            }
        }
        if filled < buf.len() {
            return Err(ReadError::TruncatedStream {
                expected: buf.len(),
                found: filled,
            }
            .into());
        }
        Ok(())
    }
}

impl<R: Read + Seek> Read for BlockReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match self.decoder.as_mut() {
            Some(decoder) => decoder.read(buf)?,
            None => 0,
        };
        self.position += n as u64;
        Ok(n)
    }
}
