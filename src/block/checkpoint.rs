use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{error::ReadError, Result};

/// Size of a single serialized checkpoint in bytes
pub const SIZE_CHECKPOINT: usize = 16;

/// A checkpoint in the block container's seek index
///
/// Marks the start of a compressed block. It bounds a forward seek and never
/// addresses a byte exactly: the reader still consumes bytes sequentially from
/// the checkpoint to its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Checkpoint {
    /// Offset of the block's first byte in the decompressed stream
    pub logical_offset: u64,

    /// Offset of the block's compressed frame in the file
    pub physical_offset: u64,
}
impl Checkpoint {
    #[must_use]
    pub fn new(logical_offset: u64, physical_offset: u64) -> Self {
        Self {
            logical_offset,
            physical_offset,
        }
    }

    pub fn write<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i64::<BigEndian>(self.logical_offset as i64)?;
        writer.write_i64::<BigEndian>(self.physical_offset as i64)?;
        Ok(())
    }

    /// Reads the next checkpoint, returning `None` at a clean end of stream
    pub fn read<R: io::Read>(reader: &mut R) -> Result<Option<Self>> {
        let logical = match reader.read_i64::<BigEndian>() {
            Ok(value) => value,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let physical = match reader.read_i64::<BigEndian>() {
            Ok(value) => value,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(ReadError::TruncatedStream {
                    expected: SIZE_CHECKPOINT,
                    found: SIZE_CHECKPOINT / 2,
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };
        if logical < 0 || physical < 0 {
            return Err(ReadError::CorruptStream(format!(
                "negative checkpoint ({logical}, {physical})"
            ))
            .into());
        }
        Ok(Some(Self::new(logical as u64, physical as u64)))
    }
}

/// Sequential reader over a checkpoint stream
///
/// Validates that checkpoints are strictly increasing in both fields.
pub struct CheckpointReader<R: io::Read> {
    inner: R,
    last: Option<Checkpoint>,
}
impl<R: io::Read> CheckpointReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, last: None }
    }

    fn next_checkpoint(&mut self) -> Result<Option<Checkpoint>> {
        let Some(checkpoint) = Checkpoint::read(&mut self.inner)? else {
            return Ok(None);
        };
        if let Some(last) = self.last {
            if checkpoint.logical_offset <= last.logical_offset
                || checkpoint.physical_offset <= last.physical_offset
            {
                return Err(ReadError::CorruptStream(format!(
                    "checkpoints not increasing: {last:?} then {checkpoint:?}"
                ))
                .into());
            }
        }
        self.last = Some(checkpoint);
        Ok(Some(checkpoint))
    }

    /// Walks the stream and returns the last checkpoint at or before `target`
    ///
    /// An empty stream yields the origin checkpoint.
    pub fn walk(mut self, target: u64) -> Result<Checkpoint> {
        let mut best = Checkpoint::default();
        while let Some(checkpoint) = self.next_checkpoint()? {
            if checkpoint.logical_offset > target {
                break;
            }
            best = checkpoint;
        }
        Ok(best)
    }
}

impl<R: io::Read> Iterator for CheckpointReader<R> {
    type Item = Result<Checkpoint>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_checkpoint().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_layout() {
        let mut buf = Vec::new();
        Checkpoint::new(1, 258).write(&mut buf).unwrap();
        assert_eq!(buf.len(), SIZE_CHECKPOINT);
        assert_eq!(&buf[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&buf[8..], &[0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_walk_selects_last_checkpoint_before_target() {
        let mut buf = Vec::new();
        for (logical, physical) in [(0, 0), (100, 40), (200, 85), (300, 120)] {
            Checkpoint::new(logical, physical).write(&mut buf).unwrap();
        }
        let walk = |target| CheckpointReader::new(buf.as_slice()).walk(target).unwrap();
        assert_eq!(walk(0), Checkpoint::new(0, 0));
        assert_eq!(walk(99), Checkpoint::new(0, 0));
        assert_eq!(walk(100), Checkpoint::new(100, 40));
        assert_eq!(walk(299), Checkpoint::new(200, 85));
        assert_eq!(walk(10_000), Checkpoint::new(300, 120));
    }

    #[test]
    fn test_walk_empty_stream() {
        let walk = CheckpointReader::new(&[0u8; 0][..]).walk(42).unwrap();
        assert_eq!(walk, Checkpoint::default());
    }

    #[test]
    fn test_partial_checkpoint_is_truncation() {
        let mut buf = Vec::new();
        Checkpoint::new(0, 0).write(&mut buf).unwrap();
        buf.truncate(12);
        let err = CheckpointReader::new(buf.as_slice()).walk(5).unwrap_err();
        assert!(err.is_corruption());
    }
}
