use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    error::{ReadError, WriteError},
    Result, GC_MAGIC, MAX_PYRAMID_LEVELS,
};

/// Size of the fixed part of the header in bytes
pub const SIZE_GC_HEADER_FIXED: usize = 16;

/// Header of a GC pyramid stream
///
/// ```text
/// [u32 magic][u32 total_bases][u32 step_factor][u32 level_count][u32 level_sizes[level_count]]
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GcHeader {
    pub magic: u32,
    pub total_bases: u32,
    pub step_factor: u32,

    /// Number of cells on every level, finest first
    pub level_sizes: Vec<u32>,
}
impl GcHeader {
    pub fn new(total_bases: u64, step_factor: u32, level_sizes: &[u64]) -> Result<Self> {
        let too_long = || WriteError::SequenceTooLong(total_bases as usize);
        let total_bases = u32::try_from(total_bases).map_err(|_| too_long())?;
        let level_sizes = level_sizes
            .iter()
            .map(|&size| u32::try_from(size).map_err(|_| too_long()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            magic: GC_MAGIC,
            total_bases,
            step_factor,
            level_sizes,
        })
    }

    #[must_use]
    pub fn level_count(&self) -> usize {
        self.level_sizes.len()
    }

    /// Size of the serialized header in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        (SIZE_GC_HEADER_FIXED + 4 * self.level_sizes.len()) as u64
    }

    /// Number of bases covered by one cell of `level`
    #[must_use]
    pub fn cell_span(&self, level: usize) -> u64 {
        u64::from(self.step_factor).pow(level as u32 + 1)
    }

    /// Logical offset of the first cell of `level`
    #[must_use]
    pub fn level_offset(&self, level: usize) -> u64 {
        self.size()
            + self.level_sizes[..level]
                .iter()
                .map(|&size| u64::from(size))
                .sum::<u64>()
    }

    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(self.magic)?;
        writer.write_u32::<BigEndian>(self.total_bases)?;
        writer.write_u32::<BigEndian>(self.step_factor)?;
        writer.write_u32::<BigEndian>(self.level_sizes.len() as u32)?;
        for &size in &self.level_sizes {
            writer.write_u32::<BigEndian>(size)?;
        }
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = reader.read_u32::<BigEndian>()?;
        if magic != GC_MAGIC {
            return Err(ReadError::CorruptStream(format!(
                "invalid gc pyramid signature {magic:#010x}"
            ))
            .into());
        }
        let total_bases = reader.read_u32::<BigEndian>()?;
        let step_factor = reader.read_u32::<BigEndian>()?;
        if step_factor < 2 {
            return Err(ReadError::CorruptStream(format!("invalid step factor {step_factor}")).into());
        }
        let level_count = reader.read_u32::<BigEndian>()? as usize;
        if level_count == 0 || level_count > MAX_PYRAMID_LEVELS {
            return Err(ReadError::CorruptStream(format!("invalid level count {level_count}")).into());
        }
        let mut level_sizes = Vec::with_capacity(level_count);
        for _ in 0..level_count {
            level_sizes.push(reader.read_u32::<BigEndian>()?);
        }
        let header = Self {
            magic,
            total_bases,
            step_factor,
            level_sizes,
        };
        header.validate()?;
        Ok(header)
    }

    /// Checks that every level holds `ceil(total_bases / cell_span)` cells
    fn validate(&self) -> Result<()> {
        for (level, &size) in self.level_sizes.iter().enumerate() {
            let expected = u64::from(self.total_bases).div_ceil(self.cell_span(level));
            if u64::from(size) != expected {
                return Err(ReadError::CorruptStream(format!(
                    "level {level} holds {size} cells, expected {expected}"
                ))
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GC_STEP_FACTOR;

    #[test]
    fn test_header_round_trip() {
        let header = GcHeader::new(12_345, GC_STEP_FACTOR, &[1235, 124, 13]).unwrap();
        let mut buffer = Vec::new();
        header.write_bytes(&mut buffer).unwrap();
        assert_eq!(buffer.len() as u64, header.size());
        assert_eq!(&buffer[..4], b"GCP1");

        let parsed = GcHeader::from_reader(&mut buffer.as_slice()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_level_offsets() {
        let header = GcHeader::new(12_345, GC_STEP_FACTOR, &[1235, 124, 13]).unwrap();
        assert_eq!(header.size(), 28);
        assert_eq!(header.level_offset(0), 28);
        assert_eq!(header.level_offset(1), 28 + 1235);
        assert_eq!(header.level_offset(2), 28 + 1235 + 124);
        assert_eq!(header.cell_span(2), 1000);
    }

    #[test]
    fn test_inconsistent_level_sizes() {
        let header = GcHeader::new(12_345, GC_STEP_FACTOR, &[1235, 125]).unwrap();
        let mut buffer = Vec::new();
        header.write_bytes(&mut buffer).unwrap();
        let err = GcHeader::from_reader(&mut buffer.as_slice()).unwrap_err();
        assert!(err.is_corruption());
    }
}
