use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::{
    error::{ReadError, WriteError},
    Result, NIB_MAGIC,
};

/// Size of the header in bytes
pub const SIZE_NIB_HEADER: usize = 8;

/// Header of a Nib stream
///
/// ```text
/// [u32 magic][u32 total_bases]
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NibHeader {
    /// Signature of the stream ([`NIB_MAGIC`])
    pub magic: u32,

    /// Number of bases in the payload
    pub total_bases: u32,
}
impl NibHeader {
    #[must_use]
    pub fn new(total_bases: u32) -> Self {
        Self {
            magic: NIB_MAGIC,
            total_bases,
        }
    }

    /// Builds a header for a sequence of `len` bases
    pub fn for_length(len: usize) -> Result<Self> {
        let total = u32::try_from(len).map_err(|_| WriteError::SequenceTooLong(len))?;
        Ok(Self::new(total))
    }

    /// Number of payload bytes following the header
    #[must_use]
    pub fn payload_len(&self) -> u64 {
        u64::from(self.total_bases).div_ceil(2)
    }

    pub fn from_bytes(buffer: &[u8; SIZE_NIB_HEADER]) -> Result<Self> {
        let magic = BigEndian::read_u32(&buffer[0..4]);
        if magic != NIB_MAGIC {
            return Err(ReadError::CorruptStream(format!(
                "invalid nib signature {magic:#010x}"
            ))
            .into());
        }
        let total_bases = BigEndian::read_u32(&buffer[4..8]);
        Ok(Self { magic, total_bases })
    }

    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; SIZE_NIB_HEADER];
        reader.read_exact(&mut buffer)?;
        Self::from_bytes(&buffer)
    }

    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(self.magic)?;
        writer.write_u32::<BigEndian>(self.total_bases)?;
        Ok(())
    }
}
