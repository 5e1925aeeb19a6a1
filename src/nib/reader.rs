use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use log::debug;

use super::{NibHeader, SIZE_NIB_HEADER};
use crate::{
    block::BlockReader,
    error::{Error, ReadError},
    nuc, Result,
};

/// Decoder of Nib streams
///
/// Holds the compressed stream and its checkpoint stream. Every range read
/// walks the checkpoints from the start, so one reader can serve any number
/// of queries in any order.
pub struct NibReader<R: Read + Seek, I: Read + Seek> {
    stream: BlockReader<R>,
    index: I,
    header: NibHeader,

    /// Reusable packed buffer
    pbuf: Vec<u8>,
}
impl<R: Read + Seek, I: Read + Seek> NibReader<R, I> {
    /// Opens a stream and validates its header
    pub fn new(inner: R, index: I) -> Result<Self> {
        let mut stream = BlockReader::new(inner)?;
        let mut buffer = [0u8; SIZE_NIB_HEADER];
        stream.read_fully(&mut buffer)?;
        let header = NibHeader::from_bytes(&buffer)?;
        Ok(Self {
            stream,
            index,
            header,
            pbuf: Vec::new(),
        })
    }

    #[must_use]
    pub fn header(&self) -> NibHeader {
        self.header
    }

    /// Number of bases in the stream
    #[must_use]
    pub fn total_bases(&self) -> u64 {
        u64::from(self.header.total_bases)
    }

    /// Reads bases `[start, end]` (1-based, inclusive) as ASCII symbols
    pub fn read_bases(&mut self, start: u64, end: u64) -> Result<Vec<u8>> {
        self.read_with(start, end, |code| nuc::decode(code))
    }

    /// Reads bases `[start, end]` (1-based, inclusive) as a string
    pub fn read_string(&mut self, start: u64, end: u64) -> Result<String> {
        let bases = self.read_bases(start, end)?;
        // the decode table only yields ASCII
        Ok(bases.into_iter().map(char::from).collect())
    }

    /// Reads bases `[start, end]` (1-based, inclusive) as raw 4-bit codes
    pub fn read_codes(&mut self, start: u64, end: u64) -> Result<Vec<u8>> {
        self.read_with(start, end, |code| nuc::decode(code).map(|_| code))
    }

    /// Loads the packed bytes covering the range and maps each code through `map`
    fn read_with<F>(&mut self, start: u64, end: u64, map: F) -> Result<Vec<u8>>
    where
        F: Fn(u8) -> Option<u8>,
    {
        if start == 0 || end < start - 1 {
            return Err(ReadError::InvalidRange { start, end }.into());
        }
        let begin = start - 1;
        let len = end - begin;
        if self.total_bases() < begin + len {
            return Err(ReadError::RangeExceedsStream {
                requested: end,
                available: self.total_bases(),
            }
            .into());
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        let parity = (begin % 2) as usize;
        let real_len = (len / 2) as usize + parity.max((len % 2) as usize);
        let target = SIZE_NIB_HEADER as u64 + begin / 2;
        debug!("nib seek to logical {target} for {len} bases");

        self.index.seek(SeekFrom::Start(0))?;
        self.stream.seek_with_index(&mut self.index, target)?;
        self.pbuf.resize(real_len, 0);
        self.stream.read_fully(&mut self.pbuf)?;

        unpack(&self.pbuf, parity, len as usize, map)
    }
}

impl NibReader<BufReader<File>, BufReader<File>> {
    /// Opens a Nib stream and its checkpoint stream from disk
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(path: P, index_path: Q) -> Result<Self> {
        let inner = File::open(path).map(BufReader::new)?;
        let index = File::open(index_path).map(BufReader::new)?;
        Self::new(inner, index)
    }
}

/// Unpacks `len` codes starting at nibble `parity` of `packed`
///
/// Shared by every decoded representation so they cannot diverge.
fn unpack<F>(packed: &[u8], parity: usize, len: usize, map: F) -> Result<Vec<u8>>
where
    F: Fn(u8) -> Option<u8>,
{
    (parity..parity + len)
        .map(|idx| {
            let code = nuc::nibble_at(packed, idx);
            map(code).ok_or_else(|| {
                Error::from(ReadError::CorruptStream(format!(
                    "unassigned nib code {code:#x}"
                )))
            })
        })
        .collect()
}
