use std::io::Write;

use log::debug;

use super::NibHeader;
use crate::{
    block::{BlockConfig, BlockWriter},
    error::WriteError,
    nuc, Result,
};

/// Number of bases packed per write to the block writer
const PACK_CHUNK: usize = 64 * 1024;

/// Encoder of Nib streams
///
/// Writes the header followed by one byte per pair of bases into a block
/// container.
pub struct NibWriter<W: Write, I: Write> {
    inner: BlockWriter<W, I>,

    /// Reusable packing buffer
    pbuf: Vec<u8>,
}
impl<W: Write, I: Write> NibWriter<W, I> {
    pub fn new(inner: W, index: I, config: BlockConfig) -> Result<Self> {
        Ok(Self {
            inner: BlockWriter::new(inner, index, config)?,
            pbuf: Vec::new(),
        })
    }

    /// Encodes `bases` as a complete stream and returns the inner writers
    ///
    /// Fails with [`WriteError::UnknownSymbol`] at the first pair holding a
    /// symbol outside the alphabet.
    pub fn write_sequence(mut self, bases: &[u8]) -> Result<(W, I)> {
        let header = NibHeader::for_length(bases.len())?;
        header.write_bytes(&mut self.inner)?;

        for (chunk_idx, chunk) in bases.chunks(PACK_CHUNK).enumerate() {
            pack_into(chunk, chunk_idx * PACK_CHUNK, &mut self.pbuf)?;
            self.inner.write_all(&self.pbuf)?;
        }
        debug!(
            "encoded {} bases into {} nib bytes",
            bases.len(),
            header.payload_len()
        );
        self.inner.finish()
    }
}

/// Packs `bases` two per byte into `pbuf`
///
/// `offset` is the position of `bases[0]` in the full sequence and must be even.
pub fn pack_into(bases: &[u8], offset: usize, pbuf: &mut Vec<u8>) -> Result<()> {
    pbuf.clear();
    for (pair_idx, pair) in bases.chunks(2).enumerate() {
        let first = pair[0];
        let second = pair.get(1).copied();
        let unknown = || WriteError::UnknownSymbol {
            position: offset + pair_idx * 2,
            first: first as char,
            second: second.map(char::from),
        };
        let high = nuc::encode(first).ok_or_else(unknown)?;
        let low = match second {
            Some(symbol) => nuc::encode(symbol).ok_or_else(unknown)?,
            None => 0,
        };
        pbuf.push(nuc::pack(high, low));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_pack_pairs() {
        let mut pbuf = Vec::new();
        pack_into(b"ACgtN", 0, &mut pbuf).unwrap();
        assert_eq!(pbuf, vec![0x21, 0xB8, 0x40]);
    }

    #[test]
    fn test_unknown_symbol_reports_pair() {
        let mut pbuf = Vec::new();
        let err = pack_into(b"ACG-", 10, &mut pbuf).unwrap_err();
        assert!(matches!(
            err,
            Error::WriteError(WriteError::UnknownSymbol {
                position: 12,
                first: 'G',
                second: Some('-'),
            })
        ));
    }

    #[test]
    fn test_unknown_trailing_symbol() {
        let mut pbuf = Vec::new();
        let err = pack_into(b"AC?", 0, &mut pbuf).unwrap_err();
        assert!(matches!(
            err,
            Error::WriteError(WriteError::UnknownSymbol {
                position: 2,
                first: '?',
                second: None,
            })
        ));
    }
}
