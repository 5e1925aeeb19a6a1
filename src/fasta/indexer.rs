use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::debug;

use super::{ContigIndexTable, ContigLayoutEntry};
use crate::{error::IndexError, Result};

/// Marker byte opening a FASTA header line
pub const HEADER_MARKER: u8 = b'>';

/// Number of lines per contig allowed to deviate from the first line's width
pub const TOLERATED_INCONSISTENT_LINES: usize = 1;

/// Accumulated layout of the contig currently being scanned
struct OpenContig {
    name: String,
    byte_offset: u64,
    total_bases: u64,

    /// (bases, bytes) of the first body line
    line_width: Option<(u64, u64)>,
    inconsistent_lines: usize,
    blank_lines: usize,
}
impl OpenContig {
    fn new(name: String, byte_offset: u64) -> Self {
        Self {
            name,
            byte_offset,
            total_bases: 0,
            line_width: None,
            inconsistent_lines: 0,
            blank_lines: 0,
        }
    }

    fn push_line(&mut self, bases: u64, bytes: u64, line: usize) -> Result<()> {
        match self.line_width {
            None => self.line_width = Some((bases, bytes)),
            Some(expected) => {
                if bases > 0 && expected != (bases, bytes) {
                    self.inconsistent_lines += 1;
                    if self.inconsistent_lines > TOLERATED_INCONSISTENT_LINES {
                        return Err(self.inconsistent(line));
                    }
                }
            }
        }
        if bases == 0 {
            self.blank_lines += 1;
        } else if self.blank_lines > 0 {
            // sequence data may not resume after a blank line
            return Err(self.inconsistent(line));
        }
        self.total_bases += bases;
        Ok(())
    }

    fn inconsistent(&self, line: usize) -> crate::Error {
        IndexError::InconsistentLineWidth {
            contig: self.name.clone(),
            line,
        }
        .into()
    }

    fn into_entry(self) -> ContigLayoutEntry {
        let (bases_per_line, bytes_per_line) = self.line_width.unwrap_or((0, 0));
        ContigLayoutEntry::new(
            self.name,
            self.total_bases,
            self.byte_offset,
            bases_per_line,
            bytes_per_line,
        )
    }
}

/// Single-pass builder of a [`ContigIndexTable`] from raw FASTA
///
/// Every body line of a contig must match the width of its first body line,
/// except for one tolerated deviation (usually the shorter final line). Blank
/// lines may only close a contig. Any violation aborts the build.
pub struct ContigIndexer<R: BufRead> {
    reader: R,
    line_buf: Vec<u8>,
}
impl<R: BufRead> ContigIndexer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buf: Vec::new(),
        }
    }

    /// Scans the whole input and returns the contig layouts in file order
    pub fn build(mut self) -> Result<ContigIndexTable> {
        let mut table = ContigIndexTable::new();
        let mut seen = HashSet::new();
        let mut current: Option<OpenContig> = None;
        let mut position = 0u64;
        let mut line = 0usize;

        loop {
            self.line_buf.clear();
            let bytes = self.reader.read_until(b'\n', &mut self.line_buf)? as u64;
            if bytes == 0 {
                break;
            }
            line += 1;
            position += bytes;

            let content = strip_terminator(&self.line_buf);
            if content.first() == Some(&HEADER_MARKER) {
                if let Some(contig) = current.take() {
                    table.push(contig.into_entry())?;
                }
                let name = parse_header(content).ok_or(IndexError::MalformedHeaderLine { line })?;
                if !seen.insert(name.clone()) {
                    return Err(IndexError::DuplicateContig(name).into());
                }
                current = Some(OpenContig::new(name, position));
            } else if let Some(contig) = current.as_mut() {
                contig.push_line(content.len() as u64, bytes, line)?;
            } else if !content.is_empty() {
                return Err(IndexError::MalformedHeaderLine { line }.into());
            }
        }
        if let Some(contig) = current.take() {
            table.push(contig.into_entry())?;
        }
        debug!("indexed {} contigs over {position} bytes", table.len());
        Ok(table)
    }
}

impl ContigIndexer<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let handle = File::open(path).map(BufReader::new)?;
        Ok(Self::new(handle))
    }
}

/// Returns the line without its trailing `\n` or `\r\n`
fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Extracts the contig name: the text after the marker up to the first whitespace
fn parse_header(line: &[u8]) -> Option<String> {
    let name = line[1..]
        .split(u8::is_ascii_whitespace)
        .next()
        .filter(|name| !name.is_empty())?;
    Some(String::from_utf8_lossy(name).into_owned())
}
