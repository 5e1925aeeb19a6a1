use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::{error::IndexError, Result};

/// Number of tab-separated columns in a sidecar row
pub const NUM_COLUMNS: usize = 5;

/// On-disk layout of one contig inside a FASTA file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigLayoutEntry {
    /// Contig name (unique within a table)
    pub name: String,

    /// Number of bases in the contig
    pub total_bases: u64,

    /// Byte offset of the contig's first base
    pub byte_offset: u64,

    /// Bases on every full line
    pub bases_per_line: u64,

    /// Bytes on every full line, terminator included
    pub bytes_per_line: u64,
}
impl ContigLayoutEntry {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        total_bases: u64,
        byte_offset: u64,
        bases_per_line: u64,
        bytes_per_line: u64,
    ) -> Self {
        Self {
            name: name.into(),
            total_bases,
            byte_offset,
            bases_per_line,
            bytes_per_line,
        }
    }

    /// Width of the line terminator in bytes
    #[must_use]
    pub fn terminator_width(&self) -> u64 {
        self.bytes_per_line.saturating_sub(self.bases_per_line)
    }

    /// Physical byte offset of the 0-based base `pos`
    #[must_use]
    pub fn physical_offset(&self, pos: u64) -> u64 {
        let line = pos / self.bases_per_line;
        let column = pos % self.bases_per_line;
        self.byte_offset + line * self.bytes_per_line + column
    }

    /// Writes the entry as a sidecar row
    ///
    /// Rows of contigs with a two-byte terminator end in `\r\n` so the index
    /// matches the FASTA it describes.
    pub fn write_row<W: Write>(&self, writer: &mut W) -> Result<()> {
        let newline = if self.terminator_width() == 2 {
            "\r\n"
        } else {
            "\n"
        };
        write!(
            writer,
            "{}\t{}\t{}\t{}\t{}{newline}",
            self.name, self.total_bases, self.byte_offset, self.bases_per_line, self.bytes_per_line
        )?;
        Ok(())
    }

    /// Parses one sidecar row (without its line terminator)
    fn parse_row(row: &str, line: usize) -> Result<Self> {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() != NUM_COLUMNS {
            return Err(IndexError::MalformedIndexFormat {
                line,
                reason: format!("expected {NUM_COLUMNS} columns, found {}", fields.len()),
            }
            .into());
        }
        let number = |column: usize| -> Result<u64> {
            fields[column].trim().parse::<u64>().map_err(|e| {
                IndexError::MalformedIndexFormat {
                    line,
                    reason: format!("column {}: {e}", column + 1),
                }
                .into()
            })
        };
        let entry = Self::new(fields[0], number(1)?, number(2)?, number(3)?, number(4)?);
        if entry.name.is_empty() {
            return Err(IndexError::MalformedIndexFormat {
                line,
                reason: "empty contig name".to_string(),
            }
            .into());
        }
        if entry.bytes_per_line < entry.bases_per_line {
            return Err(IndexError::MalformedIndexFormat {
                line,
                reason: "bytes per line is smaller than bases per line".to_string(),
            }
            .into());
        }
        if entry.total_bases > 0 && entry.bases_per_line == 0 {
            return Err(IndexError::MalformedIndexFormat {
                line,
                reason: "non-empty contig with zero bases per line".to_string(),
            }
            .into());
        }
        Ok(entry)
    }
}

/// Name-keyed table of contig layouts, in file order
#[derive(Debug, Clone, Default)]
pub struct ContigIndexTable {
    entries: Vec<ContigLayoutEntry>,
    lookup: HashMap<String, usize>,
}
impl ContigIndexTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, rejecting duplicate names
    pub fn push(&mut self, entry: ContigLayoutEntry) -> Result<()> {
        if self.lookup.contains_key(&entry.name) {
            return Err(IndexError::DuplicateContig(entry.name).into());
        }
        self.lookup.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Parses a tab-separated sidecar index
    ///
    /// Blank lines are skipped. Any row with other than five columns is fatal.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let row = line.trim_end_matches('\r');
            if row.is_empty() {
                continue;
            }
            table.push(ContigLayoutEntry::parse_row(row, idx + 1)?)?;
        }
        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let handle = File::open(path).map(BufReader::new)?;
        Self::parse(handle)
    }

    /// Writes the table as a sidecar index
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for entry in &self.entries {
            entry.write_row(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut handle = File::create(path).map(BufWriter::new)?;
        self.write_to(&mut handle)
    }

    /// Returns the layout of `name`, or `None` if the contig is unknown
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ContigLayoutEntry> {
        self.lookup.get(name).map(|&idx| &self.entries[idx])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Entries in file order
    pub fn iter(&self) -> impl Iterator<Item = &ContigLayoutEntry> {
        self.entries.iter()
    }

    /// Entry at `idx` in file order
    #[must_use]
    pub fn entry(&self, idx: usize) -> Option<&ContigLayoutEntry> {
        self.entries.get(idx)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
