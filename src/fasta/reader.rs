use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use log::{debug, warn};
use memmap2::Mmap;

use super::{ContigIndexTable, ContigLayoutEntry, INDEX_EXTENSION};
use crate::Result;

/// Returns the size of the file at `path`, or `None` if it cannot be determined
///
/// Failures are logged and never propagated.
pub fn content_length<P: AsRef<Path>>(path: P) -> Option<u64> {
    match fs::metadata(path.as_ref()) {
        Ok(meta) => Some(meta.len()),
        Err(e) => {
            warn!(
                "unable to determine content length of {}: {e}",
                path.as_ref().display()
            );
            None
        }
    }
}

/// Random-access reader over an indexed FASTA file
///
/// Each read maps the file independently, so a shared reader can serve
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct FastaReader {
    path: PathBuf,
    table: ContigIndexTable,
}
impl FastaReader {
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P, table: ContigIndexTable) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            table,
        }
    }

    /// Opens a FASTA file with its `.fai` sidecar next to it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let table = ContigIndexTable::from_path(index_path(path.as_ref()))?;
        Ok(Self::new(path, table))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn table(&self) -> &ContigIndexTable {
        &self.table
    }

    /// Reads bases `[start, end]` (1-based, inclusive) of `contig`
    ///
    /// The range is clamped to the contig. Returns `None` if the contig is
    /// unknown and an empty buffer for an empty range or any I/O failure.
    #[must_use]
    pub fn read_range(&self, contig: &str, start: u64, end: u64) -> Option<Vec<u8>> {
        let entry = self.table.get(contig)?;
        let start = start.max(1);
        let end = end.min(entry.total_bases);
        if start > end || entry.bases_per_line == 0 {
            return Some(Vec::new());
        }
        match self.read_span(entry, start - 1, end) {
            Ok(bases) => Some(bases),
            Err(e) => {
                warn!(
                    "failed reading {contig}:{start}-{end} from {}: {e}",
                    self.path.display()
                );
                Some(Vec::new())
            }
        }
    }

    /// Reads the whole contig
    #[must_use]
    pub fn get_sequence(&self, contig: &str) -> Option<Vec<u8>> {
        let total = self.table.get(contig)?.total_bases;
        self.read_range(contig, 1, total)
    }

    /// Reads 0-based half-open `[begin, end)` and strips line terminators
    fn read_span(&self, entry: &ContigLayoutEntry, begin: u64, end: u64) -> Result<Vec<u8>> {
        let bases_per_line = entry.bases_per_line;
        let skip = entry.terminator_width() as usize;

        let physical_start = entry.physical_offset(begin);
        let mut physical_end = entry.physical_offset(end - 1) + 1;
        if let Some(length) = content_length(&self.path) {
            physical_end = physical_end.min(length);
        }
        if physical_start >= physical_end {
            return Ok(Vec::new());
        }
        debug!(
            "reading {} bytes at {physical_start} for {}",
            physical_end - physical_start,
            entry.name
        );

        let file = File::open(&self.path)?;

        // Safety: registered FASTA files are immutable while mapped
        let mmap = unsafe { Mmap::map(&file)? };
        let physical_end = (physical_end as usize).min(mmap.len());
        let physical_start = (physical_start as usize).min(physical_end);
        let span = &mmap[physical_start..physical_end];

        let mut bases = Vec::with_capacity((end - begin) as usize);
        let mut pos = 0;
        let mut run = (bases_per_line - begin % bases_per_line) as usize;
        while pos < span.len() {
            let take = run.min(span.len() - pos);
            bases.extend_from_slice(&span[pos..pos + take]);
            pos += take + skip;
            run = bases_per_line as usize;
        }
        Ok(bases)
    }
}

/// Conventional sidecar path of a FASTA file (`<fasta>.fai`)
#[must_use]
pub fn index_path(fasta: &Path) -> PathBuf {
    let mut path = fasta.as_os_str().to_owned();
    path.push(".");
    path.push(INDEX_EXTENSION);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::{
        fasta::{ContigIndexer, ContigLayoutEntry},
        test_utils::{random_bases, rng, write_fasta, DNA, SOFT_MASKED},
    };

    fn open(path: &Path) -> FastaReader {
        let table = ContigIndexer::from_path(path).unwrap().build().unwrap();
        FastaReader::new(path, table)
    }

    // ==================== Concrete Layout Tests ====================

    #[test]
    fn test_second_line_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = rng();
        let bases = random_bases(&mut rng, 1000, DNA);
        let path = write_fasta(dir.path(), &[("chr1", bases.as_slice())], 70, "\n");

        let reader = open(&path);
        let entry = reader.table().get("chr1").unwrap();
        assert_eq!(*entry, ContigLayoutEntry::new("chr1", 1000, 18, 70, 71));

        let seq = reader.read_range("chr1", 71, 140).unwrap();
        assert_eq!(seq.len(), 70);
        assert_eq!(seq, &bases[70..140]);
    }

    #[test]
    fn test_physical_span_of_index_row() {
        // header ">chr1\n" puts the first base at byte 6
        let dir = tempfile::tempdir().unwrap();
        let mut rng = rng();
        let bases = random_bases(&mut rng, 1000, DNA);
        let mut data = b">chr1\n".to_vec();
        for line in bases.chunks(70) {
            data.extend_from_slice(line);
            data.push(b'\n');
        }
        let path = dir.path().join("chr1.fa");
        std::fs::write(&path, &data).unwrap();

        let reader = open(&path);
        let entry = reader.table().get("chr1").unwrap();
        assert_eq!(*entry, ContigLayoutEntry::new("chr1", 1000, 6, 70, 71));
        assert_eq!(entry.physical_offset(70), 77);

        let seq = reader.read_range("chr1", 71, 140).unwrap();
        assert_eq!(seq, &data[77..147]);
    }

    // ==================== Equivalence Tests ====================

    #[test]
    fn test_index_then_read_equivalence() {
        let mut rng = rng();
        let chr1 = random_bases(&mut rng, 517, SOFT_MASKED);
        let chr2 = random_bases(&mut rng, 240, SOFT_MASKED);
        let chr3 = random_bases(&mut rng, 1, SOFT_MASKED);
        let contigs: [(&str, &[u8]); 3] = [
            ("chr1", chr1.as_slice()),
            ("chr2", chr2.as_slice()),
            ("chr3", chr3.as_slice()),
        ];

        for newline in ["\n", "\r\n"] {
            for bases_per_line in [1, 60, 70, 80] {
                let dir = tempfile::tempdir().unwrap();
                let path = write_fasta(dir.path(), &contigs, bases_per_line, newline);
                let reader = open(&path);

                for (name, bases) in &contigs {
                    let size = bases.len();
                    let mut bounds = vec![(1, size), (1, 1), (size, size)];
                    for _ in 0..25 {
                        let i = rng.random_range(1..=size);
                        let j = rng.random_range(i..=size);
                        bounds.push((i, j));
                    }
                    for (i, j) in bounds {
                        let seq = reader.read_range(name, i as u64, j as u64).unwrap();
                        assert_eq!(
                            seq,
                            &bases[i - 1..j],
                            "{name}:{i}-{j} bpl={bases_per_line} newline={newline:?}"
                        );
                    }
                }
            }
        }
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_range_clamping() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(dir.path(), &[("a", &b"ACGTACGTAC"[..])], 4, "\n");
        let reader = open(&path);
        assert_eq!(reader.read_range("a", 0, 3).unwrap(), b"ACG");
        assert_eq!(reader.read_range("a", 8, 100).unwrap(), b"TAC");
        assert!(reader.read_range("a", 7, 6).unwrap().is_empty());
        assert!(reader.read_range("a", 11, 20).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_contig() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(dir.path(), &[("a", &b"ACGT"[..])], 4, "\n");
        let reader = open(&path);
        assert!(reader.read_range("b", 1, 2).is_none());
        assert!(reader.get_sequence("b").is_none());
    }

    #[test]
    fn test_io_failure_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(dir.path(), &[("a", &b"ACGT"[..])], 4, "\n");
        let reader = open(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(reader.read_range("a", 1, 4), Some(Vec::new()));
    }

    #[test]
    fn test_get_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let contigs = [("a", &b"ACGTACGTAC"[..]), ("b", &b"GG"[..])];
        let path = write_fasta(dir.path(), &contigs, 3, "\r\n");
        let reader = open(&path);
        assert_eq!(reader.get_sequence("a").unwrap(), b"ACGTACGTAC");
        assert_eq!(reader.get_sequence("b").unwrap(), b"GG");
    }

    #[test]
    fn test_open_with_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(dir.path(), &[("a", &b"ACGTACGTAC"[..])], 4, "\n");
        let table = ContigIndexer::from_path(&path).unwrap().build().unwrap();
        table.write_path(index_path(&path)).unwrap();

        let reader = FastaReader::open(&path).unwrap();
        assert_eq!(reader.read_range("a", 3, 6).unwrap(), b"GTAC");
    }

    #[test]
    fn test_content_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(dir.path(), &[("a", &b"ACGT"[..])], 4, "\n");
        assert_eq!(content_length(&path), Some(20));
        assert_eq!(content_length(dir.path().join("missing.fa")), None);
    }
}
