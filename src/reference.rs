//! # Reference access
//!
//! A [`Reference`] ties a FASTA file to the per-chromosome artifacts produced by
//! registration (see [`crate::register`]) and answers sequence and GC-content
//! queries, preferring the Nib and pyramid artifacts over the raw FASTA.
//!
//! Chromosome lookups fall back to the alternate naming convention ("1" and
//! "chr1") before reporting a chromosome as unknown.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use auto_impl::auto_impl;
use log::debug;

use crate::{
    error::ReadError,
    fasta::FastaReader,
    gc::{exact_profile, GcProfile, GcPyramidReader},
    nib::NibReader,
    nuc, Result,
};

/// File name of a chromosome's Nib stream
pub const NIB_FILE_NAME: &str = "sequence.nib";

/// File name of a chromosome's Nib checkpoint stream
pub const NIB_INDEX_FILE_NAME: &str = "sequence.nib.idx";

/// File name of a chromosome's GC pyramid
pub const GC_FILE_NAME: &str = "content.gccont";

/// File name of a chromosome's GC pyramid checkpoint stream
pub const GC_INDEX_FILE_NAME: &str = "content.gccont.idx";

const CHR_PREFIX: &str = "chr";

/// Returns the name under the other common chromosome naming convention
///
/// `"chr1"` maps to `"1"` and `"1"` maps to `"chr1"`.
#[must_use]
pub fn alternate_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    let prefix_len = CHR_PREFIX.len();
    if name.len() > prefix_len
        && name.is_char_boundary(prefix_len)
        && name[..prefix_len].eq_ignore_ascii_case(CHR_PREFIX)
    {
        Some(name[prefix_len..].to_string())
    } else if name.len() == prefix_len && name.eq_ignore_ascii_case(CHR_PREFIX) {
        None
    } else {
        Some(format!("{CHR_PREFIX}{name}"))
    }
}

/// Directory holding the artifacts of `contig` below `root`
///
/// The name is percent-encoded byte-wise, so distinct contigs never share a
/// directory and no name resolves outside `root`.
#[must_use]
pub fn contig_dir(root: &Path, contig: &str) -> PathBuf {
    root.join(encode_dir_name(contig))
}

/// Keeps ASCII alphanumerics, `-`, `_` and `.` and escapes every other byte
/// as `%XX`. Names made only of dots are escaped entirely.
fn encode_dir_name(contig: &str) -> String {
    let only_dots = contig.bytes().all(|b| b == b'.');
    let mut encoded = String::with_capacity(contig.len());
    for byte in contig.bytes() {
        let keep = byte.is_ascii_alphanumeric()
            || byte == b'-'
            || byte == b'_'
            || (byte == b'.' && !only_dots);
        if keep {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Locations of a chromosome's binary artifacts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Nib stream and its checkpoint stream
    pub nib: Option<(PathBuf, PathBuf)>,

    /// GC pyramid and its checkpoint stream
    pub gc: Option<(PathBuf, PathBuf)>,
}
impl ArtifactPaths {
    /// Standard artifact paths inside `dir`, whether they exist or not
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            nib: Some((dir.join(NIB_FILE_NAME), dir.join(NIB_INDEX_FILE_NAME))),
            gc: Some((dir.join(GC_FILE_NAME), dir.join(GC_INDEX_FILE_NAME))),
        }
    }

    /// Standard artifact paths inside `dir`, keeping only complete pairs on disk
    #[must_use]
    pub fn existing(dir: &Path) -> Self {
        let keep = |pair: Option<(PathBuf, PathBuf)>| {
            pair.filter(|(data, index)| data.is_file() && index.is_file())
        };
        let all = Self::in_dir(dir);
        Self {
            nib: keep(all.nib),
            gc: keep(all.gc),
        }
    }
}

/// A chromosome and its artifacts, as known to a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeDescriptor {
    pub name: String,
    pub total_bases: u64,
    pub artifacts: ArtifactPaths,
}

/// Sequence and GC-content access to a registered reference
#[derive(Debug, Clone)]
pub struct Reference {
    fasta: Option<FastaReader>,
    chromosomes: Vec<ChromosomeDescriptor>,
    lookup: HashMap<String, usize>,
}
impl Reference {
    #[must_use]
    pub fn new(fasta: Option<FastaReader>, chromosomes: Vec<ChromosomeDescriptor>) -> Self {
        let lookup = chromosomes
            .iter()
            .enumerate()
            .map(|(idx, chrom)| (chrom.name.clone(), idx))
            .collect();
        Self {
            fasta,
            chromosomes,
            lookup,
        }
    }

    /// Opens an indexed FASTA and the artifacts registered below `artifact_dir`
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(fasta: P, artifact_dir: Q) -> Result<Self> {
        let fasta = FastaReader::open(fasta)?;
        let chromosomes = fasta
            .table()
            .iter()
            .map(|entry| ChromosomeDescriptor {
                name: entry.name.clone(),
                total_bases: entry.total_bases,
                artifacts: ArtifactPaths::existing(&contig_dir(artifact_dir.as_ref(), &entry.name)),
            })
            .collect();
        Ok(Self::new(Some(fasta), chromosomes))
    }

    /// Chromosomes in registration order
    #[must_use]
    pub fn chromosomes(&self) -> &[ChromosomeDescriptor] {
        &self.chromosomes
    }

    /// Looks up a chromosome by name, trying the alternate name on a miss
    #[must_use]
    pub fn chromosome(&self, name: &str) -> Option<&ChromosomeDescriptor> {
        let idx = self.lookup.get(name).or_else(|| {
            let alternate = alternate_name(name)?;
            self.lookup.get(&alternate)
        })?;
        Some(&self.chromosomes[*idx])
    }

    /// All bases of a chromosome, or `None` if it is unknown
    pub fn get_sequence(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(chrom) = self.chromosome(name) else {
            return Ok(None);
        };
        self.fetch(chrom, 1, chrom.total_bases).map(Some)
    }

    /// Bases `[start, end]` (1-based, inclusive, clamped to the chromosome)
    pub fn get_subsequence(&self, name: &str, start: u64, end: u64) -> Result<Option<Vec<u8>>> {
        let Some(chrom) = self.chromosome(name) else {
            return Ok(None);
        };
        self.fetch(chrom, start, end).map(Some)
    }

    /// Bases `[start, end]` as 4-bit codes
    pub fn get_sequence_codes(&self, name: &str, start: u64, end: u64) -> Result<Option<Vec<u8>>> {
        let Some(chrom) = self.chromosome(name) else {
            return Ok(None);
        };
        let (start, end) = clamp(chrom, start, end);
        if start > end {
            return Ok(Some(Vec::new()));
        }
        if let Some((data, index)) = &chrom.artifacts.nib {
            let mut reader = NibReader::open(data, index)?;
            return reader.read_codes(start, end).map(Some);
        }
        let bases = self.fetch(chrom, start, end)?;
        bases
            .iter()
            .enumerate()
            .map(|(offset, &symbol)| {
                nuc::encode(symbol).ok_or_else(|| {
                    ReadError::CorruptStream(format!(
                        "unencodable symbol {:?} at {}:{}",
                        symbol as char,
                        chrom.name,
                        start + offset as u64
                    ))
                    .into()
                })
            })
            .collect::<Result<Vec<u8>>>()
            .map(Some)
    }

    /// GC-content profile of `[start, end]` at `scale`
    ///
    /// Served from the pyramid when one is registered and the resolution allows
    /// it, otherwise computed from the bases.
    pub fn query_gc(&self, name: &str, start: u64, end: u64, scale: f64) -> Result<Option<GcProfile>> {
        let Some(chrom) = self.chromosome(name) else {
            return Ok(None);
        };
        let end = end.min(chrom.total_bases);
        if let Some((data, index)) = &chrom.artifacts.gc {
            let mut reader = GcPyramidReader::open(data, index)?;
            if let Some(profile) = reader.query(start, end, scale)? {
                return Ok(Some(profile));
            }
            debug!("scale {scale} is finer than the pyramid of {}", chrom.name);
        }
        let bases = if chrom.artifacts.nib.is_some() {
            self.get_sequence_codes(&chrom.name, start, end)?.unwrap_or_default()
        } else {
            self.fetch(chrom, start, end)?
        };
        exact_profile(&bases, start, end, scale).map(Some)
    }

    /// Reads a clamped range from the Nib stream, or from the FASTA without one
    fn fetch(&self, chrom: &ChromosomeDescriptor, start: u64, end: u64) -> Result<Vec<u8>> {
        let (start, end) = clamp(chrom, start, end);
        if start > end {
            return Ok(Vec::new());
        }
        if let Some((data, index)) = &chrom.artifacts.nib {
            let mut reader = NibReader::open(data, index)?;
            return reader.read_bases(start, end);
        }
        let fasta = self
            .fasta
            .as_ref()
            .ok_or_else(|| ReadError::MissingArtifact(format!("sequence of {}", chrom.name)))?;
        Ok(fasta
            .read_range(&chrom.name, start, end)
            .unwrap_or_default())
    }
}

fn clamp(chrom: &ChromosomeDescriptor, start: u64, end: u64) -> (u64, u64) {
    (start.max(1), end.min(chrom.total_bases))
}

/// A named sequence returned by a [`ReferenceSequenceFile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequence {
    pub name: String,

    /// Position of the sequence in the dictionary
    pub index: usize,
    pub bases: Vec<u8>,
}

/// Name and length of one dictionary entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDictionaryEntry {
    pub name: String,
    pub length: u64,
}

/// Random-access reference sequence capability expected by alignment and
/// variant tooling
#[auto_impl(&mut, Box)]
pub trait ReferenceSequenceFile {
    /// Names and lengths of all sequences, in order
    fn sequence_dictionary(&self) -> Vec<SequenceDictionaryEntry>;

    /// Next whole sequence in dictionary order, or `None` past the last one
    fn next_sequence(&mut self) -> Result<Option<ReferenceSequence>>;

    /// Restarts [`ReferenceSequenceFile::next_sequence`] at the first sequence
    fn reset(&mut self);

    /// Whole sequence by name
    fn get_sequence(&mut self, contig: &str) -> Result<Option<ReferenceSequence>>;

    /// Bases `[start, stop]` (1-based, inclusive) of a sequence
    fn get_subsequence_at(
        &mut self,
        contig: &str,
        start: u64,
        stop: u64,
    ) -> Result<Option<ReferenceSequence>>;

    fn close(&mut self) -> Result<()>;
}

/// [`ReferenceSequenceFile`] over a [`Reference`]
#[derive(Debug, Clone)]
pub struct ReferenceSequenceAdapter {
    reference: Reference,
    cursor: usize,
}
impl ReferenceSequenceAdapter {
    #[must_use]
    pub fn new(reference: Reference) -> Self {
        Self {
            reference,
            cursor: 0,
        }
    }

    fn record(&self, index: usize, bases: Vec<u8>) -> ReferenceSequence {
        ReferenceSequence {
            name: self.reference.chromosomes[index].name.clone(),
            index,
            bases,
        }
    }

    fn resolve(&self, contig: &str) -> Option<usize> {
        let name = &self.reference.chromosome(contig)?.name;
        self.reference.lookup.get(name).copied()
    }
}

impl ReferenceSequenceFile for ReferenceSequenceAdapter {
    fn sequence_dictionary(&self) -> Vec<SequenceDictionaryEntry> {
        self.reference
            .chromosomes
            .iter()
            .map(|chrom| SequenceDictionaryEntry {
                name: chrom.name.clone(),
                length: chrom.total_bases,
            })
            .collect()
    }

    fn next_sequence(&mut self) -> Result<Option<ReferenceSequence>> {
        let Some(chrom) = self.reference.chromosomes.get(self.cursor) else {
            return Ok(None);
        };
        let bases = self.reference.fetch(chrom, 1, chrom.total_bases)?;
        let record = self.record(self.cursor, bases);
        self.cursor += 1;
        Ok(Some(record))
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn get_sequence(&mut self, contig: &str) -> Result<Option<ReferenceSequence>> {
        let Some(index) = self.resolve(contig) else {
            return Ok(None);
        };
        let chrom = &self.reference.chromosomes[index];
        let bases = self.reference.fetch(chrom, 1, chrom.total_bases)?;
        Ok(Some(self.record(index, bases)))
    }

    fn get_subsequence_at(
        &mut self,
        contig: &str,
        start: u64,
        stop: u64,
    ) -> Result<Option<ReferenceSequence>> {
        let Some(index) = self.resolve(contig) else {
            return Ok(None);
        };
        let bases = self
            .reference
            .fetch(&self.reference.chromosomes[index], start, stop)?;
        Ok(Some(self.record(index, bases)))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fasta::{index_path, ContigIndexer},
        register::{RegisterConfig, Registrar},
        test_utils::{random_bases, rng, write_fasta, DNA, SOFT_MASKED},
    };

    struct Fixture {
        _dir: tempfile::TempDir,
        fasta: PathBuf,
        out: PathBuf,
        chr1: Vec<u8>,
        chr2: Vec<u8>,
    }

    fn fixture(register: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = rng();
        let chr1 = random_bases(&mut rng, 25_000, DNA);
        let chr2 = random_bases(&mut rng, 333, SOFT_MASKED);
        let fasta = write_fasta(
            dir.path(),
            &[("chr1", chr1.as_slice()), ("chr2", chr2.as_slice())],
            60,
            "\n",
        );
        let out = dir.path().join("artifacts");
        if register {
            Registrar::new(RegisterConfig::default().threads(2))
                .register(&fasta, &out)
                .unwrap();
        } else {
            let table = ContigIndexer::from_path(&fasta).unwrap().build().unwrap();
            table.write_path(index_path(&fasta)).unwrap();
        }
        Fixture {
            _dir: dir,
            fasta,
            out,
            chr1,
            chr2,
        }
    }

    // ==================== Naming Tests ====================

    #[test]
    fn test_contig_dir_is_injective() {
        let root = Path::new("out");
        assert_eq!(contig_dir(root, "chr1"), root.join("chr1"));
        assert_eq!(contig_dir(root, "chrUn_KI270302v1.1"), root.join("chrUn_KI270302v1.1"));
        assert_eq!(contig_dir(root, "a/b"), root.join("a%2Fb"));
        assert_ne!(contig_dir(root, "a/b"), contig_dir(root, "a_b"));
        assert_ne!(contig_dir(root, "a%2Fb"), contig_dir(root, "a/b"));
        assert_eq!(contig_dir(root, "HLA-A*01:01"), root.join("HLA-A%2A01%3A01"));
    }

    #[test]
    fn test_contig_dir_stays_below_root() {
        let root = Path::new("out");
        assert_eq!(contig_dir(root, "."), root.join("%2E"));
        assert_eq!(contig_dir(root, ".."), root.join("%2E%2E"));
        assert_eq!(contig_dir(root, "../x"), root.join("..%2Fx"));
        assert_eq!(contig_dir(root, "..x"), root.join("..x"));
    }

    #[test]
    fn test_alternate_name() {
        assert_eq!(alternate_name("chr1").as_deref(), Some("1"));
        assert_eq!(alternate_name("1").as_deref(), Some("chr1"));
        assert_eq!(alternate_name("ChrX").as_deref(), Some("X"));
        assert_eq!(alternate_name("MT").as_deref(), Some("chrMT"));
        assert_eq!(alternate_name("chr"), None);
        assert_eq!(alternate_name(""), None);
    }

    #[test]
    fn test_chromosome_lookup_uses_alternate_name() {
        let fx = fixture(false);
        let reference = Reference::open(&fx.fasta, &fx.out).unwrap();
        assert_eq!(reference.chromosome("chr2").unwrap().total_bases, 333);
        assert_eq!(reference.chromosome("2").unwrap().name, "chr2");
        assert!(reference.chromosome("chr3").is_none());
    }

    // ==================== Sequence Tests ====================

    #[test]
    fn test_fasta_only_reference() {
        let fx = fixture(false);
        let reference = Reference::open(&fx.fasta, &fx.out).unwrap();
        assert_eq!(reference.chromosomes()[0].artifacts, ArtifactPaths::default());
        assert_eq!(
            reference.get_subsequence("1", 100, 250).unwrap().unwrap(),
            &fx.chr1[99..250]
        );
        assert_eq!(reference.get_sequence("chr2").unwrap().unwrap(), fx.chr2);
        assert!(reference.get_sequence("chrUn").unwrap().is_none());
    }

    #[test]
    fn test_codes_from_fasta_reject_unencodable_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let fasta = write_fasta(dir.path(), &[("chrM", b"ACGTRYACGT".as_slice())], 60, "\n");
        let table = ContigIndexer::from_path(&fasta).unwrap().build().unwrap();
        table.write_path(index_path(&fasta)).unwrap();
        let reference = Reference::open(&fasta, dir.path().join("artifacts")).unwrap();

        let codes = reference.get_sequence_codes("chrM", 1, 4).unwrap().unwrap();
        assert_eq!(codes, vec![nuc::CODE_A, nuc::CODE_C, nuc::CODE_G, nuc::CODE_T]);
        let err = reference.get_sequence_codes("chrM", 1, 10).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_registered_reference_matches_fasta() {
        let fx = fixture(true);
        let reference = Reference::open(&fx.fasta, &fx.out).unwrap();
        assert!(reference.chromosome("chr1").unwrap().artifacts.nib.is_some());
        assert_eq!(
            reference.get_subsequence("chr2", 7, 300).unwrap().unwrap(),
            &fx.chr2[6..300]
        );
        assert_eq!(
            reference.get_subsequence("chr1", 24_990, 30_000).unwrap().unwrap(),
            &fx.chr1[24_989..]
        );
        let codes = reference.get_sequence_codes("chr2", 1, 4).unwrap().unwrap();
        let expected: Vec<u8> = fx.chr2[..4].iter().map(|&b| nuc::encode(b).unwrap()).collect();
        assert_eq!(codes, expected);
    }

    // ==================== GC Tests ====================

    #[test]
    fn test_query_gc_with_and_without_pyramid() {
        let registered = fixture(true);
        let plain = fixture(false);
        let with_pyramid = Reference::open(&registered.fasta, &registered.out).unwrap();
        let without = Reference::open(&plain.fasta, &plain.out).unwrap();

        let a = with_pyramid.query_gc("chr1", 1, 20_000, 0.001).unwrap().unwrap();
        let b = without.query_gc("chr1", 1, 20_000, 0.001).unwrap().unwrap();
        assert_eq!(a.len(), 20);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!((x.start, x.end), (y.start, y.end));
            assert!((x.gc_fraction - y.gc_fraction).abs() < 0.01);
        }

        // finer than a level-0 cell
        let fine = with_pyramid.query_gc("chr2", 1, 333, 0.5).unwrap().unwrap();
        assert_eq!(fine.len(), 167);
    }

    // ==================== Adapter Tests ====================

    #[test]
    fn test_adapter_iteration_and_reset() {
        let fx = fixture(true);
        let reference = Reference::open(&fx.fasta, &fx.out).unwrap();
        let mut adapter = ReferenceSequenceAdapter::new(reference);

        let dictionary = adapter.sequence_dictionary();
        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary[1].length, 333);

        let first = adapter.next_sequence().unwrap().unwrap();
        assert_eq!(first.name, "chr1");
        assert_eq!(first.bases, fx.chr1);
        let second = adapter.next_sequence().unwrap().unwrap();
        assert_eq!(second.index, 1);
        assert!(adapter.next_sequence().unwrap().is_none());

        adapter.reset();
        assert_eq!(adapter.next_sequence().unwrap().unwrap().name, "chr1");
        adapter.close().unwrap();
    }

    #[test]
    fn test_adapter_through_trait_object() {
        let fx = fixture(false);
        let reference = Reference::open(&fx.fasta, &fx.out).unwrap();
        let mut boxed: Box<dyn ReferenceSequenceFile> =
            Box::new(ReferenceSequenceAdapter::new(reference));

        let sub = boxed.get_subsequence_at("2", 10, 19).unwrap().unwrap();
        assert_eq!(sub.name, "chr2");
        assert_eq!(sub.bases, &fx.chr2[9..19]);
        assert!(boxed.get_sequence("chrZ").unwrap().is_none());
    }
}
