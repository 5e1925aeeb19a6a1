use std::path::{Path, PathBuf};

use rand::{rngs::SmallRng, Rng, SeedableRng};

pub const RNG_SEED: u64 = 42;

pub const DNA: &[u8] = b"ACGT";
pub const SOFT_MASKED: &[u8] = b"ACGTNacgtn";

pub fn rng() -> SmallRng {
    SmallRng::seed_from_u64(RNG_SEED)
}

pub fn random_bases(rng: &mut SmallRng, len: usize, alphabet: &[u8]) -> Vec<u8> {
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect()
}

/// Formats contigs as FASTA with `bases_per_line` bases per line
pub fn format_fasta(contigs: &[(&str, &[u8])], bases_per_line: usize, newline: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, bases) in contigs {
        out.extend_from_slice(format!(">{name} test contig{newline}").as_bytes());
        for line in bases.chunks(bases_per_line) {
            out.extend_from_slice(line);
            out.extend_from_slice(newline.as_bytes());
        }
    }
    out
}

pub fn write_fasta(
    dir: &Path,
    contigs: &[(&str, &[u8])],
    bases_per_line: usize,
    newline: &str,
) -> PathBuf {
    let path = dir.join("reference.fa");
    std::fs::write(&path, format_fasta(contigs, bases_per_line, newline)).unwrap();
    path
}
