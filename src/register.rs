//! # Registration
//!
//! Encodes every contig of an indexed FASTA into its Nib stream and GC pyramid.
//!
//! Artifacts are written to a temporary file inside their destination directory
//! and renamed into place once complete, so a reader never observes a partially
//! written stream. Contigs are distributed over worker threads in contiguous
//! runs, one writer per contig.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::{
    block::BlockConfig,
    error::{Error, IntoRefseqError, ReadError},
    fasta::{index_path, ContigIndexTable, ContigIndexer, ContigLayoutEntry, FastaReader},
    gc::{GcPyramidWriter, PyramidConfig},
    nib::NibWriter,
    reference::{contig_dir, ArtifactPaths, ChromosomeDescriptor},
    Result,
};

/// Settings of a registration run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterConfig {
    /// Container settings shared by all artifacts
    pub block: BlockConfig,

    pub pyramid: PyramidConfig,

    /// Worker threads (0 uses every available core)
    pub threads: usize,

    /// Whether GC pyramids are built alongside the Nib streams
    pub create_gc: bool,
}
impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            block: BlockConfig::default(),
            pyramid: PyramidConfig::default(),
            threads: 0,
            create_gc: true,
        }
    }
}
impl RegisterConfig {
    #[must_use]
    pub fn block(mut self, block: BlockConfig) -> Self {
        self.block = block;
        self
    }

    #[must_use]
    pub fn pyramid(mut self, pyramid: PyramidConfig) -> Self {
        self.pyramid = pyramid;
        self
    }

    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn create_gc(mut self, create_gc: bool) -> Self {
        self.create_gc = create_gc;
        self
    }

    /// Number of threads actually spawned
    #[must_use]
    pub fn num_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads.min(num_cpus::get())
        }
    }
}

/// Turns a FASTA file into per-contig binary artifacts
#[derive(Debug, Clone, Copy, Default)]
pub struct Registrar {
    config: RegisterConfig,
}
impl Registrar {
    #[must_use]
    pub fn new(config: RegisterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RegisterConfig {
        &self.config
    }

    /// Loads the sidecar index of `fasta`, building and writing it when absent
    pub fn ensure_index(fasta: &Path) -> Result<ContigIndexTable> {
        let sidecar = index_path(fasta);
        if sidecar.is_file() {
            debug!("using existing index {}", sidecar.display());
            return ContigIndexTable::from_path(&sidecar);
        }
        let table = ContigIndexer::from_path(fasta)?.build()?;
        let mut staged = NamedTempFile::new_in(parent_dir(&sidecar))?;
        {
            let mut handle = BufWriter::new(staged.as_file_mut());
            table.write_to(&mut handle)?;
            handle.flush()?;
        }
        publish(staged, &sidecar)?;
        info!("indexed {} contigs into {}", table.len(), sidecar.display());
        Ok(table)
    }

    /// Registers every contig of `fasta` below `out_dir`
    ///
    /// Returns one descriptor per contig in FASTA order.
    pub fn register<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        fasta: P,
        out_dir: Q,
    ) -> Result<Vec<ChromosomeDescriptor>> {
        let fasta = fasta.as_ref();
        let out_dir = out_dir.as_ref().to_path_buf();
        let table = Self::ensure_index(fasta)?;
        fs::create_dir_all(&out_dir)?;

        let num_contigs = table.len();
        let num_threads = self.config.num_threads().min(num_contigs).max(1);
        let contigs_per_thread = num_contigs.div_ceil(num_threads);
        info!(
            "registering {num_contigs} contigs of {} with {num_threads} threads",
            fasta.display()
        );

        let reader = Arc::new(FastaReader::new(fasta, table));
        let out_dir = Arc::new(out_dir);

        let mut handles = Vec::new();
        for tid in 0..num_threads {
            let reader = reader.clone();
            let out_dir = out_dir.clone();
            let config = self.config;
            let start = tid * contigs_per_thread;
            let range = start..(start + contigs_per_thread).min(num_contigs);

            let handle = std::thread::spawn(move || -> Result<Vec<ChromosomeDescriptor>> {
                encode_range(&reader, &out_dir, &config, range)
            });
            handles.push(handle);
        }

        let mut descriptors = Vec::with_capacity(num_contigs);
        for handle in handles {
            let encoded = handle
                .join()
                .map_err(|_| Error::GenericError("registration worker panicked".into()))??;
            descriptors.extend(encoded);
        }
        info!("registered {} contigs into {}", descriptors.len(), out_dir.display());
        Ok(descriptors)
    }
}

/// Encodes the contigs at `range` of the table, in order
fn encode_range(
    reader: &FastaReader,
    out_dir: &Path,
    config: &RegisterConfig,
    range: Range<usize>,
) -> Result<Vec<ChromosomeDescriptor>> {
    let mut descriptors = Vec::with_capacity(range.len());
    for idx in range {
        let Some(entry) = reader.table().entry(idx) else {
            break;
        };
        descriptors.push(encode_contig(reader, entry, out_dir, config)?);
    }
    Ok(descriptors)
}

/// Writes the artifacts of one contig
fn encode_contig(
    reader: &FastaReader,
    entry: &ContigLayoutEntry,
    out_dir: &Path,
    config: &RegisterConfig,
) -> Result<ChromosomeDescriptor> {
    let bases = reader
        .get_sequence(&entry.name)
        .ok_or_else(|| ReadError::MissingArtifact(format!("contig {}", entry.name)))?;
    if bases.len() as u64 != entry.total_bases {
        return Err(ReadError::TruncatedStream {
            expected: entry.total_bases as usize,
            found: bases.len(),
        }
        .into());
    }

    let dir = contig_dir(out_dir, &entry.name);
    fs::create_dir_all(&dir)?;
    let paths = ArtifactPaths::in_dir(&dir);

    if let Some((data, index)) = &paths.nib {
        let (staged_data, staged_index) = stage_pair(&dir)?;
        let writer = NibWriter::new(
            BufWriter::new(staged_data.reopen()?),
            BufWriter::new(staged_index.reopen()?),
            config.block,
        )?;
        let (data_handle, index_handle) = writer.write_sequence(&bases)?;
        flush(data_handle)?;
        flush(index_handle)?;
        publish(staged_data, data)?;
        publish(staged_index, index)?;
    }

    let gc = if config.create_gc {
        let (staged_data, staged_index) = stage_pair(&dir)?;
        let mut writer = GcPyramidWriter::new(
            BufWriter::new(staged_data.reopen()?),
            BufWriter::new(staged_index.reopen()?),
            entry.total_bases,
            config.pyramid,
            config.block,
        )?;
        writer.push_slice(&bases)?;
        let (data_handle, index_handle) = writer.finish()?;
        flush(data_handle)?;
        flush(index_handle)?;
        if let Some((data, index)) = &paths.gc {
            publish(staged_data, data)?;
            publish(staged_index, index)?;
        }
        paths.gc
    } else {
        None
    };

    debug!("encoded {} ({} bases) into {}", entry.name, entry.total_bases, dir.display());
    Ok(ChromosomeDescriptor {
        name: entry.name.clone(),
        total_bases: entry.total_bases,
        artifacts: ArtifactPaths { nib: paths.nib, gc },
    })
}

fn stage_pair(dir: &Path) -> Result<(NamedTempFile, NamedTempFile)> {
    Ok((NamedTempFile::new_in(dir)?, NamedTempFile::new_in(dir)?))
}

fn flush(mut handle: BufWriter<File>) -> Result<()> {
    handle.flush()?;
    Ok(())
}

/// Renames a staged file into its final location
fn publish(staged: NamedTempFile, destination: &Path) -> Result<()> {
    staged
        .persist(destination)
        .map_err(IntoRefseqError::into_refseq_error)?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
