use std::{
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use refseq::{
    fasta::index_path, BlockConfig, PyramidConfig, Reference, RegisterConfig, Registrar,
    DEFAULT_BLOCK_SIZE, DEFAULT_COMPRESSION_LEVEL, DEFAULT_MIN_LEVEL_CELLS,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the contig index of a FASTA file
    Index { fasta: PathBuf },

    /// Encode every contig of a FASTA file into Nib and GC artifacts
    Register {
        fasta: PathBuf,
        out_dir: PathBuf,

        /// Worker threads (0 uses all cores)
        #[arg(short = 'T', long, default_value_t = 0)]
        threads: usize,

        /// Logical bytes per compressed block
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,

        #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
        compression_level: i32,

        /// Minimum number of cells a level needs before a coarser one is built
        #[arg(long, default_value_t = DEFAULT_MIN_LEVEL_CELLS)]
        min_level_cells: u64,

        /// Skip building GC pyramids
        #[arg(long)]
        no_gc: bool,
    },

    /// Print bases `[start, end]` (1-based, inclusive) of a contig
    Fetch {
        fasta: PathBuf,
        contig: String,
        start: u64,
        end: u64,

        /// Directory of registered artifacts
        #[arg(short, long)]
        artifacts: Option<PathBuf>,
    },

    /// Print the GC profile of `[start, end]` of a contig
    Gc {
        fasta: PathBuf,
        artifacts: PathBuf,
        contig: String,
        start: u64,
        end: u64,

        /// Blocks per base
        #[arg(short, long, default_value_t = 0.001)]
        scale: f64,
    },
}

fn setup_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn run_index(fasta: &Path) -> Result<()> {
    let table = Registrar::ensure_index(fasta)?;
    info!(
        "{} contigs indexed in {}",
        table.len(),
        index_path(fasta).display()
    );
    Ok(())
}

fn run_register(fasta: &Path, out_dir: &Path, config: RegisterConfig) -> Result<()> {
    let descriptors = Registrar::new(config).register(fasta, out_dir)?;
    let mut out = BufWriter::new(io::stdout().lock());
    for descriptor in descriptors {
        writeln!(out, "{}\t{}", descriptor.name, descriptor.total_bases)?;
    }
    out.flush()?;
    Ok(())
}

fn run_fetch(
    fasta: &Path,
    artifacts: Option<PathBuf>,
    contig: &str,
    start: u64,
    end: u64,
) -> Result<()> {
    Registrar::ensure_index(fasta)?;
    let artifacts =
        artifacts.unwrap_or_else(|| PathBuf::from(format!("{}.refseq", fasta.display())));
    let reference = Reference::open(fasta, &artifacts)?;
    let Some(bases) = reference.get_subsequence(contig, start, end)? else {
        bail!("unknown contig {contig}");
    };
    let mut out = BufWriter::new(io::stdout().lock());
    out.write_all(&bases)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn run_gc(
    fasta: &Path,
    artifacts: &Path,
    contig: &str,
    start: u64,
    end: u64,
    scale: f64,
) -> Result<()> {
    let reference = Reference::open(fasta, artifacts)?;
    let Some(profile) = reference.query_gc(contig, start, end, scale)? else {
        bail!("unknown contig {contig}");
    };
    let mut out = BufWriter::new(io::stdout().lock());
    for block in &profile {
        writeln!(
            out,
            "{contig}\t{}\t{}\t{:.4}",
            block.start, block.end, block.gc_fraction
        )?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose)?;

    match args.command {
        Command::Index { fasta } => run_index(&fasta),
        Command::Register {
            fasta,
            out_dir,
            threads,
            block_size,
            compression_level,
            min_level_cells,
            no_gc,
        } => {
            let config = RegisterConfig::default()
                .threads(threads)
                .create_gc(!no_gc)
                .block(
                    BlockConfig::default()
                        .block_size(block_size)
                        .compression_level(compression_level),
                )
                .pyramid(PyramidConfig::default().min_level_cells(min_level_cells));
            run_register(&fasta, &out_dir, config)
        }
        Command::Fetch {
            fasta,
            contig,
            start,
            end,
            artifacts,
        } => run_fetch(&fasta, artifacts, &contig, start, end),
        Command::Gc {
            fasta,
            artifacts,
            contig,
            start,
            end,
            scale,
        } => run_gc(&fasta, &artifacts, &contig, start, end, scale),
    }
}
