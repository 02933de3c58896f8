//! Convert a directory of FITS files to HDF5 files in HDFITS format.

use std::path::PathBuf;

use clap::Parser;

use hdfits::convert::{self, BatchOptions, Target};
use hdfits::hdf::{Compression, HdfOptions, TableLayout};

#[derive(Parser, Debug)]
#[command(version, about = "Convert FITS files to HDF5 files in HDFITS format")]
struct Args {
    /// Input directory.
    input: PathBuf,

    /// Output directory, created if missing.
    output: PathBuf,

    /// Compression: none, gzip, gzip:<0-9>, lzf or bitshuffle.
    #[arg(short, long, default_value = "none")]
    compression: Compression,

    /// Extension of the FITS files to convert.
    #[arg(short = 'x', long, default_value = "fits")]
    extension: String,

    /// Scale-offset filter: minimum bits for integers, decimal scale for floats.
    #[arg(short, long)]
    scale_offset: Option<u32>,

    /// Apply the byte shuffle filter.
    #[arg(short = 'S', long)]
    shuffle: bool,

    /// Compute fletcher32 checksums of datasets.
    #[arg(short = 'C', long)]
    checksum: bool,

    /// Chunk shape, comma separated. Guessed from the data shape by default.
    #[arg(long, value_delimiter = ',')]
    chunks: Option<Vec<usize>>,

    /// Write tables as a group with one dataset per column.
    #[arg(long)]
    data_group: bool,

    /// Overwrite existing output files.
    #[arg(short, long)]
    overwrite: bool,

    /// Convert files in parallel.
    #[arg(short = 'j', long)]
    parallel: bool,

    /// More output, repeat for even more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

fn init_logger(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_logger(args.verbose, args.quiet);

    let hdf = HdfOptions {
        compression: args.compression,
        shuffle: args.shuffle,
        checksum: args.checksum,
        scale_offset: args.scale_offset,
        chunks: args.chunks,
        table_layout: if args.data_group {
            TableLayout::DataGroup
        } else {
            TableLayout::Table
        },
    };

    let batch = BatchOptions {
        input: args.input,
        output: args.output,
        extension: args.extension,
        overwrite: args.overwrite,
        parallel: args.parallel,
    };

    let summary = convert::convert_dir(&batch, &Target::Hdf(hdf))?;
    println!("{summary}");

    Ok(())
}
