//! Read FITS files into memory and write them out again, without going through HDF5.
//!
//! Shows what a FITS to HDFITS to FITS conversion does to a file: ASCII tables and random groups
//! come back as binary tables, structural keywords are rewritten and units are normalized.

use std::path::PathBuf;

use clap::Parser;

use hdfits::convert::{self, BatchOptions, Target};
use hdfits::fits::FitsOptions;

#[derive(Parser, Debug)]
#[command(version, about = "Rewrite FITS files through the in-memory HDU model")]
struct Args {
    /// Input directory.
    input: PathBuf,

    /// Output directory, created if missing. Must differ from the input directory.
    output: PathBuf,

    /// Extension of the FITS files to rewrite.
    #[arg(short = 'x', long, default_value = "fits")]
    extension: String,

    /// Do not write CHECKSUM and DATASUM keywords.
    #[arg(long)]
    no_checksum: bool,

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

    let fits = FitsOptions {
        checksum: !args.no_checksum,
        ..Default::default()
    };

    let batch = BatchOptions {
        input: args.input,
        output: args.output,
        extension: args.extension,
        overwrite: args.overwrite,
        parallel: args.parallel,
    };

    let summary = convert::convert_dir(&batch, &Target::Fits(fits))?;
    println!("{summary}");

    Ok(())
}
