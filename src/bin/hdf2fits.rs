//! Convert a directory of HDFITS files to FITS.

use std::path::PathBuf;

use clap::Parser;

use hdfits::convert::{self, BatchOptions, Target};
use hdfits::fits::FitsOptions;

#[derive(Parser, Debug)]
#[command(version, about = "Convert HDF5 files in HDFITS format to FITS files")]
struct Args {
    /// Input directory.
    input: PathBuf,

    /// Output directory, created if missing.
    output: PathBuf,

    /// Extension of the HDFITS files to convert.
    #[arg(short = 'x', long, default_value = "h5")]
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
