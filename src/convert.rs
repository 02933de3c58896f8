//! Batch conversion of all matching files in a directory.
//!
//! Every file is read completely into an [`HduList`](crate::hdu::HduList) and written out again
//! in the target format. A file that fails is logged and skipped, the batch carries on.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use log::{debug, error, info};
use rayon::prelude::*;

use crate::filetype::{self, FileType};
use crate::fits::{self, FitsOptions};
use crate::hdf::{self, HdfOptions};

/// Output format and its writer options.
#[derive(Debug, Clone)]
pub enum Target {
    Fits(FitsOptions),
    Hdf(HdfOptions),
}

impl Target {
    #[must_use]
    pub fn file_type(&self) -> FileType {
        match self {
            Target::Fits(_) => FileType::Fits,
            Target::Hdf(_) => FileType::Hdf,
        }
    }

    /// Extension of the output files.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Target::Fits(_) => "fits",
            Target::Hdf(_) => "h5",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input: PathBuf,
    pub output: PathBuf,

    /// Only files with this extension (without the dot, case-insensitive) are converted.
    pub extension: String,

    /// Replace existing output files instead of skipping them.
    pub overwrite: bool,

    /// Convert files in parallel.
    pub parallel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Converted,
    Skipped,
    Failed,
}

/// Result of a batch conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Files created: {}, skipped: {}, failed: {}, time taken: {:.2}s",
            self.converted,
            self.skipped,
            self.failed,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Convert a single file to `target`. The input format is detected.
pub fn convert_file<P, Q>(input: P, output: Q, target: &Target) -> Result<(), anyhow::Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (input, output) = (input.as_ref(), output.as_ref());

    let hdus = filetype::read_any(input)?;
    debug!("{}: {} HDUs", input.display(), hdus.len());

    match target {
        Target::Fits(opts) => fits::write_fits(&hdus, output, opts),
        Target::Hdf(opts) => hdf::write_hdf(&hdus, output, opts),
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    let ext = ext.trim_start_matches('.');

    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Matching files of a directory, sorted by name.
fn list_files(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, anyhow::Error> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("Cannot list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, ext) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Output path of `input` in `dir`: the input stem with the target extension.
#[must_use]
pub fn output_path(input: &Path, dir: &Path, target: &Target) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".");
    name.push(target.extension());
    dir.join(name)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn process(input: &Path, opts: &BatchOptions, target: &Target) -> Outcome {
    let output = output_path(input, &opts.output, target);

    if output.exists() && !opts.overwrite {
        info!("{} exists, skipping", output.display());
        return Outcome::Skipped;
    }

    info!("Converting {} to {}", input.display(), output.display());
    let start = Instant::now();

    if let Err(e) = convert_file(input, &output, target) {
        error!("Cannot convert {}: {:#}", input.display(), e);
        return Outcome::Failed;
    }

    match (fs::metadata(input), fs::metadata(&output)) {
        (Ok(i), Ok(o)) => info!(
            "{}: {} B -> {} B, compression {:.2}x, {:.2}s",
            output.display(),
            i.len(),
            o.len(),
            i.len() as f64 / o.len().max(1) as f64,
            start.elapsed().as_secs_f64()
        ),
        _ => debug!("{}: sizes not available", output.display()),
    }

    Outcome::Converted
}

/// Convert every matching file of `opts.input` into `opts.output`.
///
/// Fails only on argument errors: a missing input directory, an output directory equal to the
/// input, or one that cannot be created. Failures of single files are logged and counted.
pub fn convert_dir(opts: &BatchOptions, target: &Target) -> Result<Summary, anyhow::Error> {
    ensure!(
        opts.input.is_dir(),
        "Input directory {} does not exist",
        opts.input.display()
    );
    ensure!(
        !same_dir(&opts.input, &opts.output),
        "Input directory cannot be the same as the output directory"
    );

    if !opts.output.exists() {
        info!("Creating directory {}", opts.output.display());
        fs::create_dir_all(&opts.output)
            .with_context(|| format!("Cannot create {}", opts.output.display()))?;
    }

    let files = list_files(&opts.input, &opts.extension)?;
    info!(
        "Converting {} files from {} to {} ({})",
        files.len(),
        opts.input.display(),
        opts.output.display(),
        target.file_type()
    );

    let start = Instant::now();

    let outcomes: Vec<Outcome> = if opts.parallel {
        files.par_iter().map(|f| process(f, opts, target)).collect()
    } else {
        files.iter().map(|f| process(f, opts, target)).collect()
    };

    let count = |o: Outcome| outcomes.iter().filter(|x| **x == o).count();

    let summary = Summary {
        converted: count(Outcome::Converted),
        skipped: count(Outcome::Skipped),
        failed: count(Outcome::Failed),
        elapsed: start.elapsed(),
    };
    info!("{summary}");

    Ok(summary)
}
