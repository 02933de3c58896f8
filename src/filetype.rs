//! Recognize FITS and HDF5 files by extension, or failing that by their signature.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::hdu::HduList;

pub const FITS_EXTENSIONS: &[&str] = &["fits", "fit", "fts", "sdfits", "fitsidi", "sdf", "psrfits"];
pub const HDF_EXTENSIONS: &[&str] = &["h5", "hdf", "hdf5", "hdfits"];

/// Start of the first card of every FITS file.
const FITS_SIGNATURE: &[u8; 30] = b"SIMPLE  =                    T";

const HDF_SIGNATURE: &[u8; 8] = b"\x89HDF\r\n\x1a\n";

/// Offsets the HDF5 superblock may start at when the file has a user block.
const HDF_OFFSETS: &[usize] = &[0, 512, 1024, 2048];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Fits,
    Hdf,
    Unknown,
}

impl FileType {
    /// Extension of files written in this format.
    #[must_use]
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            FileType::Fits => Some("fits"),
            FileType::Hdf => Some("h5"),
            FileType::Unknown => None,
        }
    }

    /// File type by extension alone.
    #[must_use]
    pub fn from_extension(path: &Path) -> FileType {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return FileType::Unknown;
        };
        let ext = ext.to_ascii_lowercase();

        if FITS_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Fits
        } else if HDF_EXTENSIONS.contains(&ext.as_str()) {
            FileType::Hdf
        } else {
            FileType::Unknown
        }
    }

    /// File type by the first bytes of a file.
    #[must_use]
    pub fn from_signature(head: &[u8]) -> FileType {
        if head.starts_with(FITS_SIGNATURE) {
            return FileType::Fits;
        }

        if HDF_OFFSETS
            .iter()
            .any(|o| head.get(*o..).is_some_and(|h| h.starts_with(HDF_SIGNATURE)))
        {
            FileType::Hdf
        } else {
            FileType::Unknown
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileType::Fits => "FITS",
            FileType::Hdf => "HDF5",
            FileType::Unknown => "unknown",
        })
    }
}

/// Detect the type of a file, by extension first and then by signature.
pub fn detect<P: AsRef<Path>>(path: P) -> Result<FileType, anyhow::Error> {
    let path = path.as_ref();

    match FileType::from_extension(path) {
        FileType::Unknown => (),
        t => return Ok(t),
    }

    let f = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut head = Vec::new();
    f.take(HDF_OFFSETS[HDF_OFFSETS.len() - 1] as u64 + HDF_SIGNATURE.len() as u64)
        .read_to_end(&mut head)?;

    Ok(FileType::from_signature(&head))
}

/// Read a FITS or HDFITS file, whichever it is.
pub fn read_any<P: AsRef<Path>>(path: P) -> Result<HduList, anyhow::Error> {
    let path = path.as_ref();

    match detect(path)? {
        FileType::Fits => crate::fits::read_fits(path),
        FileType::Hdf => crate::hdf::read_hdf(path),
        FileType::Unknown => bail!("{}: neither a FITS nor an HDF5 file", path.display()),
    }
}
