//! Dataset creation options: compression mode, filter pipeline and chunk shape.

use std::fmt;
use std::str::FromStr;

use hdf5::filters::{Filter, ScaleOffset};
use log::{debug, warn};

use crate::hdu::ElementType;

/// Deflate level used when `gzip` is given without one.
pub const DEFAULT_GZIP_LEVEL: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip(u8),
    Lzf,
    /// Bit shuffle followed by LZ4, through the blosc filter.
    Bitshuffle,
}

impl FromStr for Compression {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();

        match s.split_once(':') {
            Some(("gzip", level)) => {
                let level: u8 = level
                    .parse()
                    .map_err(|_| anyhow!("Invalid gzip level: {}", level))?;
                ensure!(level <= 9, "Invalid gzip level: {}, must be 0-9", level);
                Ok(Compression::Gzip(level))
            }
            Some(_) => bail!("Unknown compression: {}", s),
            None => match s.as_str() {
                "" | "none" => Ok(Compression::None),
                "gzip" => Ok(Compression::Gzip(DEFAULT_GZIP_LEVEL)),
                "lzf" => Ok(Compression::Lzf),
                "bitshuffle" => Ok(Compression::Bitshuffle),
                _ => bail!("Unknown compression: {}", s),
            },
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip(level) => write!(f, "gzip:{level}"),
            Compression::Lzf => write!(f, "lzf"),
            Compression::Bitshuffle => write!(f, "bitshuffle"),
        }
    }
}

/// How tables are laid out in the HDF5 file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableLayout {
    /// One compound dataset, one field per column.
    #[default]
    Table,
    /// A group with one dataset per column.
    DataGroup,
}

#[derive(Debug, Clone, Default)]
pub struct HdfOptions {
    pub compression: Compression,

    /// Byte shuffle before compression.
    pub shuffle: bool,

    /// Fletcher32 checksum of every chunk.
    pub checksum: bool,

    /// Scale-offset filter: minimum bits for integers, decimal scale factor for floats.
    pub scale_offset: Option<u32>,

    /// Chunk shape, guessed from the dataset shape when not given.
    pub chunks: Option<Vec<usize>>,

    pub table_layout: TableLayout,
}

/// Largest number of elements in a guessed chunk.
pub const MAX_CHUNK_ELEMENTS: usize = 1 << 22;

/// Chunk shape for a dataset, by rank: rank 1 up to 1024 elements, rank 2 up to 256x256, rank 3
/// up to 128x128x16 and so on. Every axis is at least 1 and at most the length of the axis, and
/// the largest axes are halved until the chunk holds at most [`MAX_CHUNK_ELEMENTS`].
#[must_use]
pub fn guess_chunk(shape: &[usize]) -> Vec<usize> {
    let caps: Vec<usize> = match shape.len() {
        0 => return Vec::new(),
        1 => vec![1024],
        2 => vec![256, 256],
        3 => vec![128, 128, 16],
        4 => vec![128, 128, 16, 16],
        5 => vec![1, 10, 128, 16, 16],
        _ => shape.iter().map(|s| s.div_ceil(32) + 1).collect(),
    };

    let mut chunk: Vec<usize> = shape
        .iter()
        .zip(caps)
        .map(|(s, c)| c.min(*s).max(1))
        .collect();

    while chunk.iter().product::<usize>() > MAX_CHUNK_ELEMENTS {
        let Some(largest) = chunk.iter_mut().max() else {
            break;
        };
        *largest = largest.div_ceil(2);
    }

    chunk
}

#[cfg(feature = "lzf")]
fn lzf() -> Option<Filter> {
    hdf5::filters::lzf_available().then_some(Filter::LZF)
}

#[cfg(not(feature = "lzf"))]
fn lzf() -> Option<Filter> {
    None
}

#[cfg(feature = "blosc")]
fn bitshuffle() -> Option<Filter> {
    use hdf5::filters::{Blosc, BloscShuffle};

    hdf5::filters::blosc_available().then_some(Filter::Blosc(Blosc::LZ4, 5, BloscShuffle::Bit))
}

#[cfg(not(feature = "blosc"))]
fn bitshuffle() -> Option<Filter> {
    None
}

/// A chunked layout and its filters, or `None` for a contiguous unfiltered dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub chunk: Vec<usize>,
    pub filters: Vec<Filter>,
}

impl HdfOptions {
    /// Select the filter pipeline for a dataset of the given shape. `ty` is the element type of
    /// plain arrays and `None` for compound (table) datasets.
    ///
    /// Unavailable filters fall back to no compression with a warning. Datasets with an empty
    /// axis cannot be chunked and are always contiguous.
    #[must_use]
    pub fn pipeline(&self, shape: &[usize], ty: Option<ElementType>) -> Option<Pipeline> {
        if shape.is_empty() || shape.contains(&0) {
            return None;
        }

        let numeric = ty.is_some_and(|t| t.is_numeric() && !t.is_complex());
        let mut filters = Vec::new();

        if let Some(so) = self.scale_offset {
            match ty {
                Some(t) if t.is_integer() => {
                    filters.push(Filter::ScaleOffset(ScaleOffset::Integer(so.min(u16::MAX as u32) as u16)))
                }
                Some(t) if t.is_float() => {
                    filters.push(Filter::ScaleOffset(ScaleOffset::FloatDScale(so.min(u8::MAX as u32) as u8)))
                }
                _ => debug!("Scale-offset does not apply to {ty:?} data"),
            }
        }

        if self.shuffle {
            filters.push(Filter::Shuffle);
        }

        match self.compression {
            Compression::None => (),
            Compression::Gzip(level) => {
                if hdf5::filters::deflate_available() {
                    filters.push(Filter::Deflate(level));
                } else {
                    warn!("gzip filter not available, writing uncompressed");
                }
            }
            Compression::Lzf => match lzf() {
                Some(f) => filters.push(f),
                None => warn!("lzf filter not available, writing uncompressed"),
            },
            Compression::Bitshuffle if !numeric => {
                debug!("bitshuffle only applies to plain numeric data, writing uncompressed");
            }
            Compression::Bitshuffle => match bitshuffle() {
                Some(f) => filters.push(f),
                None => warn!("bitshuffle filter not available, writing uncompressed"),
            },
        }

        if self.checksum {
            filters.push(Filter::Fletcher32);
        }

        if filters.is_empty() && self.chunks.is_none() {
            return None;
        }

        let chunk = match &self.chunks {
            Some(c) if c.len() == shape.len() => c
                .iter()
                .zip(shape)
                .map(|(c, s)| (*c).clamp(1, *s))
                .collect(),
            Some(c) => {
                warn!("Chunk shape {c:?} does not match dataset shape {shape:?}, guessing");
                guess_chunk(shape)
            }
            None => guess_chunk(shape),
        };

        Some(Pipeline { chunk, filters })
    }
}
