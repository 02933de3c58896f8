//! # HDFITS
//!
//! Convert astronomical FITS files to and from HDF5, keeping the FITS semantics: header keywords
//! and their comments, COMMENT and HISTORY, images, binary tables and column units.
//!
//! Both formats are read into the same in-memory [`HduList`](hdu::HduList), and written from it.
//! FITS goes through [cfitsio](https://heasarc.gsfc.nasa.gov/fitsio/), HDF5 through the [bindings
//! to the official HDF5 library](https://docs.rs/hdf5-metno).
//!
//! ## Usage
//!
//! Write a table to HDFITS and read it back:
//!
//! ```
//! use hdfits::hdf::{read_hdf, write_hdf, HdfOptions};
//! use hdfits::hdu::{Column, HduList, Header};
//!
//! let mut hdus = HduList::new();
//! hdus.add_primary("PRIMARY", Header::new()).unwrap();
//! hdus.add_table(
//!     "DATA",
//!     [
//!         Column::new("X", vec![1i32, 2, 3]),
//!         Column::new("FLUX", vec![1.5f32, 2.5, 3.5]).with_unit("Jy"),
//!     ],
//!     Header::new(),
//! )
//! .unwrap();
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("example.h5");
//!
//! write_hdf(&hdus, &path, &HdfOptions::default()).unwrap();
//! let back = read_hdf(&path).unwrap();
//!
//! let flux = back.get("DATA").unwrap().table().unwrap().column("FLUX").unwrap();
//! assert_eq!(flux.unit(), Some("Jy"));
//! assert_eq!(flux.values::<f32>().unwrap(), vec![1.5, 2.5, 3.5]);
//! ```
//!
//! Whole directories are converted with [`convert::convert_dir`], which is what the `fits2hdf`,
//! `hdf2fits` and `fits2fits` tools run.

#[macro_use]
extern crate anyhow;

pub mod convert;
pub mod filetype;
pub mod fits;
pub mod hdf;
pub mod hdu;
pub mod units;

pub use filetype::{read_any, FileType};
pub use hdu::{HduList, Header};
