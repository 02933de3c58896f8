//! HDFITS codec: FITS semantics in an HDF5 container.
//!
//! ```text
//! /                       CLASS = "HDFITS"
//! ├── PRIMARY             CLASS = "HDU", header keywords as attributes
//! │   └── HISTORY         strings
//! ├── SCI                 CLASS = "HDU"
//! │   └── DATA            CLASS = "IMAGE", IMAGE_VERSION
//! └── EVENTS              CLASS = "HDU"
//!     └── DATA            CLASS = "TABLE", FIELD_<i>_NAME/UNITS/FILL, NROWS, VERSION, TITLE
//! ```
//!
//! Tables can also be written as a `DATA` group (`CLASS = "DATA_GROUP"`) holding one dataset per
//! column (`CLASS = "COLUMN"`, `COLUMN_ID`, `UNITS`).

pub mod attrs;
pub mod compress;
pub mod order;
mod reader;
pub mod types;
mod writer;

pub use compress::{Compression, HdfOptions, TableLayout};
pub use reader::read_hdf;
pub use writer::write_hdf;

/// Attribute naming the role of a group or dataset.
pub const CLASS: &str = "CLASS";

pub const CLASS_ROOT: &str = "HDFITS";
pub const CLASS_HDU: &str = "HDU";
pub const CLASS_IMAGE: &str = "IMAGE";
pub const CLASS_TABLE: &str = "TABLE";
pub const CLASS_DATA_GROUP: &str = "DATA_GROUP";
pub const CLASS_COLUMN: &str = "COLUMN";

/// Name of the payload of an HDU group.
pub const DATA: &str = "DATA";
pub const COMMENT: &str = "COMMENT";
pub const HISTORY: &str = "HISTORY";

pub const TABLE_VERSION: f64 = 2.6;
pub const IMAGE_VERSION: &str = "1.2";
