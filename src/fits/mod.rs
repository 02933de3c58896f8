//! FITS codec built on cfitsio.
//!
//! The high level [`fitsio`] crate opens and closes files, everything else goes through the raw
//! `fitsio_sys` routines with their status checked after every call.

/// Call a cfitsio routine, appending the status argument and checking it afterwards.
macro_rules! fits_call {
    ($f:ident($($arg:expr),* $(,)?)) => {{
        let mut status = 0;
        unsafe {
            fitsio_sys::$f($($arg,)* &mut status);
        }
        fitsio::errors::check_status(status)
    }};
}

pub mod cards;
pub mod format;
pub mod keywords;
mod reader;
pub mod verify;
mod writer;

pub use reader::read_fits;
pub use writer::{write_fits, FitsOptions, PRIMARY_TABLE_NAME};
