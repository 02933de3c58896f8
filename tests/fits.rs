use std::ffi::{c_void, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;

use fitsio::FitsFile;
use fitsio_sys::fitsfile;
use hdfits::fits::format::{BINARY_TBL, SHORT_IMG, TSHORT};
use hdfits::fits::{read_fits, write_fits, FitsOptions, PRIMARY_TABLE_NAME};
use hdfits::hdf::{read_hdf, write_hdf, HdfOptions};
use hdfits::hdu::{Column, HduList, Header};

mod common;

/// Raw cfitsio call, panicking on a bad status.
macro_rules! cfitsio {
    ($f:ident($($arg:expr),* $(,)?)) => {{
        let mut status: c_int = 0;
        unsafe {
            fitsio_sys::$f($($arg,)* &mut status);
        }
        fitsio::errors::check_status(status).unwrap();
    }};
}

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

const PLAIN: FitsOptions = FitsOptions {
    checksum: false,
    history: false,
};

#[test]
fn sample_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.fits");

    write_fits(&common::sample(), &path, &FitsOptions::default()).unwrap();
    let back = read_fits(&path).unwrap();

    common::check_sample(&back);

    let h = back.get("PRIMARY").unwrap().header();
    assert_eq!(h.history().len(), 3);
    assert!(h.history()[2].starts_with("File created by hdfits"));
    assert!(!h.contains_key("CHECKSUM"));
    assert!(!h.contains_key("BITPIX"));
}

#[test]
fn no_history_no_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.fits");

    write_fits(&common::sample(), &path, &PLAIN).unwrap();
    let back = read_fits(&path).unwrap();

    assert_eq!(
        back.get("PRIMARY").unwrap().header().history(),
        &["step one".to_string(), "step two".to_string()]
    );

    let mut f = fitsio::FitsFile::open(&path).unwrap();
    let hdu = f.primary_hdu().unwrap();
    assert!(hdu.read_key::<String>(&mut f, "CHECKSUM").is_err());
}

#[test]
fn repeated_round_trips_are_stable() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.fits");
    let second = dir.path().join("second.fits");

    write_fits(&common::sample(), &first, &PLAIN).unwrap();
    let once = read_fits(&first).unwrap();
    write_fits(&once, &second, &PLAIN).unwrap();
    let twice = read_fits(&second).unwrap();

    let h = twice.get("PRIMARY").unwrap().header();
    assert_eq!(h.comment(), &["A sample file".to_string()]);
    assert_eq!(h.history().len(), 2);
    assert_eq!(once.get("EVENTS").unwrap().table(), twice.get("EVENTS").unwrap().table());
}

#[test]
fn through_hdf() {
    let dir = tempfile::tempdir().unwrap();
    let fits = dir.path().join("in.fits");
    let hdf = dir.path().join("mid.h5");
    let out = dir.path().join("out.fits");

    write_fits(&common::sample(), &fits, &PLAIN).unwrap();
    write_hdf(&read_fits(&fits).unwrap(), &hdf, &HdfOptions::default()).unwrap();
    write_fits(&read_hdf(&hdf).unwrap(), &out, &FitsOptions::default()).unwrap();

    common::check_sample(&read_fits(&out).unwrap());
}

#[test]
fn table_without_primary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.fits");

    let mut hdus = HduList::new();
    hdus.add_table(
        "PRIMARY",
        [Column::new("X", vec![1i64, 2]).with_unit("meters")],
        Header::new(),
    )
    .unwrap();

    write_fits(&hdus, &path, &PLAIN).unwrap();
    let back = read_fits(&path).unwrap();

    assert_eq!(back.names().collect::<Vec<_>>(), vec!["PRIMARY", PRIMARY_TABLE_NAME]);
    assert!(back.get("PRIMARY").unwrap().is_primary());

    let x = back.get(PRIMARY_TABLE_NAME).unwrap().table().unwrap().column("X").unwrap();
    assert_eq!(x.values::<i64>().unwrap(), vec![1, 2]);
    assert_eq!(x.unit(), Some("m"));
}

#[test]
fn long_and_lower_case_keywords() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.fits");

    let mut header = Header::new();
    header.insert("object", "M31");
    header.insert("LONGKEYWORD", 3i64);
    header.insert("LONGSTR", "x".repeat(100));

    let mut hdus = HduList::new();
    hdus.add_primary("PRIMARY", header).unwrap();

    write_fits(&hdus, &path, &PLAIN).unwrap();
    let h = read_fits(&path).unwrap().get("PRIMARY").unwrap().header().clone();

    assert_eq!(h.get("OBJECT"), Some(&"M31".into()));
    assert_eq!(h.get("LONGKEYWORD"), Some(&3i64.into()));
    assert_eq!(h.get("LONGSTR"), Some(&"x".repeat(100).into()));
}

#[test]
fn invalid_header_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.fits");

    let mut header = Header::new();
    header.insert("BAD", f64::NAN);

    let mut hdus = HduList::new();
    hdus.add_primary("PRIMARY", header).unwrap();

    let e = write_fits(&hdus, &path, &PLAIN).unwrap_err();
    assert!(e.to_string().contains("PRIMARY"));
    assert!(!path.exists());
}

#[test]
fn random_groups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("groups.fits");
    let out = dir.path().join("groups_out.fits");

    // Three groups of two parameters and a 1x2 array each.
    let mut fptr: *mut fitsfile = ptr::null_mut();
    let name = cstr(path.to_str().unwrap());
    cfitsio!(ffinit(&mut fptr, name.as_ptr()));

    let mut naxes = [0i64, 2, 1];
    cfitsio!(ffphprll(fptr, 1, -32, 3, naxes.as_mut_ptr(), 2, 3, 1));
    for (key, value) in [("PTYPE1", "UU"), ("PTYPE2", "VV")] {
        let (key, value) = (cstr(key), cstr(value));
        cfitsio!(ffpkys(fptr, key.as_ptr(), value.as_ptr(), ptr::null()));
    }
    cfitsio!(ffrdef(fptr));

    for g in 0..3i64 {
        let mut params = [g as f64, -(g as f64)];
        let mut data = [10.0 * g as f64, 10.0 * g as f64 + 1.0];
        cfitsio!(ffpgpd(fptr, (g + 1) as _, 1, 2, params.as_mut_ptr()));
        cfitsio!(ffpprd(fptr, (g + 1) as _, 1, 2, data.as_mut_ptr()));
    }
    cfitsio!(ffclos(fptr));

    let hdus = read_fits(&path).unwrap();
    assert_eq!(hdus.names().collect::<Vec<_>>(), vec!["PRIMARY"]);

    let t = hdus.get("PRIMARY").unwrap().table().unwrap();
    assert_eq!(t.names().collect::<Vec<_>>(), vec!["UU", "VV", "DATA"]);
    assert_eq!(t.n_rows(), 3);
    assert_eq!(t.column("UU").unwrap().values::<f64>().unwrap(), vec![0.0, 1.0, 2.0]);
    assert_eq!(t.column("VV").unwrap().values::<f64>().unwrap(), vec![0.0, -1.0, -2.0]);

    let data = t.column("DATA").unwrap();
    assert_eq!(data.cell_shape(), &[1, 2]);
    assert_eq!(
        data.values::<f32>().unwrap(),
        vec![0.0, 1.0, 10.0, 11.0, 20.0, 21.0]
    );

    write_fits(&hdus, &out, &PLAIN).unwrap();
    let back = read_fits(&out).unwrap();

    assert_eq!(back.names().collect::<Vec<_>>(), vec!["PRIMARY", PRIMARY_TABLE_NAME]);
    assert!(back.get("PRIMARY").unwrap().is_primary());
    assert_eq!(back.get(PRIMARY_TABLE_NAME).unwrap().table(), Some(t));
}

#[test]
fn tile_compressed_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compressed.fits");

    let pixels: Vec<i16> = (0..24).map(|v| v * 3 - 10).collect();

    {
        let mut f = FitsFile::create(format!("{}[compress]", path.display()))
            .open()
            .unwrap();
        let fptr = unsafe { f.as_raw() };

        let mut naxes = [6i64, 4];
        cfitsio!(ffcrimll(fptr, SHORT_IMG, 2, naxes.as_mut_ptr()));
        cfitsio!(ffppr(
            fptr,
            TSHORT,
            1,
            pixels.len() as i64,
            pixels.as_ptr() as *mut c_void
        ));
    }

    // The compressed image is stored as a binary table.
    let mut f = FitsFile::open(&path).unwrap();
    let fptr = unsafe { f.as_raw() };
    let mut hdutype: c_int = 0;
    cfitsio!(ffmahd(fptr, 2, &mut hdutype));
    assert_eq!(hdutype, BINARY_TBL);
    drop(f);

    let hdus = read_fits(&path).unwrap();
    assert_eq!(hdus.len(), 2);

    let image = hdus.iter().find_map(|h| h.image()).unwrap();
    assert_eq!(image.shape(), &[4, 6]);
    assert_eq!(image.to_vec::<i16>().unwrap(), pixels);

    let hdu = hdus.iter().find(|h| h.image().is_some()).unwrap();
    assert!(!hdu.header().contains_key("ZIMAGE"));
}

#[test]
fn bit_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bits.fits");

    {
        let mut f = FitsFile::create(&path).open().unwrap();
        let fptr = unsafe { f.as_raw() };

        let (ttype, tform, tunit) = (cstr("FLAGS"), cstr("3X"), cstr(""));
        let mut ttype = [ttype.as_ptr() as *mut c_char];
        let mut tform = [tform.as_ptr() as *mut c_char];
        let mut tunit = [tunit.as_ptr() as *mut c_char];
        let extname = cstr("BITS");

        cfitsio!(ffcrtb(
            fptr,
            BINARY_TBL,
            2,
            1,
            ttype.as_mut_ptr(),
            tform.as_mut_ptr(),
            tunit.as_mut_ptr(),
            extname.as_ptr()
        ));

        for (row, bits) in [[1 as c_char, 0, 1], [0, 0, 1]].iter_mut().enumerate() {
            cfitsio!(ffpclx(fptr, 1, row as i64 + 1, 1, 3, bits.as_mut_ptr()));
        }
    }

    let hdus = read_fits(&path).unwrap();
    let flags = hdus.get("BITS").unwrap().table().unwrap().column("FLAGS").unwrap();

    assert_eq!(flags.cell_shape(), &[3]);
    assert_eq!(
        flags.values::<bool>().unwrap(),
        vec![true, false, true, false, false, true]
    );
}
