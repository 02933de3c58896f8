use std::ffi::{c_void, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

use anyhow::Context;
use fitsio::FitsFile;
use fitsio_sys::fitsfile;
use hifitime::Epoch;
use log::{debug, info, warn};

use super::format::{self, BINARY_TBL};
use super::verify::{self, Verified};
use crate::hdu::{Column, Complex, Data, Element, ElementType, Hdu, HduData, HduList, HeaderValue, Table};
use crate::units;

/// Name given to a table called `PRIMARY`, which cannot be the primary HDU of a FITS file.
pub const PRIMARY_TABLE_NAME: &str = "PRIDATA";

/// Significant digits of floating point keyword values.
const FLOAT_DIGITS: c_int = 15;

#[derive(Debug, Clone)]
pub struct FitsOptions {
    /// Write CHECKSUM and DATASUM to every HDU and verify them after writing.
    pub checksum: bool,

    /// Record the writing tool and time as HISTORY in the primary header.
    pub history: bool,
}

impl Default for FitsOptions {
    fn default() -> Self {
        FitsOptions {
            checksum: true,
            history: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Payload<'a> {
    Empty,
    Image(&'a Data),
    Table(&'a Table),
}

/// One HDU of the output file, in file order.
#[derive(Debug)]
struct Unit<'a> {
    name: String,
    hdu: Option<&'a Hdu>,
    payload: Payload<'a>,
}

impl<'a> Unit<'a> {
    fn from_hdu(name: String, hdu: &'a Hdu) -> Unit<'a> {
        let payload = match hdu.data() {
            HduData::Primary => Payload::Empty,
            HduData::Image(data) => Payload::Image(data),
            HduData::Table(table) => Payload::Table(table),
        };

        Unit {
            name,
            hdu: Some(hdu),
            payload,
        }
    }
}

/// Arrange the HDUs in FITS order: the first primary unit goes first. Without one, an image named
/// `PRIMARY` becomes the primary array, otherwise an empty primary HDU is added. Tables can only
/// be extensions.
fn plan(hdus: &HduList) -> Vec<Unit<'_>> {
    let first = hdus.iter().position(Hdu::is_primary).or_else(|| {
        hdus.iter()
            .position(|h| h.image().is_some() && h.name().eq_ignore_ascii_case("PRIMARY"))
    });

    let mut units = Vec::with_capacity(hdus.len() + 1);

    match first {
        Some(i) => {
            let hdu = &hdus.iter().as_slice()[i];
            units.push(Unit::from_hdu(hdu.name().to_string(), hdu));
        }
        None => units.push(Unit {
            name: "PRIMARY".to_string(),
            hdu: None,
            payload: Payload::Empty,
        }),
    }

    for (i, hdu) in hdus.iter().enumerate() {
        if Some(i) == first {
            continue;
        }

        let name = if hdu.table().is_some() && hdu.name().eq_ignore_ascii_case("PRIMARY") {
            warn!("A table cannot be the primary HDU, writing {} as {PRIMARY_TABLE_NAME}", hdu.name());
            PRIMARY_TABLE_NAME.to_string()
        } else {
            hdu.name().to_string()
        };

        units.push(Unit::from_hdu(name, hdu));
    }

    units
}

/// Write an [`HduList`] to a FITS file, replacing any existing file.
///
/// All headers are verified before anything is written. Tables are written as binary tables,
/// column units are normalized on the way.
pub fn write_fits<P: AsRef<Path>>(
    hdus: &HduList,
    path: P,
    opts: &FitsOptions,
) -> Result<(), anyhow::Error> {
    let path = path.as_ref();
    let units = plan(hdus);

    let headers = units
        .iter()
        .map(|u| match u.hdu {
            Some(hdu) => verify::verify(&u.name, hdu.header()),
            None => Ok(Verified::default()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Cannot replace {}", path.display()))?;
    }

    {
        let mut f = FitsFile::create(path)
            .open()
            .with_context(|| format!("Cannot create {}", path.display()))?;
        let fptr = unsafe { f.as_raw() };

        for (i, (unit, header)) in units.iter().zip(&headers).enumerate() {
            debug!("Writing HDU {} ({})", unit.name, i);

            write_unit(fptr, i == 0, unit, header).with_context(|| format!("HDU {}", unit.name))?;

            if i == 0 && opts.history {
                write_text(fptr, "HISTORY", &creation_history()?)?;
            }

            if opts.checksum {
                fits_call!(ffpcks(fptr)).with_context(|| format!("HDU {}: checksum", unit.name))?;
            }
        }

        fits_call!(ffflus(fptr, 1)).with_context(|| format!("Cannot flush {}", path.display()))?;
    }

    if opts.checksum {
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        verify_checksums(path, &names)?;
    }

    info!("Wrote {} HDUs to {}", units.len(), path.display());

    Ok(())
}

fn creation_history() -> Result<String, anyhow::Error> {
    Ok(format!(
        "File created by {} v{} at {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        Epoch::now()?
    ))
}

fn write_unit(
    fptr: *mut fitsfile,
    primary: bool,
    unit: &Unit,
    header: &Verified,
) -> Result<(), anyhow::Error> {
    match unit.payload {
        // The primary HDU of a new file is already an empty image.
        Payload::Empty if primary => (),
        Payload::Empty => {
            fits_call!(ffcrimll(fptr, format::BYTE_IMG, 0, ptr::null_mut()))?;
        }
        Payload::Image(data) => write_image(fptr, primary, data)?,
        Payload::Table(table) => write_table(fptr, &unit.name, table)?,
    }

    // Binary tables carry their EXTNAME from creation.
    if !matches!(unit.payload, Payload::Table(_)) && !(primary && unit.name == "PRIMARY") {
        let key = cstring("EXTNAME")?;
        let name = cstring(&unit.name)?;
        fits_call!(ffpkys(fptr, key.as_ptr(), name.as_ptr(), ptr::null()))?;
    }

    write_keywords(fptr, header)
}

fn write_keywords(fptr: *mut fitsfile, header: &Verified) -> Result<(), anyhow::Error> {
    for kw in &header.keywords {
        // cfitsio writes HIERARCH cards when the name starts with it.
        let key = if kw.is_hierarch() {
            cstring(&format!("HIERARCH {}", kw.key))?
        } else {
            cstring(&kw.key)?
        };
        let comment = kw.comment.as_deref().map(cstring).transpose()?;
        let comment = comment.as_ref().map_or(ptr::null(), |c| c.as_ptr());

        let written = match kw.value {
            HeaderValue::Bool(b) => fits_call!(ffpkyl(fptr, key.as_ptr(), c_int::from(*b), comment)),
            HeaderValue::Int(v) => fits_call!(ffpkyj(fptr, key.as_ptr(), *v, comment)),
            HeaderValue::Float(v) => {
                fits_call!(ffpkyd(fptr, key.as_ptr(), *v, -FLOAT_DIGITS, comment))
            }
            HeaderValue::Str(s) => {
                let value = cstring(s)?;
                fits_call!(ffpkls(fptr, key.as_ptr(), value.as_ptr(), comment))
            }
        };
        written.with_context(|| format!("keyword {}", kw.key))?;
    }

    for line in &header.comment {
        write_text(fptr, "COMMENT", line)?;
    }
    for line in &header.history {
        write_text(fptr, "HISTORY", line)?;
    }

    Ok(())
}

fn write_text(fptr: *mut fitsfile, kind: &str, line: &str) -> Result<(), anyhow::Error> {
    let text = cstring(line)?;

    match kind {
        "HISTORY" => fits_call!(ffphis(fptr, text.as_ptr()))?,
        _ => fits_call!(ffpcom(fptr, text.as_ptr()))?,
    }

    Ok(())
}

fn cstring(s: &str) -> Result<CString, anyhow::Error> {
    CString::new(s).map_err(|_| anyhow!("String contains a NUL character: {:?}", s))
}

fn write_image(fptr: *mut fitsfile, primary: bool, data: &Data) -> Result<(), anyhow::Error> {
    let ty = data.element_type();
    let bitpix =
        format::bitpix(ty).ok_or_else(|| anyhow!("FITS images cannot hold {} values", ty))?;

    let mut naxes: Vec<i64> = data.shape().iter().rev().map(|n| *n as i64).collect();
    let naxis = naxes.len() as c_int;

    if primary {
        fits_call!(ffrsimll(fptr, bitpix, naxis, naxes.as_mut_ptr()))?;
    } else {
        fits_call!(ffcrimll(fptr, bitpix, naxis, naxes.as_mut_ptr()))?;
    }

    if data.is_empty() {
        return Ok(());
    }

    use ElementType as T;

    match ty {
        T::Bool => {
            let v: Vec<u8> = data.to_vec::<bool>()?.into_iter().map(u8::from).collect();
            write_pixels(fptr, format::TBYTE, &v)
        }
        T::U8 => write_pixels(fptr, format::TBYTE, &data.to_vec::<u8>()?),
        T::I8 => write_pixels(fptr, format::TSBYTE, &data.to_vec::<i8>()?),
        T::U16 => write_pixels(fptr, format::TUSHORT, &data.to_vec::<u16>()?),
        T::I16 => write_pixels(fptr, format::TSHORT, &data.to_vec::<i16>()?),
        T::U32 => write_pixels(fptr, format::TUINT, &data.to_vec::<u32>()?),
        T::I32 => write_pixels(fptr, format::TINT, &data.to_vec::<i32>()?),
        T::U64 => write_pixels(fptr, format::TULONGLONG, &data.to_vec::<u64>()?),
        T::I64 => write_pixels(fptr, format::TLONGLONG, &data.to_vec::<i64>()?),
        T::F32 => write_pixels(fptr, format::TFLOAT, &data.to_vec::<f32>()?),
        T::F64 => write_pixels(fptr, format::TDOUBLE, &data.to_vec::<f64>()?),
        T::C64 | T::C128 | T::Str => bail!("FITS images cannot hold {} values", ty),
    }
}

fn write_pixels<T>(fptr: *mut fitsfile, datatype: c_int, v: &[T]) -> Result<(), anyhow::Error> {
    fits_call!(ffppr(fptr, datatype, 1, v.len() as i64, v.as_ptr() as *mut c_void))?;
    Ok(())
}

fn write_table(fptr: *mut fitsfile, name: &str, table: &Table) -> Result<(), anyhow::Error> {
    let columns = table.columns();

    let ttype = columns
        .iter()
        .map(|c| cstring(c.name()))
        .collect::<Result<Vec<_>, _>>()?;
    let tform = columns
        .iter()
        .map(|c| {
            let d = c.data();
            cstring(&format::tform(d.element_type(), c.cell_shape(), d.str_width()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let tunit = columns
        .iter()
        .map(|c| cstring(&c.unit().and_then(units::normalize).unwrap_or_default()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut ttype_ptrs = as_ptrs(&ttype);
    let mut tform_ptrs = as_ptrs(&tform);
    let mut tunit_ptrs = as_ptrs(&tunit);
    let extname = cstring(name)?;

    fits_call!(ffcrtb(
        fptr,
        BINARY_TBL,
        table.n_rows() as i64,
        columns.len() as c_int,
        ttype_ptrs.as_mut_ptr(),
        tform_ptrs.as_mut_ptr(),
        tunit_ptrs.as_mut_ptr(),
        extname.as_ptr()
    ))?;

    for (colnum, column) in (1..).zip(columns) {
        let d = column.data();
        if let Some(tdim) = format::tdim(d.element_type(), column.cell_shape(), d.str_width()) {
            debug!("{name}: column {} has TDIM {tdim}", column.name());

            let mut naxes: Vec<i64> = column.cell_shape().iter().rev().map(|n| *n as i64).collect();
            if d.element_type() == ElementType::Str {
                naxes.insert(0, d.str_width().max(1) as i64);
            }
            fits_call!(ffptdmll(fptr, colnum, naxes.len() as c_int, naxes.as_mut_ptr()))?;
        }

        write_column(fptr, colnum, column).with_context(|| format!("column {}", column.name()))?;
    }

    Ok(())
}

fn as_ptrs(strings: &[CString]) -> Vec<*mut c_char> {
    strings.iter().map(|s| s.as_ptr() as *mut c_char).collect()
}

fn write_column(fptr: *mut fitsfile, colnum: c_int, column: &Column) -> Result<(), anyhow::Error> {
    let data = column.data();
    if data.is_empty() {
        return Ok(());
    }

    use ElementType as T;

    match data.element_type() {
        T::Str => {
            let strings = data
                .to_vec::<String>()?
                .iter()
                .map(|s| cstring(s))
                .collect::<Result<Vec<_>, _>>()?;
            let mut ptrs = as_ptrs(&strings);
            write_cells(fptr, colnum, format::TSTRING, ptrs.len(), ptrs.as_mut_ptr() as *mut c_void)
        }
        T::Bool => {
            let mut v: Vec<c_char> = data.to_vec::<bool>()?.into_iter().map(|b| b as c_char).collect();
            write_cells(fptr, colnum, format::TLOGICAL, v.len(), v.as_mut_ptr() as *mut c_void)
        }
        T::U8 => write_typed::<u8>(fptr, colnum, data),
        T::I8 => write_typed::<i8>(fptr, colnum, data),
        T::U16 => write_typed::<u16>(fptr, colnum, data),
        T::I16 => write_typed::<i16>(fptr, colnum, data),
        T::U32 => write_typed::<u32>(fptr, colnum, data),
        T::I32 => write_typed::<i32>(fptr, colnum, data),
        T::U64 => write_typed::<u64>(fptr, colnum, data),
        T::I64 => write_typed::<i64>(fptr, colnum, data),
        T::F32 => write_typed::<f32>(fptr, colnum, data),
        T::F64 => write_typed::<f64>(fptr, colnum, data),
        T::C64 => write_typed::<Complex<f32>>(fptr, colnum, data),
        T::C128 => write_typed::<Complex<f64>>(fptr, colnum, data),
    }
}

/// Values are converted by cfitsio to the column type, e.g. `u16` into a `J` column.
fn write_typed<T: Element>(fptr: *mut fitsfile, colnum: c_int, data: &Data) -> Result<(), anyhow::Error> {
    let mut v = data.to_vec::<T>()?;
    write_cells(fptr, colnum, format::datatype(T::TYPE), v.len(), v.as_mut_ptr() as *mut c_void)
}

fn write_cells(
    fptr: *mut fitsfile,
    colnum: c_int,
    datatype: c_int,
    n: usize,
    values: *mut c_void,
) -> Result<(), anyhow::Error> {
    fits_call!(ffpcl(fptr, datatype, colnum, 1, 1, n as i64, values))?;
    Ok(())
}

/// Re-open a written file and check the CHECKSUM and DATASUM of every HDU.
fn verify_checksums(path: &Path, names: &[&str]) -> Result<(), anyhow::Error> {
    let mut f = FitsFile::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let fptr = unsafe { f.as_raw() };

    for (i, name) in (1..).zip(names) {
        let mut exttype: c_int = 0;
        fits_call!(ffmahd(fptr, i, &mut exttype))?;

        let mut datastatus: c_int = 0;
        let mut hdustatus: c_int = 0;
        fits_call!(ffvcks(fptr, &mut datastatus, &mut hdustatus))?;

        ensure!(
            datastatus != -1 && hdustatus != -1,
            "Checksum verification failed for HDU {} of {}",
            name,
            path.display()
        );
    }

    debug!("Checksums of {} verified", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdu::Header;

    fn names(hdus: &HduList) -> Vec<String> {
        plan(hdus).into_iter().map(|u| u.name).collect()
    }

    #[test]
    fn primary_goes_first() {
        let mut l = HduList::new();
        l.add_image("SCI", vec![1.0f32, 2.0], Header::new()).unwrap();
        l.add_primary("MAIN", Header::new()).unwrap();

        assert_eq!(names(&l), vec!["MAIN", "SCI"]);
    }

    #[test]
    fn synthesized_primary() {
        let mut l = HduList::new();
        l.add_table("EVENTS", [Column::new("X", vec![1i32])], Header::new())
            .unwrap();

        let units = plan(&l);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, "PRIMARY");
        assert_eq!(units[0].payload, Payload::Empty);
        assert!(units[0].hdu.is_none());
    }

    #[test]
    fn primary_image() {
        let mut l = HduList::new();
        l.add_table("EVENTS", [Column::new("X", vec![1i32])], Header::new())
            .unwrap();
        l.add_image("PRIMARY", vec![1u8, 2, 3], Header::new()).unwrap();

        assert_eq!(names(&l), vec!["PRIMARY", "EVENTS"]);
    }

    #[test]
    fn primary_table_is_renamed() {
        let mut l = HduList::new();
        l.add_table("PRIMARY", [Column::new("X", vec![1i32])], Header::new())
            .unwrap();

        assert_eq!(names(&l), vec!["PRIMARY", PRIMARY_TABLE_NAME]);
    }

    #[test]
    fn history_names_tool() {
        let h = creation_history().unwrap();
        assert!(h.starts_with(&format!("File created by {}", env!("CARGO_PKG_NAME"))));
    }
}
