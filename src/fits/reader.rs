use std::ffi::c_void;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

use anyhow::Context;
use fitsio::FitsFile;
use fitsio_sys::fitsfile;
use log::{debug, warn};
use ndarray::{ArrayD, IxDyn};

use super::cards::{self, Record};
use super::format::{self, IMAGE_HDU};
use crate::hdu::{Column, Complex, Data, Element, ElementType, HduList, HeaderValue, Table};

/// Maximum number of TDIM axes read for a column.
const MAX_TDIM: usize = 16;

/// Read a FITS file into an [`HduList`].
///
/// HDUs without data become primary units, images become image units and ASCII and binary
/// tables become tables. A random groups primary array is read as a table named `PRIMARY`.
/// Tile compressed images are decompressed by cfitsio and read as images.
pub fn read_fits<P: AsRef<Path>>(path: P) -> Result<HduList, anyhow::Error> {
    let path = path.as_ref();

    let mut f = FitsFile::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let fptr = unsafe { f.as_raw() };

    read_hdus(fptr).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_hdus(fptr: *mut fitsfile) -> Result<HduList, anyhow::Error> {
    let mut n: c_int = 0;
    fits_call!(ffthdu(fptr, &mut n))?;

    let mut hdus = HduList::new();
    let mut unnamed = 0;

    for i in 1..=n {
        let mut exttype: c_int = 0;
        fits_call!(ffmahd(fptr, i, &mut exttype))?;

        let mut hdutype: c_int = 0;
        fits_call!(ffghdt(fptr, &mut hdutype))?;

        let records = read_records(fptr)?;
        let name = unique_name(&hdus, hdu_name(i, &records, &mut unnamed));
        let header = cards::to_header(&records);

        let compressed = matches!(cards::find(&records, "ZIMAGE"), Some(HeaderValue::Bool(true)));

        if i == 1 && is_random_groups(&records) {
            warn!("{name}: random groups are deprecated, reading as a table");
            let table = read_groups(fptr, &records).with_context(|| format!("HDU {name}"))?;
            hdus.insert_table(&name, table, header)?;
        } else if hdutype == IMAGE_HDU || compressed {
            match read_image(fptr).with_context(|| format!("HDU {name}"))? {
                Some(data) => {
                    debug!("{name}: image {:?} ({})", data.shape(), data.element_type());
                    hdus.add_image(&name, data, header)?;
                }
                None => {
                    debug!("{name}: header only");
                    hdus.add_primary(&name, header)?;
                }
            }
        } else {
            let table = read_table(fptr, &records).with_context(|| format!("HDU {name}"))?;
            debug!(
                "{name}: table with {} rows, columns: {:?}",
                table.n_rows(),
                table.names().collect::<Vec<_>>()
            );
            hdus.insert_table(&name, table, header)?;
        }
    }

    Ok(hdus)
}

/// `PRIMARY` for the first HDU, then EXTNAME or `HDU<n>` counting unnamed extensions only.
fn hdu_name(i: c_int, records: &[Record], unnamed: &mut usize) -> String {
    match cards::find_str(records, "EXTNAME").map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ if i == 1 => "PRIMARY".to_string(),
        _ => {
            let name = format!("HDU{unnamed}");
            *unnamed += 1;
            name
        }
    }
}

fn unique_name(hdus: &HduList, name: String) -> String {
    if !hdus.names().any(|n| n == name) {
        return name;
    }

    let mut k = 2;
    loop {
        let candidate = format!("{name}_{k}");
        if !hdus.names().any(|n| n == candidate) {
            warn!("Duplicate HDU name {name}, renamed to {candidate}");
            return candidate;
        }
        k += 1;
    }
}

fn read_records(fptr: *mut fitsfile) -> Result<Vec<Record>, anyhow::Error> {
    let mut nexist: c_int = 0;
    let mut nmore: c_int = 0;
    fits_call!(ffghsp(fptr, &mut nexist, &mut nmore))?;

    let cards = (1..=nexist)
        .map(|k| {
            let mut buf = [0 as c_char; cards::CARD_LEN + 1];
            fits_call!(ffgrec(fptr, k, buf.as_mut_ptr()))?;

            let bytes: Vec<u8> = buf.iter().take_while(|c| **c != 0).map(|c| *c as u8).collect();
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        })
        .collect::<Result<Vec<_>, anyhow::Error>>()?;

    Ok(cards::parse_cards(cards))
}

fn is_random_groups(records: &[Record]) -> bool {
    matches!(cards::find(records, "GROUPS"), Some(HeaderValue::Bool(true)))
        && cards::find_int(records, "NAXIS1") == Some(0)
}

fn read_image(fptr: *mut fitsfile) -> Result<Option<Data>, anyhow::Error> {
    let mut naxis: c_int = 0;
    fits_call!(ffgidm(fptr, &mut naxis))?;

    if naxis == 0 {
        return Ok(None);
    }

    let mut naxes = vec![0i64; naxis as usize];
    fits_call!(ffgiszll(fptr, naxis, naxes.as_mut_ptr()))?;

    if naxes.iter().any(|n| *n == 0) {
        return Ok(None);
    }

    // Equivalent type: scaled integers come back as their physical type.
    let mut bitpix: c_int = 0;
    fits_call!(ffgiet(fptr, &mut bitpix))?;

    let ty = format::image_type(bitpix).ok_or_else(|| anyhow!("Unsupported BITPIX: {}", bitpix))?;
    let shape: Vec<usize> = naxes.iter().rev().map(|n| *n as usize).collect();

    use ElementType as T;

    let data = match ty {
        T::U8 => read_pixels::<u8>(fptr, &shape)?,
        T::I8 => read_pixels::<i8>(fptr, &shape)?,
        T::U16 => read_pixels::<u16>(fptr, &shape)?,
        T::I16 => read_pixels::<i16>(fptr, &shape)?,
        T::U32 => read_pixels::<u32>(fptr, &shape)?,
        T::I32 => read_pixels::<i32>(fptr, &shape)?,
        T::U64 => read_pixels::<u64>(fptr, &shape)?,
        T::I64 => read_pixels::<i64>(fptr, &shape)?,
        T::F32 => read_pixels::<f32>(fptr, &shape)?,
        T::F64 => read_pixels::<f64>(fptr, &shape)?,
        _ => bail!("Unsupported image type: {}", ty),
    };

    Ok(Some(data))
}

fn read_pixels<T: Element + Copy>(
    fptr: *mut fitsfile,
    shape: &[usize],
) -> Result<Data, anyhow::Error> {
    let n: usize = shape.iter().product();
    let mut v = vec![T::default(); n];
    let mut anynul: c_int = 0;

    fits_call!(ffgpv(
        fptr,
        format::datatype(T::TYPE),
        1,
        n as i64,
        ptr::null_mut(),
        v.as_mut_ptr() as *mut c_void,
        &mut anynul
    ))?;

    Ok(T::wrap(ArrayD::from_shape_vec(IxDyn(shape), v)?))
}

fn read_table(fptr: *mut fitsfile, records: &[Record]) -> Result<Table, anyhow::Error> {
    let mut nrows: i64 = 0;
    fits_call!(ffgnrwll(fptr, &mut nrows))?;

    let mut ncols: c_int = 0;
    fits_call!(ffgncl(fptr, &mut ncols))?;

    let nrows = nrows as usize;
    let mut table = Table::new();

    for colnum in 1..=ncols {
        let name = cards::find_str(records, &format!("TTYPE{colnum}"))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("COL{colnum}"), str::to_string);

        let mut typecode: c_int = 0;
        let mut repeat: i64 = 0;
        let mut width: i64 = 0;
        fits_call!(ffeqtyll(fptr, colnum, &mut typecode, &mut repeat, &mut width))?;

        let Some(ty) = format::column_type(typecode) else {
            warn!("Skipping column {name}: variable length or unsupported type code {typecode}");
            continue;
        };

        let dims = read_tdim(fptr, colnum)?;
        let data = read_column(fptr, colnum, ty, typecode, nrows, repeat as usize, width as usize, &dims)
            .with_context(|| format!("column {name}"))?;

        let mut column = Column::new(&name, data);
        if let Some(unit) = cards::find_str(records, &format!("TUNIT{colnum}")) {
            column = column.with_unit(unit);
        }

        table.add_column(column)?;
    }

    Ok(table)
}

/// Cell axes from TDIM in row-major order. Columns without TDIM give a single axis.
fn read_tdim(fptr: *mut fitsfile, colnum: c_int) -> Result<Vec<usize>, anyhow::Error> {
    let mut naxis: c_int = 0;
    let mut naxes = [0i64; MAX_TDIM];
    fits_call!(ffgtdmll(fptr, colnum, MAX_TDIM as c_int, &mut naxis, naxes.as_mut_ptr()))?;

    Ok(naxes[..(naxis.max(0) as usize).min(MAX_TDIM)]
        .iter()
        .rev()
        .map(|n| *n as usize)
        .collect())
}

/// Shape of a cell holding `count` elements: TDIM axes when they agree with the count, else a
/// flat vector, or a scalar for a single element.
fn cell_shape(dims: &[usize], count: usize) -> Vec<usize> {
    if dims.len() > 1 && dims.iter().product::<usize>() == count {
        dims.to_vec()
    } else if count == 1 {
        Vec::new()
    } else {
        vec![count]
    }
}

#[allow(clippy::too_many_arguments)]
fn read_column(
    fptr: *mut fitsfile,
    colnum: c_int,
    ty: ElementType,
    typecode: c_int,
    nrows: usize,
    repeat: usize,
    width: usize,
    dims: &[usize],
) -> Result<Data, anyhow::Error> {
    use ElementType as T;

    let cell = cell_shape(dims, repeat);
    let mut shape = vec![nrows];
    shape.extend_from_slice(&cell);

    Ok(match ty {
        T::Str => {
            // String width: cfitsio reports it, TDIM's first (fastest) axis may refine it.
            let width = match dims.last() {
                Some(w) if dims.len() > 1 => *w,
                _ if width > 0 => width,
                _ => repeat.max(1),
            };
            let count = (repeat / width.max(1)).max(1);
            let cell = cell_shape(&dims[..dims.len().saturating_sub(1)], count);
            read_strings(fptr, colnum, nrows, width, &cell)?
        }
        T::Bool if typecode == format::TBIT => read_bits(fptr, colnum, nrows, repeat, &shape)?,
        T::Bool => {
            let v = read_cells::<u8>(fptr, colnum, format::TLOGICAL, &shape)?;
            Data::Bool(ArrayD::from_shape_vec(
                IxDyn(&shape),
                v.into_iter().map(|b| b != 0).collect(),
            )?)
        }
        T::U8 => wrap::<u8>(fptr, colnum, &shape)?,
        T::I8 => wrap::<i8>(fptr, colnum, &shape)?,
        T::U16 => wrap::<u16>(fptr, colnum, &shape)?,
        T::I16 => wrap::<i16>(fptr, colnum, &shape)?,
        T::U32 => wrap::<u32>(fptr, colnum, &shape)?,
        T::I32 => wrap::<i32>(fptr, colnum, &shape)?,
        T::U64 => wrap::<u64>(fptr, colnum, &shape)?,
        T::I64 => wrap::<i64>(fptr, colnum, &shape)?,
        T::F32 => wrap::<f32>(fptr, colnum, &shape)?,
        T::F64 => wrap::<f64>(fptr, colnum, &shape)?,
        T::C64 => wrap::<Complex<f32>>(fptr, colnum, &shape)?,
        T::C128 => wrap::<Complex<f64>>(fptr, colnum, &shape)?,
    })
}

fn wrap<T: Element + Copy>(
    fptr: *mut fitsfile,
    colnum: c_int,
    shape: &[usize],
) -> Result<Data, anyhow::Error> {
    let v = read_cells::<T>(fptr, colnum, format::datatype(T::TYPE), shape)?;
    Ok(T::wrap(ArrayD::from_shape_vec(IxDyn(shape), v)?))
}

fn read_cells<T: Clone + Default>(
    fptr: *mut fitsfile,
    colnum: c_int,
    datatype: c_int,
    shape: &[usize],
) -> Result<Vec<T>, anyhow::Error> {
    let n: usize = shape.iter().product();
    let mut v = vec![T::default(); n];

    if n > 0 {
        let mut anynul: c_int = 0;
        fits_call!(ffgcv(
            fptr,
            datatype,
            colnum,
            1,
            1,
            n as i64,
            ptr::null_mut(),
            v.as_mut_ptr() as *mut c_void,
            &mut anynul
        ))?;
    }

    Ok(v)
}

fn read_bits(
    fptr: *mut fitsfile,
    colnum: c_int,
    nrows: usize,
    repeat: usize,
    shape: &[usize],
) -> Result<Data, anyhow::Error> {
    let mut v = Vec::with_capacity(nrows * repeat);
    let mut row = vec![0 as c_char; repeat];

    for r in 1..=nrows {
        fits_call!(ffgcx(fptr, colnum, r as i64, 1, repeat as i64, row.as_mut_ptr()))?;
        v.extend(row.iter().map(|b| *b != 0));
    }

    Ok(Data::Bool(ArrayD::from_shape_vec(IxDyn(shape), v)?))
}

fn read_strings(
    fptr: *mut fitsfile,
    colnum: c_int,
    nrows: usize,
    width: usize,
    cell: &[usize],
) -> Result<Data, anyhow::Error> {
    let mut shape = vec![nrows];
    shape.extend_from_slice(cell);
    let n: usize = shape.iter().product();

    let mut bufs: Vec<Vec<c_char>> = vec![vec![0; width + 1]; n];
    let mut ptrs: Vec<*mut c_char> = bufs.iter_mut().map(|b| b.as_mut_ptr()).collect();
    let mut nulstr = [0 as c_char; 1];

    if n > 0 {
        let mut anynul: c_int = 0;
        fits_call!(ffgcv(
            fptr,
            format::TSTRING,
            colnum,
            1,
            1,
            n as i64,
            nulstr.as_mut_ptr() as *mut c_void,
            ptrs.as_mut_ptr() as *mut c_void,
            &mut anynul
        ))?;
    }

    let strings = bufs
        .iter()
        .map(|b| {
            let bytes: Vec<u8> = b.iter().map(|c| *c as u8).collect();
            crate::hdu::trim_fixed_str(&bytes)
        })
        .collect();

    Ok(Data::Str(ArrayD::from_shape_vec(IxDyn(&shape), strings)?))
}

/// Random groups: one column per group parameter (named by PTYPEn) plus a `DATA` column with the
/// group array.
fn read_groups(fptr: *mut fitsfile, records: &[Record]) -> Result<Table, anyhow::Error> {
    let gcount = cards::find_int(records, "GCOUNT").unwrap_or(0).max(0) as usize;
    let pcount = cards::find_int(records, "PCOUNT").unwrap_or(0).max(0) as usize;
    let naxis = cards::find_int(records, "NAXIS").unwrap_or(0).max(0) as usize;
    let bitpix = cards::find_int(records, "BITPIX").unwrap_or(-32);

    // NAXIS1 is zero for random groups, the group array is NAXIS2..NAXISn.
    let cell: Vec<usize> = (2..=naxis)
        .rev()
        .map(|k| cards::find_int(records, &format!("NAXIS{k}")).unwrap_or(1).max(0) as usize)
        .collect();
    let cell_len: usize = cell.iter().product();

    let mut params = vec![0f64; gcount * pcount];
    let mut data64 = vec![0f64; gcount * cell_len];

    for g in 0..gcount {
        if pcount > 0 {
            fits_call!(ffggpd(
                fptr,
                (g + 1) as _,
                1,
                pcount as _,
                params[g * pcount..].as_mut_ptr()
            ))?;
        }
        if cell_len > 0 {
            let mut anynul: c_int = 0;
            fits_call!(ffgpvd(
                fptr,
                (g + 1) as _,
                1,
                cell_len as _,
                0.0,
                data64[g * cell_len..].as_mut_ptr(),
                &mut anynul
            ))?;
        }
    }

    let mut table = Table::new();

    for p in 0..pcount {
        let base = cards::find_str(records, &format!("PTYPE{}", p + 1))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("PARAM{}", p + 1), str::to_string);

        // Parameters may repeat (e.g. two DATE parameters), keep them all.
        let mut name = base.clone();
        let mut k = 2;
        while table.column(&name).is_some() {
            name = format!("{base}_{k}");
            k += 1;
        }

        let v: Vec<f64> = (0..gcount).map(|g| params[g * pcount + p]).collect();
        table.add_column(Column::new(&name, v))?;
    }

    let mut shape = vec![gcount];
    shape.extend_from_slice(&cell);

    let data = if bitpix == -64 {
        Data::F64(ArrayD::from_shape_vec(IxDyn(&shape), data64)?)
    } else {
        Data::F32(ArrayD::from_shape_vec(
            IxDyn(&shape),
            data64.into_iter().map(|v| v as f32).collect(),
        )?)
    };
    table.add_column(Column::new("DATA", data))?;

    Ok(table)
}
