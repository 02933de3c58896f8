use std::path::Path;

use anyhow::Context;
use hdf5::types::{CompoundField, CompoundType, TypeDescriptor, VarLenUnicode};
use hdf5::{Dataset, Group};
use itertools::izip;
use log::{debug, info, warn};

use super::compress::{HdfOptions, TableLayout};
use super::types::{cell_descriptor, element_descriptor, write_bytes};
use super::{attrs, order};
use super::{
    CLASS, CLASS_COLUMN, CLASS_DATA_GROUP, CLASS_HDU, CLASS_IMAGE, CLASS_ROOT, CLASS_TABLE,
    COMMENT, DATA, HISTORY, IMAGE_VERSION, TABLE_VERSION,
};
use crate::hdu::{Column, Data, ElementType, Hdu, HduData, HduList, HeaderValue, Table};

/// Write `hdus` to a new HDFITS file at `path`, replacing any existing file.
///
/// Every HDU becomes a group in list order. Groups and attributes are created with creation order
/// tracking, so [`read_hdf`](super::read_hdf) returns the HDUs and header keywords in the order
/// they were written.
pub fn write_hdf<P: AsRef<Path>>(
    hdus: &HduList,
    path: P,
    opts: &HdfOptions,
) -> Result<(), anyhow::Error> {
    let path = path.as_ref();

    let file =
        order::create_file(path).with_context(|| format!("Cannot create {}", path.display()))?;
    attrs::write_str(&file, CLASS, CLASS_ROOT)?;

    for hdu in hdus {
        write_hdu(&file, hdu, opts)
            .with_context(|| format!("Failed to write HDU {} to {}", hdu.name(), path.display()))?;
    }

    file.flush()?;
    info!(
        "Wrote {} HDUs to {} ({})",
        hdus.len(),
        path.display(),
        opts.compression
    );

    Ok(())
}

/// HDF5 link names cannot contain a slash.
fn link_name(name: &str) -> String {
    if name.contains('/') {
        let fixed = name.replace('/', "_");
        warn!("{name:?} is not a valid HDF5 name, writing as {fixed:?}");
        fixed
    } else {
        name.to_string()
    }
}

fn write_hdu(root: &Group, hdu: &Hdu, opts: &HdfOptions) -> Result<(), anyhow::Error> {
    debug!("{}: writing {}", hdu.name(), hdu.kind());

    let group = order::create_group(root, &link_name(hdu.name()))?;
    attrs::write_str(&group, CLASS, CLASS_HDU)?;

    match hdu.data() {
        HduData::Primary => (),
        HduData::Image(data) => write_image(&group, data, opts)?,
        HduData::Table(table)
            if table.n_columns() == 0 || opts.table_layout == TableLayout::DataGroup =>
        {
            write_data_group(&group, table, opts)?
        }
        HduData::Table(table) => write_table(&group, hdu.name(), table, opts)?,
    }

    let header = hdu.header();
    attrs::write_header(&group, header)?;
    write_lines(&group, COMMENT, header.comment())?;
    write_lines(&group, HISTORY, header.history())?;

    Ok(())
}

/// Create an empty dataset with the filter pipeline selected for its shape and type.
fn create_dataset(
    group: &Group,
    name: &str,
    td: &TypeDescriptor,
    shape: &[usize],
    ty: Option<ElementType>,
    opts: &HdfOptions,
) -> Result<Dataset, anyhow::Error> {
    let builder = group
        .new_dataset_builder()
        .empty_as(td)
        .shape(shape.to_vec());

    let ds = match opts.pipeline(shape, ty) {
        Some(p) => {
            debug!("{name}: chunks {:?}, filters {:?}", p.chunk, p.filters);
            builder.chunk(p.chunk).set_filters(&p.filters).create(name)?
        }
        None => builder.create(name)?,
    };

    Ok(ds)
}

fn write_array(
    group: &Group,
    name: &str,
    data: &Data,
    opts: &HdfOptions,
) -> Result<Dataset, anyhow::Error> {
    let td = element_descriptor(data);
    let ds = create_dataset(
        group,
        name,
        &td,
        data.shape(),
        Some(data.element_type()),
        opts,
    )?;
    write_bytes(&ds, &td, &data.to_ne_bytes())?;

    Ok(ds)
}

fn write_image(group: &Group, data: &Data, opts: &HdfOptions) -> Result<(), anyhow::Error> {
    let ds = write_array(group, DATA, data, opts)?;

    attrs::write_str(&ds, CLASS, CLASS_IMAGE)?;
    attrs::write_str(&ds, "IMAGE_VERSION", IMAGE_VERSION)?;

    if data.ndim() == 2 {
        if let Some((lo, hi)) = data.min_max() {
            attrs::write_str(&ds, "IMAGE_SUBCLASS", "IMAGE_GRAYSCALE")?;
            let range = [lo, hi];
            ds.new_attr::<f64>()
                .shape(2)
                .create("IMAGE_MINMAXRANGE")?
                .write_raw(range.as_slice())?;
        }
    }

    Ok(())
}

/// Fill value of a column: empty for strings, zero otherwise.
fn fill_value(ty: ElementType) -> HeaderValue {
    match ty {
        ElementType::Str => HeaderValue::from(""),
        ElementType::Bool => HeaderValue::Bool(false),
        t if t.is_float() || t.is_complex() => HeaderValue::Float(0.0),
        _ => HeaderValue::Int(0),
    }
}

/// Interleave the columns into packed rows.
fn pack_rows(table: &Table) -> (Vec<usize>, Vec<u8>) {
    let sizes: Vec<usize> = table
        .columns()
        .iter()
        .map(|c| c.repeat() * c.data().element_width())
        .collect();
    let columns: Vec<Vec<u8>> = table
        .columns()
        .iter()
        .map(|c| c.data().to_ne_bytes())
        .collect();

    let row_size: usize = sizes.iter().sum();
    let mut rows = Vec::with_capacity(row_size * table.n_rows());

    for r in 0..table.n_rows() {
        for (bytes, size) in columns.iter().zip(&sizes) {
            rows.extend_from_slice(&bytes[r * size..(r + 1) * size]);
        }
    }

    (sizes, rows)
}

fn write_table(
    group: &Group,
    title: &str,
    table: &Table,
    opts: &HdfOptions,
) -> Result<(), anyhow::Error> {
    let (sizes, rows) = pack_rows(table);

    let mut offset = 0;
    let fields = izip!(0.., table.columns(), &sizes)
        .map(|(index, c, size)| {
            let field = CompoundField {
                name: c.name().to_string(),
                ty: cell_descriptor(c.data(), c.cell_shape()),
                offset,
                index,
            };
            offset += size;
            field
        })
        .collect();

    let td = TypeDescriptor::Compound(CompoundType {
        fields,
        size: offset,
    });

    let ds = create_dataset(group, DATA, &td, &[table.n_rows()], None, opts)?;
    write_bytes(&ds, &td, &rows)?;

    attrs::write_str(&ds, CLASS, CLASS_TABLE)?;
    for (i, c) in table.columns().iter().enumerate() {
        attrs::write_str(&ds, &format!("FIELD_{i}_NAME"), c.name())?;
        attrs::write_value(&ds, &format!("FIELD_{i}_FILL"), &fill_value(c.data().element_type()))?;
        attrs::write_str(&ds, &format!("FIELD_{i}_UNITS"), c.unit().unwrap_or(""))?;
    }
    ds.new_attr::<u64>()
        .create("NROWS")?
        .write_scalar(&(table.n_rows() as u64))?;
    ds.new_attr::<f64>()
        .create("VERSION")?
        .write_scalar(&TABLE_VERSION)?;
    attrs::write_str(&ds, "TITLE", title)?;

    debug!("{title}: {} columns, {} rows", table.n_columns(), table.n_rows());

    Ok(())
}

fn write_column(group: &Group, column: &Column, opts: &HdfOptions) -> Result<(), anyhow::Error> {
    let ds = write_array(group, &link_name(column.name()), column.data(), opts)
        .with_context(|| format!("Column {}", column.name()))?;

    attrs::write_str(&ds, CLASS, CLASS_COLUMN)?;
    ds.new_attr::<i64>()
        .create("COLUMN_ID")?
        .write_scalar(&(column.index() as i64))?;
    if let Some(unit) = column.unit() {
        attrs::write_str(&ds, "UNITS", unit)?;
    }

    Ok(())
}

fn write_data_group(group: &Group, table: &Table, opts: &HdfOptions) -> Result<(), anyhow::Error> {
    let data = order::create_group(group, DATA)?;
    attrs::write_str(&data, CLASS, CLASS_DATA_GROUP)?;

    for c in table.columns() {
        write_column(&data, c, opts)?;
    }

    Ok(())
}

/// Write COMMENT or HISTORY lines as a dataset of strings, nothing if there are none.
fn write_lines(loc: &Group, name: &str, lines: &[String]) -> Result<(), anyhow::Error> {
    if lines.is_empty() {
        return Ok(());
    }

    let lines = lines
        .iter()
        .map(|l| l.parse::<VarLenUnicode>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("Invalid {} line: {}", name, e))?;

    loc.new_dataset_builder()
        .with_data(lines.as_slice())
        .create(name)?;

    Ok(())
}
