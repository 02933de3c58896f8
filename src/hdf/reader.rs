use std::path::Path;

use anyhow::Context;
use hdf5::types::{CompoundField, CompoundType, TypeDescriptor};
use hdf5::{Dataset, Group};
use log::{debug, warn};

use super::types::{layout, read_bytes, read_data, read_strings, stored_layout};
use super::{attrs, order};
use super::{
    CLASS, CLASS_DATA_GROUP, CLASS_HDU, CLASS_IMAGE, CLASS_ROOT, CLASS_TABLE, COMMENT, DATA,
    HISTORY,
};
use crate::hdu::{Column, Data, HduList, Table};

/// Read an HDFITS file into an [`HduList`].
///
/// Every top level group is one HDU: without a `DATA` member it is a primary unit, otherwise
/// the `CLASS` of `DATA` decides between image and table. Groups with an unknown `DATA` class are
/// skipped with a warning. A missing or unexpected root `CLASS` is only a warning.
pub fn read_hdf<P: AsRef<Path>>(path: P) -> Result<HduList, anyhow::Error> {
    let path = path.as_ref();

    let file = hdf5::File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;

    match attrs::read_str(&file, CLASS) {
        Some(c) if c == CLASS_ROOT => (),
        Some(c) => warn!("{}: root CLASS is {:?}, not {}", path.display(), c, CLASS_ROOT),
        None => warn!("{}: no root CLASS, not an HDFITS file?", path.display()),
    }

    let mut hdus = HduList::new();

    for name in order::member_names(&file)? {
        let Ok(group) = file.group(&name) else {
            warn!("{}: {} is not a group, skipping", path.display(), name);
            continue;
        };

        read_hdu(&mut hdus, &name, &group)
            .with_context(|| format!("Failed to read HDU {} from {}", name, path.display()))?;
    }

    Ok(hdus)
}

fn read_hdu(hdus: &mut HduList, name: &str, group: &Group) -> Result<(), anyhow::Error> {
    match attrs::read_str(group, CLASS) {
        Some(c) if c == CLASS_HDU => (),
        c => warn!("{name}: group CLASS is {c:?}, expected {CLASS_HDU}"),
    }

    let members = order::member_names(group)?;

    let mut header = attrs::read_header(group)?;
    for line in read_lines(group, &members, COMMENT)? {
        header.add_comment(&line);
    }
    for line in read_lines(group, &members, HISTORY)? {
        header.add_history(&line);
    }

    if !members.iter().any(|m| m == DATA) {
        debug!("{name}: primary");
        hdus.add_primary(name, header)?;
        return Ok(());
    }

    if let Ok(ds) = group.dataset(DATA) {
        match attrs::read_str(&ds, CLASS).as_deref() {
            Some(CLASS_IMAGE) => {
                let data = read_image(&ds)?;
                debug!("{name}: image {:?} ({})", data.shape(), data.element_type());
                hdus.add_image(name, data, header)?;
            }
            Some(CLASS_TABLE) => {
                let table = read_table(&ds)?;
                debug!("{name}: table, {} columns", table.n_columns());
                hdus.insert_table(name, table, header)?;
            }
            c => warn!("{name}: unknown DATA class {c:?}, skipping"),
        }
    } else if let Ok(g) = group.group(DATA) {
        match attrs::read_str(&g, CLASS).as_deref() {
            Some(CLASS_DATA_GROUP) => {
                let table = read_data_group(&g)?;
                debug!("{name}: data group, {} columns", table.n_columns());
                hdus.insert_table(name, table, header)?;
            }
            c => warn!("{name}: unknown DATA class {c:?}, skipping"),
        }
    } else {
        warn!("{name}: DATA is neither a dataset nor a group, skipping");
    }

    Ok(())
}

/// COMMENT or HISTORY lines, empty if the dataset does not exist.
fn read_lines(group: &Group, members: &[String], name: &str) -> Result<Vec<String>, anyhow::Error> {
    if !members.iter().any(|m| m == name) {
        return Ok(Vec::new());
    }

    let ds = group.dataset(name)?;
    let layout = stored_layout(&ds.dtype()?)?;

    read_strings(&ds, &layout).with_context(|| format!("Failed to read {name}"))
}

/// Units stored as empty or `None` strings mean no unit.
fn unit(s: Option<String>) -> Option<String> {
    s.filter(|u| !u.trim().is_empty() && u != "None")
}

fn read_image(ds: &Dataset) -> Result<Data, anyhow::Error> {
    let layout = stored_layout(&ds.dtype()?)?;
    read_data(ds, &layout, &ds.shape())
}

fn read_table(ds: &Dataset) -> Result<Table, anyhow::Error> {
    let shape = ds.shape();
    ensure!(
        shape.len() == 1,
        "Table {} must be one dimensional, not {:?}",
        ds.name(),
        shape
    );
    let n_rows = shape[0];

    let TypeDescriptor::Compound(stored) = ds.dtype()?.to_descriptor()? else {
        bail!("Table {} is not a compound dataset", ds.name());
    };

    let mut stored = stored.fields;
    stored.sort_by_key(|f| f.index);

    // Fields that can be read, with their position in the stored type.
    let fields: Vec<_> = stored
        .iter()
        .enumerate()
        .filter_map(|(i, f)| match layout(&f.ty) {
            Some(l) if !l.is_varlen() => Some((i, f, l)),
            _ => {
                warn!("{}: skipping column {} of type {:?}", ds.name(), f.name, f.ty);
                None
            }
        })
        .collect();

    // Packed memory type with just those fields, HDF5 matches them by name.
    let mut row = 0;
    let mem_fields = fields
        .iter()
        .enumerate()
        .map(|(index, (_, f, l))| {
            let field = CompoundField {
                name: f.name.clone(),
                ty: l.mem.clone(),
                offset: row,
                index,
            };
            row += l.size();
            field
        })
        .collect();
    let mem = TypeDescriptor::Compound(CompoundType {
        fields: mem_fields,
        size: row,
    });

    let bytes = if row == 0 {
        Vec::new()
    } else {
        read_bytes(ds, &mem, n_rows * row)?
    };

    let mut table = Table::new();
    let mut start = 0;

    for (i, f, l) in &fields {
        let size = l.size();
        let column: Vec<u8> = bytes
            .chunks_exact(row)
            .flat_map(|r| &r[start..start + size])
            .copied()
            .collect();
        start += size;

        let mut cell_shape = vec![n_rows];
        cell_shape.extend_from_slice(&l.cell);
        let data = Data::from_ne_bytes(l.ty, &cell_shape, l.width, &column)
            .with_context(|| format!("Column {}", f.name))?;

        let mut column = Column::new(&f.name, data);
        if let Some(u) = unit(attrs::read_str(ds, &format!("FIELD_{i}_UNITS"))) {
            column = column.with_unit(&u);
        }
        table.add_column(column)?;
    }

    Ok(table)
}

fn read_data_group(group: &Group) -> Result<Table, anyhow::Error> {
    let mut columns = Vec::new();

    for (pos, name) in order::member_names(group)?.into_iter().enumerate() {
        let Ok(ds) = group.dataset(&name) else {
            warn!("{}: {} is not a dataset, skipping", group.name(), name);
            continue;
        };

        let layout = match stored_layout(&ds.dtype()?) {
            Ok(l) => l,
            Err(e) => {
                warn!("{}: skipping column {}: {}", group.name(), name, e);
                continue;
            }
        };

        let data = read_data(&ds, &layout, &ds.shape()).with_context(|| format!("Column {name}"))?;
        let id = attrs::read_int(&ds, "COLUMN_ID").unwrap_or(pos as i64 + 1);

        let mut column = Column::new(&name, data);
        if let Some(u) = unit(attrs::read_str(&ds, "UNITS")) {
            column = column.with_unit(&u);
        }

        columns.push((id, column));
    }

    columns.sort_by_key(|(id, _)| *id);

    Ok(Table::from_columns(columns.into_iter().map(|(_, c)| c))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units() {
        assert_eq!(unit(Some("Jy".into())), Some("Jy".into()));
        assert_eq!(unit(Some("".into())), None);
        assert_eq!(unit(Some("None".into())), None);
        assert_eq!(unit(None), None);
    }
}
