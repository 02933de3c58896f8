//! Mapping between element types and HDF5 type descriptors, and raw dataset transfer.
//!
//! All data moves through native-endian byte buffers (see [`Data::to_ne_bytes`]), described to
//! HDF5 by a memory type built from a [`TypeDescriptor`]. HDF5 converts between the memory type
//! and the file type, so big-endian or padded files read the same as native ones.

use std::ffi::c_void;

use hdf5::types::{
    CompoundField, CompoundType, FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode,
};
use hdf5::{Dataset, Datatype};
use hdf5_sys::h5d::{H5Dread, H5Dwrite};
use hdf5_sys::h5p::H5P_DEFAULT;
use hdf5_sys::h5s::H5S_ALL;
use hdf5_sys::h5t::{H5T_class_t, H5Tget_class};

use crate::hdu::{trim_nul, Data, ElementType};

/// Field names of complex compounds, as written.
pub const COMPLEX_FIELDS: [&str; 2] = ["r", "i"];

/// Field name pairs recognized as complex numbers on read.
const COMPLEX_NAMES: &[[&str; 2]] = &[["r", "i"], ["re", "im"], ["real", "imag"]];

fn complex(size: FloatSize, names: [&str; 2]) -> TypeDescriptor {
    let sz = if size == FloatSize::U4 { 4 } else { 8 };

    TypeDescriptor::Compound(CompoundType {
        fields: names
            .iter()
            .enumerate()
            .map(|(index, name)| CompoundField {
                name: (*name).to_string(),
                ty: TypeDescriptor::Float(size),
                offset: index * sz,
                index,
            })
            .collect(),
        size: 2 * sz,
    })
}

/// Type of one element of `data`. Strings are fixed width, NUL padded, and stored as UTF-8 when
/// any of them is not plain ASCII.
#[must_use]
pub fn element_descriptor(data: &Data) -> TypeDescriptor {
    use ElementType as T;

    match data.element_type() {
        T::Bool => TypeDescriptor::Boolean,
        T::U8 => TypeDescriptor::Unsigned(IntSize::U1),
        T::I8 => TypeDescriptor::Integer(IntSize::U1),
        T::U16 => TypeDescriptor::Unsigned(IntSize::U2),
        T::I16 => TypeDescriptor::Integer(IntSize::U2),
        T::U32 => TypeDescriptor::Unsigned(IntSize::U4),
        T::I32 => TypeDescriptor::Integer(IntSize::U4),
        T::U64 => TypeDescriptor::Unsigned(IntSize::U8),
        T::I64 => TypeDescriptor::Integer(IntSize::U8),
        T::F32 => TypeDescriptor::Float(FloatSize::U4),
        T::F64 => TypeDescriptor::Float(FloatSize::U8),
        T::C64 => complex(FloatSize::U4, COMPLEX_FIELDS),
        T::C128 => complex(FloatSize::U8, COMPLEX_FIELDS),
        T::Str => match data {
            Data::Str(a) if a.iter().any(|s| !s.is_ascii()) => {
                TypeDescriptor::FixedUnicode(data.str_width())
            }
            _ => TypeDescriptor::FixedAscii(data.str_width()),
        },
    }
}

/// Type of one cell: the element type wrapped in a fixed array per cell axis.
#[must_use]
pub fn cell_descriptor(data: &Data, cell: &[usize]) -> TypeDescriptor {
    cell.iter()
        .rev()
        .fold(element_descriptor(data), |td, n| {
            TypeDescriptor::FixedArray(Box::new(td), *n)
        })
}

/// How the values of a stored type are read back.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub ty: ElementType,

    /// String width in bytes, zero for variable length strings and other types.
    pub width: usize,

    /// Axes of fixed array types, outermost first.
    pub cell: Vec<usize>,

    /// Packed native memory type with the same field names as the stored type.
    pub mem: TypeDescriptor,
}

impl Layout {
    fn scalar(ty: ElementType, mem: TypeDescriptor) -> Layout {
        Layout {
            ty,
            width: 0,
            cell: Vec::new(),
            mem,
        }
    }

    /// Variable length strings cannot be transferred as fixed size bytes.
    #[must_use]
    pub fn is_varlen(&self) -> bool {
        matches!(self.mem, TypeDescriptor::VarLenAscii | TypeDescriptor::VarLenUnicode)
    }

    /// Bytes of one value in memory.
    #[must_use]
    pub fn size(&self) -> usize {
        self.ty.size().unwrap_or(self.width) * self.cell.iter().product::<usize>()
    }
}

fn int_type(size: IntSize, signed: bool) -> Option<ElementType> {
    use ElementType as T;

    Some(match (size, signed) {
        (IntSize::U1, true) => T::I8,
        (IntSize::U2, true) => T::I16,
        (IntSize::U4, true) => T::I32,
        (IntSize::U8, true) => T::I64,
        (IntSize::U1, false) => T::U8,
        (IntSize::U2, false) => T::U16,
        (IntSize::U4, false) => T::U32,
        (IntSize::U8, false) => T::U64,
    })
}

fn complex_layout(c: &CompoundType) -> Option<Layout> {
    let [re, im] = c.fields.as_slice() else {
        return None;
    };

    if !COMPLEX_NAMES
        .iter()
        .any(|[r, i]| re.name.eq_ignore_ascii_case(r) && im.name.eq_ignore_ascii_case(i))
    {
        return None;
    }

    let (ty, size) = match (&re.ty, &im.ty) {
        (TypeDescriptor::Float(FloatSize::U4), TypeDescriptor::Float(FloatSize::U4)) => {
            (ElementType::C64, FloatSize::U4)
        }
        (TypeDescriptor::Float(FloatSize::U8), TypeDescriptor::Float(FloatSize::U8)) => {
            (ElementType::C128, FloatSize::U8)
        }
        _ => return None,
    };

    // Keep the stored names, HDF5 matches compound fields by name.
    Some(Layout::scalar(ty, complex(size, [re.name.as_str(), im.name.as_str()])))
}

/// Layout of a stored type, `None` for types without an element type here (compounds other
/// than complex numbers, references, variable length arrays, half floats).
#[must_use]
pub fn layout(td: &TypeDescriptor) -> Option<Layout> {
    use TypeDescriptor as D;

    match td {
        D::Boolean => Some(Layout::scalar(ElementType::Bool, D::Boolean)),
        D::Integer(size) => Some(Layout::scalar(int_type(*size, true)?, td.clone())),
        D::Unsigned(size) => Some(Layout::scalar(int_type(*size, false)?, td.clone())),
        D::Float(FloatSize::U4) => Some(Layout::scalar(ElementType::F32, td.clone())),
        D::Float(FloatSize::U8) => Some(Layout::scalar(ElementType::F64, td.clone())),
        // Enums are read through their own type, the values are plain integers.
        D::Enum(e) => Some(Layout::scalar(int_type(e.size, e.signed)?, td.clone())),
        D::Compound(c) => complex_layout(c),
        D::FixedAscii(n) | D::FixedUnicode(n) => Some(Layout {
            ty: ElementType::Str,
            width: *n,
            cell: Vec::new(),
            mem: td.clone(),
        }),
        D::VarLenAscii | D::VarLenUnicode => Some(Layout::scalar(ElementType::Str, td.clone())),
        D::FixedArray(inner, n) => {
            let inner = layout(inner)?;
            if inner.is_varlen() {
                return None;
            }

            let mut cell = vec![*n];
            cell.extend_from_slice(&inner.cell);

            Some(Layout {
                ty: inner.ty,
                width: inner.width,
                cell,
                mem: D::FixedArray(Box::new(inner.mem), *n),
            })
        }
        _ => None,
    }
}

/// Half floats have no descriptor, they are widened to `f32` by HDF5 on read.
fn is_half_float(dtype: &Datatype) -> bool {
    dtype.size() == 2
        && hdf5::sync::sync(|| unsafe { H5Tget_class(dtype.id()) }) == H5T_class_t::H5T_FLOAT
}

/// Layout of a stored datatype, failing for types that cannot be read.
pub fn stored_layout(dtype: &Datatype) -> Result<Layout, anyhow::Error> {
    if is_half_float(dtype) {
        return Ok(Layout::scalar(
            ElementType::F32,
            TypeDescriptor::Float(FloatSize::U4),
        ));
    }

    let td = dtype.to_descriptor()?;
    layout(&td).ok_or_else(|| anyhow!("Unsupported datatype: {:?}", td))
}

/// Read a whole dataset of fixed or variable length strings.
pub fn read_strings(ds: &Dataset, layout: &Layout) -> Result<Vec<String>, anyhow::Error> {
    ensure!(
        layout.ty == ElementType::Str && layout.cell.is_empty(),
        "Dataset {} does not hold plain strings",
        ds.name()
    );

    Ok(match layout.mem {
        TypeDescriptor::VarLenUnicode => ds
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::VarLenAscii => ds
            .read_raw::<VarLenAscii>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        _ => {
            let w = layout.width.max(1);
            read_bytes(ds, &layout.mem, ds.size() * w)?
                .chunks_exact(w)
                .map(trim_nul)
                .collect()
        }
    })
}

/// Read a whole dataset of shape `shape` into [`Data`]. Fixed array cells become trailing axes.
pub fn read_data(ds: &Dataset, layout: &Layout, shape: &[usize]) -> Result<Data, anyhow::Error> {
    let mut full = shape.to_vec();
    full.extend_from_slice(&layout.cell);

    if layout.is_varlen() {
        let strings = read_strings(ds, layout)?;
        return Ok(Data::Str(ndarray::ArrayD::from_shape_vec(
            ndarray::IxDyn(&full),
            strings,
        )?));
    }

    let n: usize = shape.iter().product();
    let bytes = read_bytes(ds, &layout.mem, n * layout.size())?;

    Data::from_ne_bytes(layout.ty, &full, layout.width, &bytes)
}

/// Write a whole dataset from native bytes described by `mem`.
pub fn write_bytes(ds: &Dataset, mem: &TypeDescriptor, bytes: &[u8]) -> Result<(), anyhow::Error> {
    if bytes.is_empty() {
        return Ok(());
    }

    let mem = Datatype::from_descriptor(mem)?;

    let e = hdf5::sync::sync(|| unsafe {
        H5Dwrite(
            ds.id(),
            mem.id(),
            H5S_ALL,
            H5S_ALL,
            H5P_DEFAULT,
            bytes.as_ptr() as *const c_void,
        )
    });
    ensure!(e >= 0, "Failed to write dataset {}", ds.name());

    Ok(())
}

/// Read a whole dataset into native bytes described by `mem`, `len` bytes in total.
pub fn read_bytes(ds: &Dataset, mem: &TypeDescriptor, len: usize) -> Result<Vec<u8>, anyhow::Error> {
    let mut buf = vec![0u8; len];
    if len == 0 {
        return Ok(buf);
    }

    let mem = Datatype::from_descriptor(mem)?;

    let e = hdf5::sync::sync(|| unsafe {
        H5Dread(
            ds.id(),
            mem.id(),
            H5S_ALL,
            H5S_ALL,
            H5P_DEFAULT,
            buf.as_mut_ptr() as *mut c_void,
        )
    });
    ensure!(e >= 0, "Failed to read dataset {}", ds.name());

    Ok(buf)
}
