//! Mapping between element types and FITS format codes, image BITPIX values and cfitsio datatype
//! codes.

use std::os::raw::c_int;

use crate::hdu::ElementType;

// cfitsio datatype codes (fitsio.h).
pub const TBIT: c_int = 1;
pub const TBYTE: c_int = 11;
pub const TSBYTE: c_int = 12;
pub const TLOGICAL: c_int = 14;
pub const TSTRING: c_int = 16;
pub const TUSHORT: c_int = 20;
pub const TSHORT: c_int = 21;
pub const TUINT: c_int = 30;
pub const TINT: c_int = 31;
pub const TULONG: c_int = 40;
pub const TLONG: c_int = 41;
pub const TFLOAT: c_int = 42;
pub const TULONGLONG: c_int = 80;
pub const TLONGLONG: c_int = 81;
pub const TDOUBLE: c_int = 82;
pub const TCOMPLEX: c_int = 83;
pub const TDBLCOMPLEX: c_int = 163;

// HDU types.
pub const IMAGE_HDU: c_int = 0;
pub const ASCII_TBL: c_int = 1;
pub const BINARY_TBL: c_int = 2;

// Image BITPIX values, including the cfitsio pseudo values for unsigned and signed byte images.
pub const BYTE_IMG: c_int = 8;
pub const SBYTE_IMG: c_int = 10;
pub const SHORT_IMG: c_int = 16;
pub const USHORT_IMG: c_int = 20;
pub const LONG_IMG: c_int = 32;
pub const ULONG_IMG: c_int = 40;
pub const LONGLONG_IMG: c_int = 64;
pub const ULONGLONG_IMG: c_int = 80;
pub const FLOAT_IMG: c_int = -32;
pub const DOUBLE_IMG: c_int = -64;

/// Binary table format letter for an element type. Types without a FITS representation are
/// widened to the next larger one (`u16` to `J`, `u32` and `u64` to `K`, `i8` to `I`).
#[must_use]
pub fn type_code(ty: ElementType) -> char {
    use ElementType::*;

    match ty {
        Bool => 'L',
        U8 => 'B',
        I8 | I16 => 'I',
        U16 | I32 => 'J',
        U32 | U64 | I64 => 'K',
        F32 => 'E',
        F64 => 'D',
        C64 => 'C',
        C128 => 'M',
        Str => 'A',
    }
}

/// The element type a format letter reads back as.
#[must_use]
pub fn code_type(code: char) -> Option<ElementType> {
    use ElementType::*;

    Some(match code {
        'L' | 'X' => Bool,
        'B' => U8,
        'I' => I16,
        'J' => I32,
        'K' => I64,
        'E' => F32,
        'D' => F64,
        'C' => C64,
        'M' => C128,
        'A' => Str,
        _ => return None,
    })
}

/// TFORM value of a column: repeat count (elements per cell, or characters for text) followed by
/// the type letter. A repeat of one is left out. Cells holding several strings use the `rAw` form
/// so that cfitsio splits them at the string width.
#[must_use]
pub fn tform(ty: ElementType, cell_shape: &[usize], str_width: usize) -> String {
    let code = type_code(ty);
    let count: usize = cell_shape.iter().product();

    match ty {
        ElementType::Str if count > 1 => {
            let w = str_width.max(1);
            format!("{}{code}{w}", w * count)
        }
        ElementType::Str => format!("{}{code}", str_width.max(1)),
        _ if count == 1 => code.to_string(),
        _ => format!("{count}{code}"),
    }
}

/// TDIM value for multi-dimensional cells: axes in FITS order (fastest first), i.e. reversed.
/// `None` when the repeat count alone describes the cell.
#[must_use]
pub fn tdim(ty: ElementType, cell_shape: &[usize], str_width: usize) -> Option<String> {
    let mut dims: Vec<usize> = cell_shape.iter().rev().copied().collect();

    if ty == ElementType::Str {
        if dims.is_empty() {
            return None;
        }
        dims.insert(0, str_width.max(1));
    } else if dims.len() < 2 {
        return None;
    }

    Some(format!(
        "({})",
        dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(",")
    ))
}

/// Parse a TDIM value into a cell shape in row-major order.
#[must_use]
pub fn parse_tdim(tdim: &str) -> Option<Vec<usize>> {
    let inner = tdim.trim().strip_prefix('(')?.strip_suffix(')')?;

    inner
        .split(',')
        .rev()
        .map(|d| d.trim().parse::<usize>().ok())
        .collect()
}

/// cfitsio datatype used to transfer values of an element type.
#[must_use]
pub fn datatype(ty: ElementType) -> c_int {
    use ElementType::*;

    match ty {
        Bool => TLOGICAL,
        U8 => TBYTE,
        I8 => TSBYTE,
        U16 => TUSHORT,
        I16 => TSHORT,
        U32 => TUINT,
        I32 => TINT,
        U64 => TULONGLONG,
        I64 => TLONGLONG,
        F32 => TFLOAT,
        F64 => TDOUBLE,
        C64 => TCOMPLEX,
        C128 => TDBLCOMPLEX,
        Str => TSTRING,
    }
}

/// Element type for a column typecode as returned by `ffeqtyll` (negative for variable length
/// arrays, which have no element type here).
#[must_use]
pub fn column_type(typecode: c_int) -> Option<ElementType> {
    use ElementType::*;

    Some(match typecode {
        TBIT | TLOGICAL => Bool,
        TBYTE => U8,
        TSBYTE => I8,
        TUSHORT => U16,
        TSHORT => I16,
        TUINT | TULONG => U32,
        TINT | TLONG => I32,
        TULONGLONG => U64,
        TLONGLONG => I64,
        TFLOAT => F32,
        TDOUBLE => F64,
        TCOMPLEX => C64,
        TDBLCOMPLEX => C128,
        TSTRING => Str,
        _ => return None,
    })
}

/// BITPIX for an image of the given element type, `None` for types FITS images cannot hold.
#[must_use]
pub fn bitpix(ty: ElementType) -> Option<c_int> {
    use ElementType::*;

    Some(match ty {
        Bool | U8 => BYTE_IMG,
        I8 => SBYTE_IMG,
        U16 => USHORT_IMG,
        I16 => SHORT_IMG,
        U32 => ULONG_IMG,
        I32 => LONG_IMG,
        U64 => ULONGLONG_IMG,
        I64 => LONGLONG_IMG,
        F32 => FLOAT_IMG,
        F64 => DOUBLE_IMG,
        C64 | C128 | Str => return None,
    })
}

/// Element type of an image with the given (equivalent) BITPIX.
#[must_use]
pub fn image_type(bitpix: c_int) -> Option<ElementType> {
    use ElementType::*;

    Some(match bitpix {
        BYTE_IMG => U8,
        SBYTE_IMG => I8,
        SHORT_IMG => I16,
        USHORT_IMG => U16,
        LONG_IMG => I32,
        ULONG_IMG => U32,
        LONGLONG_IMG => I64,
        ULONGLONG_IMG => U64,
        FLOAT_IMG => F32,
        DOUBLE_IMG => F64,
        _ => return None,
    })
}
