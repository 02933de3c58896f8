use std::fmt;

use byte_slice_cast::AsByteSlice;
use ndarray::{Array1, ArrayD, IxDyn};

use super::Error;

/// A complex number laid out as two consecutive values, matching both the cfitsio `C`/`M`
/// column layout and the `r`/`i` compound used in HDF5.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub fn new(re: T, im: T) -> Complex<T> {
        Complex { re, im }
    }
}

/// The closed set of element types a column or image can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    C64,
    C128,
    Str,
}

impl ElementType {
    /// Size of one element in bytes, `None` for strings (their width depends on the data).
    #[must_use]
    pub fn size(&self) -> Option<usize> {
        use ElementType::*;

        match self {
            Bool | U8 | I8 => Some(1),
            U16 | I16 => Some(2),
            U32 | I32 | F32 => Some(4),
            U64 | I64 | F64 | C64 => Some(8),
            C128 => Some(16),
            Str => None,
        }
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        use ElementType::*;

        matches!(self, U8 | I8 | U16 | I16 | U32 | I32 | U64 | I64)
    }

    #[must_use]
    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::F32 | ElementType::F64)
    }

    #[must_use]
    pub fn is_complex(&self) -> bool {
        matches!(self, ElementType::C64 | ElementType::C128)
    }

    /// Plain numbers: eligible for bitshuffle and scale-offset filters.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ElementType::*;

        let s = match self {
            Bool => "bool",
            U8 => "u8",
            I8 => "i8",
            U16 => "u16",
            I16 => "i16",
            U32 => "u32",
            I32 => "i32",
            U64 => "u64",
            I64 => "i64",
            F32 => "f32",
            F64 => "f64",
            C64 => "c64",
            C128 => "c128",
            Str => "str",
        };
        f.write_str(s)
    }
}

/// A dense, owned, n-dimensional array of one [`ElementType`].
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Bool(ArrayD<bool>),
    U8(ArrayD<u8>),
    I8(ArrayD<i8>),
    U16(ArrayD<u16>),
    I16(ArrayD<i16>),
    U32(ArrayD<u32>),
    I32(ArrayD<i32>),
    U64(ArrayD<u64>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    C64(ArrayD<Complex<f32>>),
    C128(ArrayD<Complex<f64>>),
    Str(ArrayD<String>),
}

macro_rules! each {
    ($data:expr, $a:ident => $e:expr) => {
        match $data {
            Data::Bool($a) => $e,
            Data::U8($a) => $e,
            Data::I8($a) => $e,
            Data::U16($a) => $e,
            Data::I16($a) => $e,
            Data::U32($a) => $e,
            Data::I32($a) => $e,
            Data::U64($a) => $e,
            Data::I64($a) => $e,
            Data::F32($a) => $e,
            Data::F64($a) => $e,
            Data::C64($a) => $e,
            Data::C128($a) => $e,
            Data::Str($a) => $e,
        }
    };
}

/// Types that can be stored in [`Data`].
pub trait Element: Clone + Default + 'static {
    const TYPE: ElementType;

    fn wrap(a: ArrayD<Self>) -> Data;
    fn peek(d: &Data) -> Option<&ArrayD<Self>>;
}

macro_rules! element {
    ($t:ty, $v:ident) => {
        impl Element for $t {
            const TYPE: ElementType = ElementType::$v;

            fn wrap(a: ArrayD<Self>) -> Data {
                Data::$v(a)
            }

            fn peek(d: &Data) -> Option<&ArrayD<Self>> {
                match d {
                    Data::$v(a) => Some(a),
                    _ => None,
                }
            }
        }

        impl From<ArrayD<$t>> for Data {
            fn from(a: ArrayD<$t>) -> Data {
                Data::$v(a)
            }
        }

        impl From<Vec<$t>> for Data {
            fn from(v: Vec<$t>) -> Data {
                Data::$v(Array1::from(v).into_dyn())
            }
        }
    };
}

element!(bool, Bool);
element!(u8, U8);
element!(i8, I8);
element!(u16, U16);
element!(i16, I16);
element!(u32, U32);
element!(i32, I32);
element!(u64, U64);
element!(i64, I64);
element!(f32, F32);
element!(f64, F64);
element!(Complex<f32>, C64);
element!(Complex<f64>, C128);
element!(String, Str);

impl From<Vec<&str>> for Data {
    fn from(v: Vec<&str>) -> Data {
        Data::from(v.into_iter().map(String::from).collect::<Vec<_>>())
    }
}

macro_rules! decode {
    ($bytes:expr, $shape:expr, $t:ty, $v:ident) => {{
        let v = $bytes
            .chunks_exact(std::mem::size_of::<$t>())
            .map(|c| <$t>::from_ne_bytes(c.try_into().unwrap_or_default()))
            .collect::<Vec<$t>>();
        Data::$v(ArrayD::from_shape_vec(IxDyn($shape), v)?)
    }};
}

macro_rules! decode_complex {
    ($bytes:expr, $shape:expr, $t:ty, $v:ident) => {{
        let sz = std::mem::size_of::<$t>();
        let v = $bytes
            .chunks_exact(2 * sz)
            .map(|c| {
                Complex::new(
                    <$t>::from_ne_bytes(c[..sz].try_into().unwrap_or_default()),
                    <$t>::from_ne_bytes(c[sz..].try_into().unwrap_or_default()),
                )
            })
            .collect::<Vec<_>>();
        Data::$v(ArrayD::from_shape_vec(IxDyn($shape), v)?)
    }};
}

impl Data {
    /// An empty (zero-length) one-dimensional array of the given type.
    #[must_use]
    pub fn empty(ty: ElementType) -> Data {
        use ElementType as T;

        let shape = IxDyn(&[0]);
        match ty {
            T::Bool => Data::Bool(ArrayD::default(shape)),
            T::U8 => Data::U8(ArrayD::default(shape)),
            T::I8 => Data::I8(ArrayD::default(shape)),
            T::U16 => Data::U16(ArrayD::default(shape)),
            T::I16 => Data::I16(ArrayD::default(shape)),
            T::U32 => Data::U32(ArrayD::default(shape)),
            T::I32 => Data::I32(ArrayD::default(shape)),
            T::U64 => Data::U64(ArrayD::default(shape)),
            T::I64 => Data::I64(ArrayD::default(shape)),
            T::F32 => Data::F32(ArrayD::default(shape)),
            T::F64 => Data::F64(ArrayD::default(shape)),
            T::C64 => Data::C64(ArrayD::default(shape)),
            T::C128 => Data::C128(ArrayD::default(shape)),
            T::Str => Data::Str(ArrayD::default(shape)),
        }
    }

    #[must_use]
    pub fn element_type(&self) -> ElementType {
        match self {
            Data::Bool(_) => ElementType::Bool,
            Data::U8(_) => ElementType::U8,
            Data::I8(_) => ElementType::I8,
            Data::U16(_) => ElementType::U16,
            Data::I16(_) => ElementType::I16,
            Data::U32(_) => ElementType::U32,
            Data::I32(_) => ElementType::I32,
            Data::U64(_) => ElementType::U64,
            Data::I64(_) => ElementType::I64,
            Data::F32(_) => ElementType::F32,
            Data::F64(_) => ElementType::F64,
            Data::C64(_) => ElementType::C64,
            Data::C128(_) => ElementType::C128,
            Data::Str(_) => ElementType::Str,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        each!(self, a => a.shape())
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        each!(self, a => a.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed view of the array, `None` if `T` is not the stored element type.
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::peek(self)
    }

    /// Typed view of the array, failing with a type mismatch.
    pub fn try_array<T: Element>(&self) -> Result<&ArrayD<T>, Error> {
        T::peek(self).ok_or(Error::TypeMismatch {
            expected: T::TYPE,
            found: self.element_type(),
        })
    }

    /// Elements in logical (row-major) order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, Error> {
        Ok(self.try_array::<T>()?.iter().cloned().collect())
    }

    /// Width in bytes of the longest string, at least 1. Zero for non-string data.
    #[must_use]
    pub fn str_width(&self) -> usize {
        match self {
            Data::Str(a) => a.iter().map(String::len).max().unwrap_or(0).max(1),
            _ => 0,
        }
    }

    /// Width in bytes of one element as stored by [`Data::to_ne_bytes`].
    #[must_use]
    pub fn element_width(&self) -> usize {
        self.element_type().size().unwrap_or_else(|| self.str_width())
    }

    /// Native-endian bytes in row-major order. Strings are NUL padded to `str_width()`.
    #[must_use]
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        fn cast<T: Copy>(a: &ArrayD<T>) -> Vec<T> {
            a.iter().copied().collect()
        }

        match self {
            Data::Bool(a) => a.iter().map(|b| u8::from(*b)).collect(),
            Data::U8(a) => cast(a),
            Data::I8(a) => cast(a).as_byte_slice().to_vec(),
            Data::U16(a) => cast(a).as_byte_slice().to_vec(),
            Data::I16(a) => cast(a).as_byte_slice().to_vec(),
            Data::U32(a) => cast(a).as_byte_slice().to_vec(),
            Data::I32(a) => cast(a).as_byte_slice().to_vec(),
            Data::U64(a) => cast(a).as_byte_slice().to_vec(),
            Data::I64(a) => cast(a).as_byte_slice().to_vec(),
            Data::F32(a) => cast(a).as_byte_slice().to_vec(),
            Data::F64(a) => cast(a).as_byte_slice().to_vec(),
            Data::C64(a) => a
                .iter()
                .flat_map(|c| [c.re, c.im])
                .collect::<Vec<f32>>()
                .as_byte_slice()
                .to_vec(),
            Data::C128(a) => a
                .iter()
                .flat_map(|c| [c.re, c.im])
                .collect::<Vec<f64>>()
                .as_byte_slice()
                .to_vec(),
            Data::Str(a) => {
                let w = self.str_width();
                let mut out = Vec::with_capacity(a.len() * w);
                for s in a.iter() {
                    let b = s.as_bytes();
                    out.extend_from_slice(&b[..b.len().min(w)]);
                    out.resize(out.len() + w.saturating_sub(b.len()), 0);
                }
                out
            }
        }
    }

    /// Inverse of [`Data::to_ne_bytes`]. `width` is only used for strings.
    pub fn from_ne_bytes(
        ty: ElementType,
        shape: &[usize],
        width: usize,
        bytes: &[u8],
    ) -> Result<Data, anyhow::Error> {
        let n: usize = shape.iter().product();
        let w = ty.size().unwrap_or(width);

        ensure!(
            bytes.len() == n * w,
            "expected {} bytes for {} x {}, got {}",
            n * w,
            ty,
            n,
            bytes.len()
        );

        use ElementType as T;

        Ok(match ty {
            T::Bool => Data::Bool(ArrayD::from_shape_vec(
                IxDyn(shape),
                bytes.iter().map(|b| *b != 0).collect(),
            )?),
            T::U8 => Data::U8(ArrayD::from_shape_vec(IxDyn(shape), bytes.to_vec())?),
            T::I8 => decode!(bytes, shape, i8, I8),
            T::U16 => decode!(bytes, shape, u16, U16),
            T::I16 => decode!(bytes, shape, i16, I16),
            T::U32 => decode!(bytes, shape, u32, U32),
            T::I32 => decode!(bytes, shape, i32, I32),
            T::U64 => decode!(bytes, shape, u64, U64),
            T::I64 => decode!(bytes, shape, i64, I64),
            T::F32 => decode!(bytes, shape, f32, F32),
            T::F64 => decode!(bytes, shape, f64, F64),
            T::C64 => decode_complex!(bytes, shape, f32, C64),
            T::C128 => decode_complex!(bytes, shape, f64, C128),
            T::Str => {
                let v = if w == 0 {
                    vec![String::new(); n]
                } else {
                    bytes.chunks_exact(w).map(trim_nul).collect()
                };
                Data::Str(ArrayD::from_shape_vec(IxDyn(shape), v)?)
            }
        })
    }

    /// Minimum and maximum of plain numeric data, `None` for other types or empty arrays.
    #[must_use]
    pub fn min_max(&self) -> Option<(f64, f64)> {
        fn fold<T: Copy + Into<f64>>(a: &ArrayD<T>) -> Option<(f64, f64)> {
            a.iter().map(|v| (*v).into()).fold(None, |acc, v: f64| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
        }

        match self {
            Data::U8(a) => fold(a),
            Data::I8(a) => fold(a),
            Data::U16(a) => fold(a),
            Data::I16(a) => fold(a),
            Data::U32(a) => fold(a),
            Data::I32(a) => fold(a),
            Data::U64(a) => fold(&a.mapv(|v| v as f64)),
            Data::I64(a) => fold(&a.mapv(|v| v as f64)),
            Data::F32(a) => fold(a),
            Data::F64(a) => fold(a),
            _ => None,
        }
    }
}

/// Cut a fixed width HDF5 string at its NUL padding. Trailing blanks are part of the value.
pub(crate) fn trim_nul(b: &[u8]) -> String {
    let end = b.iter().position(|c| *c == 0).unwrap_or(b.len());
    String::from_utf8_lossy(&b[..end]).into_owned()
}

/// Strip the NUL and trailing blank padding of a fixed width FITS string.
pub(crate) fn trim_fixed_str(b: &[u8]) -> String {
    let mut s = trim_nul(b);
    s.truncate(s.trim_end().len());
    s
}
