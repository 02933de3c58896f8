//! The format neutral in-memory document: an ordered list of named header-data units.
//!
//! Both codecs read into an [`HduList`] and write from one, they never talk to each other.
//!
//! ```
//! use hdfits::hdu::{Column, HduList, Header};
//!
//! let mut hdus = HduList::new();
//! hdus.add_primary("PRIMARY", Header::new()).unwrap();
//! hdus.add_table(
//!     "DATA",
//!     [
//!         Column::new("X", vec![1i32, 2, 3]),
//!         Column::new("FLUX", vec![1.5f32, 2.5, 3.5]).with_unit("Jy"),
//!     ],
//!     Header::new(),
//! )
//! .unwrap();
//!
//! assert_eq!(hdus.get("data").unwrap().table().unwrap().n_rows(), 3);
//! ```

mod column;
mod data;
mod header;

pub use column::{Column, Table};
pub use data::{Complex, Data, Element, ElementType};
pub(crate) use data::{trim_fixed_str, trim_nul};
pub use header::{Card, Header, HeaderValue};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("HDU {0:?} already exists")]
    DuplicateHdu(String),

    #[error("HDU {0:?} not found")]
    HduNotFound(String),

    #[error("column {0:?} already exists")]
    DuplicateColumn(String),

    #[error("column has no name")]
    MissingColumnName,

    #[error("column {0:?} has no row axis")]
    ScalarColumn(String),

    #[error("image {0:?} has no axes")]
    ScalarImage(String),

    #[error("column {name:?} has {len} rows, but the table has {n_rows}")]
    LengthMismatch {
        name: String,
        len: usize,
        n_rows: usize,
    },

    #[error("expected elements of type {expected}, found {found}")]
    TypeMismatch {
        expected: ElementType,
        found: ElementType,
    },
}

/// The payload of an HDU.
#[derive(Debug, Clone, PartialEq)]
pub enum HduData {
    /// Metadata only.
    Primary,
    Image(Data),
    Table(Table),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hdu {
    name: String,
    header: Header,
    data: HduData,
}

impl Hdu {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    #[must_use]
    pub fn data(&self) -> &HduData {
        &self.data
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        matches!(self.data, HduData::Primary)
    }

    #[must_use]
    pub fn image(&self) -> Option<&Data> {
        match &self.data {
            HduData::Image(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn table(&self) -> Option<&Table> {
        match &self.data {
            HduData::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Short variant name for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self.data {
            HduData::Primary => "primary",
            HduData::Image(_) => "image",
            HduData::Table(_) => "table",
        }
    }
}

/// Ordered HDUs with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HduList {
    hdus: Vec<Hdu>,
}

impl HduList {
    #[must_use]
    pub fn new() -> HduList {
        HduList::default()
    }

    fn insert(&mut self, name: &str, header: Header, data: HduData) -> Result<&mut Hdu, Error> {
        if self.hdus.iter().any(|h| h.name == name) {
            return Err(Error::DuplicateHdu(name.to_string()));
        }

        self.hdus.push(Hdu {
            name: name.to_string(),
            header,
            data,
        });

        let n = self.hdus.len();
        Ok(&mut self.hdus[n - 1])
    }

    pub fn add_primary(&mut self, name: &str, header: Header) -> Result<&mut Hdu, Error> {
        self.insert(name, header, HduData::Primary)
    }

    pub fn add_image<D: Into<Data>>(
        &mut self,
        name: &str,
        data: D,
        header: Header,
    ) -> Result<&mut Hdu, Error> {
        let data = data.into();
        if data.ndim() == 0 {
            return Err(Error::ScalarImage(name.to_string()));
        }

        self.insert(name, header, HduData::Image(data))
    }

    /// Insert a table, adding the columns in order. Fails on the first invalid column.
    pub fn add_table<I>(&mut self, name: &str, columns: I, header: Header) -> Result<&mut Hdu, Error>
    where
        I: IntoIterator<Item = Column>,
    {
        let table = Table::from_columns(columns)?;
        self.insert_table(name, table, header)
    }

    pub fn insert_table(
        &mut self,
        name: &str,
        table: Table,
        header: Header,
    ) -> Result<&mut Hdu, Error> {
        self.insert(name, header, HduData::Table(table))
    }

    fn position(&self, name: &str) -> Option<usize> {
        // FITS tools upper-case extension names, so fall back to case variants.
        let find = |n: &str| self.hdus.iter().position(|h| h.name == n);

        find(name)
            .or_else(|| find(&name.to_lowercase()))
            .or_else(|| find(&name.to_uppercase()))
    }

    /// Look up an HDU by exact name, then its lower-case and upper-case variants.
    pub fn get(&self, name: &str) -> Result<&Hdu, Error> {
        self.position(name)
            .map(|i| &self.hdus[i])
            .ok_or_else(|| Error::HduNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Hdu, Error> {
        match self.position(name) {
            Some(i) => Ok(&mut self.hdus[i]),
            None => Err(Error::HduNotFound(name.to_string())),
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hdu> {
        self.hdus.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hdus.iter().map(|h| h.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }
}

impl<'a> IntoIterator for &'a HduList {
    type Item = &'a Hdu;
    type IntoIter = std::slice::Iter<'a, Hdu>;

    fn into_iter(self) -> Self::IntoIter {
        self.hdus.iter()
    }
}
