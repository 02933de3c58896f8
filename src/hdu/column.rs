use super::{Data, Element, Error};

/// One named field of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: Data,
    unit: Option<String>,
    index: usize,
}

impl Column {
    /// A new column. The first axis of `data` is the row axis, any further axes are the shape of
    /// each cell.
    pub fn new<D: Into<Data>>(name: &str, data: D) -> Column {
        Column {
            name: name.to_string(),
            data: data.into(),
            unit: None,
            index: 0,
        }
    }

    /// Set the physical unit, empty strings mean no unit.
    #[must_use]
    pub fn with_unit(mut self, unit: &str) -> Column {
        self.unit = if unit.trim().is_empty() {
            None
        } else {
            Some(unit.to_string())
        };
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn values<T: Element>(&self) -> Result<Vec<T>, Error> {
        self.data.to_vec()
    }

    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// 1-based position within the table, assigned on insertion.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.shape().first().copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape of a single cell, empty for scalar cells.
    #[must_use]
    pub fn cell_shape(&self) -> &[usize] {
        self.data.shape().get(1..).unwrap_or(&[])
    }

    /// Number of elements per cell.
    #[must_use]
    pub fn repeat(&self) -> usize {
        self.cell_shape().iter().product()
    }
}

/// An ordered set of equally long columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: Option<usize>,
}

impl Table {
    #[must_use]
    pub fn new() -> Table {
        Table::default()
    }

    /// Build a table from columns, assigning ordinals in order.
    pub fn from_columns<I>(columns: I) -> Result<Table, Error>
    where
        I: IntoIterator<Item = Column>,
    {
        let mut t = Table::new();
        for c in columns {
            t.add_column(c)?;
        }
        Ok(t)
    }

    /// Append a column. The first column decides the row count, later columns must match it.
    pub fn add_column(&mut self, mut column: Column) -> Result<(), Error> {
        if column.name.is_empty() {
            return Err(Error::MissingColumnName);
        }

        if column.data.ndim() == 0 {
            return Err(Error::ScalarColumn(column.name));
        }

        if self.column(&column.name).is_some() {
            return Err(Error::DuplicateColumn(column.name));
        }

        let len = column.len();
        match self.n_rows {
            Some(n_rows) if n_rows != len => {
                return Err(Error::LengthMismatch {
                    name: column.name,
                    len,
                    n_rows,
                })
            }
            _ => self.n_rows = Some(len),
        }

        column.index = self.columns.len() + 1;
        self.columns.push(column);

        Ok(())
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows.unwrap_or(0)
    }

    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}
