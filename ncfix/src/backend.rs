//! The seam between the editing model and whatever library actually parses and writes array
//! files.
//!
//! A `Store` opens existing files as read only `Source`s and creates new files as write only
//! `Sink`s. Nothing in this crate knows how either is laid out on disk.
//!
use std::{error, ops::Range, path::Path, result, sync::Arc};

use crate::{
    array::ArrayData,
    datatype::{DataType, FileFormat},
    value::{AttrValue, Attributes, Scalar},
    variable::{Compression, Dimension},
};

/// Error reported by a backend. Wrapped by `Error::SourceRead` or `Error::DestinationWrite`.
pub type BackendError = Box<dyn error::Error + Send + Sync>;

pub type BackendResult<T> = result::Result<T, BackendError>;

/// Part of a variable to read or write
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// The whole variable
    All,

    /// A half open range of indexes along one axis, everything along the other axes
    Along { axis: usize, range: Range<usize> },
}

/// Everything a source knows about one of its variables, apart from the data
///
#[derive(Clone, Debug, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub dimensions: Vec<String>,
    pub datatype: DataType,

    /// All attributes, including the reserved fill value attribute if the variable has one
    pub attributes: Attributes,

    /// `None` if the format doesn't expose compression settings
    pub compression: Option<Compression>,

    pub chunk_sizes: Option<Vec<usize>>,
}

/// Declaration of a variable in a new file
///
#[derive(Clone, Debug)]
pub struct VariableDef<'a> {
    pub name: &'a str,
    pub datatype: DataType,
    pub dimensions: &'a [String],
    pub fill_value: Option<&'a Scalar>,
    pub compression: Compression,
    pub chunk_sizes: Option<&'a [usize]>,
}

/// Opens and creates array files
///
pub trait Store {
    /// Open an existing file for reading.
    ///
    fn open(&self, path: &Path) -> BackendResult<Arc<dyn Source>>;

    /// Whether something already exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Create a new, empty file at `path`, replacing anything already there.
    ///
    fn create(&self, path: &Path, format: FileFormat) -> BackendResult<Box<dyn Sink + '_>>;
}

/// Read access to an open array file
///
/// A source stays open for as long as anything holds a reference to it. Variable data is read
/// lazily, one selection at a time.
///
pub trait Source: Send + Sync {
    fn format(&self) -> FileFormat;

    fn dimensions(&self) -> BackendResult<Vec<Dimension>>;

    /// Names of the variables in the file.
    ///
    /// Some libraries leave coordinate variables (variables named after a dimension) out of this
    /// list even though `variable` can find them.
    ///
    fn variable_names(&self) -> BackendResult<Vec<String>>;

    /// Look up a variable. Should return `Ok(None)` if there isn't one named `name`.
    ///
    fn variable(&self, name: &str) -> BackendResult<Option<VariableInfo>>;

    fn global_attributes(&self) -> BackendResult<Attributes>;

    fn shape(&self, name: &str) -> BackendResult<Vec<usize>>;

    fn read(&self, name: &str, selection: &Selection) -> BackendResult<ArrayData>;
}

/// Write access to a newly created array file
///
pub trait Sink {
    /// Declare a dimension. `None` declares a growable (unlimited) dimension.
    ///
    fn add_dimension(&mut self, name: &str, size: Option<usize>) -> BackendResult<()>;

    fn add_variable(&mut self, definition: &VariableDef<'_>) -> BackendResult<()>;

    /// Set an attribute on a variable, or on the file itself if `variable` is `None`.
    ///
    fn put_attribute(
        &mut self,
        variable: Option<&str>,
        name: &str,
        value: &AttrValue,
    ) -> BackendResult<()>;

    /// Write data to a variable, converting it to the variable's declared type.
    ///
    /// For `Selection::Along`, data is written starting at `range.start` along `axis`.
    ///
    fn write(&mut self, variable: &str, selection: &Selection, data: &ArrayData)
        -> BackendResult<()>;

    /// Flush everything written so far.
    fn sync(&mut self) -> BackendResult<()>;

    fn close(self: Box<Self>) -> BackendResult<()>;
}
