use std::{fmt, sync::Arc};

use crate::{
    array::ArrayData,
    backend::{Selection, Source},
    datatype::DataType,
    errors::{Error, Result},
    value::{Attributes, Scalar},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,

    /// Current length. For an unlimited dimension this is its length when the source was read.
    pub size: usize,

    pub is_unlimited: bool,
}

impl Dimension {
    pub fn new<S: Into<String>>(name: S, size: usize, is_unlimited: bool) -> Self {
        Self {
            name: name.into(),
            size,
            is_unlimited,
        }
    }
}

/// Deflate settings of a variable
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Compression {
    pub enabled: bool,
    pub level: i32,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            enabled: false,
            level: 1,
        }
    }
}

/// Where a variable's values come from
///
/// Either a lazy reference to a variable in a still open source file, or an array held in memory.
/// Both are read the same way, so saving doesn't care which one it has.
///
#[derive(Clone)]
pub enum DataHandle {
    Source {
        source: Arc<dyn Source>,

        /// Name of the variable in the source, which doesn't change if the variable is renamed
        name: String,
    },
    Memory(ArrayData),
}

impl DataHandle {
    pub fn shape(&self) -> Result<Vec<usize>> {
        match self {
            Self::Source { source, name } => source.shape(name).map_err(Error::SourceRead),
            Self::Memory(array) => Ok(array.shape()),
        }
    }

    /// Read some or all of the data.
    ///
    /// Ranges along an axis are clamped to the extent of that axis.
    ///
    pub fn read(&self, selection: &Selection) -> Result<ArrayData> {
        match self {
            Self::Source { source, name } => {
                source.read(name, selection).map_err(Error::SourceRead)
            }
            Self::Memory(array) => match selection {
                Selection::All => Ok(array.clone()),
                Selection::Along { axis, range } => {
                    array.slice_axis(*axis, range.clone()).ok_or_else(|| {
                        Error::SourceRead(
                            format!("in-memory data has no axis {axis}").into(),
                        )
                    })
                }
            },
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Source { .. })
    }
}

impl fmt::Debug for DataHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source { name, .. } => f.debug_struct("Source").field("name", name).finish(),
            Self::Memory(array) => f.debug_tuple("Memory").field(array).finish(),
        }
    }
}

impl From<ArrayData> for DataHandle {
    fn from(array: ArrayData) -> Self {
        Self::Memory(array)
    }
}

/// Everything needed to declare and fill a variable in a new file
///
#[derive(Clone, Debug)]
pub struct Variable {
    pub data: DataHandle,

    /// Names of the variable's dimensions, in order. They must all exist in the file when it is
    /// saved.
    pub dimensions: Vec<String>,

    /// Whether one of the dimensions is unlimited, in which case data is copied in chunks
    pub has_unlimited_dim: bool,

    pub unlimited_dim: Option<String>,
    pub datatype: DataType,
    pub fill_value: Option<Scalar>,
    pub attributes: Attributes,
    pub compression: Compression,
    pub chunk_sizes: Option<Vec<usize>>,
}

impl Variable {
    /// A variable with in-memory or lazy `data` and no attributes
    ///
    /// The data type is taken from `data` when it is in memory, otherwise it defaults to
    /// `float32`.
    ///
    pub fn new<D, S>(data: D, dimensions: &[S]) -> Self
    where
        D: Into<DataHandle>,
        S: AsRef<str>,
    {
        let data = data.into();
        let datatype = match &data {
            DataHandle::Memory(array) => array.dtype().unwrap_or(DataType::F32),
            DataHandle::Source { .. } => DataType::F32,
        };

        Self {
            data,
            dimensions: dimensions.iter().map(|d| d.as_ref().to_string()).collect(),
            has_unlimited_dim: false,
            unlimited_dim: None,
            datatype,
            fill_value: None,
            attributes: Attributes::new(),
            compression: Compression::default(),
            chunk_sizes: None,
        }
    }

    pub fn with_unlimited_dim(mut self, has_unlimited_dim: bool) -> Self {
        self.has_unlimited_dim = has_unlimited_dim;
        self
    }

    pub fn with_datatype(mut self, datatype: DataType) -> Self {
        self.datatype = datatype;
        self
    }

    pub fn with_fill_value<V: Into<Scalar>>(mut self, fill_value: V) -> Self {
        self.fill_value = Some(fill_value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_compression(mut self, level: i32) -> Self {
        self.compression = Compression {
            enabled: true,
            level,
        };
        self
    }

    pub fn with_chunk_sizes(mut self, chunk_sizes: Vec<usize>) -> Self {
        self.chunk_sizes = Some(chunk_sizes);
        self
    }

    pub(crate) fn rename_dimension(&mut self, old: &str, new: &str) {
        for name in self.dimensions.iter_mut() {
            if name == old {
                *name = new.to_string();
            }
        }
        if self.unlimited_dim.as_deref() == Some(old) {
            self.unlimited_dim = Some(new.to_string());
        }
    }
}

/// Describe a new variable to be added to a file.
///
/// # Arguments
///
/// * `data` - The values, usually an `ndarray` array converted into `ArrayData`.
/// * `dimensions` - Names of the variable's dimensions, e.g. `["time", "lat", "lon"]`. These are
///   not checked here; they must exist in the file by the time it is saved.
/// * `has_unlimited_dim` - Whether one of the dimensions is unlimited.
/// * `datatype` - numpy style type name, e.g. "float32".
/// * `fill_value` - Fill value, if any.
/// * `attributes` - Attributes, in the order they should be written.
///
/// # Errors
///
/// * `InvalidType` if `datatype` isn't a recognized type name.
///
pub fn create_variable<D, S>(
    data: D,
    dimensions: &[S],
    has_unlimited_dim: bool,
    datatype: &str,
    fill_value: Option<Scalar>,
    attributes: Attributes,
) -> Result<Variable>
where
    D: Into<DataHandle>,
    S: AsRef<str>,
{
    let datatype = datatype.parse()?;
    let mut variable = Variable::new(data, dimensions)
        .with_unlimited_dim(has_unlimited_dim)
        .with_datatype(datatype)
        .with_attributes(attributes);
    variable.fill_value = fill_value;

    Ok(variable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttrValue;
    use ndarray::{arr1, Array3};

    #[test]
    fn test_create_variable() -> Result<()> {
        let attributes: Attributes = [("units", AttrValue::from("K"))].into_iter().collect();
        let variable = create_variable(
            ArrayData::from(Array3::<f64>::zeros([5, 10, 10])),
            &["time", "lon", "lat"],
            true,
            "int16",
            Some(Scalar::I16(-1)),
            attributes.clone(),
        )?;

        assert_eq!(variable.dimensions, vec!["time", "lon", "lat"]);
        assert!(variable.has_unlimited_dim);
        assert_eq!(variable.unlimited_dim, None);
        assert_eq!(variable.datatype, DataType::I16);
        assert_eq!(variable.fill_value, Some(Scalar::I16(-1)));
        assert_eq!(variable.attributes, attributes);
        assert_eq!(variable.compression, Compression::default());
        assert_eq!(variable.data.shape()?, vec![5, 10, 10]);

        Ok(())
    }

    #[test]
    fn test_create_variable_bad_type() {
        let result = create_variable(
            ArrayData::from(arr1(&[1.0_f32])),
            &["x"],
            false,
            "float128",
            None,
            Attributes::new(),
        );
        assert!(matches!(result, Err(Error::InvalidType(name)) if name == "float128"));
    }

    #[test]
    fn datatype_follows_in_memory_data() {
        let variable = Variable::new(ArrayData::from(arr1(&[1_u16, 2])), &["x"]);
        assert_eq!(variable.datatype, DataType::U16);
    }

    #[test]
    fn memory_handle_reads() -> Result<()> {
        let handle = DataHandle::from(ArrayData::from(arr1(&[1_i32, 2, 3, 4])));
        let chunk = handle.read(&Selection::Along {
            axis: 0,
            range: 1..3,
        })?;
        assert_eq!(chunk.as_i32().unwrap(), &arr1(&[2, 3]).into_dyn());

        let result = handle.read(&Selection::Along {
            axis: 1,
            range: 0..1,
        });
        assert!(matches!(result, Err(Error::SourceRead(_))));

        Ok(())
    }
}
