//! Array files kept in memory.
//!
//! Behaves like a real array file library as far as the editing model can tell: sinks reject
//! duplicate declarations and undeclared dimensions, convert written data to the declared type,
//! only grow unlimited dimensions, and publish what has been written on every `sync`.
//!
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{
    array::ArrayData,
    backend::{
        BackendError, BackendResult, Selection, Sink, Source, Store, VariableDef, VariableInfo,
    },
    datatype::{DataType, FileFormat},
    value::{AttrValue, Attributes, Scalar, FILL_VALUE_ATTR},
    variable::{Compression, Dimension},
};

/// A registry of in-memory files, keyed by path
///
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<PathBuf, Arc<MemoryFile>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<PathBuf>>(&self, path: P, file: MemoryFile) {
        self.files.lock().insert(path.into(), Arc::new(file));
    }

    /// The current state of the file at `path`
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<Arc<MemoryFile>> {
        self.files.lock().get(path.as_ref()).cloned()
    }

    pub fn remove<P: AsRef<Path>>(&self, path: P) -> Option<Arc<MemoryFile>> {
        self.files.lock().remove(path.as_ref())
    }
}

impl Store for MemoryStore {
    fn open(&self, path: &Path) -> BackendResult<Arc<dyn Source>> {
        match self.get(path) {
            Some(file) => Ok(file as Arc<dyn Source>),
            None => Err(format!("No such file: {}", path.display()).into()),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    fn create(&self, path: &Path, format: FileFormat) -> BackendResult<Box<dyn Sink + '_>> {
        let file = MemoryFile::new().with_format(format);
        self.insert(path, file.clone());

        let sink: Box<dyn Sink + '_> = Box::new(MemorySink {
            store: self,
            path: path.to_path_buf(),
            file,
        });

        Ok(sink)
    }
}

/// A complete array file
///
#[derive(Clone, Debug, Default)]
pub struct MemoryFile {
    format: FileFormat,
    dimensions: Vec<Dimension>,
    variables: Vec<MemoryVariable>,
    attributes: Attributes,
    unreadable: bool,
}

impl MemoryFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_dimension<S: Into<String>>(mut self, name: S, size: usize) -> Self {
        self.dimensions.push(Dimension::new(name, size, false));
        self
    }

    pub fn with_unlimited_dimension<S: Into<String>>(mut self, name: S, size: usize) -> Self {
        self.dimensions.push(Dimension::new(name, size, true));
        self
    }

    pub fn with_variable(mut self, variable: MemoryVariable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_attribute<S, V>(mut self, name: S, value: V) -> Self
    where
        S: Into<String>,
        V: Into<AttrValue>,
    {
        self.attributes.insert(name, value.into());
        self
    }

    /// Make metadata enumeration fail, like a corrupt file would
    ///
    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    fn check_readable(&self) -> BackendResult<()> {
        if self.unreadable {
            Err("HDF error: file metadata is corrupt".into())
        } else {
            Ok(())
        }
    }

    fn find(&self, name: &str) -> BackendResult<&MemoryVariable> {
        self.variables
            .iter()
            .find(|variable| variable.name == name)
            .ok_or_else(|| no_such_variable(name))
    }

    fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|dim| dim.name == name)
    }
}

impl Source for MemoryFile {
    fn format(&self) -> FileFormat {
        self.format
    }

    fn dimensions(&self) -> BackendResult<Vec<Dimension>> {
        self.check_readable()?;
        Ok(self.dimensions.clone())
    }

    fn variable_names(&self) -> BackendResult<Vec<String>> {
        self.check_readable()?;
        Ok(self
            .variables
            .iter()
            .filter(|variable| variable.listed)
            .map(|variable| variable.name.clone())
            .collect())
    }

    fn variable(&self, name: &str) -> BackendResult<Option<VariableInfo>> {
        self.check_readable()?;
        let info = self
            .variables
            .iter()
            .find(|variable| variable.name == name)
            .map(|variable| VariableInfo {
                name: variable.name.clone(),
                dimensions: variable.dimensions.clone(),
                datatype: variable.datatype,
                attributes: variable.attributes.clone(),
                compression: variable.compression,
                chunk_sizes: variable.chunk_sizes.clone(),
            });

        Ok(info)
    }

    fn global_attributes(&self) -> BackendResult<Attributes> {
        self.check_readable()?;
        Ok(self.attributes.clone())
    }

    fn shape(&self, name: &str) -> BackendResult<Vec<usize>> {
        Ok(self.find(name)?.data.shape())
    }

    fn read(&self, name: &str, selection: &Selection) -> BackendResult<ArrayData> {
        let variable = self.find(name)?;
        match selection {
            Selection::All => Ok(variable.data.clone()),
            Selection::Along { axis, range } => variable
                .data
                .slice_axis(*axis, range.clone())
                .ok_or_else(|| format!("Variable {name} has no axis {axis}").into()),
        }
    }
}

/// One variable of a `MemoryFile`
///
#[derive(Clone, Debug)]
pub struct MemoryVariable {
    name: String,
    dimensions: Vec<String>,
    datatype: DataType,
    data: ArrayData,
    attributes: Attributes,
    compression: Option<Compression>,
    chunk_sizes: Option<Vec<usize>>,
    listed: bool,
}

impl MemoryVariable {
    /// A variable holding `data`. The data type is that of `data`, or `string` for the masked
    /// placeholder.
    ///
    pub fn new<N, S, D>(name: N, dimensions: &[S], data: D) -> Self
    where
        N: Into<String>,
        S: AsRef<str>,
        D: Into<ArrayData>,
    {
        let data = data.into();
        Self {
            name: name.into(),
            dimensions: dimensions.iter().map(|d| d.as_ref().to_string()).collect(),
            datatype: data.dtype().unwrap_or(DataType::Str),
            data,
            attributes: Attributes::new(),
            compression: None,
            chunk_sizes: None,
            listed: true,
        }
    }

    pub fn with_datatype(mut self, datatype: DataType) -> Self {
        self.datatype = datatype;
        self
    }

    pub fn with_attribute<S, V>(mut self, name: S, value: V) -> Self
    where
        S: Into<String>,
        V: Into<AttrValue>,
    {
        self.attributes.insert(name, value.into());
        self
    }

    /// Store a fill value the way array files do, as the reserved fill value attribute
    ///
    pub fn with_fill_value<V: Into<Scalar>>(self, fill_value: V) -> Self {
        self.with_attribute(FILL_VALUE_ATTR, AttrValue::from(fill_value.into()))
    }

    pub fn with_compression(mut self, level: i32) -> Self {
        self.compression = Some(Compression {
            enabled: true,
            level,
        });
        self
    }

    pub fn with_chunk_sizes(mut self, chunk_sizes: Vec<usize>) -> Self {
        self.chunk_sizes = Some(chunk_sizes);
        self
    }

    /// Leave this variable out of the file's variable name list, while still finding it by name
    ///
    pub fn unlisted(mut self) -> Self {
        self.listed = false;
        self
    }

    fn fill_value(&self) -> Option<Scalar> {
        self.attributes
            .get(FILL_VALUE_ATTR)
            .and_then(|value| Scalar::from_attribute(value, self.datatype))
    }
}

/// Writes a new `MemoryFile` into a `MemoryStore`
///
pub struct MemorySink<'a> {
    store: &'a MemoryStore,
    path: PathBuf,
    file: MemoryFile,
}

impl<'a> MemorySink<'a> {
    fn find_mut(&mut self, name: &str) -> BackendResult<&mut MemoryVariable> {
        self.file
            .variables
            .iter_mut()
            .find(|variable| variable.name == name)
            .ok_or_else(|| no_such_variable(name))
    }

    fn write_all(&mut self, name: &str, data: ArrayData) -> BackendResult<()> {
        let variable = self.file.find(name)?;
        if data.ndim() != variable.dimensions.len() {
            return Err(format!(
                "Variable {name} has {} dimensions, got {} dimensional data",
                variable.dimensions.len(),
                data.ndim()
            )
            .into());
        }

        let mut grown = vec![];
        for (axis, dim_name) in variable.dimensions.iter().enumerate() {
            let dim = self
                .file
                .dimension(dim_name)
                .ok_or_else(|| no_such_dimension(dim_name))?;
            let extent = data.len_of(axis);
            if dim.is_unlimited {
                grown.push((dim_name.clone(), extent));
            } else if extent != dim.size {
                return Err(format!(
                    "Dimension {dim_name} has size {}, got {extent} along axis {axis} of {name}",
                    dim.size
                )
                .into());
            }
        }

        self.find_mut(name)?.data = data;
        self.grow_dimensions(grown);

        Ok(())
    }

    fn write_along(
        &mut self,
        name: &str,
        axis: usize,
        offset: usize,
        data: ArrayData,
    ) -> BackendResult<()> {
        let variable = self.file.find(name)?;
        let dim_name = variable
            .dimensions
            .get(axis)
            .ok_or_else(|| format!("Variable {name} has no axis {axis}"))?
            .clone();
        let dim = self
            .file
            .dimension(&dim_name)
            .ok_or_else(|| no_such_dimension(&dim_name))?;

        let end = offset + data.len_of(axis);
        if !dim.is_unlimited && end > dim.size {
            return Err(format!(
                "Index {end} out of bounds for fixed dimension {dim_name} of size {}",
                dim.size
            )
            .into());
        }

        let variable = self.find_mut(name)?;
        let fill_value = variable.fill_value();
        variable
            .data
            .splice(axis, offset, &data, fill_value.as_ref())
            .map_err(|err| format!("Can't write to {name}: {err}"))?;
        let extent = variable.data.len_of(axis);
        self.grow_dimensions(vec![(dim_name, extent)]);

        Ok(())
    }

    fn grow_dimensions(&mut self, extents: Vec<(String, usize)>) {
        for (name, extent) in extents {
            if let Some(dim) = self.file.dimensions.iter_mut().find(|dim| dim.name == name) {
                if dim.is_unlimited {
                    dim.size = dim.size.max(extent);
                }
            }
        }
    }
}

impl<'a> Sink for MemorySink<'a> {
    fn add_dimension(&mut self, name: &str, size: Option<usize>) -> BackendResult<()> {
        if self.file.dimension(name).is_some() {
            return Err(format!("Dimension {name} already exists").into());
        }
        let dim = match size {
            Some(size) => Dimension::new(name, size, false),
            None => Dimension::new(name, 0, true),
        };
        self.file.dimensions.push(dim);

        Ok(())
    }

    fn add_variable(&mut self, definition: &VariableDef<'_>) -> BackendResult<()> {
        let name = definition.name;
        if self.file.find(name).is_ok() {
            return Err(format!("Variable {name} already exists").into());
        }

        let shape = definition
            .dimensions
            .iter()
            .map(|dim_name| {
                self.file
                    .dimension(dim_name)
                    .map(|dim| dim.size)
                    .ok_or_else(|| no_such_dimension(dim_name))
            })
            .collect::<BackendResult<Vec<usize>>>()?;

        let fill_value = match definition.fill_value {
            Some(fill_value) => Some(fill_value.cast(definition.datatype).ok_or_else(|| {
                format!(
                    "Fill value {fill_value} can't be stored as {}",
                    definition.datatype
                )
            })?),
            None => None,
        };

        let mut attributes = Attributes::new();
        if let Some(fill_value) = &fill_value {
            attributes.insert(FILL_VALUE_ATTR, AttrValue::from(fill_value.clone()));
        }

        self.file.variables.push(MemoryVariable {
            name: name.to_string(),
            dimensions: definition.dimensions.to_vec(),
            datatype: definition.datatype,
            data: ArrayData::filled(definition.datatype, &shape, fill_value.as_ref()),
            attributes,
            compression: Some(definition.compression),
            chunk_sizes: definition.chunk_sizes.map(|sizes| sizes.to_vec()),
            listed: true,
        });

        Ok(())
    }

    fn put_attribute(
        &mut self,
        variable: Option<&str>,
        name: &str,
        value: &AttrValue,
    ) -> BackendResult<()> {
        match variable {
            Some(variable) => {
                self.find_mut(variable)?
                    .attributes
                    .insert(name, value.clone());
            }
            None => {
                self.file.attributes.insert(name, value.clone());
            }
        }

        Ok(())
    }

    fn write(
        &mut self,
        variable: &str,
        selection: &Selection,
        data: &ArrayData,
    ) -> BackendResult<()> {
        if data.is_masked() {
            return Err(format!("Can't write masked placeholder to {variable}").into());
        }
        if data.is_empty() {
            return Ok(());
        }

        let datatype = self.file.find(variable)?.datatype;
        let data = data.cast(datatype).ok_or_else(|| {
            format!(
                "Can't convert {} data to {datatype} for {variable}",
                data.dtype().map(|dtype| dtype.name()).unwrap_or("masked")
            )
        })?;

        match selection {
            Selection::All => self.write_all(variable, data),
            Selection::Along { axis, range } => {
                self.write_along(variable, *axis, range.start, data)
            }
        }
    }

    fn sync(&mut self) -> BackendResult<()> {
        self.store.insert(&self.path, self.file.clone());
        Ok(())
    }

    fn close(mut self: Box<Self>) -> BackendResult<()> {
        self.sync()
    }
}

fn no_such_variable(name: &str) -> BackendError {
    format!("No such variable: {name}").into()
}

fn no_such_dimension(name: &str) -> BackendError {
    format!("No such dimension: {name}").into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array2};

    fn create(store: &MemoryStore) -> Box<dyn Sink + '_> {
        store
            .create(Path::new("out.nc"), FileFormat::Netcdf4)
            .unwrap()
    }

    fn written(store: &MemoryStore) -> Arc<MemoryFile> {
        store.get("out.nc").unwrap()
    }

    fn declare(
        sink: &mut Box<dyn Sink + '_>,
        name: &str,
        dims: &[String],
        fill_value: Option<&Scalar>,
    ) {
        sink.add_variable(&VariableDef {
            name,
            datatype: DataType::I16,
            dimensions: dims,
            fill_value,
            compression: Compression::default(),
            chunk_sizes: None,
        })
        .unwrap();
    }

    #[test]
    fn create_registers_empty_file() {
        let store = MemoryStore::new();
        assert!(!store.exists(Path::new("out.nc")));

        let _sink = create(&store);
        assert!(store.exists(Path::new("out.nc")));
        let file = written(&store);
        assert_eq!(file.format(), FileFormat::Netcdf4);
        assert!(file.dimensions().unwrap().is_empty());
    }

    #[test]
    fn open_missing() {
        let store = MemoryStore::new();
        assert!(store.open(Path::new("nope.nc")).is_err());
    }

    #[test]
    fn unlisted_variables_are_found_by_name() {
        let file = MemoryFile::new()
            .with_dimension("x", 2)
            .with_variable(MemoryVariable::new("x", &["x"], arr1(&[1.0_f32, 2.0])).unlisted())
            .with_variable(MemoryVariable::new("v", &["x"], arr1(&[1_i32, 2])));

        assert_eq!(file.variable_names().unwrap(), vec!["v"]);
        let info = file.variable("x").unwrap().unwrap();
        assert_eq!(info.datatype, DataType::F32);
        assert!(file.variable("y").unwrap().is_none());
    }

    #[test]
    fn unreadable_file() {
        let file = MemoryFile::new().with_dimension("x", 2).unreadable();
        assert!(file.dimensions().is_err());
        assert!(file.variable_names().is_err());
    }

    #[test]
    fn declarations_are_checked() {
        let store = MemoryStore::new();
        let mut sink = create(&store);
        sink.add_dimension("x", Some(2)).unwrap();
        assert!(sink.add_dimension("x", Some(3)).is_err());

        let dims = vec![String::from("x")];
        declare(&mut sink, "v", &dims, None);
        let result = sink.add_variable(&VariableDef {
            name: "v",
            datatype: DataType::F32,
            dimensions: &dims,
            fill_value: None,
            compression: Compression::default(),
            chunk_sizes: None,
        });
        assert!(result.is_err());

        let dims = vec![String::from("y")];
        let result = sink.add_variable(&VariableDef {
            name: "w",
            datatype: DataType::F32,
            dimensions: &dims,
            fill_value: None,
            compression: Compression::default(),
            chunk_sizes: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn new_variables_are_filled() {
        let store = MemoryStore::new();
        let mut sink = create(&store);
        sink.add_dimension("x", Some(3)).unwrap();
        let dims = vec![String::from("x")];
        declare(&mut sink, "v", &dims, Some(&Scalar::I32(-1)));
        sink.close().unwrap();

        let file = written(&store);
        let data = file.read("v", &Selection::All).unwrap();
        assert_eq!(data.as_i16().unwrap(), &arr1(&[-1_i16, -1, -1]).into_dyn());

        let info = file.variable("v").unwrap().unwrap();
        assert_eq!(info.attributes.get(FILL_VALUE_ATTR), Some(&AttrValue::I16(vec![-1])));
    }

    #[test]
    fn writes_are_converted() {
        let store = MemoryStore::new();
        let mut sink = create(&store);
        sink.add_dimension("x", Some(2)).unwrap();
        let dims = vec![String::from("x")];
        declare(&mut sink, "v", &dims, None);

        let data = ArrayData::from(arr1(&[1.0_f64, 2.0]));
        sink.write("v", &Selection::All, &data).unwrap();
        sink.sync().unwrap();
        let read = written(&store).read("v", &Selection::All).unwrap();
        assert_eq!(read.as_i16().unwrap(), &arr1(&[1_i16, 2]).into_dyn());

        let data = ArrayData::from(arr1(&[1.5e10_f64, 2.0]));
        assert!(sink.write("v", &Selection::All, &data).is_err());

        let data = ArrayData::from(arr1(&[String::from("a"), String::from("b")]));
        assert!(sink.write("v", &Selection::All, &data).is_err());

        assert!(sink.write("v", &Selection::All, &ArrayData::Masked).is_err());
    }

    #[test]
    fn fixed_dimensions_do_not_grow() {
        let store = MemoryStore::new();
        let mut sink = create(&store);
        sink.add_dimension("x", Some(2)).unwrap();
        let dims = vec![String::from("x")];
        declare(&mut sink, "v", &dims, None);

        let data = ArrayData::from(arr1(&[1_i16, 2, 3]));
        assert!(sink.write("v", &Selection::All, &data).is_err());
        let along = Selection::Along {
            axis: 0,
            range: 1..4,
        };
        assert!(sink.write("v", &along, &data).is_err());
    }

    #[test]
    fn unlimited_dimensions_grow() {
        let store = MemoryStore::new();
        let mut sink = create(&store);
        sink.add_dimension("t", None).unwrap();
        sink.add_dimension("x", Some(2)).unwrap();
        let dims = vec![String::from("t"), String::from("x")];
        declare(&mut sink, "v", &dims, Some(&Scalar::I16(-9)));

        let chunk = ArrayData::from(arr2(&[[1_i16, 2], [3, 4]]));
        let at = |start| Selection::Along {
            axis: 0,
            range: start..start + 2,
        };
        sink.write("v", &at(0), &chunk).unwrap();
        sink.write("v", &at(3), &chunk).unwrap();

        // Nothing to write
        let empty = ArrayData::from(Array2::<i16>::zeros([0, 2]));
        sink.write("v", &at(9), &empty).unwrap();
        sink.close().unwrap();

        let file = written(&store);
        assert_eq!(file.dimensions().unwrap()[0], Dimension::new("t", 5, true));
        let data = file.read("v", &Selection::All).unwrap();
        assert_eq!(
            data.as_i16().unwrap(),
            &arr2(&[[1, 2], [3, 4], [-9, -9], [1, 2], [3, 4]]).into_dyn()
        );
    }

    #[test]
    fn sync_publishes_partial_state() {
        let store = MemoryStore::new();
        let mut sink = create(&store);
        sink.add_dimension("x", Some(2)).unwrap();
        sink.put_attribute(None, "title", &AttrValue::from("partial"))
            .unwrap();
        assert!(written(&store).global_attributes().unwrap().is_empty());

        sink.sync().unwrap();
        let attributes = written(&store).global_attributes().unwrap();
        assert_eq!(attributes.get("title"), Some(&AttrValue::from("partial")));
        assert!(sink.put_attribute(Some("nope"), "a", &AttrValue::from(1_i8)).is_err());
    }
}
