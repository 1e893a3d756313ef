use std::{fmt, path::Path, sync::Arc};

use tracing::debug;

use crate::{
    backend::{Source, Store, VariableInfo},
    datatype::{DataType, FileFormat},
    errors::{Error, Result},
    ordered::OrderedMap,
    save::CopyWindow,
    value::{AttrValue, Attributes, Scalar, FILL_VALUE_ATTR},
    variable::{DataHandle, Dimension, Variable},
};

/// Editable copy of an array file's structure
///
/// Dimensions, variable descriptors and attributes are read eagerly when the file is opened.
/// Variable data stays in the source and is only read when the file is saved, so the source must
/// stay open for as long as this exists. Holding the source through an `Arc` takes care of that.
///
/// None of the mutators touch the source. A failing mutator leaves the model as it was.
///
pub struct NcFile {
    source: Arc<dyn Source>,
    format: FileFormat,
    dimensions: OrderedMap<Dimension>,
    variables: OrderedMap<Variable>,
    global_attributes: Attributes,

    /// Which part of unlimited variables gets copied on save, and in what increments
    pub copy_window: CopyWindow,
}

impl NcFile {
    /// Open the file at `path` in `store` and snapshot it.
    ///
    pub fn open<P: AsRef<Path>>(store: &dyn Store, path: P) -> Result<Self> {
        let source = store.open(path.as_ref()).map_err(Error::SourceRead)?;
        Self::new(source)
    }

    /// Snapshot an already open source.
    ///
    /// Coordinate variables (those named after a dimension) are included even when the source
    /// leaves them out of its variable list. The reserved fill value attribute of each variable
    /// is moved into the descriptor's fill value.
    ///
    /// # Errors
    ///
    /// * `SourceRead` if the source can't enumerate its dimensions, variables or attributes.
    ///
    pub fn new(source: Arc<dyn Source>) -> Result<Self> {
        let dimensions: OrderedMap<Dimension> = source
            .dimensions()
            .map_err(Error::SourceRead)?
            .into_iter()
            .map(|dim| (dim.name.clone(), dim))
            .collect();

        let mut names = source.variable_names().map_err(Error::SourceRead)?;
        for dim in dimensions.keys() {
            if names.iter().any(|name| name == dim) {
                continue;
            }
            if source.variable(dim).map_err(Error::SourceRead)?.is_some() {
                names.push(dim.to_string());
            }
        }

        let mut variables = OrderedMap::new();
        for name in names {
            let info = source
                .variable(&name)
                .map_err(Error::SourceRead)?
                .ok_or_else(|| {
                    Error::SourceRead(format!("variable {name} is listed but can't be read").into())
                })?;
            variables.insert(name, snapshot_variable(&source, info, &dimensions));
        }

        let global_attributes = source.global_attributes().map_err(Error::SourceRead)?;

        debug!(
            format = %source.format(),
            dimensions = dimensions.len(),
            variables = variables.len(),
            global_attributes = global_attributes.len(),
            "Read source structure"
        );

        Ok(Self {
            format: source.format(),
            source,
            dimensions,
            variables,
            global_attributes,
            copy_window: CopyWindow::default(),
        })
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn dimensions(&self) -> &OrderedMap<Dimension> {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.get(name)
    }

    pub fn variables(&self) -> &OrderedMap<Variable> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn global_attributes(&self) -> &Attributes {
        &self.global_attributes
    }

    /// The source lazy data handles read from
    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    /// Add a dimension. An existing dimension with the same name is replaced.
    ///
    pub fn add_dimension<S: Into<String>>(&mut self, name: S, size: usize, is_unlimited: bool) {
        let name = name.into();
        let dim = Dimension::new(name.clone(), size, is_unlimited);
        self.dimensions.insert(name, dim);
    }

    /// Rename a dimension, keeping its position.
    ///
    /// # Arguments
    ///
    /// * `old` - Current name of the dimension.
    /// * `new` - New name.
    /// * `cascade` - Whether to rename the dimension in every variable that uses it too.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` if there is no dimension named `old`.
    ///
    pub fn rename_dimension(&mut self, old: &str, new: &str, cascade: bool) -> Result<()> {
        let dim = self
            .dimensions
            .get_mut(old)
            .ok_or_else(|| Error::KeyNotFound(old.to_string()))?;
        dim.name = new.to_string();
        self.dimensions.rename(old, new);

        if cascade {
            for variable in self.variables.values_mut() {
                variable.rename_dimension(old, new);
            }
        }

        Ok(())
    }

    /// Rename a dimension in one variable only. Does nothing if the variable doesn't use `old`.
    ///
    pub fn rename_dimension_in_variable(
        &mut self,
        variable: &str,
        old: &str,
        new: &str,
    ) -> Result<()> {
        self.variable_mut(variable)?.rename_dimension(old, new);
        Ok(())
    }

    /// Put the dimensions in the order given by `order`, which must name each of them once.
    ///
    pub fn reorder_dimensions<S: AsRef<str>>(&mut self, order: &[S]) -> Result<()> {
        self.dimensions.reorder(order)
    }

    pub fn rename_variable(&mut self, old: &str, new: &str) -> Result<()> {
        if self.variables.rename(old, new) {
            Ok(())
        } else {
            Err(Error::VariableNotFound(old.to_string()))
        }
    }

    /// Add a variable. An existing variable with the same name is replaced.
    ///
    pub fn add_variable<S: Into<String>>(&mut self, name: S, variable: Variable) {
        self.variables.insert(name, variable);
    }

    pub fn delete_variable(&mut self, name: &str) -> Result<()> {
        self.variables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))
    }

    pub fn reorder_variables<S: AsRef<str>>(&mut self, order: &[S]) -> Result<()> {
        self.variables.reorder(order)
    }

    /// Replace a variable's data.
    ///
    /// The new data isn't checked against the variable's dimensions or type. A mismatch shows up
    /// as a write error when the file is saved.
    ///
    pub fn change_data<D: Into<DataHandle>>(&mut self, variable: &str, data: D) -> Result<()> {
        self.variable_mut(variable)?.data = data.into();
        Ok(())
    }

    /// Change the type a variable is declared with when saved. Data is converted on write.
    ///
    pub fn change_datatype(&mut self, variable: &str, datatype: DataType) -> Result<()> {
        self.variable_mut(variable)?.datatype = datatype;
        Ok(())
    }

    pub fn rename_attribute(&mut self, variable: &str, old: &str, new: &str) -> Result<()> {
        let attributes = &mut self.variable_mut(variable)?.attributes;
        if attributes.rename(old, new) {
            Ok(())
        } else {
            Err(attribute_not_found(Some(variable), old))
        }
    }

    pub fn rename_global_attribute(&mut self, old: &str, new: &str) -> Result<()> {
        if self.global_attributes.rename(old, new) {
            Ok(())
        } else {
            Err(attribute_not_found(None, old))
        }
    }

    /// Replace the value of an existing attribute.
    ///
    /// # Errors
    ///
    /// * `VariableNotFound` if there is no such variable.
    /// * `AttributeNotFound` if the variable has no attribute `name`. Use `add_attribute` to
    ///   create one.
    ///
    pub fn change_attribute<V: Into<AttrValue>>(
        &mut self,
        variable: &str,
        name: &str,
        value: V,
    ) -> Result<()> {
        let attributes = &mut self.variable_mut(variable)?.attributes;
        match attributes.get_mut(name) {
            Some(existing) => {
                *existing = value.into();
                Ok(())
            }
            None => Err(attribute_not_found(Some(variable), name)),
        }
    }

    pub fn change_global_attribute<V: Into<AttrValue>>(
        &mut self,
        name: &str,
        value: V,
    ) -> Result<()> {
        match self.global_attributes.get_mut(name) {
            Some(existing) => {
                *existing = value.into();
                Ok(())
            }
            None => Err(attribute_not_found(None, name)),
        }
    }

    /// Set an attribute, appending it if it's new
    ///
    pub fn add_attribute<S, V>(&mut self, variable: &str, name: S, value: V) -> Result<()>
    where
        S: Into<String>,
        V: Into<AttrValue>,
    {
        self.variable_mut(variable)?
            .attributes
            .insert(name, value.into());
        Ok(())
    }

    pub fn add_global_attribute<S, V>(&mut self, name: S, value: V)
    where
        S: Into<String>,
        V: Into<AttrValue>,
    {
        self.global_attributes.insert(name, value.into());
    }

    pub fn delete_attribute(&mut self, variable: &str, name: &str) -> Result<()> {
        let attributes = &mut self.variable_mut(variable)?.attributes;
        match attributes.remove(name) {
            Some(_) => Ok(()),
            None => Err(attribute_not_found(Some(variable), name)),
        }
    }

    pub fn delete_global_attribute(&mut self, name: &str) -> Result<()> {
        match self.global_attributes.remove(name) {
            Some(_) => Ok(()),
            None => Err(attribute_not_found(None, name)),
        }
    }

    fn variable_mut(&mut self, name: &str) -> Result<&mut Variable> {
        self.variables
            .get_mut(name)
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))
    }
}

fn snapshot_variable(
    source: &Arc<dyn Source>,
    info: VariableInfo,
    dimensions: &OrderedMap<Dimension>,
) -> Variable {
    let VariableInfo {
        name,
        dimensions: dim_names,
        datatype,
        mut attributes,
        compression,
        chunk_sizes,
    } = info;

    let unlimited_dim = dim_names
        .iter()
        .find(|dim| dimensions.get(dim).map_or(false, |dim| dim.is_unlimited))
        .cloned();
    // A fill value that doesn't fit the variable's type stays an ordinary attribute
    let fill_value = attributes
        .get(FILL_VALUE_ATTR)
        .and_then(|value| Scalar::from_attribute(value, datatype));
    if fill_value.is_some() {
        attributes.remove(FILL_VALUE_ATTR);
    }

    Variable {
        data: DataHandle::Source {
            source: Arc::clone(source),
            name,
        },
        dimensions: dim_names,
        has_unlimited_dim: unlimited_dim.is_some(),
        unlimited_dim,
        datatype,
        fill_value,
        attributes,
        compression: compression.unwrap_or_default(),
        chunk_sizes,
    }
}

fn attribute_not_found(variable: Option<&str>, name: &str) -> Error {
    Error::AttributeNotFound {
        variable: variable.map(str::to_string),
        name: name.to_string(),
    }
}

impl fmt::Display for NcFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File format: {}", self.format)?;

        let dims = self
            .dimensions
            .values()
            .map(|dim| format!("{}({})", dim.name, dim.size))
            .collect::<Vec<_>>();
        writeln!(f, "Dimensions: {}", dims.join(", "))?;

        writeln!(f, "variables:")?;
        for (name, variable) in &self.variables {
            writeln!(
                f,
                "\t {} {}({})",
                variable.datatype,
                name,
                variable.dimensions.join(", ")
            )?;
            for (attr, value) in &variable.attributes {
                writeln!(f, "\t   {attr}: {value}")?;
            }
            if let Some(fill_value) = &variable.fill_value {
                writeln!(f, "\t   FillValue: {fill_value}")?;
            }
        }

        writeln!(f)?;
        for (name, value) in &self.global_attributes {
            writeln!(f, "\t {name}:{value}")?;
        }

        Ok(())
    }
}
