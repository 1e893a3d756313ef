//! Writing an `NcFile` out to a new file.
//!
//! Dimensions are declared first, then each variable is declared, given its attributes, filled
//! and synced, and finally the global attributes are written. Variables with an unlimited
//! dimension are copied a few records at a time, so large variables never have to be read in one
//! piece.
//!
use std::{cmp, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    array::ArrayData,
    backend::{BackendError, Selection, Sink, Store, VariableDef},
    datatype::FileFormat,
    errors::{Error, Result},
    file::NcFile,
    variable::Variable,
};

/// Default number of records copied at a time along an unlimited dimension
pub const DEFAULT_CHUNK_STEP: i64 = 10;

/// The range of records, and how many at a time, copied along the unlimited dimension of a
/// variable
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyWindow {
    /// First record to copy. Records are written starting at zero in the new file.
    pub start: usize,

    /// One past the last record to copy. If `None`, the size of the first unlimited dimension is
    /// used, or the variable's own extent if the file has no unlimited dimension.
    pub stop: Option<usize>,

    /// Records per chunk. Zero copies the whole window at once, negative values mean one.
    pub chunk_step: i64,
}

impl Default for CopyWindow {
    fn default() -> Self {
        Self {
            start: 0,
            stop: None,
            chunk_step: DEFAULT_CHUNK_STEP,
        }
    }
}

impl CopyWindow {
    /// Records per chunk, or `None` if chunked copying is off
    pub fn step(&self) -> Option<usize> {
        match self.chunk_step {
            0 => None,
            step if step < 0 => Some(1),
            step => Some(usize::try_from(step).unwrap_or(usize::MAX)),
        }
    }
}

/// Options for `NcFile::save_with`
///
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Replace the destination if it already exists
    pub overwrite: bool,

    /// Format of the new file. Defaults to the format of the source.
    pub format: Option<FileFormat>,
}

impl SaveOptions {
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }
}

impl NcFile {
    /// Save to a new file at `path`, refusing to replace an existing one.
    ///
    pub fn save<P: AsRef<Path>>(&self, store: &dyn Store, path: P) -> Result<()> {
        self.save_with(store, path, &SaveOptions::default())
    }

    /// Save to a new file at `path`.
    ///
    /// The model itself isn't changed, so it can be edited further and saved again.
    ///
    /// # Errors
    ///
    /// * `KeyNotFound` if a variable uses a dimension the file doesn't have. Nothing is created.
    /// * `DestinationExists` if `path` exists and `options.overwrite` isn't set.
    /// * `SourceRead` if variable data can't be read from the source.
    /// * `DestinationWrite` if creating or writing the new file fails. Whatever was written
    ///   before the failure is left in place.
    ///
    pub fn save_with<P: AsRef<Path>>(
        &self,
        store: &dyn Store,
        path: P,
        options: &SaveOptions,
    ) -> Result<()> {
        let path = path.as_ref();
        self.check_dimensions()?;
        if !options.overwrite && store.exists(path) {
            return Err(Error::DestinationExists(path.to_path_buf()));
        }

        let format = options.format.unwrap_or_else(|| self.format());
        info!(
            path = %path.display(),
            %format,
            dimensions = self.dimensions().len(),
            variables = self.variables().len(),
            "Saving"
        );

        let destination = |source: BackendError| Error::DestinationWrite {
            path: path.to_path_buf(),
            source,
        };
        let mut sink = store.create(path, format).map_err(destination)?;

        let mut stop = self.copy_window.stop;
        for (name, dim) in self.dimensions() {
            if dim.is_unlimited {
                sink.add_dimension(name, None).map_err(destination)?;
                if stop.is_none() {
                    stop = Some(dim.size);
                }
            } else {
                sink.add_dimension(name, Some(dim.size))
                    .map_err(destination)?;
            }
        }

        for (name, variable) in self.variables() {
            self.declare_variable(sink.as_mut(), name, variable)
                .map_err(destination)?;
            self.copy_variable(sink.as_mut(), name, variable, stop, path)?;
            sink.sync().map_err(destination)?;
        }

        for (name, value) in self.global_attributes() {
            sink.put_attribute(None, name, value).map_err(destination)?;
        }

        sink.close().map_err(destination)?;
        info!(path = %path.display(), "Saved");

        Ok(())
    }

    fn check_dimensions(&self) -> Result<()> {
        for variable in self.variables().values() {
            for dim in &variable.dimensions {
                if !self.dimensions().contains_key(dim) {
                    return Err(Error::KeyNotFound(dim.clone()));
                }
            }
        }

        Ok(())
    }

    fn declare_variable(
        &self,
        sink: &mut (dyn Sink + '_),
        name: &str,
        variable: &Variable,
    ) -> std::result::Result<(), BackendError> {
        debug!(
            variable = name,
            datatype = %variable.datatype,
            dimensions = ?variable.dimensions,
            "Declaring variable"
        );
        sink.add_variable(&VariableDef {
            name,
            datatype: variable.datatype,
            dimensions: &variable.dimensions,
            fill_value: variable.fill_value.as_ref(),
            compression: variable.compression,
            chunk_sizes: variable.chunk_sizes.as_deref(),
        })?;

        for (attr, value) in &variable.attributes {
            sink.put_attribute(Some(name), attr, value)?;
        }

        Ok(())
    }

    fn copy_variable(
        &self,
        sink: &mut (dyn Sink + '_),
        name: &str,
        variable: &Variable,
        stop: Option<usize>,
        path: &Path,
    ) -> Result<()> {
        let mut write = |selection: &Selection, data: &ArrayData| {
            sink.write(name, selection, data)
                .map_err(|source| Error::DestinationWrite {
                    path: path.to_path_buf(),
                    source,
                })
        };

        if !variable.has_unlimited_dim {
            let data = read_data(name, variable, &Selection::All)?;
            return write(&Selection::All, &data);
        }

        let axis = self.unlimited_axis(variable);
        let start = self.copy_window.start;
        let stop = match stop {
            Some(stop) => stop,
            None => variable.data.shape()?.get(axis).copied().unwrap_or(0),
        };
        let step = self
            .copy_window
            .step()
            .unwrap_or_else(|| stop.saturating_sub(start).max(1));

        for n in (start..stop).step_by(step) {
            let end = cmp::min(n + step, stop);
            let chunk = read_data(
                name,
                variable,
                &Selection::Along {
                    axis,
                    range: n..end,
                },
            )?;
            let offset = n - start;
            debug!(variable = name, axis, from = n, to = end, "Copying chunk");
            write(
                &Selection::Along {
                    axis,
                    range: offset..offset + chunk.len_of(axis),
                },
                &chunk,
            )?;
        }

        Ok(())
    }

    /// Index of the variable's first unlimited dimension, or zero if there is none
    fn unlimited_axis(&self, variable: &Variable) -> usize {
        variable
            .dimensions
            .iter()
            .position(|dim| {
                self.dimensions()
                    .get(dim)
                    .map_or(false, |dim| dim.is_unlimited)
            })
            .unwrap_or(0)
    }
}

/// Read variable data, swapping the masked placeholder of an empty text variable for an empty
/// string array.
///
fn read_data(name: &str, variable: &Variable, selection: &Selection) -> Result<ArrayData> {
    let data = variable.data.read(selection)?;
    if data.is_masked() && variable.datatype.is_text() {
        warn!(variable = name, "Replacing masked placeholder with empty text");
        return Ok(ArrayData::empty(variable.datatype));
    }

    Ok(data)
}
