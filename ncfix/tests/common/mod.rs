#![allow(dead_code)]

use ndarray::{arr1, Array3};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use ncfix::{
    ArrayData, AttrValue, BackendResult, FileFormat, MemoryFile, MemoryStore, MemoryVariable,
    Selection, Sink, Source, Store, VariableDef,
};

pub const SOURCE: &str = "source.nc";

/// Dimensions X(10), Y(8), T(5, unlimited) and variables mytemp(T, X, Y) and T(T)
pub fn source_file() -> MemoryFile {
    let temperature = Array3::from_shape_fn((5, 10, 8), |(t, x, y)| {
        (t * 100 + x * 10 + y) as f32 / 10.0
    });

    MemoryFile::new()
        .with_dimension("X", 10)
        .with_dimension("Y", 8)
        .with_unlimited_dimension("T", 5)
        .with_variable(
            MemoryVariable::new("T", &["T"], arr1(&[0.0_f64, 1.0, 2.0, 3.0, 4.0]))
                .with_attribute("units", "days since 2000-01-01")
                .with_attribute("calendar", "standard")
                .unlisted(),
        )
        .with_variable(
            MemoryVariable::new("mytemp", &["T", "X", "Y"], temperature)
                .with_fill_value(-999.0_f32)
                .with_attribute("units", "degC")
                .with_attribute("valid_range", vec![-50.0_f32, 50.0])
                .with_compression(4),
        )
        .with_attribute("title", "Test file")
        .with_attribute("version", 3_i32)
}

pub fn source_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(SOURCE, source_file());

    store
}

/// A store that remembers every write made through its sinks
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    pub writes: Mutex<Vec<(String, Selection)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        let store = Self::default();
        store.inner.insert(SOURCE, source_file());

        store
    }

    pub fn writes_to(&self, variable: &str) -> Vec<Selection> {
        self.writes
            .lock()
            .iter()
            .filter(|(name, _)| name == variable)
            .map(|(_, selection)| selection.clone())
            .collect()
    }
}

impl Store for RecordingStore {
    fn open(&self, path: &Path) -> BackendResult<Arc<dyn Source>> {
        self.inner.open(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn create(&self, path: &Path, format: FileFormat) -> BackendResult<Box<dyn Sink + '_>> {
        let inner = self.inner.create(path, format)?;
        let sink: Box<dyn Sink + '_> = Box::new(RecordingSink {
            inner,
            writes: &self.writes,
        });

        Ok(sink)
    }
}

struct RecordingSink<'a> {
    inner: Box<dyn Sink + 'a>,
    writes: &'a Mutex<Vec<(String, Selection)>>,
}

impl<'a> Sink for RecordingSink<'a> {
    fn add_dimension(&mut self, name: &str, size: Option<usize>) -> BackendResult<()> {
        self.inner.add_dimension(name, size)
    }

    fn add_variable(&mut self, definition: &VariableDef<'_>) -> BackendResult<()> {
        self.inner.add_variable(definition)
    }

    fn put_attribute(
        &mut self,
        variable: Option<&str>,
        name: &str,
        value: &AttrValue,
    ) -> BackendResult<()> {
        self.inner.put_attribute(variable, name, value)
    }

    fn write(
        &mut self,
        variable: &str,
        selection: &Selection,
        data: &ArrayData,
    ) -> BackendResult<()> {
        self.writes
            .lock()
            .push((variable.to_string(), selection.clone()));
        self.inner.write(variable, selection, data)
    }

    fn sync(&mut self) -> BackendResult<()> {
        self.inner.sync()
    }

    fn close(self: Box<Self>) -> BackendResult<()> {
        self.inner.close()
    }
}
