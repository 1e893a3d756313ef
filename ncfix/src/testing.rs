use ndarray::{arr1, Array3};

use crate::{
    errors::Result,
    file::NcFile,
    memory::{MemoryFile, MemoryStore, MemoryVariable},
};

pub(crate) const SOURCE: &str = "source.nc";

/// A small climate style file with a time series of temperature grids.
///
/// The time coordinate variable is left out of the variable list, the way some libraries report
/// coordinate variables.
///
pub(crate) fn source_file() -> MemoryFile {
    let temperature = Array3::from_shape_fn((5, 10, 8), |(t, x, y)| {
        270.0 + t as f32 + x as f32 * 0.5 + y as f32 * 0.25
    });

    MemoryFile::new()
        .with_dimension("X", 10)
        .with_dimension("Y", 8)
        .with_unlimited_dimension("T", 5)
        .with_variable(
            MemoryVariable::new("mytemp", &["T", "X", "Y"], temperature)
                .with_fill_value(-999.0_f32)
                .with_attribute("units", "K")
                .with_attribute("long_name", "Temperature")
                .with_compression(4)
                .with_chunk_sizes(vec![1, 10, 8]),
        )
        .with_variable(
            MemoryVariable::new("T", &["T"], arr1(&[0.0_f64, 1.0, 2.0, 3.0, 4.0]))
                .with_attribute("units", "days since 2000-01-01")
                .unlisted(),
        )
        .with_attribute("title", "Test file")
        .with_attribute("history", "created")
}

pub(crate) fn store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(SOURCE, source_file());

    store
}

pub(crate) fn fixture() -> Result<NcFile> {
    NcFile::open(&store(), SOURCE)
}
