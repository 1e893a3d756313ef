//! Fix the metadata of array files.
//!
//! Open a file into an `NcFile`, rename, add, delete or reorder its dimensions, variables and
//! attributes, then save a corrected copy. Variable data is only read from the original file
//! while saving, a few records at a time for variables with an unlimited dimension.
//!
mod array;
mod backend;
mod datatype;
mod errors;
mod extio;
mod file;
mod memory;
mod ordered;
mod persist;
mod save;
mod value;
mod variable;

#[cfg(test)]
mod testing;

pub use array::ArrayData;

pub use backend::BackendError;
pub use backend::BackendResult;
pub use backend::Selection;
pub use backend::Sink;
pub use backend::Source;
pub use backend::Store;
pub use backend::VariableDef;
pub use backend::VariableInfo;

pub use datatype::DataType;
pub use datatype::FileFormat;

pub use errors::Error;
pub use errors::Result;

pub use file::NcFile;

pub use memory::MemoryFile;
pub use memory::MemorySink;
pub use memory::MemoryStore;
pub use memory::MemoryVariable;

pub use ordered::OrderedMap;

pub use persist::dump_variable;
pub use persist::load_variable;
pub use persist::read_variable;
pub use persist::write_variable;

pub use save::CopyWindow;
pub use save::SaveOptions;
pub use save::DEFAULT_CHUNK_STEP;

pub use value::AttrValue;
pub use value::Attributes;
pub use value::Scalar;
pub use value::FILL_VALUE_ATTR;

pub use variable::create_variable;
pub use variable::Compression;
pub use variable::DataHandle;
pub use variable::Dimension;
pub use variable::Variable;
