use std::io;
use std::path::PathBuf;
use std::result;

use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum Error {
    /// The source's metadata or data could not be read.
    #[error("cannot read source: {0}")]
    SourceRead(#[source] BackendError),

    #[error("no entry with name '{0}'")]
    KeyNotFound(String),

    #[error("there is no variable with name '{0}'")]
    VariableNotFound(String),

    #[error("{}", attribute_message(.variable, .name))]
    AttributeNotFound {
        variable: Option<String>,
        name: String,
    },

    #[error("new order has {found} entries but there are {expected}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("'{0}' is not a known data type")]
    InvalidType(String),

    #[error("destination {} already exists", .0.display())]
    DestinationExists(PathBuf),

    #[error("cannot write {}: {source}", .path.display())]
    DestinationWrite {
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed variable dump: {0}")]
    Decode(String),
}

fn attribute_message(variable: &Option<String>, name: &str) -> String {
    match variable {
        Some(variable) => {
            format!("there is no attribute with name '{name}' in variable '{variable}'")
        }
        None => format!("there is no global attribute with name '{name}'"),
    }
}

pub type Result<T> = result::Result<T, Error>;
