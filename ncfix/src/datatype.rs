use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// The element type of a variable
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,

    /// Single byte characters
    Char,

    /// Variable length strings
    Str,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::I8 => "int8",
            Self::U8 => "uint8",
            Self::I16 => "int16",
            Self::U16 => "uint16",
            Self::I32 => "int32",
            Self::U32 => "uint32",
            Self::I64 => "int64",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Char => "char",
            Self::Str => "string",
        }
    }

    /// Character or string data
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Char | Self::Str)
    }

    /// Code used to tag this type in binary dumps
    pub(crate) fn code(&self) -> u8 {
        match self {
            Self::I8 => 1,
            Self::U8 => 2,
            Self::I16 => 3,
            Self::U16 => 4,
            Self::I32 => 5,
            Self::U32 => 6,
            Self::I64 => 7,
            Self::U64 => 8,
            Self::F32 => 9,
            Self::F64 => 10,
            Self::Char => 11,
            Self::Str => 12,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        let dtype = match code {
            1 => Self::I8,
            2 => Self::U8,
            3 => Self::I16,
            4 => Self::U16,
            5 => Self::I32,
            6 => Self::U32,
            7 => Self::I64,
            8 => Self::U64,
            9 => Self::F32,
            10 => Self::F64,
            11 => Self::Char,
            12 => Self::Str,
            _ => return None,
        };

        Some(dtype)
    }
}

impl FromStr for DataType {
    type Err = Error;

    /// Parse numpy style type names, e.g. "float32", "f4", "int16", "i2", "S1"
    ///
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();

        // Single letter codes are case sensitive
        let dtype = match name {
            "b" => Self::I8,
            "B" => Self::U8,
            "h" => Self::I16,
            "H" => Self::U16,
            "i" => Self::I32,
            "I" => Self::U32,
            "l" | "q" => Self::I64,
            "L" | "Q" => Self::U64,
            "f" => Self::F32,
            "d" => Self::F64,
            "S" | "c" => Self::Char,
            "U" => Self::Str,
            _ => Self::from_long_name(name)?,
        };

        Ok(dtype)
    }
}

impl DataType {
    fn from_long_name(name: &str) -> Result<Self, Error> {
        let dtype = match name.to_ascii_lowercase().as_str() {
            "int8" | "i1" | "byte" => Self::I8,
            "uint8" | "u1" | "ubyte" => Self::U8,
            "int16" | "i2" | "short" => Self::I16,
            "uint16" | "u2" | "ushort" => Self::U16,
            "int32" | "i4" => Self::I32,
            "uint32" | "u4" => Self::U32,
            "int64" | "i8" | "int" => Self::I64,
            "uint64" | "u8" => Self::U64,
            "float32" | "f4" | "single" => Self::F32,
            "float64" | "f8" | "double" | "float" => Self::F64,
            "char" | "s1" => Self::Char,
            "string" | "str" => Self::Str,
            _ => return Err(Error::InvalidType(name.to_string())),
        };

        Ok(dtype)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// On disk container format of an array file
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    #[serde(rename = "NETCDF3_CLASSIC")]
    Classic,

    #[serde(rename = "NETCDF3_64BIT_OFFSET")]
    Offset64,

    #[serde(rename = "NETCDF3_64BIT_DATA")]
    Data64,

    #[serde(rename = "NETCDF4")]
    Netcdf4,

    #[default]
    #[serde(rename = "NETCDF4_CLASSIC")]
    Netcdf4Classic,
}

impl FileFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classic => "NETCDF3_CLASSIC",
            Self::Offset64 => "NETCDF3_64BIT_OFFSET",
            Self::Data64 => "NETCDF3_64BIT_DATA",
            Self::Netcdf4 => "NETCDF4",
            Self::Netcdf4Classic => "NETCDF4_CLASSIC",
        }
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "NETCDF3_CLASSIC" => Ok(Self::Classic),
            "NETCDF3_64BIT_OFFSET" | "NETCDF3_64BIT" => Ok(Self::Offset64),
            "NETCDF3_64BIT_DATA" => Ok(Self::Data64),
            "NETCDF4" => Ok(Self::Netcdf4),
            "NETCDF4_CLASSIC" => Ok(Self::Netcdf4Classic),
            _ => Err(format!("unknown file format '{name}'")),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
