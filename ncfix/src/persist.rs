//! Save a single variable descriptor, data included, to a binary file and load it back.
//!
//! A dump starts with a magic number and a format version, followed by the descriptor's fields
//! in order. Numbers are Big Endian. Lazy data is read from its source when dumping, so a loaded
//! variable always holds its data in memory.
//!
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use ndarray::{ArrayD, IxDyn};

use crate::{
    array::ArrayData,
    backend::Selection,
    datatype::DataType,
    errors::{Error, Result},
    extio::{ExtendedRead, ExtendedWrite, Serialize, Word},
    value::{AttrValue, Attributes, Scalar},
    variable::{Compression, Variable},
};

const MAGIC_NUMBER: u16 = 0xF1C5;
const FORMAT_VERSION: u32 = 0;

/// Tag for text attribute values. Numeric values are tagged with their type code.
const TEXT_TAG: u8 = 0;

/// Tag for the masked placeholder. Arrays are otherwise tagged with their type code.
const MASKED_TAG: u8 = 0;

/// Write `variable` to a new file at `path`.
///
pub fn dump_variable<P: AsRef<Path>>(variable: &Variable, path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_variable(variable, &mut file)?;
    file.flush()?;

    Ok(())
}

/// Read a variable written by `dump_variable`.
///
pub fn load_variable<P: AsRef<Path>>(path: P) -> Result<Variable> {
    let mut file = BufReader::new(File::open(path)?);
    read_variable(&mut file)
}

/// Write `variable` to a stream.
///
/// # Errors
///
/// * `SourceRead` if the variable's data has to be read from a source and that fails.
/// * `Io` if writing fails.
///
pub fn write_variable(variable: &Variable, stream: &mut impl io::Write) -> Result<()> {
    stream.write_word(MAGIC_NUMBER)?;
    stream.write_word(FORMAT_VERSION)?;

    stream.write_len(variable.dimensions.len())?;
    for dim in &variable.dimensions {
        stream.write_string(dim)?;
    }
    stream.write_byte(variable.has_unlimited_dim as u8)?;
    write_option(stream, variable.unlimited_dim.as_ref(), |stream, name| {
        Ok(stream.write_string(name)?)
    })?;
    variable.datatype.write_to(stream)?;
    write_option(stream, variable.fill_value.as_ref(), |stream, fill_value| {
        fill_value.write_to(stream)
    })?;
    variable.attributes.write_to(stream)?;
    variable.compression.write_to(stream)?;
    write_option(stream, variable.chunk_sizes.as_ref(), |stream, sizes| {
        stream.write_len(sizes.len())?;
        for &size in sizes {
            stream.write_len(size)?;
        }
        Ok(())
    })?;

    variable.data.read(&Selection::All)?.write_to(stream)?;

    Ok(())
}

/// Read a variable written by `write_variable`.
///
/// # Errors
///
/// * `Decode` if the stream isn't a variable dump or is malformed.
/// * `Io` if reading fails, including if the stream ends early.
///
pub fn read_variable(stream: &mut impl io::Read) -> Result<Variable> {
    let magic_number: u16 = stream.read_word()?;
    if magic_number != MAGIC_NUMBER {
        return Err(Error::Decode(String::from("not a variable dump")));
    }
    let version: u32 = stream.read_word()?;
    if version != FORMAT_VERSION {
        return Err(Error::Decode(format!("unrecognized format version {version}")));
    }

    let n_dims = stream.read_len()?;
    let mut dimensions = vec![];
    for _ in 0..n_dims {
        dimensions.push(stream.read_string()?);
    }
    let has_unlimited_dim = read_bool(stream)?;
    let unlimited_dim = read_option(stream, |stream| stream.read_string())?;
    let datatype = DataType::read_from(stream)?;
    let fill_value = read_option(stream, |stream| Scalar::read_from(stream))?;
    let attributes = Attributes::read_from(stream)?;
    let compression = Compression::read_from(stream)?;
    let chunk_sizes = read_option(stream, |stream| {
        let len = stream.read_len()?;
        let mut sizes = vec![];
        for _ in 0..len {
            sizes.push(stream.read_len()?);
        }
        Ok(sizes)
    })?;
    let data = ArrayData::read_from(stream)?;

    Ok(Variable {
        data: data.into(),
        dimensions,
        has_unlimited_dim,
        unlimited_dim,
        datatype,
        fill_value,
        attributes,
        compression,
        chunk_sizes,
    })
}

fn write_option<S, T, F>(stream: &mut S, value: Option<T>, write: F) -> Result<()>
where
    S: io::Write,
    F: FnOnce(&mut S, T) -> Result<()>,
{
    match value {
        Some(value) => {
            stream.write_byte(1)?;
            write(stream, value)
        }
        None => Ok(stream.write_byte(0)?),
    }
}

fn read_option<S, T, F>(stream: &mut S, read: F) -> Result<Option<T>>
where
    S: io::Read,
    F: FnOnce(&mut S) -> Result<T>,
{
    if read_bool(stream)? {
        Ok(Some(read(stream)?))
    } else {
        Ok(None)
    }
}

fn read_bool(stream: &mut impl io::Read) -> Result<bool> {
    match stream.read_byte()? {
        0 => Ok(false),
        1 => Ok(true),
        byte => Err(Error::Decode(format!("expected a flag, got {byte}"))),
    }
}

impl Serialize for DataType {
    fn write_to(&self, stream: &mut impl io::Write) -> Result<()> {
        Ok(stream.write_byte(self.code())?)
    }

    fn read_from(stream: &mut impl io::Read) -> Result<Self> {
        let code = stream.read_byte()?;
        DataType::from_code(code).ok_or_else(|| Error::Decode(format!("unknown type code {code}")))
    }
}

impl Serialize for Compression {
    fn write_to(&self, stream: &mut impl io::Write) -> Result<()> {
        stream.write_byte(self.enabled as u8)?;
        stream.write_word(self.level)?;

        Ok(())
    }

    fn read_from(stream: &mut impl io::Read) -> Result<Self> {
        let enabled = read_bool(stream)?;
        let level = stream.read_word()?;

        Ok(Self { enabled, level })
    }
}

impl Serialize for Scalar {
    fn write_to(&self, stream: &mut impl io::Write) -> Result<()> {
        self.dtype().write_to(stream)?;
        match self {
            Self::I8(value) => stream.write_word(*value)?,
            Self::U8(value) => stream.write_word(*value)?,
            Self::I16(value) => stream.write_word(*value)?,
            Self::U16(value) => stream.write_word(*value)?,
            Self::I32(value) => stream.write_word(*value)?,
            Self::U32(value) => stream.write_word(*value)?,
            Self::I64(value) => stream.write_word(*value)?,
            Self::U64(value) => stream.write_word(*value)?,
            Self::F32(value) => stream.write_word(*value)?,
            Self::F64(value) => stream.write_word(*value)?,
            Self::Char(value) => stream.write_byte(*value)?,
            Self::Str(value) => stream.write_string(value)?,
        }

        Ok(())
    }

    fn read_from(stream: &mut impl io::Read) -> Result<Self> {
        let scalar = match DataType::read_from(stream)? {
            DataType::I8 => Self::I8(stream.read_word()?),
            DataType::U8 => Self::U8(stream.read_word()?),
            DataType::I16 => Self::I16(stream.read_word()?),
            DataType::U16 => Self::U16(stream.read_word()?),
            DataType::I32 => Self::I32(stream.read_word()?),
            DataType::U32 => Self::U32(stream.read_word()?),
            DataType::I64 => Self::I64(stream.read_word()?),
            DataType::U64 => Self::U64(stream.read_word()?),
            DataType::F32 => Self::F32(stream.read_word()?),
            DataType::F64 => Self::F64(stream.read_word()?),
            DataType::Char => Self::Char(stream.read_byte()?),
            DataType::Str => Self::Str(stream.read_string()?),
        };

        Ok(scalar)
    }
}

impl Serialize for AttrValue {
    fn write_to(&self, stream: &mut impl io::Write) -> Result<()> {
        match self {
            Self::Text(text) => {
                stream.write_byte(TEXT_TAG)?;
                stream.write_string(text)?;
            }
            Self::I8(values) => write_values(stream, DataType::I8, values)?,
            Self::U8(values) => write_values(stream, DataType::U8, values)?,
            Self::I16(values) => write_values(stream, DataType::I16, values)?,
            Self::U16(values) => write_values(stream, DataType::U16, values)?,
            Self::I32(values) => write_values(stream, DataType::I32, values)?,
            Self::U32(values) => write_values(stream, DataType::U32, values)?,
            Self::I64(values) => write_values(stream, DataType::I64, values)?,
            Self::U64(values) => write_values(stream, DataType::U64, values)?,
            Self::F32(values) => write_values(stream, DataType::F32, values)?,
            Self::F64(values) => write_values(stream, DataType::F64, values)?,
        }

        Ok(())
    }

    fn read_from(stream: &mut impl io::Read) -> Result<Self> {
        let tag = stream.read_byte()?;
        if tag == TEXT_TAG {
            return Ok(Self::Text(stream.read_string()?));
        }

        let value = match DataType::from_code(tag) {
            Some(DataType::I8) => Self::I8(stream.read_words()?),
            Some(DataType::U8) => Self::U8(stream.read_words()?),
            Some(DataType::I16) => Self::I16(stream.read_words()?),
            Some(DataType::U16) => Self::U16(stream.read_words()?),
            Some(DataType::I32) => Self::I32(stream.read_words()?),
            Some(DataType::U32) => Self::U32(stream.read_words()?),
            Some(DataType::I64) => Self::I64(stream.read_words()?),
            Some(DataType::U64) => Self::U64(stream.read_words()?),
            Some(DataType::F32) => Self::F32(stream.read_words()?),
            Some(DataType::F64) => Self::F64(stream.read_words()?),
            _ => return Err(Error::Decode(format!("unknown attribute tag {tag}"))),
        };

        Ok(value)
    }
}

fn write_values<W: Word>(stream: &mut impl io::Write, dtype: DataType, values: &[W]) -> Result<()> {
    dtype.write_to(stream)?;
    stream.write_words(values)?;

    Ok(())
}

impl Serialize for Attributes {
    fn write_to(&self, stream: &mut impl io::Write) -> Result<()> {
        stream.write_len(self.len())?;
        for (name, value) in self {
            stream.write_string(name)?;
            value.write_to(stream)?;
        }

        Ok(())
    }

    fn read_from(stream: &mut impl io::Read) -> Result<Self> {
        let len = stream.read_len()?;
        let mut attributes = Attributes::new();
        for _ in 0..len {
            let name = stream.read_string()?;
            let value = AttrValue::read_from(stream)?;
            attributes.insert(name, value);
        }

        Ok(attributes)
    }
}

impl Serialize for ArrayData {
    fn write_to(&self, stream: &mut impl io::Write) -> Result<()> {
        match self.dtype() {
            Some(dtype) => dtype.write_to(stream)?,
            None => return Ok(stream.write_byte(MASKED_TAG)?),
        }
        let shape = self.shape();
        stream.write_len(shape.len())?;
        for &n in &shape {
            stream.write_len(n)?;
        }

        match self {
            Self::I8(array) => write_elements(stream, array)?,
            Self::U8(array) => write_elements(stream, array)?,
            Self::I16(array) => write_elements(stream, array)?,
            Self::U16(array) => write_elements(stream, array)?,
            Self::I32(array) => write_elements(stream, array)?,
            Self::U32(array) => write_elements(stream, array)?,
            Self::I64(array) => write_elements(stream, array)?,
            Self::U64(array) => write_elements(stream, array)?,
            Self::F32(array) => write_elements(stream, array)?,
            Self::F64(array) => write_elements(stream, array)?,
            Self::Char(array) => write_elements(stream, array)?,
            Self::Str(array) => {
                for string in array.iter() {
                    stream.write_string(string)?;
                }
            }
            Self::Masked => {}
        }

        Ok(())
    }

    fn read_from(stream: &mut impl io::Read) -> Result<Self> {
        let tag = stream.read_byte()?;
        if tag == MASKED_TAG {
            return Ok(Self::Masked);
        }
        let dtype = DataType::from_code(tag)
            .ok_or_else(|| Error::Decode(format!("unknown type code {tag}")))?;

        let ndim = stream.read_len()?;
        let mut shape = vec![];
        for _ in 0..ndim {
            shape.push(stream.read_len()?);
        }
        let count = shape
            .iter()
            .try_fold(1_usize, |count, &n| count.checked_mul(n))
            .ok_or_else(|| Error::Decode(format!("shape {shape:?} is too large")))?;

        let data = match dtype {
            DataType::I8 => Self::I8(read_elements(stream, &shape, count)?),
            DataType::U8 => Self::U8(read_elements(stream, &shape, count)?),
            DataType::I16 => Self::I16(read_elements(stream, &shape, count)?),
            DataType::U16 => Self::U16(read_elements(stream, &shape, count)?),
            DataType::I32 => Self::I32(read_elements(stream, &shape, count)?),
            DataType::U32 => Self::U32(read_elements(stream, &shape, count)?),
            DataType::I64 => Self::I64(read_elements(stream, &shape, count)?),
            DataType::U64 => Self::U64(read_elements(stream, &shape, count)?),
            DataType::F32 => Self::F32(read_elements(stream, &shape, count)?),
            DataType::F64 => Self::F64(read_elements(stream, &shape, count)?),
            DataType::Char => Self::Char(read_elements(stream, &shape, count)?),
            DataType::Str => {
                let mut strings = vec![];
                for _ in 0..count {
                    strings.push(stream.read_string()?);
                }
                Self::Str(into_array(&shape, strings)?)
            }
        };

        Ok(data)
    }
}

fn write_elements<W: Word>(stream: &mut impl io::Write, array: &ArrayD<W>) -> Result<()> {
    for &element in array.iter() {
        stream.write_word(element)?;
    }

    Ok(())
}

fn read_elements<W: Word>(
    stream: &mut impl io::Read,
    shape: &[usize],
    count: usize,
) -> Result<ArrayD<W>> {
    let mut elements = vec![];
    for _ in 0..count {
        elements.push(stream.read_word()?);
    }

    into_array(shape, elements)
}

fn into_array<T>(shape: &[usize], elements: Vec<T>) -> Result<ArrayD<T>> {
    ArrayD::from_shape_vec(IxDyn(shape), elements).map_err(|err| Error::Decode(err.to_string()))
}
