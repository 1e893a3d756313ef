use std::ops::Range;

use ndarray::{concatenate, Array, ArrayD, Axis, Dimension, IxDyn, Slice};
use num_traits::{NumCast, ToPrimitive, Zero};
use paste::paste;

use crate::{datatype::DataType, value::Scalar};

/// Typed n-dimensional variable data
///
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    I8(ArrayD<i8>),
    U8(ArrayD<u8>),
    I16(ArrayD<i16>),
    U16(ArrayD<u16>),
    I32(ArrayD<i32>),
    U32(ArrayD<u32>),
    I64(ArrayD<i64>),
    U64(ArrayD<u64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    Char(ArrayD<u8>),
    Str(ArrayD<String>),

    /// Placeholder some sources report, instead of values, for zero length string variables
    Masked,
}

/// Apply an expression to whichever array is inside, or evaluate `$masked` for `Masked`
macro_rules! each_array {
    ($data:expr, $array:ident => $body:expr, $masked:expr) => {
        match $data {
            ArrayData::I8($array) => $body,
            ArrayData::U8($array) => $body,
            ArrayData::I16($array) => $body,
            ArrayData::U16($array) => $body,
            ArrayData::I32($array) => $body,
            ArrayData::U32($array) => $body,
            ArrayData::I64($array) => $body,
            ArrayData::U64($array) => $body,
            ArrayData::F32($array) => $body,
            ArrayData::F64($array) => $body,
            ArrayData::Char($array) => $body,
            ArrayData::Str($array) => $body,
            ArrayData::Masked => $masked,
        }
    };
}

/// Transform the array inside, keeping the variant
macro_rules! map_array {
    ($data:expr, $array:ident => $body:expr) => {
        match $data {
            ArrayData::I8($array) => ArrayData::I8($body),
            ArrayData::U8($array) => ArrayData::U8($body),
            ArrayData::I16($array) => ArrayData::I16($body),
            ArrayData::U16($array) => ArrayData::U16($body),
            ArrayData::I32($array) => ArrayData::I32($body),
            ArrayData::U32($array) => ArrayData::U32($body),
            ArrayData::I64($array) => ArrayData::I64($body),
            ArrayData::U64($array) => ArrayData::U64($body),
            ArrayData::F32($array) => ArrayData::F32($body),
            ArrayData::F64($array) => ArrayData::F64($body),
            ArrayData::Char($array) => ArrayData::Char($body),
            ArrayData::Str($array) => ArrayData::Str($body),
            ArrayData::Masked => ArrayData::Masked,
        }
    };
}

macro_rules! numeric_arrays {
    ($($variant:ident: $type:ident),*) => {
        paste! {
            impl ArrayData {
                $(
                    pub fn [<as_ $type>](&self) -> Option<&ArrayD<$type>> {
                        match self {
                            Self::$variant(array) => Some(array),
                            _ => None,
                        }
                    }
                )*

                /// An array of `dtype` with every element set to `fill`, or zero (empty strings) if
                /// there is no usable fill value.
                ///
                pub fn filled(dtype: DataType, shape: &[usize], fill: Option<&Scalar>) -> Self {
                    let shape = IxDyn(shape);
                    match dtype {
                        $(DataType::$variant => {
                            Self::$variant(ArrayD::from_elem(shape, fill_or_zero::<$type>(fill)))
                        })*
                        DataType::Char => Self::Char(ArrayD::from_elem(shape, fill_or_zero(fill))),
                        DataType::Str => Self::Str(ArrayD::from_elem(shape, text_fill(fill))),
                    }
                }

                /// Convert to another element type.
                ///
                /// Returns `None` if any element isn't representable in the new type, or if the
                /// conversion is between text and numbers.
                ///
                pub fn cast(&self, dtype: DataType) -> Option<Self> {
                    if self.dtype() == Some(dtype) {
                        return Some(self.clone());
                    }
                    match self {
                        $(Self::$variant(array) => cast_numeric(array, dtype),)*
                        Self::Char(array) if dtype == DataType::U8 => Some(Self::U8(array.clone())),
                        Self::Char(_) | Self::Str(_) | Self::Masked => None,
                    }
                }

                /// Copy `source` into this array along `axis`, starting at `offset`, growing the
                /// array along that axis (padding with `pad`) if needed.
                ///
                pub(crate) fn splice(
                    &mut self,
                    axis: usize,
                    offset: usize,
                    source: &Self,
                    pad: Option<&Scalar>,
                ) -> Result<(), String> {
                    match (self, source) {
                        $((Self::$variant(dest), Self::$variant(src)) => {
                            splice_array(dest, axis, offset, src, fill_or_zero::<$type>(pad))
                        })*
                        (Self::Char(dest), Self::Char(src)) => {
                            splice_array(dest, axis, offset, src, fill_or_zero(pad))
                        }
                        (Self::Str(dest), Self::Str(src)) => {
                            splice_array(dest, axis, offset, src, text_fill(pad))
                        }
                        (dest, src) => Err(format!(
                            "cannot copy {} data into {} data",
                            type_name(src.dtype()),
                            type_name(dest.dtype()),
                        )),
                    }
                }
            }

            fn cast_numeric<S>(array: &ArrayD<S>, dtype: DataType) -> Option<ArrayData>
            where
                S: ToPrimitive + Copy,
            {
                match dtype {
                    $(DataType::$variant => {
                        cast_elements::<S, $type>(array).map(ArrayData::$variant)
                    })*
                    DataType::Char => cast_elements::<S, u8>(array).map(ArrayData::Char),
                    DataType::Str => None,
                }
            }

            $(
                impl<D: Dimension> From<Array<$type, D>> for ArrayData {
                    fn from(array: Array<$type, D>) -> Self {
                        Self::$variant(array.into_dyn())
                    }
                }
            )*
        }
    };
}

numeric_arrays!(
    I8: i8,
    U8: u8,
    I16: i16,
    U16: u16,
    I32: i32,
    U32: u32,
    I64: i64,
    U64: u64,
    F32: f32,
    F64: f64
);

impl<D: Dimension> From<Array<String, D>> for ArrayData {
    fn from(array: Array<String, D>) -> Self {
        Self::Str(array.into_dyn())
    }
}

impl ArrayData {
    /// Character data from an array of bytes
    pub fn chars<D: Dimension>(array: Array<u8, D>) -> Self {
        Self::Char(array.into_dyn())
    }

    /// A zero length, one dimensional array of `dtype`
    pub fn empty(dtype: DataType) -> Self {
        Self::filled(dtype, &[0], None)
    }

    /// The element type, or `None` for the masked placeholder
    pub fn dtype(&self) -> Option<DataType> {
        let dtype = match self {
            Self::I8(_) => DataType::I8,
            Self::U8(_) => DataType::U8,
            Self::I16(_) => DataType::I16,
            Self::U16(_) => DataType::U16,
            Self::I32(_) => DataType::I32,
            Self::U32(_) => DataType::U32,
            Self::I64(_) => DataType::I64,
            Self::U64(_) => DataType::U64,
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::Char(_) => DataType::Char,
            Self::Str(_) => DataType::Str,
            Self::Masked => return None,
        };

        Some(dtype)
    }

    pub fn is_masked(&self) -> bool {
        matches!(self, Self::Masked)
    }

    pub fn shape(&self) -> Vec<usize> {
        each_array!(self, array => array.shape().to_vec(), vec![])
    }

    pub fn ndim(&self) -> usize {
        each_array!(self, array => array.ndim(), 0)
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        each_array!(self, array => array.len(), 0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Extent along `axis`, zero if there is no such axis
    pub fn len_of(&self, axis: usize) -> usize {
        self.shape().get(axis).copied().unwrap_or(0)
    }

    pub fn as_chars(&self) -> Option<&ArrayD<u8>> {
        match self {
            Self::Char(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&ArrayD<String>> {
        match self {
            Self::Str(array) => Some(array),
            _ => None,
        }
    }

    /// Take the elements in `range` along `axis`.
    ///
    /// The range is clamped to the extent of the axis, so asking for more than there is yields
    /// what there is. Returns `None` if the array has no such axis. The masked placeholder slices
    /// to itself.
    ///
    pub fn slice_axis(&self, axis: usize, range: Range<usize>) -> Option<Self> {
        if self.is_masked() {
            return Some(Self::Masked);
        }
        if axis >= self.ndim() {
            return None;
        }

        let extent = self.len_of(axis);
        let start = range.start.min(extent);
        let end = range.end.min(extent).max(start);
        let slice = Slice::from(start..end);

        Some(map_array!(self, array => array.slice_axis(Axis(axis), slice).to_owned()))
    }
}

fn type_name(dtype: Option<DataType>) -> &'static str {
    dtype.map(|dtype| dtype.name()).unwrap_or("masked")
}

fn fill_or_zero<T: NumCast + Zero>(fill: Option<&Scalar>) -> T {
    fill.and_then(|fill| fill.to_primitive::<T>())
        .unwrap_or_else(T::zero)
}

fn text_fill(fill: Option<&Scalar>) -> String {
    match fill {
        Some(Scalar::Str(text)) => text.clone(),
        Some(Scalar::Char(byte)) => char::from(*byte).to_string(),
        _ => String::new(),
    }
}

fn cast_elements<S, T>(array: &ArrayD<S>) -> Option<ArrayD<T>>
where
    S: ToPrimitive + Copy,
    T: NumCast,
{
    let values = array
        .iter()
        .map(|&n| <T as NumCast>::from(n))
        .collect::<Option<Vec<T>>>()?;

    ArrayD::from_shape_vec(array.raw_dim(), values).ok()
}

fn splice_array<T: Clone>(
    dest: &mut ArrayD<T>,
    axis: usize,
    offset: usize,
    source: &ArrayD<T>,
    pad: T,
) -> Result<(), String> {
    if axis >= dest.ndim() || source.ndim() != dest.ndim() {
        return Err(format!(
            "cannot copy {:?} data along axis {axis} of {:?} data",
            source.shape(),
            dest.shape()
        ));
    }
    for (i, (&have, &want)) in dest.shape().iter().zip(source.shape()).enumerate() {
        if i != axis && have != want {
            return Err(format!(
                "shape mismatch along axis {i}: expected {have}, got {want}"
            ));
        }
    }

    let end = offset + source.len_of(Axis(axis));
    let current = dest.len_of(Axis(axis));
    if end > current {
        let mut pad_shape = dest.shape().to_vec();
        pad_shape[axis] = end - current;
        let padding = ArrayD::from_elem(IxDyn(&pad_shape), pad);
        let grown = concatenate(Axis(axis), &[dest.view(), padding.view()])
            .map_err(|err| err.to_string())?;
        *dest = grown;
    }

    dest.slice_axis_mut(Axis(axis), Slice::from(offset..end))
        .assign(source);

    Ok(())
}
