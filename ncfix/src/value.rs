use std::fmt;

use num_traits::NumCast;

use crate::{datatype::DataType, ordered::OrderedMap};

/// Name of the reserved attribute that holds a variable's fill value
pub const FILL_VALUE_ATTR: &str = "_FillValue";

/// Ordered attribute mapping of a variable or of a whole file
pub type Attributes = OrderedMap<AttrValue>;

/// A single typed value, e.g. a fill value
///
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(u8),
    Str(String),
}

/// The value of an attribute: text or a vector of numbers
///
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Text(String),
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! numeric_values {
    ($($variant:ident: $type:ty),*) => {
        impl Scalar {
            pub fn dtype(&self) -> DataType {
                match self {
                    $(Self::$variant(_) => DataType::$variant,)*
                    Self::Char(_) => DataType::Char,
                    Self::Str(_) => DataType::Str,
                }
            }

            /// Numeric value converted to `T`, if it is representable
            ///
            pub fn to_primitive<T: NumCast>(&self) -> Option<T> {
                match self {
                    $(Self::$variant(value) => <T as NumCast>::from(*value),)*
                    Self::Char(value) => <T as NumCast>::from(*value),
                    Self::Str(_) => None,
                }
            }

            /// Convert the first element of an attribute value into a scalar of `dtype`.
            ///
            /// This is how the reserved fill value attribute is turned into a fill value.
            ///
            pub fn from_attribute(value: &AttrValue, dtype: DataType) -> Option<Self> {
                let first = match value {
                    AttrValue::Text(text) => {
                        return match dtype {
                            DataType::Str => Some(Self::Str(text.clone())),
                            DataType::Char => text.bytes().next().map(Self::Char),
                            _ => None,
                        };
                    }
                    $(AttrValue::$variant(values) => Self::$variant(*values.first()?),)*
                };

                first.cast(dtype)
            }

            /// Convert to another numeric type, if the value is representable
            ///
            pub fn cast(&self, dtype: DataType) -> Option<Self> {
                if self.dtype() == dtype {
                    return Some(self.clone());
                }
                match dtype {
                    $(DataType::$variant => self.to_primitive::<$type>().map(Self::$variant),)*
                    DataType::Char => self.to_primitive::<u8>().map(Self::Char),
                    DataType::Str => None,
                }
            }
        }

        $(
            impl From<$type> for Scalar {
                fn from(value: $type) -> Self {
                    Self::$variant(value)
                }
            }

            impl From<$type> for AttrValue {
                fn from(value: $type) -> Self {
                    Self::$variant(vec![value])
                }
            }

            impl From<Vec<$type>> for AttrValue {
                fn from(values: Vec<$type>) -> Self {
                    Self::$variant(values)
                }
            }

            impl From<&[$type]> for AttrValue {
                fn from(values: &[$type]) -> Self {
                    Self::$variant(values.to_vec())
                }
            }
        )*

        impl From<Scalar> for AttrValue {
            fn from(value: Scalar) -> Self {
                match value {
                    $(Scalar::$variant(value) => Self::$variant(vec![value]),)*
                    Scalar::Char(value) => Self::Text(char::from(value).to_string()),
                    Scalar::Str(value) => Self::Text(value),
                }
            }
        }

        impl fmt::Display for AttrValue {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Self::Text(text) => f.write_str(text),
                    $(Self::$variant(values) => write_values(f, values),)*
                }
            }
        }
    };
}

numeric_values!(
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

impl AttrValue {
    /// Number of elements; text counts as one
    pub fn len(&self) -> usize {
        match self {
            Self::Text(_) => 1,
            Self::I8(values) => values.len(),
            Self::U8(values) => values.len(),
            Self::I16(values) => values.len(),
            Self::U16(values) => values.len(),
            Self::I32(values) => values.len(),
            Self::U32(values) => values.len(),
            Self::I64(values) => values.len(),
            Self::U64(values) => values.len(),
            Self::F32(values) => values.len(),
            Self::F64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for AttrValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Scalar {
    fn from(text: &str) -> Self {
        Self::Str(text.to_string())
    }
}

impl From<String> for Scalar {
    fn from(text: String) -> Self {
        Self::Str(text)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(value) => write!(f, "{value}"),
            Self::U8(value) => write!(f, "{value}"),
            Self::I16(value) => write!(f, "{value}"),
            Self::U16(value) => write!(f, "{value}"),
            Self::I32(value) => write!(f, "{value}"),
            Self::U32(value) => write!(f, "{value}"),
            Self::I64(value) => write!(f, "{value}"),
            Self::U64(value) => write!(f, "{value}"),
            Self::F32(value) => write!(f, "{value}"),
            Self::F64(value) => write!(f, "{value}"),
            Self::Char(value) => write!(f, "{}", char::from(*value)),
            Self::Str(value) => f.write_str(value),
        }
    }
}

fn write_values<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    if let [value] = values {
        return write!(f, "{value}");
    }

    f.write_str("[")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{value}")?;
    }
    f.write_str("]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(AttrValue::from("degC").to_string(), "degC");
        assert_eq!(AttrValue::from(1.5_f32).to_string(), "1.5");
        assert_eq!(AttrValue::from(vec![1_i16, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(Scalar::from(-1_i16).to_string(), "-1");
    }

    #[test]
    fn fill_value_from_attribute() {
        let attr = AttrValue::from(-999.0_f64);
        assert_eq!(
            Scalar::from_attribute(&attr, DataType::F32),
            Some(Scalar::F32(-999.0))
        );

        let attr = AttrValue::from(-1_i32);
        assert_eq!(
            Scalar::from_attribute(&attr, DataType::I16),
            Some(Scalar::I16(-1))
        );

        // Not representable as an unsigned byte
        assert_eq!(Scalar::from_attribute(&attr, DataType::U8), None);

        let attr = AttrValue::from("");
        assert_eq!(
            Scalar::from_attribute(&attr, DataType::Str),
            Some(Scalar::Str(String::new()))
        );
        assert_eq!(Scalar::from_attribute(&attr, DataType::Char), None);
    }

    #[test]
    fn scalar_into_attribute() {
        assert_eq!(AttrValue::from(Scalar::I16(-1)), AttrValue::I16(vec![-1]));
        assert_eq!(
            AttrValue::from(Scalar::Str(String::from("n/a"))),
            AttrValue::Text(String::from("n/a"))
        );
    }
}
