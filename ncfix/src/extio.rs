//! Extend Read and Write with some convenience methods for binary i/o
//!
use std::{
    io::{self, Read},
    mem::size_of,
};

use crate::errors::{Error, Result};

pub(crate) trait Serialize: Sized {
    /// Write self to a stream
    fn write_to(&self, stream: &mut impl io::Write) -> Result<()>;

    /// Read Self from a stream
    fn read_from(stream: &mut impl io::Read) -> Result<Self>;
}

/// A number with a fixed size, Big Endian encoding
pub(crate) trait Word: Sized + Copy {
    fn read_be(stream: &mut impl io::Read) -> io::Result<Self>;

    fn write_be(self, stream: &mut impl io::Write) -> io::Result<()>;
}

macro_rules! words {
    ($($type:ty),*) => {
        $(
            impl Word for $type {
                fn read_be(stream: &mut impl io::Read) -> io::Result<Self> {
                    let mut buffer = [0; size_of::<$type>()];
                    stream.read_exact(&mut buffer)?;

                    Ok(<$type>::from_be_bytes(buffer))
                }

                fn write_be(self, stream: &mut impl io::Write) -> io::Result<()> {
                    stream.write_all(&self.to_be_bytes())
                }
            }
        )*
    };
}

words!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

pub(crate) trait ExtendedRead: io::Read {
    /// Read a byte from a stream
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Read a Big Endian encoded number from a stream
    fn read_word<W: Word>(&mut self) -> io::Result<W>;

    /// Read a length or count, stored as a 64 bit unsigned integer
    fn read_len(&mut self) -> Result<usize>;

    /// Read a length prefixed vector of numbers
    fn read_words<W: Word>(&mut self) -> Result<Vec<W>>;

    /// Read a length prefixed UTF-8 string
    fn read_string(&mut self) -> Result<String>;
}

impl<R: io::Read> ExtendedRead for R {
    fn read_byte(&mut self) -> io::Result<u8> {
        u8::read_be(self)
    }

    fn read_word<W: Word>(&mut self) -> io::Result<W> {
        W::read_be(self)
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = u64::read_be(self)?;
        usize::try_from(len).map_err(|_| Error::Decode(format!("length {len} is too large")))
    }

    fn read_words<W: Word>(&mut self) -> Result<Vec<W>> {
        let len = self.read_len()?;
        let mut words = vec![];
        for _ in 0..len {
            words.push(W::read_be(self)?);
        }

        Ok(words)
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let mut bytes = vec![];
        self.by_ref().take(len as u64).read_to_end(&mut bytes)?;
        if bytes.len() != len {
            return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
        }

        String::from_utf8(bytes).map_err(|err| Error::Decode(err.to_string()))
    }
}

pub(crate) trait ExtendedWrite: io::Write {
    /// Write a byte to a stream
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Write a Big Endian encoded number to a stream
    fn write_word<W: Word>(&mut self, word: W) -> io::Result<()>;

    /// Write a length or count as a 64 bit unsigned integer
    fn write_len(&mut self, len: usize) -> io::Result<()>;

    /// Write a length prefixed vector of numbers
    fn write_words<W: Word>(&mut self, words: &[W]) -> io::Result<()>;

    /// Write a length prefixed UTF-8 string
    fn write_string(&mut self, string: &str) -> io::Result<()>;
}

impl<W: io::Write> ExtendedWrite for W {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        byte.write_be(self)
    }

    fn write_word<V: Word>(&mut self, word: V) -> io::Result<()> {
        word.write_be(self)
    }

    fn write_len(&mut self, len: usize) -> io::Result<()> {
        (len as u64).write_be(self)
    }

    fn write_words<V: Word>(&mut self, words: &[V]) -> io::Result<()> {
        self.write_len(words.len())?;
        for word in words {
            word.write_be(self)?;
        }

        Ok(())
    }

    fn write_string(&mut self, string: &str) -> io::Result<()> {
        self.write_len(string.len())?;
        self.write_all(string.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_all_of_it() -> Result<()> {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.write_byte(42)?;
        buffer.write_word(41968_u16)?;
        buffer.write_word(-31441968_i32)?;
        buffer.write_word(1.5_f32)?;
        buffer.write_word(-6.25_f64)?;
        buffer.write_words(&[1_i64, -2, 3])?;
        buffer.write_string("zażółć")?;

        let mut buffer = Cursor::new(buffer);
        assert_eq!(buffer.read_byte()?, 42);
        assert_eq!(buffer.read_word::<u16>()?, 41968);
        assert_eq!(buffer.read_word::<i32>()?, -31441968);
        assert_eq!(buffer.read_word::<f32>()?, 1.5);
        assert_eq!(buffer.read_word::<f64>()?, -6.25);
        assert_eq!(buffer.read_words::<i64>()?, vec![1, -2, 3]);
        assert_eq!(buffer.read_string()?, "zażółć");

        Ok(())
    }

    #[test]
    fn test_big_endian() -> io::Result<()> {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.write_word(0xBEEF_u16)?;
        buffer.write_len(2)?;
        assert_eq!(buffer, vec![0xBE, 0xEF, 0, 0, 0, 0, 0, 0, 0, 2]);

        Ok(())
    }

    #[test]
    fn test_truncated_string() {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.write_len(10).unwrap();
        buffer.extend_from_slice(b"abc");

        let mut buffer = Cursor::new(buffer);
        assert!(matches!(buffer.read_string(), Err(Error::Io(_))));
    }

    #[test]
    fn test_bad_utf8() {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.write_len(2).unwrap();
        buffer.extend_from_slice(&[0xC3, 0x28]);

        let mut buffer = Cursor::new(buffer);
        assert!(matches!(buffer.read_string(), Err(Error::Decode(_))));
    }
}
