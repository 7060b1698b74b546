//! A sequential little-endian cursor over in-memory data.

use std::error::Error as StdError;
use std::fmt::Debug;

use bytes::BufMut;

use crate::errors::{BlockContext, InvalidDataError, MessageError};

/// Types with a fixed little-endian encoding that can be read from a
/// [`MemReader`].
pub trait FromFixedBytes: Sized {
    /// The size of the encoded value, in bytes.
    const SIZE: usize;

    /// Parses a value from exactly [`Self::SIZE`] bytes.
    fn parse<B: bytes::Buf>(bytes: B) -> Self;
}

macro_rules! impl_fixed_bytes_for_num {
    ($($num:ty),*) => {
        $(
            impl FromFixedBytes for $num {
                const SIZE: usize = std::mem::size_of::<$num>();

                fn parse<B: bytes::Buf>(bytes: B) -> Self {
                    let mut byte_array = [0u8; <Self as FromFixedBytes>::SIZE];
                    (&mut byte_array[..]).put(bytes);
                    Self::from_le_bytes(byte_array)
                }
            }
        )*
    };
}

impl_fixed_bytes_for_num!(i8, i16, i32, i64);
impl_fixed_bytes_for_num!(u8, u16, u32, u64);

#[derive(Debug, thiserror::Error)]
#[error("Not enough data in buffer. Needed {required}, but only {available} available.")]
struct NotEnoughData {
    required: usize,
    available: usize,
}

/// An error produced while reading from a [`MemReader`].
#[derive(Debug, thiserror::Error)]
pub enum MemReaderError {
    /// The reader ran out of data before the read could complete.
    #[error(transparent)]
    UnexpectedEnd(InvalidDataError),
    /// The data was present, but its contents were not valid.
    #[error(transparent)]
    InvalidData(#[from] InvalidDataError),
}

impl MemReaderError {
    /// The absolute byte offset in the input where the error was detected.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            MemReaderError::UnexpectedEnd(err) | MemReaderError::InvalidData(err) => {
                err.position()
            }
        }
    }

    /// Returns true if the error was caused by running out of input.
    #[must_use]
    pub fn is_unexpected_end(&self) -> bool {
        matches!(self, MemReaderError::UnexpectedEnd(_))
    }
}

macro_rules! impl_read_int {
    ($name:ident, $ty:ty) => {
        /// Reads a little-endian value of the given type.
        fn $name(&mut self) -> Result<$ty> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            self.read_exact(&mut buf)?;
            Ok(<$ty>::from_le_bytes(buf))
        }
    };
}

/// The result type for [`MemReader`] operations.
pub type Result<T> = std::result::Result<T, MemReaderError>;

/// A bounds-checked cursor over a region of in-memory data.
pub trait MemReader {
    /// The current position, relative to the start of this reader.
    #[must_use]
    fn tell(&self) -> usize;

    /// The current position, as an absolute offset into the root input.
    #[must_use]
    fn offset(&self) -> usize;

    /// The total number of bytes visible to this reader.
    #[must_use]
    fn data_size(&self) -> usize;

    /// The number of bytes left to read.
    #[must_use]
    fn remaining(&self) -> usize;

    /// Moves the cursor to `offset`, relative to the start of this reader.
    fn seek_to(&mut self, offset: usize) -> Result<()>;

    /// Fills `buf` completely, or fails without consuming anything.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Consumes `len` bytes and returns a reader over exactly those bytes.
    ///
    /// The `context` is used to describe the region in error messages.
    fn read_to_subreader(&mut self, context: &str, len: usize) -> Result<impl MemReader + '_>;

    /// Create an `InvalidDataError` at the current position and context.
    fn create_invalid_data_error<Err>(&self, message: Err) -> InvalidDataError
    where
        Err: StdError + Send + Sync + 'static;

    /// Create an `InvalidDataError` at the current position from a message.
    fn create_invalid_data_error_msg<Msg>(&self, message: Msg) -> InvalidDataError
    where
        Msg: Into<String>,
    {
        self.create_invalid_data_error(MessageError::new(message))
    }

    /// Returns true if every byte has been consumed.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails with an end-of-data error unless at least `len` bytes remain.
    fn ensure_remaining(&self, len: usize) -> Result<()> {
        let available = self.remaining();
        if available < len {
            return Err(MemReaderError::UnexpectedEnd(self.create_invalid_data_error(
                NotEnoughData {
                    required: len,
                    available,
                },
            )));
        }
        Ok(())
    }

    /// Reads `len` bytes into a new vector.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure_remaining(len)?;
        let mut buf = vec![0; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads a fixed-size byte array.
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Skips `len` bytes, failing if fewer remain.
    fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure_remaining(len)?;
        self.seek_to(self.tell() + len)
    }

    /// Reads every remaining byte.
    fn read_remaining(&mut self) -> Result<Vec<u8>> {
        self.read_bytes(self.remaining())
    }

    /// Reads a value from the front of the buffer.
    fn read_value<T: FromFixedBytes>(&mut self, context: &str) -> Result<T> {
        let mut const_buf = [0u8; 16];
        let mut dyn_buf = Vec::new();

        let buf = if T::SIZE <= const_buf.len() {
            &mut const_buf[..T::SIZE]
        } else {
            dyn_buf.resize(T::SIZE, 0);
            &mut dyn_buf[..]
        };
        let mut subreader = self.read_to_subreader(context, T::SIZE)?;
        subreader.read_exact(&mut buf[..])?;
        Ok(T::parse(&buf[..]))
    }

    /// Reads a string stored as a little-endian `u16` byte length followed by
    /// that many bytes of UTF-8.
    fn read_length_prefixed_string(&mut self, context: &str) -> Result<String> {
        let byte_count = self.read_u16_le()?;
        let mut string_reader =
            self.read_to_subreader(&format!("{context}(string)"), usize::from(byte_count))?;
        let bytes = string_reader.read_remaining()?;
        String::from_utf8(bytes).map_err(|err| {
            MemReaderError::InvalidData(string_reader.create_invalid_data_error(err))
        })
    }

    impl_read_int!(read_u8, u8);
    impl_read_int!(read_u16_le, u16);
    impl_read_int!(read_i16_le, i16);
    impl_read_int!(read_u32_le, u32);
}

impl<M> MemReader for &mut M
where
    M: MemReader,
{
    fn tell(&self) -> usize {
        (**self).tell()
    }

    fn offset(&self) -> usize {
        (**self).offset()
    }

    fn data_size(&self) -> usize {
        (**self).data_size()
    }

    fn remaining(&self) -> usize {
        (**self).remaining()
    }

    fn seek_to(&mut self, offset: usize) -> Result<()> {
        (**self).seek_to(offset)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact(buf)
    }

    fn read_to_subreader(&mut self, context: &str, len: usize) -> Result<impl MemReader + '_> {
        (**self).read_to_subreader(context, len)
    }

    fn create_invalid_data_error<Err>(&self, message: Err) -> InvalidDataError
    where
        Err: StdError + Send + Sync + 'static,
    {
        (**self).create_invalid_data_error(message)
    }
}

/// A [`MemReader`] over a borrowed byte slice.
#[derive(Clone)]
pub struct SliceMemReader<'a> {
    data: &'a [u8],
    /// Absolute offset of `data[0]` in the root input.
    base: usize,
    position: usize,
    context: BlockContext,
}

impl Debug for SliceMemReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemReader")
            .field("base", &self.base)
            .field("size", &self.data.len())
            .field("position", &self.position)
            .finish()
    }
}

impl<'a> SliceMemReader<'a> {
    /// Creates a reader over the whole of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            base: 0,
            position: 0,
            context: BlockContext::new_root(data.len()),
        }
    }

    /// The bytes that have not been consumed yet.
    #[must_use]
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Consumes `len` bytes and returns a reader over them that does not
    /// borrow from `self`.
    pub fn split_off(&mut self, context: &str, len: usize) -> Result<SliceMemReader<'a>> {
        self.ensure_remaining(len)?;
        let start = self.position;
        self.position += len;
        Ok(self.make_sub_reader(start, start + len, context))
    }

    fn make_sub_reader(&self, start: usize, end: usize, context: &str) -> SliceMemReader<'a> {
        let abs_start = self.base + start;
        let abs_end = self.base + end;
        SliceMemReader {
            data: &self.data[start..end],
            base: abs_start,
            position: 0,
            context: self.context.nested(abs_start, abs_end, context),
        }
    }
}

impl MemReader for SliceMemReader<'_> {
    fn tell(&self) -> usize {
        self.position
    }

    fn offset(&self) -> usize {
        self.base + self.position
    }

    fn data_size(&self) -> usize {
        self.data.len()
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn seek_to(&mut self, offset: usize) -> Result<()> {
        if self.data_size() < offset {
            return Err(MemReaderError::UnexpectedEnd(self.context.create_error(
                self.offset(),
                NotEnoughData {
                    required: offset,
                    available: self.data_size(),
                },
            )));
        }
        self.position = offset;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ensure_remaining(buf.len())?;
        let end = self.position + buf.len();
        buf.copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        Ok(())
    }

    fn read_to_subreader(&mut self, context: &str, len: usize) -> Result<impl MemReader + '_> {
        self.split_off(context, len)
    }

    fn create_invalid_data_error<Err>(&self, message: Err) -> InvalidDataError
    where
        Err: StdError + Send + Sync + 'static,
    {
        self.context.create_error(self.offset(), message)
    }
}
