//! The byte-stream layer (component A).
//!
//! Grounded on `game_data`'s `Encode`/`Decode` trait split, adapted from a
//! `bytes::Buf`/`BufMut`-based design to one built directly on
//! `std::io::{Read, Write, Seek}`: the patch-in-place algorithm in `world::patch`
//! needs `seek`/`tell`/`size` on both read and write streams, which `bytes` does not
//! model. See `DESIGN.md` for the full rationale.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::StreamError;

/// A named, seekable byte stream. Implemented for files and in-memory buffers.
pub trait Stream: Read + Write + Seek {
    /// A name used only for diagnostics (file path, or `"<mem>"`).
    fn name(&self) -> &str;

    fn tell(&mut self) -> Result<u64, StreamError> {
        Ok(self.stream_position()?)
    }

    fn size(&mut self) -> Result<u64, StreamError> {
        let pos = self.tell()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }

    fn seek_to(&mut self, offset: u64) -> Result<u64, StreamError> {
        Ok(self.seek(SeekFrom::Start(offset))?)
    }
}

/// A disk-backed stream. Buffers writes the way the original engine's file stream
/// does, flushing on seek and on drop, rather than relying solely on the OS page
/// cache.
pub struct FileStream {
    file: io::BufWriter<File>,
    name: String,
}

impl FileStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self {
            name: path.display().to_string(),
            file: io::BufWriter::new(file),
        })
    }

    pub fn create(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Ok(Self {
            name: path.display().to_string(),
            file: io::BufWriter::new(file),
        })
    }

    pub fn open_read_write(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let file = File::options().read(true).write(true).open(path)?;
        Ok(Self {
            name: path.display().to_string(),
            file: io::BufWriter::new(file),
        })
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.get_mut().read(buf)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        // The original file stream flushes any pending write before repositioning so
        // that a subsequent read observes its own writes.
        self.file.flush()?;
        self.file.seek(pos)
    }
}

impl Stream for FileStream {
    fn name(&self) -> &str {
        &self.name
    }
}

/// An in-memory stream backed by a growable `Vec<u8>`. Used for tests and for
/// building GOB/CND files without touching disk.
pub struct MemoryStream {
    cursor: Cursor<Vec<u8>>,
    name: String,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self {
            cursor: Cursor::new(Vec::new()),
            name: "<mem>".to_owned(),
        }
    }

    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            name: "<mem>".to_owned(),
        }
    }

    pub fn named(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            name: name.into(),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    pub fn get_ref(&self) -> &[u8] {
        self.cursor.get_ref()
    }
}

impl Default for MemoryStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.cursor.flush()
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl Stream for MemoryStream {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Copies `len` bytes from `src`'s current position to `dst`'s current position.
/// Used by the patch-in-place algorithm to carry untouched regions across unchanged.
pub fn copy_bytes<R: Read + ?Sized, W: Write + ?Sized>(
    src: &mut R,
    dst: &mut W,
    mut len: u64,
) -> Result<(), StreamError> {
    let mut buf = [0u8; 8192];
    while len > 0 {
        let chunk = buf.len().min(len as usize);
        src.read_exact(&mut buf[..chunk])?;
        dst.write_all(&buf[..chunk])?;
        len -= chunk as u64;
    }
    Ok(())
}

/// Decodes a fixed-size binary structure from a stream.
pub trait Decode: Sized {
    fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError>;
}

/// Encodes a fixed-size binary structure to a stream.
pub trait Encode {
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError>;
}

macro_rules! int_impls {
    ($($id:ident),* $(,)?) => {
        $(
            impl Decode for $id {
                fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
                    let mut bytes = [0u8; std::mem::size_of::<Self>()];
                    stream.read_exact(&mut bytes)?;
                    Ok(Self::from_le_bytes(bytes))
                }
            }

            impl Encode for $id {
                fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
                    stream.write_all(&self.to_le_bytes())?;
                    Ok(())
                }
            }
        )*
    };
}

int_impls!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl<const N: usize> Decode for [u8; N] {
    fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        let mut bytes = [0u8; N];
        stream.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        stream.write_all(self)?;
        Ok(())
    }
}

/// Reads a fixed-length, NUL-padded ASCII field and trims trailing NULs.
pub fn read_fixed_string<S: Read + ?Sized>(
    stream: &mut S,
    len: usize,
) -> Result<String, StreamError> {
    let mut bytes = vec![0u8; len];
    stream.read_exact(&mut bytes)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

/// Writes a string into a fixed-length, NUL-padded field. Fails the caller's
/// invariant (checked by callers, typically [`crate::error::ValueError::PathTooLong`])
/// if `s` does not fit.
pub fn write_fixed_string<S: Write + ?Sized>(
    stream: &mut S,
    len: usize,
    s: &str,
) -> Result<(), StreamError> {
    let mut bytes = vec![0u8; len];
    let src = s.as_bytes();
    bytes[..src.len()].copy_from_slice(src);
    stream.write_all(&bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stream_round_trip() {
        let mut s = MemoryStream::new();
        42u32.encode(&mut s).unwrap();
        3.5f32.encode(&mut s).unwrap();
        assert_eq!(s.tell().unwrap(), 8);
        assert_eq!(s.size().unwrap(), 8);

        s.seek_to(0).unwrap();
        assert_eq!(u32::decode(&mut s).unwrap(), 42);
        assert_eq!(f32::decode(&mut s).unwrap(), 3.5);
    }

    #[test]
    fn fixed_string_round_trip() {
        let mut s = MemoryStream::new();
        write_fixed_string(&mut s, 8, "abc").unwrap();
        s.seek_to(0).unwrap();
        assert_eq!(read_fixed_string(&mut s, 8).unwrap(), "abc");
    }

    #[test]
    fn copy_bytes_preserves_region() {
        let mut src = MemoryStream::with_bytes(vec![1, 2, 3, 4, 5]);
        let mut dst = MemoryStream::new();
        copy_bytes(&mut src, &mut dst, 5).unwrap();
        assert_eq!(dst.into_inner(), vec![1, 2, 3, 4, 5]);
    }
}
