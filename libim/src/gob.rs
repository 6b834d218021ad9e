//! Packed archive format (component G).
//!
//! The virtual-file-table shape is grounded on `game_common/src/archive/loader/*`'s
//! `Loader` trait, adapted from a recursive directory walk to a flat offset table per
//! `SPEC_FULL.md` 4.G. `GobWriter`'s backpatch-the-directory-offset approach mirrors
//! the header-then-rewind shape `world::cnd` uses for its own header.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Seek, Write};
use std::rc::Rc;

use crate::error::{Error, StreamError, ValueError};
use crate::stream::{read_fixed_string, write_fixed_string, Decode, Encode, Stream};

const GOB_MAGIC: [u8; 4] = *b"GOB ";
const GOB_VERSION: u32 = 0x14;
const GOB_PATH_FIELD_LEN: usize = 128;

struct GobFileEntry {
    offset: u32,
    size: u32,
    path: String,
}

impl Decode for GobFileEntry {
    fn decode<S: Read + ?Sized>(stream: &mut S) -> Result<Self, StreamError> {
        let offset = u32::decode(stream)?;
        let size = u32::decode(stream)?;
        let path = read_fixed_string(stream, GOB_PATH_FIELD_LEN)?;
        Ok(Self { offset, size, path })
    }
}

impl Encode for GobFileEntry {
    fn encode<S: Write + ?Sized>(&self, stream: &mut S) -> Result<(), StreamError> {
        self.offset.encode(stream)?;
        self.size.encode(stream)?;
        write_fixed_string(stream, GOB_PATH_FIELD_LEN, &self.path)?;
        Ok(())
    }
}

/// A single named byte range inside a GOB, with a shared handle back to the backing
/// stream so multiple virtual files can coexist over one archive.
pub struct VirtualFile<S> {
    backing: Rc<RefCell<S>>,
    pub path: String,
    pub offset: u64,
    pub size: u64,
}

impl<S: Stream> VirtualFile<S> {
    /// Reads the entire virtual file's contents.
    pub fn read_all(&self) -> Result<Vec<u8>, StreamError> {
        let mut backing = self.backing.borrow_mut();
        backing.seek_to(self.offset)?;
        let mut buf = vec![0u8; self.size as usize];
        backing.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// The loaded directory of a GOB archive: path to virtual file, insertion order
/// preserved (mirrors the directory's on-disk order).
pub struct VfContainer<S> {
    backing: Rc<RefCell<S>>,
    entries: Vec<(String, (u64, u64))>,
    by_path: HashMap<String, usize>,
}

impl<S: Stream> VfContainer<S> {
    /// Reads a GOB's directory and builds the virtual file table. The stream must
    /// stay alive at least as long as the returned container.
    pub fn load(stream: S) -> Result<Self, Error> {
        let backing = Rc::new(RefCell::new(stream));
        let (magic, version, directory_offset) = {
            let mut s = backing.borrow_mut();
            s.seek_to(0)?;
            let magic = <[u8; 4]>::decode(&mut *s)?;
            let version = u32::decode(&mut *s)?;
            let directory_offset = u32::decode(&mut *s)?;
            (magic, version, directory_offset)
        };
        if magic != GOB_MAGIC {
            return Err(StreamError::BadMagic {
                format: "GOB",
                expected: GOB_MAGIC,
                got: magic,
            }
            .into());
        }
        if version != GOB_VERSION {
            return Err(StreamError::BadVersion {
                format: "GOB",
                version,
            }
            .into());
        }

        let mut s = backing.borrow_mut();
        s.seek_to(directory_offset as u64)?;
        let num_entries = u32::decode(&mut *s)?;
        let mut entries = Vec::with_capacity(num_entries as usize);
        let mut by_path = HashMap::with_capacity(num_entries as usize);
        for i in 0..num_entries {
            let entry = GobFileEntry::decode(&mut *s)?;
            by_path.insert(entry.path.clone(), i as usize);
            entries.push((entry.path, (entry.offset as u64, entry.size as u64)));
        }
        drop(s);

        tracing::debug!(entries = entries.len(), "loaded gob directory");

        Ok(Self {
            backing,
            entries,
            by_path,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    pub fn get(&self, path: &str) -> Option<VirtualFile<S>> {
        let idx = *self.by_path.get(path)?;
        let (path, (offset, size)) = &self.entries[idx];
        Some(VirtualFile {
            backing: Rc::clone(&self.backing),
            path: path.clone(),
            offset: *offset,
            size: *size,
        })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }
}

/// Writes a GOB archive from an ordered list of `(path, bytes)` pairs.
pub fn write_gob<W: Write + std::io::Seek>(
    stream: &mut W,
    files: &[(String, Vec<u8>)],
) -> Result<(), Error> {
    for (path, _) in files {
        if path.as_bytes().len() >= GOB_PATH_FIELD_LEN {
            return Err(ValueError::PathTooLong(path.clone()).into());
        }
    }

    stream.write_all(&GOB_MAGIC)?;
    GOB_VERSION.encode(stream)?;
    // Placeholder directory offset, backpatched once we know where the directory
    // actually lands.
    0u32.encode(stream)?;

    let mut entries = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        let offset = stream.stream_position().map_err(StreamError::from)?;
        stream.write_all(bytes)?;
        entries.push(GobFileEntry {
            offset: offset as u32,
            size: bytes.len() as u32,
            path: path.clone(),
        });
    }

    let directory_offset = stream.stream_position().map_err(StreamError::from)?;
    (entries.len() as u32).encode(stream)?;
    for entry in &entries {
        entry.encode(stream)?;
    }

    stream
        .seek(std::io::SeekFrom::Start(8))
        .map_err(StreamError::from)?;
    (directory_offset as u32).encode(stream)?;
    stream
        .seek(std::io::SeekFrom::Start(0))
        .map_err(StreamError::from)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    #[test]
    fn gob_round_trip() {
        let files = vec![
            ("a/b.mat".to_owned(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]),
            ("c.key".to_owned(), vec![0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36]),
        ];

        let mut s = MemoryStream::new();
        write_gob(&mut s, &files).unwrap();
        let bytes = s.into_inner();

        let container = VfContainer::load(MemoryStream::with_bytes(bytes)).unwrap();
        assert_eq!(container.len(), 2);
        let vf = container.get("a/b.mat").unwrap();
        assert_eq!(vf.read_all().unwrap(), files[0].1);
        let vf = container.get("c.key").unwrap();
        assert_eq!(vf.read_all().unwrap(), files[1].1);

        let order: Vec<_> = container.paths().collect();
        assert_eq!(order, vec!["a/b.mat", "c.key"]);
    }

    #[test]
    fn gob_rejects_overlong_path() {
        let files = vec![("x".repeat(200), vec![1, 2, 3])];
        let mut s = MemoryStream::new();
        assert!(write_gob(&mut s, &files).is_err());
    }
}
