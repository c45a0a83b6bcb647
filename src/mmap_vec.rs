//! Headerless memory-mapped array of fixed-size records.
//!
//! The file *is* the records: no header, no footer, no padding. The logical
//! element count is always `file_len / record_size`, so a file written by one
//! process reopens with the same contents and length in the next.
//!
//! Lifecycle: built by a single writer (`create`/`open` + `push`/`resize`),
//! flushed, then mapped read-only for the rest of the process. The mapped
//! view is only ever accessed through checked slice casts.

use std::fs::{File, OpenOptions};
use std::marker::PhantomData;
use std::mem;
use std::ops::Index;
use std::path::{Path, PathBuf};

use bytemuck::Pod;
use memmap2::{Mmap, MmapMut};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {len} bytes is not a multiple of the {record}-byte record size", path.display())]
    RecordMismatch {
        path: PathBuf,
        len: u64,
        record: usize,
    },

    #[error("{}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

enum Map {
    /// Zero-length file. Kept separate so empty arrays never touch mmap.
    None,
    Read(Mmap),
    Write(MmapMut),
}

/// Growable persistent array of `Pod` records backed by a mapped file.
pub struct MmapVec<T: Pod> {
    file: File,
    path: PathBuf,
    map: Map,
    len: usize,
    writable: bool,
    _marker: PhantomData<T>,
}

impl<T: Pod> MmapVec<T> {
    const RECORD: usize = mem::size_of::<T>();

    /// Create a new array, truncating any existing file at `path`.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        assert!(Self::RECORD > 0, "zero-sized records are not storable");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| StoreError::Io {
                op: "create",
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            map: Map::None,
            len: 0,
            writable: true,
            _marker: PhantomData,
        })
    }

    /// Open an existing array for appending.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| StoreError::Io {
                op: "open",
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_file(file, path, true)
    }

    /// Open an existing array for the read-only phase. Mutation panics.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::Io {
            op: "open",
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_file(file, path, false)
    }

    fn from_file(file: File, path: &Path, writable: bool) -> Result<Self, StoreError> {
        assert!(Self::RECORD > 0, "zero-sized records are not storable");
        let byte_len = file
            .metadata()
            .map_err(|source| StoreError::Io {
                op: "stat",
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if byte_len % Self::RECORD as u64 != 0 {
            return Err(StoreError::RecordMismatch {
                path: path.to_path_buf(),
                len: byte_len,
                record: Self::RECORD,
            });
        }
        let mut v = Self {
            file,
            path: path.to_path_buf(),
            map: Map::None,
            len: (byte_len / Self::RECORD as u64) as usize,
            writable,
            _marker: PhantomData,
        };
        v.remap()?;
        Ok(v)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, growing the file by exactly one record size.
    pub fn push(&mut self, value: T) -> Result<(), StoreError> {
        self.ensure_writable("push");
        let new_len = self.len + 1;
        self.set_byte_len(new_len)?;
        self.as_mut_slice()[new_len - 1] = value;
        Ok(())
    }

    /// Grow or shrink to exactly `new_len` records. Grown space is zeroed.
    pub fn resize(&mut self, new_len: usize) -> Result<(), StoreError> {
        self.ensure_writable("resize");
        self.set_byte_len(new_len)
    }

    fn set_byte_len(&mut self, new_len: usize) -> Result<(), StoreError> {
        // The old map must be gone before the file shrinks under it.
        self.map = Map::None;
        self.file
            .set_len((new_len * Self::RECORD) as u64)
            .map_err(|source| StoreError::Io {
                op: "resize",
                path: self.path.clone(),
                source,
            })?;
        self.len = new_len;
        self.remap()
    }

    fn remap(&mut self) -> Result<(), StoreError> {
        // Safety: single-writer lifecycle; the file length only changes
        // through `set_byte_len`, which unmaps before truncating.
        self.map = Map::None;
        if self.len == 0 {
            return Ok(());
        }
        let map = if self.writable {
            unsafe { MmapMut::map_mut(&self.file) }.map(Map::Write)
        } else {
            unsafe { Mmap::map(&self.file) }.map(Map::Read)
        };
        self.map = map.map_err(|source| StoreError::Io {
            op: "map",
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match &self.map {
            Map::None => &[],
            Map::Read(m) => bytemuck::cast_slice(&m[..]),
            Map::Write(m) => bytemuck::cast_slice(&m[..]),
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match &mut self.map {
            Map::None => &mut [],
            Map::Write(m) => bytemuck::cast_slice_mut(&mut m[..]),
            Map::Read(_) => panic!("mmap_vec opened read-only: cannot mutate"),
        }
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&T> {
        self.as_slice().get(i)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        if let Map::Write(m) = &self.map {
            m.flush().map_err(|source| StoreError::Io {
                op: "flush",
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn ensure_writable(&self, op: &str) {
        if !self.writable {
            panic!("mmap_vec opened read-only: cannot {op}");
        }
    }
}

impl<T: Pod> Index<usize> for MmapVec<T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.as_slice()[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[repr(C)]
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Pod, Zeroable)]
    struct Rec {
        a: u32,
        b: u32,
    }

    #[test]
    fn push_then_reopen_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recs.bin");
        let recs = [
            Rec { a: 1, b: 10 },
            Rec { a: 2, b: 20 },
            Rec { a: 3, b: 30 },
        ];

        {
            let mut v = MmapVec::<Rec>::create(&path).unwrap();
            for r in recs {
                v.push(r).unwrap();
            }
            v.flush().unwrap();
        }

        let v = MmapVec::<Rec>::open(&path).unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v.as_slice(), &recs);
        assert_eq!(
            bytemuck::cast_slice::<Rec, u8>(v.as_slice()),
            bytemuck::cast_slice::<Rec, u8>(&recs)
        );
    }

    #[test]
    fn len_tracks_file_length_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recs.bin");
        let mut v = MmapVec::<Rec>::create(&path).unwrap();
        v.push(Rec { a: 9, b: 9 }).unwrap();
        v.push(Rec { a: 8, b: 8 }).unwrap();
        drop(v);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            2 * mem::size_of::<Rec>() as u64
        );
    }

    #[test]
    fn resize_grows_zeroed_and_shrinks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recs.bin");
        let mut v = MmapVec::<Rec>::create(&path).unwrap();
        v.resize(4).unwrap();
        assert_eq!(v.len(), 4);
        assert_eq!(v[3], Rec { a: 0, b: 0 });

        v.as_mut_slice()[0] = Rec { a: 5, b: 5 };
        v.resize(1).unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0], Rec { a: 5, b: 5 });
    }

    #[test]
    fn partial_record_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        std::fs::write(&path, [0u8; 5]).unwrap();
        match MmapVec::<Rec>::open(&path) {
            Err(StoreError::RecordMismatch { len, record, .. }) => {
                assert_eq!(len, 5);
                assert_eq!(record, 8);
            }
            other => panic!("expected RecordMismatch, got {:?}", other.err()),
        }
    }

    #[test]
    fn empty_array_is_an_empty_slice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        MmapVec::<Rec>::create(&path).unwrap().flush().unwrap();
        let v = MmapVec::<Rec>::open_read_only(&path).unwrap();
        assert!(v.is_empty());
        assert!(v.as_slice().is_empty());
        assert!(v.get(0).is_none());
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MmapVec::<Rec>::open(&dir.path().join("nope.bin")),
            Err(StoreError::Io { op: "open", .. })
        ));
    }

    #[test]
    #[should_panic(expected = "read-only")]
    fn read_only_push_panics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.bin");
        {
            let mut v = MmapVec::<Rec>::create(&path).unwrap();
            v.push(Rec { a: 1, b: 1 }).unwrap();
        }
        let mut v = MmapVec::<Rec>::open_read_only(&path).unwrap();
        v.push(Rec { a: 2, b: 2 }).unwrap();
    }
}
