//! Positioned read/write over the single backing file.
//!
//! Every FAT, directory and data access funnels through these two
//! primitives so there is exactly one place that seeks.

use crate::error::FsError;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Handle to the backing disk-image file.
pub struct Image {
    file: File,
}

impl Image {
    /// Wraps an already-open file handle.
    pub(crate) fn from_file(file: File) -> Self {
        Image { file }
    }

    /// Opens an existing image file without truncating it.
    pub fn open_existing(path: &Path) -> Result<Self, FsError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Image { file })
    }

    /// Creates (or truncates) the image file for a fresh `format`.
    pub fn create_truncated(path: &Path) -> Result<Self, FsError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Image { file })
    }

    pub fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), FsError> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    pub fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), FsError> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), FsError> {
        self.file.flush()?;
        Ok(())
    }
}
