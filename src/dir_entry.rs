//! The fixed-width directory-entry record.

use crate::config::ITEM_NAME_LENGTH;
use crate::error::FsError;
use std::fmt;

/// What kind of entry a path lookup is allowed to terminate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Any,
}

impl EntryKind {
    fn matches(&self, is_file: bool) -> bool {
        match self {
            EntryKind::File => is_file,
            EntryKind::Directory => !is_file,
            EntryKind::Any => true,
        }
    }
}

/// One slot in a directory cluster: `{name, isFile, size, startCluster}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    item_name: [u8; ITEM_NAME_LENGTH],
    pub is_file: bool,
    pub size: u32,
    pub start_cluster: u32,
}

impl DirectoryEntry {
    /// On-disk size of one slot: name + isFile + size + startCluster.
    pub const SIZE: usize = ITEM_NAME_LENGTH + 1 + 4 + 4;

    /// Builds an entry, rejecting names that don't fit or that embed `/`
    /// or NUL (spec Non-goals: no `/` or NUL in filenames).
    pub fn new(name: &str, is_file: bool, size: u32, start_cluster: u32) -> Result<Self, FsError> {
        if name.is_empty() || name.len() >= ITEM_NAME_LENGTH {
            return Err(FsError::NameTooLong);
        }
        if name.as_bytes().iter().any(|&b| b == b'/' || b == 0) {
            return Err(FsError::BadPath);
        }

        let mut item_name = [0u8; ITEM_NAME_LENGTH];
        item_name[..name.len()].copy_from_slice(name.as_bytes());
        Ok(DirectoryEntry {
            item_name,
            is_file,
            size,
            start_cluster,
        })
    }

    /// A free (unallocated) slot: `itemName[0] == 0x00`.
    pub fn free() -> Self {
        DirectoryEntry {
            item_name: [0u8; ITEM_NAME_LENGTH],
            is_file: false,
            size: 0,
            start_cluster: 0,
        }
    }

    /// "Allocated" is defined solely by `itemName[0] != 0x00`.
    pub fn is_allocated(&self) -> bool {
        self.item_name[0] != 0
    }

    /// The entry's name, decoded as a C string (stops at the first NUL).
    pub fn name(&self) -> String {
        let end = self
            .item_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.item_name.len());
        String::from_utf8_lossy(&self.item_name[..end]).into_owned()
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name() == name
    }

    pub fn matches_kind(&self, kind: EntryKind) -> bool {
        kind.matches(self.is_file)
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[..ITEM_NAME_LENGTH].copy_from_slice(&self.item_name);
        buf[ITEM_NAME_LENGTH] = self.is_file as u8;
        buf[ITEM_NAME_LENGTH + 1..ITEM_NAME_LENGTH + 5].copy_from_slice(&self.size.to_le_bytes());
        buf[ITEM_NAME_LENGTH + 5..ITEM_NAME_LENGTH + 9]
            .copy_from_slice(&self.start_cluster.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; Self::SIZE]) -> Self {
        let mut item_name = [0u8; ITEM_NAME_LENGTH];
        item_name.copy_from_slice(&buf[..ITEM_NAME_LENGTH]);
        let is_file = buf[ITEM_NAME_LENGTH] != 0;
        let size = u32::from_le_bytes(
            buf[ITEM_NAME_LENGTH + 1..ITEM_NAME_LENGTH + 5]
                .try_into()
                .unwrap(),
        );
        let start_cluster = u32::from_le_bytes(
            buf[ITEM_NAME_LENGTH + 5..ITEM_NAME_LENGTH + 9]
                .try_into()
                .unwrap(),
        );
        DirectoryEntry {
            item_name,
            is_file,
            size,
            start_cluster,
        }
    }

    /// Builds the `.` entry for a directory at `own_cluster`.
    pub fn dot(own_cluster: u32) -> Self {
        DirectoryEntry::new(".", false, 0, own_cluster).expect("'.' always fits")
    }

    /// Builds the `..` entry for a directory whose parent is `parent_cluster`.
    pub fn dotdot(parent_cluster: u32) -> Self {
        DirectoryEntry::new("..", false, 0, parent_cluster).expect("'..' always fits")
    }
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  ItemName: {}", self.name())?;
        writeln!(f, "  IsFile: {}", self.is_file)?;
        writeln!(f, "  Size: {}", self.size)?;
        write!(f, "  StartCluster: {}", self.start_cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let e = DirectoryEntry::new("HELLO.TXT", true, 42, 7).unwrap();
        let back = DirectoryEntry::from_bytes(&e.to_bytes());
        assert_eq!(back, e);
        assert_eq!(back.name(), "HELLO.TXT");
    }

    #[test]
    fn rejects_name_too_long() {
        let err = DirectoryEntry::new("ABCDEFGHIJKL", false, 0, 1).unwrap_err();
        assert!(matches!(err, FsError::NameTooLong));
    }

    #[test]
    fn rejects_embedded_slash() {
        let err = DirectoryEntry::new("a/b", true, 0, 1).unwrap_err();
        assert!(matches!(err, FsError::BadPath));
    }

    #[test]
    fn free_slot_is_not_allocated() {
        assert!(!DirectoryEntry::free().is_allocated());
        assert!(DirectoryEntry::new("x", true, 0, 1).unwrap().is_allocated());
    }

    #[test]
    fn kind_filter_matches_is_file() {
        let file = DirectoryEntry::new("f", true, 0, 2).unwrap();
        let dir = DirectoryEntry::new("d", false, 0, 3).unwrap();
        assert!(file.matches_kind(EntryKind::File));
        assert!(!file.matches_kind(EntryKind::Directory));
        assert!(dir.matches_kind(EntryKind::Directory));
        assert!(file.matches_kind(EntryKind::Any));
    }
}
