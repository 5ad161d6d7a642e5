//! Global constants for the on-disk layout.
//!
//! Collected in one place per the "Global constants" note: every FAT
//! primitive, the allocator and the directory store read these instead of
//! hand-computing their own copies.

use crate::dir_entry::DirectoryEntry;

/// Size in bytes of one data cluster. A compile-time constant, as the spec
/// allows; 4096 matches a typical page/sector-multiple size.
pub const CLUSTER_SIZE: usize = 4096;

/// Number of FAT tables. The engine only ever writes one; the classical
/// FAT "mirror" table is not implemented.
pub const FAT_COUNT: u32 = 1;

/// 10-byte signature string stamped at the start of every formatted image.
/// An image whose first 10 bytes don't match this is not recognized as
/// ours.
pub const SIGNATURE: [u8; 10] = *b"VFATFS01\0\0";

/// Bytes per declared megabyte when parsing `format <N>MB`.
pub const FORMAT_UNIT: u64 = 1_000_000;

/// Maximum stored name length, including the mandatory NUL terminator.
pub const ITEM_NAME_LENGTH: usize = 12;

/// Cluster-table sentinel meaning "this slot is free".
pub const FAT_UNUSED: i32 = i32::MAX - 1;
/// Cluster-table sentinel meaning "last cluster of a chain".
pub const FAT_FILE_END: i32 = i32::MAX - 2;
/// Cluster-table sentinel meaning "cluster is unusable".
pub const FAT_BAD_CLUSTER: i32 = i32::MAX - 3;

/// Cluster index of the root directory. Fixed at 0.
pub const ROOT_CLUSTER: u32 = 0;

/// Number of directory-entry slots that fit in one cluster, derived from
/// [`CLUSTER_SIZE`] and [`DirectoryEntry::SIZE`] rather than hand-counted.
pub const fn max_entries() -> usize {
    CLUSTER_SIZE / DirectoryEntry::SIZE
}
