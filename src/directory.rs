//! The directory-entry store: slot-level operations over a single
//! directory cluster.
//!
//! A directory in this filesystem is always exactly one cluster — it
//! never grows into a chain. [`config::max_entries`] slots fit in it;
//! slot 0 is always `.`, slot 1 is always `..`, and allocation is dense:
//! every slot before [`count`] is allocated, every slot from there on is
//! free.

use crate::boot_sector::BootSector;
use crate::config::max_entries;
use crate::dir_entry::{DirectoryEntry, EntryKind};
use crate::error::FsError;
use crate::image::Image;
use log::error;

/// Logs and returns the corruption error for a directory cluster found
/// with `.`/`..` missing from its first two slots.
fn missing_dot_entries(dir_cluster: u32, slot: usize) -> FsError {
    error!("directory: cluster {dir_cluster} slot {slot} unallocated, expected '.'/'..'");
    FsError::CorruptFs
}

/// Logs and returns the corruption error for a directory cluster with no
/// free slot left to insert into.
fn directory_full(dir_cluster: u32) -> FsError {
    error!("directory: cluster {dir_cluster} has no free slot past MAX_ENTRIES");
    FsError::CorruptFs
}

fn slot_offset(boot: &BootSector, dir_cluster: u32, slot: usize) -> u64 {
    boot.cluster_offset(dir_cluster) + (slot * DirectoryEntry::SIZE) as u64
}

fn read_slot(
    image: &mut Image,
    boot: &BootSector,
    dir_cluster: u32,
    slot: usize,
) -> Result<DirectoryEntry, FsError> {
    let mut buf = [0u8; DirectoryEntry::SIZE];
    image.read_exact_at(slot_offset(boot, dir_cluster, slot), &mut buf)?;
    Ok(DirectoryEntry::from_bytes(&buf))
}

fn write_slot(
    image: &mut Image,
    boot: &BootSector,
    dir_cluster: u32,
    slot: usize,
    entry: &DirectoryEntry,
) -> Result<(), FsError> {
    image.write_all_at(slot_offset(boot, dir_cluster, slot), &entry.to_bytes())
}

/// Initializes a brand-new directory cluster: `.` and `..`, everything
/// else free.
pub fn init(
    image: &mut Image,
    boot: &BootSector,
    dir_cluster: u32,
    parent_cluster: u32,
) -> Result<(), FsError> {
    write_slot(image, boot, dir_cluster, 0, &DirectoryEntry::dot(dir_cluster))?;
    write_slot(
        image,
        boot,
        dir_cluster,
        1,
        &DirectoryEntry::dotdot(parent_cluster),
    )?;
    for slot in 2..max_entries() {
        write_slot(image, boot, dir_cluster, slot, &DirectoryEntry::free())?;
    }
    Ok(())
}

/// Reads every slot's name, in slot order, stopping at the first free
/// slot. Fails with [`FsError::CorruptFs`] if either of the first two
/// slots is unallocated.
pub fn enumerate(
    image: &mut Image,
    boot: &BootSector,
    dir_cluster: u32,
) -> Result<Vec<DirectoryEntry>, FsError> {
    let mut out = Vec::new();
    for slot in 0..max_entries() {
        let entry = read_slot(image, boot, dir_cluster, slot)?;
        if !entry.is_allocated() {
            if slot < 2 {
                return Err(missing_dot_entries(dir_cluster, slot));
            }
            break;
        }
        out.push(entry);
    }
    Ok(out)
}

/// Linear scan for a name, optionally filtered by kind.
pub fn find_by_name(
    image: &mut Image,
    boot: &BootSector,
    dir_cluster: u32,
    name: &str,
    kind: EntryKind,
) -> Result<Option<DirectoryEntry>, FsError> {
    for slot in 0..max_entries() {
        let entry = read_slot(image, boot, dir_cluster, slot)?;
        if !entry.is_allocated() {
            if slot < 2 {
                return Err(missing_dot_entries(dir_cluster, slot));
            }
            break;
        }
        if entry.matches_name(name) && entry.matches_kind(kind) {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

/// Linear scan for the entry whose `start_cluster` is `child_cluster`.
pub fn find_by_cluster(
    image: &mut Image,
    boot: &BootSector,
    dir_cluster: u32,
    child_cluster: u32,
) -> Result<Option<DirectoryEntry>, FsError> {
    for slot in 0..max_entries() {
        let entry = read_slot(image, boot, dir_cluster, slot)?;
        if !entry.is_allocated() {
            if slot < 2 {
                return Err(missing_dot_entries(dir_cluster, slot));
            }
            break;
        }
        if entry.start_cluster == child_cluster {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

/// Writes `entry` into the first free slot (index >= 2).
pub fn insert(
    image: &mut Image,
    boot: &BootSector,
    dir_cluster: u32,
    entry: &DirectoryEntry,
) -> Result<(), FsError> {
    for slot in 2..max_entries() {
        let existing = read_slot(image, boot, dir_cluster, slot)?;
        if !existing.is_allocated() {
            write_slot(image, boot, dir_cluster, slot, entry)?;
            return Ok(());
        }
    }
    Err(directory_full(dir_cluster))
}

/// Overwrites the slot whose `start_cluster == old_start` with `new_entry`.
pub fn edit(
    image: &mut Image,
    boot: &BootSector,
    dir_cluster: u32,
    old_start: u32,
    new_entry: &DirectoryEntry,
) -> Result<(), FsError> {
    for slot in 0..max_entries() {
        let existing = read_slot(image, boot, dir_cluster, slot)?;
        if !existing.is_allocated() {
            break;
        }
        if existing.start_cluster == old_start {
            write_slot(image, boot, dir_cluster, slot, new_entry)?;
            return Ok(());
        }
    }
    error!("directory: edit found no slot with start_cluster={old_start} in cluster {dir_cluster}");
    Err(FsError::CorruptFs)
}

/// Removes the entry matching `name`/`kind`, compacting the slot array so
/// it stays dense. `.` and `..` can never be removed as directories.
///
/// Returns whether a removal took place.
pub fn remove(
    image: &mut Image,
    boot: &BootSector,
    dir_cluster: u32,
    name: &str,
    kind: EntryKind,
) -> Result<bool, FsError> {
    if kind != EntryKind::File && (name == "." || name == "..") {
        return Ok(false);
    }

    let mut target_slot = None;
    let mut last_allocated = 1;

    for slot in 0..max_entries() {
        let entry = read_slot(image, boot, dir_cluster, slot)?;
        if !entry.is_allocated() {
            if slot < 2 {
                return Err(missing_dot_entries(dir_cluster, slot));
            }
            break;
        }
        last_allocated = slot;
        if target_slot.is_none() && entry.matches_name(name) && entry.matches_kind(kind) {
            target_slot = Some(slot);
        }
    }

    let Some(target) = target_slot else {
        return Ok(false);
    };

    if target != last_allocated {
        let last_entry = read_slot(image, boot, dir_cluster, last_allocated)?;
        write_slot(image, boot, dir_cluster, target, &last_entry)?;
    }
    write_slot(image, boot, dir_cluster, last_allocated, &DirectoryEntry::free())?;
    image.flush()?;
    Ok(true)
}

/// Number of allocated slots (always >= 2 for a well-formed directory).
pub fn count(image: &mut Image, boot: &BootSector, dir_cluster: u32) -> Result<usize, FsError> {
    Ok(enumerate(image, boot, dir_cluster)?.len())
}
