//! Splits a `/`-delimited path and resolves it to a directory entry.
//!
//! A leading `/` makes the path absolute (anchored at the root cluster);
//! otherwise it is resolved relative to the caller's working cluster.

use crate::boot_sector::BootSector;
use crate::config::{ITEM_NAME_LENGTH, ROOT_CLUSTER};
use crate::dir_entry::{DirectoryEntry, EntryKind};
use crate::directory;
use crate::error::FsError;
use crate::image::Image;

/// A path split into its absolute/relative anchor and name components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub absolute: bool,
    pub components: Vec<String>,
}

impl ParsedPath {
    /// The cluster resolution should start from: the root if this path
    /// was absolute, otherwise the caller's current working cluster.
    pub fn start_cluster(&self, cwd: u32) -> u32 {
        if self.absolute {
            ROOT_CLUSTER
        } else {
            cwd
        }
    }
}

/// Splits `path` on `/`. A leading `/` marks the path absolute and is
/// dropped before splitting; one optional trailing `/` is also dropped.
/// An empty (post-trim) path yields an empty component list (the
/// "working directory itself" case). A doubled slash, or a component
/// that is too long once it reaches [`DirectoryEntry::new`], is rejected.
pub fn split(path: &str) -> Result<ParsedPath, FsError> {
    let absolute = path.starts_with('/');
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(ParsedPath {
            absolute,
            components: Vec::new(),
        });
    }
    let parts: Vec<&str> = trimmed.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(FsError::BadPath);
    }
    for p in &parts {
        if p.len() >= ITEM_NAME_LENGTH {
            return Err(FsError::NameTooLong);
        }
    }
    Ok(ParsedPath {
        absolute,
        components: parts.into_iter().map(String::from).collect(),
    })
}

/// Resolves `components` against `start_cluster`, applying `kind` only
/// to the last component. Interior components are matched by name only.
///
/// When `components` is empty, returns the `.` entry of `start_cluster`
/// if `allow_empty` is set, otherwise fails with [`FsError::BadPath`].
pub fn resolve(
    image: &mut Image,
    boot: &BootSector,
    start_cluster: u32,
    components: &[String],
    kind: EntryKind,
    allow_empty: bool,
) -> Result<DirectoryEntry, FsError> {
    if components.is_empty() {
        if !allow_empty {
            return Err(FsError::BadPath);
        }
        return directory::find_by_name(image, boot, start_cluster, ".", EntryKind::Directory)?
            .ok_or(FsError::CorruptFs);
    }

    let mut cur = start_cluster;
    for name in &components[..components.len() - 1] {
        let entry = directory::find_by_name(image, boot, cur, name, EntryKind::Any)?
            .ok_or(FsError::PathNotFound)?;
        cur = entry.start_cluster;
    }

    let last = components.last().unwrap();
    match directory::find_by_name(image, boot, cur, last, kind)? {
        Some(entry) => Ok(entry),
        None if kind == EntryKind::File => Err(FsError::FileNotFound),
        None => Err(FsError::PathNotFound),
    }
}

/// Splits off the final component and resolves everything before it as
/// a directory, returning `(parent_cluster, last_name)`. Used by every
/// operation that creates or removes an entry by name.
pub fn resolve_parent(
    image: &mut Image,
    boot: &BootSector,
    start_cluster: u32,
    components: &[String],
) -> Result<(u32, String), FsError> {
    let (last, parent_components) = components.split_last().ok_or(FsError::BadPath)?;
    let parent_entry = resolve(
        image,
        boot,
        start_cluster,
        parent_components,
        EntryKind::Directory,
        true,
    )?;
    Ok((parent_entry.start_cluster, last.clone()))
}
