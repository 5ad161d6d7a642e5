//! Owns the open image and the in-memory working-directory state.
//!
//! Everything above this layer (the operations layer) borrows the engine
//! exclusively for the duration of a single command; there is no shared
//! ownership because there is exactly one caller.

use crate::boot_sector::BootSector;
use crate::config::{max_entries, FORMAT_UNIT};
use crate::dir_entry::{DirectoryEntry, EntryKind};
use crate::directory;
use crate::error::FsError;
use crate::fat::{self, FatLabel};
use crate::image::Image;
use log::{debug, error, info};
use std::path::Path;

/// The open filesystem: backing image, its boot sector, and the cached
/// working directory.
pub struct Engine {
    image: Image,
    boot: BootSector,
    cwd_cluster: u32,
    cwd_path: String,
}

impl Engine {
    /// Opens `path`. If the file does not already exist, it is created
    /// and immediately formatted to a default size (per spec §4.1); an
    /// existing file is opened and its boot sector trusted as-is.
    pub fn open(path: &Path) -> Result<Self, FsError> {
        if path.exists() {
            let mut image = Image::open_existing(path)?;
            let boot = BootSector::read_from(&mut image)?;
            info!("opened existing image at {}", path.display());
            let mut engine = Engine {
                image,
                boot,
                cwd_cluster: 0,
                cwd_path: "/".to_string(),
            };
            engine.recompute_pwd()?;
            Ok(engine)
        } else {
            let image = Image::create_truncated(path)?;
            let mut engine = Engine {
                image,
                boot: BootSector::new(FORMAT_UNIT as u32)?,
                cwd_cluster: 0,
                cwd_path: "/".to_string(),
            };
            engine.format(FORMAT_UNIT as u32)?;
            info!("created and formatted new image at {}", path.display());
            Ok(engine)
        }
    }

    pub fn image(&mut self) -> &mut Image {
        &mut self.image
    }

    pub fn boot(&self) -> &BootSector {
        &self.boot
    }

    pub fn cwd_cluster(&self) -> u32 {
        self.cwd_cluster
    }

    pub fn pwd(&self) -> &str {
        &self.cwd_path
    }

    /// Re-formats the image in place for a disk of `size_bytes`.
    /// Implements spec §4.8 exactly: truncate, geometry, zero-fill data,
    /// root directory, wipe FAT, mark cluster 0 allocated, flush.
    pub fn format(&mut self, size_bytes: u32) -> Result<(), FsError> {
        let boot = BootSector::new(size_bytes)?;
        boot.write_to(&mut self.image)?;

        let zero_cluster = vec![0u8; boot.cluster_size as usize];
        for cluster in 0..boot.cluster_count {
            self.image
                .write_all_at(boot.cluster_offset(cluster), &zero_cluster)?;
        }

        directory::init(&mut self.image, &boot, 0, 0)?;

        fat::wipe(&mut self.image, &boot, 0, boot.cluster_count)?;
        fat::write_label(&mut self.image, &boot, 0, FatLabel::FileEnd)?;

        self.image.flush()?;

        self.boot = boot;
        self.cwd_cluster = 0;
        self.cwd_path = "/".to_string();
        debug!("format: {} clusters of {} bytes", self.boot.cluster_count, self.boot.cluster_size);
        Ok(())
    }

    /// Changes the working directory to `cluster` and recomputes the
    /// cached path (spec §4.7).
    pub fn set_cwd(&mut self, cluster: u32) -> Result<(), FsError> {
        self.cwd_cluster = cluster;
        self.recompute_pwd()
    }

    fn recompute_pwd(&mut self) -> Result<(), FsError> {
        if self.cwd_cluster == 0 {
            self.cwd_path = "/".to_string();
            return Ok(());
        }

        let mut segments = Vec::new();
        let mut current = self.cwd_cluster;

        for _ in 0..max_entries() {
            if current == 0 {
                self.cwd_path = format!("/{}", segments.into_iter().rev().collect::<Vec<_>>().join("/"));
                return Ok(());
            }
            let parent_entry =
                directory::find_by_name(&mut self.image, &self.boot, current, "..", EntryKind::Directory)?
                    .ok_or_else(|| {
                        error!("pwd: cluster {current} has no '..' entry");
                        FsError::CorruptFs
                    })?;
            let parent_cluster = parent_entry.start_cluster;
            let named =
                directory::find_by_cluster(&mut self.image, &self.boot, parent_cluster, current)?
                    .ok_or_else(|| {
                        error!("pwd: cluster {parent_cluster} has no entry naming child {current}");
                        FsError::CorruptFs
                    })?;
            segments.push(named.name());
            current = parent_cluster;
        }

        error!("pwd: safety counter exhausted, treating image as corrupt");
        Err(FsError::CorruptFs)
    }

    /// Root-directory entry shorthand, used by operations that need a
    /// `DirectoryEntry` for cluster 0 (e.g. `cd /`).
    pub fn root_entry(&mut self) -> Result<DirectoryEntry, FsError> {
        directory::find_by_name(&mut self.image, &self.boot, 0, ".", EntryKind::Directory)?
            .ok_or(FsError::CorruptFs)
    }
}
