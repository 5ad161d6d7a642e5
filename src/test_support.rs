//! Shared fixtures for unit tests across modules.

#![cfg(test)]

use crate::boot_sector::BootSector;
use crate::image::Image;
use tempfile::NamedTempFile;

/// Builds a freshly-formatted image of `disk_size` bytes backed by an
/// anonymous temp file, for a single test.
pub(crate) fn fresh_image(disk_size: u32) -> (Image, BootSector) {
    let tmp = NamedTempFile::new().expect("create temp file");
    // Reopen for an independent handle, then let `tmp` unlink the path on
    // drop — the reopened handle keeps the (now-nameless) file alive for
    // the rest of the test, and nothing is left behind on disk.
    let file = tmp.reopen().expect("reopen temp file");

    let boot = BootSector::new(disk_size).expect("boot sector geometry");
    let mut image = Image::from_file(file);
    boot.write_to(&mut image).expect("write boot sector");
    (image, boot)
}
