//! The FAT: a flat array of 32-bit cluster labels, one slot per cluster.

use crate::boot_sector::BootSector;
use crate::config::{FAT_BAD_CLUSTER, FAT_FILE_END, FAT_UNUSED};
use crate::error::FsError;
use crate::image::Image;

/// A decoded FAT slot: either a pointer to the next cluster in a chain, or
/// one of the three reserved sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatLabel {
    Next(u32),
    Unused,
    FileEnd,
    BadCluster,
}

impl FatLabel {
    pub fn from_raw(raw: i32, cluster_count: u32) -> Self {
        match raw {
            FAT_UNUSED => FatLabel::Unused,
            FAT_FILE_END => FatLabel::FileEnd,
            FAT_BAD_CLUSTER => FatLabel::BadCluster,
            v if v >= 0 && (v as u32) < cluster_count => FatLabel::Next(v as u32),
            _ => FatLabel::BadCluster,
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            FatLabel::Next(c) => c as i32,
            FatLabel::Unused => FAT_UNUSED,
            FatLabel::FileEnd => FAT_FILE_END,
            FatLabel::BadCluster => FAT_BAD_CLUSTER,
        }
    }
}

fn slot_offset(boot: &BootSector, cluster: u32) -> u64 {
    boot.fat1_start_address as u64 + cluster as u64 * 4
}

/// Reads the raw label stored for `cluster`.
pub fn read_label(image: &mut Image, boot: &BootSector, cluster: u32) -> Result<FatLabel, FsError> {
    let mut buf = [0u8; 4];
    image.read_exact_at(slot_offset(boot, cluster), &mut buf)?;
    let raw = i32::from_le_bytes(buf);
    Ok(FatLabel::from_raw(raw, boot.cluster_count))
}

/// Writes `label` into `cluster`'s slot.
pub fn write_label(
    image: &mut Image,
    boot: &BootSector,
    cluster: u32,
    label: FatLabel,
) -> Result<(), FsError> {
    image.write_all_at(slot_offset(boot, cluster), &label.to_raw().to_le_bytes())
}

/// Writes [`FatLabel::Unused`] into `count` consecutive slots starting at
/// `start`.
pub fn wipe(image: &mut Image, boot: &BootSector, start: u32, count: u32) -> Result<(), FsError> {
    for cluster in start..start + count {
        write_label(image, boot, cluster, FatLabel::Unused)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fresh_image;

    #[test]
    fn wipe_then_read_reports_unused() {
        let (mut image, boot) = fresh_image(64 * 1024);
        wipe(&mut image, &boot, 0, boot.cluster_count).unwrap();
        for c in 0..boot.cluster_count {
            assert_eq!(read_label(&mut image, &boot, c).unwrap(), FatLabel::Unused);
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let (mut image, boot) = fresh_image(64 * 1024);
        write_label(&mut image, &boot, 3, FatLabel::FileEnd).unwrap();
        assert_eq!(read_label(&mut image, &boot, 3).unwrap(), FatLabel::FileEnd);

        write_label(&mut image, &boot, 3, FatLabel::Next(5)).unwrap();
        assert_eq!(read_label(&mut image, &boot, 3).unwrap(), FatLabel::Next(5));
    }
}
