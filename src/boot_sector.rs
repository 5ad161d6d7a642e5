//! The boot sector: fixed-width geometry header at offset 0 of the image.

use crate::config::{CLUSTER_SIZE, FAT_COUNT, SIGNATURE};
use crate::error::FsError;
use crate::image::Image;
use std::fmt;

/// Geometry header stored at byte offset 0 of the backing file.
///
/// Serialization order: `signature`, `cluster_size`, `cluster_count`,
/// `disk_size`, `fat_count`, `fat1_start_address`, `data_start_address`,
/// `padding_size` — all little-endian.
#[derive(Debug, Clone, Copy)]
pub struct BootSector {
    pub signature: [u8; 10],
    pub cluster_size: u32,
    pub cluster_count: u32,
    pub disk_size: u32,
    pub fat_count: u32,
    pub fat1_start_address: u32,
    pub data_start_address: u32,
    pub padding_size: u32,
}

impl BootSector {
    /// On-disk size in bytes of a serialized boot sector.
    pub const SIZE: usize = 10 + 4 * 7;

    /// Computes a fresh boot sector for a disk of `disk_size` bytes.
    ///
    /// Mirrors the original geometry formula exactly: cluster count is
    /// derived from the space left after the header, divided among a FAT
    /// entry (4 bytes) and a data cluster for each cluster; padding absorbs
    /// whatever doesn't divide evenly.
    pub fn new(disk_size: u32) -> Result<Self, FsError> {
        let free_space = (disk_size as u64).saturating_sub(Self::SIZE as u64);
        let cluster_count = (free_space / (4 + CLUSTER_SIZE as u64)) as u32;
        if cluster_count == 0 {
            return Err(FsError::OutOfSpace);
        }

        let fat_bytes_len = cluster_count as u64 * 4;
        let fat1_start_address = Self::SIZE as u32;
        let data_size = cluster_count as u64 * CLUSTER_SIZE as u64;
        let fat_tables_size = fat_bytes_len * FAT_COUNT as u64;
        let padding_size = free_space - (data_size + fat_tables_size);
        let fat_end_address = fat1_start_address as u64 + fat_bytes_len;
        let data_start_address = padding_size + fat_end_address;

        Ok(BootSector {
            signature: SIGNATURE,
            cluster_size: CLUSTER_SIZE as u32,
            cluster_count,
            disk_size,
            fat_count: FAT_COUNT,
            fat1_start_address,
            data_start_address: data_start_address as u32,
            padding_size: padding_size as u32,
        })
    }

    /// Length in bytes of the (single) FAT table.
    pub fn fat_bytes_len(&self) -> u32 {
        self.cluster_count * 4
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        let mut off = 0;
        buf[off..off + 10].copy_from_slice(&self.signature);
        off += 10;
        for field in [
            self.cluster_size,
            self.cluster_count,
            self.disk_size,
            self.fat_count,
            self.fat1_start_address,
            self.data_start_address,
            self.padding_size,
        ] {
            buf[off..off + 4].copy_from_slice(&field.to_le_bytes());
            off += 4;
        }
        buf
    }

    pub fn from_bytes(buf: &[u8; Self::SIZE]) -> Result<Self, FsError> {
        let mut signature = [0u8; 10];
        signature.copy_from_slice(&buf[0..10]);
        if signature != SIGNATURE {
            return Err(FsError::CorruptFs);
        }

        let u32_at = |off: usize| u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());

        let bs = BootSector {
            signature,
            cluster_size: u32_at(10),
            cluster_count: u32_at(14),
            disk_size: u32_at(18),
            fat_count: u32_at(22),
            fat1_start_address: u32_at(26),
            data_start_address: u32_at(30),
            padding_size: u32_at(34),
        };

        if bs.fat1_start_address != Self::SIZE as u32 {
            return Err(FsError::CorruptFs);
        }
        let expected_data_start = bs.fat1_start_address as u64
            + bs.fat_count as u64 * (4 * bs.cluster_count as u64)
            + bs.padding_size as u64;
        if bs.data_start_address as u64 != expected_data_start {
            return Err(FsError::CorruptFs);
        }

        Ok(bs)
    }

    pub fn write_to(&self, image: &mut Image) -> Result<(), FsError> {
        image.write_all_at(0, &self.to_bytes())
    }

    pub fn read_from(image: &mut Image) -> Result<Self, FsError> {
        let mut buf = [0u8; Self::SIZE];
        image.read_exact_at(0, &mut buf)?;
        Self::from_bytes(&buf)
    }

    /// Byte offset of cluster `cluster` in the data region.
    pub fn cluster_offset(&self, cluster: u32) -> u64 {
        self.data_start_address as u64 + cluster as u64 * self.cluster_size as u64
    }
}

impl fmt::Display for BootSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  ClusterSize: {}B", self.cluster_size)?;
        writeln!(f, "  ClusterCount: {}", self.cluster_count)?;
        writeln!(f, "  DiskSize: {}B", self.disk_size)?;
        writeln!(f, "  FatCount: {}", self.fat_count)?;
        writeln!(
            f,
            "  Fat1StartAddress: {}-{}",
            self.fat1_start_address,
            self.fat1_start_address + self.fat_bytes_len()
        )?;
        writeln!(f, "  PaddingSize: {}B", self.padding_size)?;
        write!(f, "  DataStartAddress: {}", self.data_start_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_round_trips_through_bytes() {
        let bs = BootSector::new(1_000_000).unwrap();
        let bytes = bs.to_bytes();
        let back = BootSector::from_bytes(&bytes).unwrap();
        assert_eq!(back.cluster_count, bs.cluster_count);
        assert_eq!(back.data_start_address, bs.data_start_address);
    }

    #[test]
    fn fat1_start_is_right_after_header() {
        let bs = BootSector::new(1_000_000).unwrap();
        assert_eq!(bs.fat1_start_address, BootSector::SIZE as u32);
    }

    #[test]
    fn data_start_accounts_for_fat_and_padding() {
        let bs = BootSector::new(1_000_000).unwrap();
        let expected =
            bs.fat1_start_address as u64 + bs.fat_bytes_len() as u64 + bs.padding_size as u64;
        assert_eq!(bs.data_start_address as u64, expected);
    }

    #[test]
    fn tiny_disk_cannot_hold_a_single_cluster() {
        let err = BootSector::new(BootSector::SIZE as u32 + 10).unwrap_err();
        assert!(matches!(err, FsError::OutOfSpace));
    }

    #[test]
    fn bad_signature_is_corrupt() {
        let bs = BootSector::new(1_000_000).unwrap();
        let mut bytes = bs.to_bytes();
        bytes[0] = b'X';
        let err = BootSector::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, FsError::CorruptFs));
    }
}
