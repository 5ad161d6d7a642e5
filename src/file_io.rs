//! Reads and writes a file's bytes across its cluster chain.
//!
//! The trailing cluster of a chain holds
//! `trailing = ((size - 1) mod ClusterSize) + 1` live bytes for `size > 0`
//! — a file whose size is an exact multiple of `ClusterSize` still uses a
//! full final cluster, never a zero-length write.

use crate::boot_sector::BootSector;
use crate::config::CLUSTER_SIZE;
use crate::error::FsError;
use crate::image::Image;

fn trailing_len(size: usize) -> usize {
    ((size - 1) % CLUSTER_SIZE) + 1
}

/// Writes `buffer` across `clusters`. An empty buffer is a no-op — the
/// caller is responsible for having allocated the (single) cluster.
pub fn write_file(
    image: &mut Image,
    boot: &BootSector,
    clusters: &[u32],
    buffer: &[u8],
) -> Result<(), FsError> {
    if buffer.is_empty() {
        return Ok(());
    }

    let last = clusters.len() - 1;
    for (i, &cluster) in clusters.iter().enumerate() {
        let start = i * CLUSTER_SIZE;
        let len = if i == last {
            trailing_len(buffer.len())
        } else {
            CLUSTER_SIZE
        };
        image.write_all_at(boot.cluster_offset(cluster), &buffer[start..start + len])?;
    }
    Ok(())
}

/// Reads exactly `size` bytes back out of `clusters`.
pub fn read_file(
    image: &mut Image,
    boot: &BootSector,
    clusters: &[u32],
    size: usize,
) -> Result<Vec<u8>, FsError> {
    if size == 0 {
        return Ok(Vec::new());
    }

    let mut out = vec![0u8; size];
    let last = clusters.len() - 1;
    for (i, &cluster) in clusters.iter().enumerate() {
        let start = i * CLUSTER_SIZE;
        let len = if i == last {
            trailing_len(size)
        } else {
            CLUSTER_SIZE
        };
        image.read_exact_at(boot.cluster_offset(cluster), &mut out[start..start + len])?;
    }
    Ok(out)
}
