//! Free-cluster allocation and cluster-chain algebra.

use crate::boot_sector::BootSector;
use crate::config::CLUSTER_SIZE;
use crate::error::FsError;
use crate::fat::{self, FatLabel};
use crate::image::Image;
use log::{debug, error, trace};

/// Scans the FAT from slot 0 and returns `n` free cluster indices.
///
/// In `contiguous` mode, a gap resets the accumulator: only a run of
/// consecutive free indices counts, and a discontinuity discards whatever
/// had been gathered so far rather than keeping a partial run around.
pub fn free_clusters(
    image: &mut Image,
    boot: &BootSector,
    n: u32,
    contiguous: bool,
) -> Result<Vec<u32>, FsError> {
    let mut found: Vec<u32> = Vec::new();

    for cluster in 0..boot.cluster_count {
        let label = fat::read_label(image, boot, cluster)?;
        if label != FatLabel::Unused {
            if contiguous {
                found.clear();
            }
            continue;
        }

        if contiguous {
            if let Some(&last) = found.last() {
                if cluster != last + 1 {
                    found.clear();
                }
            }
        }
        found.push(cluster);
        if found.len() as u32 == n {
            trace!("free_clusters: satisfied n={n} contiguous={contiguous} at {found:?}");
            return Ok(found);
        }
    }

    Err(FsError::OutOfSpace)
}

/// Chains `clusters[i] -> clusters[i+1]` and terminates the chain with
/// [`FatLabel::FileEnd`]. `clusters` must be non-empty.
pub fn make_chain(image: &mut Image, boot: &BootSector, clusters: &[u32]) -> Result<(), FsError> {
    assert!(!clusters.is_empty(), "make_chain requires at least one cluster");

    for pair in clusters.windows(2) {
        fat::write_label(image, boot, pair[0], FatLabel::Next(pair[1]))?;
    }
    fat::write_label(
        image,
        boot,
        *clusters.last().unwrap(),
        FatLabel::FileEnd,
    )?;
    debug!("make_chain: {clusters:?}");
    Ok(())
}

/// Writes `label` into every listed slot. Used with [`FatLabel::Unused`]
/// to free a chain.
pub fn label_chain(
    image: &mut Image,
    boot: &BootSector,
    clusters: &[u32],
    label: FatLabel,
) -> Result<(), FsError> {
    for &c in clusters {
        fat::write_label(image, boot, c, label)?;
    }
    Ok(())
}

/// Walks the chain starting at `start`, expecting exactly
/// `ceil(file_size / ClusterSize)` clusters (minimum 1), terminating at
/// [`FatLabel::FileEnd`]. Any sentinel or out-of-range label seen before
/// the expected length, or a walk that doesn't end exactly on time, is
/// [`FsError::CorruptFs`].
pub fn chain_from(
    image: &mut Image,
    boot: &BootSector,
    start: u32,
    file_size: u32,
) -> Result<Vec<u32>, FsError> {
    let expected_len = (file_size as usize).div_ceil(CLUSTER_SIZE).max(1);

    let mut chain = Vec::with_capacity(expected_len);
    let mut current = start;

    for i in 0..expected_len {
        chain.push(current);
        let label = fat::read_label(image, boot, current)?;
        let is_last = i + 1 == expected_len;
        trace!("chain_from: cluster={current} label={label:?} is_last={is_last}");

        match (label, is_last) {
            (FatLabel::FileEnd, true) => {}
            (FatLabel::Next(next), false) => current = next,
            _ => {
                error!(
                    "chain_from: unexpected label {label:?} at cluster {current} (expected_len={expected_len})"
                );
                return Err(FsError::CorruptFs);
            }
        }
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fresh_image;

    #[test]
    fn free_clusters_picks_lowest_indices_first() {
        let (mut image, boot) = fresh_image(256 * 1024);
        fat::wipe(&mut image, &boot, 0, boot.cluster_count).unwrap();
        fat::write_label(&mut image, &boot, 0, FatLabel::FileEnd).unwrap();

        let got = free_clusters(&mut image, &boot, 3, false).unwrap();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn contiguous_mode_discards_partial_run_on_gap() {
        let (mut image, boot) = fresh_image(256 * 1024);
        fat::wipe(&mut image, &boot, 0, boot.cluster_count).unwrap();
        // cluster 2 is occupied, breaking any run that includes it.
        fat::write_label(&mut image, &boot, 2, FatLabel::FileEnd).unwrap();

        let got = free_clusters(&mut image, &boot, 3, true).unwrap();
        assert_eq!(got, vec![3, 4, 5]);
    }

    #[test]
    fn free_clusters_fails_when_not_enough_space() {
        let (mut image, boot) = fresh_image(256 * 1024);
        fat::wipe(&mut image, &boot, 0, boot.cluster_count).unwrap();
        let err = free_clusters(&mut image, &boot, boot.cluster_count + 1, false).unwrap_err();
        assert!(matches!(err, FsError::OutOfSpace));
    }

    #[test]
    fn make_chain_then_chain_from_round_trips() {
        let (mut image, boot) = fresh_image(256 * 1024);
        fat::wipe(&mut image, &boot, 0, boot.cluster_count).unwrap();

        make_chain(&mut image, &boot, &[1, 2, 3]).unwrap();
        let size = 2 * CLUSTER_SIZE as u32 + 1;
        let chain = chain_from(&mut image, &boot, 1, size).unwrap();
        assert_eq!(chain, vec![1, 2, 3]);
    }

    #[test]
    fn chain_from_detects_premature_end() {
        let (mut image, boot) = fresh_image(256 * 1024);
        fat::wipe(&mut image, &boot, 0, boot.cluster_count).unwrap();
        fat::write_label(&mut image, &boot, 1, FatLabel::FileEnd).unwrap();

        let size = 2 * CLUSTER_SIZE as u32;
        let err = chain_from(&mut image, &boot, 1, size).unwrap_err();
        assert!(matches!(err, FsError::CorruptFs));
    }

    #[test]
    fn label_chain_frees_a_whole_chain() {
        let (mut image, boot) = fresh_image(256 * 1024);
        fat::wipe(&mut image, &boot, 0, boot.cluster_count).unwrap();
        make_chain(&mut image, &boot, &[4, 5]).unwrap();

        label_chain(&mut image, &boot, &[4, 5], FatLabel::Unused).unwrap();
        assert_eq!(fat::read_label(&mut image, &boot, 4).unwrap(), FatLabel::Unused);
        assert_eq!(fat::read_label(&mut image, &boot, 5).unwrap(), FatLabel::Unused);
    }
}
