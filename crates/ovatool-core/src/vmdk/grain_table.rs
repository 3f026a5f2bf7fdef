//! Grain directory / grain table loader.
//!
//! Follows a parsed [`SparseHeader`]'s grain directory to load every grain
//! table for the source disk into memory, in grain-directory order. The
//! returned grain tables are exactly what the stream transcoder walks to
//! decide which grains are present.

use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;

use super::header::SparseHeader;
use super::sector::SECTOR_SIZE;

/// Loads every grain table referenced by `header`'s grain directory.
///
/// Grain directory entries that are zero (an unallocated grain table) are
/// materialized as an all-zero grain table of `num_gtes_per_gt` entries,
/// rather than being skipped — callers need one entry per directory slot to
/// preserve LBA alignment.
pub fn load_grain_tables<R: Read + Seek>(
    reader: &mut R,
    header: &SparseHeader,
) -> Result<Vec<Vec<u32>>> {
    let total_gts = header.num_gd_entries();
    let gtes_per_gt = header.num_gtes_per_gt as usize;

    reader.seek(SeekFrom::Start(header.gd_offset * SECTOR_SIZE))?;
    let mut gd_bytes = vec![0u8; total_gts as usize * 4];
    reader.read_exact(&mut gd_bytes)?;

    let gdes: Vec<u32> = gd_bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
        .collect();

    let mut grain_tables = Vec::with_capacity(gdes.len());
    for gde in gdes {
        if gde == 0 {
            grain_tables.push(vec![0u32; gtes_per_gt]);
            continue;
        }

        reader.seek(SeekFrom::Start(u64::from(gde) * SECTOR_SIZE))?;
        let mut gt_bytes = vec![0u8; gtes_per_gt * 4];
        reader.read_exact(&mut gt_bytes)?;

        let gtes: Vec<u32> = gt_bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        grain_tables.push(gtes);
    }

    Ok(grain_tables)
}
