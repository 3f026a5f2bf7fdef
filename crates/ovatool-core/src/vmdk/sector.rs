//! Sector codec: fixed-width integer packing, sector padding, and marker
//! construction shared by every other VMDK module.
//!
//! All integers in a VMDK are little-endian; everything here packs or
//! unpacks bytes with `to_le_bytes`/`from_le_bytes` rather than reaching for
//! a derive-based binary codec, matching the rest of this crate.

use crate::error::{Error, Result};

/// Size of a VMDK sector in bytes.
pub const SECTOR_SIZE: u64 = 512;

/// Marker types that precede grain table, grain directory, and footer
/// regions in a stream-optimized VMDK. A grain marker has no type field of
/// its own; it is distinguished by a non-zero `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MarkerType {
    /// End-of-stream marker.
    EndOfStream = 0,
    /// Grain table marker.
    GrainTable = 1,
    /// Grain directory marker.
    GrainDirectory = 2,
    /// Footer marker.
    Footer = 3,
}

/// Pads `bytes` with zeroes up to the next 512-byte boundary.
///
/// Returns `bytes` unchanged if its length is already a multiple of 512
/// (including zero).
pub fn pad_to_sector(mut bytes: Vec<u8>) -> Vec<u8> {
    let remainder = bytes.len() % SECTOR_SIZE as usize;
    if remainder != 0 {
        bytes.resize(bytes.len() + (SECTOR_SIZE as usize - remainder), 0);
    }
    bytes
}

/// Builds a 512-byte control marker: `{u64 size_sectors, u32 0, u32 type}`
/// followed by 496 zero bytes.
///
/// `size_sectors` is the size, in sectors, of the entity that follows the
/// marker (the grain table, grain directory, or footer header). It is
/// always 0 for the end-of-stream marker.
pub fn make_control_marker(marker_type: MarkerType, size_sectors: u64) -> [u8; SECTOR_SIZE as usize] {
    let mut buf = [0u8; SECTOR_SIZE as usize];
    buf[0..8].copy_from_slice(&size_sectors.to_le_bytes());
    // bytes 8..12 (size) stay zero for control markers.
    buf[12..16].copy_from_slice(&(marker_type as u32).to_le_bytes());
    buf
}

/// Builds a grain marker: `{u64 lba, u32 len(compressed)}` followed by the
/// compressed payload, then padded to a sector boundary.
///
/// `lba` is the logical block address (in sectors) of the grain in the
/// virtual disk, not its offset in the output file.
pub fn make_grain_marker(lba: u64, compressed: &[u8]) -> Result<Vec<u8>> {
    // 12-byte header + payload must fit in the marker's u32 size field.
    if compressed.len() as u64 > u64::from(u32::MAX) - 12 {
        return Err(Error::internal_alignment(format!(
            "compressed grain payload ({} bytes) exceeds the maximum a grain marker can address",
            compressed.len()
        )));
    }

    let mut buf = Vec::with_capacity(12 + compressed.len());
    buf.extend_from_slice(&lba.to_le_bytes());
    buf.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    buf.extend_from_slice(compressed);
    Ok(pad_to_sector(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_to_sector_empty_stays_empty() {
        assert_eq!(pad_to_sector(Vec::new()), Vec::<u8>::new());
    }

    #[test]
    fn pad_to_sector_pads_up_to_boundary() {
        let input = vec![1u8, 2, 3];
        let padded = pad_to_sector(input.clone());
        assert_eq!(padded.len() % SECTOR_SIZE as usize, 0);
        assert!(padded.starts_with(&input));
    }

    #[test]
    fn pad_to_sector_exact_multiple_unchanged() {
        let input = vec![7u8; SECTOR_SIZE as usize * 2];
        assert_eq!(pad_to_sector(input.clone()), input);
    }

    #[test]
    fn pad_to_sector_is_idempotent() {
        let input = vec![9u8; 100];
        let once = pad_to_sector(input.clone());
        let twice = pad_to_sector(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn control_marker_is_exactly_one_sector() {
        let marker = make_control_marker(MarkerType::GrainTable, 4);
        assert_eq!(marker.len(), SECTOR_SIZE as usize);
    }

    #[test]
    fn control_marker_round_trips_fields() {
        let marker = make_control_marker(MarkerType::GrainDirectory, 17);
        let size_sectors = u64::from_le_bytes(marker[0..8].try_into().unwrap());
        let size = u32::from_le_bytes(marker[8..12].try_into().unwrap());
        let marker_type = u32::from_le_bytes(marker[12..16].try_into().unwrap());
        assert_eq!(size_sectors, 17);
        assert_eq!(size, 0);
        assert_eq!(marker_type, MarkerType::GrainDirectory as u32);
        assert!(marker[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn grain_marker_packs_lba_and_payload() {
        let payload = b"hello world";
        let marker = make_grain_marker(128, payload).unwrap();
        assert_eq!(marker.len() % SECTOR_SIZE as usize, 0);

        let lba = u64::from_le_bytes(marker[0..8].try_into().unwrap());
        let size = u32::from_le_bytes(marker[8..12].try_into().unwrap());
        assert_eq!(lba, 128);
        assert_eq!(size as usize, payload.len());
        assert_eq!(&marker[12..12 + payload.len()], payload);
    }
}
