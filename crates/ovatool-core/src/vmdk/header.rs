//! VMDK sparse extent header: the first 512-byte sector of every sparse
//! VMDK, monolithic or stream-optimized.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};

use super::sector::SECTOR_SIZE;

/// VMDK magic number, "KDMV" read as a little-endian u32.
pub const VMDK_MAGIC: u32 = 0x564D_444B;

/// End-of-line sentinel bytes used to detect FTP ASCII-mode corruption.
pub const EOL_SENTINEL: [u8; 4] = [0x0A, 0x20, 0x0D, 0x0A];

/// Flags for a stream-optimized output VMDK: new-line detection (bit 0),
/// compressed grains (bit 16), markers present (bit 17).
pub const STREAM_OPTIMIZED_FLAGS: u32 = 0x30001;

/// DEFLATE compression algorithm identifier.
pub const COMPRESS_ALGORITHM_DEFLATE: u16 = 1;

/// The sparse extent header, decoded from (or destined for) the first
/// sector of a VMDK file.
///
/// Layout matches VMware's published sparse extent header exactly: fields
/// are packed little-endian without padding, for a total of 512 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseHeader {
    pub magic_number: u32,
    pub version: u32,
    pub flags: u32,
    pub capacity: u64,
    pub grain_size: u64,
    pub descriptor_offset: u64,
    pub descriptor_size: u64,
    pub num_gtes_per_gt: u32,
    pub rgd_offset: u64,
    pub gd_offset: u64,
    pub over_head: u64,
    pub unclean_shutdown: u8,
    pub eol_sentinel: [u8; 4],
    pub compress_algorithm: u16,
}

impl SparseHeader {
    /// Decodes a `SparseHeader` from exactly 512 bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != SECTOR_SIZE as usize {
            return Err(Error::corrupt_header(format!(
                "sparse header must be {} bytes, got {}",
                SECTOR_SIZE,
                data.len()
            )));
        }

        let magic_number = u32::from_le_bytes(data[0..4].try_into().unwrap());
        let version = u32::from_le_bytes(data[4..8].try_into().unwrap());
        let flags = u32::from_le_bytes(data[8..12].try_into().unwrap());
        let capacity = u64::from_le_bytes(data[12..20].try_into().unwrap());
        let grain_size = u64::from_le_bytes(data[20..28].try_into().unwrap());
        let descriptor_offset = u64::from_le_bytes(data[28..36].try_into().unwrap());
        let descriptor_size = u64::from_le_bytes(data[36..44].try_into().unwrap());
        let num_gtes_per_gt = u32::from_le_bytes(data[44..48].try_into().unwrap());
        let rgd_offset = u64::from_le_bytes(data[48..56].try_into().unwrap());
        let gd_offset = u64::from_le_bytes(data[56..64].try_into().unwrap());
        let over_head = u64::from_le_bytes(data[64..72].try_into().unwrap());
        let unclean_shutdown = data[72];
        let eol_sentinel = [data[73], data[74], data[75], data[76]];
        let compress_algorithm = u16::from_le_bytes(data[77..79].try_into().unwrap());

        Ok(Self {
            magic_number,
            version,
            flags,
            capacity,
            grain_size,
            descriptor_offset,
            descriptor_size,
            num_gtes_per_gt,
            rgd_offset,
            gd_offset,
            over_head,
            unclean_shutdown,
            eol_sentinel,
            compress_algorithm,
        })
    }

    /// Encodes the header to exactly 512 bytes, little-endian, with the
    /// remaining 433 bytes zero-padded.
    pub fn to_bytes(self) -> [u8; SECTOR_SIZE as usize] {
        let mut buf = [0u8; SECTOR_SIZE as usize];
        buf[0..4].copy_from_slice(&self.magic_number.to_le_bytes());
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.flags.to_le_bytes());
        buf[12..20].copy_from_slice(&self.capacity.to_le_bytes());
        buf[20..28].copy_from_slice(&self.grain_size.to_le_bytes());
        buf[28..36].copy_from_slice(&self.descriptor_offset.to_le_bytes());
        buf[36..44].copy_from_slice(&self.descriptor_size.to_le_bytes());
        buf[44..48].copy_from_slice(&self.num_gtes_per_gt.to_le_bytes());
        buf[48..56].copy_from_slice(&self.rgd_offset.to_le_bytes());
        buf[56..64].copy_from_slice(&self.gd_offset.to_le_bytes());
        buf[64..72].copy_from_slice(&self.over_head.to_le_bytes());
        buf[72] = self.unclean_shutdown;
        buf[73..77].copy_from_slice(&self.eol_sentinel);
        buf[77..79].copy_from_slice(&self.compress_algorithm.to_le_bytes());
        // buf[79..512] stays zero: 433 bytes of padding.
        buf
    }

    /// Reads and decodes the header from the start of `reader`, without
    /// validating it. Leaves the stream positioned right after the header.
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; SECTOR_SIZE as usize];
        reader.read_exact(&mut buf)?;
        Self::from_bytes(&buf)
    }

    /// Validates that this header describes a monolithic-sparse (plain,
    /// uncompressed) VMDK suitable as transcoder input.
    pub fn validate_monolithic_sparse(&self) -> Result<()> {
        if self.magic_number != VMDK_MAGIC {
            return Err(Error::bad_magic(format!(
                "expected 0x{:08X}, got 0x{:08X}",
                VMDK_MAGIC, self.magic_number
            )));
        }
        if self.eol_sentinel != EOL_SENTINEL {
            return Err(Error::corrupt_header(format!(
                "end-of-line sentinels {:?} do not match expected {:?} \
                 (file may have been corrupted by FTP ASCII-mode transfer)",
                self.eol_sentinel, EOL_SENTINEL
            )));
        }
        if self.compress_algorithm != 0 {
            return Err(Error::unsupported_input(format!(
                "compressAlgorithm = {} (source must be uncompressed monolithic-sparse)",
                self.compress_algorithm
            )));
        }
        Ok(())
    }

    /// Number of grain directory entries covering `self.capacity` sectors.
    pub fn num_gd_entries(&self) -> u64 {
        let sectors_per_gt = self.grain_size * self.num_gtes_per_gt as u64;
        div_ceil(self.capacity, sectors_per_gt)
    }

    /// Builds the output header this transcoder writes, preserving every
    /// field not explicitly overridden for the stream-optimized format.
    pub fn as_stream_optimized(&self, capacity_new: u64) -> Self {
        Self {
            version: 3,
            flags: STREAM_OPTIMIZED_FLAGS,
            capacity: capacity_new,
            rgd_offset: 0,
            compress_algorithm: COMPRESS_ALGORITHM_DEFLATE,
            ..*self
        }
    }

    /// Returns a copy of this header with `gd_offset` replaced, used to
    /// build the footer once the grain directory's final position is known.
    pub fn with_gd_offset(self, gd_offset: u64) -> Self {
        Self { gd_offset, ..self }
    }
}

/// Ceiling integer division for the sector/grain-table arithmetic used
/// throughout the VMDK format.
pub fn div_ceil(numerator: u64, denominator: u64) -> u64 {
    (numerator + denominator - 1) / denominator
}
