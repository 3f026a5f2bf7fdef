//! Descriptor renderer: builds the embedded text descriptor block for a
//! stream-optimized VMDK.
//!
//! Unlike a hosted sparse or flat VMDK, a stream-optimized VMDK never
//! references an external descriptor file — the whole disk, descriptor
//! included, is one self-contained stream. This module only *renders* that
//! block; nothing reads it back.

use uuid::Uuid;

use super::sector::pad_to_sector;
use crate::vmdk::header::div_ceil;

/// Sectors per cylinder in the CHS geometry this descriptor advertises
/// (63 sectors/track * 255 heads, the VMware default for large disks).
const SECTORS_PER_CYLINDER: u64 = 63 * 255;

/// Renders the descriptor block for a disk of `capacity_sectors`, zero-padded
/// to a sector boundary.
///
/// `cid` and `long_cid` only need to be unique per invocation; see
/// [`random_cid`] and [`random_long_cid`], which this delegates to.
pub fn render(capacity_sectors: u64) -> Vec<u8> {
    render_with(capacity_sectors, random_cid(), &random_long_cid())
}

/// Renders the descriptor block with explicit `cid`/`long_cid` values, for
/// deterministic testing.
pub fn render_with(capacity_sectors: u64, cid: u32, long_cid: &str) -> Vec<u8> {
    let cylinders = div_ceil(capacity_sectors, SECTORS_PER_CYLINDER);

    let text = format!(
        "# Disk Descriptor File\n\
         version=1\n\
         CID={cid:08x}\n\
         parentCID=ffffffff\n\
         createType=\"streamOptimized\"\n\
         \n\
         # Extent description\n\
         RDONLY {capacity_sectors} SPARSE \"stream-optimized.vmdk\"\n\
         \n\
         # The Disk Data Base\n\
         #DDB\n\
         \n\
         ddb.adapterType = \"ide\"\n\
         # {capacity_sectors} / 63 / 255\n\
         ddb.geometry.cylinders = \"{cylinders}\"\n\
         ddb.geometry.heads = \"255\"\n\
         ddb.geometry.sectors = \"63\"\n\
         ddb.longContentID = \"{long_cid}\"\n\
         ddb.virtualHWVersion = \"7\"",
    );

    pad_to_sector(text.into_bytes())
}

/// A random 32-bit content ID in `[1, 0xFFFFFFFF]`, derived from a fresh
/// UUID v4 rather than pulling in a separate RNG crate.
pub fn random_cid() -> u32 {
    let bytes = Uuid::new_v4().into_bytes();
    let raw = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
    raw.max(1)
}

/// A fresh 32-hex-digit identifier (a UUID v4 with hyphens removed).
pub fn random_long_cid() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_pads_to_sector_boundary() {
        let block = render_with(204800, 0xdead_beef, "0123456789abcdef0123456789abcdef");
        assert_eq!(block.len() % 512, 0);
    }

    #[test]
    fn render_is_idempotent_under_padding() {
        let long_cid = "0".repeat(32);
        let once = render_with(204800, 1, &long_cid);
        let twice = pad_to_sector(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn render_contains_expected_fields() {
        let block = render_with(204800, 0x0000_0001, "abcdefabcdefabcdefabcdefabcdefab");
        let text = String::from_utf8(block).unwrap();
        let text = text.trim_end_matches('\0');

        assert!(text.starts_with("# Disk Descriptor File\n"));
        assert!(text.contains("CID=00000001\n"));
        assert!(text.contains("parentCID=ffffffff\n"));
        assert!(text.contains("createType=\"streamOptimized\"\n"));
        assert!(text.contains("RDONLY 204800 SPARSE \"stream-optimized.vmdk\"\n"));
        assert!(text.contains("ddb.adapterType = \"ide\"\n"));
        assert!(text.contains("ddb.geometry.heads = \"255\"\n"));
        assert!(text.contains("ddb.geometry.sectors = \"63\"\n"));
        assert!(text.contains("ddb.longContentID = \"abcdefabcdefabcdefabcdefabcdefab\"\n"));
        assert!(text.contains("ddb.virtualHWVersion = \"7\""));
    }

    #[test]
    fn cylinders_rounds_up() {
        // 63*255 = 16065 sectors/cylinder; one sector over one cylinder
        // should round up to 2 cylinders.
        let long_cid = "0".repeat(32);
        let block = render_with(16065 + 1, 1, &long_cid);
        let text = String::from_utf8(block).unwrap();
        assert!(text.contains("ddb.geometry.cylinders = \"2\""));
    }

    #[test]
    fn random_cid_is_never_zero() {
        for _ in 0..64 {
            assert_ne!(random_cid(), 0);
        }
    }

    #[test]
    fn random_long_cid_is_32_hex_digits() {
        let long_cid = random_long_cid();
        assert_eq!(long_cid.len(), 32);
        assert!(long_cid.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
