//! Integration tests for OVA archive creation against the public API.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use ovatool_core::ova::{default_output_path, run_convert, ConvertOptions};

/// Builds a minimal monolithic-sparse VMDK fixture: one grain table, one
/// populated grain, capacity small enough to resize down to 1 GiB.
fn write_fixture_vmdk(path: &std::path::Path) {
    const SECTOR_SIZE: u64 = 512;
    const GRAIN_SIZE: u64 = 128;
    const GTES_PER_GT: u32 = 512;
    const EOL_SENTINEL: [u8; 4] = [0x0A, 0x20, 0x0D, 0x0A];
    const VMDK_MAGIC: u32 = 0x564D_444B;

    let capacity = GRAIN_SIZE * 4;
    let over_head = 20u64;
    let mut buf = vec![0u8; (over_head * SECTOR_SIZE) as usize];

    let grain_offset_sectors = over_head;
    let mut grain = vec![0u8; (GRAIN_SIZE * SECTOR_SIZE) as usize];
    grain[0..4].copy_from_slice(b"fix1");
    buf.extend_from_slice(&grain);

    let gt_offset_sectors = buf.len() as u64 / SECTOR_SIZE;
    let mut gtes = vec![0u32; GTES_PER_GT as usize];
    gtes[0] = grain_offset_sectors as u32;
    for gte in &gtes {
        buf.extend_from_slice(&gte.to_le_bytes());
    }
    while buf.len() % SECTOR_SIZE as usize != 0 {
        buf.push(0);
    }

    let gd_offset_sectors = buf.len() as u64 / SECTOR_SIZE;
    buf.extend_from_slice(&(gt_offset_sectors as u32).to_le_bytes());
    while buf.len() % SECTOR_SIZE as usize != 0 {
        buf.push(0);
    }

    let mut header = [0u8; SECTOR_SIZE as usize];
    header[0..4].copy_from_slice(&VMDK_MAGIC.to_le_bytes());
    header[4..8].copy_from_slice(&1u32.to_le_bytes()); // version
    header[8..12].copy_from_slice(&3u32.to_le_bytes()); // flags
    header[12..20].copy_from_slice(&capacity.to_le_bytes());
    header[20..28].copy_from_slice(&GRAIN_SIZE.to_le_bytes());
    header[28..36].copy_from_slice(&1u64.to_le_bytes()); // descriptorOffset
    header[36..44].copy_from_slice(&19u64.to_le_bytes()); // descriptorSize
    header[44..48].copy_from_slice(&GTES_PER_GT.to_le_bytes());
    header[48..56].copy_from_slice(&0u64.to_le_bytes()); // rgdOffset
    header[56..64].copy_from_slice(&gd_offset_sectors.to_le_bytes());
    header[64..72].copy_from_slice(&over_head.to_le_bytes());
    header[72] = 0; // uncleanShutdown
    header[73..77].copy_from_slice(&EOL_SENTINEL);
    header[77..79].copy_from_slice(&0u16.to_le_bytes()); // compressAlgorithm

    buf[0..SECTOR_SIZE as usize].copy_from_slice(&header);
    fs::write(path, buf).unwrap();
}

fn read_tar_entries(path: &std::path::Path) -> Vec<(String, Vec<u8>)> {
    let data = fs::read(path).unwrap();
    let mut archive = tar::Archive::new(data.as_slice());
    let mut entries = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        entries.push((name, content));
    }
    entries
}

#[test]
fn convert_produces_an_ovf_then_drive_vmdk_archive() {
    let dir = tempfile::tempdir().unwrap();
    let vmdk_path = dir.path().join("MyVM.vmdk");
    write_fixture_vmdk(&vmdk_path);

    let output_ova = dir.path().join("MyVM.ova");
    let options = ConvertOptions {
        source_vmdk: vmdk_path,
        output_ova: output_ova.clone(),
        cpus: 2,
        memsize_mb: 2048,
        disksize_gib: 1,
        name: None,
    };
    run_convert(&options).unwrap();

    let entries = read_tar_entries(&output_ova);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0, "MyVM.ovf");
    assert!(String::from_utf8_lossy(&entries[0].1).contains("<Envelope"));
    assert_eq!(entries[1].0, "MyVM-drive.vmdk");
    assert_eq!(entries[1].1[0..4], [0x4B, 0x44, 0x4D, 0x56]); // "KDMV" little-endian
}

#[test]
fn convert_honors_an_explicit_name_override() {
    let dir = tempfile::tempdir().unwrap();
    let vmdk_path = dir.path().join("source.vmdk");
    write_fixture_vmdk(&vmdk_path);

    let output_ova = dir.path().join("out.ova");
    let options = ConvertOptions {
        source_vmdk: vmdk_path,
        output_ova: output_ova.clone(),
        cpus: 1,
        memsize_mb: 1024,
        disksize_gib: 1,
        name: Some("CustomName".to_string()),
    };
    run_convert(&options).unwrap();

    let entries = read_tar_entries(&output_ova);
    assert_eq!(entries[0].0, "CustomName.ovf");
    assert_eq!(entries[1].0, "CustomName-drive.vmdk");
}

#[test]
fn convert_fails_and_leaves_no_output_on_bad_magic() {
    let dir = tempfile::tempdir().unwrap();
    let vmdk_path = dir.path().join("bad.vmdk");
    fs::write(&vmdk_path, vec![0u8; 512]).unwrap();

    let output_ova = dir.path().join("bad.ova");
    let options = ConvertOptions {
        source_vmdk: vmdk_path,
        output_ova,
        cpus: 1,
        memsize_mb: 1024,
        disksize_gib: 1,
        name: None,
    };
    let err = run_convert(&options).unwrap_err();
    assert!(err.to_string().starts_with("BadMagic"));
}

#[test]
fn default_output_path_is_derived_from_vmdk_stem() {
    let path = default_output_path(&PathBuf::from("/tmp/appliance.vmdk"));
    assert_eq!(path, PathBuf::from("/tmp/appliance.ova"));
}
