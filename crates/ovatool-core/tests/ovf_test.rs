//! Integration tests for OVF envelope generation against the public API.

use ovatool_core::ovf::{build, OvfParams};

fn sample_params() -> OvfParams {
    OvfParams {
        name: "TestVM".to_string(),
        cpus: 4,
        memsize_mb: 8192,
        disksize_gib: 20,
        vmdk_file_size: 99_999,
    }
}

#[test]
fn envelope_is_well_formed_and_namespaced() {
    let xml = build(&sample_params()).unwrap();

    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<Envelope"));
    assert!(xml.contains("xmlns=\"http://schemas.dmtf.org/ovf/envelope/1\""));
    assert!(xml.contains("xmlns:rasd=\"http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_ResourceAllocationSettingData\""));
    assert!(xml.contains("xmlns:vssd="));
    assert!(xml.contains("xmlns:vmw=\"http://www.vmware.com/schema/ovf\""));
    assert!(xml.contains("xmlns:xsi="));
    assert!(xml.ends_with("</Envelope>"));
}

#[test]
fn disk_section_describes_one_stream_optimized_disk() {
    let xml = build(&sample_params()).unwrap();
    assert!(xml.contains("<DiskSection>"));
    assert!(xml.contains("ovf:diskId=\"vmdisk1\""));
    assert!(xml.contains("ovf:capacity=\"20\""));
    assert!(xml.contains("ovf:fileRef=\"file1\""));
    assert!(xml.contains("vmdk.html#streamOptimized"));
}

#[test]
fn references_point_at_the_drive_file() {
    let xml = build(&sample_params()).unwrap();
    assert!(xml.contains("ovf:href=\"TestVM-drive.vmdk\""));
    assert!(xml.contains("ovf:size=\"99999\""));
}

#[test]
fn virtual_hardware_reflects_requested_cpu_and_memory() {
    let xml = build(&sample_params()).unwrap();
    assert!(xml.contains("4 virtual CPU(s)"));
    assert!(xml.contains("8192MB of memory"));
}

#[test]
fn virtual_hardware_includes_fixed_ide_video_and_network_profile() {
    let xml = build(&sample_params()).unwrap();
    assert!(xml.contains("ideController0"));
    assert!(xml.contains("ideController1"));
    assert!(xml.contains("VirtualVideoCard"));
    assert!(xml.contains("VmxNet3"));
    assert!(xml.contains("<NetworkSection>"));
    assert!(xml.contains("ovf:name=\"VM Network\""));
}

#[test]
fn zero_cpu_and_memory_still_render_valid_items() {
    let params = OvfParams {
        cpus: 0,
        memsize_mb: 0,
        ..sample_params()
    };
    let xml = build(&params).unwrap();
    assert!(xml.contains("0 virtual CPU(s)"));
    assert!(xml.contains("0MB of memory"));
}
