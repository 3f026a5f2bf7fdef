//! OVF descriptor generation.
//!
//! Builds the OVF (Open Virtualization Format) XML envelope that
//! accompanies the transcoded VMDK inside an OVA archive: one disk, one IDE
//! controller, a video card, and an Ethernet adapter, matching the fixed
//! virtual hardware profile this tool always produces.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::Result;

const NS_OVF: &str = "http://schemas.dmtf.org/ovf/envelope/1";
const NS_RASD: &str = "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_ResourceAllocationSettingData";
const NS_VMW: &str = "http://www.vmware.com/schema/ovf";
const NS_VSSD: &str = "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_VirtualSystemSettingData";
const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const NS_CIM: &str = "http://schemas.dmtf.org/wbem/wscim/1/common";

/// Parameters needed to render the OVF envelope. One virtual disk, always.
#[derive(Debug, Clone)]
pub struct OvfParams {
    /// Virtual system / file name, sanitized for use as an id and as a
    /// filename stem.
    pub name: String,
    /// Number of virtual CPUs.
    pub cpus: u32,
    /// Memory size in MB.
    pub memsize_mb: u32,
    /// Advertised disk capacity in GiB (the resize target passed to the
    /// transcoder, not the transcoded file's size on disk).
    pub disksize_gib: u64,
    /// Byte size of the transcoded `<name>-drive.vmdk` file, for the
    /// `ovf:size` attribute on its `File` reference.
    pub vmdk_file_size: u64,
}

/// Builds the OVF envelope XML for `params`, as a UTF-8 string with an XML
/// declaration.
pub fn build(params: &OvfParams) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut envelope = BytesStart::new("Envelope");
    envelope.push_attribute(("xmlns", NS_OVF));
    envelope.push_attribute(("xmlns:cim", NS_CIM));
    envelope.push_attribute(("xmlns:ovf", NS_OVF));
    envelope.push_attribute(("xmlns:rasd", NS_RASD));
    envelope.push_attribute(("xmlns:vmw", NS_VMW));
    envelope.push_attribute(("xmlns:vssd", NS_VSSD));
    envelope.push_attribute(("xmlns:xsi", NS_XSI));
    envelope.push_attribute(("vmw:buildId", "build-2494585"));
    writer.write_event(Event::Start(envelope))?;

    write_references(&mut writer, params)?;
    write_disk_section(&mut writer, params)?;
    write_network_section(&mut writer)?;
    write_virtual_system(&mut writer, params)?;

    writer.write_event(Event::End(BytesEnd::new("Envelope")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_references<W: std::io::Write>(writer: &mut Writer<W>, params: &OvfParams) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("References")))?;

    let mut file = BytesStart::new("File");
    file.push_attribute(("ovf:href", format!("{}-drive.vmdk", params.name).as_str()));
    file.push_attribute(("ovf:id", "file1"));
    file.push_attribute(("ovf:size", params.vmdk_file_size.to_string().as_str()));
    writer.write_event(Event::Empty(file))?;

    writer.write_event(Event::End(BytesEnd::new("References")))?;
    Ok(())
}

fn write_disk_section<W: std::io::Write>(writer: &mut Writer<W>, params: &OvfParams) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("DiskSection")))?;
    write_text(writer, "Info", "Virtual disk information")?;

    let mut disk = BytesStart::new("Disk");
    disk.push_attribute(("ovf:capacity", params.disksize_gib.to_string().as_str()));
    disk.push_attribute(("ovf:capacityAllocationUnits", "byte * 2^30"));
    disk.push_attribute(("ovf:diskId", "vmdisk1"));
    disk.push_attribute(("ovf:fileRef", "file1"));
    disk.push_attribute((
        "ovf:format",
        "http://www.vmware.com/interfaces/specifications/vmdk.html#streamOptimized",
    ));
    writer.write_event(Event::Empty(disk))?;

    writer.write_event(Event::End(BytesEnd::new("DiskSection")))?;
    Ok(())
}

fn write_network_section<W: std::io::Write>(writer: &mut Writer<W>) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("NetworkSection")))?;
    write_text(writer, "Info", "The list of logical networks")?;

    let mut network = BytesStart::new("Network");
    network.push_attribute(("ovf:name", "VM Network"));
    writer.write_event(Event::Start(network))?;
    write_text(writer, "Description", "The VM Network network")?;
    writer.write_event(Event::End(BytesEnd::new("Network")))?;

    writer.write_event(Event::End(BytesEnd::new("NetworkSection")))?;
    Ok(())
}

fn write_virtual_system<W: std::io::Write>(writer: &mut Writer<W>, params: &OvfParams) -> Result<()> {
    let mut vs = BytesStart::new("VirtualSystem");
    vs.push_attribute(("ovf:id", params.name.as_str()));
    writer.write_event(Event::Start(vs))?;

    write_text(writer, "Info", "A virtual machine")?;
    write_text(writer, "Name", &params.name)?;

    let mut oss = BytesStart::new("OperatingSystemSection");
    oss.push_attribute(("ovf:id", "78"));
    oss.push_attribute(("vmw:osType", "freebsd64Guest"));
    writer.write_event(Event::Start(oss))?;
    write_text(writer, "Info", "The kind of installed guest operating system")?;
    writer.write_event(Event::End(BytesEnd::new("OperatingSystemSection")))?;

    writer.write_event(Event::Start(BytesStart::new("ProductSection")))?;
    write_text(writer, "Info", "Information about the installed software")?;
    write_text(writer, "Product", "")?;
    write_text(writer, "Vendor", "")?;
    write_text(writer, "Version", "")?;
    writer.write_event(Event::End(BytesEnd::new("ProductSection")))?;

    write_virtual_hardware_section(writer, params)?;

    writer.write_event(Event::End(BytesEnd::new("VirtualSystem")))?;
    Ok(())
}

/// Running `Item`/`Config` instance id counter, mirroring the sequential
/// `InstanceID` numbering of the original hardware section.
struct Instances(u32);

impl Instances {
    fn next(&mut self) -> u32 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

fn write_virtual_hardware_section<W: std::io::Write>(
    writer: &mut Writer<W>,
    params: &OvfParams,
) -> Result<()> {
    let mut instances = Instances(0);

    writer.write_event(Event::Start(BytesStart::new("VirtualHardwareSection")))?;
    write_text(writer, "Info", "Virtual hardware requirements")?;

    writer.write_event(Event::Start(BytesStart::new("System")))?;
    write_text(writer, "vssd:ElementName", "Virtual Hardware Family")?;
    write_text(writer, "vssd:InstanceID", &instances.next().to_string())?;
    write_text(writer, "vssd:VirtualSystemIdentifier", &params.name)?;
    write_text(writer, "vssd:VirtualSystemType", "vmx-08")?;
    writer.write_event(Event::End(BytesEnd::new("System")))?;

    write_item(
        writer,
        &mut instances,
        ItemSpec {
            name: &format!("{} virtual CPU(s)", params.cpus),
            description: "Number of Virtual CPUs",
            resource_type: Some(3),
            resource_subtype: None,
            units: Some("hertz * 10^6"),
            quantity: Some(params.cpus.to_string()),
            address: None,
            automatic_allocation: None,
            parent: None,
            address_on_parent: None,
            host_resource: None,
            required_false: false,
            configs: &[],
        },
    )?;

    write_item(
        writer,
        &mut instances,
        ItemSpec {
            name: &format!("{}MB of memory", params.memsize_mb),
            description: "Memory Size",
            resource_type: Some(4),
            resource_subtype: None,
            units: Some("byte * 2^20"),
            quantity: Some(params.memsize_mb.to_string()),
            address: None,
            automatic_allocation: None,
            parent: None,
            address_on_parent: None,
            host_resource: None,
            required_false: false,
            configs: &[],
        },
    )?;

    let storage_controller_id = instances.0;
    write_item(
        writer,
        &mut instances,
        ItemSpec {
            name: "ideController0",
            description: "IDE Controller",
            resource_type: Some(5),
            resource_subtype: Some("PIIX4"),
            units: None,
            quantity: None,
            address: Some("0".to_string()),
            automatic_allocation: None,
            parent: None,
            address_on_parent: None,
            host_resource: None,
            required_false: false,
            configs: &[],
        },
    )?;

    write_item(
        writer,
        &mut instances,
        ItemSpec {
            name: "ideController1",
            description: "IDE Controller",
            resource_type: Some(5),
            resource_subtype: Some("PIIX4"),
            units: None,
            quantity: None,
            address: Some("0".to_string()),
            automatic_allocation: None,
            parent: None,
            address_on_parent: None,
            host_resource: None,
            required_false: false,
            configs: &[],
        },
    )?;

    write_item(
        writer,
        &mut instances,
        ItemSpec {
            name: "VirtualVideoCard",
            description: "Virtual Video Card",
            resource_type: Some(24),
            resource_subtype: None,
            units: None,
            quantity: None,
            address: None,
            automatic_allocation: Some("false"),
            parent: None,
            address_on_parent: None,
            host_resource: None,
            required_false: true,
            configs: &[
                ("enable3DSupport", "false"),
                ("enableMPTSupport", "false"),
                ("use3dRenderer", "automatic"),
                ("useAutoDetect", "false"),
                ("videoRamSizeInKB", "4096"),
            ],
        },
    )?;

    write_item(
        writer,
        &mut instances,
        ItemSpec {
            name: "Hard Disk 1",
            description: "Hard Disk",
            resource_type: Some(17),
            resource_subtype: None,
            units: None,
            quantity: None,
            address: None,
            automatic_allocation: None,
            parent: Some(storage_controller_id.to_string()),
            address_on_parent: Some("0".to_string()),
            host_resource: Some("ovf:/disk/vmdisk1".to_string()),
            required_false: false,
            configs: &[("backing.writeThrough", "false")],
        },
    )?;

    write_item(
        writer,
        &mut instances,
        ItemSpec {
            name: "Ethernet 1",
            description: "VmxNet3 ethernet adapter on \"VM Network\"",
            resource_type: Some(10),
            resource_subtype: Some("VmxNet3"),
            units: None,
            quantity: None,
            address: None,
            automatic_allocation: Some("true"),
            parent: None,
            address_on_parent: Some("7".to_string()),
            host_resource: None,
            required_false: false,
            configs: &[
                ("slotInfo.pciSlotNumber", "160"),
                ("wakeOnLanEnabled", "true"),
            ],
        },
    )?;

    for (key, value) in [
        ("cpuHotAddEnabled", "false"),
        ("cpuHotRemoveEnabled", "false"),
        ("firmware", "bios"),
        ("virtualICH7MPresent", "false"),
        ("virtualSMCPresent", "false"),
        ("memoryHotAddEnabled", "false"),
        ("nestedHVEnabled", "false"),
        ("powerOpInfo.powerOffType", "soft"),
        ("powerOpInfo.resetType", "soft"),
        ("powerOpInfo.standbyAction", "checkpoint"),
        ("powerOpInfo.suspendType", "hard"),
        ("tools.afterPowerOn", "true"),
        ("tools.afterResume", "true"),
        ("tools.beforeGuestShutdown", "true"),
        ("tools.beforeGuestStandby", "true"),
        ("tools.syncTimeWithHost", "false"),
        ("tools.toolsUpgradePolicy", "manual"),
    ] {
        write_config(writer, key, value, false)?;
    }

    writer.write_event(Event::End(BytesEnd::new("VirtualHardwareSection")))?;
    Ok(())
}

/// Fields for one `Item` in the virtual hardware section. Most items leave
/// most fields `None`; only the RASD child elements that apply to that
/// resource type are emitted, mirroring the original generator's
/// keyword-argument item builder.
struct ItemSpec<'a> {
    name: &'a str,
    description: &'a str,
    resource_type: Option<u32>,
    resource_subtype: Option<&'a str>,
    units: Option<&'a str>,
    quantity: Option<String>,
    address: Option<String>,
    automatic_allocation: Option<&'a str>,
    parent: Option<String>,
    address_on_parent: Option<String>,
    host_resource: Option<String>,
    required_false: bool,
    configs: &'a [(&'a str, &'a str)],
}

fn write_item<W: std::io::Write>(
    writer: &mut Writer<W>,
    instances: &mut Instances,
    spec: ItemSpec,
) -> Result<()> {
    let mut item = BytesStart::new("Item");
    if spec.required_false {
        item.push_attribute(("ovf:required", "false"));
    }
    writer.write_event(Event::Start(item))?;

    write_text(writer, "rasd:ElementName", spec.name)?;
    write_text(writer, "rasd:Description", spec.description)?;
    write_text(writer, "rasd:InstanceID", &instances.next().to_string())?;
    if let Some(v) = spec.resource_type {
        write_text(writer, "rasd:ResourceType", &v.to_string())?;
    }
    if let Some(v) = spec.resource_subtype {
        write_text(writer, "rasd:ResourceSubType", v)?;
    }
    if let Some(v) = spec.units {
        write_text(writer, "rasd:AllocationUnits", v)?;
    }
    if let Some(v) = &spec.quantity {
        write_text(writer, "rasd:VirtualQuantity", v)?;
    }
    if let Some(v) = &spec.address {
        write_text(writer, "rasd:Address", v)?;
    }
    if let Some(v) = spec.automatic_allocation {
        write_text(writer, "rasd:AutomaticAllocation", v)?;
    }
    if let Some(v) = &spec.parent {
        write_text(writer, "rasd:Parent", v)?;
    }
    if let Some(v) = &spec.address_on_parent {
        write_text(writer, "rasd:AddressOnParent", v)?;
    }
    if let Some(v) = &spec.host_resource {
        write_text(writer, "rasd:HostResource", v)?;
    }

    writer.write_event(Event::End(BytesEnd::new("Item")))?;

    for (key, value) in spec.configs {
        write_config(writer, key, value, false)?;
    }
    Ok(())
}

fn write_config<W: std::io::Write>(writer: &mut Writer<W>, key: &str, value: &str, required: bool) -> Result<()> {
    let mut config = BytesStart::new("vmw:Config");
    if !required {
        config.push_attribute(("ovf:required", "false"));
    }
    config.push_attribute(("vmw:key", key));
    config.push_attribute(("vmw:value", value));
    writer.write_event(Event::Empty(config))?;
    Ok(())
}

fn write_text<W: std::io::Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    if !text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}
