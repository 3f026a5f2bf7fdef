//! OVA archive creation and the top-level conversion entry point.
//!
//! An OVA is a USTAR tar archive holding exactly two members, in order:
//! the OVF envelope, then the transcoded stream-optimized VMDK. There is no
//! manifest and no checksum file — just those two entries, back to back.

use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::info;
use tar::{Builder, Header};

use crate::error::{Error, Result};
use crate::ovf::{self, OvfParams};
use crate::vmdk;

/// Parameters for one VMDK-to-OVA conversion run, corresponding directly to
/// the CLI's flags.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub source_vmdk: PathBuf,
    pub output_ova: PathBuf,
    pub cpus: u32,
    pub memsize_mb: u32,
    pub disksize_gib: u64,
    pub name: Option<String>,
}

/// Runs a full VMDK-to-OVA conversion: transcode the source VMDK to a
/// stream-optimized temporary file, render the OVF envelope, then package
/// both into the USTAR archive at `options.output_ova`.
///
/// The temporary transcoded VMDK is always removed before returning,
/// success or failure. A partially-written output archive is also removed
/// if packaging fails partway through.
pub fn run_convert(options: &ConvertOptions) -> Result<()> {
    let name = options.name.clone().unwrap_or_else(|| barename(&options.source_vmdk));

    let temp_dir = tempfile::tempdir().map_err(Error::io_simple)?;
    let temp_vmdk_path = temp_dir.path().join(format!("{name}-drive.vmdk"));

    info!(
        "transcoding '{}' to stream-optimized VMDK ({} GiB target)",
        options.source_vmdk.display(),
        options.disksize_gib
    );
    vmdk::transcode_paths(&options.source_vmdk, &temp_vmdk_path, options.disksize_gib)?;

    let vmdk_file_size = fs::metadata(&temp_vmdk_path)
        .map_err(|e| Error::io(e, &temp_vmdk_path))?
        .len();

    let ovf_params = OvfParams {
        name: name.clone(),
        cpus: options.cpus,
        memsize_mb: options.memsize_mb,
        disksize_gib: options.disksize_gib,
        vmdk_file_size,
    };
    let ovf_xml = ovf::build(&ovf_params)?;

    info!("packaging OVA at '{}'", options.output_ova.display());
    write_ova(&options.output_ova, &name, ovf_xml.as_bytes(), &temp_vmdk_path)?;

    Ok(())
}

/// Writes the two-entry USTAR archive: `<name>.ovf` then `<name>-drive.vmdk`.
///
/// On any failure the partially-written archive at `output_path` is removed.
fn write_ova(output_path: &Path, name: &str, ovf_xml: &[u8], vmdk_path: &Path) -> Result<()> {
    let result = write_ova_inner(output_path, name, ovf_xml, vmdk_path);
    if result.is_err() {
        let _ = fs::remove_file(output_path);
    }
    result
}

fn write_ova_inner(output_path: &Path, name: &str, ovf_xml: &[u8], vmdk_path: &Path) -> Result<()> {
    let output_file = File::create(output_path).map_err(|e| Error::io(e, output_path))?;
    let mut builder = Builder::new(output_file);

    append_bytes(&mut builder, &format!("{name}.ovf"), ovf_xml)?;
    append_file(&mut builder, &format!("{name}-drive.vmdk"), vmdk_path)?;

    builder
        .into_inner()
        .map_err(|e| Error::ova(format!("failed to finalize tar archive: {e}")))?;
    Ok(())
}

fn append_bytes<W: Write>(builder: &mut Builder<W>, name: &str, data: &[u8]) -> Result<()> {
    let mut header = Header::new_ustar();
    header.set_path(name).map_err(|e| Error::ova(e.to_string()))?;
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append(&header, data)
        .map_err(|e| Error::ova(format!("failed to append '{name}': {e}")))
}

fn append_file<W: Write>(builder: &mut Builder<W>, name: &str, path: &Path) -> Result<()> {
    let mut file = File::open(path).map_err(|e| Error::io(e, path))?;
    let size = file.seek(SeekFrom::End(0)).map_err(|e| Error::io(e, path))?;
    file.seek(SeekFrom::Start(0)).map_err(|e| Error::io(e, path))?;

    let mut header = Header::new_ustar();
    header.set_path(name).map_err(|e| Error::ova(e.to_string()))?;
    header.set_size(size);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append(&header, &mut file)
        .map_err(|e| Error::ova(format!("failed to append '{name}': {e}")))
}

/// Derives the VM/file name stem from a VMDK path, the way the original
/// tool derives it when `--name` isn't given: the filename with its
/// extension stripped.
fn barename(vmdk_path: &Path) -> String {
    vmdk_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "disk".to_string())
}

/// Derives the default output OVA path from the source VMDK path, the way
/// the original tool derives it when `--output` isn't given: the same stem
/// with a `.ova` extension, in the same directory.
pub fn default_output_path(vmdk_path: &Path) -> PathBuf {
    vmdk_path.with_extension("ova")
}
