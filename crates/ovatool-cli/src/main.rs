//! ovatool CLI - convert a monolithic-sparse VMDK into an OVA appliance.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ovatool_core::ova::{self, ConvertOptions};

/// Convert a monolithic-sparse VMDK into a stream-optimized OVA appliance.
#[derive(Parser)]
#[command(name = "ovatool")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the source monolithic-sparse VMDK file.
    vmdk: PathBuf,

    /// Number of virtual CPUs.
    #[arg(short, long, default_value_t = 1)]
    cpus: u32,

    /// Amount of memory in MB.
    #[arg(short, long, default_value_t = 1024)]
    memsize: u32,

    /// Advertised disk size in GiB.
    #[arg(short, long, default_value_t = 10)]
    disksize: u64,

    /// VM name. Defaults to the VMDK's filename stem.
    #[arg(short, long)]
    name: Option<String>,

    /// Output OVA file path. Defaults to the VMDK's filename stem with a
    /// `.ova` extension.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let output_ova = cli
        .output
        .clone()
        .unwrap_or_else(|| ova::default_output_path(&cli.vmdk));

    let options = ConvertOptions {
        source_vmdk: cli.vmdk,
        output_ova,
        cpus: cli.cpus,
        memsize_mb: cli.memsize,
        disksize_gib: cli.disksize,
        name: cli.name,
    };

    match ova::run_convert(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
