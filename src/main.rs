//! wimstage - repackages the vendor's stable-channel installer into an
//! offline WIM deployment image.
//!
//! The run is a strictly sequential pipeline: resolve the release from the
//! feed, download and verify the installer package, unwrap the nested
//! containers, discover the update-agent version, expand the product
//! payload, compose the deployment layout, and capture the image.

use anyhow::{bail, Result};
use clap::Parser;

use wimstage::config::Config;
use wimstage::feed::Arch;
use wimstage::pipeline;
use wimstage::preflight;

#[derive(Parser)]
#[command(name = "wimstage")]
#[command(about = "Repackage the vendor's stable-channel installer into an offline WIM image")]
struct Cli {
    /// Target CPU architecture of the release to repackage
    #[arg(long, value_enum, default_value_t = Arch::X64)]
    arch: Arch,

    /// Resolve the release, write its product version to the output
    /// directory, and stop without downloading or extracting anything
    #[arg(long)]
    check_only: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let base_dir = std::env::current_dir()?;

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load(&base_dir);

    let report = preflight::run_preflight(&config, cli.check_only);
    if !report.all_passed() {
        report.print();
        bail!("preflight checks failed");
    }

    pipeline::run(&config, cli.arch, cli.check_only)?;
    Ok(())
}
