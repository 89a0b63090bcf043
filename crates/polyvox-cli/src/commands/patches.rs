//! Factory patch listing.

use crate::commands::common::load_patch;
use clap::Args;
use polyvox_config::factory_patches;

#[derive(Args)]
pub struct PatchesArgs {
    /// Print this patch as TOML instead of listing
    #[arg(long, value_name = "NAME")]
    show: Option<String>,
}

pub fn run(args: PatchesArgs) -> anyhow::Result<()> {
    if let Some(name) = args.show {
        let patch = load_patch(&name)?;
        print!("{}", patch.to_toml()?);
        return Ok(());
    }

    println!("Factory Patches:");
    println!();
    for (id, patch) in polyvox_config::factory_patch_names()
        .into_iter()
        .zip(factory_patches())
    {
        println!("  {:<14} {:<12} {}", id, patch.kind(), patch.name());
        if let Some(desc) = patch.description() {
            println!("  {:<14} {:<12} {}", "", "", desc);
        }
    }
    Ok(())
}
