//! `dvisor image-inspect` — Show image metadata.

use clap::Args;
use dockvisor_driver::Driver;

use crate::output::print_json;

/// Arguments for the `image-inspect` command.
#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Image name or id.
    pub name: String,
}

/// Executes the `image-inspect` command.
///
/// # Errors
///
/// Returns an error if the daemon cannot be reached or the image is unknown.
pub fn execute(driver: &Driver, args: &ImageArgs) -> anyhow::Result<()> {
    let image = driver
        .inspect_image(&args.name)?
        .ok_or_else(|| anyhow::anyhow!("image '{}' not found", args.name))?;
    print_json(&image)
}
