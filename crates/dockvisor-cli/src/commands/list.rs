//! `dvisor list` — List instances.

use clap::Args;
use dockvisor_common::types::PowerState;
use dockvisor_driver::Driver;

use crate::output::short_id;

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show container id, state and image for each instance.
    #[arg(short, long)]
    pub detailed: bool,
}

/// Executes the `list` command.
///
/// # Errors
///
/// Returns an error if the daemon cannot be reached.
pub fn execute(driver: &Driver, args: &ListArgs) -> anyhow::Result<()> {
    if !args.detailed {
        for name in driver.list_instances()? {
            println!("{name}");
        }
        return Ok(());
    }

    let instances = driver.list_instances_detailed()?;
    if instances.is_empty() {
        println!("No instances found.");
        return Ok(());
    }
    println!(
        "{:<14} {:<20} {:<10} {:<20} COMMAND",
        "CONTAINER ID", "NAME", "STATE", "IMAGE"
    );
    for info in &instances {
        println!(
            "{:<14} {:<20} {:<10} {:<20} {}",
            short_id(&info.id),
            info.config.hostname,
            PowerState::from_running(info.state.running),
            info.config.image,
            info.config.cmd.join(" ")
        );
    }
    Ok(())
}
