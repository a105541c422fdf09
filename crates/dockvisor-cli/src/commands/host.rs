//! `dvisor host-stats|resources|registry-port` — Host-level reports.

use clap::Args;
use dockvisor_driver::Driver;

use crate::output::{format_bytes, print_json};

/// Arguments for the `resources` command.
#[derive(Args, Debug)]
pub struct ResourcesArgs {
    /// Node name to report the resources under.
    pub nodename: String,
}

/// Executes the `host-stats` command.
///
/// # Errors
///
/// Returns an error if host counters cannot be read.
pub fn stats(driver: &Driver) -> anyhow::Result<()> {
    let stats = driver.get_host_stats()?;
    println!("host:          {}", stats.host_hostname);
    println!(
        "memory:        {} total, {} free, {} used",
        format_bytes(stats.host_memory_total),
        format_bytes(stats.host_memory_free),
        format_bytes(stats.host_memory_overhead)
    );
    println!(
        "disk:          {} total, {} available, {} used",
        format_bytes(stats.disk_total),
        format_bytes(stats.disk_available),
        format_bytes(stats.disk_used)
    );
    Ok(())
}

/// Executes the `resources` command.
///
/// # Errors
///
/// Returns an error if host counters cannot be read.
pub fn resources(driver: &Driver, args: &ResourcesArgs) -> anyhow::Result<()> {
    print_json(&driver.get_available_resource(&args.nodename)?)
}

/// Executes the `registry-port` command.
///
/// # Errors
///
/// Returns an error if the daemon cannot be reached.
pub fn registry_port(driver: &Driver) -> anyhow::Result<()> {
    match driver.registry_port()? {
        Some(port) => println!("{port}"),
        None => println!("No registry container running."),
    }
    Ok(())
}
