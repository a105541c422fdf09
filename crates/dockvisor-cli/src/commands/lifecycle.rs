//! `dvisor destroy|reboot|power-on|power-off` — Change an instance's state.

use clap::Args;
use dockvisor_driver::Driver;

/// An instance name argument.
#[derive(Args, Debug)]
pub struct NameArgs {
    /// Instance name.
    pub name: String,
}

/// Executes the `destroy` command.
///
/// # Errors
///
/// Returns an error if the daemon cannot be reached.
pub fn destroy(driver: &Driver, args: &NameArgs) -> anyhow::Result<()> {
    driver.destroy(&args.name)?;
    println!("{} destroyed", args.name);
    Ok(())
}

/// Executes the `reboot` command.
///
/// # Errors
///
/// Returns an error if the daemon cannot be reached.
pub fn reboot(driver: &Driver, args: &NameArgs) -> anyhow::Result<()> {
    driver.reboot(&args.name)?;
    println!("{} rebooted", args.name);
    Ok(())
}

/// Executes the `power-on` command.
///
/// # Errors
///
/// Returns an error if the daemon cannot be reached.
pub fn power_on(driver: &Driver, args: &NameArgs) -> anyhow::Result<()> {
    driver.power_on(&args.name)?;
    println!("{} powered on", args.name);
    Ok(())
}

/// Executes the `power-off` command.
///
/// # Errors
///
/// Returns an error if the daemon cannot be reached.
pub fn power_off(driver: &Driver, args: &NameArgs) -> anyhow::Result<()> {
    driver.power_off(&args.name)?;
    println!("{} powered off", args.name);
    Ok(())
}
