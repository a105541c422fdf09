//! `dvisor ping` — Check that the daemon is running.

use dockvisor_driver::Driver;

/// Executes the `ping` command.
///
/// # Errors
///
/// Returns an error if the daemon cannot be reached.
pub fn execute(driver: &Driver) -> anyhow::Result<()> {
    driver.init_host()?;
    println!("daemon at {} is up", driver.config().endpoint);
    Ok(())
}
