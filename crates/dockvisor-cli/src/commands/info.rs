//! `dvisor info|console` — Inspect an instance.

use dockvisor_driver::Driver;

use crate::commands::lifecycle::NameArgs;
use crate::output::format_bytes;

/// Executes the `info` command.
///
/// # Errors
///
/// Returns an error if the instance does not exist.
pub fn execute(driver: &Driver, args: &NameArgs) -> anyhow::Result<()> {
    let info = driver.get_info(&args.name)?;
    let limit = if info.max_mem == 0 {
        "unlimited".to_owned()
    } else {
        format_bytes(info.max_mem)
    };
    println!("name:     {}", args.name);
    println!("state:    {}", info.state);
    println!("memory:   {limit}");
    println!("vcpus:    {}", info.num_cpu);
    println!("cpu time: {}", info.cpu_time);
    Ok(())
}

/// Executes the `console` command.
///
/// # Errors
///
/// Returns an error if the daemon cannot be reached.
pub fn console(driver: &Driver, args: &NameArgs) -> anyhow::Result<()> {
    match driver.get_console_output(&args.name)? {
        Some(log) => print!("{log}"),
        None => println!("No console output for '{}'.", args.name),
    }
    Ok(())
}
