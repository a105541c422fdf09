//! CLI command definitions and dispatch.

pub mod host;
pub mod image;
pub mod info;
pub mod lifecycle;
pub mod list;
pub mod ping;
pub mod spawn;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dockvisor_common::config::DriverConfig;
use dockvisor_common::types::ApiVersion;
use dockvisor_driver::Driver;

/// Dockvisor — run host-framework instances as daemon containers.
#[derive(Parser, Debug)]
#[command(name = "dvisor", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Daemon endpoint (`tcp://host:port` or `unix:///path`).
    #[arg(long, global = true, env = "DVISOR_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Daemon API version (`v1.3` or `v1.4`).
    #[arg(long, global = true, env = "DVISOR_API_VERSION")]
    pub api_version: Option<String>,

    /// JSON configuration file; flags override its values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the daemon answers.
    Ping,
    /// List instances.
    List(list::ListArgs),
    /// Create and start an instance.
    Spawn(spawn::SpawnArgs),
    /// Stop and remove an instance.
    Destroy(lifecycle::NameArgs),
    /// Stop then start an instance.
    Reboot(lifecycle::NameArgs),
    /// Start an instance.
    PowerOn(lifecycle::NameArgs),
    /// Stop an instance.
    PowerOff(lifecycle::NameArgs),
    /// Show an instance's power state and memory.
    Info(lifecycle::NameArgs),
    /// Print an instance's console log.
    Console(lifecycle::NameArgs),
    /// Show host memory and disk statistics.
    HostStats,
    /// Show schedulable host resources.
    Resources(host::ResourcesArgs),
    /// Show the host port of the local image registry.
    RegistryPort,
    /// Show image metadata.
    ImageInspect(image::ImageArgs),
}

impl Cli {
    /// Builds the driver configuration: file first, then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or a flag is invalid.
    pub fn driver_config(&self) -> anyhow::Result<DriverConfig> {
        let mut config = match &self.config {
            Some(path) => DriverConfig::load(path)?,
            None => DriverConfig::default(),
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if let Some(version) = &self.api_version {
            config.api_version = ApiVersion::parse(version)?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.driver_config()?;
    tracing::debug!(endpoint = %config.endpoint, version = %config.api_version, "driver configured");
    let driver = Driver::new(config)?;
    match cli.command {
        Command::Ping => ping::execute(&driver),
        Command::List(args) => list::execute(&driver, &args),
        Command::Spawn(args) => spawn::execute(&driver, args),
        Command::Destroy(args) => lifecycle::destroy(&driver, &args),
        Command::Reboot(args) => lifecycle::reboot(&driver, &args),
        Command::PowerOn(args) => lifecycle::power_on(&driver, &args),
        Command::PowerOff(args) => lifecycle::power_off(&driver, &args),
        Command::Info(args) => info::execute(&driver, &args),
        Command::Console(args) => info::console(&driver, &args),
        Command::HostStats => host::stats(&driver),
        Command::Resources(args) => host::resources(&driver, &args),
        Command::RegistryPort => host::registry_port(&driver),
        Command::ImageInspect(args) => image::execute(&driver, &args),
    }
}
