//! `dvisor spawn` — Create and start an instance.

use std::collections::BTreeMap;
use std::net::IpAddr;

use clap::Args;
use dockvisor_common::constants::DEFAULT_PREFIX_LEN;
use dockvisor_common::types::InstanceName;
use dockvisor_driver::{Driver, Instance, NetworkInfo};
use dockvisor_host::network::IpAssignment;

/// Arguments for the `spawn` command.
#[derive(Args, Debug)]
pub struct SpawnArgs {
    /// Instance name; becomes the container hostname.
    pub name: String,

    /// Image reference (defaults to the configured base image).
    #[arg(long)]
    pub image: Option<String>,

    /// Base64-encoded shell script to run.
    #[arg(long, conflicts_with = "command")]
    pub user_data: Option<String>,

    /// Memory limit, e.g. `512MiB`.
    #[arg(long)]
    pub memory: Option<String>,

    /// Host bridge to splice the instance onto.
    #[arg(long, requires = "ip")]
    pub bridge: Option<String>,

    /// Address to assign inside the instance.
    #[arg(long, requires = "bridge")]
    pub ip: Option<IpAddr>,

    /// Prefix length for `--ip`.
    #[arg(long, default_value_t = DEFAULT_PREFIX_LEN)]
    pub prefix: u8,

    /// Command to run instead of a shell.
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl SpawnArgs {
    fn instance(&self) -> Instance {
        let mut metadata = BTreeMap::new();
        if let Some(memory) = &self.memory {
            let _ = metadata.insert("memory".to_owned(), memory.clone());
        }
        Instance {
            name: InstanceName::new(&self.name),
            user_data: self.user_data.clone(),
            command: (!self.command.is_empty()).then(|| self.command.clone()),
            metadata,
            memory_mb: None,
        }
    }

    fn network(&self) -> Option<NetworkInfo> {
        let (bridge, address) = self.bridge.as_ref().zip(self.ip)?;
        Some(NetworkInfo {
            bridge: bridge.clone(),
            ips: vec![IpAssignment {
                address,
                prefix_len: self.prefix,
            }],
        })
    }
}

/// Executes the `spawn` command.
///
/// # Errors
///
/// Returns an error if the instance cannot be deployed.
pub fn execute(driver: &Driver, args: SpawnArgs) -> anyhow::Result<()> {
    let instance = args.instance();
    let network = args.network();
    let id = driver.spawn(&instance, args.image.as_deref(), network.as_ref())?;
    println!("{id}");
    Ok(())
}
