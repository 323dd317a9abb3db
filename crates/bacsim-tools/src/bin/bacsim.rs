use bacsim_fleet::{Addressing, DeviceTypeScheme, Fleet, FleetConfig};
use bacsim_tools::FileConfig;
use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "bacsim", about = "Run a fleet of simulated BACnet/IP devices.")]
struct Args {
    /// TOML fleet file; flags below override its keys.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of devices.
    #[arg(long)]
    devices: Option<usize>,
    /// Instance number of the first device.
    #[arg(long)]
    first_instance: Option<u32>,
    /// Address of the first device.
    #[arg(long)]
    base_ip: Option<Ipv4Addr>,
    /// Added to the address for each further device.
    #[arg(long)]
    ip_step: Option<u32>,
    /// UDP port of the first device.
    #[arg(long)]
    base_port: Option<u16>,
    /// Added to the port for each further device.
    #[arg(long)]
    port_step: Option<u16>,
    /// Send broadcasts to this port instead of each device's own port.
    #[arg(long)]
    broadcast_port: Option<u16>,
    /// Put every device behind this single endpoint instead.
    #[arg(long)]
    shared: Option<SocketAddr>,
    /// Give every device this type instead of cycling through the defaults.
    #[arg(long)]
    device_type: Option<String>,
    /// Re-announce every device at this interval.
    #[arg(long)]
    announce_secs: Option<u64>,
    /// Print a JSON snapshot of every device at this interval.
    #[arg(long)]
    snapshot_secs: Option<u64>,
    /// List the device types the fleet knows and exit.
    #[arg(long)]
    list_types: bool,
}

impl Args {
    fn fleet_config(&self) -> Result<FleetConfig, Box<dyn std::error::Error>> {
        let mut config = FleetConfig::default();
        if let Some(path) = &self.config {
            FileConfig::load(path)?.apply(&mut config);
        }
        if let Some(devices) = self.devices {
            config.device_count = devices;
        }
        if let Some(first) = self.first_instance {
            config.first_instance = first;
        }
        if let Addressing::PerDevice {
            base_ip,
            ip_step,
            base_port,
            port_step,
            ..
        } = &mut config.addressing
        {
            if let Some(ip) = self.base_ip {
                *base_ip = ip;
            }
            if let Some(step) = self.ip_step {
                *ip_step = step;
            }
            if let Some(port) = self.base_port {
                *base_port = port;
            }
            if let Some(step) = self.port_step {
                *port_step = step;
            }
        }
        if let Some(bind) = self.shared {
            config.addressing = Addressing::Shared {
                bind,
                prefix_len: config.addressing.prefix_len(),
                virtual_network: config
                    .addressing
                    .virtual_network()
                    .unwrap_or(bacsim_fleet::config::DEFAULT_VIRTUAL_NETWORK),
            };
        }
        if self.broadcast_port.is_some() {
            config.broadcast_port = self.broadcast_port;
        }
        if let Some(device_type) = &self.device_type {
            config.device_types = DeviceTypeScheme::Fixed(device_type.clone());
        }
        if let Some(secs) = self.announce_secs {
            config.discovery.interval = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = args.fleet_config()?;

    if args.list_types {
        for device_type in config.templates.device_types() {
            println!("{device_type}");
        }
        return Ok(());
    }

    let fleet = Fleet::start(config).await?;
    for failure in fleet.bind_failures() {
        eprintln!(
            "could not bind {} for devices {:?}: {}",
            failure.addr, failure.devices, failure.error
        );
    }
    for device in fleet.list_devices().await {
        println!(
            "{:>8}  {:<22} {:<20} {}:{}  ({} objects)",
            device.device_id,
            device.name,
            device.device_type,
            device.address,
            device.port,
            device.objects.len()
        );
    }
    println!("{} devices running. Ctrl+C to stop.", fleet.device_ids().len());

    let mut snapshots = args
        .snapshot_secs
        .map(|secs| tokio::time::interval(Duration::from_secs(secs.max(1))));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tick(&mut snapshots) => {
                println!("{}", serde_json::to_string(&fleet.list_devices().await)?);
            }
        }
    }

    fleet.shutdown().await;
    Ok(())
}

async fn tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
