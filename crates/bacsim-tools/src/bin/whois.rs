use bacsim_fleet::Fleet;
use bacsim_tools::ProbeArgs;
use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "bacsim-whois")]
struct Args {
    #[command(flatten)]
    probe: ProbeArgs,
    /// Send the Who-Is here instead of the subnet broadcast address.
    #[arg(long)]
    target: Option<SocketAddr>,
    #[arg(long)]
    low: Option<u32>,
    #[arg(long)]
    high: Option<u32>,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let mut config = args.probe.fleet_config();
    config.broadcast = args.target;
    let fleet = Fleet::start(config).await?;
    let Some(&me) = fleet.device_ids().first() else {
        return Err("probe endpoint could not be bound".into());
    };

    let range = match (args.low, args.high) {
        (Some(low), Some(high)) => Some((low, high)),
        (None, None) => None,
        _ => return Err("--low and --high must be given together".into()),
    };
    let devices = fleet.who_is(me, range, args.probe.timeout()).await?;
    if args.json {
        let devices: Vec<_> = devices
            .iter()
            .map(|d| {
                serde_json::json!({
                    "device_id": d.device_id,
                    "address": d.address.to_string(),
                    "max_apdu": d.max_apdu,
                    "segmentation": d.segmentation.map(|s| format!("{s:?}")),
                    "vendor_id": d.vendor_id,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else {
        for (i, d) in devices.iter().enumerate() {
            println!(
                "{i}: device {} at {} (vendor {}, max-apdu {})",
                d.device_id, d.address, d.vendor_id, d.max_apdu
            );
        }
    }
    fleet.shutdown().await;
    Ok(())
}
