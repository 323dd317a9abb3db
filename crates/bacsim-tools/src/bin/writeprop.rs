use bacsim_core::types::ObjectId;
use bacsim_fleet::Fleet;
use bacsim_tools::{parse_value, ObjectTypeArg, ProbeArgs, PropertyArg, ValueKindArg};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};

#[derive(Parser, Debug)]
#[command(name = "bacsim-writeprop")]
struct Args {
    #[command(flatten)]
    probe: ProbeArgs,
    #[arg(long)]
    ip: IpAddr,
    #[arg(long, default_value_t = 47808)]
    port: u16,
    #[arg(long, value_enum, default_value = "analog-output")]
    object_type: ObjectTypeArg,
    #[arg(long)]
    instance: u32,
    #[arg(long, value_enum, default_value = "present-value")]
    property: PropertyArg,
    #[arg(long, value_enum, default_value = "real")]
    kind: ValueKindArg,
    /// Value to write; use `--kind null` to relinquish a priority slot.
    #[arg(long, default_value = "")]
    value: String,
    /// Priority slot 1..=16.
    #[arg(long)]
    priority: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let value = parse_value(args.kind, &args.value)?;
    let fleet = Fleet::start(args.probe.fleet_config()).await?;
    let Some(&me) = fleet.device_ids().first() else {
        return Err("probe endpoint could not be bound".into());
    };

    let target = SocketAddr::new(args.ip, args.port);
    let result = fleet
        .write_remote_property(
            me,
            target,
            ObjectId::new(args.object_type.into_object_type(), args.instance),
            args.property.into_property_id(),
            &value,
            args.priority,
        )
        .await;
    fleet.shutdown().await;

    if let Err(e) = result {
        eprintln!("write failed: {e}");
        std::process::exit(1);
    }
    println!("write acknowledged");
    Ok(())
}
