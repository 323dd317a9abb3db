use bacsim_core::types::ObjectId;
use bacsim_fleet::Fleet;
use bacsim_tools::{ObjectTypeArg, ProbeArgs, PropertyArg};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};

#[derive(Parser, Debug)]
#[command(name = "bacsim-readprop")]
struct Args {
    #[command(flatten)]
    probe: ProbeArgs,
    #[arg(long)]
    ip: IpAddr,
    #[arg(long, default_value_t = 47808)]
    port: u16,
    #[arg(long, value_enum, default_value = "device")]
    object_type: ObjectTypeArg,
    /// Object instance; the default addresses whichever device answers.
    #[arg(long, default_value_t = ObjectId::WILDCARD_INSTANCE)]
    instance: u32,
    #[arg(long, value_enum, default_value = "object-name")]
    property: PropertyArg,
    #[arg(long)]
    index: Option<u32>,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let fleet = Fleet::start(args.probe.fleet_config()).await?;
    let Some(&me) = fleet.device_ids().first() else {
        return Err("probe endpoint could not be bound".into());
    };

    let target = SocketAddr::new(args.ip, args.port);
    let result = fleet
        .read_remote_property(
            me,
            target,
            ObjectId::new(args.object_type.into_object_type(), args.instance),
            args.property.into_property_id(),
            args.index,
        )
        .await;
    fleet.shutdown().await;

    match result {
        Ok(v) if args.json => println!("{}", serde_json::to_string_pretty(&v)?),
        Ok(v) => println!("value: {v}"),
        Err(e) => {
            eprintln!("read failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
