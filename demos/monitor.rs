use std::env;
use std::sync::{Arc, Mutex};

use econet300::entity::Writable;
use econet300::{Config, Coordinator, Entities};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> econet300::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let host = args.get(1).expect("usage: monitor <host> <user> <password> [--boiler on|off]");
    let username = args.get(2).map(String::as_str).unwrap_or("admin");
    let password = args.get(3).map(String::as_str).unwrap_or("admin");
    let boiler = args
        .iter()
        .position(|a| a == "--boiler")
        .and_then(|i| args.get(i + 1))
        .map(|v| v == "on");

    let mut config = Config::new(host, username, password);
    config.update_interval_secs = 10;

    println!("Connecting to {host}...");
    let api = Arc::new(config.connect().await?);
    println!("Controller {} ({})", api.uid(), api.identity().software_revision);

    let coordinator = Arc::new(
        Coordinator::builder(Arc::clone(&api))
            .update_interval(config.update_interval())
            .on_event(|event| println!("{event:?}"))
            .build(),
    );

    let first = coordinator.first_refresh().await?;
    let mut entities = Entities::create(&first, &api, &config).await?;
    println!("{} entities", entities.len());

    if let Some(on) = boiler
        && let Some(switch) = entities.switches.first_mut()
    {
        println!("Boiler switch write: {}", switch.write(&api, on).await?);
    }

    if let Some(alarms) = api.fetch_alarms().await? {
        for alarm in alarms.iter().filter(|a| a.is_active()) {
            println!("Active alarm: {alarm}");
        }
    }

    let shared = Arc::new(Mutex::new(entities));
    let sink = Arc::clone(&shared);
    coordinator.subscribe(move |snapshot| {
        let Ok(mut entities) = sink.lock() else { return };
        entities.refresh(snapshot);
        for sensor in &entities.sensors {
            if let Some(value) = sensor.native_value() {
                println!("{:<24} {value}", sensor.description.name);
            }
        }
        for ecoster in &entities.ecosters {
            let climate = &ecoster.climate;
            println!(
                "ecoSTER{} {:?} -> {:?} | preset: {:?} | {:?}",
                ecoster.idx,
                climate.current_temperature(),
                climate.target_temperature(),
                climate.preset(),
                climate.hvac_action(),
            );
        }
    });

    let cancel = CancellationToken::new();
    coordinator.spawn(cancel.clone()).await.ok();
    Ok(())
}
