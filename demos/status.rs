use std::env;

use tydom_thermostat::TydomClient;

#[tokio::main]
async fn main() -> tydom_thermostat::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let (mac, password) = match (args.get(1), args.get(2)) {
        (Some(m), Some(p)) => (m, p),
        _ => {
            eprintln!("usage: status <mac> <password> [--host <host>]");
            std::process::exit(2);
        }
    };
    let host = args
        .iter()
        .position(|a| a == "--host")
        .and_then(|i| args.get(i + 1));

    let mut builder = TydomClient::builder(mac, password);
    if let Some(host) = host {
        builder = builder.host(host);
    }
    let mut client = builder.build()?;

    println!("Fetching snapshot for {mac}...");
    let snapshot = client.fetch_snapshot().await?;
    if snapshot.is_empty() {
        println!("No thermostat data returned");
        return Ok(());
    }

    println!(
        "endpoint {} | {:.1}\u{00b0}C -> {:.1}\u{00b0}C | {:?} | mode {}",
        snapshot.endpoint_id.as_deref().unwrap_or("?"),
        snapshot.temperature.unwrap_or(f64::NAN),
        snapshot.setpoint.unwrap_or(f64::NAN),
        snapshot.run_state(),
        snapshot.hvac_mode.as_deref().unwrap_or("-"),
    );
    Ok(())
}
