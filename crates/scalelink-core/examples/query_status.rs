//! Scale Status Query Tool
//!
//! Opens a scale on a serial port, performs the handshake and prints the
//! decoded status.
//!
//! Usage:
//!   cargo run --example query_status -- [OPTIONS] [PORT]
//!
//! Options:
//!   --config FILE     Load settings from a JSON config file
//!   --baud RATE       Baud rate (default: 9600)
//!   --timeout MS      Stage timeout in ms (default: 1000)
//!
//! Set RUST_LOG=scalelink_core=trace to see the wire traffic.

use anyhow::{Context, Result};
use scalelink_core::protocol::{ClientConfig, ScaleClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = ClientConfig::for_port("/dev/ttyACM0");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                let path = args.get(i).context("--config needs a file")?;
                config = ClientConfig::load(path)
                    .with_context(|| format!("loading config from {}", path))?;
            }
            "--baud" | "-b" => {
                i += 1;
                config.baud_rate = args
                    .get(i)
                    .context("--baud needs a value")?
                    .parse()
                    .context("invalid baud rate")?;
            }
            "--timeout" | "-t" => {
                i += 1;
                config.timeout_ms = args
                    .get(i)
                    .context("--timeout needs a value")?
                    .parse()
                    .context("invalid timeout")?;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            port => config.port_name = port.to_string(),
        }
        i += 1;
    }

    let client = ScaleClient::open(config.clone())
        .with_context(|| format!("opening {}", config.port_name))?;

    client.initialize().await.context("handshake failed")?;
    let status = client.request_status().await;
    client.close().await;
    let status = status.context("status request failed")?;

    println!("Port:            {}", config.port_name);
    println!("Weight:          {}", status.weight);
    println!("Tare weight:     {}", status.tare_weight);
    println!("Stable:          {}", status.stable);
    println!("Enabled:         {}", status.enabled);
    println!("Tare set:        {}", status.tare);
    println!("Fixed point:     {}", status.fixed_point);
    println!("Auto-zero:       {}", status.auto_zero);
    println!("Overweight:      {}", status.overweight);
    println!("Underweight:     {}", status.underweight);
    if status.auto_zero_error || status.measurement_error || status.no_answer_from_adc {
        println!(
            "Errors:          auto-zero={} measurement={} adc={}",
            status.auto_zero_error, status.measurement_error, status.no_answer_from_adc
        );
    }

    Ok(())
}

fn print_help() {
    println!("Usage: query_status [OPTIONS] [PORT]");
    println!();
    println!("Options:");
    println!("  --config, -c FILE   Load settings from a JSON config file");
    println!("  --baud, -b RATE     Baud rate (default: 9600)");
    println!("  --timeout, -t MS    Stage timeout in ms (default: 1000)");
    println!("  --help, -h          Show this help");
}
