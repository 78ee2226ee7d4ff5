//! Demo host for the light sensor bridge.
//!
//! Drives a simulated light sensor. Each stdin line is a JSON request
//! `{"channel": "...", "method": "...", "arguments": ...}`; command replies and
//! lux events are written to stdout as JSON lines. On the event channel the
//! methods `listen` and `cancel` manage the subscription.

use clap::Parser;
use light_sensor_bridge::channels::{LifecyclePolicy, MethodCall, MethodResponse, encode_event};
use light_sensor_bridge::config::{Config, load_dotenv};
use light_sensor_bridge::sensors::SimulatedLightSensor;
use light_sensor_bridge::{Reading, SensorHost};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "light-sensor-bridge", about = "Ambient light sensor bridge demo host")]
struct Args {
    /// Lifecycle policy: `explicit` or `auto-start`
    #[arg(long, env = "LIGHT_LIFECYCLE_POLICY")]
    policy: Option<LifecyclePolicy>,

    /// Simulate a device without a light sensor
    #[arg(long)]
    absent: bool,

    /// Simulated reading period in milliseconds
    #[arg(long, env = "LIGHT_SIM_PERIOD_MS")]
    period_ms: Option<u64>,

    /// Subscribe to the event channel on startup
    #[arg(long)]
    listen: bool,
}

#[derive(Debug, Deserialize)]
struct HostRequest {
    channel: String,
    #[serde(flatten)]
    call: MethodCall,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Stderr)
        .init();
}

fn emit(line: serde_json::Value) {
    println!("{}", line);
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    load_dotenv();
    init_logger();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(policy) = args.policy {
        config.lifecycle.policy = policy;
    }
    if let Some(period) = args.period_ms {
        config.simulation.period_ms = period;
    }
    if args.absent {
        config.simulation.sensor_present = false;
    }
    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(2);
    }

    info!("Starting light sensor bridge");
    info!("  Command channel: {}", config.channels.command_channel);
    info!("  Event channel: {}", config.channels.event_channel);
    info!("  Policy: {}", config.lifecycle.policy);
    info!("  Sensor present: {}", config.simulation.sensor_present);

    let sensor = Arc::new(SimulatedLightSensor::new(&config.simulation));
    let host = SensorHost::new(&config, sensor);
    let event_channel = config.channels.event_channel.clone();

    let (event_tx, mut event_rx) = mpsc::channel::<Reading>(64);
    let printer_channel = event_channel.clone();
    let printer = tokio::spawn(async move {
        while let Some(reading) = event_rx.recv().await {
            emit(json!({"channel": printer_channel, "event": encode_event(&reading)}));
        }
    });

    if args.listen {
        host.channels()
            .listen(&event_channel, Box::new(event_tx.clone()));
    }

    // A plain thread owns stdin so a pending read never holds up runtime shutdown.
    let mut lines = spawn_line_reader(BufReader::new(std::io::stdin()));
    loop {
        tokio::select! {
            line = lines.recv() => {
                let line = match line {
                    Some(Ok(l)) => l,
                    None => {
                        info!("stdin closed");
                        break;
                    }
                    Some(Err(e)) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                handle_line(&host, &event_channel, &event_tx, &line);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    drop(host);
    drop(event_tx);
    if let Err(e) = printer.await {
        warn!("Event printer ended abnormally: {}", e);
    }
    info!("Light sensor bridge stopped");
}

/// Forward lines from `input` on a detached thread.
///
/// The channel closes at end of input; the thread exits with the process
/// if it is still blocked on a read.
fn spawn_line_reader<R>(input: R) -> mpsc::Receiver<std::io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in input.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        error!("Failed to spawn stdin reader: {}", e);
    }
    rx
}

fn handle_line(
    host: &SensorHost,
    event_channel: &str,
    event_tx: &mpsc::Sender<Reading>,
    line: &str,
) {
    let request: HostRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!("Ignoring malformed request: {}", e);
            emit(json!(MethodResponse::Error {
                code: "BAD_ENVELOPE".to_string(),
                message: e.to_string(),
            }));
            return;
        }
    };

    let channel = request.channel.as_str();
    if channel == event_channel {
        match request.call.method.as_str() {
            "listen" => {
                host.channels().listen(channel, Box::new(event_tx.clone()));
                emit(json!(MethodResponse::success()));
            }
            "cancel" => {
                host.channels().cancel(channel);
                emit(json!(MethodResponse::success()));
            }
            _ => emit(json!(MethodResponse::NotImplemented)),
        }
        return;
    }

    match host.channels().dispatch(channel, &request.call) {
        Some(response) => emit(json!(response)),
        None => {
            warn!("No channel named {}", channel);
            emit(json!(MethodResponse::Error {
                code: "UNKNOWN_CHANNEL".to_string(),
                message: format!("no channel named {}", channel),
            }));
        }
    }
}
