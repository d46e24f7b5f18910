//! outbox-probe: sends one `DoWork` through the bus and reports the order in
//! which its notifications became observable.

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use outbox_probe::bus::Subscriber;
use outbox_probe::probe::{self, ProbeOptions};
use outbox_probe::{telemetry, BusConfig, DoWork, InMemoryQueue, Message};
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "outbox-probe",
    about = "Compare outbox-buffered and immediate publishes from one consumer"
)]
struct Cli {
    /// TOML bus configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the work queue name
    #[arg(long)]
    queue: Option<String>,
    /// Make the consumer fail right after this step
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    fail_after_step: Option<u8>,
    /// Stop after this many milliseconds instead of waiting for Enter
    #[arg(long)]
    wait_ms: Option<u64>,
    /// Print observed messages as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = BusConfig::load(cli.config.as_deref())?;
    if let Some(queue) = cli.queue {
        config = config.with_queue_name(queue);
        config.validate()?;
    }
    telemetry::init_tracing(&config.log_level)?;

    let error_queue = config.error_queue(&config.queue_name);
    let transport = InMemoryQueue::new();
    let observer = transport.new_subscriber();

    let options = ProbeOptions {
        fail_after_step: cli.fail_after_step,
        ..ProbeOptions::default()
    };
    let handle = probe::configure(transport.clone(), config, options)?.start()?;

    handle.send(&DoWork)?;

    match cli.wait_ms {
        Some(ms) => thread::sleep(Duration::from_millis(ms)),
        None => {
            println!("Press Enter to stop");
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
        }
    }

    let stats = handle.stop();
    info!(?stats, "probe finished");

    while let Some(message) = observer.poll(0)? {
        report("published", &message, cli.json);
    }
    for message in transport.queue_messages(&error_queue) {
        report("faulted", &message, cli.json);
    }

    Ok(())
}

fn report(kind: &str, message: &Message, as_json: bool) {
    if as_json {
        let line = json!({
            "kind": kind,
            "sequence": message.sequence,
            "message_type": message.message_type,
            "message_id": message.id,
            "source": message.headers.source_address,
            "fault_reason": message.header("fault-reason"),
        });
        println!("{line}");
    } else {
        println!(
            "{kind:>9} #{:<3} {:<12} from {}",
            message.sequence,
            message.message_type,
            message.headers.source_address.as_deref().unwrap_or("-")
        );
    }
}
