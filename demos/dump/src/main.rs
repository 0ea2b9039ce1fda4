//! GT7 telemetry dump
//!
//! Listens to a console and prints one line per decrypted frame until
//! Ctrl-C, then prints the stream counters.
//!
//! Environment variables:
//! - GT7_HOST: Console IP address (default 127.0.0.1)
//! - GT7_RECV_PORT: First local port to bind (default 33740)
//! - GT7_SEND_PORT: Console heartbeat port (default 33739)
//! - GT7_RECORD: Record raw datagrams to a file with this name prefix
//! - GT7_LOG_LEVEL: trace|debug|info|warn|error, or a full filter directive

use std::net::IpAddr;
use std::process::ExitCode;
use std::str::FromStr;

use gt7_telemetry::core::FRAME_CAPACITY;
use gt7_telemetry::prelude::*;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum DumpError {
    #[error("invalid {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error(transparent)]
    Receiver(#[from] ReceiverError),
}

/// Settings read from the environment.
struct Settings {
    config: ReceiverConfig,
    record: Option<String>,
}

fn var<T: FromStr>(name: &'static str) -> Result<Option<T>, DumpError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| DumpError::InvalidVar { name, value }),
        Err(_) => Ok(None),
    }
}

fn settings() -> Result<Settings, DumpError> {
    let mut builder = ReceiverConfig::builder();
    if let Some(host) = var::<IpAddr>("GT7_HOST")? {
        builder = builder.remote_ip(host);
    }
    if let Some(port) = var::<u16>("GT7_RECV_PORT")? {
        builder = builder.recv_port(port);
    }
    if let Some(port) = var::<u16>("GT7_SEND_PORT")? {
        builder = builder.send_port(port);
    }

    let record = std::env::var("GT7_RECORD").ok().filter(|p| !p.is_empty());
    Ok(Settings {
        config: builder.build(),
        record,
    })
}

async fn run(settings: Settings) -> Result<StreamStats, DumpError> {
    info!(console = %settings.config.remote_send_addr(), "starting");

    let handle = TelemetryReceiver::spawn(settings.config, Gt7Decryptor::new());
    let mut frames = handle.subscribe(FRAME_CAPACITY).await?;
    if let Some(prefix) = settings.record {
        handle.start_recording(prefix).await?;
    }

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => println!("{:>10}  {} bytes", frame.sequence(), frame.payload().len()),
                None => break,
            },
            _ = &mut interrupted => {
                info!("interrupted");
                break;
            }
        }
    }

    let stats = handle.stats();
    handle.stop().await;
    Ok(stats)
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("GT7_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match settings() {
        Ok(settings) => run(settings).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(stats) => {
            println!(
                "datagrams={} dispatched={} dropped={} lost={} ({:.2}%) time_travels={} rebinds={}",
                stats.datagrams,
                stats.frames_dispatched,
                stats.frames_dropped,
                stats.packets_lost,
                stats.loss_ratio() * 100.0,
                stats.time_travels,
                stats.rebinds,
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "gt7-dump failed");
            ExitCode::FAILURE
        }
    }
}
