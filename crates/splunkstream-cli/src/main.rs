// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process::ExitCode};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use splunkstream::{Client, Config, StreamError};

const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("SPLUNK_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut client = match Client::connect(config).await {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        url = %client,
        source = client.config().source(),
        sourcetype = client.config().sourcetype(),
        "Streaming stdin to Splunk"
    );

    let streamed = stream_stdin(&mut client).await;

    // close even after a failed read so already buffered events still go out
    let closed = client.close().await;

    report(streamed, closed)
}

/// Logs the outcome of the stream and of closing it, stream errors first.
fn report(streamed: Result<u64, String>, closed: Result<(), StreamError>) -> ExitCode {
    let mut status = ExitCode::SUCCESS;

    match streamed {
        Ok(count) => info!(events = count, "Stream finished"),
        Err(e) => {
            error!("{e}");
            status = ExitCode::FAILURE;
        }
    }

    if let Err(e) = closed {
        error!("Error closing stream: {e}");
        status = ExitCode::FAILURE;
    }

    status
}

/// Sends every stdin line as one event, flushing on a fixed interval.
async fn stream_stdin(client: &mut Client) -> Result<u64, String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut flush_interval = interval(FLUSH_INTERVAL);
    flush_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut count = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    client.send(&line).await.map_err(|e| e.to_string())?;
                    count += 1;
                }
                Ok(None) => break,
                Err(e) => return Err(format!("Error reading stdin: {e}")),
            },
            _ = flush_interval.tick() => {
                client.flush().await.map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(count)
}
