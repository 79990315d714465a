use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "harness-cli")]
#[command(about = "Load driver for the fault harness", long_about = None)]
struct Cli {
    /// Service to call (usually the downstream proxy)
    #[arg(short, long, default_value = "http://localhost:9000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request and print the response
    Once,
    /// Send many requests and tally the outcomes
    Hit {
        /// Total number of requests
        #[arg(short = 'n', long, default_value_t = 100)]
        count: usize,

        /// Maximum requests in flight
        #[arg(short, long, default_value_t = 10)]
        concurrency: usize,
    },
}

/// How a single response looked from the caller's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
enum OutcomeClass {
    /// 200 relaying an upstream body.
    Ok,
    /// 200 describing an upstream error status.
    UpstreamError,
    /// Any 5xx.
    ServerError,
    /// Anything else.
    Other,
    /// No HTTP response at all.
    TransportError,
}

fn classify(status: u16, body: &str) -> OutcomeClass {
    match status {
        200 if body.starts_with("Received error ") => OutcomeClass::UpstreamError,
        200 => OutcomeClass::Ok,
        500..=599 => OutcomeClass::ServerError,
        _ => OutcomeClass::Other,
    }
}

#[derive(Debug, Default, Serialize)]
struct Report {
    requests: usize,
    outcomes: BTreeMap<OutcomeClass, usize>,
    statuses: BTreeMap<u16, usize>,
}

impl Report {
    fn record(&mut self, result: Result<(u16, String), reqwest::Error>) {
        self.requests += 1;
        let class = match result {
            Ok((status, body)) => {
                *self.statuses.entry(status).or_default() += 1;
                classify(status, &body)
            }
            Err(_) => OutcomeClass::TransportError,
        };
        *self.outcomes.entry(class).or_default() += 1;
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<(u16, String), reqwest::Error> {
    let res = client.get(url).send().await?;
    let status = res.status().as_u16();
    let body = res.text().await?;
    Ok((status, body))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder().no_proxy().build()?;

    match cli.command {
        Commands::Once => {
            let (status, body) = fetch(&client, &cli.url).await?;
            println!("{}", status);
            println!("{}", body);
        }
        Commands::Hit { count, concurrency } => {
            let report = stream::iter(0..count)
                .map(|_| fetch(&client, &cli.url))
                .buffer_unordered(concurrency.max(1))
                .fold(Report::default(), |mut report, result| async move {
                    report.record(result);
                    report
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
