use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use listing_relay::{AppConfig, ExtractRequest, Outcome, PublishOptions, Relay};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Copy real-estate listings from one site into another site's listing form.
#[derive(Parser)]
#[command(name = "listing-relay", version, about, long_about = None)]
struct Cli {
    /// Settings file
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a listing into the records folder
    Extract {
        url: String,
        #[command(flatten)]
        notes: Notes,
    },
    /// Publish a stored record on the destination site
    Populate {
        id: String,
        #[command(flatten)]
        publish: Publish,
    },
    /// Extract a listing and publish it right away
    Run {
        url: String,
        #[command(flatten)]
        notes: Notes,
        #[command(flatten)]
        publish: Publish,
    },
    /// List stored record identifiers
    List,
}

#[derive(clap::Args)]
struct Notes {
    /// Agency price to store with the record
    #[arg(long, default_value = "N/A")]
    price: String,
    /// Free-text note to store with the record
    #[arg(long, default_value = "")]
    comment: String,
}

#[derive(clap::Args)]
struct Publish {
    /// Account in the credentials file
    #[arg(long, default_value = "default")]
    account: String,
    /// Contact phone, instead of the one on the record
    #[arg(long, default_value = "")]
    phone: String,
    /// Leave the description field empty
    #[arg(long)]
    no_description: bool,
}

impl Notes {
    fn request(self, url: String) -> ExtractRequest {
        ExtractRequest {
            url,
            agency_price: self.price,
            comment: self.comment,
        }
    }
}

impl From<Publish> for PublishOptions {
    fn from(publish: Publish) -> Self {
        PublishOptions {
            account: publish.account,
            phone: publish.phone,
            enter_description: !publish.no_description,
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None => registry.init(),
    }
    Ok(())
}

/// Cancel `token` on the first Ctrl-C.
fn stop_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("stop requested");
            token.cancel();
        }
    });
}

fn report(outcome: Outcome<String>) -> ExitCode {
    match outcome {
        Outcome::Done(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Outcome::Stopped => {
            eprintln!("stopped");
            ExitCode::from(130)
        }
        Outcome::Failed(e) => {
            eprintln!("failed: {e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_file.as_deref()) {
        eprintln!("cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut relay = match Relay::from_config(config).await {
        Ok(relay) => relay,
        Err(e) => {
            eprintln!("failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    stop_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Extract { url, notes } => report(relay.extract(notes.request(url), cancel).await),
        Commands::Populate { id, publish } => {
            report(relay.populate(&id, &publish.into(), cancel).await)
        }
        Commands::Run { url, notes, publish } => {
            report(relay.run(notes.request(url), &publish.into(), cancel).await)
        }
        Commands::List => match relay.known_ids().await {
            Ok(ids) => {
                for id in ids {
                    println!("{id}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
