//! JustArt marketplace CLI (read-only; signing stays in the wallet).

use clap::{Parser, Subcommand};
use justart_client::{Config, MarketClient, Session, SessionStore};
use justart_types::format_amount;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "justart", version, about = "Browse the JustArt marketplace")]
struct Cli {
    /// Config file (without extension).
    #[arg(long, default_value = "justart")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every live item.
    Items,
    /// Items currently owned by an address.
    UserItems { address: String },
    /// One item by application id.
    Item {
        app_id: u64,
        #[arg(long)]
        history: bool,
    },
    /// Balance of an address, or of the active session.
    Balance { address: Option<String> },
    /// Remember an account as the active session.
    Login {
        address: String,
        #[arg(long, default_value = "")]
        name: String,
    },
    Logout,
    Whoami,
}

#[derive(Serialize)]
struct BalanceView {
    address: String,
    micro_units: u64,
    display: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config: Config = config::Config::builder()
        .add_source(config::File::with_name(&cli.config).required(false))
        .add_source(config::Environment::with_prefix("JUSTART"))
        .build()?
        .try_deserialize()
        .unwrap_or_default();

    info!(algod = %config.algod_url, indexer = %config.indexer_url, "Configuration loaded");

    let sessions = SessionStore::new(&config.session_path);

    match cli.command {
        Command::Login { address, name } => {
            let session = Session::new(address, name);
            session.sender()?;
            sessions.save(&session)?;
            print_json(&session)
        }
        Command::Logout => {
            sessions.clear()?;
            Ok(())
        }
        Command::Whoami => print_json(&sessions.load()?),
        command => {
            let market = MarketClient::from_config(&config)?;
            match command {
                Command::Items => print_json(&market.get_items().await?),
                Command::UserItems { address } => {
                    print_json(&market.get_user_items(&address).await?)
                }
                Command::Item { app_id, history } => {
                    print_json(&market.get_item(app_id, history).await?)
                }
                Command::Balance { address } => {
                    let address = match address {
                        Some(a) => a,
                        None => sessions
                            .load()?
                            .map(|s| s.address)
                            .ok_or("no address given and no active session")?,
                    };
                    let micro_units = market.balance(&address).await?;
                    print_json(&BalanceView {
                        address,
                        micro_units,
                        display: format_amount(micro_units),
                    })
                }
                Command::Login { .. } | Command::Logout | Command::Whoami => Ok(()),
            }
        }
    }
}
