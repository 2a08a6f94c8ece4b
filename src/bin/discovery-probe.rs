//! Discovery Probe CLI Tool
//!
//! Listens for the relay's LAN beacon and prints the game URL it advertises.
//!
//! Usage:
//!   cargo run --bin discovery-probe
//!   cargo run --bin discovery-probe -- --port 19472 --timeout 10
//!   cargo run --bin discovery-probe -- watch --count 5

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gomoku_relay::discovery::{listen_for_server, receive_beacon, DEFAULT_LISTEN_PORT};
use gomoku_relay::protocol::GAME_PATH;
use tokio::net::UdpSocket;

#[derive(Parser)]
#[command(name = "discovery-probe")]
#[command(about = "Find a Gomoku relay server on the local network")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Port to listen on for beacons
    #[arg(short, long, default_value_t = DEFAULT_LISTEN_PORT)]
    port: u16,

    /// Seconds to wait for each beacon
    #[arg(short, long, default_value = "5")]
    timeout: u64,

    /// Game path appended to the advertised address
    #[arg(long, default_value = GAME_PATH)]
    path: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for one beacon and print the server URL (default)
    Find,
    /// Print several consecutive beacons
    Watch {
        /// Number of beacons to print
        #[arg(short, long, default_value = "5")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout);

    println!("🔍 Listening for beacons on UDP port {}...", cli.port);

    match cli.command.unwrap_or(Commands::Find) {
        Commands::Find => match listen_for_server(cli.port, timeout).await {
            Ok(beacon) => println!("✅ Found server: {}", beacon.server_url(&cli.path)),
            Err(e) => {
                eprintln!("❌ No server found: {:#}", e);
                eprintln!("💡 Make sure the relay is running with discovery enabled");
                std::process::exit(1);
            }
        },

        Commands::Watch { count } => {
            let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, cli.port))
                .await
                .with_context(|| format!("Failed to bind discovery port {}", cli.port))?;

            for i in 1..=count {
                match receive_beacon(&socket, timeout).await {
                    Ok(beacon) => {
                        println!("  Beacon {}: {}", i, beacon.server_url(&cli.path))
                    }
                    Err(e) => {
                        eprintln!("❌ Beacon {} missing: {:#}", i, e);
                        std::process::exit(1);
                    }
                }
            }
            println!("📊 Received {} beacons", count);
        }
    }

    Ok(())
}
