//! WebSocket hub server.
//!
//! Assigns every connection an identity and relays its messages to the
//! other connected clients.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin plaza-server -- --port 8080
//! ```

use clap::Parser;
use plaza_server::ServerConfig;
use plaza_shared::logger::setup_logger;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(version, about = "WebSocket hub server")]
struct Args {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Maximum number of concurrently connected clients
    #[arg(long, default_value_t = 1024)]
    max_clients: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_clients: args.max_clients,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Run the server
    if let Err(e) = plaza_server::run(args.into()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
