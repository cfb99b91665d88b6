use clap::Parser;
use log::{error, info};
use server::config::{Authority, ServerConfig};
use server::network::Server;
use server::physics::JumpMode;
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long)]
    host: Option<String>,
    /// Server port to listen on
    #[clap(short, long)]
    port: Option<u16>,
    /// Tick rate (updates per second)
    #[clap(short, long)]
    tick_rate: Option<u32>,
    /// Maximum number of simultaneous connections
    #[clap(short, long)]
    max_clients: Option<usize>,
    /// TOML file with world, physics and network settings
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Who owns player positions
    #[clap(long, value_enum)]
    authority: Option<Authority>,
    /// How a held jump key is treated
    #[clap(long, value_enum)]
    jump_mode: Option<JumpMode>,
    /// Let players leave the world rectangle
    #[clap(long)]
    no_world_bounds: bool,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.network.host = host;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(tick_rate) = self.tick_rate {
            config.network.tick_rate = tick_rate;
        }
        if let Some(max_clients) = self.max_clients {
            config.network.max_clients = max_clients;
        }
        if let Some(authority) = self.authority {
            config.game.authority = authority;
        }
        if let Some(jump_mode) = self.jump_mode {
            config.game.jump_mode = jump_mode;
        }
        if self.no_world_bounds {
            config.world.clamp_to_bounds = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = ServerConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    let mut server = Server::bind(config).await?;

    // Handle shutdown gracefully
    let handle = server.handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                handle.shutdown();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server.run().await?;

    Ok(())
}
