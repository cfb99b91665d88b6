use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use rand::Rng;
use shared::{ClientPacket, Inputs, ServerPacket};
use std::time::Duration;
use tokio::time::{interval, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Headless bot that joins the server and mashes random inputs
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server WebSocket URL
    #[clap(short, long, default_value = "ws://127.0.0.1:8080")]
    server: String,
    /// Display name to join with
    #[clap(short, long, default_value = "bot")]
    name: String,
    /// How long to play, in seconds
    #[clap(short, long, default_value = "10")]
    duration: u64,
    /// Milliseconds between input changes
    #[clap(short, long, default_value = "250")]
    input_interval: u64,
}

fn random_inputs(rng: &mut impl Rng) -> Inputs {
    let direction = rng.gen_range(0..3);
    Inputs {
        left: direction == 1,
        right: direction == 2,
        jump: rng.gen_bool(0.2),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let (ws_stream, _) = connect_async(args.server.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    let join = ClientPacket::Join {
        name: Some(args.name.clone()),
        color: None,
    };
    write.send(Message::text(join.encode()?)).await?;

    let mut my_id = None;
    let mut input_timer = interval(Duration::from_millis(args.input_interval));
    let deadline = sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        warn!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };

                match ServerPacket::decode(text.as_str()) {
                    Ok(ServerPacket::Init { id, players }) => {
                        info!("Joined as player {} with {} players online", id, players.len());
                        my_id = Some(id);
                    }
                    Ok(ServerPacket::State { tick, players, .. }) if tick % 60 == 0 => {
                        if let Some(me) = players.iter().find(|p| Some(p.id) == my_id) {
                            info!(
                                "Tick {}: at ({:.1}, {:.1}) grounded={} with {} players",
                                tick, me.x, me.y, me.grounded, players.len()
                            );
                        }
                    }
                    Ok(ServerPacket::Join { id, name, .. }) => info!("{} joined as {}", name, id),
                    Ok(ServerPacket::Leave { id }) => info!("Player {} left", id),
                    Ok(_) => {}
                    Err(e) => warn!("Failed to decode server packet: {}", e),
                }
            }

            _ = input_timer.tick() => {
                if my_id.is_none() {
                    continue;
                }
                let packet = ClientPacket::Input {
                    inputs: random_inputs(&mut rand::thread_rng()),
                };
                write.send(Message::text(packet.encode()?)).await?;
            }

            _ = &mut deadline => {
                info!("Test client finished");
                break;
            }
        }
    }

    write.close().await?;
    Ok(())
}
