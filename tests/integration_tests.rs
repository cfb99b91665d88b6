//! Integration tests for the WebSocket game server
//!
//! Each test starts a real server on an ephemeral port and talks to it with
//! ordinary WebSocket clients.

use assert_approx_eq::assert_approx_eq;
use futures_util::{SinkExt, StreamExt};
use server::config::{Authority, ServerConfig};
use server::network::Server;
use shared::ServerPacket;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(3);

async fn start_server(authority: Authority) -> SocketAddr {
    let mut config = ServerConfig::default();
    config.network.port = 0;
    config.game.authority = authority;

    let mut server = Server::bind(config).await.expect("failed to bind server");
    let addr = server.local_addr();
    tokio::spawn(async move { server.run().await });
    addr
}

async fn connect(addr: SocketAddr) -> Ws {
    let (ws, _) = connect_async(format!("ws://{}", addr))
        .await
        .expect("failed to connect");
    ws
}

async fn send(ws: &mut Ws, text: &str) {
    ws.send(Message::text(text)).await.expect("failed to send");
}

async fn next_packet(ws: &mut Ws) -> Option<ServerPacket> {
    loop {
        match ws.next().await? {
            Ok(Message::Text(text)) => {
                return Some(ServerPacket::decode(text.as_str()).expect("server sent invalid packet"))
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

async fn wait_for(ws: &mut Ws, mut predicate: impl FnMut(&ServerPacket) -> bool) -> ServerPacket {
    timeout(TIMEOUT, async {
        loop {
            let packet = next_packet(ws).await.expect("connection closed");
            if predicate(&packet) {
                return packet;
            }
        }
    })
    .await
    .expect("timed out waiting for packet")
}

async fn collect_for(ws: &mut Ws, duration: Duration) -> Vec<ServerPacket> {
    let mut packets = Vec::new();
    let _ = timeout(duration, async {
        while let Some(packet) = next_packet(ws).await {
            packets.push(packet);
        }
    })
    .await;
    packets
}

async fn join(ws: &mut Ws, name: &str) -> u32 {
    send(ws, &format!(r#"{{"type":"join","name":"{}"}}"#, name)).await;
    match wait_for(ws, |p| matches!(p, ServerPacket::Init { .. })).await {
        ServerPacket::Init { id, .. } => id,
        _ => unreachable!(),
    }
}

fn state_players(packet: &ServerPacket) -> Option<&Vec<shared::PlayerState>> {
    match packet {
        ServerPacket::State { players, .. } => Some(players),
        _ => None,
    }
}

fn find_player(packet: &ServerPacket, id: u32) -> Option<&shared::PlayerState> {
    state_players(packet).and_then(|players| players.iter().find(|p| p.id == id))
}

/// SESSION LIFECYCLE TESTS
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn join_replies_with_init() {
        let addr = start_server(Authority::Server).await;
        let mut ws = connect(addr).await;

        send(&mut ws, r##"{"type":"join","name":"Ann","color":"#00ff00"}"##).await;
        match wait_for(&mut ws, |p| matches!(p, ServerPacket::Init { .. })).await {
            ServerPacket::Init { id, players } => {
                let me = players.iter().find(|p| p.id == id).expect("joiner missing");
                assert_eq!(me.name, "Ann");
                assert_eq!(me.color, "#00ff00");
                assert_eq!((me.x, me.y), (shared::SPAWN_X, shared::SPAWN_Y));
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn empty_name_gets_default() {
        let addr = start_server(Authority::Server).await;
        let mut ws = connect(addr).await;

        send(&mut ws, r#"{"type":"login","name":""}"#).await;
        match wait_for(&mut ws, |p| matches!(p, ServerPacket::Init { .. })).await {
            ServerPacket::Init { id, players } => {
                assert_eq!(players[0].name, format!("Player{}", id));
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn connection_ids_are_unique() {
        let addr = start_server(Authority::Server).await;
        let mut ids = Vec::new();
        let mut sockets = Vec::new();

        for i in 0..4 {
            let mut ws = connect(addr).await;
            ids.push(join(&mut ws, &format!("p{}", i)).await);
            sockets.push(ws);
        }

        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[tokio::test]
    async fn join_is_announced_to_others_only() {
        let addr = start_server(Authority::Server).await;
        let mut first = connect(addr).await;
        let mut second = connect(addr).await;

        join(&mut first, "first").await;
        let second_id = join(&mut second, "second").await;

        match wait_for(&mut first, |p| matches!(p, ServerPacket::Join { .. })).await {
            ServerPacket::Join { id, name, .. } => {
                assert_eq!(id, second_id);
                assert_eq!(name, "second");
            }
            _ => unreachable!(),
        }

        let seen = collect_for(&mut second, Duration::from_millis(200)).await;
        assert!(!seen
            .iter()
            .any(|p| matches!(p, ServerPacket::Join { id, .. } if *id == second_id)));
    }

    #[tokio::test]
    async fn malformed_payloads_are_dropped() {
        let addr = start_server(Authority::Server).await;
        let mut ws = connect(addr).await;

        send(&mut ws, "definitely not json").await;
        send(&mut ws, r#"{"type":"teleport","x":5}"#).await;
        send(&mut ws, r#"{"type":"input"}"#).await;
        ws.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();

        // The connection survives and still accepts valid packets
        let id = join(&mut ws, "survivor").await;
        assert!(id >= 1);
    }

    #[tokio::test]
    async fn disconnect_sends_single_leave() {
        let addr = start_server(Authority::Server).await;
        let mut stayer = connect(addr).await;
        let mut leaver = connect(addr).await;

        join(&mut stayer, "stayer").await;
        let leaver_id = join(&mut leaver, "leaver").await;

        wait_for(&mut stayer, |p| {
            state_players(p).map_or(false, |players| players.len() == 2)
        })
        .await;

        leaver.close(None).await.unwrap();

        wait_for(&mut stayer, |p| *p == ServerPacket::Leave { id: leaver_id }).await;

        let after = collect_for(&mut stayer, Duration::from_millis(300)).await;
        assert!(!after.iter().any(|p| matches!(p, ServerPacket::Leave { .. })));

        let states: Vec<_> = after.iter().filter_map(state_players).collect();
        assert!(!states.is_empty());
        for players in states {
            assert_eq!(players.len(), 1);
            assert!(players.iter().all(|p| p.id != leaver_id));
        }
    }

    #[tokio::test]
    async fn leaving_before_join_sends_nothing() {
        let addr = start_server(Authority::Server).await;
        let mut stayer = connect(addr).await;
        join(&mut stayer, "stayer").await;

        let mut lurker = connect(addr).await;
        lurker.close(None).await.unwrap();

        let after = collect_for(&mut stayer, Duration::from_millis(300)).await;
        assert!(!after.iter().any(|p| matches!(p, ServerPacket::Leave { .. })));
    }
}

/// AUTHORITATIVE SIMULATION TESTS
mod simulation_tests {
    use super::*;

    #[tokio::test]
    async fn player_falls_onto_ground() {
        let addr = start_server(Authority::Server).await;
        let mut ws = connect(addr).await;
        let id = join(&mut ws, "faller").await;

        let landed = wait_for(&mut ws, |p| find_player(p, id).map_or(false, |me| me.grounded)).await;
        let me = find_player(&landed, id).unwrap();
        assert_approx_eq!(me.y, 400.0 - me.height);
        assert_approx_eq!(me.vy, 0.0);
    }

    #[tokio::test]
    async fn input_moves_player() {
        let addr = start_server(Authority::Server).await;
        let mut ws = connect(addr).await;
        let id = join(&mut ws, "walker").await;

        send(&mut ws, r#"{"type":"input","inputs":{"right":true}}"#).await;

        let moved = wait_for(&mut ws, |p| {
            find_player(p, id).map_or(false, |me| me.x > shared::SPAWN_X + 20.0)
        })
        .await;
        assert_approx_eq!(find_player(&moved, id).unwrap().vx, shared::MOVE_SPEED);
    }

    #[tokio::test]
    async fn move_is_ignored_under_server_authority() {
        let addr = start_server(Authority::Server).await;
        let mut ws = connect(addr).await;
        let id = join(&mut ws, "cheater").await;

        send(&mut ws, r#"{"type":"move","x":700,"y":10,"vx":0,"vy":0}"#).await;

        let packets = collect_for(&mut ws, Duration::from_millis(300)).await;
        for players in packets.iter().filter_map(state_players) {
            let me = players.iter().find(|p| p.id == id).unwrap();
            assert_approx_eq!(me.x, shared::SPAWN_X);
        }
    }
}

/// TRUST-CLIENT MODE TESTS
mod trust_client_tests {
    use super::*;

    #[tokio::test]
    async fn move_is_relayed_to_others_only() {
        let addr = start_server(Authority::Client).await;
        let mut mover = connect(addr).await;
        let mut watcher = connect(addr).await;

        let mover_id = join(&mut mover, "mover").await;
        join(&mut watcher, "watcher").await;

        send(
            &mut mover,
            r#"{"type":"update","x":250,"y":80,"vx":1,"vy":0,"onGround":true}"#,
        )
        .await;

        let relayed = wait_for(&mut watcher, |p| matches!(p, ServerPacket::Move { .. })).await;
        assert_eq!(
            relayed,
            ServerPacket::Move {
                id: mover_id,
                x: 250.0,
                y: 80.0
            }
        );

        let state = wait_for(&mut watcher, |p| {
            find_player(p, mover_id).map_or(false, |m| m.grounded)
        })
        .await;
        let mover_state = find_player(&state, mover_id).unwrap();
        assert_approx_eq!(mover_state.x, 250.0);
        assert_approx_eq!(mover_state.y, 80.0);

        let own = collect_for(&mut mover, Duration::from_millis(200)).await;
        assert!(!own.iter().any(|p| matches!(p, ServerPacket::Move { .. })));
    }
}
