// Boots one shared game server per test binary.
#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use game_shared::protocol::{ClientMessage, JoinPayload, ServerMessage};
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// host:port of the shared server once it is accepting connections.
static SERVER_ADDR: OnceLock<String> = OnceLock::new();
static SERVER_READY: OnceLock<()> = OnceLock::new();

pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published = Arc::new(OnceLock::<String>::new());
        let published_thread = Arc::clone(&published);
        // Own OS thread and runtime so the server outlives each `#[tokio::test]` runtime.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_thread.set(addr.to_string());
                game_server::run(listener).await.expect("server failed");
            });
        });
        wait_until_accepting(published);
    });

    SERVER_ADDR
        .get()
        .expect("server address should be initialized")
        .as_str()
}

fn wait_until_accepting(published: Arc<OnceLock<String>>) {
    let addr = loop {
        if let Some(addr) = published.get() {
            break addr.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };
    let _ = SERVER_ADDR.set(addr.clone());

    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not become ready in time");
}

pub async fn send(socket: &mut Socket, msg: &ClientMessage) {
    let txt = serde_json::to_string(msg).expect("serializable");
    socket.send(Message::text(txt)).await.expect("send");
}

/// Next server message, skipping non-text frames.
pub async fn recv(socket: &mut Socket) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("server message in time")
            .expect("socket open")
            .expect("valid frame");
        if let Ok(text) = frame.to_text() {
            if text.is_empty() {
                continue;
            }
            return serde_json::from_str(text).expect("well-formed server message");
        }
    }
}

/// Skip messages until `pick` accepts one.
pub async fn recv_until<T>(
    socket: &mut Socket,
    mut pick: impl FnMut(&ServerMessage) -> Option<T>,
) -> T {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let msg = tokio::time::timeout_at(deadline, recv(socket))
            .await
            .expect("expected message in time");
        if let Some(found) = pick(&msg) {
            return found;
        }
    }
}

/// Connect, join, and return the socket with the assigned player id.
pub async fn join(name: &str) -> (Socket, u64) {
    let url = format!("ws://{}/ws", ensure_server());
    let (mut socket, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("websocket connect");
    send(
        &mut socket,
        &ClientMessage::Join(JoinPayload {
            display_name: name.to_string(),
        }),
    )
    .await;

    let player_id = match recv(&mut socket).await {
        ServerMessage::Identity { player_id } => player_id,
        other => panic!("expected Identity first, got {other:?}"),
    };
    (socket, player_id)
}
