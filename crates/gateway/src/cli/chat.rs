//! `peerline chat` — terminal peer client.
//!
//! Connects to a relay over WebSocket, registers under a UUID, then runs
//! a readline loop.  Incoming `deliver` frames and delivery reports print
//! to stderr so stdout stays clean for piping.

use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use pl_protocol::{DeliveryFailure, WsMessage};

const REGISTER_WAIT: Duration = Duration::from_secs(10);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(
    uuid: Option<String>,
    default_peer: Option<String>,
    url: String,
) -> anyhow::Result<()> {
    let my_uuid = match uuid {
        Some(u) => {
            uuid::Uuid::parse_str(u.trim())
                .map_err(|e| anyhow::anyhow!("invalid uuid {u:?}: {e}"))?;
            u.trim().to_string()
        }
        None => uuid::Uuid::new_v4().to_string(),
    };

    // 1. Connect and register.
    let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("connecting to {url}"))?;
    let (mut sink, mut stream) = ws.split();

    let register = serde_json::to_string(&WsMessage::Register {
        uuid: my_uuid.clone(),
    })?;
    sink.send(Message::Text(register.into())).await?;

    wait_for_registered(&mut stream).await?;
    eprintln!("Registered as {my_uuid} on {url}");
    match &default_peer {
        Some(p) => eprintln!("Messages go to {p}.  Empty line or Ctrl+D exits."),
        None => eprintln!("Prefix each line with the recipient uuid.  Empty line or Ctrl+D exits."),
    }
    eprintln!();

    // 2. Reader task: print everything the relay pushes.
    let reader = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            let Ok(Message::Text(text)) = frame else { continue };
            let Ok(msg) = serde_json::from_str::<WsMessage>(&text) else {
                continue;
            };
            match msg {
                WsMessage::Deliver { from, text } => {
                    eprintln!("<< From {from}: {text}");
                }
                WsMessage::Sent { to_uuid } => {
                    eprintln!("(delivered to {to_uuid})");
                }
                WsMessage::SendFailed { to_uuid, reason } => match reason {
                    DeliveryFailure::Offline => {
                        eprintln!("(send failed: {to_uuid} is offline)")
                    }
                    DeliveryFailure::Unreachable => {
                        eprintln!("(send failed: {to_uuid} is not accepting messages)")
                    }
                },
                WsMessage::Error { message } => {
                    eprintln!("\x1B[31mrelay error: {message}\x1B[0m");
                }
                WsMessage::Pong { .. } => {}
                _ => {}
            }
        }
        eprintln!("(connection closed by relay)");
    });

    // 3. Readline loop with persistent history.
    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".peerline")
        .join("chat_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    loop {
        // Readline blocks; keep it off the async reactor.
        let line = match tokio::task::block_in_place(|| rl.readline("you> ")) {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Ctrl+D or empty line to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        rl.add_history_entry(&line).ok();

        let (to_uuid, text) = match &default_peer {
            Some(peer) => (peer.clone(), trimmed.to_string()),
            None => match trimmed.split_once(char::is_whitespace) {
                Some((target, rest)) if !rest.trim().is_empty() => {
                    (target.to_string(), rest.trim().to_string())
                }
                _ => {
                    eprintln!("usage: <recipient-uuid> <text>");
                    continue;
                }
            },
        };

        let frame = serde_json::to_string(&WsMessage::Send { to_uuid, text })?;
        if sink.send(Message::Text(frame.into())).await.is_err() {
            eprintln!("connection lost");
            break;
        }
    }

    rl.save_history(&history_path).ok();
    let _ = sink.send(Message::Close(None)).await;
    reader.abort();
    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handshake
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn wait_for_registered<S>(stream: &mut S) -> anyhow::Result<()>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let ack = tokio::time::timeout(REGISTER_WAIT, async {
        while let Some(frame) = stream.next().await {
            let Ok(Message::Text(text)) = frame else { continue };
            match serde_json::from_str::<WsMessage>(&text) {
                Ok(WsMessage::Registered { .. }) => return Ok(()),
                Ok(WsMessage::Error { message }) => {
                    anyhow::bail!("relay rejected registration: {message}")
                }
                _ => continue,
            }
        }
        anyhow::bail!("connection closed during registration")
    })
    .await;

    match ack {
        Ok(result) => result,
        Err(_) => anyhow::bail!("timed out waiting for registration ack"),
    }
}
