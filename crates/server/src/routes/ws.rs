/// WebSocket push channel.
///
/// Each connection is one hub subscriber. The server sends the current state,
/// then every coaching message as it is published. The only client message
/// understood is an answer to the current challenge; anything else is ignored.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use coach_engine::{CoachService, PushMessage, Subscription};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

/// Client → Server messages
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    ChallengeAnswer { square: String },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(service): Extension<Arc<CoachService>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: Arc<CoachService>) {
    let mut subscription = service.subscribe().await;
    let id = subscription.id;
    info!(subscriber = id, "push channel opened");

    if let Err(e) = pump(socket, &mut subscription, &service).await {
        debug!(subscriber = id, error = %e, "push channel error");
    }

    service.unsubscribe(id);
    info!(subscriber = id, "push channel closed");
}

async fn pump(
    socket: WebSocket,
    subscription: &mut Subscription,
    service: &CoachService,
) -> Result<()> {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            outgoing = subscription.recv() => match outgoing {
                Some(msg) => send_msg(&mut sender, &msg).await?,
                // The hub dropped this subscriber
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(t))) => {
                    if let Ok(ClientMessage::ChallengeAnswer { square }) = serde_json::from_str(t.as_str()) {
                        service.answer_challenge(&square).await;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }

    Ok(())
}

// ---- Helper: send one push message ----

async fn send_msg(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &PushMessage,
) -> Result<()> {
    let json = serde_json::to_string(msg)?;
    sender.send(Message::Text(json.into())).await?;
    Ok(())
}
