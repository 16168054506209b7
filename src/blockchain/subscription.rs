use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::blockchain::block_source::{HeadNotification, HeadStream, HeadSubscriber};
use crate::blockchain::rpc_client::RpcClient;
use crate::error::SubscriptionError;
use crate::logging::LogContext;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBSCRIBE_REQUEST_ID: u64 = 1;

/// New-heads subscription over the node's WebSocket endpoint.
///
/// The current head is read over HTTP, so both endpoints must point at the same node.
pub struct WsHeadSubscriber {
    ws_url: String,
    rpc: RpcClient,
}

impl WsHeadSubscriber {
    pub fn new(ws_url: impl Into<String>, rpc: RpcClient) -> Self {
        Self {
            ws_url: ws_url.into(),
            rpc,
        }
    }

    /// Connect, send `eth_subscribe("newHeads")` and wait for the subscription id
    async fn open_subscription(&self) -> Result<(WsStream, String), SubscriptionError> {
        let context = LogContext::new("subscription", "open").with_metadata("ws_url", json!(self.ws_url));
        context.debug("Connecting to node WebSocket");

        let (mut socket, _) = connect_async(self.ws_url.as_str())
            .await
            .map_err(|e| SubscriptionError::WebSocket(e.to_string()))?;

        let request = json!({
            "jsonrpc": "2.0",
            "id": SUBSCRIBE_REQUEST_ID,
            "method": "eth_subscribe",
            "params": ["newHeads"]
        });
        socket
            .send(Message::Text(request.to_string().into()))
            .await
            .map_err(|e| SubscriptionError::WebSocket(e.to_string()))?;

        while let Some(message) = socket.next().await {
            match message.map_err(|e| SubscriptionError::WebSocket(e.to_string()))? {
                Message::Text(text) => {
                    let Ok(reply) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    if reply.get("id").and_then(Value::as_u64) != Some(SUBSCRIBE_REQUEST_ID) {
                        continue;
                    }
                    if let Some(error) = reply.get("error") {
                        return Err(SubscriptionError::Rejected(error.to_string()));
                    }
                    let subscription_id = reply
                        .get("result")
                        .and_then(Value::as_str)
                        .ok_or_else(|| SubscriptionError::Rejected(format!("no subscription id in {}", reply)))?
                        .to_string();

                    context
                        .with_metadata("subscription_id", json!(subscription_id))
                        .info("Subscribed to new heads");
                    return Ok((socket, subscription_id));
                }
                Message::Ping(data) => {
                    socket
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| SubscriptionError::WebSocket(e.to_string()))?;
                }
                Message::Close(_) => return Err(SubscriptionError::StreamEnded),
                _ => {}
            }
        }

        Err(SubscriptionError::StreamEnded)
    }
}

struct Session {
    socket: WsStream,
    subscription_id: String,
    finished: bool,
}

/// Pull the next head out of the socket. Errors end the session.
async fn next_head(mut session: Session) -> Option<(Result<HeadNotification, SubscriptionError>, Session)> {
    if session.finished {
        return None;
    }

    loop {
        let failure = match session.socket.next().await {
            None => SubscriptionError::StreamEnded,
            Some(Err(e)) => SubscriptionError::WebSocket(e.to_string()),
            Some(Ok(Message::Text(text))) => match parse_notification(text.as_str(), &session.subscription_id) {
                Some(head) => return Some((Ok(head), session)),
                None => continue,
            },
            Some(Ok(Message::Ping(data))) => match session.socket.send(Message::Pong(data)).await {
                Ok(()) => continue,
                Err(e) => SubscriptionError::WebSocket(e.to_string()),
            },
            Some(Ok(Message::Close(frame))) => {
                SubscriptionError::WebSocket(format!("closed by node: {:?}", frame))
            }
            Some(Ok(_)) => continue,
        };

        session.finished = true;
        return Some((Err(failure), session));
    }
}

/// Decode an `eth_subscription` message for our subscription.
/// Anything else on the socket is ignored.
fn parse_notification(text: &str, subscription_id: &str) -> Option<HeadNotification> {
    let message: Value = serde_json::from_str(text).ok()?;

    if message.get("method")?.as_str()? != "eth_subscription" {
        return None;
    }

    let params = message.get("params")?;
    if params.get("subscription")?.as_str()? != subscription_id {
        return None;
    }

    match serde_json::from_value::<HeadNotification>(params.get("result")?.clone()) {
        Ok(head) => Some(head),
        Err(e) => {
            LogContext::new("subscription", "parse_notification")
                .with_metadata("payload", json!(text))
                .warn(&format!("Ignoring undecodable head notification: {}", e));
            None
        }
    }
}

#[async_trait]
impl HeadSubscriber for WsHeadSubscriber {
    async fn subscribe_new_heads(&self) -> Result<HeadStream, SubscriptionError> {
        let (socket, subscription_id) = self.open_subscription().await?;

        let session = Session {
            socket,
            subscription_id,
            finished: false,
        };

        Ok(Box::pin(futures::stream::unfold(session, next_head)))
    }

    async fn latest_head(&self) -> Result<HeadNotification, SubscriptionError> {
        Ok(self.rpc.get_latest_head().await?)
    }
}
