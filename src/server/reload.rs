//! Live reload transport

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use super::ServerState;

/// Messages pushed to connected pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Page should refresh
    Reload { reason: String },
}

/// Fan-out of reload signals to every connected client
#[derive(Debug, Clone)]
pub struct ReloadSignal {
    tx: broadcast::Sender<ReloadMessage>,
}

impl ReloadSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    /// Tell every client to reload; returns how many were reached
    pub fn reload(&self, reason: impl Into<String>) -> usize {
        let message = ReloadMessage::Reload {
            reason: reason.into(),
        };
        self.tx.send(message).unwrap_or(0)
    }
}

impl Default for ReloadSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Script injected into served HTML pages
pub fn client_script(route: &str) -> String {
    format!(
        r#"
<script type="module">
(function () {{
  const ws = new WebSocket(`ws://${{location.host}}{route}`);
  ws.onmessage = function (event) {{
    const message = JSON.parse(event.data);
    if (message.type === 'reload') {{
      console.log('[kitbuild] reload:', message.reason);
      location.reload();
    }}
  }};
  ws.onclose = function () {{
    setTimeout(function () {{ location.reload(); }}, 1000);
  }};
}})();
</script>
"#
    )
}

/// Handle WebSocket upgrade for live reload
pub(crate) async fn reload_websocket(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> Response {
    ws.on_upgrade(|socket| handle_reload_socket(socket, state))
}

async fn handle_reload_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.signal.subscribe();

    if let Ok(json) = serde_json::to_string(&ReloadMessage::Connected) {
        let _ = sender.send(Message::Text(json)).await;
    }

    debug!("Reload client connected");

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    let Ok(json) = serde_json::to_string(&message) else {
                        continue;
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                // Reloads are idempotent, a missed one is covered by the next
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    debug!("Reload client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_format() {
        assert_eq!(
            serde_json::to_string(&ReloadMessage::Connected).unwrap(),
            r#"{"type":"connected"}"#
        );
        assert_eq!(
            serde_json::to_string(&ReloadMessage::Reload {
                reason: "src changed".into()
            })
            .unwrap(),
            r#"{"type":"reload","reason":"src changed"}"#
        );
    }

    #[tokio::test]
    async fn test_reload_reaches_subscribers() {
        let signal = ReloadSignal::new();
        assert_eq!(signal.reload("nobody listening"), 0);

        let mut rx = signal.subscribe();
        assert_eq!(signal.reload("docs changed"), 1);
        assert_eq!(
            rx.recv().await.unwrap(),
            ReloadMessage::Reload {
                reason: "docs changed".into()
            }
        );
    }

    #[test]
    fn test_client_script_targets_route() {
        assert!(client_script("/__kitbuild/reload").contains("${location.host}/__kitbuild/reload"));
    }
}
