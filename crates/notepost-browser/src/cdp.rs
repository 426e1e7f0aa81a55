//! Low-level CDP (Chrome DevTools Protocol) WebSocket client.
//!
//! One client owns one page target's WebSocket. Commands carry
//! auto-incrementing ids and are matched back to their callers by a
//! background reader task. Messages without an id are events; nothing in
//! this crate subscribes to them, so the reader logs and drops them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::BrowserError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type Waiters = HashMap<u64, oneshot::Sender<CdpResponse>>;
type PendingMap = Arc<Mutex<Waiters>>;

/// Upper bound on a single command round trip.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// A CDP event received from the browser.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    /// Event method name (e.g. "Page.loadEventFired").
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, serde::Serialize)]
struct CdpCommand<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

/// A CDP response from the browser.
#[derive(Debug, Clone)]
pub struct CdpResponse {
    /// The command id this response answers.
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<CdpResponseError>,
}

/// Error object in a CDP response.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CdpResponseError {
    pub code: i64,
    pub message: String,
    pub data: Option<String>,
}

/// A decoded inbound frame.
#[derive(Debug, Clone)]
pub enum CdpMessage {
    Response(CdpResponse),
    Event(CdpEvent),
}

/// What the reader did with one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Routed {
    Delivered(u64),
    Orphan(u64),
    Event(String),
    Ignored,
}

// ---------------------------------------------------------------------------
// CdpClient
// ---------------------------------------------------------------------------

/// WebSocket connection to one Chrome DevTools target.
///
/// All methods take `&self`, so a client can be shared behind an `Arc`
/// between a page and the element handles it hands out.
pub struct CdpClient {
    next_id: AtomicU64,
    pending: PendingMap,
    writer: Mutex<WsSink>,
    reader_handle: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a DevTools WebSocket endpoint of the form
    /// `ws://localhost:{port}/devtools/page/{target_id}`.
    ///
    /// [`crate::discovery::discover_page_ws_url`] finds one from the HTTP
    /// debugging port.
    pub async fn connect(ws_url: &str) -> Result<Self, BrowserError> {
        tracing::info!(url = ws_url, "connecting to Chrome DevTools WebSocket");

        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed {
                url: ws_url.to_string(),
                reason: e.to_string(),
            })?;

        let (writer, reader) = ws_stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let reader_handle = tokio::spawn(read_loop(reader, Arc::clone(&pending)));

        tracing::info!(url = ws_url, "CDP WebSocket connection established");

        Ok(Self {
            next_id: AtomicU64::new(1),
            pending,
            writer: Mutex::new(writer),
            reader_handle,
        })
    }

    /// Send a command and wait up to [`COMMAND_TIMEOUT`] for its result.
    ///
    /// A CDP error response becomes [`BrowserError::CdpError`].
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
        let timeout = COMMAND_TIMEOUT;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let json = serde_json::to_string(&CdpCommand { id, method, params }).map_err(|e| {
            BrowserError::Protocol {
                detail: format!("failed to serialize command: {e}"),
            }
        })?;

        tracing::debug!(id, method, "sending CDP command");

        // Registered before sending so a fast reply cannot race the insert.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let sent = self
            .writer
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await;
        if let Err(e) = sent {
            self.pending.lock().await.remove(&id);
            return Err(BrowserError::Protocol {
                detail: format!("failed to send WebSocket message: {e}"),
            });
        }

        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(BrowserError::Protocol {
                    detail: "response channel closed unexpectedly".to_string(),
                })
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(BrowserError::Timeout {
                    method: method.to_string(),
                    duration: timeout,
                });
            }
        };

        if let Some(err) = response.error {
            return Err(BrowserError::CdpError {
                code: err.code,
                message: err.message,
                data: err.data,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Enable a CDP domain (e.g. "Page", "DOM", "Runtime").
    pub async fn enable_domain(&self, domain: &str) -> Result<(), BrowserError> {
        self.send_command(&format!("{domain}.enable"), serde_json::json!({}))
            .await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

/// Background task: route responses to their waiters.
async fn read_loop(mut reader: SplitStream<WsStream>, pending: PendingMap) {
    while let Some(frame) = reader.next().await {
        let text = match frame {
            Ok(Message::Text(t)) => t.to_string(),
            Ok(Message::Binary(b)) => match String::from_utf8(b.to_vec()) {
                Ok(s) => s,
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket closed by remote");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket read error, stopping reader");
                break;
            }
        };

        let json: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse CDP message as JSON");
                continue;
            }
        };

        match route_frame(&json, &mut *pending.lock().await) {
            Routed::Delivered(id) => tracing::trace!(id, "response delivered"),
            Routed::Orphan(id) => tracing::debug!(id, "response for unknown command id"),
            Routed::Event(method) => tracing::trace!(method = %method, "dropping CDP event"),
            Routed::Ignored => tracing::debug!("ignoring CDP frame with neither id nor method"),
        }
    }

    // Fail every command still waiting on this connection.
    for (id, tx) in pending.lock().await.drain() {
        let _ = tx.send(CdpResponse {
            id,
            result: None,
            error: Some(CdpResponseError {
                code: -1,
                message: "WebSocket connection closed".to_string(),
                data: None,
            }),
        });
    }
}

// ---------------------------------------------------------------------------
// CDP protocol helpers
// ---------------------------------------------------------------------------

/// Classify an inbound frame: an `id` makes it a response, otherwise a
/// `method` makes it an event.
pub fn parse_cdp_message(json: &Value) -> Option<CdpMessage> {
    if let Some(id) = json.get("id").and_then(Value::as_u64) {
        return Some(CdpMessage::Response(CdpResponse {
            id,
            result: json.get("result").cloned(),
            error: json
                .get("error")
                .and_then(|e| serde_json::from_value(e.clone()).ok()),
        }));
    }
    let method = json.get("method")?.as_str()?.to_string();
    let params = json.get("params").cloned().unwrap_or(Value::Null);
    Some(CdpMessage::Event(CdpEvent { method, params }))
}

/// Hand a response to its waiter. Events are not kept anywhere.
fn route_frame(json: &Value, waiters: &mut Waiters) -> Routed {
    match parse_cdp_message(json) {
        Some(CdpMessage::Response(response)) => match waiters.remove(&response.id) {
            Some(tx) => {
                let id = response.id;
                let _ = tx.send(response);
                Routed::Delivered(id)
            }
            None => Routed::Orphan(response.id),
        },
        Some(CdpMessage::Event(event)) => Routed::Event(event.method),
        None => Routed::Ignored,
    }
}

/// Message of a thrown exception in a `Runtime.*` result, if any.
pub fn exception_message(result: &Value) -> Option<String> {
    let details = result.get("exceptionDetails")?;
    let message = details
        .get("exception")
        .and_then(|e| e.get("description"))
        .and_then(Value::as_str)
        .or_else(|| details.get("text").and_then(Value::as_str))
        .unwrap_or("unknown exception");
    Some(message.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
