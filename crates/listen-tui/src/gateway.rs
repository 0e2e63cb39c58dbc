//! Gateway client — one push connection to the metadata service.
//!
//! ```text
//!   GatewayClient::run()
//!         │  connect_async(url)
//!         ▼
//!   drive(sink, stream)
//!         ├── receive loop   ← stream.next() | shutdown.cancelled()
//!         │      ├── Welcome → spawn heartbeat (once per connection)
//!         │      ├── Event   → handler(event), in receive order
//!         │      └── other   → dropped
//!         └── heartbeat task ← every period: {"op":9} through the shared sink
//! ```
//!
//! Cancellation is a `CancellationToken`; the receive loop and the heartbeat
//! both wait on it directly, so shutdown is immediate and nothing is read or
//! written afterwards. Any transport or decoding failure ends the run with a
//! `GatewayError`; reconnecting is left to the caller.
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use listen_proto::gateway::{Frame, FrameError, MetadataEvent, OutboundFrame};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: WsError,
    },
    #[error("gateway transport error: {0}")]
    Transport(#[from] WsError),
    #[error("undecodable gateway frame: {0}")]
    Frame(#[from] FrameError),
    #[error("gateway closed the connection")]
    Closed,
    #[error("heartbeat task failed: {0}")]
    Heartbeat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// `heartbeat` is known once the welcome frame has arrived.
    Connected { heartbeat: Option<Duration> },
}

type HeartbeatTask = JoinHandle<Result<(), GatewayError>>;

/// How long `drive` waits for the heartbeat task after cancelling it.
const HEARTBEAT_STOP_GRACE: Duration = Duration::from_millis(500);

pub struct GatewayClient {
    url: String,
    state: watch::Sender<ConnectionState>,
}

impl GatewayClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: watch::Sender::new(ConnectionState::Disconnected),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Follow state changes while `run` or `drive` holds the client.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Connect and process frames until shutdown or failure.
    pub async fn run<H>(&mut self, handler: H, shutdown: CancellationToken) -> Result<(), GatewayError>
    where
        H: FnMut(MetadataEvent),
    {
        self.set_state(ConnectionState::Connecting);
        info!("gateway: connecting to {}", self.url);

        let connected = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }
            res = tokio_tungstenite::connect_async(self.url.as_str()) => res,
        };
        let (ws, _response) = match connected {
            Ok(v) => v,
            Err(source) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(GatewayError::Connect {
                    url: self.url.clone(),
                    source,
                });
            }
        };
        info!("gateway: connected");

        let (sink, stream) = ws.split();
        self.drive(sink, stream, handler, shutdown).await
    }

    /// Run the receive loop over an already-open connection.
    pub async fn drive<Tx, Rx, H>(
        &mut self,
        sink: Tx,
        mut stream: Rx,
        mut handler: H,
        shutdown: CancellationToken,
    ) -> Result<(), GatewayError>
    where
        Tx: Sink<Message, Error = WsError> + Unpin + Send + 'static,
        Rx: Stream<Item = Result<Message, WsError>> + Unpin,
        H: FnMut(MetadataEvent),
    {
        self.set_state(ConnectionState::Connected { heartbeat: None });
        let sink = Arc::new(Mutex::new(sink));
        // Bounds the heartbeat to this connection, and follows the global shutdown.
        let connection = shutdown.child_token();
        let mut heartbeat: Option<HeartbeatTask> = None;

        let result = loop {
            tokio::select! {
                biased;

                _ = connection.cancelled() => {
                    debug!("gateway: shutdown requested");
                    break Ok(());
                }

                res = join_heartbeat(&mut heartbeat) => {
                    heartbeat = None;
                    if let Err(e) = res {
                        break Err(e);
                    }
                }

                msg = stream.next() => {
                    let text = match msg {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => {
                            info!("gateway: server closed connection: {:?}", frame);
                            break Err(GatewayError::Closed);
                        }
                        Some(Ok(other)) => {
                            trace!("gateway: ignoring non-text message ({} bytes)", other.len());
                            continue;
                        }
                        Some(Err(e)) => break Err(GatewayError::Transport(e)),
                        None => break Err(GatewayError::Closed),
                    };

                    let frame = match Frame::decode(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("gateway: bad frame {:?}: {}", text, e);
                            break Err(GatewayError::Frame(e));
                        }
                    };

                    match frame {
                        Frame::Welcome { heartbeat: period } => {
                            if heartbeat.is_some() {
                                warn!("gateway: duplicate welcome ignored, heartbeat already running");
                                continue;
                            }
                            info!("gateway: welcome, heartbeat every {:?}", period);
                            self.set_state(ConnectionState::Connected { heartbeat: Some(period) });
                            heartbeat = Some(tokio::spawn(heartbeat_loop(
                                Arc::clone(&sink),
                                period,
                                connection.clone(),
                            )));
                        }
                        Frame::Event(event) => {
                            debug!("gateway: event {:?}", event.kind);
                            handler(event);
                        }
                        Frame::Unknown { op } => trace!("gateway: ignoring op {}", op),
                    }
                }
            }
        };

        connection.cancel();
        if let Some(mut task) = heartbeat.take() {
            match tokio::time::timeout(HEARTBEAT_STOP_GRACE, &mut task).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("gateway: heartbeat task ended abnormally: {}", e),
                Err(_) => {
                    warn!("gateway: heartbeat task did not stop, aborting it");
                    task.abort();
                }
            }
        }
        self.set_state(ConnectionState::Disconnected);
        result
    }
}

/// Resolves when the heartbeat task finishes; pending forever when there is none.
async fn join_heartbeat(task: &mut Option<HeartbeatTask>) -> Result<(), GatewayError> {
    match task {
        Some(handle) => match handle.await {
            Ok(res) => res,
            Err(e) => Err(GatewayError::Heartbeat(e.to_string())),
        },
        None => std::future::pending().await,
    }
}

async fn heartbeat_loop<Tx>(
    sink: Arc<Mutex<Tx>>,
    period: Duration,
    cancel: CancellationToken,
) -> Result<(), GatewayError>
where
    Tx: Sink<Message, Error = WsError> + Unpin + Send,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let payload = OutboundFrame::heartbeat().encode();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        // A stalled transport must not hold the task past cancellation.
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            res = async {
                let mut sink = sink.lock().await;
                sink.send(Message::Text(payload.clone())).await
            } => res,
        };
        sent?;
        trace!("gateway: heartbeat sent");
    }
}
