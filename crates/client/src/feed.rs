//! Live operational feed: log stream + health gauges.
//!
//! [`LiveFeed`] owns a single long-lived push-channel connection and a
//! periodic health poll, folding everything it receives into one
//! [`DashboardState`]. The spawned task is the only writer of that
//! state; consumers read snapshots or subscribe to the rebroadcast
//! [`FeedEvent`] stream. The feed is global -- it is not tied to any
//! job identifier.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use scrapedeck_core::health::HealthSample;
use scrapedeck_core::log::LogEvent;

use crate::api::ScrapeApi;
use crate::client::{FeedClient, FeedConnection};
use crate::config::ClientConfig;
use crate::events::{apply, DashboardState, FeedEvent};
use crate::messages::{parse_message, subscribe_message, FeedMessage, TOPIC_LOGS};
use crate::reconnect::{reconnect_loop, ReconnectAbort, ReconnectConfig};

/// Capacity of the feed event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shared handle to the live feed.
///
/// Created once via [`LiveFeed::start`]; the returned `Arc` can be
/// cheaply cloned into every display consumer.
pub struct LiveFeed {
    state: RwLock<DashboardState>,
    event_tx: broadcast::Sender<FeedEvent>,
    cancel: CancellationToken,
    task: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl LiveFeed {
    /// Connect the push channel and start the periodic health poll.
    ///
    /// The spawned task reconnects on drop per `reconnect` and exits
    /// when `cancel` fires (or the attempt limit is exhausted).
    pub fn start(
        config: &ClientConfig,
        api: Arc<ScrapeApi>,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let feed = Arc::new(Self {
            state: RwLock::new(DashboardState::new(config.log_capacity)),
            event_tx,
            cancel: cancel.clone(),
            task: std::sync::Mutex::new(None),
        });

        let client = FeedClient::new(config.ws_url.clone());
        let health_interval = config.health_interval;
        let task_feed = Arc::clone(&feed);

        let handle = tokio::spawn(async move {
            task_feed
                .run(client, api, reconnect, health_interval, cancel)
                .await;
            tracing::info!("Live feed task exited");
        });

        *feed.task.lock().expect("feed task mutex poisoned") = Some(handle);
        feed
    }

    /// Subscribe to the raw feed event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.event_tx.subscribe()
    }

    /// Current log events, oldest first.
    pub async fn logs(&self) -> Vec<LogEvent> {
        self.state.read().await.logs.events().cloned().collect()
    }

    /// Error-reports view: the ERROR subset of the current buffer,
    /// recomputed on demand.
    pub async fn error_logs(&self) -> Vec<LogEvent> {
        self.state.read().await.logs.errors().cloned().collect()
    }

    /// Latest health sample.
    pub async fn health(&self) -> HealthSample {
        self.state.read().await.health
    }

    /// Whether the push channel is currently connected.
    pub async fn connected(&self) -> bool {
        self.state.read().await.connected
    }

    /// Stop the feed task and wait briefly for a clean exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().expect("feed task mutex poisoned").take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
    }

    // ---- private: the single-writer task ----

    /// Connect -> process session -> reconnect, until cancelled.
    async fn run(
        &self,
        client: FeedClient,
        api: Arc<ScrapeApi>,
        reconnect: ReconnectConfig,
        health_interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut conn = match client.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "Push channel connect failed, entering reconnect loop");
                self.fold(FeedEvent::Error(e.to_string())).await;
                match reconnect_loop(&client, &reconnect, &cancel).await {
                    Ok(conn) => conn,
                    Err(abort) => return self.report_abort(abort).await,
                }
            }
        };

        loop {
            self.fold(FeedEvent::Open).await;
            self.run_session(conn, &api, health_interval, &cancel).await;
            self.fold(FeedEvent::Close).await;

            if cancel.is_cancelled() {
                return;
            }

            tracing::info!("Push channel lost, entering reconnect loop");
            conn = match reconnect_loop(&client, &reconnect, &cancel).await {
                Ok(conn) => conn,
                Err(abort) => return self.report_abort(abort).await,
            };
        }
    }

    /// Fold the terminal reconnect outcome, if it deserves surfacing.
    async fn report_abort(&self, abort: ReconnectAbort) {
        if abort == ReconnectAbort::AttemptsExhausted {
            tracing::error!("Push channel reconnection exhausted");
            self.fold(FeedEvent::Error(
                "push channel reconnection exhausted".to_string(),
            ))
            .await;
        }
    }

    /// Drive one connected session: declare subscriptions, then fold
    /// inbound frames and periodic health polls until the connection
    /// ends or the feed is cancelled.
    async fn run_session(
        &self,
        conn: FeedConnection,
        api: &ScrapeApi,
        health_interval: Duration,
        cancel: &CancellationToken,
    ) {
        let (mut sink, mut stream) = conn.ws_stream.split();

        if let Err(e) = sink.send(Message::Text(subscribe_message(TOPIC_LOGS))).await {
            tracing::error!(error = %e, "Failed to send subscription");
            return;
        }

        // The first tick fires immediately; it is the initial health
        // fetch.
        let mut health_ticker = tokio::time::interval(health_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = health_ticker.tick() => {
                    self.poll_health(api, cancel).await;
                }
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_frame(&text).await;
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                            // Handled automatically by tungstenite.
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Push channel closed");
                            return;
                        }
                        Some(Ok(_)) => {
                            // Binary / raw frames are not part of the feed contract.
                        }
                        Some(Err(e)) => {
                            tracing::error!(error = %e, "Push channel receive error");
                            self.fold(FeedEvent::Error(e.to_string())).await;
                            return;
                        }
                        None => {
                            tracing::info!("Push channel stream exhausted");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Parse and fold one inbound text frame.
    async fn handle_text_frame(&self, text: &str) {
        match parse_message(text) {
            Ok(message) => {
                if let FeedMessage::Other { topic } = &message {
                    // Forward-compatible: topics we do not consume are
                    // dropped by the reducer.
                    tracing::debug!(topic = %topic, "Ignoring unrecognized topic");
                }
                self.fold(FeedEvent::Message(message)).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, raw_frame = %text, "Failed to parse push message");
            }
        }
    }

    /// Poll the health endpoint; the sample folds exactly like a pushed
    /// one.
    async fn poll_health(&self, api: &ScrapeApi, cancel: &CancellationToken) {
        let result = tokio::select! {
            _ = cancel.cancelled() => return,
            result = api.health() => result,
        };
        if cancel.is_cancelled() {
            return;
        }
        match result {
            Ok(sample) => {
                self.fold(FeedEvent::Message(FeedMessage::Health(sample)))
                    .await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Health poll failed");
            }
        }
    }

    /// Single-writer fold: mutate the state, then rebroadcast the event
    /// to subscribers.
    async fn fold(&self, event: FeedEvent) {
        apply(&mut *self.state.write().await, event.clone());
        let _ = self.event_tx.send(event);
    }
}
