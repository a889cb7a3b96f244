//! Signal dispatcher for Home Assistant integrations
//!
//! The dispatcher is the in-process channel an integration uses to hand
//! already-decoded device notifications to its entities. Signals are plain
//! strings, conventionally `{device_id}_{event}`; there are no wildcard or
//! pattern subscriptions.
//!
//! Unlike the event bus, delivery is direct: [`Dispatcher::send`] awaits
//! every handler connected to the signal, in connection order.

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

/// Error type a signal handler may fail with
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a single handler invocation
pub type HandlerResult = Result<(), BoxError>;

/// A stored signal handler
pub type SignalHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Errors raised while delivering a signal
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// The payload did not match the type the handler was connected with
    #[error("invalid payload for signal '{signal}': {source}")]
    InvalidPayload {
        signal: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A unique identifier for a connected handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    handler: SignalHandler,
}

/// In-memory signal → handlers map
pub struct Dispatcher {
    /// Connected handlers keyed by signal, in connection order
    signals: DashMap<String, Vec<Listener>>,
    /// Counter for generating unique listener IDs
    next_listener_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            signals: DashMap::new(),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Connect a handler to a signal
    ///
    /// The returned [`Unsubscribe`] is the only way to disconnect the
    /// handler again; dropping it leaves the handler connected.
    pub fn connect<F, Fut>(self: &Arc<Self>, signal: impl Into<String>, handler: F) -> Unsubscribe
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let signal = signal.into();
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        let handler: SignalHandler =
            Arc::new(move |payload: Value| -> BoxFuture<'static, HandlerResult> {
                Box::pin(handler(payload))
            });

        trace!(signal = %signal, listener = id.0, "Connecting signal handler");
        self.signals
            .entry(signal.clone())
            .or_default()
            .push(Listener { id, handler });

        Unsubscribe {
            dispatcher: Arc::downgrade(self),
            signal,
            id,
        }
    }

    /// Connect a handler that receives the payload decoded as `T`
    ///
    /// A payload that does not decode fails the invocation with
    /// [`DispatcherError::InvalidPayload`] and the handler is not called.
    pub fn connect_typed<T, F, Fut>(
        self: &Arc<Self>,
        signal: impl Into<String>,
        handler: F,
    ) -> Unsubscribe
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let signal = signal.into();
        let signal_name = signal.clone();
        let handler = Arc::new(handler);

        self.connect(signal, move |payload| {
            let decoded = serde_json::from_value::<T>(payload).map_err(|source| {
                DispatcherError::InvalidPayload {
                    signal: signal_name.clone(),
                    source,
                }
            });
            let handler = handler.clone();
            async move { handler(decoded?).await }
        })
    }

    /// Deliver a payload to every handler connected to `signal`
    ///
    /// Handlers run one after another in connection order. A failing
    /// handler is logged and does not stop delivery to the rest. Returns
    /// the number of handlers invoked.
    pub async fn send(&self, signal: &str, payload: Value) -> usize {
        // Snapshot the handlers so none of the map's locks are held while
        // a handler runs (it may connect or disconnect).
        let handlers: Vec<(ListenerId, SignalHandler)> = match self.signals.get(signal) {
            Some(listeners) => listeners
                .iter()
                .map(|l| (l.id, l.handler.clone()))
                .collect(),
            None => {
                trace!(signal, "No handlers connected");
                return 0;
            }
        };

        debug!(signal, handlers = handlers.len(), "Dispatching signal");

        for (id, handler) in &handlers {
            if let Err(err) = handler(payload.clone()).await {
                error!(signal, listener = id.0, error = %err, "Error running signal handler");
            }
        }

        handlers.len()
    }

    /// Schedule delivery of a payload on the runtime without waiting for it
    pub fn send_detached(
        self: &Arc<Self>,
        signal: impl Into<String>,
        payload: Value,
    ) -> JoinHandle<usize> {
        let dispatcher = self.clone();
        let signal = signal.into();
        tokio::spawn(async move { dispatcher.send(&signal, payload).await })
    }

    fn disconnect(&self, signal: &str, id: ListenerId) -> bool {
        let removed = match self.signals.get_mut(signal) {
            Some(mut listeners) => {
                let before = listeners.len();
                listeners.retain(|l| l.id != id);
                listeners.len() != before
            }
            None => false,
        };
        self.signals.remove_if(signal, |_, listeners| listeners.is_empty());

        trace!(signal, listener = id.0, removed, "Disconnected signal handler");
        removed
    }

    /// Number of handlers connected to exactly `signal`
    pub fn subscription_count(&self, signal: &str) -> usize {
        self.signals.get(signal).map(|l| l.len()).unwrap_or(0)
    }

    /// Number of handlers connected to any signal starting with `prefix`
    ///
    /// Plain string matching: the prefix `abc_` also covers `abc_x_battery`.
    pub fn subscription_count_with_prefix(&self, prefix: &str) -> usize {
        self.signals
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.value().len())
            .sum()
    }

    /// Number of signals with at least one handler
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle that disconnects one handler from the dispatcher
#[must_use = "dropping an Unsubscribe leaves the handler connected"]
#[derive(Debug)]
pub struct Unsubscribe {
    dispatcher: Weak<Dispatcher>,
    signal: String,
    id: ListenerId,
}

impl Unsubscribe {
    /// Disconnect the handler
    ///
    /// Returns false if the dispatcher is gone or the handler was already
    /// removed.
    pub fn call(self) -> bool {
        match self.dispatcher.upgrade() {
            Some(dispatcher) => dispatcher.disconnect(&self.signal, self.id),
            None => false,
        }
    }

    pub fn signal(&self) -> &str {
        &self.signal
    }
}

/// Thread-safe wrapper for Dispatcher
pub type SharedDispatcher = Arc<Dispatcher>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<Value>>>, impl Fn(Value) -> BoxFuture<'static, HandlerResult>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = move |payload: Value| -> BoxFuture<'static, HandlerResult> {
            sink.lock().unwrap().push(payload);
            Box::pin(async { Ok(()) })
        };
        (seen, handler)
    }

    #[tokio::test]
    async fn test_connect_and_send() {
        let dispatcher = Arc::new(Dispatcher::new());
        let (seen, handler) = recorder();
        let _unsub = dispatcher.connect("abc_battery", handler);

        let delivered = dispatcher.send("abc_battery", json!({"isCharging": true})).await;

        assert_eq!(delivered, 1);
        assert_eq!(seen.lock().unwrap().as_slice(), &[json!({"isCharging": true})]);
    }

    #[tokio::test]
    async fn test_no_cross_signal_delivery() {
        let dispatcher = Arc::new(Dispatcher::new());
        let (seen, handler) = recorder();
        let _unsub = dispatcher.connect("abc_battery", handler);

        assert_eq!(dispatcher.send("abc_proximity", json!({})).await, 0);
        assert_eq!(dispatcher.send("abc_battery_extra", json!({})).await, 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_follows_publish_order() {
        let dispatcher = Arc::new(Dispatcher::new());
        let (seen, handler) = recorder();
        let _unsub = dispatcher.connect("abc_connection_status", handler);

        for value in [true, false, true] {
            dispatcher.send("abc_connection_status", json!(value)).await;
        }

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[json!(true), json!(false), json!(true)]
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_disconnects() {
        let dispatcher = Arc::new(Dispatcher::new());
        let (seen, handler) = recorder();
        let unsub = dispatcher.connect("abc_battery", handler);
        assert_eq!(dispatcher.subscription_count("abc_battery"), 1);

        assert!(unsub.call());

        assert_eq!(dispatcher.subscription_count("abc_battery"), 0);
        assert_eq!(dispatcher.signal_count(), 0);
        assert_eq!(dispatcher.send("abc_battery", json!({})).await, 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_only_removes_own_handler() {
        let dispatcher = Arc::new(Dispatcher::new());
        let (_, first) = recorder();
        let (seen, second) = recorder();
        let first = dispatcher.connect("abc_battery", first);
        let _second = dispatcher.connect("abc_battery", second);

        first.call();

        assert_eq!(dispatcher.subscription_count("abc_battery"), 1);
        dispatcher.send("abc_battery", json!(1)).await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unsubscribe_after_dispatcher_dropped() {
        let dispatcher = Arc::new(Dispatcher::new());
        let (_, handler) = recorder();
        let unsub = dispatcher.connect("abc_battery", handler);
        drop(dispatcher);

        assert!(!unsub.call());
    }

    #[test]
    fn test_prefix_count() {
        let dispatcher = Arc::new(Dispatcher::new());
        let handles: Vec<Unsubscribe> = ["abc_battery", "abc_proximity", "xyz_battery"]
            .into_iter()
            .map(|signal| dispatcher.connect(signal, |_| async { Ok(()) }))
            .collect();

        assert_eq!(dispatcher.subscription_count_with_prefix("abc_"), 2);
        assert_eq!(dispatcher.subscription_count_with_prefix("xyz_"), 1);

        for handle in handles {
            handle.call();
        }
        assert_eq!(dispatcher.subscription_count_with_prefix("abc_"), 0);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_delivery() {
        let dispatcher = Arc::new(Dispatcher::new());
        let _failing = dispatcher.connect("abc_battery", |_| async {
            Err::<(), BoxError>("boom".into())
        });
        let (seen, handler) = recorder();
        let _ok = dispatcher.connect("abc_battery", handler);

        assert_eq!(dispatcher.send("abc_battery", json!(1)).await, 2);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[derive(Debug, Deserialize)]
    struct Tag {
        value: String,
    }

    #[tokio::test]
    async fn test_typed_handler() {
        let dispatcher = Arc::new(Dispatcher::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _unsub = dispatcher.connect_typed("abc_proximity", move |tag: Tag| {
            sink.lock().unwrap().push(tag.value);
            async { Ok(()) }
        });

        dispatcher
            .send("abc_proximity", json!({"value": "proximityPresenceDetected"}))
            .await;
        // Wrong shape: logged, handler body not reached
        dispatcher.send("abc_proximity", json!(42)).await;

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &["proximityPresenceDetected".to_string()]
        );
    }

    #[tokio::test]
    async fn test_send_detached() {
        let dispatcher = Arc::new(Dispatcher::new());
        let (seen, handler) = recorder();
        let _unsub = dispatcher.connect("abc_battery", handler);

        let delivered = dispatcher
            .send_detached("abc_battery", json!("later"))
            .await
            .unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(seen.lock().unwrap().as_slice(), &[json!("later")]);
    }
}
