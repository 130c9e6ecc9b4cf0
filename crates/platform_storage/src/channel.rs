//! Typed request/response channel keyed by correlation id.
//!
//! [`CorrelatedClient`] is transport independent: it hands [`RequestFrame`]s to a
//! [`FrameTransport`] and resolves the caller's future when a [`ResponseFrame`] with the same id is
//! fed back through its [`ResponseDispatcher`]. Whoever owns the receiving side of the transport
//! (a pump thread, a socket reader, a test) drives the dispatcher.

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc, Arc,
    },
    task::{Context, Poll},
    time::{Duration, Instant},
};

use futures::channel::oneshot;
use parking_lot::Mutex;
use platform_host::StorageError;
use serde_json::Value;

use crate::protocol::{RequestFrame, RequestId, ResponseFrame};

/// Outbound half of a request/response transport.
pub trait FrameTransport<R>: Send + Sync {
    /// Sends one request frame.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] when the peer is gone.
    fn send(&self, frame: RequestFrame<R>) -> Result<(), StorageError>;
}

impl<R: Send> FrameTransport<R> for mpsc::Sender<RequestFrame<R>> {
    fn send(&self, frame: RequestFrame<R>) -> Result<(), StorageError> {
        mpsc::Sender::send(self, frame)
            .map_err(|_| StorageError::Unavailable("request channel closed".to_string()))
    }
}

struct PendingEntry {
    issued_at: Instant,
    reply: oneshot::Sender<Result<Value, StorageError>>,
}

struct ChannelState {
    pending: Mutex<HashMap<RequestId, PendingEntry>>,
    closed: AtomicBool,
    timeout: Duration,
}

impl ChannelState {
    fn resolve(&self, id: RequestId, outcome: Result<Value, StorageError>) -> bool {
        let entry = self.pending.lock().remove(&id);
        match entry {
            Some(entry) => {
                // The caller may have dropped its future; that is not an error.
                let _ = entry.reply.send(outcome);
                true
            }
            None => false,
        }
    }
}

/// Client half of a correlated request/response channel.
pub struct CorrelatedClient<R> {
    transport: Arc<dyn FrameTransport<R>>,
    state: Arc<ChannelState>,
    next_id: Arc<AtomicU64>,
}

impl<R> Clone for CorrelatedClient<R> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            state: Arc::clone(&self.state),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<R> std::fmt::Debug for CorrelatedClient<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelatedClient")
            .field("in_flight", &self.in_flight())
            .field("closed", &self.state.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl<R> CorrelatedClient<R> {
    /// Creates a client that fails requests still unanswered after `timeout`.
    pub fn new(transport: impl FrameTransport<R> + 'static, timeout: Duration) -> Self {
        Self {
            transport: Arc::new(transport),
            state: Arc::new(ChannelState {
                pending: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
                timeout,
            }),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Returns the handle used to feed responses back into this client.
    pub fn dispatcher(&self) -> ResponseDispatcher {
        ResponseDispatcher {
            state: Arc::clone(&self.state),
        }
    }

    /// Number of requests awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.state.pending.lock().len()
    }

    /// Returns `true` once the response side has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Sends `request` immediately and returns a future for its response.
    ///
    /// The request is on the wire when this returns; dropping the future only discards the
    /// response.
    pub fn call(&self, request: R) -> PendingResponse {
        if self.is_closed() {
            return PendingResponse::ready(Err(StorageError::Unavailable(
                "persistence channel closed".to_string(),
            )));
        }

        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply, receiver) = oneshot::channel();
        self.state.pending.lock().insert(
            id,
            PendingEntry {
                issued_at: Instant::now(),
                reply,
            },
        );

        if let Err(err) = self.transport.send(RequestFrame { id, request }) {
            self.state.pending.lock().remove(&id);
            return PendingResponse::ready(Err(err));
        }
        PendingResponse {
            id: Some(id),
            inner: PendingInner::Waiting(receiver),
        }
    }
}

/// Response side of a [`CorrelatedClient`]; safe to move to another thread.
#[derive(Clone)]
pub struct ResponseDispatcher {
    state: Arc<ChannelState>,
}

impl std::fmt::Debug for ResponseDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseDispatcher")
            .field("timeout", &self.state.timeout)
            .finish()
    }
}

impl ResponseDispatcher {
    /// Routes a response to the request with the same id and detaches it.
    ///
    /// Returns `false` when no request with that id is pending (late, duplicate, or foreign).
    pub fn dispatch(&self, frame: ResponseFrame) -> bool {
        let id = frame.id;
        let outcome = frame.into_result().map_err(StorageError::OperationFailed);
        let delivered = self.state.resolve(id, outcome);
        if !delivered {
            log::debug!("dropping response for unknown request {id}");
        }
        delivered
    }

    /// Fails every request issued more than the configured timeout before `now`.
    ///
    /// Returns how many requests were expired.
    pub fn expire_overdue(&self, now: Instant) -> usize {
        let timeout = self.state.timeout;
        let overdue = {
            let mut pending = self.state.pending.lock();
            let ids = pending
                .iter()
                .filter(|(_, entry)| now.saturating_duration_since(entry.issued_at) >= timeout)
                .map(|(id, _)| *id)
                .collect::<Vec<_>>();
            ids.into_iter()
                .filter_map(|id| pending.remove(&id))
                .collect::<Vec<_>>()
        };
        let count = overdue.len();
        for entry in overdue {
            let _ = entry.reply.send(Err(StorageError::Timeout));
        }
        if count > 0 {
            log::warn!("expired {count} persistence request(s) after {timeout:?}");
        }
        count
    }

    /// Marks the channel closed and fails every pending request as unavailable.
    pub fn close(&self, reason: &str) {
        self.state.closed.store(true, Ordering::Release);
        let drained = self
            .state
            .pending
            .lock()
            .drain()
            .map(|(_, entry)| entry)
            .collect::<Vec<_>>();
        for entry in drained {
            let _ = entry
                .reply
                .send(Err(StorageError::Unavailable(reason.to_string())));
        }
    }

    /// Suggested polling interval for timeout sweeps.
    pub fn sweep_interval(&self) -> Duration {
        (self.state.timeout / 4).clamp(Duration::from_millis(5), Duration::from_millis(250))
    }
}

enum PendingInner {
    Ready(Option<Result<Value, StorageError>>),
    Waiting(oneshot::Receiver<Result<Value, StorageError>>),
}

/// Future resolving to the response of one correlated request.
pub struct PendingResponse {
    id: Option<RequestId>,
    inner: PendingInner,
}

impl PendingResponse {
    fn ready(outcome: Result<Value, StorageError>) -> Self {
        Self {
            id: None,
            inner: PendingInner::Ready(Some(outcome)),
        }
    }

    /// Correlation id assigned to the request, if it reached the transport.
    pub fn id(&self) -> Option<RequestId> {
        self.id
    }
}

impl Future for PendingResponse {
    type Output = Result<Value, StorageError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.inner {
            PendingInner::Ready(outcome) => Poll::Ready(outcome.take().unwrap_or_else(|| {
                Err(StorageError::Unavailable(
                    "response already consumed".to_string(),
                ))
            })),
            PendingInner::Waiting(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(StorageError::Unavailable(
                    "persistence channel dropped the request".to_string(),
                ))),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}
