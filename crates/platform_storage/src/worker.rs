//! Out-of-thread persistence worker and its [`DurableStore`] client.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use platform_host::{DurableStore, DurableStoreFuture, FileNode, StorageError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    channel::{CorrelatedClient, PendingResponse, ResponseDispatcher},
    engine::KvEngine,
    protocol::{RequestFrame, ResponseFrame, WorkerRequest},
};

/// Default deadline for a single worker request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// Default name of the worker thread.
pub const DEFAULT_WORKER_THREAD_NAME: &str = "aether-kernel";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Tunables for [`PersistenceWorker`].
pub struct WorkerConfig {
    /// Requests unanswered after this many milliseconds fail with a timeout.
    pub request_timeout_ms: u64,
    /// Name given to the worker thread (the pump thread appends `-pump`).
    pub thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

impl WorkerConfig {
    /// Request deadline as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}

/// Handle to a running persistence worker.
///
/// The worker thread owns its [`KvEngine`] and serves requests in arrival order. It exits once
/// every client handle has been dropped; pending requests then fail as unavailable.
#[derive(Debug)]
pub struct PersistenceWorker {
    client: CorrelatedClient<WorkerRequest>,
    worker_thread: JoinHandle<()>,
    pump_thread: JoinHandle<()>,
}

impl PersistenceWorker {
    /// Starts the worker and response pump threads around `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] when a thread cannot be spawned.
    pub fn spawn<E>(engine: E, config: &WorkerConfig) -> Result<Self, StorageError>
    where
        E: KvEngine + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<RequestFrame<WorkerRequest>>();
        let (response_tx, response_rx) = mpsc::channel::<ResponseFrame>();

        let worker_thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || serve_requests(engine, request_rx, response_tx))
            .map_err(|err| {
                StorageError::Unavailable(format!("failed to spawn persistence worker: {err}"))
            })?;

        let client = CorrelatedClient::new(request_tx, config.request_timeout());
        let dispatcher = client.dispatcher();
        let pump_thread = thread::Builder::new()
            .name(format!("{}-pump", config.thread_name))
            .spawn(move || pump_responses(response_rx, dispatcher))
            .map_err(|err| {
                StorageError::Unavailable(format!("failed to spawn response pump: {err}"))
            })?;

        log::info!("persistence worker `{}` started", config.thread_name);
        Ok(Self {
            client,
            worker_thread,
            pump_thread,
        })
    }

    /// Returns a [`DurableStore`] client bound to this worker.
    pub fn store(&self) -> WorkerDurableStore {
        WorkerDurableStore {
            client: self.client.clone(),
        }
    }

    /// Drops this handle's client and waits for both threads to exit.
    ///
    /// Blocks until every other [`WorkerDurableStore`] clone has been dropped as well.
    pub fn join(self) {
        let Self {
            client,
            worker_thread,
            pump_thread,
        } = self;
        drop(client);
        for handle in [worker_thread, pump_thread] {
            if handle.join().is_err() {
                log::error!("persistence thread panicked during shutdown");
            }
        }
    }
}

fn serve_requests<E: KvEngine>(
    engine: E,
    requests: Receiver<RequestFrame<WorkerRequest>>,
    responses: Sender<ResponseFrame>,
) {
    let mut engine = LazyEngine::new(engine);
    for frame in requests {
        let op = frame.request.op_name();
        let response = match engine.handle(frame.request) {
            Ok(result) => ResponseFrame::success(frame.id, result),
            Err(err) => {
                log::warn!("persistence {op} {} failed: {err}", frame.id);
                ResponseFrame::failure(frame.id, err)
            }
        };
        if responses.send(response).is_err() {
            break;
        }
    }
    log::debug!("persistence worker stopped");
}

fn pump_responses(responses: Receiver<ResponseFrame>, dispatcher: ResponseDispatcher) {
    let interval = dispatcher.sweep_interval();
    loop {
        match responses.recv_timeout(interval) {
            Ok(frame) => {
                dispatcher.dispatch(frame);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                dispatcher.close("persistence worker exited");
                break;
            }
        }
        dispatcher.expire_overdue(Instant::now());
    }
}

struct LazyEngine<E> {
    engine: E,
    opened: bool,
}

impl<E: KvEngine> LazyEngine<E> {
    fn new(engine: E) -> Self {
        Self {
            engine,
            opened: false,
        }
    }

    fn ensure_open(&mut self) -> Result<(), String> {
        if !self.opened {
            self.engine.open()?;
            self.opened = true;
        }
        Ok(())
    }

    fn handle(&mut self, request: WorkerRequest) -> Result<Value, String> {
        self.ensure_open()?;
        match request {
            WorkerRequest::Read { key } => Ok(self.engine.get(&key)?.unwrap_or(Value::Null)),
            WorkerRequest::Write { key, value } => {
                self.engine.put(&key, value)?;
                Ok(Value::Null)
            }
            WorkerRequest::Delete { key } => {
                self.engine.delete(&key)?;
                Ok(Value::Null)
            }
            WorkerRequest::GetAllKeys {} => Ok(Value::from(self.engine.keys()?)),
        }
    }
}

#[derive(Debug, Clone)]
/// [`DurableStore`] backed by a [`PersistenceWorker`].
pub struct WorkerDurableStore {
    client: CorrelatedClient<WorkerRequest>,
}

impl WorkerDurableStore {
    /// Wraps an existing correlated client, for transports other than the built-in thread.
    pub fn from_client(client: CorrelatedClient<WorkerRequest>) -> Self {
        Self { client }
    }

    /// Number of requests awaiting a worker response.
    pub fn in_flight(&self) -> usize {
        self.client.in_flight()
    }
}

fn decode<T: DeserializeOwned + 'static>(
    pending: PendingResponse,
) -> DurableStoreFuture<Result<T, StorageError>> {
    Box::pin(async move {
        let value = pending.await?;
        serde_json::from_value(value).map_err(|err| StorageError::Codec(err.to_string()))
    })
}

fn acknowledge(pending: PendingResponse) -> DurableStoreFuture<Result<(), StorageError>> {
    Box::pin(async move { pending.await.map(|_| ()) })
}

impl DurableStore for WorkerDurableStore {
    fn read(&self, key: String) -> DurableStoreFuture<Result<Option<FileNode>, StorageError>> {
        decode(self.client.call(WorkerRequest::Read { key }))
    }

    fn write(&self, key: String, value: FileNode) -> DurableStoreFuture<Result<(), StorageError>> {
        let value = match serde_json::to_value(&value) {
            Ok(value) => value,
            Err(err) => {
                let err = StorageError::Codec(err.to_string());
                return Box::pin(async move { Err(err) });
            }
        };
        acknowledge(self.client.call(WorkerRequest::Write { key, value }))
    }

    fn delete(&self, key: String) -> DurableStoreFuture<Result<(), StorageError>> {
        acknowledge(self.client.call(WorkerRequest::Delete { key }))
    }

    fn get_all_keys(&self) -> DurableStoreFuture<Result<Vec<String>, StorageError>> {
        decode(self.client.call(WorkerRequest::GetAllKeys {}))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use futures::{executor::block_on, future::join_all};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::engine::{JsonFileKvEngine, MemoryKvEngine};

    fn spawn_memory_worker() -> PersistenceWorker {
        PersistenceWorker::spawn(MemoryKvEngine::default(), &WorkerConfig::default())
            .expect("spawn worker")
    }

    #[derive(Default)]
    struct CountingEngine {
        inner: MemoryKvEngine,
        opens: Arc<AtomicUsize>,
    }

    impl KvEngine for CountingEngine {
        fn open(&mut self) -> Result<(), String> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.inner.open()
        }
        fn get(&self, key: &str) -> Result<Option<Value>, String> {
            self.inner.get(key)
        }
        fn put(&mut self, key: &str, value: Value) -> Result<(), String> {
            if key.starts_with("/readonly") {
                return Err(format!("{key} is read-only"));
            }
            self.inner.put(key, value)
        }
        fn delete(&mut self, key: &str) -> Result<(), String> {
            self.inner.delete(key)
        }
        fn keys(&self) -> Result<Vec<String>, String> {
            self.inner.keys()
        }
    }

    struct StalledEngine;

    impl KvEngine for StalledEngine {
        fn open(&mut self) -> Result<(), String> {
            Ok(())
        }
        fn get(&self, _key: &str) -> Result<Option<Value>, String> {
            thread::sleep(Duration::from_millis(200));
            Ok(None)
        }
        fn put(&mut self, _key: &str, _value: Value) -> Result<(), String> {
            Ok(())
        }
        fn delete(&mut self, _key: &str) -> Result<(), String> {
            Ok(())
        }
        fn keys(&self) -> Result<Vec<String>, String> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn worker_serves_all_four_operations() {
        let worker = spawn_memory_worker();
        let store = worker.store();
        let node = FileNode::file("/notes.txt", "hello", 5);

        assert_eq!(block_on(store.get_all_keys()).expect("keys"), Vec::<String>::new());
        block_on(store.write("/notes.txt".into(), node.clone())).expect("write");
        assert_eq!(
            block_on(store.read("/notes.txt".into())).expect("read"),
            Some(node)
        );
        assert_eq!(
            block_on(store.get_all_keys()).expect("keys"),
            vec!["/notes.txt".to_string()]
        );
        block_on(store.delete("/notes.txt".into())).expect("delete");
        assert_eq!(block_on(store.read("/notes.txt".into())).expect("read"), None);
    }

    #[test]
    fn engine_is_opened_once_across_many_requests() {
        let opens = Arc::new(AtomicUsize::new(0));
        let engine = CountingEngine {
            opens: Arc::clone(&opens),
            ..CountingEngine::default()
        };
        let worker = PersistenceWorker::spawn(engine, &WorkerConfig::default()).expect("spawn");
        let store = worker.store();
        assert_eq!(opens.load(Ordering::SeqCst), 0);

        for i in 0..5 {
            let path = format!("/f{i}");
            block_on(store.write(path.clone(), FileNode::file(path, "x", 1))).expect("write");
        }
        block_on(store.get_all_keys()).expect("keys");
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn overlapping_requests_complete_and_failures_stay_isolated() {
        let worker =
            PersistenceWorker::spawn(CountingEngine::default(), &WorkerConfig::default())
                .expect("spawn");
        let store = worker.store();

        let writes = (0..16)
            .map(|i| {
                let path = format!("/docs/{i}.txt");
                store.write(path.clone(), FileNode::file(path, format!("{i}"), 1))
            })
            .collect::<Vec<_>>();
        let rejected = store.write(
            "/readonly/x".into(),
            FileNode::file("/readonly/x", "nope", 1),
        );

        for result in block_on(join_all(writes)) {
            result.expect("write should succeed");
        }
        assert_eq!(
            block_on(rejected),
            Err(StorageError::OperationFailed(
                "/readonly/x is read-only".to_string()
            ))
        );
        assert_eq!(block_on(store.get_all_keys()).expect("keys").len(), 16);
        assert_eq!(store.in_flight(), 0);
    }

    #[test]
    fn stalled_requests_time_out() {
        let config = WorkerConfig {
            request_timeout_ms: 20,
            ..WorkerConfig::default()
        };
        let worker = PersistenceWorker::spawn(StalledEngine, &config).expect("spawn");
        let store = worker.store();
        assert_eq!(
            block_on(store.read("/slow".into())),
            Err(StorageError::Timeout)
        );
    }

    #[test]
    fn json_file_worker_survives_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("kernel.json");
        let node = FileNode::directory("/home", 9);

        let worker = PersistenceWorker::spawn(JsonFileKvEngine::new(&file), &WorkerConfig::default())
            .expect("spawn");
        let store = worker.store();
        block_on(store.write("/home".into(), node.clone())).expect("write");
        drop(store);
        worker.join();

        let worker = PersistenceWorker::spawn(JsonFileKvEngine::new(&file), &WorkerConfig::default())
            .expect("respawn");
        let store = worker.store();
        assert_eq!(block_on(store.read("/home".into())).expect("read"), Some(node));
    }
}
