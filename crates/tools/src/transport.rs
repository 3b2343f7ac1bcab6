//! Line-delimited JSON-RPC channel to one tool provider.
//!
//! Every request gets a fresh integer id; a background task reads the
//! provider's output and hands each response to the caller waiting on that id.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{TransportError, TransportResult};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

/// Default time a caller waits for a matching response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Time a provider gets to exit after its stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type PendingMap = Arc<std::sync::Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// How to launch a provider process.
#[derive(Debug, Clone)]
pub struct ProviderCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ProviderCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Request/response channel to one provider.
pub struct Transport {
    provider: String,
    writer: Mutex<Option<BoxedWriter>>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    request_timeout: Duration,
    reader: JoinHandle<()>,
    child: Mutex<Option<Child>>,
}

impl Transport {
    /// Launch the provider as a child process talking over its stdin/stdout.
    ///
    /// The child's stderr is inherited so provider logs reach the operator.
    pub fn spawn(provider: &str, command: &ProviderCommand) -> TransportResult<Self> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let spawn_error = |source: std::io::Error| TransportError::Spawn {
            provider: provider.to_string(),
            source,
        };

        let mut child = cmd.spawn().map_err(spawn_error)?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error(std::io::Error::other("stdin was not captured")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error(std::io::Error::other("stdout was not captured")))?;

        debug!(
            provider,
            program = %command.program.display(),
            pid = ?child.id(),
            "Spawned provider"
        );

        let mut transport = Self::from_io(provider, stdout, stdin);
        *transport.child.get_mut() = Some(child);
        Ok(transport)
    }

    /// Build a transport over an arbitrary byte stream pair.
    pub fn from_io<R, W>(provider: &str, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::default();
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_responses(
            provider.to_string(),
            reader,
            Arc::clone(&pending),
            Arc::clone(&closed),
        ));

        Self {
            provider: provider.to_string(),
            writer: Mutex::new(Some(Box::new(writer))),
            pending,
            closed,
            next_id: AtomicU64::new(1),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reader,
            child: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Whether the provider has stopped producing output.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send a request and wait for its response.
    pub async fn request(&self, method: &str, params: Option<Value>) -> TransportResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        // The reader may have drained the map before our insert.
        if self.is_closed() {
            lock(&self.pending).remove(&id);
            return Err(TransportError::Closed);
        }

        if let Err(e) = self.send(&JsonRpcRequest::new(id, method, params)).await {
            lock(&self.pending).remove(&id);
            return Err(e);
        }
        debug!(provider = %self.provider, id, method, "Sent request");

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(TransportError::Closed),
            Err(_) => {
                lock(&self.pending).remove(&id);
                return Err(TransportError::Timeout {
                    method: method.to_string(),
                    timeout: self.request_timeout,
                });
            }
        };

        if let Some(error) = response.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Send a notification; no response is expected.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> TransportResult<()> {
        self.send(&JsonRpcRequest::notification(method, params)).await
    }

    async fn send(&self, message: &JsonRpcRequest) -> TransportResult<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Close the channel and reap the provider process, if any.
    pub async fn close(&self) -> TransportResult<()> {
        // Dropping the writer closes the provider's stdin.
        drop(self.writer.lock().await.take());

        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!(provider = %self.provider, %status, "Provider exited"),
                Ok(Err(e)) => {
                    warn!(provider = %self.provider, error = %e, "Failed to wait for provider");
                }
                Err(_) => {
                    warn!(
                        provider = %self.provider,
                        "Provider did not exit after stdin closed, killing it"
                    );
                    child.kill().await?;
                }
            }
        }

        self.reader.abort();
        self.closed.store(true, Ordering::Release);
        lock(&self.pending).clear();
        Ok(())
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_responses<R>(
    provider: String,
    reader: R,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
) where
    R: AsyncRead + Send + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if !line.is_empty() {
                    dispatch(&provider, line, &pending);
                }
            }
            Ok(None) => {
                debug!(provider, "Provider closed its output");
                break;
            }
            Err(e) => {
                warn!(provider, error = %e, "Failed reading from provider");
                break;
            }
        }
    }

    closed.store(true, Ordering::Release);
    // Dropping the senders fails every outstanding call with `Closed`.
    lock(&pending).clear();
}

fn dispatch(provider: &str, line: &str, pending: &PendingMap) {
    let message: Value = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            warn!(provider, error = %e, "Ignoring malformed message from provider");
            return;
        }
    };

    if let Some(method) = message.get("method").and_then(Value::as_str) {
        debug!(provider, method, "Ignoring provider-initiated message");
        return;
    }

    let response: JsonRpcResponse = match serde_json::from_value(message) {
        Ok(response) => response,
        Err(e) => {
            warn!(provider, error = %e, "Ignoring message that is not a JSON-RPC response");
            return;
        }
    };

    let Some(id) = response.id.as_u64() else {
        warn!(provider, id = %response.id, "Ignoring response without a numeric id");
        return;
    };

    match lock(pending).remove(&id) {
        Some(tx) => {
            // The caller may have timed out and gone away.
            let _ = tx.send(response);
        }
        None => warn!(provider, id, "Dropping response for unknown request"),
    }
}

fn lock<T>(mutex: &std::sync::Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
