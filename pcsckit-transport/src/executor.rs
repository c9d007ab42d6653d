//! Serial execution of transport calls
//!
//! PC/SC Lite contexts must not be entered from several threads at once.
//! Every call is queued onto one worker thread that owns the transport and
//! runs jobs strictly in submission order; async callers await the result
//! through a oneshot channel.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use pcsckit_core::{Code, ScardError};
use pcsckit_types::ContextHandle;
use tokio::sync::oneshot;
use tracing::{debug, error, trace};

use crate::{Result, Transport};

type Job = Box<dyn FnOnce(&dyn Transport) + Send>;

const WORKER_NAME: &str = "pcsckit-serial";

/// Single-threaded executor for [`Transport`] calls
///
/// Dropping the executor closes the queue. Jobs already queued still run
/// before the worker exits; the drop itself never blocks.
pub struct SerialExecutor {
    sender: Sender<Job>,
    transport: Arc<dyn Transport>,
}

impl SerialExecutor {
    /// Spawn the worker thread for `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Result<Self> {
        let (sender, receiver) = unbounded::<Job>();
        let worker_transport = Arc::clone(&transport);

        thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || worker(receiver, worker_transport))
            .map_err(|e| {
                error!("Failed to spawn {} worker: {}", WORKER_NAME, e);
                ScardError::new(Code::NoMemory)
            })?;

        Ok(Self { sender, transport })
    }

    /// Queue `op` and wait for its result
    ///
    /// Fails with [`Code::Shutdown`] if the worker is gone and with
    /// [`Code::InternalError`] if `op` panicked.
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Transport) -> Result<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(Box::new(move |transport| {
                // Receiver gone means the caller stopped waiting
                let _ = tx.send(op(transport));
            }))
            .map_err(|_| ScardError::new(Code::Shutdown))?;

        rx.await.map_err(|_| ScardError::new(Code::InternalError))?
    }

    /// Queue `op` without waiting; used for teardown from `Drop`
    pub fn detached<F>(&self, op: F)
    where
        F: FnOnce(&dyn Transport) + Send + 'static,
    {
        if self.sender.send(Box::new(op)).is_err() {
            debug!("Serial worker gone; detached job dropped");
        }
    }

    /// Abort a blocked status-change wait on `context`
    ///
    /// Bypasses the queue: the wait being cancelled is what occupies it.
    pub fn cancel(&self, context: ContextHandle) -> Result<()> {
        self.transport.cancel(context)
    }
}

impl std::fmt::Debug for SerialExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialExecutor")
            .field("queued", &self.sender.len())
            .finish()
    }
}

fn worker(receiver: Receiver<Job>, transport: Arc<dyn Transport>) {
    trace!("{} worker started", WORKER_NAME);

    for job in receiver.iter() {
        if catch_unwind(AssertUnwindSafe(|| job(transport.as_ref()))).is_err() {
            error!("Transport call panicked on {} worker", WORKER_NAME);
        }
    }

    trace!("{} worker stopped", WORKER_NAME);
}
