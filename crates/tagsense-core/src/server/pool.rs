//! Fixed-size worker pool fed by a bounded queue.
//!
//! Requests are queued with `try_send`: a full queue rejects immediately
//! instead of waiting, which the service reports as `RESOURCE_EXHAUSTED`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::error::SuggestError;
use crate::suggest::{Suggestion, SuggestionPipeline};

type Reply = Result<Vec<Suggestion>, SuggestError>;

struct Job {
    references: Vec<String>,
    reply: oneshot::Sender<Reply>,
}

/// Handle for submitting requests to the workers.
///
/// Dropping every handle closes the queue; workers finish what they hold
/// and exit. The handle also owns a share of the receiver, so the queue
/// stays open (and can fill up) even with no workers running.
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    _receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    capacity: usize,
    workers: usize,
}

impl WorkerPool {
    /// Start `workers` tasks sharing one queue of `capacity` pending requests.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(pipeline: Arc<SuggestionPipeline>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        for id in 0..workers {
            tokio::spawn(worker_loop(id, Arc::clone(&pipeline), Arc::clone(&receiver)));
        }

        tracing::debug!("Started {workers} workers (queue capacity {capacity})");
        Self {
            sender,
            _receiver: receiver,
            capacity: capacity.max(1),
            workers,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue a request without waiting for room.
    pub fn enqueue(&self, references: Vec<String>) -> Result<oneshot::Receiver<Reply>, SuggestError> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .try_send(Job { references, reply })
            .map_err(|e| match e {
                TrySendError::Full(_) => SuggestError::Saturated {
                    capacity: self.capacity,
                },
                TrySendError::Closed(_) => {
                    SuggestError::WorkerLost("worker pool has shut down".to_string())
                }
            })?;
        Ok(receiver)
    }

    /// Queue a request and wait for its result.
    pub async fn submit(&self, references: Vec<String>) -> Reply {
        let receiver = self.enqueue(references)?;
        receiver
            .await
            .map_err(|_| SuggestError::WorkerLost("worker dropped the request".to_string()))?
    }
}

async fn worker_loop(
    id: usize,
    pipeline: Arc<SuggestionPipeline>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
) {
    loop {
        // Hold the lock only while waiting for the next job.
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        let result = AssertUnwindSafe(pipeline.suggest(&job.references))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                tracing::error!(worker = id, "Request panicked: {message}");
                Err(SuggestError::WorkerLost(message))
            });

        // The caller may have gone away; nothing to do then.
        let _ = job.reply.send(result);
    }
    tracing::trace!(worker = id, "Worker exiting");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "worker panicked".to_string())
}
