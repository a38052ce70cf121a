//! Network worker.
//!
//! Every heartbeat the worker takes the whole pending queue, runs each task
//! against the [`TransferClient`] in submission order, and pushes the results
//! onto the completed queue. A heartbeat with nothing pending returns at once.
//!
//! Tasks run one after another on a single thread, so a slow transfer
//! delays the tasks queued behind it. With one task in flight per slot at
//! most, the backlog stays short.
//!
//! The shutdown flag is checked before each task. Stopping waits for the
//! transfer in flight only; tasks not yet started go back on the pending
//! queue.

use std::sync::Arc;
use std::time::Duration;

use netpass_core::{ShutdownSignal, TaskQueue, WorkerThread};
use tracing::{debug, info, warn};

use crate::client::TransferClient;
use crate::error::Result;
use crate::task::{CompletedTask, Outcome, Request, Task, UploadStatus};

/// Queue pair shared between the orchestrator and the network worker.
pub type NetworkQueue = TaskQueue<Task, CompletedTask>;

/// Runs profile transfers on a dedicated thread.
#[derive(Debug)]
pub struct NetworkWorker {
    queue: Arc<NetworkQueue>,
    worker: WorkerThread,
}

impl NetworkWorker {
    /// Spawn a worker draining `queue` every `heartbeat`.
    ///
    /// # Errors
    /// Returns `TransferError::Core` if the thread cannot be spawned.
    pub fn spawn<T>(mut client: T, queue: Arc<NetworkQueue>, heartbeat: Duration) -> Result<Self>
    where
        T: TransferClient + 'static,
    {
        let shared = Arc::clone(&queue);
        let worker = WorkerThread::spawn("netpass-network", heartbeat, move |signal| {
            process_pending(&mut client, &shared, signal);
        })?;

        info!(
            heartbeat_ms = u64::try_from(heartbeat.as_millis()).unwrap_or(u64::MAX),
            "network worker started"
        );
        Ok(Self { queue, worker })
    }

    pub fn queue(&self) -> &Arc<NetworkQueue> {
        &self.queue
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Stop the worker after the task in flight, if any, finishes.
    ///
    /// Tasks still pending stay in the queue.
    pub fn stop(&mut self) {
        if self.worker.is_running() {
            self.worker.stop();
            info!(pending = self.queue.pending_len(), "network worker stopped");
        }
    }
}

/// Process the pending tasks in order until the queue is exhausted or
/// shutdown is requested. Returns the number of tasks handled.
///
/// This is the body of one worker heartbeat. It holds no lock while the
/// client is running. Tasks left when shutdown is requested are requeued.
pub fn process_pending<T>(client: &mut T, queue: &NetworkQueue, signal: &ShutdownSignal) -> usize
where
    T: TransferClient + ?Sized,
{
    if !queue.has_pending() {
        return 0;
    }

    let mut tasks = queue.take_pending().into_iter();
    let mut handled = 0;
    while let Some(task) = tasks.next() {
        if signal.is_requested() {
            let mut remaining = vec![task];
            remaining.extend(tasks);
            debug!(count = remaining.len(), "shutdown requested, requeueing tasks");
            queue.requeue_pending(remaining);
            break;
        }
        let completed = execute(client, task);
        queue.complete(completed);
        handled += 1;
    }
    handled
}

/// Run a single task against the client.
pub fn execute<T>(client: &mut T, task: Task) -> CompletedTask
where
    T: TransferClient + ?Sized,
{
    let Task { id, slot, request } = task;
    debug!(task = %id, slot = %slot, kind = request.kind(), pass = %request.pass().id(), "running task");

    let outcome = match request {
        Request::Download { pass } => match client.download(pass.id()) {
            Ok(bundle) => Outcome::Downloaded { pass, bundle },
            Err(error) => {
                warn!(task = %id, slot = %slot, pass = %pass.id(), error = %error, "download failed");
                Outcome::DownloadFailed { pass, error }
            }
        },
        Request::Upload { pass, bundle } => {
            let status = match client.upload(pass.id(), bundle.stats()) {
                Ok(()) => UploadStatus::Accepted,
                Err(error) => {
                    warn!(task = %id, slot = %slot, pass = %pass.id(), error = %error, "upload failed");
                    UploadStatus::Failed(error.to_string())
                }
            };
            Outcome::Uploaded { pass, status }
        }
    };

    CompletedTask { id, slot, outcome }
}

impl Drop for NetworkWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferError;
    use crate::mock::MemoryTransferClient;
    use bytes::Bytes;
    use netpass_core::{Pass, PassId, ProfileBundle, SlotIndex};

    fn pass(id: &str) -> Pass {
        Pass::new(id).unwrap()
    }

    fn client_with(ids: &[&str]) -> MemoryTransferClient {
        let client = MemoryTransferClient::new();
        for id in ids {
            client.insert_profile(
                PassId::new(id).unwrap(),
                format!("<Stats id=\"{id}\"/>"),
                None,
            );
        }
        client
    }

    #[test]
    fn test_empty_queue_is_noop() {
        let mut client = client_with(&[]);
        let queue = NetworkQueue::new();

        assert_eq!(process_pending(&mut client, &queue, &ShutdownSignal::new()), 0);
        assert!(queue.drain_completed().is_empty());
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn test_tasks_complete_in_submission_order() {
        let mut client = client_with(&["A", "B"]);
        let queue = NetworkQueue::new();

        let first = Task::download(SlotIndex::new(0), pass("A"));
        let second = Task::download(SlotIndex::new(1), pass("B"));
        let ids = [first.id, second.id];
        queue.submit(first);
        queue.submit(second);

        assert_eq!(process_pending(&mut client, &queue, &ShutdownSignal::new()), 2);
        let completed = queue.drain_completed();
        assert_eq!(completed.iter().map(|c| c.id).collect::<Vec<_>>(), ids);
        assert!(completed
            .iter()
            .all(|c| matches!(c.outcome, Outcome::Downloaded { .. })));
    }

    #[test]
    fn test_shutdown_requeues_unstarted_tasks() {
        let mut client = client_with(&["A", "B", "C"]);
        let queue = NetworkQueue::new();
        let signal = ShutdownSignal::new();
        signal.request();

        let ids: Vec<_> = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(slot, id)| {
                let task = Task::download(SlotIndex::new(slot), pass(id));
                let task_id = task.id;
                queue.submit(task);
                task_id
            })
            .collect();

        assert_eq!(process_pending(&mut client, &queue, &signal), 0);
        assert_eq!(client.request_count(), 0);
        assert!(queue.drain_completed().is_empty());
        assert_eq!(
            queue.take_pending().iter().map(|t| t.id).collect::<Vec<_>>(),
            ids
        );
    }

    #[test]
    fn test_download_failure_is_reported() {
        let mut client = client_with(&[]);
        let queue = NetworkQueue::new();
        queue.submit(Task::download(SlotIndex::new(0), pass("missing")));

        process_pending(&mut client, &queue, &ShutdownSignal::new());
        let completed = queue.drain_completed();
        assert!(matches!(
            &completed[0].outcome,
            Outcome::DownloadFailed {
                error: TransferError::NotFound { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_upload_failure_becomes_status() {
        let mut client = client_with(&["A"]);
        client.fail_uploads(true);
        let queue = NetworkQueue::new();
        queue.submit(Task::upload(
            SlotIndex::new(0),
            pass("A"),
            ProfileBundle::new("<Stats/>", None),
        ));

        process_pending(&mut client, &queue, &ShutdownSignal::new());
        let completed = queue.drain_completed();
        match &completed[0].outcome {
            Outcome::Uploaded { status, .. } => assert!(!status.is_accepted()),
            other => panic!("expected upload outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_upload_stores_stats() {
        let mut client = client_with(&["A"]);
        let queue = NetworkQueue::new();
        queue.submit(Task::upload(
            SlotIndex::new(0),
            pass("A"),
            ProfileBundle::new("<Stats v=\"2\"/>", None),
        ));

        process_pending(&mut client, &queue, &ShutdownSignal::new());
        assert_eq!(
            client.stats_for(&PassId::new("A").unwrap()),
            Some(Bytes::from_static(b"<Stats v=\"2\"/>"))
        );
    }

    #[test]
    fn test_worker_thread_processes_tasks() {
        let client = client_with(&["A"]);
        let queue = Arc::new(NetworkQueue::new());
        let mut worker =
            NetworkWorker::spawn(client, Arc::clone(&queue), Duration::from_millis(2)).unwrap();

        queue.submit(Task::download(SlotIndex::new(0), pass("A")));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while queue.completed_len() == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(queue.drain_completed().len(), 1);

        worker.stop();
        assert!(!worker.is_running());
    }
}
