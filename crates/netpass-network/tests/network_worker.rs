//! Network worker running against the in-memory profile service.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use netpass_core::{Pass, PassId, ProfileBundle, SlotIndex};
use netpass_network::{
    MemoryTransferClient, NetworkQueue, NetworkWorker, Outcome, Task, UploadStatus,
};

fn wait_for_completions(queue: &NetworkQueue, count: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if queue.completed_len() >= count {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn download_then_upload_round_trip() {
    let service = MemoryTransferClient::new();
    let id = PassId::new("0004417023").unwrap();
    service.insert_profile(
        id.clone(),
        "<Stats v=\"1\"/>",
        Some(Bytes::from_static(br#"{"display_name":"RIKU"}"#)),
    );

    let queue = Arc::new(NetworkQueue::new());
    let _worker =
        NetworkWorker::spawn(service.clone(), Arc::clone(&queue), Duration::from_millis(2))
            .unwrap();

    let pass = Pass::from_id(id.clone());
    queue.submit(Task::download(SlotIndex::new(0), pass));
    assert!(wait_for_completions(&queue, 1));

    let completed = queue.drain_completed().pop().unwrap();
    let (pass, bundle) = match completed.outcome {
        Outcome::Downloaded { pass, bundle } => (pass, bundle),
        other => panic!("expected download, got {other:?}"),
    };
    assert_eq!(bundle.display_name().as_deref(), Some("RIKU"));

    queue.submit(Task::upload(
        SlotIndex::new(0),
        pass,
        bundle.with_stats("<Stats v=\"2\"/>"),
    ));
    assert!(wait_for_completions(&queue, 1));

    let completed = queue.drain_completed().pop().unwrap();
    assert!(matches!(
        completed.outcome,
        Outcome::Uploaded {
            status: UploadStatus::Accepted,
            ..
        }
    ));
    assert_eq!(
        service.stats_for(&id),
        Some(Bytes::from_static(b"<Stats v=\"2\"/>"))
    );
}

#[test]
fn stop_waits_for_task_in_flight() {
    let service = MemoryTransferClient::new().with_latency(Duration::from_millis(100));
    let queue = Arc::new(NetworkQueue::new());
    let mut worker =
        NetworkWorker::spawn(service.clone(), Arc::clone(&queue), Duration::from_millis(2))
            .unwrap();

    queue.submit(Task::upload(
        SlotIndex::new(1),
        Pass::new("B").unwrap(),
        ProfileBundle::new("<Stats/>", None),
    ));

    let deadline = Instant::now() + Duration::from_secs(5);
    while service.request_count() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }

    worker.stop();
    assert_eq!(queue.completed_len(), 1);
    assert_eq!(service.uploads().len(), 1);
}

#[test]
fn stop_leaves_unstarted_tasks_pending() {
    let latency = Duration::from_millis(200);
    let service = MemoryTransferClient::new().with_latency(latency);
    let queue = Arc::new(NetworkQueue::new());
    let mut worker =
        NetworkWorker::spawn(service.clone(), Arc::clone(&queue), Duration::from_millis(2))
            .unwrap();

    for slot in 0..5 {
        queue.submit(Task::upload(
            SlotIndex::new(slot),
            Pass::from_numeric(slot as u64 + 1),
            ProfileBundle::new("<Stats/>", None),
        ));
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while service.request_count() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }

    let started = Instant::now();
    worker.stop();
    let elapsed = started.elapsed();

    assert!(elapsed < latency * 3, "stop took {elapsed:?}");
    assert_eq!(service.uploads().len(), 1);
    assert_eq!(queue.completed_len(), 1);
    assert_eq!(queue.pending_len(), 4);
}
