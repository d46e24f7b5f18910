//! A failing unit of work never releases its context publishes.

use std::sync::Arc;

use outbox_probe::probe::{self, ProbeOptions};
use outbox_probe::{BusConfig, BusHandle, ConsumeObserver, DoWork, InMemoryQueue};

use crate::support::{wait_until, CompletionRecorder};

fn start_failing(step: u8) -> (InMemoryQueue, BusHandle<InMemoryQueue>, Arc<CompletionRecorder>) {
    let transport = InMemoryQueue::new();
    let recorder = Arc::new(CompletionRecorder::new(transport.clone()));
    let options = ProbeOptions {
        fail_after_step: Some(step),
        observers: vec![recorder.clone() as Arc<dyn ConsumeObserver>],
    };
    let handle = probe::configure(transport.clone(), BusConfig::default(), options)
        .unwrap()
        .start()
        .unwrap();
    (transport, handle, recorder)
}

#[test]
fn failure_after_step_two_delivers_nothing() {
    let (transport, handle, recorder) = start_failing(2);

    handle.send(&DoWork).unwrap();
    assert!(wait_until(|| recorder.faulted().len() == 1));
    let stats = handle.stop();

    assert!(transport.find_by_type("SomeEvent2").is_none());
    assert!(transport.find_by_type("SomeEvent1").is_none());
    assert_eq!(stats.faulted, 1);
    assert_eq!(stats.consumed, 0);
    assert!(recorder.completed().is_empty());
}

#[test]
fn failure_after_step_three_keeps_only_the_immediate_publish() {
    let (transport, handle, recorder) = start_failing(3);

    handle.send(&DoWork).unwrap();
    assert!(wait_until(|| recorder.faulted().len() == 1));
    handle.stop();

    assert_eq!(transport.event_types(), vec!["SomeEvent1"]);
}

#[test]
fn faulted_work_is_moved_to_error_queue() {
    let (transport, handle, recorder) = start_failing(2);

    handle.send(&DoWork).unwrap();
    assert!(wait_until(|| recorder.faulted().len() == 1));
    handle.stop();

    let errors = transport.queue_messages("test-queue_error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message_type, "DoWork");
    assert_eq!(errors[0].header("fault-reason"), Some("step 2 failed: injected failure"));
    assert_eq!(recorder.faulted()[0].0, errors[0].id);
    assert_eq!(transport.queue_len("test-queue"), 0);
}
