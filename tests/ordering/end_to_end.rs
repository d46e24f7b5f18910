//! One `DoWork` through the configured probe.

use std::sync::Arc;

use outbox_probe::bus::Subscriber;
use outbox_probe::probe::{self, ProbeOptions};
use outbox_probe::{BusConfig, ConsumeObserver, DoWork, InMemoryQueue};

use crate::support::{wait_until, CompletionRecorder};

#[test]
fn one_work_item_yields_one_of_each_in_order() {
    let transport = InMemoryQueue::new();
    let observer = transport.new_subscriber();
    let recorder = Arc::new(CompletionRecorder::new(transport.clone()));

    let options = ProbeOptions {
        observers: vec![recorder.clone() as Arc<dyn ConsumeObserver>],
        ..ProbeOptions::default()
    };
    let handle = probe::configure(transport.clone(), BusConfig::default(), options)
        .unwrap()
        .start()
        .unwrap();

    handle.send(&DoWork).unwrap();
    assert!(wait_until(|| recorder.completed().len() == 1));
    let stats = handle.stop();

    let mut seen = Vec::new();
    while let Some(message) = observer.poll(0).unwrap() {
        seen.push(message);
    }
    let types: Vec<&str> = seen.iter().map(|m| m.message_type.as_str()).collect();
    assert_eq!(types, vec!["SomeEvent1", "SomeEvent2"]);

    let (work_id, completed_at) = recorder.completed()[0].clone();
    let event1 = &seen[0];
    let event2 = &seen[1];
    assert!(event1.sequence < event2.sequence);
    assert!(event2.sequence <= completed_at);

    // Only the context publish joins the work item's conversation; the
    // publish endpoint knows nothing about the message being consumed.
    assert_eq!(event2.conversation_id(), work_id);
    assert!(event1.headers.initiator_id.is_none());
    assert_eq!(event2.headers.initiator_id.as_deref(), Some(work_id.as_str()));
    assert_eq!(
        event2.headers.source_address.as_deref(),
        Some("loopback://localhost/test-queue")
    );
    assert_eq!(
        event1.headers.source_address.as_deref(),
        Some("loopback://localhost/bus")
    );

    assert_eq!(stats.consumed, 1);
    assert_eq!(stats.faulted, 0);
    assert!(recorder.faulted().is_empty());
}

#[test]
fn renamed_queue_still_receives_work() {
    let transport = InMemoryQueue::new();
    let config = BusConfig::default().with_queue_name("work");
    let handle = probe::configure(transport.clone(), config, ProbeOptions::default())
        .unwrap()
        .start()
        .unwrap();

    handle.send(&DoWork).unwrap();
    assert!(wait_until(|| transport.len() == 2));

    assert_eq!(handle.conventions()["DoWork"], "work");
    assert_eq!(handle.stop().consumed, 1);
}
