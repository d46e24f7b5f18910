//! Messages without a consumer, and publishes routed to other endpoints.

use outbox_probe::probe::{self, ProbeOptions};
use outbox_probe::{BusConfig, ConsumeError, InMemoryQueue, ReceiveEndpoint, SomeEvent1, SomeEvent3};

use crate::support::wait_until;

#[test]
fn unconsumed_type_is_moved_to_skipped_queue() {
    let transport = InMemoryQueue::new();
    let handle = probe::configure(transport.clone(), BusConfig::default(), ProbeOptions::default())
        .unwrap()
        .start()
        .unwrap();

    handle.send_to("test-queue", &SomeEvent3).unwrap();
    assert!(wait_until(|| transport.queue_len("test-queue_skipped") == 1));

    let stats = handle.stop();
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.consumed, 0);
    assert!(transport.is_empty());
}

#[test]
fn immediate_publish_reaches_a_second_endpoint() {
    let transport = InMemoryQueue::new();
    let bus = probe::configure(transport.clone(), BusConfig::default(), ProbeOptions::default())
        .unwrap()
        .receive_endpoint(
            ReceiveEndpoint::new("notifications")
                .use_in_memory_outbox(true)
                .handler::<SomeEvent1, _>(|ctx| {
                    ctx.send("audit", &SomeEvent3)?;
                    Ok::<(), ConsumeError>(())
                }),
        )
        .unwrap();
    let handle = bus.start().unwrap();

    handle.send(&outbox_probe::DoWork).unwrap();
    assert!(wait_until(|| transport.queue_len("audit") == 1));

    let audit = transport.queue_messages("audit");
    let event1 = transport.find_by_type("SomeEvent1").unwrap();
    assert_eq!(audit[0].headers.initiator_id.as_deref(), Some(event1.id.as_str()));

    let stats = handle.stop();
    assert_eq!(stats.consumed, 2);
}
