//! What an external subscriber sees while the unit of work is still open.

use outbox_probe::bus::Subscriber;
use outbox_probe::consumers::DoWorkConsumer;
use outbox_probe::{Bus, BusConfig, DoWork, InMemoryQueue, ReceiveEndpoint};

use crate::support::{wait_until, HoldOpen};

fn start_held(use_outbox: bool) -> (InMemoryQueue, outbox_probe::BusHandle<InMemoryQueue>, crate::support::Gate) {
    let transport = InMemoryQueue::new();
    let bus = Bus::new(transport.clone(), BusConfig::default());
    let (consumer, gate) = HoldOpen::new(DoWorkConsumer::new(bus.publish_endpoint()));

    let handle = bus
        .receive_endpoint(
            ReceiveEndpoint::new("test-queue")
                .use_in_memory_outbox(use_outbox)
                .consumer::<DoWork, _>(consumer),
        )
        .unwrap()
        .start()
        .unwrap();

    (transport, handle, gate)
}

#[test]
fn endpoint_publish_is_visible_before_completion() {
    let (transport, handle, gate) = start_held(true);
    let observer = transport.new_subscriber();

    handle.send(&DoWork).unwrap();
    gate.wait_reached();

    let seen = observer.poll(50).unwrap().expect("SomeEvent1 should be visible");
    assert_eq!(seen.message_type, "SomeEvent1");

    gate.release();
    handle.stop();
}

#[test]
fn context_publish_is_held_until_completion() {
    let (transport, handle, gate) = start_held(true);

    handle.send(&DoWork).unwrap();
    gate.wait_reached();

    // Unit of work still open: only the immediate publish is out.
    assert_eq!(transport.event_types(), vec!["SomeEvent1"]);
    assert!(transport.find_by_type("SomeEvent2").is_none());

    gate.release();
    assert!(wait_until(|| transport.find_by_type("SomeEvent2").is_some()));
    assert_eq!(transport.event_types(), vec!["SomeEvent1", "SomeEvent2"]);

    let stats = handle.stop();
    assert_eq!(stats.consumed, 1);
}

#[test]
fn without_outbox_context_publish_goes_out_first() {
    let (transport, handle, gate) = start_held(false);

    handle.send(&DoWork).unwrap();
    gate.wait_reached();

    assert_eq!(transport.event_types(), vec!["SomeEvent2", "SomeEvent1"]);

    gate.release();
    handle.stop();
}
