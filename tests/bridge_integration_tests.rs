//! Integration tests for the EventBridge
//!
//! These tests verify that the bridge correctly:
//! - Delivers every event enqueued from worker threads exactly once
//! - Preserves each producer's enqueue order
//! - Keeps events raised outside a session until the next session drains them
//! - Tears the wake primitive down with the last session

use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use taskbridge::{DialogId, Event, EventBridge, EventName, HostLoop, HostValue};

type Delivered = Rc<RefCell<Vec<(usize, i64)>>>;

/// Register one sink per producer, each tagging what it receives with its index
fn register_sinks(bridge: &Rc<EventBridge>, count: usize) -> (Vec<DialogId>, Delivered) {
    let delivered: Delivered = Rc::new(RefCell::new(Vec::new()));
    let ids = (0..count)
        .map(|index| {
            let id = DialogId::next();
            let log = Rc::clone(&delivered);
            bridge.register(
                id,
                Rc::new(move |_name: EventName, value: HostValue| {
                    let seq = value.as_number().unwrap_or(-1.0) as i64;
                    log.borrow_mut().push((index, seq));
                }),
            );
            id
        })
        .collect();
    (ids, delivered)
}

fn delivered_count(delivered: &Delivered) -> usize {
    delivered.borrow().len()
}

/// Let the host loop turn until `total` events arrived or five seconds passed
async fn wait_for(delivered: &Delivered, total: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while delivered_count(delivered) < total && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_concurrent_producers_lose_nothing(counts in prop::collection::vec(1usize..150, 1..5)) {
        let host = HostLoop::new().unwrap();
        let bridge = Rc::clone(host.bridge());
        let (ids, delivered) = register_sinks(&bridge, counts.len());
        let total: usize = counts.iter().sum();

        host.block_on(async {
            let _session = bridge.acquire_session();

            let workers: Vec<_> = ids
                .iter()
                .zip(&counts)
                .map(|(&id, &count)| {
                    let producer = bridge.producer();
                    std::thread::spawn(move || {
                        for seq in 0..count as i64 {
                            producer.enqueue(Event::new(id, EventName::Timer, seq));
                        }
                    })
                })
                .collect();

            wait_for(&delivered, total).await;
            for worker in workers {
                worker.join().unwrap();
            }
        });

        let delivered = delivered.borrow();
        prop_assert_eq!(delivered.len(), total);
        prop_assert_eq!(bridge.pending(), 0);

        for (index, &count) in counts.iter().enumerate() {
            let seen: Vec<i64> = delivered
                .iter()
                .filter(|(producer, _)| *producer == index)
                .map(|(_, seq)| *seq)
                .collect();
            let expected: Vec<i64> = (0..count as i64).collect();
            prop_assert_eq!(seen, expected);
        }

        let metrics = bridge.metrics();
        prop_assert_eq!(metrics.events_enqueued.load(Ordering::Relaxed), total as u64);
        prop_assert_eq!(metrics.events_dispatched.load(Ordering::Relaxed), total as u64);
    }
}

#[test]
fn test_event_outside_session_waits_for_next_session() {
    let host = HostLoop::new().unwrap();
    let bridge = Rc::clone(host.bridge());
    let (ids, delivered) = register_sinks(&bridge, 1);

    // No session: nothing wakes the host, the event stays queued
    bridge
        .producer()
        .enqueue(Event::new(ids[0], EventName::Timer, 7i64));
    assert_eq!(bridge.pending(), 1);
    assert_eq!(bridge.metrics().late_enqueues.load(Ordering::Relaxed), 1);

    host.block_on(async {
        let _session = bridge.acquire_session();
        wait_for(&delivered, 1).await;
    });

    assert_eq!(*delivered.borrow(), vec![(0, 7)]);
    assert_eq!(bridge.pending(), 0);
}

#[test]
fn test_wake_primitive_lives_as_long_as_sessions() {
    let host = HostLoop::new().unwrap();
    let bridge = Rc::clone(host.bridge());

    host.block_on(async {
        assert!(bridge.current_signal().is_none());

        let first = bridge.acquire_session();
        let signal = bridge.current_signal().expect("signal after first session");

        let second = bridge.acquire_session();
        assert_eq!(bridge.session_count(), 2);
        assert!(bridge.current_signal().unwrap().same_as(&signal));

        drop(first);
        assert!(bridge.current_signal().is_some());

        drop(second);
        assert_eq!(bridge.session_count(), 0);
        assert!(bridge.current_signal().is_none());

        // A new session gets a fresh primitive
        let _third = bridge.acquire_session();
        assert!(!bridge.current_signal().unwrap().same_as(&signal));
    });
}

#[test]
fn test_unregistered_dialog_does_not_block_others() {
    let host = HostLoop::new().unwrap();
    let bridge = Rc::clone(host.bridge());
    let (ids, delivered) = register_sinks(&bridge, 2);
    let (gone, live) = (ids[0], ids[1]);
    bridge.unregister(gone);

    host.block_on(async {
        let _session = bridge.acquire_session();
        let producer = bridge.producer();
        std::thread::spawn(move || {
            producer.enqueue(Event::new(gone, EventName::Timer, 1i64));
            producer.enqueue(Event::new(live, EventName::Timer, 2i64));
        })
        .join()
        .unwrap();

        wait_for(&delivered, 1).await;
    });

    assert_eq!(*delivered.borrow(), vec![(1, 2)]);
    assert_eq!(
        bridge.metrics().events_undeliverable.load(Ordering::Relaxed),
        1
    );
}
