//! Integration tests for channelbus
//!
//! These tests drive channels through a catalog and an environment the way a
//! host application would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use channelbus::{
    AnyChannel, Channel, ChannelCatalog, ChannelError, ChannelManifest, ChannelOptions, Environment, Inspector,
    KindRegistry, LifecycleState, Listener, Payload, PayloadKind, PayloadValue, Vector3, VoidListener, inspect,
};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

// =============================================================================
// Producer / consumer through the catalog
// =============================================================================

#[test]
fn test_producer_and_consumer_meet_by_name() {
    let mut catalog = ChannelCatalog::default();
    catalog.create("player-health", "int").expect("create");
    catalog.create("level-complete", "void").expect("create");

    let env = Environment::new();
    catalog.activate_all(&env);

    // Consumer side
    let health_log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&health_log);
    let hud = Listener::new(move |hp: &i32| sink.lock().unwrap().push(*hp));
    let consumer = catalog.typed::<i32>("player-health").unwrap();
    assert_eq!(consumer.register_listener(&hud), 0);

    let completions = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&completions);
    let done = VoidListener::from_action(move || *counter.lock().unwrap() += 1);
    catalog.void("level-complete").unwrap().register_listener(&done);

    // Producer side
    let producer = catalog.typed::<i32>("player-health").unwrap();
    producer.raise(90);
    producer.raise(60);
    catalog.void("level-complete").unwrap().raise();

    assert_eq!(*health_log.lock().unwrap(), vec![90, 60]);
    assert_eq!(*completions.lock().unwrap(), 1);

    // Scene load clears last values but keeps subscriptions
    env.load_scene();
    assert_eq!(consumer.last_value(), 0);
    producer.raise(100);
    assert_eq!(*health_log.lock().unwrap(), vec![90, 60, 100]);

    // Session end deactivates everything
    env.end_session();
    assert_eq!(consumer.lifecycle(), LifecycleState::Inactive);
    assert_eq!(consumer.last_value(), 0);
    assert_eq!(catalog.void("level-complete").unwrap().lifecycle(), LifecycleState::Inactive);
    assert_eq!(inspect(catalog.get("level-complete").unwrap().as_ref()).lifecycle, LifecycleState::Inactive);
    assert_eq!(env.reset_signal().listener_count(), 0);
    assert_eq!(env.session_signal().listener_count(), 0);
}

#[test]
fn test_late_subscriber_receives_last_value() {
    let channel = Channel::<Vector3>::new("spawn-point");
    channel.raise(Vector3::new(1.0, 2.0, 3.0));

    let late = Listener::new(|_: &Vector3| {});
    assert_eq!(channel.register_listener(&late), Vector3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_listener_that_unsubscribes_itself() {
    let channel = Channel::<i32>::new("one-shot");
    let hits = Arc::new(Mutex::new(0));

    let slot: Arc<Mutex<Option<Listener<i32>>>> = Arc::new(Mutex::new(None));
    let (handle, slot_ref, sink) = (channel.clone(), Arc::clone(&slot), Arc::clone(&hits));
    let once = Listener::new(move |_: &i32| {
        *sink.lock().unwrap() += 1;
        if let Some(me) = slot_ref.lock().unwrap().as_ref() {
            handle.unregister_listener(me);
        }
    });
    *slot.lock().unwrap() = Some(once.clone());
    channel.register_listener(&once);

    channel.raise(1);
    channel.raise(2);
    assert_eq!(*hits.lock().unwrap(), 1);
    assert_eq!(channel.listener_count(), 0);
}

#[test]
fn test_failing_listener_does_not_block_others() {
    let channel = Channel::<bool>::new("door-open");
    let reached = Arc::new(Mutex::new(false));
    let sink = Arc::clone(&reached);

    channel.register_listener(&Listener::new(move |_: &bool| *sink.lock().unwrap() = true));
    channel.register_listener(&Listener::fallible(|_: &bool| Err(eyre::eyre!("sensor offline"))));
    channel.register_listener(&Listener::new(|_: &bool| panic!("broken handler")));

    let report = channel.raise(true);
    assert_eq!(report.invoked, 3);
    assert_eq!(report.failed, 2);
    assert!(*reached.lock().unwrap());
    assert!(channel.last_value());
}

// =============================================================================
// Custom payloads
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Pickup {
    item: String,
    count: u32,
}

impl Payload for Pickup {
    const KIND: PayloadKind = PayloadKind::Custom("pickup");

    fn to_value(&self) -> PayloadValue {
        PayloadValue::custom(Self::KIND, self)
    }

    fn from_value(value: &PayloadValue) -> Result<Self, ChannelError> {
        value.to_custom(Self::KIND)
    }
}

#[test]
fn test_custom_kind_through_manifest_and_inspector() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("channels.yml");

    let mut registry = KindRegistry::standard();
    registry.register::<Pickup>("pickup").unwrap();

    let mut catalog = ChannelCatalog::new(registry.clone(), ChannelOptions::default());
    catalog.create("item-picked", "pickup").unwrap();
    catalog.manifest().save(&path).unwrap();

    let manifest = ChannelManifest::load(&path).unwrap();
    let restored = ChannelCatalog::from_manifest(&manifest, registry, ChannelOptions::default()).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let typed = restored.typed::<Pickup>("item-picked").unwrap();
    typed.register_listener(&Listener::new(move |p: &Pickup| sink.lock().unwrap().push(p.clone())));

    let erased = restored.get("item-picked").unwrap();
    let mut inspector = Inspector::new();
    inspector
        .edit_scratch(erased.as_ref(), r#"{"item":"key","count":2}"#)
        .unwrap();
    inspector.raise_scratch(erased.as_ref()).unwrap();

    let expected = Pickup {
        item: "key".to_string(),
        count: 2,
    };
    assert_eq!(*seen.lock().unwrap(), vec![expected.clone()]);
    assert_eq!(
        inspect(erased.as_ref()).last_value,
        Some(PayloadValue::custom(Pickup::KIND, &expected))
    );
}

#[test]
fn test_manifest_with_unregistered_custom_kind_fails() {
    let mut registry = KindRegistry::standard();
    registry.register::<Pickup>("pickup").unwrap();
    let mut catalog = ChannelCatalog::new(registry, ChannelOptions::default());
    catalog.create("item-picked", "pickup").unwrap();

    let result = ChannelCatalog::from_manifest(&catalog.manifest(), KindRegistry::standard(), ChannelOptions::default());
    assert!(result.err().is_some_and(|e| e.is_not_found()));
}

#[test]
fn test_raise_value_rejects_wrong_kind() {
    let catalog = {
        let mut c = ChannelCatalog::default();
        c.create("throttle", "float").unwrap();
        c
    };
    let channel = catalog.get("throttle").unwrap();
    let err = channel.raise_value(&PayloadValue::Int(1)).unwrap_err();
    assert!(err.is_payload_error());
    assert_eq!(channel.listener_count(), 0);
}

// =============================================================================
// Threads
// =============================================================================

#[test]
fn test_raise_from_multiple_threads() {
    let mut catalog = ChannelCatalog::default();
    catalog.create("ticks", "ulong").unwrap();
    catalog.create("heartbeat", "void").unwrap();

    let ticks = catalog.typed::<u64>("ticks").unwrap();
    let heartbeat = catalog.void("heartbeat").unwrap();

    let delivered = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&delivered);
    ticks.register_listener(&Listener::new(move |_: &u64| {
        sink.fetch_add(1, Ordering::SeqCst);
    }));
    let beats = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&beats);
    heartbeat.register_listener(&VoidListener::from_action(move || {
        sink.fetch_add(1, Ordering::SeqCst);
    }));

    thread::scope(|scope| {
        for worker in 0..4u64 {
            let (ticks, heartbeat) = (ticks.clone(), heartbeat.clone());
            scope.spawn(move || {
                for i in 0..100 {
                    let report = ticks.raise(worker * 1000 + i);
                    assert!(report.is_clean());
                    heartbeat.raise();
                    // Registering from a worker while others raise
                    ticks.register_listener(&Listener::new(|_: &u64| {}));
                }
            });
        }
    });

    assert_eq!(delivered.load(Ordering::SeqCst), 400);
    assert_eq!(beats.load(Ordering::SeqCst), 400);
    assert_eq!(ticks.listener_count(), 401);
    assert_eq!(ticks.last_value() % 1000, 99);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_dispatch_is_reverse_registration_order(count in 1usize..16) {
        let channel = Channel::<i32>::new("ordered");
        let order = Arc::new(Mutex::new(Vec::new()));

        for index in 0..count {
            let sink = Arc::clone(&order);
            channel.register_listener(&Listener::new(move |_: &i32| sink.lock().unwrap().push(index)));
        }
        channel.raise(1);

        let expected: Vec<usize> = (0..count).rev().collect();
        prop_assert_eq!(order.lock().unwrap().clone(), expected);
    }

    #[test]
    fn prop_registration_is_idempotent(repeats in 1usize..8, value in any::<i32>()) {
        let channel = Channel::<i32>::new("dedup");
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        let listener = Listener::new(move |v: &i32| sink.lock().unwrap().push(*v));

        for _ in 0..repeats {
            channel.register_listener(&listener);
        }
        prop_assert_eq!(channel.listener_count(), 1);

        let report = channel.raise(value);
        prop_assert_eq!(report.invoked, 1);
        prop_assert_eq!(hits.lock().unwrap().clone(), vec![value]);
    }

    #[test]
    fn prop_last_value_tracks_final_raise(values in proptest::collection::vec(any::<u64>(), 1..20)) {
        let channel = Channel::<u64>::new("score");
        for v in &values {
            channel.raise(*v);
        }
        prop_assert_eq!(channel.last_value(), *values.last().unwrap());
    }
}
