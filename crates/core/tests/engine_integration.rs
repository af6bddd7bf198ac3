//! Integration tests for the cache engine
//!
//! Exercises eviction policies, expiration, events and listener isolation
//! through the public `CacheEngine` API.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use memcache_core::{
    listener_fn, CacheEngine, CacheEntryEvent, CacheError, EventType, EvictionPolicy,
    ExpirationConfiguration, ListenerError, MockClock,
};
use support::{builder, init_tracing, EventLog};

fn engine_with_log(
    policy: EvictionPolicy,
    capacity: usize,
) -> (CacheEngine<&'static str, u32>, Arc<EventLog<&'static str, u32>>) {
    init_tracing();
    let log = EventLog::new();
    let config = builder("engine", policy, capacity)
        .listener(log.registration())
        .build()
        .expect("valid configuration");
    (CacheEngine::new(config).expect("no persistent store"), log)
}

/// Validates the capacity bound over a long mixed workload.
///
/// # Test Steps
/// 1. Run puts, gets and removes over 50 keys against a cache of 8
/// 2. Check the size after every operation for each policy
#[test]
fn test_capacity_never_exceeded() {
    for policy in EvictionPolicy::ALL {
        init_tracing();
        let config = builder("bounded", policy, 8).build().expect("valid configuration");
        let engine = CacheEngine::<u32, u32>::new(config).expect("engine");

        for step in 0..400u32 {
            let key = (step * 7) % 50;
            match step % 5 {
                0..=2 => {
                    let _ = engine.put(key, step).expect("open");
                }
                3 => {
                    let _ = engine.get(&key).expect("open");
                }
                _ => {
                    let _ = engine.remove(&key).expect("open");
                }
            }
            assert!(engine.len() <= 8, "policy {policy} exceeded capacity");
        }

        let stats = engine.stats();
        assert!(stats.evictions > 0, "policy {policy} never evicted");
        assert_eq!(stats.capacity, 8);
    }
}

/// Validates read-after-write before expiry and eviction.
#[test]
fn test_read_returns_last_written_value() {
    let (engine, _) = engine_with_log(EvictionPolicy::LFU, 4);

    for value in 0..10 {
        let _ = engine.put("k", value).expect("open");
        assert_eq!(engine.get(&"k").expect("open").into_value(), Some(value));
    }
}

/// Validates removing an absent key is silent.
#[test]
fn test_remove_absent_key_emits_nothing() {
    let (engine, log) = engine_with_log(EvictionPolicy::LRU, 4);

    let removed = engine.remove(&"ghost").expect("open");

    assert_eq!(removed.into_value(), None);
    assert!(log.events().is_empty());
}

/// Validates overwrite emits CREATED then UPDATED with both values.
#[test]
fn test_overwrite_emits_created_then_updated() {
    let (engine, log) = engine_with_log(EvictionPolicy::LRU, 4);

    let _ = engine.put("k", 1).expect("open");
    let _ = engine.put("k", 2).expect("open");

    let events = log.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, EventType::Created);
    assert_eq!((events[0].old_value, events[0].new_value), (None, Some(1)));
    assert_eq!(events[1].event_type, EventType::Updated);
    assert_eq!((events[1].old_value, events[1].new_value), (Some(1), Some(2)));
    assert_eq!(&*events[1].cache_name, "engine");
    assert_eq!(engine.get(&"k").expect("open").into_value(), Some(2));
}

/// Validates LRU on the capacity-2 scenario.
///
/// # Test Steps
/// 1. Insert A, insert B, read A, insert C
/// 2. B is evicted with an EVICTED event; A and C remain
#[test]
fn test_lru_scenario_evicts_b() {
    let (engine, log) = engine_with_log(EvictionPolicy::LRU, 2);

    let _ = engine.put("A", 1).expect("open");
    let _ = engine.put("B", 2).expect("open");
    let _ = engine.get(&"A").expect("open");
    let _ = engine.put("C", 3).expect("open");

    assert_eq!(log.kinds()[2..], [(EventType::Evicted, "B"), (EventType::Created, "C")]);
    assert!(engine.contains_key(&"A").expect("open"));
    assert!(engine.contains_key(&"C").expect("open"));
    assert!(!engine.contains_key(&"B").expect("open"));
}

/// Validates FIFO on the capacity-2 scenario.
///
/// # Test Steps
/// 1. Insert A, insert B, read A, insert C
/// 2. A is evicted regardless of the read; B and C remain
#[test]
fn test_fifo_scenario_evicts_a() {
    let (engine, log) = engine_with_log(EvictionPolicy::FIFO, 2);

    let _ = engine.put("A", 1).expect("open");
    let _ = engine.put("B", 2).expect("open");
    let _ = engine.get(&"A").expect("open");
    let _ = engine.put("C", 3).expect("open");

    assert_eq!(log.kinds()[2..], [(EventType::Evicted, "A"), (EventType::Created, "C")]);
    assert!(engine.contains_key(&"B").expect("open"));
    assert!(engine.contains_key(&"C").expect("open"));
}

/// Validates MRU, LIFO and LFU on the same capacity-2 scenario.
#[test]
fn test_other_policies_on_scenario() {
    for (policy, victim) in
        [(EvictionPolicy::MRU, "A"), (EvictionPolicy::LIFO, "B"), (EvictionPolicy::LFU, "B")]
    {
        let (engine, log) = engine_with_log(policy, 2);

        let _ = engine.put("A", 1).expect("open");
        let _ = engine.put("B", 2).expect("open");
        let _ = engine.get(&"A").expect("open");
        let _ = engine.put("C", 3).expect("open");

        assert_eq!(log.kinds()[2], (EventType::Evicted, victim), "policy {policy}");
        assert!(!engine.contains_key(&victim).expect("open"));
    }
}

/// Validates TTL expiry with a controlled clock.
///
/// # Test Steps
/// 1. TTL of one second, insert A at t=0
/// 2. Read A at t=2: empty result, exactly one EXPIRED
/// 3. Read again: still empty, no second EXPIRED
#[test]
fn test_ttl_expiry_emits_expired_once() {
    init_tracing();
    let log = EventLog::<&'static str, u32>::new();
    let clock = MockClock::new();
    let config = builder("ttl", EvictionPolicy::LRU, 16)
        .expiration(ExpirationConfiguration::lifespan(Duration::from_secs(1)))
        .listener(log.registration())
        .build()
        .expect("valid configuration");
    let engine = CacheEngine::<&'static str, u32>::with_clock(config, Arc::new(clock.clone())).expect("engine");

    let _ = engine.put("A", 1).expect("open");
    clock.advance(Duration::from_secs(2));

    assert_eq!(engine.get(&"A").expect("open").into_value(), None);
    assert_eq!(engine.get(&"A").expect("open").into_value(), None);
    assert_eq!(log.count(EventType::Expired), 1);
    assert_eq!(engine.stats().expirations, 1);
}

/// Validates listener isolation on CREATED.
///
/// # Test Steps
/// 1. Register a panicking listener, an erroring listener, then a recorder
/// 2. Put a key: the put succeeds and the recorder still sees CREATED
#[test]
fn test_failing_listener_isolated() {
    init_tracing();
    let log = EventLog::<&'static str, u32>::new();
    let config = builder("isolation", EvictionPolicy::LRU, 4)
        .listener(listener_fn(
            "panics",
            |event: &CacheEntryEvent<&'static str, u32>| -> Result<(), ListenerError> {
                assert_ne!(event.event_type, EventType::Created, "listener failure on created");
                Ok(())
            },
        ))
        .listener(listener_fn(
            "errors",
            |_: &CacheEntryEvent<&'static str, u32>| -> Result<(), ListenerError> {
                Err(ListenerError::failed("rejected"))
            },
        ))
        .listener(log.registration())
        .build()
        .expect("valid configuration");
    let engine = CacheEngine::<&'static str, u32>::new(config).expect("engine");

    let outcome = engine.put("k", 1).expect("put succeeds despite listeners");

    assert!(!outcome.is_degraded());
    assert_eq!(outcome.into_value(), None);
    assert_eq!(log.kinds(), vec![(EventType::Created, "k")]);
    assert_eq!(engine.stats().listener_failures, 2);
}

/// Validates listeners for other types are filtered at bind time.
#[test]
fn test_listener_for_other_types_skipped() {
    init_tracing();
    let other = EventLog::<String, String>::new();
    let matching = EventLog::<&'static str, u32>::new();
    let config = builder("filtered", EvictionPolicy::LRU, 4)
        .listener(other.registration())
        .listener(matching.registration())
        .build()
        .expect("valid configuration");
    let engine = CacheEngine::<&'static str, u32>::new(config).expect("engine");

    let _ = engine.put("k", 1).expect("open");

    assert!(other.events().is_empty());
    assert_eq!(matching.events().len(), 1);
}

/// Validates clear emits no events.
#[test]
fn test_clear_emits_no_events() {
    let (engine, log) = engine_with_log(EvictionPolicy::LRU, 4);
    let _ = engine.put("a", 1).expect("open");
    let _ = engine.put("b", 2).expect("open");
    log.clear();

    engine.clear().expect("open");

    assert!(engine.is_empty());
    assert!(log.events().is_empty());
}

/// Validates runtime listener registration and removal.
#[test]
fn test_runtime_listener_registration() {
    let (engine, _) = engine_with_log(EvictionPolicy::LRU, 4);
    let late = EventLog::<&'static str, u32>::new();

    let id = engine.register_listener(Arc::clone(&late));
    let _ = engine.put("a", 1).expect("open");
    assert!(engine.deregister_listener(id));
    let _ = engine.put("b", 2).expect("open");

    assert_eq!(late.kinds(), vec![(EventType::Created, "a")]);
}

/// Validates concurrent writers keep the capacity bound and lose no events.
///
/// # Test Steps
/// 1. Eight threads each put 200 distinct keys into a cache of 32
/// 2. Size stays bounded and every insert produced one CREATED event
#[test]
fn test_concurrent_puts_respect_capacity() {
    init_tracing();
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    let config = builder("concurrent", EvictionPolicy::LRU, 32)
        .listener(listener_fn(
            "count",
            move |event: &CacheEntryEvent<u64, u64>| -> Result<(), ListenerError> {
                if event.event_type == EventType::Created {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            },
        ))
        .build()
        .expect("valid configuration");
    let engine = Arc::new(CacheEngine::<u64, u64>::new(config).expect("engine"));

    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..200u64 {
                    let _ = engine.put(t * 1_000 + i, i).expect("open");
                    assert!(engine.len() <= 32);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    assert_eq!(engine.len(), 32);
    assert_eq!(created.load(Ordering::SeqCst), 1_600);
    assert_eq!(engine.stats().evictions, 1_600 - 32);
}

/// Validates a closed engine rejects operations.
#[test]
fn test_closed_engine_is_illegal_state() {
    let (engine, _) = engine_with_log(EvictionPolicy::LRU, 4);
    let _ = engine.close();

    assert!(matches!(engine.put("a", 1), Err(CacheError::IllegalState { .. })));
    assert!(matches!(engine.remove(&"a"), Err(CacheError::IllegalState { .. })));
}
