//! End-to-end tests: sessions, events, property matching over event
//! payloads, and cause snapshots crossing threads.

use std::sync::Arc;

use causeway::prelude::*;
use proptest::prelude::*;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ITEM: ContextKey<String> = ContextKey::new("item");

#[derive(Debug, Clone, PartialEq)]
struct Placed {
    slot: Vector2i,
    side: Direction,
}

#[derive(Debug)]
struct Player {
    name: &'static str,
}

fn entity_types() -> Arc<Registry<EntityType>> {
    let mut registry = Registry::new("entity_type");
    registry
        .register("zombie", EntityType::new("zombie", "Zombie"))
        .unwrap();
    registry
        .register("creeper", EntityType::new("creeper", "Creeper"))
        .unwrap();
    registry.into_shared()
}

fn strict_session() -> Session {
    let config = SessionConfig {
        stack: StackConfig::strict(),
        ..SessionConfig::default()
    };
    Session::new(config, entity_types())
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn events_carry_frame_local_cause_and_context() {
    let mut session = strict_session();
    let mut sink = RecordingSink::new();

    session.stack_mut().push_cause(Player { name: "alex" });
    {
        let mut frame = session.stack_mut().frame();
        frame.add_context(&ITEM, "torch".to_owned()).unwrap();
        let placed = Placed {
            slot: Vector2i::new(2, 3),
            side: Direction::North,
        };
        frame.run(Emit::new(&mut sink, placed)).unwrap();
    }

    let event = &sink.events()[0];
    assert_eq!(event.cause().first::<Player>().map(|p| p.name), Some("alex"));
    assert_eq!(event.cause().context().require(&ITEM).unwrap(), "torch");

    // The frame closed: the context entry is gone, the player stays.
    assert_eq!(session.stack().get_context(&ITEM).unwrap(), None);
    assert_eq!(session.stack().depth(), 2);
    session.stack_mut().pop_cause().unwrap();
    session.end().unwrap();
}

#[test]
fn session_emit_is_neutral() {
    let mut session = strict_session();
    let mut count = 0;
    let mut counter = |_: &mut Event<u8>| count += 1;
    for i in 0..3 {
        assert_eq!(session.emit(&mut counter, i).unwrap(), Some(i));
    }
    assert_eq!(count, 3);
    assert_eq!(session.stack().depth(), 1);
}

#[test]
fn non_neutral_operation_is_caught() {
    let mut session = strict_session();
    let err = session
        .stack_mut()
        .run(neutral("leaky", |s: &mut CauseStack| s.push_cause(1u8)))
        .unwrap_err();
    assert!(matches!(err, StackError::DepthDrift { operation: "leaky", .. }));
    assert_eq!(session.stack().depth(), 2);
}

#[test]
fn recovering_session_rolls_back_drift() {
    let config = SessionConfig {
        stack: StackConfig::recovering(),
        ..SessionConfig::default()
    };
    let mut session = Session::new(config, entity_types());
    session
        .stack_mut()
        .run(neutral("leaky", |s: &mut CauseStack| s.push_cause(1u8)))
        .unwrap();
    assert_eq!(session.stack().depth(), 1);
}

// ---------------------------------------------------------------------------
// Property matching over event payloads
// ---------------------------------------------------------------------------

#[test]
fn filter_recorded_events_by_slot() {
    let mut session = strict_session();
    let mut sink = RecordingSink::new();
    for (x, y) in [(1, 9), (2, 3), (3, 0), (0, 0)] {
        let placed = Placed {
            slot: Vector2i::new(x, y),
            side: Direction::Up,
        };
        session.emit(&mut sink, placed).unwrap();
    }

    let at_least = PropertyDescriptor::builder(ValueType::SlotPos)
        .value(Vector2i::new(2, 3))
        .operator(Operator::GreaterOrEqual)
        .build()
        .unwrap();

    let slots: Vec<_> = at_least
        .filter(sink.events(), |e| json!(e.payload().slot))
        .map(|e| e.payload().slot)
        .collect();
    assert_eq!(slots, vec![Vector2i::new(2, 3), Vector2i::new(3, 0)]);
}

#[test]
fn side_matching_with_fallback() {
    let facing = PropertyDescriptor::builder(ValueType::SlotSide)
        .value("north")
        .operator(Operator::Equal)
        .build()
        .unwrap();

    let sides = [json!("NORTH"), json!("banana"), json!(0), json!(null), json!({"x": 1})];
    let hits: Vec<bool> = sides.iter().map(|s| facing.matches(s)).collect();
    assert_eq!(hits, vec![true, false, true, false, false]);
}

// ---------------------------------------------------------------------------
// Registry and statistics
// ---------------------------------------------------------------------------

#[test]
fn statistics_resolve_through_session_registry() {
    let session = strict_session();
    let stat = session.statistic("killed", "creeper").unwrap();
    assert_eq!(stat.entity_type().name, "Creeper");
    assert_eq!(
        session.statistic("killed", "ghast").unwrap_err(),
        RegistryError::UnknownId {
            registry: "entity_type",
            id: "ghast".to_owned()
        }
    );
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

#[test]
fn snapshots_cross_threads() {
    let mut session = strict_session();
    session.stack_mut().push_cause("player");
    session
        .stack_mut()
        .add_context(&ITEM, "sword".to_owned())
        .unwrap();
    let snapshot = session.snapshot();

    let handle = std::thread::spawn(move || {
        // The worker owns its own session and attributes to the snapshot.
        let mut worker = strict_session();
        worker.stack_mut().push_entry(CauseEntry::new(snapshot.clone()));
        let inherited = worker.snapshot();
        let cause = inherited.first::<Cause>().cloned();
        (cause, snapshot.context().require(&ITEM))
    });
    let (cause, item) = handle.join().unwrap();

    let cause = cause.unwrap();
    assert_eq!(cause.first::<&str>(), Some(&"player"));
    assert_eq!(item.unwrap(), "sword");

    // The live stack was never touched by the worker.
    assert_eq!(session.stack().depth(), 2);
}

#[test]
fn sessions_per_thread_are_independent() {
    let handles: Vec<_> = (0..4u32)
        .map(|n| {
            std::thread::spawn(move || {
                let mut session = strict_session();
                for i in 0..n {
                    session.stack_mut().push_cause(i);
                }
                session.snapshot().len()
            })
        })
        .collect();
    let depths: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(depths, vec![1, 2, 3, 4]);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Emitting never changes the stack, whatever is on it.
    #[test]
    fn emit_preserves_stack(pushes in prop::collection::vec(any::<u16>(), 0..16), extra in any::<u16>()) {
        let mut session = strict_session();
        for p in &pushes {
            session.stack_mut().push_cause(*p);
        }
        let before = session.snapshot();

        let mut sink = RecordingSink::new();
        let emit = Emit::new(&mut sink, ()).with_cause(extra);
        session.stack_mut().run(emit).unwrap();

        let after = session.snapshot();
        prop_assert_eq!(after.len(), before.len());
        prop_assert_eq!(sink.events()[0].cause().len(), before.len() + 1);
        prop_assert_eq!(sink.events()[0].cause().first::<u16>(), Some(&extra));
    }
}
