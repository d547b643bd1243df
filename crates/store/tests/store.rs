use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use proptest::prelude::*;
use store::{Change, Disposer, LoggingMiddleware, Middleware, MiddlewareContext, Store};

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn counter_store() -> Store<&'static str, i32> {
    Store::new([("counter", 0), ("other", 100)])
}

struct Recording {
    name: &'static str,
    log: Log,
}

impl Middleware<&'static str, i32> for Recording {
    fn on_set(&self, ctx: &MiddlewareContext<'_, &'static str, i32>) {
        self.log.lock().unwrap().push(format!(
            "{}:{}:{:?}->{}:state={:?}",
            self.name,
            ctx.key,
            ctx.old_value,
            ctx.new_value,
            ctx.state.get(ctx.key)
        ));
    }
}

#[test]
fn get_returns_last_written_value() {
    let store = counter_store();
    store.set_state("counter", 1);
    store.set_state("counter", 2);
    assert_eq!(store.get(&"counter").as_deref(), Some(&2));
    assert_eq!(store.get(&"missing"), None);
}

#[test]
fn snapshot_is_independent_of_the_store() {
    let store: Store<&'static str, Vec<i32>> = Store::new([("list", vec![1, 2])]);

    let mut snapshot = store.get_state();
    snapshot.get_mut(&"list").unwrap().push(3);
    snapshot.insert("extra", vec![9]);
    assert!(snapshot.remove(&"list"));

    assert_eq!(store.get(&"list").as_deref(), Some(&vec![1, 2]));
    assert_eq!(store.get(&"extra"), None);

    let before = store.get_state();
    store.set_state("list", vec![7]);
    assert_eq!(before.get(&"list"), Some(&vec![1, 2]));
}

#[test]
fn set_state_notifies_middleware_then_keyed_then_wildcard() {
    let store = counter_store();
    let log = log();

    store.use_middleware(Recording {
        name: "mw",
        log: Arc::clone(&log),
    });
    let keyed = Arc::clone(&log);
    let _sub = store.subscribe("counter", move |new, old| {
        keyed.lock().unwrap().push(format!("keyed:{old:?}->{new}"));
    });
    let wildcard = Arc::clone(&log);
    let _all = store.subscribe_all(move |state, change| {
        wildcard
            .lock()
            .unwrap()
            .push(format!("all:{:?}:{:?}", change, state.get(&"counter")));
    });

    store.set_state("counter", 5);

    assert_eq!(
        entries(&log),
        vec![
            "mw:counter:Some(0)->5:state=Some(5)",
            "keyed:Some(0)->5",
            "all:Key(\"counter\"):Some(5)",
        ]
    );
}

#[test]
fn keyed_subscribers_only_hear_their_key() {
    let store = counter_store();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let _sub = store.subscribe("counter", move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    store.set_state("other", 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    store.set_state("counter", 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "unchanged value still notifies");
}

#[test]
fn first_write_reports_no_old_value() {
    let store: Store<&'static str, i32> = Store::new([]);
    let olds = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&olds);
    let _sub = store.subscribe("fresh", move |_, old| sink.lock().unwrap().push(old.copied()));

    store.set_state("fresh", 1);
    store.set_state("fresh", 2);
    assert_eq!(*olds.lock().unwrap(), vec![None, Some(1)]);
}

#[test]
fn dispose_removes_only_that_registration() {
    let store = counter_store();
    let calls = Arc::new(AtomicUsize::new(0));
    let callback = {
        let calls = Arc::clone(&calls);
        move |_: &i32, _: Option<&i32>| {
            calls.fetch_add(1, Ordering::SeqCst);
        }
    };

    let first = store.subscribe("counter", callback.clone());
    let _second = store.subscribe("counter", callback);
    assert_eq!(store.subscriber_count(), 2);

    first.dispose();
    assert_eq!(store.subscriber_count(), 1);

    store.set_state("counter", 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_a_disposer_keeps_the_subscription() {
    let store = counter_store();
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        drop(store.subscribe_all(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
        }));
    }

    store.set_state("counter", 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn disposing_after_the_store_is_gone_is_harmless() {
    let store = counter_store();
    let disposer = store.subscribe("counter", |_, _| {});
    drop(store);
    disposer.dispose();
}

#[test]
fn batch_update_notifies_wildcards_once_and_skips_keyed() {
    let store = counter_store();
    let keyed_calls = Arc::new(AtomicUsize::new(0));
    let middleware_log = log();
    let changes = Arc::new(Mutex::new(Vec::new()));

    let keyed = Arc::clone(&keyed_calls);
    let _sub = store.subscribe("counter", move |_, _| {
        keyed.fetch_add(1, Ordering::SeqCst);
    });
    store.use_middleware(Recording {
        name: "mw",
        log: Arc::clone(&middleware_log),
    });
    let sink = Arc::clone(&changes);
    let _all = store.subscribe_all(move |state, change| {
        sink.lock().unwrap().push((
            change.clone(),
            state.get(&"counter").copied(),
            state.get(&"other").copied(),
        ));
    });

    store.batch_update([("counter", 1), ("other", 2), ("counter", 3)]);

    assert_eq!(keyed_calls.load(Ordering::SeqCst), 0);
    assert!(entries(&middleware_log).is_empty());
    assert_eq!(
        *changes.lock().unwrap(),
        vec![(Change::Batch(vec!["counter", "other"]), Some(3), Some(2))]
    );
}

#[test]
fn empty_batch_still_notifies() {
    let store = counter_store();
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    let _all = store.subscribe_all(move |_, change| sink.lock().unwrap().push(change.clone()));

    store.batch_update(Vec::new());

    let changes = changes.lock().unwrap();
    assert_eq!(changes.len(), 1);
    assert!(changes[0].is_batch());
    assert!(changes[0].keys().is_empty());
}

#[test]
fn removed_middleware_is_not_called() {
    let store = counter_store();
    let log = log();
    let id = store.use_middleware(Recording {
        name: "mw",
        log: Arc::clone(&log),
    });
    store.use_middleware(LoggingMiddleware);

    assert!(store.remove_middleware(id));
    assert!(!store.remove_middleware(id));

    store.set_state("counter", 1);
    assert!(entries(&log).is_empty());
}

#[test]
fn logging_middleware_sits_in_the_chain() {
    let store = counter_store();
    let log = log();
    store.use_middleware(LoggingMiddleware);
    store.use_middleware(Recording {
        name: "after",
        log: Arc::clone(&log),
    });

    store.set_state("counter", 7);
    assert_eq!(entries(&log), ["after:counter:Some(0)->7:state=Some(7)"]);
    assert_eq!(store.get_state().len(), 2);
}

#[test]
fn panicking_subscriber_does_not_stop_the_others() {
    let store = counter_store();
    let calls = Arc::new(AtomicUsize::new(0));

    let _bad = store.subscribe("counter", |_, _| panic!("subscriber failure"));
    let good = Arc::clone(&calls);
    let _good = store.subscribe("counter", move |_, _| {
        good.fetch_add(1, Ordering::SeqCst);
    });
    let _bad_all = store.subscribe_all(|_, _| panic!("wildcard failure"));
    let all = Arc::clone(&calls);
    let _all = store.subscribe_all(move |_, _| {
        all.fetch_add(1, Ordering::SeqCst);
    });

    store.set_state("counter", 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.get(&"counter").as_deref(), Some(&1));

    // The store stays usable afterwards.
    store.set_state("counter", 2);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn subscriber_may_update_the_store() {
    let store = counter_store();
    let handle = store.clone();
    let _sub = store.subscribe("counter", move |new, _| {
        if *new < 3 {
            handle.set_state("counter", new + 1);
        }
    });
    let mirrored = store.clone();
    let _mirror = store.subscribe("counter", move |new, _| {
        mirrored.set_state("other", *new * 10);
    });

    store.set_state("counter", 0);
    assert_eq!(store.get(&"counter").as_deref(), Some(&3));
    assert!(store.get(&"other").is_some());
}

#[test]
fn subscriber_may_dispose_itself() {
    let store = counter_store();
    let calls = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<Disposer>>> = Arc::new(Mutex::new(None));

    let seen = Arc::clone(&calls);
    let own = Arc::clone(&slot);
    let disposer = store.subscribe("counter", move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        if let Some(disposer) = own.lock().unwrap().take() {
            disposer.dispose();
        }
    });
    *slot.lock().unwrap() = Some(disposer);

    store.set_state("counter", 1);
    store.set_state("counter", 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_updates_do_not_interleave_notifications() {
    let store = counter_store();
    let log = log();
    let sink = Arc::clone(&log);
    let _all = store.subscribe_all(move |_, change| {
        let key = change.keys()[0];
        sink.lock().unwrap().push(format!("enter:{key}"));
        thread::sleep(Duration::from_millis(5));
        sink.lock().unwrap().push(format!("exit:{key}"));
    });

    thread::scope(|scope| {
        for key in ["counter", "other"] {
            let store = store.clone();
            scope.spawn(move || {
                for value in 0..5 {
                    store.set_state(key, value);
                }
            });
        }
    });

    let entries = entries(&log);
    assert_eq!(entries.len(), 20);
    for pair in entries.chunks(2) {
        let entered = pair[0].strip_prefix("enter:").unwrap();
        let exited = pair[1].strip_prefix("exit:").unwrap();
        assert_eq!(entered, exited);
    }
}

proptest! {
    #[test]
    fn state_matches_last_write_per_key(
        writes in prop::collection::vec((0u8..5, any::<i32>()), 0..50)
    ) {
        let store: Store<u8, i32> = Store::new([]);
        let mut model = HashMap::new();
        for (key, value) in writes {
            store.set_state(key, value);
            model.insert(key, value);
        }
        prop_assert_eq!(store.get_state().into_owned(), model);
    }
}
