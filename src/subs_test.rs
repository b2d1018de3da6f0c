use super::*;

#[test]
fn handlers_fire_in_registration_order() {
    let registry: HandlerRegistry<u32> = HandlerRegistry::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_a = Arc::clone(&seen);
    let _a = registry.subscribe(move |n: &u32| seen_a.lock().unwrap().push(("a", *n)));
    let seen_b = Arc::clone(&seen);
    let _b = registry.subscribe(move |n: &u32| seen_b.lock().unwrap().push(("b", *n)));

    registry.emit(&1);
    registry.emit(&2);

    assert_eq!(*seen.lock().unwrap(), vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]);
}

#[test]
fn dropping_the_guard_unregisters() {
    let registry: HandlerRegistry<()> = HandlerRegistry::new();
    let count = Arc::new(Mutex::new(0u32));

    let count_inner = Arc::clone(&count);
    let sub = registry.subscribe(move |(): &()| *count_inner.lock().unwrap() += 1);
    registry.emit(&());
    assert_eq!(*count.lock().unwrap(), 1);
    assert_eq!(registry.len(), 1);

    drop(sub);
    registry.emit(&());
    assert_eq!(*count.lock().unwrap(), 1, "dropped handler must not fire");
    assert!(registry.is_empty());
}

#[test]
fn explicit_unsubscribe_matches_drop() {
    let registry: HandlerRegistry<()> = HandlerRegistry::new();
    let sub = registry.subscribe(|(): &()| {});
    assert_eq!(registry.len(), 1);
    sub.unsubscribe();
    assert!(registry.is_empty());
}

#[test]
fn handler_may_reenter_the_registry() {
    let registry: HandlerRegistry<u32> = HandlerRegistry::new();
    let late_sub: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    // A handler that registers another handler while an emit is running.
    let registry_inner = registry.clone();
    let late_sub_inner = Arc::clone(&late_sub);
    let _outer = registry.subscribe(move |_: &u32| {
        let mut slot = late_sub_inner.lock().unwrap();
        if slot.is_none() {
            *slot = Some(registry_inner.subscribe(|_: &u32| {}));
        }
    });

    registry.emit(&1);
    assert_eq!(registry.len(), 2);
    registry.emit(&2);
    assert_eq!(registry.len(), 2);
}

#[test]
fn unsubscribe_after_registry_drop_is_harmless() {
    let registry: HandlerRegistry<()> = HandlerRegistry::new();
    let sub = registry.subscribe(|(): &()| {});
    drop(registry);
    sub.unsubscribe();
}
