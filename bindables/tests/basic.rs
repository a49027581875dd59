mod common;

use common::{change_watcher, value_watcher};
use tether_bindables::*;

#[test]
fn test_set_and_notify() {
    let bindable = Bindable::new(1);
    let (watcher, check) = change_watcher();
    bindable.bind_value_changed(watcher, false).unwrap();

    bindable.set_value(2).unwrap();
    bindable.set_value(2).unwrap();
    bindable.set_value(3).unwrap();

    assert_eq!(check(), vec![(1, 2), (2, 3)]);
    assert_eq!(bindable.value(), 3);
}

#[test]
fn test_run_once_immediately() {
    let bindable = Bindable::new("hello".to_string());
    let (watcher, check) = change_watcher();
    bindable.bind_value_changed(watcher, true).unwrap();
    assert_eq!(check(), vec![("hello".to_string(), "hello".to_string())]);

    let (watcher, check) = change_watcher::<String>();
    bindable.bind_value_changed(watcher, false).unwrap();
    assert!(check().is_empty());
}

#[test]
fn test_default_value() {
    let bindable = Bindable::with_default(5, 10);
    assert!(!bindable.is_default());

    bindable.set_default().unwrap();
    assert_eq!(bindable.value(), 10);
    assert!(bindable.is_default());

    // changing the default does not touch the value
    bindable.set_default_value(20).unwrap();
    assert_eq!(bindable.value(), 10);
    assert_eq!(bindable.default_value(), 20);
}

#[test]
fn test_disabled_rejects_writes() {
    let bindable = Bindable::new(1);
    let (watcher, check) = value_watcher();
    bindable.bind_value_changed(watcher, false).unwrap();

    bindable.set_disabled(true).unwrap();
    let err = bindable.set_value(2).unwrap_err();
    assert!(err.is_disabled());
    assert!(matches!(bindable.set_default_value(7), Err(BindableError::Disabled { .. })));
    assert_eq!(bindable.value(), 1);
    assert!(check().is_empty());

    bindable.set_disabled(false).unwrap();
    bindable.set_value(2).unwrap();
    assert_eq!(check(), vec![2]);
}

#[test]
fn test_disabled_listener() {
    let bindable = Bindable::new(0);
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    {
        let seen = seen.clone();
        bindable.bind_disabled_changed(move |disabled| seen.lock().unwrap().push(disabled), true);
    }

    bindable.set_disabled(true).unwrap();
    bindable.set_disabled(true).unwrap();
    bindable.set_disabled(false).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
}

#[test]
fn test_remove_listener() {
    let bindable = Bindable::new(0);
    let (watcher, check) = value_watcher();
    let id = bindable.bind_value_changed(watcher, false).unwrap();

    bindable.set_value(1).unwrap();
    assert!(bindable.remove_value_listener(id));
    bindable.set_value(2).unwrap();
    assert_eq!(check(), vec![1]);
}

#[test]
fn test_unbind_events_keeps_bindings() {
    let a = Bindable::new(0);
    let b = a.get_bound_copy();
    let (watcher, check) = value_watcher::<i32>();
    b.bind_value_changed(watcher, false).unwrap();

    b.unbind_events();
    a.set_value(4).unwrap();
    assert_eq!(b.value(), 4);
    assert!(check().is_empty());
}

#[test]
fn test_read_only_view() {
    let bindable = Bindable::new(1);
    let read = bindable.read();
    let (watcher, check) = value_watcher();
    read.bind_value_changed(watcher, false).unwrap();

    bindable.set_value(9).unwrap();
    assert_eq!(read.value(), 9);
    assert_eq!(check(), vec![9]);
    assert!(read.is_view_of(&bindable));
}

#[test]
fn test_channel_listener() {
    let bindable = Bindable::new(0u32);
    let (tx, rx) = std::sync::mpsc::channel();
    bindable.bind_value_listener(tx, false).unwrap();

    bindable.set_value(1).unwrap();
    bindable.set_value(2).unwrap();
    let received: Vec<u32> = rx.try_iter().map(|e| e.new).collect();
    assert_eq!(received, vec![1, 2]);
}

#[test]
fn test_failing_immediate_listener_is_not_registered() {
    let bindable = Bindable::new(0);
    let result = bindable.bind_value_listener(Listener::fallible(|_: &ValueChanged<i32>| Err(BindableError::listener("nope"))), true);
    assert!(matches!(result, Err(BindableError::Listener(_))));
    bindable.set_value(1).unwrap();
}

#[test]
fn test_display() {
    let bindable = Bindable::new(42);
    assert_eq!(bindable.to_string(), "42");
    assert_eq!(bindable.read().to_string(), "42");
    assert_eq!(BindableInt::new(7).to_string(), "7");
}
