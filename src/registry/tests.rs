// src/registry/tests.rs

use super::*;
use crate::client::Resolution;
use std::sync::Mutex as StdMutex;
use test_log::test;

struct Stub {
    name: String,
    resolution: Resolution,
}

impl DisplayDevice for Stub {
    fn name(&self) -> &str {
        &self.name
    }
    fn resolution(&self) -> Resolution {
        self.resolution
    }
    fn display(&self, _data: &[u8]) {}
    fn set_contrast(&self, _level: u8) {}
}

fn stub(name: &str, width: u8, height: u8) -> Arc<dyn DisplayDevice> {
    Arc::new(Stub {
        name: name.to_string(),
        resolution: Resolution::new(width, height),
    })
}

#[test]
fn initialize_twice_is_rejected() {
    let registry = Registry::new();
    assert_eq!(registry.initialize(), Ok(()));
    assert_eq!(
        registry.initialize(),
        Err(RegistryError::AlreadyInitialized)
    );
}

#[test]
fn operations_before_initialize_fail() {
    let registry = Registry::new();
    assert_eq!(
        registry.add_client(stub("a", 128, 64)).err(),
        Some(RegistryError::NotInitialized)
    );
    assert_eq!(
        registry.add_listener(|_| {}).err(),
        Some(RegistryError::NotInitialized)
    );
}

#[test]
fn listener_ids_start_at_one_and_increase() {
    let registry = Registry::initialized();
    assert_eq!(registry.add_listener(|_| {}), Ok(ListenerId(1)));
    assert_eq!(registry.add_listener(|_| {}), Ok(ListenerId(2)));
    assert_eq!(registry.add_listener(|_| {}), Ok(ListenerId(3)));
}

#[test]
fn listeners_see_every_attach_in_order() {
    let registry = Registry::initialized();
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let sink = seen.clone();
    registry
        .add_listener(move |client| sink.lock().unwrap().push(client.name().to_string()))
        .unwrap();

    for name in ["first", "second", "third"] {
        registry.add_client(stub(name, 128, 64)).unwrap();
    }

    assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn removed_listener_is_not_notified() {
    let registry = Registry::initialized();
    let calls = Arc::new(StdMutex::new(0));
    let counter = calls.clone();
    let id = registry
        .add_listener(move |_| *counter.lock().unwrap() += 1)
        .unwrap();

    registry.add_client(stub("a", 128, 64)).unwrap();
    registry.remove_listener(id);
    registry.add_client(stub("b", 128, 64)).unwrap();
    registry.remove_listener(ListenerId(99));

    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(registry.listener_count(), 0);
}

#[test]
fn empty_resolution_is_rejected_without_side_effects() {
    let registry = Registry::initialized();
    let calls = Arc::new(StdMutex::new(0));
    let counter = calls.clone();
    registry
        .add_listener(move |_| *counter.lock().unwrap() += 1)
        .unwrap();

    let result = registry.add_client(stub("broken", 0, 64));

    assert!(matches!(result, Err(RegistryError::InvalidClient(_))));
    assert!(registry.clients().is_empty());
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[test]
fn listener_may_unsubscribe_itself() {
    let registry = Registry::initialized();
    let slot: Arc<StdMutex<Option<ListenerId>>> = Arc::new(StdMutex::new(None));
    let weak = Arc::downgrade(&registry);
    let own_id = slot.clone();
    let id = registry
        .add_listener(move |_| {
            if let (Some(registry), Some(id)) = (weak.upgrade(), *own_id.lock().unwrap()) {
                registry.remove_listener(id);
            }
        })
        .unwrap();
    *slot.lock().unwrap() = Some(id);

    registry.add_client(stub("a", 128, 64)).unwrap();

    assert_eq!(registry.listener_count(), 0);
}

#[test]
fn replay_delivers_existing_clients_in_attach_order() {
    let registry = Registry::initialized();
    registry.add_client(stub("one", 128, 64)).unwrap();
    registry.add_client(stub("two", 64, 128)).unwrap();

    let seen = Arc::new(StdMutex::new(Vec::new()));
    let sink = seen.clone();
    registry
        .add_listener_with_replay(move |client| sink.lock().unwrap().push(client.id()))
        .unwrap();
    registry.add_client(stub("three", 128, 64)).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![ClientId(1), ClientId(2), ClientId(3)]
    );
}

#[test]
fn destroy_clears_everything_and_allows_reinit() {
    let registry = Registry::initialized();
    registry.add_listener(|_| {}).unwrap();
    let client = registry.add_client(stub("a", 128, 64)).unwrap();
    assert!(registry.is_attached(client.id()));

    registry.destroy();

    assert!(!registry.is_initialized());
    assert!(registry.clients().is_empty());
    assert_eq!(registry.listener_count(), 0);
    registry.initialize().unwrap();
    assert_eq!(registry.add_listener(|_| {}), Ok(ListenerId(1)));
}
