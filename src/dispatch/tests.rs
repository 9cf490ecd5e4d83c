// src/dispatch/tests.rs

use super::*;
use crate::client::{DisplayDevice, Resolution};
use crate::frame::Frame;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Condvar;
use std::thread;
use std::time::{Duration, Instant};
use test_log::test;

/// Panel whose `display` blocks until the gate opens, so tests can pile up
/// submissions while the worker is busy.
struct GatedPanel {
    open: Mutex<bool>,
    opened: Condvar,
    entered: AtomicUsize,
    frames: Mutex<Vec<Vec<u8>>>,
    contrast: Mutex<Vec<u8>>,
}

impl GatedPanel {
    fn new(open: bool) -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(open),
            opened: Condvar::new(),
            entered: AtomicUsize::new(0),
            frames: Mutex::new(Vec::new()),
            contrast: Mutex::new(Vec::new()),
        })
    }

    fn open_gate(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }

    fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }

    fn contrast(&self) -> Vec<u8> {
        self.contrast.lock().unwrap().clone()
    }
}

impl DisplayDevice for GatedPanel {
    fn name(&self) -> &str {
        "gated"
    }
    fn resolution(&self) -> Resolution {
        Resolution::new(128, 64)
    }
    fn display(&self, data: &[u8]) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        self.frames.lock().unwrap().push(data.to_vec());
    }
    fn set_contrast(&self, level: u8) {
        self.contrast.lock().unwrap().push(level);
    }
}

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(2));
    }
}

fn tracked_frame(fill: u8, released: &Arc<AtomicUsize>) -> Frame {
    let counter = released.clone();
    Frame::with_release(
        vec![fill; 1024].into_boxed_slice(),
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    )
}

fn setup(open: bool) -> (Arc<Registry>, Dispatcher, Arc<GatedPanel>, Client) {
    let registry = Registry::initialized();
    let dispatcher = Dispatcher::new(registry.clone()).unwrap();
    let panel = GatedPanel::new(open);
    let client = registry.add_client(panel.clone()).unwrap();
    (registry, dispatcher, panel, client)
}

#[test]
fn attach_creates_destination_synchronously() {
    let (_registry, dispatcher, _panel, client) = setup(true);
    assert!(dispatcher.has_destination(client.id()));
    assert_eq!(dispatcher.destination_count(), 1);
    assert_eq!(dispatcher.state(client.id()), Some(DestinationState::Idle));
}

#[test]
fn contrast_burst_coalesces_to_latest() {
    let (_registry, dispatcher, panel, client) = setup(false);
    let released = Arc::new(AtomicUsize::new(0));

    // Park the worker inside display() so the next submissions pile up.
    dispatcher
        .submit(Command::display(&client, tracked_frame(0x01, &released)))
        .unwrap();
    wait_until("worker to enter display", || {
        panel.entered.load(Ordering::SeqCst) == 1
    });

    dispatcher.submit(Command::set_contrast(&client, 50)).unwrap();
    dispatcher.submit(Command::set_contrast(&client, 80)).unwrap();
    dispatcher
        .submit(Command::display(&client, tracked_frame(0x02, &released)))
        .unwrap();
    dispatcher
        .submit(Command::display(&client, tracked_frame(0x03, &released)))
        .unwrap();
    assert_eq!(dispatcher.state(client.id()), Some(DestinationState::Draining));

    panel.open_gate();
    wait_until("both drains", || {
        dispatcher.stats(client.id()).map(|s| s.executed) == Some(3)
    });

    assert_eq!(panel.contrast(), vec![80]);
    let firsts: Vec<u8> = panel.frames().iter().map(|f| f[0]).collect();
    assert_eq!(firsts, vec![0x01, 0x03]);
    assert_eq!(released.load(Ordering::SeqCst), 3, "every frame released once");

    let stats = dispatcher.stats(client.id()).unwrap();
    assert_eq!(stats.submitted, 5);
    assert_eq!(stats.superseded, 2);
}

#[test]
fn submit_for_unknown_client_is_released_and_reported() {
    let (_registry, dispatcher, panel, _client) = setup(true);
    let released = Arc::new(AtomicUsize::new(0));
    let stranger = Client::new(ClientId(99), panel.clone());

    let result = dispatcher.submit(Command::display(&stranger, tracked_frame(0, &released)));

    assert_eq!(result, Err(DispatchError::Unhandled(ClientId(99))));
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(panel.frames().is_empty());
}

#[test]
fn destroy_releases_pending_without_executing() {
    let (_registry, dispatcher, panel, client) = setup(false);
    let released = Arc::new(AtomicUsize::new(0));

    dispatcher
        .submit(Command::display(&client, tracked_frame(0x0A, &released)))
        .unwrap();
    wait_until("worker to enter display", || {
        panel.entered.load(Ordering::SeqCst) == 1
    });
    dispatcher
        .submit(Command::display(&client, tracked_frame(0x0B, &released)))
        .unwrap();
    dispatcher.submit(Command::set_contrast(&client, 7)).unwrap();

    let teardown = thread::spawn(move || dispatcher.destroy());
    wait_until("pending frame release", || released.load(Ordering::SeqCst) == 1);
    panel.open_gate();
    teardown.join().unwrap();

    let firsts: Vec<u8> = panel.frames().iter().map(|f| f[0]).collect();
    assert_eq!(firsts, vec![0x0A], "only the in-flight frame reached the panel");
    assert!(panel.contrast().is_empty(), "no contrast change after shutdown");
    assert_eq!(released.load(Ordering::SeqCst), 2);
}

#[test]
fn handle_reports_stopped_after_destroy() {
    let (registry, dispatcher, panel, client) = setup(true);
    let handle = dispatcher.handle();
    dispatcher.destroy();

    assert_eq!(registry.listener_count(), 0, "listener removed on destroy");
    let released = Arc::new(AtomicUsize::new(0));
    let result = handle.submit(Command::display(&client, tracked_frame(0, &released)));

    assert_eq!(result, Err(DispatchError::Stopped));
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(panel.frames().is_empty());
}

#[test]
fn displays_are_independent() {
    let registry = Registry::initialized();
    let dispatcher = Dispatcher::new(registry.clone()).unwrap();
    let stuck = GatedPanel::new(false);
    let free = GatedPanel::new(true);
    let stuck_client = registry.add_client(stuck.clone()).unwrap();
    let free_client = registry.add_client(free.clone()).unwrap();
    let released = Arc::new(AtomicUsize::new(0));

    dispatcher
        .submit(Command::display(&stuck_client, tracked_frame(1, &released)))
        .unwrap();
    dispatcher
        .submit(Command::display(&free_client, tracked_frame(2, &released)))
        .unwrap();

    wait_until("free panel frame", || free.frames().len() == 1);
    assert!(stuck.frames().is_empty());
    stuck.open_gate();
    wait_until("stuck panel frame", || stuck.frames().len() == 1);
}
