//! Load → animate → finalize → framebuffer → unload, through `Bootscreen`.

mod support;

use bootscreen::source::{AnimationState, AnimationTiming};
use bootscreen::{Bootscreen, ClientId, FramebufferError};
use std::sync::Arc;
use std::time::Duration;
use support::{wait_until, RecordingDisplay};
use test_log::test;

const TIMEOUT: Duration = Duration::from_secs(5);

fn timing() -> AnimationTiming {
    AnimationTiming {
        frame_interval: Duration::from_millis(20),
        fade_interval: Duration::from_millis(20),
        fade_start: 100,
        fade_step: 25,
    }
}

#[test]
fn load_starts_animation_on_registered_panels() {
    let app = Bootscreen::load(timing()).unwrap();
    assert_eq!(app.active_source(), Some("animation"));
    assert_eq!(app.animation_state(), Some(AnimationState::Running));

    let panel = Arc::new(RecordingDisplay::new("oled", 128, 64));
    app.register_client(panel.clone()).unwrap();

    assert_eq!(app.dispatcher_destinations(), 1);
    assert!(wait_until(TIMEOUT, || panel.frame_count() >= 1));
    app.unload();
}

#[test]
fn unregister_is_unsupported() {
    let app = Bootscreen::load(timing()).unwrap();
    let client = app
        .register_client(Arc::new(RecordingDisplay::new("oled", 128, 64)))
        .unwrap();

    assert!(app.unregister_client(client.id()).is_err());
    assert!(app.unregister_client(ClientId(99)).is_err());
    assert!(app.registry().is_attached(client.id()));
}

#[test]
fn empty_panel_is_rejected() {
    let app = Bootscreen::load(timing()).unwrap();
    assert!(app
        .register_client(Arc::new(RecordingDisplay::new("broken", 0, 64)))
        .is_err());
    assert_eq!(app.dispatcher_destinations(), 0);
}

#[test]
fn trigger_swaps_animation_for_framebuffer() {
    let app = Bootscreen::load(timing()).unwrap();
    let panel = Arc::new(RecordingDisplay::new("oled", 128, 64));
    app.register_client(panel.clone()).unwrap();
    assert!(wait_until(TIMEOUT, || panel.frame_count() >= 1));

    assert!(app.trigger_finalize());
    assert!(!app.trigger_finalize(), "trigger is one-shot");

    assert_eq!(app.active_source(), Some("framebuffer"));
    assert_eq!(app.animation_state(), None);
    assert!(wait_until(TIMEOUT, || panel.contrasts() == vec![100, 75, 50, 25, 0]));

    let devices = app.framebuffer_devices();
    assert_eq!(devices.len(), 1);
    let device = &devices[0];
    assert_eq!(device.len(), 1024);

    assert_eq!(device.write(0, &[0x5A; 4]), Ok(4));
    assert!(wait_until(TIMEOUT, || {
        panel.frames().last().is_some_and(|f| f[..4] == [0x5A; 4])
    }));
    assert_eq!(
        device.write(2000, &[1]),
        Err(FramebufferError::OffsetOutOfRange {
            offset: 2000,
            len: 1024
        })
    );

    app.unload();
    assert!(device.is_closed());
}

#[test]
fn framebuffer_adopts_panels_attached_later() {
    let app = Bootscreen::load(timing()).unwrap();
    app.switch_to_framebuffer().unwrap();
    assert!(app.framebuffer_devices().is_empty());

    let panel = Arc::new(RecordingDisplay::new("late", 128, 32));
    app.register_client(panel.clone()).unwrap();
    let devices = app.switch_to_framebuffer().unwrap();
    assert_eq!(devices.len(), 1);

    devices[0].fill_rect(0, 0, 8, 1, true);
    assert!(wait_until(TIMEOUT, || {
        panel.frames().last().is_some_and(|f| f[0] == 0xFF)
    }));
}

#[test]
fn unload_tears_everything_down() {
    let app = Bootscreen::load(timing()).unwrap();
    let panel = Arc::new(RecordingDisplay::new("oled", 128, 64));
    app.register_client(panel.clone()).unwrap();

    app.unload();
    assert_eq!(app.active_source(), None);
    assert_eq!(app.dispatcher_destinations(), 0);
    assert!(!app.registry().is_initialized());
    assert!(!app.trigger_finalize(), "control is removed on unload");
    assert!(app.switch_to_framebuffer().is_err());

    let frames = panel.frame_count();
    std::thread::sleep(timing().frame_interval * 3);
    assert_eq!(panel.frame_count(), frames);

    app.unload();
}
