// src/app.rs
//! Module lifecycle: wires the registry, dispatcher and producers together.
//!
//! ```text
//! load()  ──► registry ──► dispatcher ──► animation source (started) ──► control
//! finalize trigger ──► animation finalize + destroy ──► framebuffer source
//! unload() ──► active source ──► dispatcher ──► registry
//! ```

use crate::client::{Client, ClientId, DisplayDevice};
use crate::command::CommandSink;
use crate::control::ControlAttribute;
use crate::dispatch::Dispatcher;
use crate::error::{RegistryError, UnsupportedError};
use crate::registry::Registry;
use crate::source::{
    AnimationSource, AnimationState, AnimationTiming, FramebufferDevice, FramebufferSource, Source,
};
use crate::worker::lock;
use anyhow::{Context, Result};
use log::*;
use std::sync::{Arc, Mutex, Weak};

/// Name of the finalize trigger.
pub const CONTROL_NAME: &str = "finalize";

/// Producer currently feeding the displays.
enum ActiveSource {
    Animation(Box<AnimationSource>),
    Framebuffer(Box<FramebufferSource>),
}

impl ActiveSource {
    fn as_source(&self) -> &dyn Source {
        match self {
            ActiveSource::Animation(source) => source.as_ref() as &dyn Source,
            ActiveSource::Framebuffer(source) => source.as_ref() as &dyn Source,
        }
    }

    fn into_source(self) -> Box<dyn Source> {
        match self {
            ActiveSource::Animation(source) => source as Box<dyn Source>,
            ActiveSource::Framebuffer(source) => source as Box<dyn Source>,
        }
    }
}

/// A loaded bootscreen.
pub struct Bootscreen {
    registry: Arc<Registry>,
    sink: Arc<dyn CommandSink>,
    dispatcher: Mutex<Option<Dispatcher>>,
    active: Mutex<Option<ActiveSource>>,
    control: ControlAttribute,
}

impl Bootscreen {
    /// Brings the core up and starts the boot animation.
    ///
    /// Displays registered afterwards get a destination and, if their
    /// resolution is supported, an animation.
    pub fn load(timing: AnimationTiming) -> Result<Arc<Self>> {
        let registry = Arc::new(Registry::new());
        registry.initialize().context("initializing registry")?;

        let dispatcher = Dispatcher::new(registry.clone()).context("creating dispatcher")?;
        let sink: Arc<dyn CommandSink> = Arc::new(dispatcher.handle());

        let animation = AnimationSource::new(registry.clone(), sink.clone(), timing)
            .context("creating animation source")?;
        animation.start().context("starting animation")?;

        let app = Arc::new_cyclic(|weak: &Weak<Bootscreen>| {
            let weak = weak.clone();
            let control = ControlAttribute::new(CONTROL_NAME, move || {
                let Some(app) = weak.upgrade() else {
                    return;
                };
                if let Err(e) = app.switch_to_framebuffer() {
                    error!("Bootscreen: switch to framebuffer failed: {:#}", e);
                }
            });

            Bootscreen {
                registry,
                sink,
                dispatcher: Mutex::new(Some(dispatcher)),
                active: Mutex::new(Some(ActiveSource::Animation(Box::new(animation)))),
                control,
            }
        });

        info!("Bootscreen: loaded");
        Ok(app)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn control(&self) -> &ControlAttribute {
        &self.control
    }

    /// Fires the finalize trigger. Returns false if it already fired.
    pub fn trigger_finalize(&self) -> bool {
        self.control.fire()
    }

    /// Attaches a display.
    pub fn register_client(&self, device: Arc<dyn DisplayDevice>) -> Result<Client, RegistryError> {
        self.registry.add_client(device)
    }

    /// Detaching displays is not supported; this always fails.
    pub fn unregister_client(&self, id: ClientId) -> Result<(), UnsupportedError> {
        error!("Bootscreen: unregister of client {} is not supported", id);
        Err(UnsupportedError("client unregister"))
    }

    /// Name of the producer currently running, if any.
    pub fn active_source(&self) -> Option<&'static str> {
        lock(&self.active).as_ref().map(|a| a.as_source().name())
    }

    /// State of the boot animation, while it is the active producer.
    pub fn animation_state(&self) -> Option<AnimationState> {
        match lock(&self.active).as_ref() {
            Some(ActiveSource::Animation(source)) => Some(source.state()),
            _ => None,
        }
    }

    /// Framebuffer devices, once the framebuffer has taken over.
    pub fn framebuffer_devices(&self) -> Vec<Arc<FramebufferDevice>> {
        match lock(&self.active).as_ref() {
            Some(ActiveSource::Framebuffer(source)) => source.devices(),
            _ => Vec::new(),
        }
    }

    pub fn dispatcher_destinations(&self) -> usize {
        lock(&self.dispatcher)
            .as_ref()
            .map_or(0, |d| d.destination_count())
    }

    /// Fades the animation out, destroys it, and hands every display to a
    /// framebuffer source.
    ///
    /// Blocks until the fade has finished. Calling it again once the
    /// framebuffer is active returns the existing devices.
    pub fn switch_to_framebuffer(&self) -> Result<Vec<Arc<FramebufferDevice>>> {
        let mut active = lock(&self.active);

        match active.take() {
            Some(ActiveSource::Framebuffer(source)) => {
                let devices = source.devices();
                *active = Some(ActiveSource::Framebuffer(source));
                return Ok(devices);
            }
            Some(current) => {
                let current = current.into_source();
                info!("Bootscreen: finalizing {} source", current.name());
                if let Err(e) = current.finalize() {
                    warn!("Bootscreen: finalize of {} failed: {:#}", current.name(), e);
                }
                current.destroy();
            }
            None => {
                anyhow::bail!("bootscreen is unloaded");
            }
        }

        let framebuffer = FramebufferSource::new(self.registry.clone(), self.sink.clone())
            .context("creating framebuffer source")?;
        framebuffer.start()?;
        let devices = framebuffer.devices();
        *active = Some(ActiveSource::Framebuffer(Box::new(framebuffer)));

        info!("Bootscreen: framebuffer active on {} displays", devices.len());
        Ok(devices)
    }

    /// Tears everything down: active producer, dispatcher, then registry.
    /// Safe to call more than once.
    pub fn unload(&self) {
        self.control.remove();

        let active = lock(&self.active).take();
        let dispatcher = lock(&self.dispatcher).take();
        if active.is_none() && dispatcher.is_none() {
            return;
        }

        if let Some(active) = active {
            active.into_source().destroy();
        }
        if let Some(dispatcher) = dispatcher {
            dispatcher.destroy();
        }
        self.registry.destroy();
        info!("Bootscreen: unloaded");
    }
}

impl Drop for Bootscreen {
    fn drop(&mut self) {
        self.unload();
    }
}
