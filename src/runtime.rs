//! Tokio-driven tooltip lifecycle for a single marker.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::TooltipConfig;
use crate::interaction::{Effect, InteractionEvent, InteractionMachine, InteractionState, TimerToken};
use crate::overlay::{MarkerId, OverlayContent, OverlayLayer, Subscription, ViewportBus};
use crate::position::TooltipPosition;

/// Owns one marker's state machine, its timers, its overlay and its viewport listener.
///
/// Timer tasks only hold a weak reference to the marker, so a timer that outlives the
/// controller does nothing. Dropping the controller cancels every pending timer,
/// removes the overlay and deregisters the viewport listener.
pub struct MarkerController {
    inner: Arc<Mutex<MarkerInner>>,
}

struct MarkerInner {
    id: MarkerId,
    machine: InteractionMachine,
    config: TooltipConfig,
    content: OverlayContent,
    layer: Arc<dyn OverlayLayer>,
    bus: ViewportBus,
    timers: HashMap<TimerToken, JoinHandle<()>>,
    position: Option<TooltipPosition>,
    mounted: bool,
    subscription: Option<Subscription>,
    detached: bool,
}

impl MarkerController {
    pub fn new(
        content: OverlayContent,
        layer: Arc<dyn OverlayLayer>,
        bus: ViewportBus,
        config: &TooltipConfig,
    ) -> Self {
        let inner = MarkerInner {
            id: MarkerId::next(),
            machine: InteractionMachine::new(config),
            config: config.clone(),
            content,
            layer,
            bus,
            timers: HashMap::new(),
            position: None,
            mounted: false,
            subscription: None,
            detached: false,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn id(&self) -> MarkerId {
        self.inner.lock().id
    }

    pub fn content(&self) -> OverlayContent {
        self.inner.lock().content.clone()
    }

    pub fn state(&self) -> InteractionState {
        self.inner.lock().machine.state()
    }

    pub fn is_visible(&self) -> bool {
        self.state().is_visible()
    }

    /// Last computed position; `None` whenever the overlay is closed.
    pub fn position(&self) -> Option<TooltipPosition> {
        self.inner.lock().position
    }

    /// Feeds a pointer, focus, click or dismiss event to the marker.
    ///
    /// Timers are spawned on the current tokio runtime.
    pub fn handle(&self, event: InteractionEvent) {
        drive(&self.inner, event);
    }

    /// Recomputes the position of an open overlay, e.g. once the host has measured it.
    pub fn refresh(&self) {
        let mut inner = self.inner.lock();
        if !inner.detached && inner.machine.state().is_visible() {
            inner.place();
        }
    }
}

impl Drop for MarkerController {
    fn drop(&mut self) {
        self.inner.lock().detach();
    }
}

fn drive(inner: &Arc<Mutex<MarkerInner>>, event: InteractionEvent) {
    let weak = Arc::downgrade(inner);
    let mut guard = inner.lock();
    if guard.detached {
        trace!(?event, "event for detached marker ignored");
        return;
    }
    if let InteractionEvent::TimerFired(token) = event {
        guard.timers.remove(&token);
    }
    let effects = guard.machine.handle(event);
    for effect in effects {
        guard.apply(effect, &weak);
    }
}

impl MarkerInner {
    fn apply(&mut self, effect: Effect, weak: &Weak<Mutex<MarkerInner>>) {
        match effect {
            Effect::StartTimer { token, delay } => {
                let Ok(runtime) = Handle::try_current() else {
                    warn!(marker = self.id.0, "no tokio runtime; tooltip timer dropped");
                    return;
                };
                let weak = weak.clone();
                let handle = runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(inner) = weak.upgrade() {
                        drive(&inner, InteractionEvent::TimerFired(token));
                    }
                });
                self.timers.insert(token, handle);
            }
            Effect::CancelTimer(token) => {
                if let Some(handle) = self.timers.remove(&token) {
                    handle.abort();
                }
            }
            Effect::ShowOverlay => {
                self.place();
                let weak = weak.clone();
                self.subscription = Some(self.bus.subscribe(move |change| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    let mut inner = inner.lock();
                    if !inner.detached && inner.machine.state().is_visible() {
                        trace!(marker = inner.id.0, ?change, "repositioning tooltip");
                        inner.place();
                    }
                }));
            }
            Effect::HideOverlay => self.hide(),
        }
    }

    /// Computes the position and mounts or moves the overlay.
    fn place(&mut self) {
        let Some(anchor) = self.layer.anchor_rect(self.id) else {
            debug!(marker = self.id.0, "anchor not measurable; tooltip not shown");
            return;
        };
        let size = self.layer.overlay_size(self.id);
        let position = self.config.compute(anchor, size, self.layer.viewport());
        if self.mounted {
            self.layer.reposition(self.id, position);
        } else {
            self.layer.mount(self.id, &self.content, position);
            self.mounted = true;
        }
        self.position = Some(position);
    }

    fn hide(&mut self) {
        self.subscription = None;
        self.position = None;
        if self.mounted {
            self.layer.unmount(self.id);
            self.mounted = false;
        }
    }

    fn detach(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        self.hide();
        self.detached = true;
    }
}
