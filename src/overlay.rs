//! Tooltip overlay content and the layer it is rendered into.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::labels;
use crate::position::{Rect, Size, TooltipPosition, Viewport};
use crate::term::{GlossaryTerm, LinkResolver};

/// What an open tooltip shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayContent {
    pub tooltip_id: String,
    pub term_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub definition: String,
    pub link_label: String,
    pub link: String,
}

impl OverlayContent {
    pub fn for_term(term: &GlossaryTerm, locale: &str, links: &dyn LinkResolver) -> Self {
        Self::with_fallback(term, locale, labels::DEFAULT_LOCALE, links)
    }

    /// Like [`OverlayContent::for_term`], taking labels from `fallback` when `locale`
    /// has none.
    pub fn with_fallback(
        term: &GlossaryTerm,
        locale: &str,
        fallback: &str,
        links: &dyn LinkResolver,
    ) -> Self {
        Self {
            tooltip_id: format!("tooltip-{}", term.id),
            term_id: term.id.clone(),
            title: term.primary_name.clone(),
            subtitle: term
                .secondary_name
                .as_deref()
                .filter(|name| !name.trim().is_empty())
                .map(str::to_owned),
            definition: term.short_definition.clone(),
            link_label: labels::labels_with_fallback(locale, fallback).more_info.clone(),
            link: links.glossary_link(locale, &term.id),
        }
    }
}

/// Identifies one marker instance on the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MarkerId(pub u64);

impl MarkerId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        MarkerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Rendering surface that sits outside the annotated content tree.
///
/// Geometry queries return `None` when the host cannot measure yet; callers fall back
/// to estimates instead of failing.
pub trait OverlayLayer: Send + Sync {
    fn viewport(&self) -> Viewport;
    fn anchor_rect(&self, marker: MarkerId) -> Option<Rect>;
    fn overlay_size(&self, marker: MarkerId) -> Option<Size>;
    fn mount(&self, marker: MarkerId, content: &OverlayContent, position: TooltipPosition);
    fn reposition(&self, marker: MarkerId, position: TooltipPosition);
    fn unmount(&self, marker: MarkerId);
}

#[derive(Debug, Clone, PartialEq)]
pub struct MountedOverlay {
    pub content: OverlayContent,
    pub position: TooltipPosition,
}

#[derive(Debug, Default)]
struct MemoryLayerState {
    viewport: Viewport,
    anchors: HashMap<MarkerId, Rect>,
    sizes: HashMap<MarkerId, Size>,
    mounted: HashMap<MarkerId, MountedOverlay>,
    mounts: u64,
    repositions: u64,
}

/// In-process layer that records what would be on screen.
#[derive(Debug, Default)]
pub struct MemoryLayer {
    state: RwLock<MemoryLayerState>,
}

impl MemoryLayer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            state: RwLock::new(MemoryLayerState {
                viewport,
                ..MemoryLayerState::default()
            }),
        }
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.write().viewport = viewport;
    }

    pub fn set_anchor(&self, marker: MarkerId, rect: Rect) {
        self.state.write().anchors.insert(marker, rect);
    }

    pub fn set_overlay_size(&self, marker: MarkerId, size: Size) {
        self.state.write().sizes.insert(marker, size);
    }

    pub fn mounted(&self, marker: MarkerId) -> Option<MountedOverlay> {
        self.state.read().mounted.get(&marker).cloned()
    }

    pub fn is_mounted(&self, marker: MarkerId) -> bool {
        self.state.read().mounted.contains_key(&marker)
    }

    pub fn mounted_count(&self) -> usize {
        self.state.read().mounted.len()
    }

    /// Total `mount` calls since creation.
    pub fn mounts(&self) -> u64 {
        self.state.read().mounts
    }

    pub fn repositions(&self) -> u64 {
        self.state.read().repositions
    }
}

impl OverlayLayer for MemoryLayer {
    fn viewport(&self) -> Viewport {
        self.state.read().viewport
    }

    fn anchor_rect(&self, marker: MarkerId) -> Option<Rect> {
        self.state.read().anchors.get(&marker).copied()
    }

    fn overlay_size(&self, marker: MarkerId) -> Option<Size> {
        self.state.read().sizes.get(&marker).copied()
    }

    fn mount(&self, marker: MarkerId, content: &OverlayContent, position: TooltipPosition) {
        let mut state = self.state.write();
        state.mounts += 1;
        state.mounted.insert(
            marker,
            MountedOverlay {
                content: content.clone(),
                position,
            },
        );
    }

    fn reposition(&self, marker: MarkerId, position: TooltipPosition) {
        let mut state = self.state.write();
        if let Some(mounted) = state.mounted.get_mut(&marker) {
            mounted.position = position;
            state.repositions += 1;
        }
    }

    fn unmount(&self, marker: MarkerId) {
        self.state.write().mounted.remove(&marker);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportChange {
    Scroll,
    Resize,
}

type Listener = Arc<dyn Fn(ViewportChange) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: HashMap<u64, Listener>,
}

/// Scroll and resize listener registry.
#[derive(Clone, Default)]
pub struct ViewportBus {
    inner: Arc<Mutex<BusInner>>,
}

impl std::fmt::Debug for ViewportBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ViewportBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` until the returned guard is dropped.
    #[must_use = "the listener is removed when the subscription is dropped"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(ViewportChange) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.insert(id, Arc::new(listener));
        Subscription {
            bus: self.clone(),
            id,
        }
    }

    /// Notifies every listener. Listeners may subscribe or unsubscribe while running.
    pub fn emit(&self, change: ViewportChange) {
        let listeners: Vec<Listener> = self.inner.lock().listeners.values().cloned().collect();
        for listener in listeners {
            listener(change);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    fn remove(&self, id: u64) {
        self.inner.lock().listeners.remove(&id);
    }
}

/// Keeps one viewport listener registered.
pub struct Subscription {
    bus: ViewportBus,
    id: u64,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.remove(self.id);
    }
}
