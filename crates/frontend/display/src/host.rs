//! Host windowing/compositing contract
//!
//! Window construction belongs to the host; a canvas only needs somewhere to
//! draw and a way to ask for a repaint. Backends obtain a [`DrawableId`] when
//! their surface is created and request repaints against it after every
//! accepted refresh.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::backend::BackendKind;

/// Host-level handle of the drawable a backend renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableId(pub u32);

/// Implemented by the host window system.
pub trait Compositor {
    /// Allocate a drawable for a backend of `kind` and hook up its
    /// resize/present callbacks.
    fn create_drawable(&mut self, kind: BackendKind) -> DrawableId;

    /// Drop a drawable obtained from [`Compositor::create_drawable`].
    fn release_drawable(&mut self, id: DrawableId);

    /// Schedule a repaint of `id` on the next host frame.
    fn request_repaint(&mut self, id: DrawableId);
}

/// Lets several canvases on one thread share a host.
impl<C: Compositor + ?Sized> Compositor for Rc<RefCell<C>> {
    fn create_drawable(&mut self, kind: BackendKind) -> DrawableId {
        self.borrow_mut().create_drawable(kind)
    }

    fn release_drawable(&mut self, id: DrawableId) {
        self.borrow_mut().release_drawable(id)
    }

    fn request_repaint(&mut self, id: DrawableId) {
        self.borrow_mut().request_repaint(id)
    }
}

/// Headless compositor that records drawables and coalesces repaint requests.
///
/// Host loops poll [`RepaintQueue::take_pending`] once per host frame and
/// present every canvas whose drawable is listed.
#[derive(Debug, Default)]
pub struct RepaintQueue {
    next_id: u32,
    live: BTreeSet<DrawableId>,
    pending: BTreeSet<DrawableId>,
    total_requests: u64,
}

impl RepaintQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self, id: DrawableId) -> bool {
        self.live.contains(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_pending(&self, id: DrawableId) -> bool {
        self.pending.contains(&id)
    }

    /// Number of repaint requests received, including coalesced ones.
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Drain the drawables awaiting a repaint.
    pub fn take_pending(&mut self) -> Vec<DrawableId> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

impl Compositor for RepaintQueue {
    fn create_drawable(&mut self, _kind: BackendKind) -> DrawableId {
        let id = DrawableId(self.next_id);
        self.next_id += 1;
        self.live.insert(id);
        id
    }

    fn release_drawable(&mut self, id: DrawableId) {
        self.live.remove(&id);
        self.pending.remove(&id);
    }

    fn request_repaint(&mut self, id: DrawableId) {
        self.total_requests += 1;
        if self.live.contains(&id) {
            self.pending.insert(id);
        }
    }
}
