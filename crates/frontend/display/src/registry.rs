//! Ownership of every live canvas
//!
//! Front ends with several machine screens keep their canvases here and pass
//! the registry around explicitly; there is no global "active canvas".

use std::collections::BTreeMap;

use crate::canvas::VideoCanvas;
use crate::error::CanvasError;
use crate::host::DrawableId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanvasId(u32);

#[derive(Default)]
pub struct CanvasRegistry {
    next_id: u32,
    canvases: BTreeMap<CanvasId, VideoCanvas>,
}

impl CanvasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, canvas: VideoCanvas) -> CanvasId {
        let id = CanvasId(self.next_id);
        self.next_id += 1;
        self.canvases.insert(id, canvas);
        id
    }

    pub fn get(&self, id: CanvasId) -> Option<&VideoCanvas> {
        self.canvases.get(&id)
    }

    pub fn get_mut(&mut self, id: CanvasId) -> Option<&mut VideoCanvas> {
        self.canvases.get_mut(&id)
    }

    /// Destroy and drop a canvas. Returns `false` for an unknown id.
    pub fn destroy(&mut self, id: CanvasId) -> bool {
        match self.canvases.remove(&id) {
            Some(mut canvas) => {
                canvas.destroy();
                true
            }
            None => false,
        }
    }

    pub fn destroy_all(&mut self) {
        for (_, mut canvas) in std::mem::take(&mut self.canvases) {
            canvas.destroy();
        }
    }

    /// Forward a host window resize. Returns `Ok(false)` for an unknown id.
    pub fn resize_viewport(&mut self, id: CanvasId, width: u32, height: u32) -> Result<bool, CanvasError> {
        match self.canvases.get_mut(&id) {
            Some(canvas) => canvas.resize_viewport(width, height).map(|_| true),
            None => Ok(false),
        }
    }

    /// Find the canvas that owns a drawable, for dispatching host repaints.
    pub fn by_drawable(&self, drawable: DrawableId) -> Option<CanvasId> {
        self.canvases
            .iter()
            .find(|(_, canvas)| canvas.drawable() == Some(drawable))
            .map(|(id, _)| *id)
    }

    pub fn ids(&self) -> impl Iterator<Item = CanvasId> + '_ {
        self.canvases.keys().copied()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CanvasId, &mut VideoCanvas)> {
        self.canvases.iter_mut().map(|(id, canvas)| (*id, canvas))
    }

    pub fn len(&self) -> usize {
        self.canvases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canvases.is_empty()
    }
}
