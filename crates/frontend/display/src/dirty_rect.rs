//! Coalescing of partial surface updates into GPU uploads
//!
//! Refreshes arrive at scanline granularity, many per emulated frame, while a
//! texture upload is the expensive part of a present. The tracker folds every
//! refresh since the last present into at most one upload:
//!
//! ```text
//!              refresh(r)                refresh(r2)
//!   Static ---------------> DirtyRect(r) ----------> DirtyRect(r ∪ r2)
//!     ^                          |
//!     |        take()            |
//!     +--------------------------+
//!
//!   resize -> NewTexture (absorbs refreshes until take())
//! ```
//!
//! A single bounding box is kept rather than a rectangle list: two small
//! updates in opposite corners upload the whole span between them.

use emu_core::Rect;

/// Pending upload state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirtyState {
    /// Nothing pending.
    #[default]
    Static,
    /// The whole texture must be (re)created from the staging buffer.
    NewTexture,
    /// Only the accumulated rectangle changed.
    DirtyRect(Rect),
}

/// What a present pass has to upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upload {
    None,
    Full,
    Partial(Rect),
}

#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    state: DirtyState,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DirtyState {
        self.state
    }

    /// Force a full upload; overrides anything pending.
    pub fn mark_new_texture(&mut self) {
        self.state = DirtyState::NewTexture;
    }

    /// Record a refreshed rectangle.
    pub fn mark(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.state = match self.state {
            DirtyState::Static => DirtyState::DirtyRect(rect),
            DirtyState::DirtyRect(acc) => DirtyState::DirtyRect(acc.union(&rect)),
            DirtyState::NewTexture => DirtyState::NewTexture,
        };
    }

    /// Consume the pending state; the tracker is `Static` afterwards.
    pub fn take(&mut self) -> Upload {
        match std::mem::take(&mut self.state) {
            DirtyState::Static => Upload::None,
            DirtyState::NewTexture => Upload::Full,
            DirtyState::DirtyRect(rect) => Upload::Partial(rect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn random_rect(rng: &mut impl Rng) -> Rect {
        Rect::new(
            rng.gen_range(0..400),
            rng.gen_range(0..300),
            rng.gen_range(1..100),
            rng.gen_range(1..100),
        )
    }

    #[test]
    fn test_starts_static() {
        let mut tracker = DirtyTracker::new();
        assert_eq!(tracker.state(), DirtyState::Static);
        assert_eq!(tracker.take(), Upload::None);
    }

    #[test]
    fn test_three_refreshes_coalesce() {
        let mut tracker = DirtyTracker::new();
        tracker.mark(Rect::new(0, 0, 10, 10));
        tracker.mark(Rect::new(20, 20, 5, 5));
        tracker.mark(Rect::new(5, 5, 10, 10));
        assert_eq!(tracker.state(), DirtyState::DirtyRect(Rect::new(0, 0, 25, 25)));
        assert_eq!(tracker.take(), Upload::Partial(Rect::new(0, 0, 25, 25)));
        assert_eq!(tracker.state(), DirtyState::Static);
    }

    #[test]
    fn test_new_texture_absorbs_refreshes() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_new_texture();
        tracker.mark(Rect::new(1, 1, 2, 2));
        assert_eq!(tracker.state(), DirtyState::NewTexture);
        assert_eq!(tracker.take(), Upload::Full);
        assert_eq!(tracker.take(), Upload::None);
    }

    #[test]
    fn test_resize_overrides_pending_rect() {
        let mut tracker = DirtyTracker::new();
        tracker.mark(Rect::new(1, 1, 2, 2));
        tracker.mark_new_texture();
        assert_eq!(tracker.take(), Upload::Full);
    }

    #[test]
    fn test_empty_rect_is_ignored() {
        let mut tracker = DirtyTracker::new();
        tracker.mark(Rect::new(5, 5, 0, 3));
        assert_eq!(tracker.state(), DirtyState::Static);
    }

    #[test]
    fn test_union_order_does_not_matter() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0xD1B7);
        for _ in 0..1000 {
            let a = random_rect(&mut rng);
            let b = random_rect(&mut rng);
            let c = random_rect(&mut rng);

            let mut ab = DirtyTracker::new();
            ab.mark(a);
            ab.mark(b);
            let mut ba = DirtyTracker::new();
            ba.mark(b);
            ba.mark(a);
            assert_eq!(ab.take(), ba.take());

            let mut left = DirtyTracker::new();
            left.mark(a.union(&b));
            left.mark(c);
            let mut right = DirtyTracker::new();
            right.mark(a);
            right.mark(b.union(&c));
            assert_eq!(left.take(), right.take());
        }
    }

    #[test]
    fn test_accumulated_rect_covers_every_input() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(99);
        let mut tracker = DirtyTracker::new();
        let rects: Vec<Rect> = (0..20).map(|_| random_rect(&mut rng)).collect();
        for r in &rects {
            tracker.mark(*r);
        }
        let Upload::Partial(acc) = tracker.take() else {
            panic!("expected a partial upload");
        };
        for r in rects {
            assert_eq!(acc.union(&r), acc);
        }
    }
}
