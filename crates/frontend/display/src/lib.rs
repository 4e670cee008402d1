//! Display presentation for emulator front ends
//!
//! Takes the indexed-color frames produced by an emulation core and presents
//! them scaled and aspect-corrected, either composited on the CPU or drawn as
//! a GPU texture.
//!
//! All types here stay on the thread that created them.

pub mod backend;
pub mod canvas;
pub mod dirty_rect;
pub mod error;
pub mod host;
pub mod palette;
pub mod registry;
pub mod settings;
pub mod stats;

pub use backend::{
    create_backend, BackendKind, Presented, RefreshOutcome, RefreshRegion, RendererBackend,
};
pub use canvas::{CanvasState, VideoCanvas};
pub use error::CanvasError;
pub use host::{Compositor, DrawableId, RepaintQueue};
pub use registry::{CanvasId, CanvasRegistry};
pub use settings::{TextureFilter, VideoSettings};
pub use stats::PresentStats;
