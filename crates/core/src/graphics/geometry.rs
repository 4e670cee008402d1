//! Aspect-ratio and scaling math for presenting a source surface in a viewport
//!
//! [`compute_transform`] is a pure function shared by every backend. Its result
//! maps viewport pixels to source pixels:
//!
//! ```text
//! source_x = (viewport_x + offset_x) * scale_x
//! source_y = (viewport_y + offset_y) * scale_y
//! ```
//!
//! Scales are "source pixels per viewport pixel", so values below 1.0 enlarge
//! the image. Offsets are in viewport pixels and are negative when the scaled
//! image is smaller than the viewport on that axis (the image is centred).
//!
//! # Fit policy
//!
//! With aspect preservation enabled a height fit is always tried first. The
//! width fit is only used when fitting the height would overflow the viewport
//! width, so when both fit exactly the height wins.

use serde::{Deserialize, Serialize};

use crate::types::Size;

/// Display geometry supplied by the emulation core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Width-to-height ratio of one emulated pixel.
    pub pixel_aspect_ratio: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            pixel_aspect_ratio: 1.0,
        }
    }
}

/// Everything besides the source size that the transform depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParams {
    pub viewport: Size,
    pub keep_aspect: bool,
    pub true_aspect: bool,
    pub pixel_aspect_ratio: f64,
}

impl ViewParams {
    pub fn transform_for(&self, source: Size) -> Transform {
        compute_transform(
            source.width,
            source.height,
            self.viewport.width,
            self.viewport.height,
            self.keep_aspect,
            self.true_aspect,
            self.pixel_aspect_ratio,
        )
    }
}

/// Scale and centring offset from viewport space into source space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale_x: 1.0,
        scale_y: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    /// Size of the source image once scaled into the viewport, in viewport pixels.
    pub fn scaled_size(&self, source: Size) -> (f64, f64) {
        (
            source.width as f64 / self.scale_x,
            source.height as f64 / self.scale_y,
        )
    }

    /// The same mapping expressed as `source = viewport * s + t`.
    pub fn to_affine(&self) -> Affine {
        Affine {
            sx: self.scale_x,
            sy: self.scale_y,
            tx: self.offset_x * self.scale_x,
            ty: self.offset_y * self.scale_y,
        }
    }

    /// Half-extents of a viewport-centred quad in normalized device coordinates.
    ///
    /// A value of 1.0 spans the whole viewport on that axis.
    pub fn normalized(&self, source: Size, viewport: Size) -> (f32, f32) {
        let (w, h) = self.scaled_size(source);
        let vw = viewport.width.max(1) as f64;
        let vh = viewport.height.max(1) as f64;
        ((w / vw) as f32, (h / vh) as f32)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Affine viewport-to-source map used directly by the software compositor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Affine {
    #[inline]
    pub fn map(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.sx + self.tx, y * self.sy + self.ty)
    }
}

/// Compute the viewport-to-source transform.
///
/// Zero viewport dimensions are treated as 1 (minimized or half torn down
/// windows). Zero source dimensions and non-finite or non-positive pixel
/// aspect ratios are clamped the same way so the scales stay finite.
pub fn compute_transform(
    source_w: u32,
    source_h: u32,
    viewport_w: u32,
    viewport_h: u32,
    keep_aspect: bool,
    true_aspect: bool,
    pixel_aspect_ratio: f64,
) -> Transform {
    let sw = source_w.max(1) as f64;
    let sh = source_h.max(1) as f64;
    let vw = viewport_w.max(1) as f64;
    let vh = viewport_h.max(1) as f64;

    if !keep_aspect {
        return Transform {
            scale_x: sw / vw,
            scale_y: sh / vh,
            offset_x: 0.0,
            offset_y: 0.0,
        };
    }

    let aspect_fix = if true_aspect && pixel_aspect_ratio.is_finite() && pixel_aspect_ratio > 0.0
    {
        pixel_aspect_ratio
    } else {
        1.0
    };

    let mut offset_x = 0.0;
    let mut offset_y = 0.0;

    // Height fit first.
    let mut scale = sh / vh;
    if sw * aspect_fix / scale > vw {
        scale = sw * aspect_fix / vw;
        offset_y = (sh / scale - vh) / 2.0;
    } else {
        offset_x = (sw * aspect_fix / scale - vw) / 2.0;
    }

    Transform {
        scale_x: scale / aspect_fix,
        scale_y: scale,
        offset_x,
        offset_y,
    }
}
