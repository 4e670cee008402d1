//! Error taxonomy for canvas and backend operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    /// The caller sequenced operations incorrectly (refresh before any
    /// context, any call after teardown).
    #[error("precondition violated: {0}")]
    Precondition(&'static str),

    /// A backend buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },
}

impl CanvasError {
    pub fn is_precondition(&self) -> bool {
        matches!(self, CanvasError::Precondition(_))
    }

    pub fn is_allocation(&self) -> bool {
        matches!(self, CanvasError::Allocation { .. })
    }
}

/// Allocate a zeroed buffer of `len` elements, reporting failure instead of aborting.
pub(crate) fn try_zeroed<T: Copy + Default>(
    len: usize,
    what: &'static str,
) -> Result<Vec<T>, CanvasError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| CanvasError::Allocation {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    buf.resize(len, T::default());
    Ok(buf)
}
