//! Pre-sized byte region holding exactly one frame.

use super::transform::{BoneTransform, BONE_STRIDE};

/// Fixed-size frame storage.
///
/// Sized once at attach time and never resized. One buffer backs one
/// [`Player`](crate::Player), so there is never more than one writer.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    bytes: Box<[u8]>,
}

impl FrameBuffer {
    /// Allocates a zeroed buffer of `size` bytes.
    ///
    /// This is the only allocation a frame buffer ever makes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for a zero-length buffer.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read-only view over the current contents.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable view for writers.
    #[inline]
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Decodes bone `index` starting at `offset`.
    ///
    /// Returns `None` if the slot lies outside the buffer.
    #[must_use]
    pub fn bone(&self, offset: usize, index: usize) -> Option<BoneTransform> {
        let start = offset.checked_add(index.checked_mul(BONE_STRIDE)?)?;
        let end = start.checked_add(BONE_STRIDE)?;
        self.bytes.get(start..end).map(BoneTransform::read_from)
    }
}
