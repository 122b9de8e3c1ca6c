//! Aligned storage.

/// Alignment in bytes of frame planes, line buffers and scratch regions.
pub const ALIGNMENT: usize = 64;

/// Rounds `n` up to a multiple of `a`.
#[inline]
pub const fn align(n: usize, a: usize) -> usize {
    n.div_ceil(a) * a
}

#[derive(Clone, Copy)]
#[repr(C, align(64))]
struct Block([u8; ALIGNMENT]);

/// Zero-initialized byte buffer whose start is aligned to [`ALIGNMENT`].
#[derive(Clone)]
pub struct AlignedVec {
    blocks: Vec<Block>,
    len: usize,
}

impl AlignedVec {
    /// Allocates `len` zero bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            blocks: vec![Block([0; ALIGNMENT]); len.div_ceil(ALIGNMENT)],
            len,
        }
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte view.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: blocks hold at least `len` initialized bytes.
        unsafe { std::slice::from_raw_parts(self.blocks.as_ptr().cast::<u8>(), self.len) }
    }

    /// Mutable byte view.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: blocks hold at least `len` initialized bytes.
        unsafe { std::slice::from_raw_parts_mut(self.blocks.as_mut_ptr().cast::<u8>(), self.len) }
    }

    /// Raw pointer to the first byte.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.blocks.as_mut_ptr().cast::<u8>()
    }
}

impl std::fmt::Debug for AlignedVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedVec").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align(0, 64), 0);
        assert_eq!(align(1, 64), 64);
        assert_eq!(align(64, 64), 64);
        assert_eq!(align(65, 64), 128);
    }

    #[test]
    fn test_aligned_vec() {
        let mut v = AlignedVec::zeroed(100);
        assert_eq!(v.len(), 100);
        assert_eq!(v.as_slice().as_ptr() as usize % ALIGNMENT, 0);
        assert!(v.as_slice().iter().all(|&b| b == 0));

        v.as_mut_slice()[99] = 7;
        assert_eq!(v.as_slice()[99], 7);
    }
}
