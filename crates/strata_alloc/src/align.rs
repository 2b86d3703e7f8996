//! Size alignment helpers.

/// Minimum payload alignment of tracked chunks.
#[cfg(not(feature = "simd-align"))]
pub const ALIGNMENT: usize = std::mem::size_of::<usize>();

/// Minimum payload alignment of tracked chunks.
#[cfg(feature = "simd-align")]
pub const ALIGNMENT: usize = 16;

/// Rounds `size` up to a multiple of `align`, which must be a power of two.
///
/// # Example
///
/// ```rust
/// use strata_alloc::align_up;
///
/// assert_eq!(align_up(13, 8), 16);
/// assert_eq!(align_up(16, 8), 16);
/// ```
#[inline]
#[must_use]
pub const fn align_up(size: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (size + align - 1) & !(align - 1)
}

/// Rounds `size` down to a multiple of `align`, which must be a power of two.
#[inline]
#[must_use]
pub const fn align_down(size: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    size & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up_and_down() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(17, 16), 32);
        assert_eq!(align_down(17, 16), 16);
        assert_eq!(align_down(15, 16), 0);
        assert_eq!(align_down(32, 16), 32);
    }

    #[test]
    fn test_alignment_is_power_of_two() {
        assert!(ALIGNMENT.is_power_of_two());
        assert!(ALIGNMENT >= std::mem::align_of::<usize>());
    }
}
