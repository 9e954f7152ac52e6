//! Numeric utilities: safe and centralized integer conversions.
//!
//! Page arithmetic is done in `u64`; in-memory slicing needs `usize`. Keep the
//! conversions here so call sites stay consistent and searchable.

#[inline]
#[must_use]
pub fn u64_to_usize(v: u64) -> Option<usize> {
    usize::try_from(v).ok()
}

/// Clamps to `usize::MAX` on targets where `usize` is narrower than 64 bits.
#[inline]
#[must_use]
pub fn u64_to_usize_saturating(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn u128_to_u64_saturating(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u64_to_usize_matches_std_try_from() {
        for &v in &[0u64, 1, 42, u64::from(u32::MAX), u64::from(u32::MAX) + 1] {
            assert_eq!(u64_to_usize(v), usize::try_from(v).ok());
        }
    }

    #[test]
    fn saturating_helpers_clamp() {
        assert_eq!(u64_to_usize_saturating(7), 7);
        assert_eq!(u128_to_u64_saturating(u128::from(u64::MAX) + 1), u64::MAX);
        assert_eq!(u128_to_u64_saturating(0), 0);
    }

    #[test]
    fn usize_to_u64_is_lossless() {
        for &v in &[0usize, 1, 42, 10_000] {
            assert_eq!(usize_to_u64(v), v as u64);
        }
    }
}
