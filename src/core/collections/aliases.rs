use rustc_hash::FxHashMap;
use smallvec::SmallVec;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// Optimized `HashMap` type for performance-critical operations.
/// Uses `rustc_hash::FxHasher` for faster hashing in non-cryptographic contexts.
///
/// # Security Warning
///
/// ⚠️ **Not DoS-resistant**: Do not use with attacker-controlled keys.
/// Grid cell ids are derived from the envelope itself, so this is fine for
/// internal indexing.
///
/// # Examples
///
/// ```rust
/// use tolerance_envelope::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<usize, Vec<usize>> = FastHashMap::default();
/// map.entry(7).or_default().push(3);
/// assert_eq!(map[&7], vec![3]);
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Small-optimized Vec that uses stack allocation for small collections.
/// Provides heap fallback for larger collections.
///
/// # Examples
///
/// ```rust
/// use tolerance_envelope::core::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
/// for i in 0..5 {
///     buffer.push(i);
/// }
/// assert!(!buffer.spilled());
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

// =============================================================================
// SEMANTIC SIZE CONSTANTS AND TYPE ALIASES
// =============================================================================

/// Inline capacity of a [`JumpList`]. Certification steps exclude at most
/// two prisms.
pub const JUMP_LIST_INLINE_CAPACITY: usize = 4;

/// Ascending prism indices excluded from a single certification step.
///
/// Jump lists are query-local and live on the stack.
///
/// # Examples
///
/// ```rust
/// use tolerance_envelope::core::collections::{JumpList, jump_list};
///
/// let jump: JumpList = jump_list(&[9, 2, 9]);
/// assert_eq!(jump.as_slice(), &[2, 9]);
/// assert!(!jump.spilled());
/// ```
pub type JumpList = SmallBuffer<usize, JUMP_LIST_INLINE_CAPACITY>;

/// Build a sorted, deduplicated [`JumpList`] from prism indices.
#[must_use]
pub fn jump_list(prisms: &[usize]) -> JumpList {
    let mut jump: JumpList = prisms.iter().copied().collect();
    jump.sort_unstable();
    jump.dedup();
    jump
}

/// Inline capacity for the per-query list of candidate prisms.
pub const CANDIDATE_INLINE_CAPACITY: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_collections_basic_operations() {
        let mut map: FastHashMap<usize, Vec<usize>> = FastHashMap::default();
        assert!(map.is_empty());

        map.entry(123).or_default().push(456);
        map.entry(123).or_default().push(789);
        assert_eq!(map.get(&123).map(Vec::len), Some(2));
        assert!(!map.contains_key(&999));
    }

    #[test]
    fn test_jump_list_stays_inline_and_sorted() {
        let jump = jump_list(&[5, 1]);
        assert_eq!(jump.as_slice(), &[1, 5]);
        assert!(!jump.spilled());
        assert!(jump.binary_search(&5).is_ok());
        assert!(jump.binary_search(&3).is_err());

        let mut buffer: JumpList = JumpList::new();
        for i in 0..=JUMP_LIST_INLINE_CAPACITY {
            buffer.push(i);
        }
        assert!(buffer.spilled());
    }
}
