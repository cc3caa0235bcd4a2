//! Single-word bit helpers.
//!
//! Everything the block codec does at bit level goes through these, so the
//! growth policy and the decoders never shift or mask by hand.

/// Number of bits in one control word.
pub const WORD_BITS: u64 = 64;

/// A word with only bit `k` set. `k` must be `< 64`.
#[inline]
pub const fn kth_bit(k: u64) -> u64 {
    1u64 << k
}

/// Return true if bit `k` of `word` is set.
#[inline]
pub const fn has_bit(word: u64, k: u64) -> bool {
    (word & kth_bit(k)) != 0
}

/// Return true if every bit of `word` is set.
#[inline]
pub const fn is_full(word: u64) -> bool {
    word == u64::MAX
}

/// Bitmask tails are tagged by bit 0 of their first word (always the block's
/// own first id); run count words are always even.
#[inline]
pub const fn is_bitmask_tag(word: u64) -> bool {
    word & 1 == 1
}

/// Split a bit offset into `(word, bit)` coordinates.
#[inline]
pub const fn locate(offset: u64) -> (u64, u64) {
    (offset / WORD_BITS, offset % WORD_BITS)
}

/// Index of the highest set bit, or `None` for a zero word.
#[inline]
pub const fn highest_bit(word: u64) -> Option<u64> {
    if word == 0 {
        None
    } else {
        Some(63 - word.leading_zeros() as u64)
    }
}

/// Clear and return the lowest set bit of `word`.
#[inline]
pub fn pop_lowest(word: &mut u64) -> Option<u64> {
    if *word == 0 {
        return None;
    }
    let bit = word.trailing_zeros() as u64;
    *word &= *word - 1;
    Some(bit)
}

/// Count how many words at the end of `words` are completely full.
pub fn count_trailing_full(words: &[u64]) -> usize {
    words.iter().rev().take_while(|&&w| is_full(w)).count()
}

/// Total number of set bits across `words`.
pub fn count_ones(words: &[u64]) -> u64 {
    words.iter().map(|w| u64::from(w.count_ones())).sum()
}
