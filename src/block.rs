//! Decoded view of a single block.
//!
//! A block is `first_id` followed by a tail of control words:
//!
//! ```text
//! []                       Singleton   { first_id }
//! [2 * count]              Run         first_id .. first_id + count
//! [1 | m0, m1, ..., mk]    Bitmask     bit b of m_k => first_id + 64k + b
//! ```
//!
//! Bit 0 of a bitmask's first word stands for `first_id` itself, so it is
//! always set. That makes the word odd, which is what tells a one-word
//! bitmask apart from a run count (always even).

use crate::bits::{self, WORD_BITS};

/// A read-only view of one block inside a [`CompactIdSet`](crate::CompactIdSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block<'a> {
    /// Exactly one id.
    Singleton(u64),
    /// `len` contiguous ids starting at `first`.
    Run {
        /// Smallest id in the run.
        first: u64,
        /// Number of ids in the run.
        len: u64,
    },
    /// Arbitrary ids in a window of `64 * words.len()` starting at `first`.
    Bitmask {
        /// Smallest id in the window (bit 0 of `words[0]`).
        first: u64,
        /// Membership words, lowest offsets first.
        words: &'a [u64],
    },
}

impl<'a> Block<'a> {
    /// Decode a block from its first id and its tail words.
    pub(crate) fn decode(first: u64, tail: &'a [u64]) -> Self {
        match tail {
            [] => Block::Singleton(first),
            [word] if !bits::is_bitmask_tag(*word) => Block::Run {
                first,
                len: *word / 2,
            },
            words => Block::Bitmask { first, words },
        }
    }

    /// Smallest id in the block.
    pub fn first(&self) -> u64 {
        match *self {
            Block::Singleton(id) => id,
            Block::Run { first, .. } | Block::Bitmask { first, .. } => first,
        }
    }

    /// Largest id in the block.
    ///
    /// `None` for a zero-length run, or when the encoded window runs past
    /// `u64::MAX`. Neither can come out of a validated set.
    pub fn last(&self) -> Option<u64> {
        match *self {
            Block::Singleton(id) => Some(id),
            Block::Run { first, len } => first.checked_add(len.checked_sub(1)?),
            Block::Bitmask { first, words } => {
                let (k, word) = words.iter().enumerate().rev().find(|(_, &w)| w != 0)?;
                let bit = bits::highest_bit(*word)?;
                let offset = (k as u64).checked_mul(WORD_BITS)?.checked_add(bit)?;
                first.checked_add(offset)
            }
        }
    }

    /// Number of ids in the block.
    pub fn len(&self) -> u64 {
        match *self {
            Block::Singleton(_) => 1,
            Block::Run { len, .. } => len,
            Block::Bitmask { words, .. } => bits::count_ones(words),
        }
    }

    /// Return true if the block encodes no ids (only possible for a zero-length run).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of control words after `first_id`.
    pub fn tail_len(&self) -> usize {
        match *self {
            Block::Singleton(_) => 0,
            Block::Run { .. } => 1,
            Block::Bitmask { words, .. } => words.len(),
        }
    }

    /// Return true if `id` is encoded by this block.
    pub fn contains(&self, id: u64) -> bool {
        match *self {
            Block::Singleton(only) => id == only,
            Block::Run { first, len } => id >= first && id - first < len,
            Block::Bitmask { first, words } => {
                if id < first {
                    return false;
                }
                let (word, bit) = bits::locate(id - first);
                usize::try_from(word)
                    .ok()
                    .and_then(|w| words.get(w))
                    .is_some_and(|&w| bits::has_bit(w, bit))
            }
        }
    }

    /// Iterate over the ids of this block in ascending order.
    pub fn iter(&self) -> BlockIter<'a> {
        let state = match *self {
            Block::Singleton(id) => State::Singleton(id),
            Block::Run { first, len } => State::Run {
                next: first,
                remaining: len,
            },
            Block::Bitmask { first, words } => match words.split_first() {
                Some((&current, rest)) => State::Bitmask {
                    base: first,
                    current,
                    rest,
                },
                None => State::Done,
            },
        };
        BlockIter { state }
    }
}

impl<'a> IntoIterator for Block<'a> {
    type Item = u64;
    type IntoIter = BlockIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
enum State<'a> {
    Done,
    Singleton(u64),
    Run {
        next: u64,
        remaining: u64,
    },
    Bitmask {
        /// Id of bit 0 of `current`.
        base: u64,
        current: u64,
        rest: &'a [u64],
    },
}

/// Ascending iterator over the ids of one [`Block`].
#[derive(Debug, Clone)]
pub struct BlockIter<'a> {
    state: State<'a>,
}

impl BlockIter<'_> {
    pub(crate) fn empty() -> Self {
        Self { state: State::Done }
    }
}

impl Iterator for BlockIter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        match &mut self.state {
            State::Done => None,
            State::Singleton(id) => {
                let id = *id;
                self.state = State::Done;
                Some(id)
            }
            State::Run { next, remaining } => {
                if *remaining == 0 {
                    self.state = State::Done;
                    return None;
                }
                let id = *next;
                *remaining -= 1;
                *next = next.wrapping_add(1);
                Some(id)
            }
            State::Bitmask {
                base,
                current,
                rest,
            } => loop {
                if let Some(bit) = bits::pop_lowest(current) {
                    return Some(base.wrapping_add(bit));
                }
                let words = *rest;
                match words.split_first() {
                    Some((&word, tail)) => {
                        *current = word;
                        *rest = tail;
                        *base = base.wrapping_add(WORD_BITS);
                    }
                    None => {
                        self.state = State::Done;
                        return None;
                    }
                }
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = match &self.state {
            State::Done => 0,
            State::Singleton(_) => 1,
            State::Run { remaining, .. } => *remaining,
            State::Bitmask { current, rest, .. } => {
                u64::from(current.count_ones()) + bits::count_ones(rest)
            }
        };
        match usize::try_from(n) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl std::iter::FusedIterator for BlockIter<'_> {}
