//! # Compact Id Sets
//!
//! *Append-only sets of ascending `u64` ids whose memory layout is the wire format.*
//!
//! ## Intuition First
//!
//! Row ids, object ids and log sequence numbers tend to arrive in order, in
//! bursts. Some stretches are dense (every id present), some are lumpy (most
//! ids present), and some are a lone id followed by a long gap. A single
//! encoding is wasteful for at least one of those. This crate picks the
//! encoding per stretch, as ids arrive:
//!
//! - a lone id costs one word;
//! - a lumpy stretch costs one bit per id slot;
//! - a dense stretch costs two words, however long it is.
//!
//! ## Layout
//!
//! ```text
//! buffer:       [count | first tail.. | first tail.. | ...]
//! block_index:  [1,      k,             ...]
//! ```
//!
//! `buffer` is a flat `Vec<u64>`. Word 0 holds the id count, then one block
//! follows another. Each block is its first id plus zero or more control
//! words:
//!
//! | tail              | block      | ids                               |
//! |-------------------|------------|-----------------------------------|
//! | none              | singleton  | `first`                           |
//! | one even word `c` | run        | `first .. first + c/2`            |
//! | odd first word    | bitmask    | `first + 64k + b` per set bit     |
//!
//! Bit 0 of a bitmask is `first` itself, so it is always set. That is what
//! makes the word odd and distinguishes it from a run count.
//!
//! ## Complexity
//!
//! - `push`: amortized $O(1)$. Only the last block is touched.
//! - `contains`: $O(\log B)$ binary search over $B$ blocks, then $O(1)$.
//! - `count`: $O(1)$ (word 0).
//!
//! ## What Could Go Wrong
//!
//! 1. **Order**: ids must be strictly ascending. Anything else is rejected
//!    with [`Error::OutOfOrder`] and the set is left as it was.
//! 2. **Runs are rigid**: a run block only grows by its immediate successor.
//!    A gap after a run always starts a new block.
//! 3. **Boundaries**: blocks are not self-delimiting. The block index must be
//!    stored next to the buffer ([`CompactIdSet::into_parts`],
//!    [`CompactIdSet::to_bytes`]).
//!
//! ## Example
//!
//! ```rust
//! use compact_idset::CompactIdSet;
//!
//! let mut set = CompactIdSet::new();
//! set.push(5).unwrap();
//! set.push(6).unwrap();
//! set.push(7).unwrap();
//! assert!(set.push(6).is_err());
//!
//! assert_eq!(set.count(), 3);
//! assert!(set.contains(6));
//! assert!(!set.contains(8));
//! assert_eq!(set.to_vec(), vec![5, 6, 7]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bits;
pub mod block;
pub mod error;
pub mod idset;

pub use block::{Block, BlockIter};
pub use error::{Error, Result};
pub use idset::{CompactIdSet, Iter};
