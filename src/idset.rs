//! Append-only compact set of ascending `u64` ids.
//!
//! # Layout
//!
//! Two parallel arrays:
//!
//! - `buffer`: word 0 is the total id count, followed by variable-length
//!   blocks (see [`Block`] for the three tail shapes).
//! - `block_index`: the offset of every block's `first_id` word in `buffer`.
//!   `block_index[0] == 1` and offsets strictly increase.
//!
//! The word buffer is the serialized form; nothing is transformed on the way
//! to storage. Block boundaries are not self-delimiting, so `block_index`
//! has to travel with it.
//!
//! # Growth
//!
//! Only the last block ever changes. A new id either extends it or starts a
//! fresh singleton block:
//!
//! ```text
//! last block     distance d = id - first_id        action
//! ----------     ------------------------------    ------------------------------
//! singleton      d < 64                            1-word bitmask
//!                64 <= d < 128                     2-word bitmask
//!                d >= 128                          new block
//! run of n       d == n                            n + 1
//!                otherwise                         new block
//! bitmask, k=1   d < 192                           set bit (grow to <= 3 words)
//! bitmask, k>=2  d == 64k - 1, k >= 4              set bit, then maybe compact
//!                d < 64(k + 2)                     set bit (grow by <= 2 words)
//!                otherwise                         new block
//! ```
//!
//! Compaction drops the trailing all-ones words of a bitmask once there are
//! at least four of them and re-encodes them as a run block.

use crate::bits::{self, WORD_BITS};
use crate::block::{Block, BlockIter};
use crate::error::{Error, Result};

/// A singleton only turns into a bitmask when the second id is this close.
const SINGLETON_SPAN: u64 = 2 * WORD_BITS;

/// Reach of a one-word bitmask before a new block is cheaper.
const ONE_WORD_SPAN: u64 = 3 * WORD_BITS;

/// Words a multi-word bitmask may grow by in one push.
const MAX_GROWTH_WORDS: u64 = 2;

/// Minimum tail length, and minimum trailing full words, for compaction.
const MIN_COMPACT_WORDS: usize = 4;

/// Magic prefix of [`CompactIdSet::to_bytes`].
const MAGIC: &[u8; 8] = b"CIDSET01";

/// Compact set of strictly ascending `u64` ids.
///
/// Equality is structural: two sets compare equal when their word layouts
/// match, which is always the case for sets built from the same ids.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CompactIdSet {
    block_index: Vec<usize>,
    buffer: Vec<u64>,
}

impl std::fmt::Debug for CompactIdSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactIdSet")
            .field("count", &self.count())
            .field("blocks", &self.num_blocks())
            .field("words", &self.buffer.len())
            .finish()
    }
}

impl CompactIdSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from ids in strictly ascending order.
    ///
    /// Every id is checked; the first one that is not greater than its
    /// predecessor aborts the build with [`Error::OutOfOrder`].
    pub fn from_sorted<I>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut set = Self::new();
        for id in ids {
            set.push(id)?;
        }
        Ok(set)
    }

    /// Number of ids in the set. O(1).
    pub fn count(&self) -> u64 {
        self.buffer.first().copied().unwrap_or(0)
    }

    /// Return true if no id was ever pushed.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.block_index.len()
    }

    /// Block start offsets into [`buffer`](Self::buffer).
    pub fn block_index(&self) -> &[usize] {
        &self.block_index
    }

    /// The raw word buffer: count word followed by the blocks.
    pub fn buffer(&self) -> &[u64] {
        &self.buffer
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.block_index.capacity() * std::mem::size_of::<usize>()
            + self.buffer.capacity() * std::mem::size_of::<u64>()
    }

    /// Smallest id, if any.
    pub fn first(&self) -> Option<u64> {
        self.block_index.first().map(|&off| self.buffer[off])
    }

    /// Largest id, if any.
    pub fn last(&self) -> Option<u64> {
        self.last_block().and_then(|b| b.last())
    }

    /// Decoded view of every block, in order.
    pub fn blocks(&self) -> impl ExactSizeIterator<Item = Block<'_>> + '_ {
        (0..self.num_blocks()).map(move |i| self.block(i))
    }

    fn block(&self, i: usize) -> Block<'_> {
        let start = self.block_index[i];
        let end = self
            .block_index
            .get(i + 1)
            .copied()
            .unwrap_or(self.buffer.len());
        Block::decode(self.buffer[start], &self.buffer[start + 1..end])
    }

    fn last_block(&self) -> Option<Block<'_>> {
        self.num_blocks().checked_sub(1).map(|i| self.block(i))
    }

    /// Return true if `id` is in the set.
    ///
    /// Binary search over block first ids, then an O(1) lookup in one block.
    pub fn contains(&self, id: u64) -> bool {
        let pos = self
            .block_index
            .partition_point(|&off| self.buffer[off] <= id);
        match pos.checked_sub(1) {
            Some(i) => self.block(i).contains(id),
            None => false,
        }
    }

    /// Iterate over all ids in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            set: self,
            next_block: 0,
            current: BlockIter::empty(),
            remaining: self.count(),
        }
    }

    /// Decode every id into a vector, ascending.
    pub fn to_vec(&self) -> Vec<u64> {
        let mut out = Vec::with_capacity(usize::try_from(self.count()).unwrap_or(0));
        out.extend(self.iter());
        out
    }

    /// Append `id`, which must be greater than every id already present.
    ///
    /// On [`Error::OutOfOrder`] or [`Error::CountOverflow`] the set is left
    /// untouched.
    pub fn push(&mut self, id: u64) -> Result<()> {
        let Some(start) = self.block_index.last().copied() else {
            self.block_index = vec![1];
            self.buffer = vec![1, id];
            return Ok(());
        };
        let max = self.last().unwrap_or(self.buffer[start]);
        if id <= max {
            return Err(Error::OutOfOrder { id, max });
        }
        let count = self.buffer[0].checked_add(1).ok_or(Error::CountOverflow)?;

        self.buffer[0] = count;
        let diff = id - self.buffer[start];
        let tail = start + 1;
        match self.buffer.len() - tail {
            0 => self.grow_singleton(id, diff),
            1 => self.grow_one_word(id, tail, diff),
            tail_len => self.grow_bitmask(id, start, tail_len, diff),
        }
        Ok(())
    }

    fn grow_singleton(&mut self, id: u64, diff: u64) {
        if diff < WORD_BITS {
            self.buffer.push(bits::kth_bit(0) | bits::kth_bit(diff));
        } else if diff < SINGLETON_SPAN {
            self.buffer.push(bits::kth_bit(0));
            self.buffer.push(bits::kth_bit(diff - WORD_BITS));
        } else {
            self.append_singleton(id);
        }
    }

    fn grow_one_word(&mut self, id: u64, tail: usize, diff: u64) {
        let word = self.buffer[tail];
        if bits::is_bitmask_tag(word) {
            if diff < ONE_WORD_SPAN {
                self.set_tail_bit(tail, diff);
            } else {
                self.append_singleton(id);
            }
            return;
        }

        // A run only ever grows by its immediate successor.
        match word.checked_add(2) {
            Some(next) if diff == word / 2 => self.buffer[tail] = next,
            _ => self.append_singleton(id),
        }
    }

    fn grow_bitmask(&mut self, id: u64, start: usize, tail_len: usize, diff: u64) {
        let span = tail_len as u64 * WORD_BITS;
        if tail_len >= MIN_COMPACT_WORDS && diff == span - 1 {
            if let Some(last) = self.buffer.last_mut() {
                *last |= bits::kth_bit(WORD_BITS - 1);
            }
            self.compact(start, tail_len);
        } else if diff < span + MAX_GROWTH_WORDS * WORD_BITS {
            self.set_tail_bit(start + 1, diff);
        } else {
            self.append_singleton(id);
        }
    }

    /// Re-encode the trailing full words of the last bitmask block as a run.
    fn compact(&mut self, start: usize, tail_len: usize) {
        let full = bits::count_trailing_full(&self.buffer[start + 1..]);
        if full < MIN_COMPACT_WORDS {
            return;
        }

        let first = self.buffer[start];
        let run_word = full as u64 * WORD_BITS * 2;
        self.buffer.truncate(self.buffer.len() - full);

        if full == tail_len {
            log::trace!("compacted bitmask at {first} into a run of {}", run_word / 2);
            self.buffer.push(run_word);
        } else {
            let run_first = first + (tail_len - full) as u64 * WORD_BITS;
            log::trace!(
                "split {full} full words off bitmask at {first} into a run at {run_first}"
            );
            self.block_index.push(self.buffer.len());
            self.buffer.push(run_first);
            self.buffer.push(run_word);
        }
    }

    fn set_tail_bit(&mut self, tail: usize, offset: u64) {
        let (word, bit) = bits::locate(offset);
        let index = tail + word as usize;
        if index >= self.buffer.len() {
            self.buffer.resize(index + 1, 0);
        }
        self.buffer[index] |= bits::kth_bit(bit);
    }

    fn append_singleton(&mut self, id: u64) {
        log::trace!("new block at {id} (offset {})", self.buffer.len());
        self.block_index.push(self.buffer.len());
        self.buffer.push(id);
    }

    /// Take the set apart into `(block_index, buffer)`.
    pub fn into_parts(self) -> (Vec<usize>, Vec<u64>) {
        (self.block_index, self.buffer)
    }

    /// Reconstruct a set from `(block_index, buffer)`.
    ///
    /// The parts are fully validated, so untrusted input is rejected with
    /// [`Error::InvalidEncoding`] instead of misbehaving later.
    pub fn from_parts(block_index: Vec<usize>, buffer: Vec<u64>) -> Result<Self> {
        if block_index.is_empty() && buffer.is_empty() {
            return Ok(Self::new());
        }

        let invalid = |msg: String| {
            log::debug!("rejecting id set parts: {msg}");
            Error::InvalidEncoding(msg)
        };

        if block_index.first() != Some(&1) {
            return Err(invalid("block index must start at offset 1".to_string()));
        }
        if block_index.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("block index is not strictly increasing".to_string()));
        }
        if let Some(&last) = block_index.last() {
            if last >= buffer.len() {
                return Err(invalid(format!(
                    "block offset {last} out of range for {} words",
                    buffer.len()
                )));
            }
        }

        let set = Self {
            block_index,
            buffer,
        };

        let mut total = 0u64;
        let mut prev_last: Option<u64> = None;
        for (i, block) in set.blocks().enumerate() {
            if let Block::Bitmask { words, .. } = block {
                if !bits::is_bitmask_tag(words[0]) {
                    return Err(invalid(format!("block {i} has an untagged bitmask")));
                }
            }
            let Some(last) = block.last() else {
                return Err(invalid(format!("block {i} is empty or overflows u64")));
            };
            if prev_last.is_some_and(|p| block.first() <= p) {
                return Err(invalid(format!("block {i} is not above its predecessor")));
            }
            prev_last = Some(last);
            total = total
                .checked_add(block.len())
                .ok_or_else(|| invalid("id count overflows u64".to_string()))?;
        }

        if set.buffer[0] != total {
            return Err(invalid(format!(
                "count word {} does not match {total} encoded ids",
                set.buffer[0]
            )));
        }
        Ok(set)
    }

    /// Serialize to a stable binary encoding (little-endian).
    ///
    /// Format (versioned):
    /// - magic: 8 bytes (`CIDSET01`)
    /// - index_len: u64, then `index_len` u64 offsets
    /// - buffer_len: u64, then `buffer_len` u64 words
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 * (3 + self.block_index.len() + self.buffer.len()));
        out.extend_from_slice(MAGIC);

        out.extend_from_slice(&(self.block_index.len() as u64).to_le_bytes());
        for &off in &self.block_index {
            out.extend_from_slice(&(off as u64).to_le_bytes());
        }

        out.extend_from_slice(&(self.buffer.len() as u64).to_le_bytes());
        for &w in &self.buffer {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }

    /// Deserialize from [`to_bytes`](Self::to_bytes) output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = WordReader { bytes, off: 0 };

        if bytes.get(..MAGIC.len()) != Some(MAGIC.as_slice()) {
            return Err(Error::InvalidEncoding(
                "bad magic for CompactIdSet".to_string(),
            ));
        }
        reader.off = MAGIC.len();

        let index_len = reader.len_prefix()?;
        let mut block_index = Vec::with_capacity(index_len);
        for _ in 0..index_len {
            let off = usize::try_from(reader.word()?).map_err(|_| {
                Error::InvalidEncoding("block offset does not fit in usize".to_string())
            })?;
            block_index.push(off);
        }

        let buffer_len = reader.len_prefix()?;
        let mut buffer = Vec::with_capacity(buffer_len);
        for _ in 0..buffer_len {
            buffer.push(reader.word()?);
        }

        if reader.off != bytes.len() {
            return Err(Error::InvalidEncoding(
                "trailing bytes after CompactIdSet".to_string(),
            ));
        }

        Self::from_parts(block_index, buffer)
    }
}

struct WordReader<'a> {
    bytes: &'a [u8],
    off: usize,
}

impl WordReader<'_> {
    fn word(&mut self) -> Result<u64> {
        let slice = self
            .bytes
            .get(self.off..self.off + 8)
            .ok_or_else(|| Error::InvalidEncoding("unexpected end of input".to_string()))?;
        let mut word = [0u8; 8];
        word.copy_from_slice(slice);
        self.off += 8;
        Ok(u64::from_le_bytes(word))
    }

    /// A word count, bounded by what the rest of the input can hold.
    fn len_prefix(&mut self) -> Result<usize> {
        let n = self.word()?;
        let available = (self.bytes.len() - self.off) / 8;
        match usize::try_from(n) {
            Ok(n) if n <= available => Ok(n),
            _ => Err(Error::InvalidEncoding(format!(
                "length {n} too large for input ({} bytes)",
                self.bytes.len()
            ))),
        }
    }
}

impl<'a> IntoIterator for &'a CompactIdSet {
    type Item = u64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over a [`CompactIdSet`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    set: &'a CompactIdSet,
    next_block: usize,
    current: BlockIter<'a>,
    remaining: u64,
}

impl Iterator for Iter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            if let Some(id) = self.current.next() {
                self.remaining = self.remaining.saturating_sub(1);
                return Some(id);
            }
            if self.next_block >= self.set.num_blocks() {
                return None;
            }
            self.current = self.set.block(self.next_block).iter();
            self.next_block += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl std::iter::FusedIterator for Iter<'_> {}
