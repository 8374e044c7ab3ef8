/// # Line Index Module.
///
/// A B-tree over line lengths. Leaves hold the length of each line
/// (excluding its `\n`); every node carries a [`line_summary::LineSummary`]
/// so line-number and byte-offset lookups descend in O(log n).
pub mod btree;
pub mod line_iter;
pub mod line_summary;
pub mod node;
pub mod search_cache;

pub const MAX_CHILDREN: usize = 16;
/// Every non-root node touched by an edit holds at least this many entries.
pub const MIN_CHILDREN: usize = MAX_CHILDREN / 2;

/// Where a line sits in the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineSpan {
    pub start_offset: u64,
    /// Length in bytes, excluding the terminating `\n`.
    pub length: u64,
}

impl LineSpan {
    #[inline]
    #[must_use]
    pub fn end_offset(&self) -> u64 {
        self.start_offset + self.length
    }
}

/// Splits `items` into the fewest chunks of at most [`MAX_CHILDREN`],
/// sized as evenly as possible. More than `MAX_CHILDREN` items always yield
/// chunks of at least [`MIN_CHILDREN`].
pub(crate) fn even_chunks<T>(mut items: Vec<T>) -> Vec<Vec<T>> {
    let total = items.len();
    let count = total.div_ceil(MAX_CHILDREN).max(1);
    let base = total / count;
    let extra = total % count;
    let mut chunks = Vec::with_capacity(count);

    for idx in (1..count).rev() {
        chunks.push(items.split_off(idx * base + idx.min(extra)));
    }

    chunks.push(items);
    chunks.reverse();

    chunks
}
