/// The delta an edit made to the logical document.
///
/// Produced by the piece table and consumed by
/// [`BTreeLineIndex::apply_edit`](crate::line_index::btree::BTreeLineIndex::apply_edit),
/// so the line index never has to look at document bytes. A result may
/// carry both a removal and an insertion at the same `offset`; the removal
/// is applied first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditResult {
    /// Logical offset where the edit starts.
    pub offset: u64,
    /// Bytes removed at `offset`.
    pub removed_len: u64,
    /// Newlines contained in the removed bytes.
    pub removed_newlines: usize,
    /// Bytes inserted at `offset` (after the removal).
    pub inserted_len: u64,
    /// Offsets of every `\n` in the inserted bytes, relative to `offset`,
    /// ascending.
    pub inserted_newlines: Vec<u64>,
}

impl EditResult {
    /// An edit that changed nothing.
    #[must_use]
    pub fn noop(offset: u64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn insertion(offset: u64, inserted_len: u64, inserted_newlines: Vec<u64>) -> Self {
        Self {
            offset,
            inserted_len,
            inserted_newlines,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn deletion(offset: u64, removed_len: u64, removed_newlines: usize) -> Self {
        Self {
            offset,
            removed_len,
            removed_newlines,
            ..Self::default()
        }
    }

    /// Folds an insertion at the same offset into this (removal) result.
    #[must_use]
    pub fn then_insert(mut self, insertion: EditResult) -> Self {
        self.inserted_len = insertion.inserted_len;
        self.inserted_newlines = insertion.inserted_newlines;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed_len == 0 && self.inserted_len == 0
    }

    /// Net change in document length.
    #[inline]
    #[must_use]
    pub fn byte_delta(&self) -> i128 {
        i128::from(self.inserted_len) - i128::from(self.removed_len)
    }

    /// Net change in line count.
    #[inline]
    #[must_use]
    pub fn line_delta(&self) -> isize {
        self.inserted_newlines.len() as isize - self.removed_newlines as isize
    }
}
