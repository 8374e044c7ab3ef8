#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    Original,
    Add,
}

/// A piece-level history record. One record is one undo step.
#[derive(Clone, Debug, PartialEq)]
pub enum Edit {
    Insert {
        /// Document offset of the first inserted byte.
        pos: u64,
        /// The range of the add buffer holding the inserted bytes.
        range: std::ops::Range<u64>,
    },
    Delete {
        /// Document offset of the first deleted byte.
        pos: u64,
        /// The number of bytes deleted.
        len: u64,
        /// The pieces that covered the deleted bytes, in document order.
        removed: Vec<crate::piece_table::piece::Piece>,
    },
    /// A deletion immediately followed by an insertion at the same offset.
    Replace {
        pos: u64,
        /// Bytes removed before the insertion.
        len: u64,
        removed: Vec<crate::piece_table::piece::Piece>,
        /// Add-buffer range of the inserted bytes.
        range: std::ops::Range<u64>,
    },
}
