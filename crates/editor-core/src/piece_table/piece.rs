/// A contiguous run of one backing buffer.
///
/// `newlines` is the piece's cached line-start data: the window of the
/// owning buffer's newline table whose entries fall inside `range`. It is
/// fixed when the piece is created and re-derived by binary search when the
/// piece is split, so the buffer bytes are never rescanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    pub buf_kind: crate::enums::BufferKind,
    pub range: std::ops::Range<u64>,
    pub newlines: std::ops::Range<usize>,
}

impl Piece {
    /// Builds a piece over `range`, locating its newline window in `table`.
    pub fn new(
        buf_kind: crate::enums::BufferKind,
        range: std::ops::Range<u64>,
        table: &[u64],
    ) -> Self {
        let lo = table.partition_point(|&nl| nl < range.start);
        let hi = lo + table[lo..].partition_point(|&nl| nl < range.end);

        Self {
            buf_kind,
            range,
            newlines: lo..hi,
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.start == self.range.end
    }

    #[inline]
    pub fn newline_count(&self) -> usize {
        self.newlines.end - self.newlines.start
    }

    /// Intra-piece offsets of every `\n` this piece covers.
    pub fn line_starts<'t>(&self, table: &'t [u64]) -> impl Iterator<Item = u64> + 't {
        let start = self.range.start;

        table[self.newlines.clone()].iter().map(move |&nl| nl - start)
    }

    /// Splits at intra-piece offset `at` (`0 < at < len`). The newline
    /// window is partitioned, not recomputed from bytes.
    pub fn split_at(&self, at: u64, table: &[u64]) -> (Piece, Piece) {
        debug_assert!(at > 0 && at < self.len());

        let mid = self.range.start + at;
        let split = self.newlines.start
            + table[self.newlines.clone()].partition_point(|&nl| nl < mid);

        (
            Piece {
                buf_kind: self.buf_kind,
                range: self.range.start..mid,
                newlines: self.newlines.start..split,
            },
            Piece {
                buf_kind: self.buf_kind,
                range: mid..self.range.end,
                newlines: split..self.newlines.end,
            },
        )
    }

    /// Whether `next` continues this piece in the same buffer.
    #[inline]
    pub fn is_continued_by(&self, next: &Piece) -> bool {
        self.buf_kind == next.buf_kind && self.range.end == next.range.start
    }

    /// Extends this piece over `next`, which must continue it.
    #[inline]
    pub fn absorb(&mut self, next: &Piece) {
        debug_assert!(self.is_continued_by(next));

        self.range.end = next.range.end;
        self.newlines.end = next.newlines.end;
    }
}

#[cfg(test)]
mod tests {
    use super::Piece;
    use crate::enums::BufferKind;

    // "ab\ncd\nef" -> newlines at 2 and 5
    const TABLE: [u64; 2] = [2, 5];

    #[test]
    fn new_finds_the_covered_window() {
        let whole = Piece::new(BufferKind::Original, 0..8, &TABLE);
        let tail = Piece::new(BufferKind::Original, 3..8, &TABLE);
        let none = Piece::new(BufferKind::Original, 6..8, &TABLE);

        assert_eq!(whole.newlines, 0..2);
        assert_eq!(tail.newlines, 1..2);
        assert_eq!(none.newlines, 2..2);
        assert_eq!(none.newline_count(), 0);
    }

    #[test]
    fn split_partitions_line_starts() {
        let piece = Piece::new(BufferKind::Original, 0..8, &TABLE);

        // Split right after the first newline.
        let (left, right) = piece.split_at(3, &TABLE);

        assert_eq!(left.range, 0..3);
        assert_eq!(right.range, 3..8);
        assert_eq!(left.line_starts(&TABLE).collect::<Vec<_>>(), vec![2]);
        assert_eq!(right.line_starts(&TABLE).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn split_just_before_a_newline_keeps_it_right() {
        let piece = Piece::new(BufferKind::Original, 0..8, &TABLE);
        let (left, right) = piece.split_at(2, &TABLE);

        assert_eq!(left.newline_count(), 0);
        assert_eq!(right.newline_count(), 2);
    }

    #[test]
    fn absorb_rejoins_a_split() {
        let piece = Piece::new(BufferKind::Add, 0..8, &TABLE);
        let (mut left, right) = piece.split_at(4, &TABLE);

        assert!(left.is_continued_by(&right));

        left.absorb(&right);

        assert_eq!(left, piece);
    }

    #[test]
    fn different_buffers_never_continue() {
        let original = Piece::new(BufferKind::Original, 0..2, &TABLE);
        let add = Piece {
            buf_kind: BufferKind::Add,
            range: 2..4,
            newlines: 0..0,
        };

        assert!(!original.is_continued_by(&add));
    }
}
