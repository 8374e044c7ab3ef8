use std::ops::{AddAssign, SubAssign};

use crate::edit_result::EditResult;
use crate::enums::{BufferKind, Edit};
use crate::errors::{TextBufferError, TextBufferResult};
use crate::piece_table::buffer::{AddBuffer, BackingBuffer, OriginalBuffer};
use crate::piece_table::piece::Piece;

/// The editable byte content of one document.
///
/// Locating the piece for an offset is a linear scan over cumulative piece
/// lengths, so edits and reads cost O(pieces). Coalescing keeps the piece
/// count proportional to the number of non-contiguous edits; that is the
/// scaling limit of this structure.
#[derive(Debug)]
pub struct PieceTable {
    /// Original unchanged content (heap or memory-mapped).
    original: OriginalBuffer,
    /// Append-only buffer storing every inserted byte.
    add: AddBuffer,
    /// Ordered list of pieces describing the visible document.
    pieces: Vec<Piece>,
    /// Sum of all piece lengths.
    len: u64,
    config: crate::config::Config,

    pub undo_stack: Vec<Edit>,
    pub redo_stack: Vec<Edit>,
}

/// Which piece an offset sitting exactly on a piece boundary resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bias {
    /// The end of the preceding piece (insertion point).
    Left,
    /// The start of the following piece (first byte to read or remove).
    Right,
}

pub trait SliceOf {
    fn slice_of(&self, piece: &Piece) -> &[u8];
}

/*

====================================
========= CREATION METHOD ==========
====================================

*/

impl PieceTable {
    pub fn new(original: OriginalBuffer) -> TextBufferResult<Self> {
        Self::with_config(original, crate::config::Config::default())
    }

    pub fn with_config(
        original: OriginalBuffer,
        config: crate::config::Config,
    ) -> TextBufferResult<Self> {
        let len = u64::try_from(original.len())?;
        let mut pieces = Vec::new();

        if len > 0 {
            pieces.push(Piece::new(BufferKind::Original, 0..len, original.newlines()));
        }

        Ok(Self {
            original,
            add: AddBuffer::with_capacity(config.add_buffer_capacity),
            pieces,
            len,
            config,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        })
    }

    /// Copies `bytes` into a heap-backed original buffer.
    pub fn from_bytes(bytes: &[u8]) -> TextBufferResult<Self> {
        Self::new(OriginalBuffer::from_bytes(bytes)?)
    }
}

/*

====================================
========= INLINE METHODS  ==========
====================================

*/

impl PieceTable {
    /// Total document length in bytes. O(1).
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    #[inline]
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    #[inline]
    pub fn original(&self) -> &OriginalBuffer {
        &self.original
    }

    #[inline]
    pub fn add_buffer(&self) -> &AddBuffer {
        &self.add
    }

    /// The newline table of the buffer `kind` refers to.
    #[inline]
    pub fn newline_table(&self, kind: BufferKind) -> &[u64] {
        match kind {
            BufferKind::Original => self.original.newlines(),
            BufferKind::Add => self.add.newlines(),
        }
    }

    /// Checks `offset..offset + len` against the document and returns its end.
    pub fn check_range(&self, offset: u64, len: u64) -> TextBufferResult<u64> {
        offset
            .checked_add(len)
            .filter(|&end| end <= self.len)
            .ok_or(TextBufferError::OffsetOutOfRange {
                offset,
                len: self.len,
            })
    }

    /// Checks that `offset` is a valid insertion point (`0..=len`).
    pub fn check_insertion_point(&self, offset: u64) -> TextBufferResult<()> {
        if offset > self.len {
            return Err(TextBufferError::OffsetOutOfRange {
                offset,
                len: self.len,
            });
        }

        Ok(())
    }

    /// Returns `(piece index, offset inside that piece)`.
    ///
    /// With [`Bias::Left`] a boundary offset resolves to the end of the
    /// preceding piece; with [`Bias::Right`] to the start of the next one.
    /// Positions at the document end resolve to `(pieces.len(), 0)` when no
    /// piece can hold them.
    #[inline]
    fn locate(&self, mut pos: u64, bias: Bias) -> (usize, u64) {
        for (idx, piece) in self.pieces.iter().enumerate() {
            let piece_len = piece.len();
            let inside = match bias {
                Bias::Left => pos <= piece_len,
                Bias::Right => pos < piece_len,
            };

            if inside {
                return (idx, pos);
            }

            pos.sub_assign(piece_len);
        }

        (self.pieces.len(), 0)
    }

    /// Bytes of `piece` restricted to the intra-piece `from..to`.
    #[inline]
    fn sub_slice(&self, piece: &Piece, from: u64, to: u64) -> &[u8] {
        // Piece ranges are built from buffer lengths, so they fit in usize.
        let start = (piece.range.start + from) as usize;
        let end = (piece.range.start + to) as usize;

        match piece.buf_kind {
            BufferKind::Original => &self.original.bytes()[start..end],
            BufferKind::Add => &self.add.bytes()[start..end],
        }
    }
}

impl SliceOf for PieceTable {
    #[inline]
    fn slice_of(&self, piece: &Piece) -> &[u8] {
        self.sub_slice(piece, 0, piece.len())
    }
}

/*

=====================================
========= INSERT / DELETE  ==========
=====================================

*/

impl PieceTable {
    /// Merges `pieces[idx]` with whichever neighbours it continues or is
    /// continued by.
    fn merge_around(&mut self, mut idx: usize) {
        if idx > 0
            && idx < self.pieces.len()
            && self.pieces[idx - 1].is_continued_by(&self.pieces[idx])
        {
            let next = self.pieces.remove(idx);

            idx.sub_assign(1);
            self.pieces[idx].absorb(&next);
        }

        if idx + 1 < self.pieces.len() && self.pieces[idx].is_continued_by(&self.pieces[idx + 1])
        {
            let next = self.pieces.remove(idx + 1);

            self.pieces[idx].absorb(&next);
        }
    }

    /// Places `new_piece` at logical `pos`. The caller has validated `pos`.
    fn insert_piece(&mut self, pos: u64, new_piece: Piece, coalesce: bool) {
        let (idx, offset) = self.locate(pos, Bias::Left);
        let piece_len = new_piece.len();

        let placed_at = if idx == self.pieces.len() {
            self.pieces.push(new_piece);

            self.pieces.len() - 1
        } else if offset == 0 {
            self.pieces.insert(idx, new_piece);

            idx
        } else if offset == self.pieces[idx].len() {
            self.pieces.insert(idx + 1, new_piece);

            idx + 1
        } else {
            let table = self.newline_table(self.pieces[idx].buf_kind);
            let (left, right) = self.pieces[idx].split_at(offset, table);

            self.pieces.splice(idx..=idx, [left, new_piece, right]);

            idx + 1
        };

        self.len.add_assign(piece_len);

        if coalesce {
            self.merge_around(placed_at);
        }
    }

    pub fn insert(&mut self, pos: u64, bytes: &[u8]) -> TextBufferResult<EditResult> {
        if let Err(err) = self.check_insertion_point(pos) {
            tracing::warn!(pos, len = self.len, "insert rejected: offset out of range");

            return Err(err);
        }

        if bytes.is_empty() {
            return Ok(EditResult::noop(pos));
        }

        let bytes_len = u64::try_from(bytes.len())?;

        self.len
            .checked_add(bytes_len)
            .ok_or(TextBufferError::Overflow)?;

        let appended = self.add.append(bytes)?;
        let new_piece = Piece {
            buf_kind: BufferKind::Add,
            range: appended.range.clone(),
            newlines: appended.newlines,
        };

        self.insert_piece(pos, new_piece, self.config.coalesce_inserts);

        if self.config.history {
            self.record_insert(pos, appended.range);
        }

        tracing::trace!(pos, bytes = bytes_len, pieces = self.pieces.len(), "insert");

        Ok(EditResult::insertion(
            pos,
            bytes_len,
            appended.relative_newlines,
        ))
    }

    /// Removes `pos..pos + len`, returning the pieces that covered it in
    /// document order. The caller has validated the range.
    fn delete_pieces(&mut self, pos: u64, len: u64) -> Vec<Piece> {
        let (mut idx, offset) = self.locate(pos, Bias::Right);

        if offset > 0 {
            let table = self.newline_table(self.pieces[idx].buf_kind);
            let (left, right) = self.pieces[idx].split_at(offset, table);

            self.pieces.splice(idx..=idx, [left, right]);
            idx.add_assign(1);
        }

        // Pieces wholly inside the range are dropped in one drain.
        let mut remaining = len;
        let mut end_idx = idx;

        while end_idx < self.pieces.len() && self.pieces[end_idx].len() <= remaining {
            remaining.sub_assign(self.pieces[end_idx].len());
            end_idx.add_assign(1);
        }

        let mut removed: Vec<Piece> = self.pieces.drain(idx..end_idx).collect();

        if remaining > 0 {
            let table = self.newline_table(self.pieces[idx].buf_kind);
            let (left, right) = self.pieces[idx].split_at(remaining, table);

            removed.push(left);
            self.pieces[idx] = right;
        }

        self.len.sub_assign(len);

        if idx > 0 && idx < self.pieces.len() {
            self.merge_around(idx);
        }

        removed
    }

    pub fn delete(&mut self, pos: u64, len: u64) -> TextBufferResult<EditResult> {
        if let Err(err) = self.check_range(pos, len) {
            tracing::warn!(pos, len, doc_len = self.len, "delete rejected: range out of bounds");

            return Err(err);
        }

        if len == 0 {
            return Ok(EditResult::noop(pos));
        }

        let removed = self.delete_pieces(pos, len);
        let removed_newlines = removed.iter().map(Piece::newline_count).sum();

        if self.config.history {
            self.record_delete(pos, len, removed, removed_newlines);
        }

        tracing::trace!(pos, len, removed_newlines, pieces = self.pieces.len(), "delete");

        Ok(EditResult::deletion(pos, len, removed_newlines))
    }

    /// Replaces `pos..pos + len` with `bytes` as a single undo step.
    ///
    /// Every fallible step runs before the pieces change, so an error leaves
    /// the document untouched.
    pub fn replace(&mut self, pos: u64, len: u64, bytes: &[u8]) -> TextBufferResult<EditResult> {
        if bytes.is_empty() {
            return self.delete(pos, len);
        }

        if len == 0 {
            return self.insert(pos, bytes);
        }

        if let Err(err) = self.check_range(pos, len) {
            tracing::warn!(pos, len, doc_len = self.len, "replace rejected: range out of bounds");

            return Err(err);
        }

        let bytes_len = u64::try_from(bytes.len())?;

        (self.len - len)
            .checked_add(bytes_len)
            .ok_or(TextBufferError::Overflow)?;

        let appended = self.add.append(bytes)?;
        let removed = self.delete_pieces(pos, len);
        let removed_newlines = removed.iter().map(Piece::newline_count).sum();
        let new_piece = Piece {
            buf_kind: BufferKind::Add,
            range: appended.range.clone(),
            newlines: appended.newlines,
        };

        self.insert_piece(pos, new_piece, self.config.coalesce_inserts);

        if self.config.history {
            self.redo_stack.clear();
            self.undo_stack.push(Edit::Replace {
                pos,
                len,
                removed,
                range: appended.range,
            });
        }

        tracing::trace!(pos, len, bytes = bytes_len, pieces = self.pieces.len(), "replace");

        Ok(EditResult::deletion(pos, len, removed_newlines).then_insert(EditResult::insertion(
            pos,
            bytes_len,
            appended.relative_newlines,
        )))
    }

    /// Re-inserts `pieces` back to back starting at `pos` and reports the
    /// newline layout of the restored bytes.
    fn restore_pieces(&mut self, pos: u64, pieces: &[Piece]) -> EditResult {
        let mut cursor = pos;
        let mut relative_newlines = Vec::new();

        for piece in pieces {
            let base = cursor - pos;

            relative_newlines.extend(
                piece
                    .line_starts(self.newline_table(piece.buf_kind))
                    .map(|nl| base + nl),
            );
            self.insert_piece(cursor, piece.clone(), true);
            cursor.add_assign(piece.len());
        }

        EditResult::insertion(pos, cursor - pos, relative_newlines)
    }
}

/*

====================================
=========== UNDO / REDO ============
====================================

*/

impl PieceTable {
    /// Newlines inside the add-buffer `range`.
    fn add_newlines_in(&self, range: &std::ops::Range<u64>) -> usize {
        let table = self.add.newlines();

        table.partition_point(|&nl| nl < range.end) - table.partition_point(|&nl| nl < range.start)
    }

    /// Pushes an insertion, or extends the previous insertion when this one
    /// continues it in both the document and the add buffer.
    fn record_insert(&mut self, pos: u64, range: std::ops::Range<u64>) {
        self.redo_stack.clear();

        let continues_top = self.config.group_edits
            && self.add_newlines_in(&range) == 0
            && match self.undo_stack.last() {
                Some(
                    Edit::Insert {
                        pos: last_pos,
                        range: last,
                    }
                    | Edit::Replace {
                        pos: last_pos,
                        range: last,
                        ..
                    },
                ) => {
                    last.end == range.start
                        && last_pos + (last.end - last.start) == pos
                        && self.add_newlines_in(last) == 0
                }
                _ => false,
            };

        if continues_top
            && let Some(Edit::Insert { range: last, .. } | Edit::Replace { range: last, .. }) =
                self.undo_stack.last_mut()
        {
            last.end = range.end;

            return;
        }

        self.undo_stack.push(Edit::Insert { pos, range });
    }

    /// Pushes a deletion, or folds it into the previous deletion when it is a
    /// backspace (ends where that one started) or a forward delete (starts at
    /// the same offset).
    fn record_delete(
        &mut self,
        pos: u64,
        len: u64,
        mut removed: Vec<Piece>,
        removed_newlines: usize,
    ) {
        self.redo_stack.clear();

        if self.config.group_edits
            && removed_newlines == 0
            && let Some(Edit::Delete {
                pos: last_pos,
                len: last_len,
                removed: last_removed,
            }) = self.undo_stack.last_mut()
            && last_removed.iter().all(|piece| piece.newline_count() == 0)
        {
            if pos + len == *last_pos {
                removed.append(last_removed);
                *last_removed = removed;
                *last_pos = pos;
                last_len.add_assign(len);

                return;
            }

            if pos == *last_pos {
                last_removed.append(&mut removed);
                last_len.add_assign(len);

                return;
            }
        }

        self.undo_stack.push(Edit::Delete { pos, len, removed });
    }

    /// Newlines the next [`PieceTable::undo`] would insert.
    pub fn undo_newlines(&self) -> usize {
        match self.undo_stack.last() {
            Some(Edit::Delete { removed, .. } | Edit::Replace { removed, .. }) => {
                removed.iter().map(Piece::newline_count).sum()
            }
            Some(Edit::Insert { .. }) | None => 0,
        }
    }

    /// Newlines the next [`PieceTable::redo`] would insert.
    pub fn redo_newlines(&self) -> usize {
        match self.redo_stack.last() {
            Some(Edit::Insert { range, .. } | Edit::Replace { range, .. }) => {
                self.add_newlines_in(range)
            }
            Some(Edit::Delete { .. }) | None => 0,
        }
    }

    /// Reverts the most recent edit. Returns `None` when there is nothing
    /// to undo, otherwise the delta the revert applied to the document.
    pub fn undo(&mut self) -> TextBufferResult<Option<EditResult>> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(None);
        };

        let check = match &cmd {
            Edit::Insert { pos, range } | Edit::Replace { pos, range, .. } => {
                self.check_range(*pos, range.end - range.start).map(drop)
            }
            Edit::Delete { pos, .. } => self.check_insertion_point(*pos),
        };

        if let Err(err) = check {
            self.undo_stack.push(cmd);

            return Err(err);
        }

        let result = match &cmd {
            Edit::Insert { pos, range } => {
                let len = range.end - range.start;
                let removed = self.delete_pieces(*pos, len);

                EditResult::deletion(*pos, len, removed.iter().map(Piece::newline_count).sum())
            }
            Edit::Delete { pos, removed, .. } => self.restore_pieces(*pos, removed),
            Edit::Replace {
                pos,
                removed,
                range,
                ..
            } => {
                let len = range.end - range.start;
                let dropped = self.delete_pieces(*pos, len);
                let removal =
                    EditResult::deletion(*pos, len, dropped.iter().map(Piece::newline_count).sum());

                removal.then_insert(self.restore_pieces(*pos, removed))
            }
        };

        self.redo_stack.push(cmd);

        Ok(Some(result))
    }

    /// Re-applies the most recently undone edit.
    pub fn redo(&mut self) -> TextBufferResult<Option<EditResult>> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(None);
        };

        let check = match &cmd {
            Edit::Insert { pos, .. } => self.check_insertion_point(*pos),
            Edit::Delete { pos, len, .. } | Edit::Replace { pos, len, .. } => {
                self.check_range(*pos, *len).map(drop)
            }
        };

        if let Err(err) = check {
            self.redo_stack.push(cmd);

            return Err(err);
        }

        let result = match cmd {
            Edit::Insert { pos, range } => {
                let piece = Piece::new(BufferKind::Add, range.clone(), self.add.newlines());
                let result = self.restore_pieces(pos, std::slice::from_ref(&piece));

                self.undo_stack.push(Edit::Insert { pos, range });

                result
            }
            Edit::Delete { pos, len, .. } => {
                let removed = self.delete_pieces(pos, len);
                let removed_newlines = removed.iter().map(Piece::newline_count).sum();

                self.undo_stack.push(Edit::Delete { pos, len, removed });

                EditResult::deletion(pos, len, removed_newlines)
            }
            Edit::Replace { pos, len, range, .. } => {
                let removed = self.delete_pieces(pos, len);
                let removed_newlines = removed.iter().map(Piece::newline_count).sum();
                let piece = Piece::new(BufferKind::Add, range.clone(), self.add.newlines());
                let insertion = self.restore_pieces(pos, std::slice::from_ref(&piece));

                self.undo_stack.push(Edit::Replace {
                    pos,
                    len,
                    removed,
                    range,
                });

                EditResult::deletion(pos, len, removed_newlines).then_insert(insertion)
            }
        };

        Ok(Some(result))
    }
}

/*

====================================
========== MISCELLANEOUS ===========
====================================

*/

impl PieceTable {
    /// Exactly `len` bytes starting at `pos`.
    pub fn get_bytes_at(&self, pos: u64, len: u64) -> TextBufferResult<Vec<u8>> {
        self.check_range(pos, len)?;

        let mut res = Vec::new();

        res.try_reserve_exact(usize::try_from(len)?)?;

        if len == 0 {
            return Ok(res);
        }

        let (idx, mut offset) = self.locate(pos, Bias::Right);
        let mut remaining = len;

        for piece in &self.pieces[idx..] {
            let take = (piece.len() - offset).min(remaining);

            res.extend_from_slice(self.sub_slice(piece, offset, offset + take));
            remaining.sub_assign(take);

            if remaining == 0 {
                break;
            }

            offset = 0;
        }

        Ok(res)
    }

    pub fn get_string(&self, pos: u64, len: u64) -> TextBufferResult<String> {
        Ok(String::from_utf8_lossy(&self.get_bytes_at(pos, len)?).into_owned())
    }

    /// Returns an iterator that yields sequential zero-copy byte slices
    /// representing the fully evaluated text document.
    pub fn iter_bytes(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.pieces.iter().map(move |piece| self.slice_of(piece))
    }

    /// The whole document as one flat byte vector.
    pub fn serialize(&self) -> TextBufferResult<Vec<u8>> {
        let mut out = Vec::new();

        out.try_reserve_exact(usize::try_from(self.len)?)?;

        for chunk in self.iter_bytes() {
            out.extend_from_slice(chunk);
        }

        Ok(out)
    }
}

/*

===================
===== COMPACT =====
===================

*/

impl PieceTable {
    /// Rewrites the live document into a fresh heap original buffer.
    ///
    /// The add buffer is cleared and shrunk back to the configured baseline,
    /// the piece list collapses to a single piece, and both history stacks
    /// are cleared since their ranges point into the discarded buffers.
    /// Document content is unchanged.
    pub fn compact(&mut self) -> TextBufferResult<()> {
        let bytes = self.serialize()?;
        let newline_count = self.pieces.iter().map(Piece::newline_count).sum();
        let mut newlines = Vec::new();
        let mut base = 0u64;

        newlines.try_reserve_exact(newline_count)?;

        for piece in &self.pieces {
            newlines.extend(
                piece
                    .line_starts(self.newline_table(piece.buf_kind))
                    .map(|nl| base + nl),
            );
            base.add_assign(piece.len());
        }

        let pieces_before = self.pieces.len();

        self.original = OriginalBuffer::from_parts(bytes.into_boxed_slice(), newlines);
        self.add.reset(self.config.add_buffer_capacity);
        self.pieces.clear();

        if self.len > 0 {
            self.pieces.push(Piece::new(
                BufferKind::Original,
                0..self.len,
                self.original.newlines(),
            ));
        }

        self.undo_stack.clear();
        self.redo_stack.clear();

        tracing::debug!(pieces_before, bytes = self.len, "compacted piece table");

        Ok(())
    }
}
