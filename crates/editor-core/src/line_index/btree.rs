use std::cell::Cell;

use tracing::trace;

use crate::edit_result::EditResult;
use crate::errors::{TextBufferError, TextBufferResult};
use crate::line_index::line_iter::LineRangeIter;
use crate::line_index::node::{InternalNode, LeafNode, Node};
use crate::line_index::search_cache::SearchCache;
use crate::line_index::{LineSpan, even_chunks};

/// Line number <-> byte offset index over a document.
///
/// Never looks at document bytes after [`BTreeLineIndex::build`]; every
/// later change arrives as an [`EditResult`].
#[derive(Debug)]
pub struct BTreeLineIndex {
    root: Node,
    cache: Cell<Option<SearchCache>>,
    /// Line lengths staged by an insertion; see [`BTreeLineIndex::reserve_lines`].
    scratch: Vec<u64>,
}

/// Scratch capacity kept between edits; larger pastes release theirs.
const SCRATCH_RETAIN: usize = 1024;

impl Default for BTreeLineIndex {
    /// The index of an empty document: one empty line.
    fn default() -> Self {
        Self {
            root: Node::Leaf(LeafNode::new(vec![0])),
            cache: Cell::new(None),
            scratch: Vec::new(),
        }
    }
}

/*

====================
===== CREATION =====
====================

*/

impl BTreeLineIndex {
    /// Builds the index bottom-up in one pass over `bytes`.
    ///
    /// A trailing unterminated line counts as a line, and a trailing `\n`
    /// opens an empty last line.
    pub fn build(bytes: &[u8]) -> TextBufferResult<Self> {
        let mut line_lengths = Vec::new();
        let mut line_start = 0usize;

        for newline in memchr::memchr_iter(b'\n', bytes) {
            line_lengths.push(u64::try_from(newline - line_start)?);
            line_start = newline + 1;
        }

        line_lengths.push(u64::try_from(bytes.len() - line_start)?);

        let leaves = even_chunks(line_lengths)
            .into_iter()
            .map(|chunk| Node::Leaf(LeafNode::new(chunk)))
            .collect();

        Ok(Self {
            root: Self::stack_levels(leaves),
            cache: Cell::new(None),
            scratch: Vec::new(),
        })
    }

    /// Groups same-depth nodes into parents until a single root remains.
    fn stack_levels(mut level: Vec<Node>) -> Node {
        while level.len() > 1 {
            level = even_chunks(level)
                .into_iter()
                .map(|chunk| Node::Internal(InternalNode::new(chunk)))
                .collect();
        }

        level
            .pop()
            .unwrap_or_else(|| Node::Leaf(LeafNode::new(vec![0])))
    }
}

/*

======================
======= GETTER =======
======================

*/

impl BTreeLineIndex {
    #[inline]
    pub fn line_count(&self) -> usize {
        self.root.summary().line_count
    }

    /// Bytes covered by the index. The last line has no terminator, so this
    /// is one less than the root's byte length.
    #[inline]
    pub fn document_length(&self) -> u64 {
        self.root.summary().byte_len.saturating_sub(1)
    }

    pub fn line_at(&self, line_idx: usize) -> TextBufferResult<LineSpan> {
        if let Some(cache) = self.cache.get()
            && cache.line_idx == line_idx
        {
            return Ok(cache.span);
        }

        let span = self
            .root
            .line_span(line_idx)
            .ok_or(TextBufferError::LineOutOfRange {
                line: line_idx,
                count: self.line_count(),
            })?;

        self.cache.set(Some(SearchCache { line_idx, span }));

        Ok(span)
    }

    /// The line containing `offset`. Offsets on a line boundary belong to the
    /// line starting there; `document_length()` belongs to the last line.
    pub fn line_number_at(&self, offset: u64) -> TextBufferResult<usize> {
        self.locate_offset(offset).map(|(line_idx, _)| line_idx)
    }

    pub fn line_length_at(&self, line_idx: usize) -> Option<u64> {
        self.root.line_span(line_idx).map(|span| span.length)
    }

    /// Iterates `(line number, span)` over `range`, clamped to the line count.
    pub fn lines(&self, range: std::ops::Range<usize>) -> LineRangeIter<'_> {
        let end = range.end.min(self.line_count());

        LineRangeIter::seek(&self.root, range.start.min(end)..end)
    }

    pub fn iter(&self) -> LineRangeIter<'_> {
        self.lines(0..self.line_count())
    }

    /// Height of the tree; a lone leaf is 1.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut node = &self.root;

        while let Node::Internal(internal_node) = node
            && let Some(first) = internal_node.children.first()
        {
            depth += 1;
            node = first;
        }

        depth
    }

    /// Checks summaries, uniform leaf depth and node fill bounds.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.line_count() == 0 {
            return Err("index holds no lines".to_string());
        }

        self.root.check(true).map(|_| ())
    }

    /// Line containing `offset` and that line's start offset.
    fn locate_offset(&self, offset: u64) -> TextBufferResult<(usize, u64)> {
        let len = self.document_length();

        if offset > len {
            return Err(TextBufferError::OffsetOutOfRange { offset, len });
        }

        self.root
            .line_at_offset(offset)
            .ok_or(TextBufferError::OffsetOutOfRange { offset, len })
    }
}

/*

====================
======= EDIT =======
====================

*/

impl BTreeLineIndex {
    /// Reserves room for an edit that will insert `newlines` line breaks.
    ///
    /// Call before mutating the text the index mirrors: once this succeeds,
    /// a well-formed delta with at most that many inserted newlines applies
    /// without allocating fallibly.
    pub fn reserve_lines(&mut self, newlines: usize) -> TextBufferResult<()> {
        self.scratch.clear();
        self.scratch.try_reserve_exact(newlines)?;

        Ok(())
    }

    /// Applies an edit delta: the removed half first, then the inserted half,
    /// both at `edit.offset`.
    ///
    /// The delta is checked against the index before anything changes, so an
    /// error leaves the index untouched.
    pub fn apply_edit(&mut self, edit: &EditResult) -> TextBufferResult<()> {
        if edit.is_noop() {
            return Ok(());
        }

        let len = self.document_length();
        let removal_end = edit
            .offset
            .checked_add(edit.removed_len)
            .filter(|&end| end <= len)
            .ok_or(TextBufferError::OffsetOutOfRange {
                offset: edit.offset,
                len,
            })?;

        let ascending = edit.inserted_newlines.windows(2).all(|w| w[0] < w[1]);
        let contained = edit
            .inserted_newlines
            .last()
            .is_none_or(|&newline| newline < edit.inserted_len);

        if !ascending || !contained {
            return Err(TextBufferError::InvalidInput(
                "inserted newline offsets must ascend within the inserted text",
            ));
        }

        let (start_line, start_of_line) = self.locate_offset(edit.offset)?;
        let (end_line, _) = self.locate_offset(removal_end)?;

        if end_line - start_line != edit.removed_newlines {
            return Err(TextBufferError::InvalidInput(
                "removed newline count does not match the indexed lines",
            ));
        }

        (len - edit.removed_len)
            .checked_add(edit.inserted_len)
            .and_then(|new_len| new_len.checked_add(1))
            .ok_or(TextBufferError::Overflow)?;

        let column = edit.offset - start_of_line;

        if edit.removed_len > 0 {
            self.remove_span(start_line, end_line, column, removal_end)?;
        }

        if edit.inserted_len > 0 {
            self.insert_span(start_line, column, edit)?;
        }

        self.cache.set(None);

        trace!(
            offset = edit.offset,
            removed = edit.removed_len,
            inserted = edit.inserted_len,
            lines = self.line_count(),
            "line index updated"
        );

        Ok(())
    }

    /// Joins the head of `start_line` with the tail of `end_line` and drops
    /// every line in between.
    fn remove_span(
        &mut self,
        start_line: usize,
        end_line: usize,
        column: u64,
        removal_end: u64,
    ) -> TextBufferResult<()> {
        let end_span = self.root.line_span(end_line).ok_or_else(|| self.line_error(end_line))?;
        let tail = end_span.end_offset() - removal_end;

        if end_line > start_line {
            self.root.remove_lines(start_line + 1..end_line + 1);
            self.collapse_root();
        }

        self.root
            .set_line_length(start_line, column + tail)
            .ok_or_else(|| self.line_error(start_line))?;

        Ok(())
    }

    /// Splits `start_line` at `column` around the inserted text.
    fn insert_span(
        &mut self,
        start_line: usize,
        column: u64,
        edit: &EditResult,
    ) -> TextBufferResult<()> {
        let old_len = self
            .line_length_at(start_line)
            .ok_or_else(|| self.line_error(start_line))?;

        let Some((&first, rest)) = edit.inserted_newlines.split_first() else {
            self.root
                .set_line_length(start_line, old_len + edit.inserted_len)
                .ok_or_else(|| self.line_error(start_line))?;

            return Ok(());
        };

        let mut new_lines = std::mem::take(&mut self.scratch);

        new_lines.clear();
        new_lines.try_reserve_exact(edit.inserted_newlines.len())?;

        let mut previous = first;

        for &newline in rest {
            new_lines.push(newline - previous - 1);
            previous = newline;
        }

        new_lines.push((edit.inserted_len - previous - 1) + (old_len - column));

        self.root
            .set_line_length(start_line, column + first)
            .ok_or_else(|| self.line_error(start_line))?;

        let overflow = self.root.insert_lines(start_line + 1, &new_lines);

        self.grow_root(overflow);

        new_lines.clear();
        new_lines.shrink_to(SCRATCH_RETAIN);
        self.scratch = new_lines;

        Ok(())
    }

    fn grow_root(&mut self, overflow: Vec<Node>) {
        if overflow.is_empty() {
            return;
        }

        let old_root = std::mem::replace(&mut self.root, Node::Leaf(LeafNode::new(Vec::new())));
        let mut level = Vec::with_capacity(overflow.len() + 1);

        level.push(old_root);
        level.extend(overflow);

        self.root = Self::stack_levels(level);
    }

    /// Replaces an internal root holding a single child with that child.
    fn collapse_root(&mut self) {
        loop {
            let only_child = match &mut self.root {
                Node::Internal(internal_node) if internal_node.children.len() == 1 => {
                    internal_node.children.pop()
                }
                _ => None,
            };

            match only_child {
                Some(child) => self.root = child,
                None => break,
            }
        }
    }

    fn line_error(&self, line: usize) -> TextBufferError {
        TextBufferError::LineOutOfRange {
            line,
            count: self.line_count(),
        }
    }
}
