use std::ops::{AddAssign, SubAssign};

use crate::line_index::line_summary::LineSummary;
use crate::line_index::{LineSpan, MAX_CHILDREN, MIN_CHILDREN, even_chunks};

/// Children at the same depth with a total summary of their summaries
#[derive(Debug)]
pub struct InternalNode {
    pub summary: LineSummary,
    pub children: Vec<Node>,
}

/// A run of consecutive line lengths
#[derive(Debug)]
pub struct LeafNode {
    pub summary: LineSummary,
    pub line_lengths: Vec<u64>,
}

#[derive(Debug)]
pub enum Node {
    Internal(InternalNode),
    Leaf(LeafNode),
}

impl LeafNode {
    pub fn new(line_lengths: Vec<u64>) -> Self {
        Self {
            summary: LineSummary::of_lines(&line_lengths),
            line_lengths,
        }
    }

    /// Keeps the first of [`even_chunks`] and returns the rest once the
    /// leaf holds more than `MAX_CHILDREN` lines.
    pub fn split_overflow(&mut self) -> Vec<LeafNode> {
        if self.line_lengths.len() <= MAX_CHILDREN {
            return Vec::new();
        }

        let mut chunks = even_chunks(std::mem::take(&mut self.line_lengths)).into_iter();

        self.line_lengths = chunks.next().unwrap_or_default();
        self.summary = LineSummary::of_lines(&self.line_lengths);

        chunks.map(LeafNode::new).collect()
    }
}

impl InternalNode {
    pub fn new(children: Vec<Node>) -> Self {
        let summary = children
            .iter()
            .fold(LineSummary::default(), |mut acc, child| {
                acc.add(child.summary());

                acc
            });

        Self { summary, children }
    }

    pub fn split_overflow(&mut self) -> Vec<InternalNode> {
        if self.children.len() <= MAX_CHILDREN {
            return Vec::new();
        }

        let mut chunks = even_chunks(std::mem::take(&mut self.children)).into_iter();

        *self = InternalNode::new(chunks.next().unwrap_or_default());

        chunks.map(InternalNode::new).collect()
    }

    /// Merges every underfull child into a neighbour, re-splitting when the
    /// merge overflows.
    fn rebalance_children(&mut self) {
        let mut idx = 0;

        while idx < self.children.len() {
            if self.children.len() < 2 || self.children[idx].entry_count() >= MIN_CHILDREN {
                idx.add_assign(1);

                continue;
            }

            let lo = idx.saturating_sub(1);
            let right = self.children.remove(lo + 1);
            let overflow = self.children[lo].absorb(right);

            self.children.splice(lo + 1..lo + 1, overflow);

            idx = lo;
        }
    }
}

impl Node {
    /// Returns a reference to this node's `LineSummary`
    #[inline]
    pub fn summary(&self) -> &LineSummary {
        match self {
            Node::Internal(internal_node) => &internal_node.summary,
            Node::Leaf(leaf_node) => &leaf_node.summary,
        }
    }

    /// Lines in a leaf, children in an internal node.
    #[inline]
    pub fn entry_count(&self) -> usize {
        match self {
            Node::Internal(internal_node) => internal_node.children.len(),
            Node::Leaf(leaf_node) => leaf_node.line_lengths.len(),
        }
    }

    /// Appends a same-depth sibling's entries to this node. Returns the
    /// overflow siblings that belong right after `self`.
    fn absorb(&mut self, next: Node) -> Vec<Node> {
        match (self, next) {
            (Node::Leaf(leaf), Node::Leaf(next)) => {
                leaf.line_lengths.extend(next.line_lengths);
                leaf.summary.add(&next.summary);

                leaf.split_overflow().into_iter().map(Node::Leaf).collect()
            }
            (Node::Internal(internal), Node::Internal(next)) => {
                internal.children.extend(next.children);
                internal.summary.add(&next.summary);
                // An underfull node may bring an underfull only child along.
                internal.rebalance_children();

                internal
                    .split_overflow()
                    .into_iter()
                    .map(Node::Internal)
                    .collect()
            }
            _ => unreachable!("siblings always sit at the same depth"),
        }
    }
}

/*

====================
====== QUERIES =====
====================

 */

impl Node {
    /// Start offset and length of line `line_idx`, or `None` past the end.
    pub fn line_span(&self, mut line_idx: usize) -> Option<LineSpan> {
        let mut node = self;
        let mut start = 0u64;

        loop {
            match node {
                Node::Leaf(leaf_node) => {
                    let (length, before) = leaf_node.line_lengths.get(..=line_idx)?.split_last()?;

                    start.add_assign(before.iter().map(|len| len + 1).sum::<u64>());

                    return Some(LineSpan {
                        start_offset: start,
                        length: *length,
                    });
                }
                Node::Internal(internal_node) => {
                    let mut next = None;

                    for child in &internal_node.children {
                        let summary = child.summary();

                        if line_idx < summary.line_count {
                            next = Some(child);

                            break;
                        }

                        line_idx.sub_assign(summary.line_count);
                        start.add_assign(summary.byte_len);
                    }

                    node = next?;
                }
            }
        }
    }

    /// The line containing `offset` together with that line's start offset.
    /// `None` once `offset` passes the last line's (virtual) terminator.
    pub fn line_at_offset(&self, mut offset: u64) -> Option<(usize, u64)> {
        let mut node = self;
        let mut line = 0usize;
        let mut start = 0u64;

        loop {
            match node {
                Node::Leaf(leaf_node) => {
                    for len in &leaf_node.line_lengths {
                        let span = len + 1;

                        if offset < span {
                            return Some((line, start));
                        }

                        offset.sub_assign(span);
                        start.add_assign(span);
                        line.add_assign(1);
                    }

                    return None;
                }
                Node::Internal(internal_node) => {
                    let mut next = None;

                    for child in &internal_node.children {
                        let summary = child.summary();

                        if offset < summary.byte_len {
                            next = Some(child);

                            break;
                        }

                        offset.sub_assign(summary.byte_len);
                        start.add_assign(summary.byte_len);
                        line.add_assign(summary.line_count);
                    }

                    node = next?;
                }
            }
        }
    }
}

/*

======================
======= SETTER =======
======================

 */

impl Node {
    /// Recursively finds the target line, updates its length, and fixes
    /// byte_len summaries on the way back up. Returns the previous length.
    pub fn set_line_length(&mut self, target_line_idx: usize, new_len: u64) -> Option<u64> {
        match self {
            Node::Leaf(leaf_node) => {
                let slot = leaf_node.line_lengths.get_mut(target_line_idx)?;
                let old_len = std::mem::replace(slot, new_len);

                leaf_node.summary.byte_len = leaf_node.summary.byte_len - old_len + new_len;

                Some(old_len)
            }
            Node::Internal(internal_node) => {
                let mut target_line_idx = target_line_idx;

                for child in &mut internal_node.children {
                    let child_lines = child.summary().line_count;

                    if target_line_idx < child_lines {
                        let old_len = child.set_line_length(target_line_idx, new_len)?;

                        internal_node.summary.byte_len =
                            internal_node.summary.byte_len - old_len + new_len;

                        return Some(old_len);
                    }

                    target_line_idx.sub_assign(child_lines);
                }

                None
            }
        }
    }
}

/*

=====================
===== INSERTION =====
=====================

 */

impl Node {
    /// Inserts `lengths` as consecutive lines so the first one becomes line
    /// `line_idx` of this subtree (`0..=line_count`). Returns the overflow
    /// siblings that belong right after `self`.
    pub fn insert_lines(&mut self, line_idx: usize, lengths: &[u64]) -> Vec<Node> {
        let added = LineSummary::of_lines(lengths);

        match self {
            Node::Leaf(leaf_node) => {
                let at = line_idx.min(leaf_node.line_lengths.len());

                leaf_node
                    .line_lengths
                    .splice(at..at, lengths.iter().copied());
                leaf_node.summary.add(&added);

                leaf_node
                    .split_overflow()
                    .into_iter()
                    .map(Node::Leaf)
                    .collect()
            }
            Node::Internal(internal_node) => {
                let mut line_idx = line_idx;
                let mut target = 0;

                // An index equal to a child's line count appends to that child.
                while target + 1 < internal_node.children.len() {
                    let child_lines = internal_node.children[target].summary().line_count;

                    if line_idx <= child_lines {
                        break;
                    }

                    line_idx.sub_assign(child_lines);
                    target.add_assign(1);
                }

                let overflow = internal_node.children[target].insert_lines(line_idx, lengths);

                internal_node
                    .children
                    .splice(target + 1..target + 1, overflow);
                internal_node.summary.add(&added);

                internal_node
                    .split_overflow()
                    .into_iter()
                    .map(Node::Internal)
                    .collect()
            }
        }
    }
}

/*

========================
======= DELETION =======
========================

 */

impl Node {
    /// Removes the lines in `range` (subtree-relative, end exclusive), culls
    /// emptied children and merges underfull ones. Returns the summary of
    /// what was removed.
    pub fn remove_lines(&mut self, range: std::ops::Range<usize>) -> LineSummary {
        match self {
            Node::Leaf(leaf_node) => {
                let end = range.end.min(leaf_node.line_lengths.len());
                let start = range.start.min(end);
                let removed = LineSummary::of_lines(&leaf_node.line_lengths[start..end]);

                leaf_node.line_lengths.drain(start..end);
                leaf_node.summary.sub(&removed);

                removed
            }
            Node::Internal(internal_node) => {
                let mut removed = LineSummary::default();
                let mut child_start = 0usize;
                let mut idx = 0usize;

                while idx < internal_node.children.len() && child_start < range.end {
                    let child_lines = internal_node.children[idx].summary().line_count;
                    let child_end = child_start + child_lines;

                    if child_end <= range.start {
                        child_start = child_end;
                        idx.add_assign(1);

                        continue;
                    }

                    let lo = range.start.max(child_start) - child_start;
                    let hi = range.end.min(child_end) - child_start;

                    if lo == 0 && hi == child_lines {
                        let child = internal_node.children.remove(idx);

                        removed.add(child.summary());
                    } else {
                        removed.add(&internal_node.children[idx].remove_lines(lo..hi));
                        idx.add_assign(1);
                    }

                    child_start = child_end;
                }

                internal_node.summary.sub(&removed);
                internal_node.rebalance_children();

                removed
            }
        }
    }
}

/*

========================
====== INVARIANTS ======
========================

 */

impl Node {
    /// Verifies summaries, fill bounds and uniform leaf depth for the
    /// subtree. Returns its height.
    pub fn check(&self, is_root: bool) -> Result<usize, String> {
        let entries = self.entry_count();

        if entries > MAX_CHILDREN {
            return Err(format!("node holds {entries} entries"));
        }

        if !is_root && entries < MIN_CHILDREN {
            return Err(format!("non-root node holds only {entries} entries"));
        }

        match self {
            Node::Leaf(leaf_node) => {
                if leaf_node.summary != LineSummary::of_lines(&leaf_node.line_lengths) {
                    return Err(format!("stale leaf summary {:?}", leaf_node.summary));
                }

                Ok(1)
            }
            Node::Internal(internal_node) => {
                if internal_node.children.is_empty() {
                    return Err("internal node without children".to_string());
                }

                let mut height = None;
                let mut total = LineSummary::default();

                for child in &internal_node.children {
                    let child_height = child.check(false)?;

                    if *height.get_or_insert(child_height) != child_height {
                        return Err("leaves at uneven depth".to_string());
                    }

                    total.add(child.summary());
                }

                if total != internal_node.summary {
                    return Err(format!(
                        "internal summary {:?} does not match children {total:?}",
                        internal_node.summary
                    ));
                }

                Ok(height.unwrap_or(0) + 1)
            }
        }
    }
}
