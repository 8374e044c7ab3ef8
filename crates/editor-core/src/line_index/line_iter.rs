use std::ops::{AddAssign, SubAssign};

use crate::line_index::LineSpan;
use crate::line_index::node::Node;

/// Walks a run of lines in order without re-descending per line.
#[derive(Debug)]
pub struct LineRangeIter<'node> {
    /// Stack tracks: (Node Reference, Index of the child or line being visited)
    pub stack: Vec<(&'node Node, usize)>,
    pub current_line_idx: usize,
    pub end_line_idx: usize,
    pub current_abs_idx: u64,
}

impl<'node> LineRangeIter<'node> {
    /// Positions the iterator on line `range.start` with a single descent.
    pub fn seek(root: &'node Node, range: std::ops::Range<usize>) -> Self {
        // A B-Tree of 1,000,000 lines is only ~6 levels deep.
        let mut stack = Vec::with_capacity(8);
        let mut node = root;
        let mut line_idx = range.start;
        let mut current_abs_idx = 0u64;

        loop {
            match node {
                Node::Leaf(leaf_node) => {
                    let idx = line_idx.min(leaf_node.line_lengths.len());

                    current_abs_idx.add_assign(
                        leaf_node.line_lengths[..idx]
                            .iter()
                            .map(|len| len + 1)
                            .sum::<u64>(),
                    );
                    stack.push((node, idx));

                    break;
                }
                Node::Internal(internal_node) => {
                    let mut idx = 0;

                    while let Some(child) = internal_node.children.get(idx) {
                        let summary = child.summary();

                        if line_idx < summary.line_count {
                            break;
                        }

                        line_idx.sub_assign(summary.line_count);
                        current_abs_idx.add_assign(summary.byte_len);
                        idx.add_assign(1);
                    }

                    stack.push((node, idx));

                    match internal_node.children.get(idx) {
                        Some(child) => node = child,
                        None => break,
                    }
                }
            }
        }

        Self {
            stack,
            current_line_idx: range.start,
            end_line_idx: range.end,
            current_abs_idx,
        }
    }
}

impl Iterator for LineRangeIter<'_> {
    type Item = (usize, LineSpan);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_line_idx >= self.end_line_idx || self.stack.is_empty() {
            return None;
        }

        let line_len = loop {
            let (node, idx) = *self.stack.last()?;

            match node {
                Node::Leaf(leaf_node) if idx < leaf_node.line_lengths.len() => {
                    if let Some(top) = self.stack.last_mut() {
                        top.1.add_assign(1);
                    }

                    break leaf_node.line_lengths[idx];
                }
                Node::Internal(internal_node) if idx < internal_node.children.len() => {
                    self.stack.push((&internal_node.children[idx], 0));
                }
                _ => {
                    self.stack.pop();

                    if let Some(parent) = self.stack.last_mut() {
                        parent.1.add_assign(1);
                    }
                }
            }
        };

        let span = LineSpan {
            start_offset: self.current_abs_idx,
            length: line_len,
        };

        self.current_abs_idx.add_assign(line_len + 1);
        self.current_line_idx.add_assign(1);

        Some((self.current_line_idx - 1, span))
    }
}
