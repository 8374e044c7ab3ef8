/// The last line looked up through
/// [`BTreeLineIndex::line_at`](crate::line_index::btree::BTreeLineIndex::line_at).
///
/// Viewport rendering asks for the same line repeatedly between edits;
/// every edit clears the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchCache {
    pub line_idx: usize,
    pub span: crate::line_index::LineSpan,
}
